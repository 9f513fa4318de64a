//! Runtime for snack projects: the world state, the command interpreter
//! that drives it, and the bridges to the host platform.

pub mod audio_bridge;
pub mod character;
pub mod error;
pub mod game_state;
pub mod hints;
pub mod input;
pub mod interpolation;
pub mod interpreter;
pub mod items;
pub mod map;
pub mod message_syntax;
pub mod movement;
pub mod path;
pub mod pictures;
pub mod requester;
pub mod requester_file;
pub mod rng;
pub mod scene;
pub mod screen;
pub mod variables;
pub mod windows;

pub use error::{EngineError, ScriptError, ScriptErrorKind};
pub use game_state::GameState;
pub use input::InputState;
pub use scene::SceneManager;
