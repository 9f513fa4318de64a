//! Authored content for the snack runtime: maps, events, items and the
//! command trees the interpreter walks.

pub mod args;
pub mod command;
pub mod condition;
pub mod error;
pub mod game;
pub mod types;

pub use command::{
    commands_from_json, commands_from_msgpack, commands_to_json, commands_to_msgpack, Command,
    CommandArgs, UnrecognizedCommand,
};
pub use condition::{ChoiceCondition, Comparison, Condition, ConditionValueType, ItemCondition};
pub use error::DataError;
pub use game::{
    Combine, CombineType, CommonEvent, EventData, Game, Hint, IapProduct, IapProductType, Item, Map,
    Page, PassageType, Priority, Room, ScriptDiagnostic, ScriptOwner, Table, Texts, TileSet,
    Trigger,
};
pub use types::{Dir, Speed, ValueType, PLAYER_EVENT_ID, SELF_EVENT_ID, TILE_SIZE};
