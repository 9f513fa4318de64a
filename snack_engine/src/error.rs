use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use snack_data::DataError;
use snack_save::SaveError;
use thiserror::Error;

/// Where a failing command sits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptLocation {
    pub interpreter_id: u32,
    pub map_id: i32,
    pub room_id: i32,
    pub event_id: i32,
    pub index: usize,
    pub command: String,
}

impl fmt::Display for ScriptLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "map {}/room {}/event {} command #{} `{}` (interpreter #{})",
            self.map_id, self.room_id, self.event_id, self.index, self.command, self.interpreter_id
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptErrorKind {
    #[error("label {0:?} not found in the current command list")]
    LabelNotFound(String),
    #[error("unrecognized command: {0}")]
    UnrecognizedCommand(String),
    #[error("invalid value: {0}")]
    InvalidValue(String),
    #[error("no command list for {0}")]
    MissingCommands(String),
}

/// A content error that stops one interpreter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{location}: {kind}")]
pub struct ScriptError {
    pub location: ScriptLocation,
    pub kind: ScriptErrorKind,
}

/// Failures that the host loop should treat as fatal.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("room {room_id} of map {map_id} does not exist")]
    MissingRoom { map_id: i32, room_id: i32 },
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Save(#[from] SaveError),
    #[error(transparent)]
    Data(#[from] DataError),
}
