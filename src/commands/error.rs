use thiserror::Error;

use crate::player::PlayerError;

#[derive(Debug, Error)]
pub enum CommandError {
    /// The message does not start with the command prefix. Hosts should
    /// ignore it rather than reply.
    #[error("not a command")]
    NotACommand,

    #[error("unknown command `{0}`")]
    UnknownCommand(String),

    #[error("`{command}` needs {expected}")]
    MissingArgument {
        command: &'static str,
        expected: &'static str,
    },

    #[error("`{command}` cannot use {value:?}: expected {expected}")]
    BadArgument {
        command: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("you must be in a voice channel")]
    NotInVoice,

    #[error(transparent)]
    Player(#[from] PlayerError),
}
