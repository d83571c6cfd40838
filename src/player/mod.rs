pub mod context;
pub mod error;
mod manager;
pub mod state;

pub use context::PlaybackSession;
pub use error::{PlayerError, PlayerResult};
pub use state::{
    EnqueueOutcome, JoinOutcome, LeaveOutcome, PlaybackState, SessionSnapshot, StopOutcome,
};
