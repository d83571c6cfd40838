pub mod http;
pub mod local;
pub mod manager;
pub mod plugin;

pub use manager::SourceManager;
pub use plugin::{BoxedSource, ResolveError, SourcePlugin, TrackResolver};
