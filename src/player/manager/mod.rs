mod advance;
mod error;
mod start;

pub(crate) use advance::advance;
pub(crate) use start::start_playback;
