pub mod info;

pub use info::{get_info, get_version};
