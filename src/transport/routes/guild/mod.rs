pub mod commands;
pub mod player;

pub use commands::post_command;
pub use player::get_player;
