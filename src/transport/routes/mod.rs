pub mod guild;
pub mod stats;
