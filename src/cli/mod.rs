pub mod args;
pub mod commands;

pub use args::{Cli, Commands, WindowArgs};
pub use commands::run;
