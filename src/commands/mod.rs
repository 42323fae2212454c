pub mod app_command;
pub mod export;
pub mod import;

pub use app_command::AppCommand;
