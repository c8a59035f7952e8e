pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{CliArgs, OutputFormatArg};
pub use handlers::{handle_scan, scan, scan_and_render};
pub use output::{OutputFormat, OutputFormatter};
