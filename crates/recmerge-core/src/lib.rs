pub mod config;
pub mod handler;
pub mod logging;

pub use config::Settings;
pub use handler::{DefaultFileTypeHandler, FileTypeHandler, HandlerRegistry, MergeOrder};
