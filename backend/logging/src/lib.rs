//! Structured logging setup for TreeProbe tools and test harnesses.

pub mod logger;

pub use logger::{init_from_config, init_logger, LOG_FILE_PREFIX};
