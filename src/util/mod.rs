//! Shared utilities

pub mod ansi;
pub mod config;
pub mod errors;
pub mod fs;
pub mod process;
pub mod strbuf;
pub mod vec;

pub use config::Config;
pub use errors::BuildError;
pub use process::{CommandRunner, Executor, ProcessBuilder, RunResult};
pub use strbuf::StringBuilder;
pub use vec::{GrowVec, PlainArray};
