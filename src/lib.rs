//! Jetty - a self-hosting build engine for C and C++
//!
//! A build is described by a small C program (`build.jetty`). The engine
//! compiles that description into a builder executable linked against this
//! library, runs it, and the builder calls back through the C ABI in [`ffi`]
//! to compile and link the real targets.

pub mod builder;
pub mod core;
pub mod ffi;
pub mod ops;
pub mod util;

/// Test utilities for Jetty unit tests.
///
/// Only available when compiling tests. Provides a recording fake for the
/// process executor.
#[cfg(test)]
pub mod test_support;

pub use builder::{BuildContext, Toolchain};
pub use core::{Executable, Library, Target, Triple};
pub use util::config::Config;
pub use util::errors::BuildError;
