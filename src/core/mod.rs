//! Core data structures for Jetty.
//!
//! - Target triples
//! - Executables and libraries to build

pub mod target;
pub mod triple;

pub use target::{Executable, Language, Library, Target, TargetKind};
pub use triple::Triple;
