//! C/C++ build engine.
//!
//! This module implements the native compiler driver, toolchain resolution
//! and header dependency tracking.

pub mod context;
pub mod deps;
pub mod native;
pub mod toolchain;

pub use context::BuildContext;
pub use native::NativeBuilder;
pub use toolchain::{CommandStyle, ToolKind, Toolchain};
