//! High-level operations.
//!
//! This module contains the implementation of Jetty commands.

pub mod bootstrap;
pub mod cc;
pub mod embed;
pub mod jetty_init;
pub mod toolchain;

pub use bootstrap::{bootstrap, BuilderState, ENGINE_HEADER};
pub use cc::cc;
pub use embed::{embed_bytes, generate_embed};
pub use jetty_init::{init_freestanding, init_project};
pub use toolchain::resolve_toolchain;
