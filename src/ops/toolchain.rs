//! Toolchain lookup by triple name.

use std::sync::Arc;

use anyhow::Result;

use crate::builder::context::BuildContext;
use crate::builder::toolchain::Toolchain;
use crate::core::triple::Triple;

/// Resolve the toolchain for `triple`, or the native one when `None`.
///
/// With `llvm`, the flat LLVM layout is used instead of a cross toolchain;
/// it defaults to the host triple.
pub fn resolve_toolchain(
    ctx: &BuildContext,
    triple: Option<&str>,
    llvm: bool,
) -> Result<Arc<Toolchain>> {
    let triple = triple.map(Triple::parse).transpose()?;

    match (triple, llvm) {
        (Some(triple), true) => Ok(ctx.find_llvm_toolchain(&triple)),
        (None, true) => Ok(ctx.find_llvm_toolchain(&Triple::host())),
        (Some(triple), false) => ctx.find_toolchain(&triple),
        (None, false) => Ok(ctx.native_toolchain()),
    }
}
