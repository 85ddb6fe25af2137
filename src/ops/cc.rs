//! Implementation of `jetty cc`: run a toolchain's C compiler directly.

use anyhow::{bail, Result};

use crate::builder::context::BuildContext;
use crate::builder::toolchain::{target_args, ToolKind, Toolchain};
use crate::ops::toolchain::resolve_toolchain;
use crate::util::process::ProcessBuilder;
use crate::util::vec::PlainArray;

/// Split `-target <triple>` out of a compiler command line. The last one
/// given wins.
pub fn split_target<S: AsRef<str>>(args: &[S]) -> Result<(Option<String>, Vec<String>)> {
    let mut triple = None;
    let mut rest = PlainArray::new();
    let mut iter = args.iter().map(|arg| arg.as_ref());

    while let Some(arg) = iter.next() {
        if arg == "-target" {
            match iter.next() {
                Some(value) => triple = Some(value.to_string()),
                None => bail!("`-target` needs a triple"),
            }
        } else {
            rest.push(arg.to_string());
        }
    }

    Ok((triple, rest.into_vec()))
}

/// The compiler invocation for `args` under `tc`.
pub fn compiler_command(tc: &Toolchain, args: &[String]) -> Result<ProcessBuilder> {
    let compiler = tc.require(ToolKind::CCompiler)?;
    Ok(target_args(tc, compiler, ProcessBuilder::new(compiler)).args(args))
}

/// Run the C compiler of the toolchain chosen by `-target` (native without
/// one) with the remaining arguments.
pub fn cc<S: AsRef<str>>(ctx: &BuildContext, args: &[S]) -> Result<()> {
    let (triple, rest) = split_target(args)?;
    let tc = resolve_toolchain(ctx, triple.as_deref(), false)?;

    let cmd = compiler_command(&tc, &rest)?;
    ctx.runner().run(&cmd)?;
    Ok(())
}
