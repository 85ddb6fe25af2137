//! Byte-array embedding.
//!
//! Turns any file into the body of a C array initializer, to be pulled in
//! with `#include` between braces.

use std::fs;
use std::path::Path;

use anyhow::Result;

use crate::util::errors::BuildError;
use crate::util::fs::write_string;
use crate::util::strbuf::StringBuilder;

/// Bytes per output line.
const BYTES_PER_LINE: usize = 16;

/// `0x..` literals separated by `, `, sixteen to a line.
pub fn embed_bytes(bytes: &[u8]) -> String {
    // "0xAB, " is six characters per byte.
    let mut out = StringBuilder::with_capacity(bytes.len() * 6 + 1);

    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(',');
            out.push(if i % BYTES_PER_LINE == 0 { '\n' } else { ' ' });
        }
        out.push_fmt(format_args!("0x{:02X}", byte));
    }
    if !bytes.is_empty() {
        out.push('\n');
    }

    out.into_string()
}

/// Write `input` as an embeddable literal list to `output`.
pub fn generate_embed(input: &Path, output: &Path) -> Result<()> {
    let bytes = fs::read(input).map_err(|e| BuildError::file_io("read", input, e))?;
    write_string(output, &embed_bytes(&bytes))?;

    tracing::debug!(
        "embedded {} bytes from {} into {}",
        bytes.len(),
        input.display(),
        output.display()
    );
    Ok(())
}
