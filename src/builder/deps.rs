//! Header dependency discovery.
//!
//! Dependencies are asked of the compiler itself on every build: `-MM` make
//! rules for GNU-style compilers and the `/sourceDependencies -` JSON report
//! for MSVC-style ones. Nothing is cached between runs.

use std::path::PathBuf;

use crate::builder::toolchain::{CompileInput, Toolchain};
use crate::util::process::CommandRunner;
use crate::util::vec::GrowVec;

/// Files a source depends on, the source itself included.
pub type DependencyList = Vec<PathBuf>;

/// Ask the compiler which files `input.source` depends on.
///
/// A failed scan or unreadable report is not an error: it is logged and
/// `None` is returned, and the caller rebuilds the object.
pub fn get_dependencies(
    runner: &dyn CommandRunner,
    tc: &Toolchain,
    input: &CompileInput<'_>,
) -> Option<DependencyList> {
    let cmd = tc.style().scan_command(tc, input);

    let result = match runner.run_capturing(&cmd) {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!(
                "could not scan dependencies of {}: {:#}",
                input.source.display(),
                e
            );
            return None;
        }
    };

    if !result.success() {
        tracing::warn!(
            "dependency scan of {} failed: `{}` exited with {:?}",
            input.source.display(),
            cmd.display_command(),
            result.code
        );
        return None;
    }

    let parsed = if tc.is_msvc() {
        parse_json_dependencies(&result.output)
    } else if result.output.trim().is_empty() {
        // Sources that skip the preprocessor, such as plain `.s`, get no rule.
        Some(vec![input.source.to_path_buf()])
    } else {
        parse_make_dependencies(&result.output)
    };

    if parsed.is_none() {
        tracing::warn!(
            "could not parse dependency report for {}",
            input.source.display()
        );
    }
    parsed
}

/// Parse a make rule (`target: dep dep \` continued over lines).
///
/// A backslash before a space, tab or `#` makes that character part of the
/// path and `$$` stands for `$`; any other backslash is kept, so Windows
/// paths survive.
pub fn parse_make_dependencies(text: &str) -> Option<DependencyList> {
    let joined = text.replace("\\\r\n", " ").replace("\\\n", " ");
    let rest = &joined[rule_separator(&joined)? + 1..];

    let mut deps: GrowVec<PathBuf> = GrowVec::new();
    let mut current = String::new();
    let mut chars = rest.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.peek() {
                Some(&next @ (' ' | '\t' | '#')) => {
                    current.push(next);
                    chars.next();
                }
                _ => current.push('\\'),
            },
            '$' if chars.peek() == Some(&'$') => {
                current.push('$');
                chars.next();
            }
            c if c.is_whitespace() => {
                if !current.is_empty() {
                    deps.push(PathBuf::from(std::mem::take(&mut current)));
                }
            }
            c => current.push(c),
        }
    }

    if !current.is_empty() {
        deps.push(PathBuf::from(current));
    }

    Some(deps.into_vec())
}

/// Position of the colon ending the rule's target: the first one followed
/// by whitespace, so a drive letter such as `C:\` is not mistaken for it.
fn rule_separator(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut first = None;

    for (i, &b) in bytes.iter().enumerate() {
        if b != b':' {
            continue;
        }
        first.get_or_insert(i);
        match bytes.get(i + 1) {
            None => return Some(i),
            Some(next) if next.is_ascii_whitespace() => return Some(i),
            Some(_) => {}
        }
    }

    first
}

/// Parse an MSVC `/sourceDependencies` report.
///
/// Only the `"Source"` string and the `"Includes"` array are read; each
/// string literal is decoded on its own.
pub fn parse_json_dependencies(text: &str) -> Option<DependencyList> {
    let mut deps: GrowVec<PathBuf> = GrowVec::new();

    let after_source = value_after_key(text, "\"Source\"")?;
    let (source, _) = read_string_literal(after_source)?;
    deps.push(PathBuf::from(source));

    let mut rest = value_after_key(text, "\"Includes\"")?.strip_prefix('[')?;
    loop {
        rest = rest.trim_start();
        if rest.starts_with(']') {
            break;
        }

        let (include, after) = read_string_literal(rest)?;
        deps.push(PathBuf::from(include));

        rest = after.trim_start();
        if let Some(after) = rest.strip_prefix(',') {
            rest = after;
        } else if rest.starts_with(']') {
            break;
        } else {
            return None;
        }
    }

    Some(deps.into_vec())
}

/// The text following `key` and its colon, with leading whitespace removed.
fn value_after_key<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    let pos = text.find(key)?;
    let rest = text[pos + key.len()..].trim_start();
    Some(rest.strip_prefix(':')?.trim_start())
}

/// Decode the JSON string literal at the start of `text`, returning it and
/// the remaining text.
fn read_string_literal(text: &str) -> Option<(String, &str)> {
    if !text.starts_with('"') {
        return None;
    }

    let bytes = text.as_bytes();
    let mut i = 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => {
                let literal = &text[..=i];
                let decoded = serde_json::from_str::<String>(literal).ok()?;
                return Some((decoded, &text[i + 1..]));
            }
            _ => i += 1,
        }
    }

    None
}
