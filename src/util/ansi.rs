//! Streaming removal of ANSI escape sequences.
//!
//! Terminal output captured through a pseudo-terminal is full of color and
//! title sequences. The persistent log gets the plain text; the stripper keeps
//! its state between chunks so sequences split across reads are still removed.

const ESC: u8 = 0x1b;
const BEL: u8 = 0x07;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Ground,
    /// Saw ESC.
    Escape,
    /// Inside `ESC [`, waiting for a final byte.
    Csi,
    /// Inside an OSC/DCS/APC/PM/SOS string, terminated by BEL or `ESC \`.
    Str,
    /// Saw ESC inside a string.
    StrEscape,
    /// `ESC (`, `ESC )` and friends consume one more byte.
    Charset,
}

/// Incremental ANSI escape stripper.
#[derive(Debug, Clone)]
pub struct AnsiStripper {
    state: State,
}

impl AnsiStripper {
    pub fn new() -> Self {
        AnsiStripper {
            state: State::Ground,
        }
    }

    /// Strip `input`, appending the plain bytes to `out`.
    pub fn feed(&mut self, input: &[u8], out: &mut Vec<u8>) {
        for &byte in input {
            self.state = match self.state {
                State::Ground => {
                    if byte == ESC {
                        State::Escape
                    } else {
                        out.push(byte);
                        State::Ground
                    }
                }
                State::Escape => match byte {
                    b'[' => State::Csi,
                    b']' | b'P' | b'X' | b'^' | b'_' => State::Str,
                    b'(' | b')' | b'*' | b'+' | b'#' | b'%' => State::Charset,
                    ESC => State::Escape,
                    // Two-byte sequences such as `ESC 7` or `ESC =`.
                    _ => State::Ground,
                },
                State::Csi => {
                    if (0x40..=0x7e).contains(&byte) {
                        State::Ground
                    } else {
                        State::Csi
                    }
                }
                State::Str => match byte {
                    BEL => State::Ground,
                    ESC => State::StrEscape,
                    _ => State::Str,
                },
                State::StrEscape => match byte {
                    b'\\' => State::Ground,
                    ESC => State::StrEscape,
                    _ => State::Str,
                },
                State::Charset => State::Ground,
            };
        }
    }
}

impl Default for AnsiStripper {
    fn default() -> Self {
        AnsiStripper::new()
    }
}

/// Strip every escape sequence from a complete buffer.
pub fn strip_ansi(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    AnsiStripper::new().feed(input, &mut out);
    out
}
