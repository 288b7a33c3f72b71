//! Finding where tokens came from.
//!
//! Error messages need the file, line and text of the offending token.
//! Storing this on every token would make tokens large, so instead each token
//!     carries a 32-bit [Key] and the [Tracer] maps keys back to source code.
//!
//! When source code is added to the input it is registered with
//!     [Tracer::register_source_code], which reserves one key per byte of the source.
//! The tokenizer gives each token the key of the byte the token starts at.
//! Tracing a key finds the registered source containing it and the byte offset inside that source,
//!     from which the line number and line content follow.
//!
//! Tokens created by expansion copy the key of the token they were copied from,
//!     so tokens from a macro's replacement text trace back to the macro definition.
use crate::token::{CommandRef, CsNameInterner, Token, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::rc::Rc;

/// Key attached to tokens to enable tracing them.
#[derive(Debug, PartialEq, Eq, Clone, Copy, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Key(u32);

impl Key {
    /// A key that does not trace to any source code.
    pub fn dummy() -> Key {
        Key(u32::MAX)
    }
}

/// A contiguous range of keys reserved for one piece of source code.
#[derive(Debug, Clone)]
pub struct KeyRange {
    start: u32,
    limit: u32,
}

impl KeyRange {
    /// Returns the key for the byte at the given offset in the source code.
    ///
    /// Offsets past the end of the range give the dummy key.
    pub fn key_at(&self, offset: usize) -> Key {
        match u32::try_from(offset)
            .ok()
            .and_then(|offset| self.start.checked_add(offset))
        {
            Some(k) if k < self.limit => Key(k),
            _ => Key::dummy(),
        }
    }

    /// Returns an empty range; every key obtained from it is the dummy key.
    pub fn empty() -> KeyRange {
        KeyRange { start: 0, limit: 0 }
    }

    /// Returns a range of distinct keys that is not registered with any tracer.
    pub fn for_testing() -> KeyRange {
        KeyRange {
            start: 0,
            limit: u32::MAX,
        }
    }

    /// Returns the first key of the range.
    pub fn next(&self) -> Key {
        self.key_at(0)
    }
}

/// Where a piece of source code came from.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Origin {
    /// A file on disk, read directly or through `\input`.
    File(PathBuf),
    /// Source code provided directly as a string.
    String(String),
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Origin::File(path) => write!(f, "{}", path.display()),
            Origin::String(name) => write!(f, "<{name}>"),
        }
    }
}

/// The result of tracing a token.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SourceCodeTrace {
    /// Origin of the source code.
    pub origin: Origin,
    /// Content of the line containing the token, without the trailing newline.
    pub line_content: String,
    /// One-based line number.
    pub line_number: usize,
    /// Character offset of the token within the line.
    pub index: usize,
    /// The token as it appears in the source, e.g. `\def` or `{`.
    pub value: String,
}

#[derive(Debug)]
struct Checkpoint {
    origin: Origin,
    content: Rc<str>,
}

/// Records registered source code so that keys can be traced.
#[derive(Debug)]
pub struct Tracer {
    checkpoints: BTreeMap<u32, Checkpoint>,
    next_key: u32,
    last_registered: Option<u32>,
}

impl Default for Tracer {
    fn default() -> Self {
        Tracer {
            checkpoints: BTreeMap::new(),
            next_key: 0,
            last_registered: None,
        }
    }
}

impl Tracer {
    /// Registers source code and returns the key range for its bytes.
    ///
    /// If the key space is exhausted the empty range is returned and tokens
    ///     from this source cannot be traced.
    pub fn register_source_code(&mut self, origin: Origin, content: Rc<str>) -> KeyRange {
        // One extra key for the end of the input.
        let len = match u32::try_from(content.len() + 1) {
            Ok(len) => len,
            Err(_) => return KeyRange::empty(),
        };
        let start = self.next_key;
        let limit = match start.checked_add(len) {
            Some(limit) if limit < u32::MAX => limit,
            _ => return KeyRange::empty(),
        };
        self.next_key = limit;
        self.checkpoints.insert(start, Checkpoint { origin, content });
        self.last_registered = Some(start);
        KeyRange { start, limit }
    }

    /// Traces a token to the source code it came from.
    pub fn trace(&self, token: Token, interner: &CsNameInterner) -> SourceCodeTrace {
        let value = match token.value() {
            Value::CommandRef(CommandRef::ControlSequence(name)) => {
                format!("\\{}", interner.resolve(name).unwrap_or(""))
            }
            _ => token.char().map(String::from).unwrap_or_default(),
        };
        let key = token.trace_key().0;
        match self.checkpoints.range(..=key).next_back() {
            Some((start, checkpoint)) if ((key - start) as usize) <= checkpoint.content.len() => {
                locate(checkpoint, (key - start) as usize, value)
            }
            _ => SourceCodeTrace {
                origin: Origin::String("unknown".into()),
                line_content: value.clone(),
                line_number: 0,
                index: 0,
                value,
            },
        }
    }

    /// Returns a trace pointing just past the end of the most recently registered source code.
    pub fn trace_end_of_input(&self) -> SourceCodeTrace {
        match self
            .last_registered
            .and_then(|start| self.checkpoints.get(&start))
        {
            Some(checkpoint) => {
                let mut trace = locate(
                    checkpoint,
                    checkpoint.content.trim_end_matches('\n').len(),
                    String::new(),
                );
                trace.value = " ".into();
                trace
            }
            None => SourceCodeTrace {
                origin: Origin::String("unknown".into()),
                line_content: String::new(),
                line_number: 0,
                index: 0,
                value: " ".into(),
            },
        }
    }
}

fn locate(checkpoint: &Checkpoint, byte_offset: usize, value: String) -> SourceCodeTrace {
    let content = &checkpoint.content;
    let mut byte_offset = byte_offset.min(content.len());
    while !content.is_char_boundary(byte_offset) {
        byte_offset -= 1;
    }
    let before = &content[..byte_offset];
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let line_end = content[line_start..]
        .find('\n')
        .map(|i| i + line_start)
        .unwrap_or(content.len());
    SourceCodeTrace {
        origin: checkpoint.origin.clone(),
        line_content: content[line_start..line_end]
            .trim_end_matches('\r')
            .to_string(),
        line_number: before.matches('\n').count() + 1,
        index: content[line_start..byte_offset].chars().count(),
        value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_across_two_sources() {
        let mut tracer = Tracer::default();
        let mut interner = CsNameInterner::default();
        let first = tracer.register_source_code(
            Origin::File("main.tex".into()),
            "hello\n\\world\n".into(),
        );
        let second =
            tracer.register_source_code(Origin::String("terminal".into()), "a\nbc".into());

        let world = Token::new_control_sequence(interner.get_or_intern("world"), first.key_at(6));
        let trace = tracer.trace(world, &interner);
        assert_eq!(trace.origin, Origin::File("main.tex".into()));
        assert_eq!(trace.line_number, 2);
        assert_eq!(trace.line_content, r"\world");
        assert_eq!(trace.index, 0);
        assert_eq!(trace.value, r"\world");

        let c = Token::new_letter('c', second.key_at(3));
        let trace = tracer.trace(c, &interner);
        assert_eq!(trace.origin, Origin::String("terminal".into()));
        assert_eq!(trace.line_number, 2);
        assert_eq!(trace.line_content, "bc");
        assert_eq!(trace.index, 1);
        assert_eq!(trace.value, "c");
    }

    #[test]
    fn end_of_input() {
        let mut tracer = Tracer::default();
        tracer.register_source_code(Origin::File("a.tex".into()), "x\n{abc\n".into());
        let trace = tracer.trace_end_of_input();
        assert_eq!(trace.line_number, 2);
        assert_eq!(trace.line_content, "{abc");
        assert_eq!(trace.index, 4);
    }

    #[test]
    fn dummy_key() {
        let tracer = Tracer::default();
        let interner = CsNameInterner::default();
        let trace = tracer.trace(Token::new_letter('q', Key::dummy()), &interner);
        assert_eq!(trace.line_number, 0);
        assert_eq!(trace.value, "q");
    }
}
