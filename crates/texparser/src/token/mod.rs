//! Tokens, category codes and the tokenizer.

mod catcode;
pub mod lexer;
pub mod trace;

pub use catcode::{CatCode, CatCodeTable};
use std::num;
use texparser_stdext::collections::interner;

/// Interned name of a control sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CsName(num::NonZeroU32);

/// String interner for control sequence names.
pub type CsNameInterner = interner::Interner<CsName>;

impl interner::Key for CsName {
    fn try_from_usize(index: usize) -> Option<Self> {
        <num::NonZeroU32 as interner::Key>::try_from_usize(index).map(CsName)
    }

    fn into_usize(self) -> usize {
        <num::NonZeroU32 as interner::Key>::into_usize(self.0)
    }
}

/// The value of a token.
///
/// Character tokens carry the category they had when they were tokenized;
///     changing a category code later does not change existing tokens.
#[derive(Debug, Eq, PartialEq, Clone, Copy, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    BeginGroup(char),
    EndGroup(char),
    MathShift(char),
    AlignmentTab(char),
    Parameter(char),
    Superscript(char),
    Subscript(char),
    Space(char),
    Letter(char),
    Other(char),
    CommandRef(CommandRef),
}

/// A reference to a command: the name of a control sequence, or an active character.
///
/// A reference is not the command itself.
/// The command is looked up in the commands map when the reference is resolved,
///     and the same reference can resolve to different commands at different times.
#[derive(Debug, Eq, PartialEq, Clone, Copy, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CommandRef {
    ControlSequence(CsName),
    ActiveCharacter(char),
}

impl CommandRef {
    /// Returns the reference as it would be written in TeX source.
    pub fn to_string(&self, interner: &CsNameInterner) -> String {
        match self {
            CommandRef::ControlSequence(cs_name) => {
                format!("\\{}", interner.resolve(*cs_name).unwrap_or("<unknown>"))
            }
            CommandRef::ActiveCharacter(c) => c.to_string(),
        }
    }
}

impl Value {
    /// Returns the value of a character with the given category code.
    ///
    /// Returns `None` for categories that never appear in tokens (escape, comment, etc.).
    pub fn new(c: char, cat_code: CatCode) -> Option<Value> {
        Some(match cat_code {
            CatCode::BeginGroup => Value::BeginGroup(c),
            CatCode::EndGroup => Value::EndGroup(c),
            CatCode::MathShift => Value::MathShift(c),
            CatCode::AlignmentTab => Value::AlignmentTab(c),
            CatCode::Parameter => Value::Parameter(c),
            CatCode::Superscript => Value::Superscript(c),
            CatCode::Subscript => Value::Subscript(c),
            CatCode::Space => Value::Space(c),
            CatCode::Letter => Value::Letter(c),
            CatCode::Other => Value::Other(c),
            CatCode::Active => Value::CommandRef(CommandRef::ActiveCharacter(c)),
            CatCode::Escape
            | CatCode::EndOfLine
            | CatCode::Ignored
            | CatCode::Comment
            | CatCode::Invalid => return None,
        })
    }
}

/// A TeX token.
///
/// Equality compares values only; two tokens from different places in the
///     source are equal if they have the same value.
#[derive(Debug, Eq, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Token {
    value: Value,
    trace_key: trace::Key,
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl std::hash::Hash for Token {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.value.hash(state)
    }
}

macro_rules! token_constructor {
    ($name: ident, $value: expr) => {
        pub fn $name(c: char, trace_key: trace::Key) -> Token {
            Token {
                value: $value(c),
                trace_key,
            }
        }
    };
}

impl Token {
    token_constructor!(new_begin_group, Value::BeginGroup);
    token_constructor!(new_end_group, Value::EndGroup);
    token_constructor!(new_math_shift, Value::MathShift);
    token_constructor!(new_alignment_tab, Value::AlignmentTab);
    token_constructor!(new_parameter, Value::Parameter);
    token_constructor!(new_superscript, Value::Superscript);
    token_constructor!(new_subscript, Value::Subscript);
    token_constructor!(new_space, Value::Space);
    token_constructor!(new_letter, Value::Letter);
    token_constructor!(new_other, Value::Other);

    pub fn new_active_character(c: char, trace_key: trace::Key) -> Token {
        Token {
            value: Value::CommandRef(CommandRef::ActiveCharacter(c)),
            trace_key,
        }
    }

    pub fn new_control_sequence(name: CsName, trace_key: trace::Key) -> Token {
        Token {
            value: Value::CommandRef(CommandRef::ControlSequence(name)),
            trace_key,
        }
    }

    pub fn new_command_ref(command_ref: CommandRef, trace_key: trace::Key) -> Token {
        Token {
            value: Value::CommandRef(command_ref),
            trace_key,
        }
    }

    pub fn new_from_value(value: Value, trace_key: trace::Key) -> Token {
        Token { value, trace_key }
    }

    /// Returns the token a string character becomes under `\string` and `\detokenize`:
    ///     spaces stay spaces and everything else is other.
    pub fn new_string_char(c: char, trace_key: trace::Key) -> Token {
        if c == ' ' {
            Token::new_space(c, trace_key)
        } else {
            Token::new_other(c, trace_key)
        }
    }

    #[inline]
    pub fn value(&self) -> Value {
        self.value
    }

    #[inline]
    pub fn trace_key(&self) -> trace::Key {
        self.trace_key
    }

    #[inline]
    pub fn command_ref(&self) -> Option<CommandRef> {
        match self.value {
            Value::CommandRef(command_ref) => Some(command_ref),
            _ => None,
        }
    }

    /// Returns the character of a character token or active character.
    pub fn char(&self) -> Option<char> {
        self.char_and_cat_code().map(|(c, _)| c)
    }

    pub fn cat_code(&self) -> Option<CatCode> {
        self.char_and_cat_code().map(|(_, code)| code)
    }

    pub fn char_and_cat_code(&self) -> Option<(char, CatCode)> {
        Some(match self.value {
            Value::BeginGroup(c) => (c, CatCode::BeginGroup),
            Value::EndGroup(c) => (c, CatCode::EndGroup),
            Value::MathShift(c) => (c, CatCode::MathShift),
            Value::AlignmentTab(c) => (c, CatCode::AlignmentTab),
            Value::Parameter(c) => (c, CatCode::Parameter),
            Value::Superscript(c) => (c, CatCode::Superscript),
            Value::Subscript(c) => (c, CatCode::Subscript),
            Value::Space(c) => (c, CatCode::Space),
            Value::Letter(c) => (c, CatCode::Letter),
            Value::Other(c) => (c, CatCode::Other),
            Value::CommandRef(CommandRef::ActiveCharacter(c)) => (c, CatCode::Active),
            Value::CommandRef(CommandRef::ControlSequence(_)) => return None,
        })
    }
}

/// Returns whether the control sequence name is a control word (as opposed to a control symbol).
pub fn is_control_word(name: &str) -> bool {
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (None, _) => false,
        (Some(c), None) => c.is_alphabetic(),
        _ => true,
    }
}

/// Writes tokens as TeX source.
///
/// A space is inserted after a control word when the next token is a letter,
///     so that the output tokenizes back to the same control sequence.
/// Runs of space tokens are written as a single space.
pub fn write_tokens<'a, T>(tokens: T, interner: &CsNameInterner) -> String
where
    T: IntoIterator<Item = &'a Token>,
{
    let mut s = String::new();
    let mut after_control_word = false;
    let mut last_was_space = false;
    for token in tokens {
        match token.value {
            Value::CommandRef(CommandRef::ControlSequence(name)) => {
                let name = interner.resolve(name).unwrap_or("");
                s.push('\\');
                s.push_str(name);
                after_control_word = is_control_word(name);
                last_was_space = false;
            }
            Value::Space(_) => {
                if !last_was_space {
                    s.push(' ');
                }
                after_control_word = false;
                last_was_space = true;
            }
            _ => {
                let c = token.char().unwrap_or('?');
                if after_control_word && matches!(token.value, Value::Letter(_)) {
                    s.push(' ');
                }
                s.push(c);
                after_control_word = false;
                last_was_space = false;
            }
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    enum PreInterned {
        Cs(&'static str),
        Char(char, CatCode),
    }
    use PreInterned::*;

    macro_rules! write_tokens_tests {
        ( $( ($name: ident, $input: expr, $want: expr), )+ ) => {
            $(
            #[test]
            fn $name() {
                let mut interner = CsNameInterner::default();
                let tokens: Vec<Token> = $input
                    .into_iter()
                    .map(|pre_interned: PreInterned| match pre_interned {
                        Cs(name) => Token::new_control_sequence(
                            interner.get_or_intern(name),
                            trace::Key::dummy(),
                        ),
                        Char(c, code) => Token::new_from_value(
                            Value::new(c, code).unwrap(),
                            trace::Key::dummy(),
                        ),
                    })
                    .collect();
                assert_eq!(write_tokens(&tokens, &interner), $want);
            }
            )+
        };
    }

    write_tokens_tests![
        (empty, Vec::<PreInterned>::new(), ""),
        (
            control_word_then_letter,
            vec![Cs("alpha"), Char('x', CatCode::Letter)],
            r"\alpha x"
        ),
        (
            control_word_then_other,
            vec![Cs("alpha"), Char('1', CatCode::Other)],
            r"\alpha1"
        ),
        (
            control_symbol_then_letter,
            vec![Cs("@"), Char('x', CatCode::Letter)],
            r"\@x"
        ),
        (
            spaces_collapse,
            vec![
                Char('a', CatCode::Letter),
                Char(' ', CatCode::Space),
                Char('\n', CatCode::Space),
                Char('b', CatCode::Letter),
            ],
            "a b"
        ),
        (
            group,
            vec![
                Char('{', CatCode::BeginGroup),
                Cs("bf"),
                Char('}', CatCode::EndGroup),
            ],
            r"{\bf}"
        ),
    ];

    #[test]
    fn equality_ignores_trace_key() {
        let a = Token::new_letter('a', trace::Key::dummy());
        let b = Token::new_letter('a', trace::KeyRange::for_testing().next());
        assert_eq!(a, b);
        assert_ne!(a, Token::new_other('a', trace::Key::dummy()));
    }

    #[test]
    fn token_size() {
        assert_eq!(std::mem::size_of::<Token>(), 12);
    }
}
