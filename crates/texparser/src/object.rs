//! The object model
//!
//! Tokens are the unit the expansion engine works in.
//! Commands that build structured output, and listeners that receive it,
//!     work with the richer [Object] type: a token, a group of objects delimited
//!     by braces or math shifts, a list, a number, a dimension, or an [Ignoreable]
//!     such as a comment that has no effect but is kept for round-tripping.
//!
//! A [TokenList] is an ordered, owned sequence of tokens that doubles as a stack
//!     from which arguments can be popped.
//! Cloning a list is a deep copy, so expanding the same macro body twice never
//!     lets the two expansions share mutable state.

use crate::token::{trace, CsNameInterner, Token};
use crate::types::Dimen;

/// How tokens popped from a [TokenList] are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Mode {
    /// Popping expands expandable commands on demand, just like the main input.
    #[default]
    Stack,
    /// Popping returns tokens exactly as they are stored.
    List,
}

/// An ordered sequence of tokens that can be used as an argument stack.
///
/// The first token of the list is the next one to be popped.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TokenList {
    pub tokens: Vec<Token>,
    pub mode: Mode,
}

impl TokenList {
    pub fn new(tokens: Vec<Token>) -> TokenList {
        TokenList {
            tokens,
            mode: Mode::Stack,
        }
    }

    /// Returns a list whose tokens are never expanded when popped.
    pub fn new_list(tokens: Vec<Token>) -> TokenList {
        TokenList {
            tokens,
            mode: Mode::List,
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Removes and returns the first token.
    pub fn pop(&mut self) -> Option<Token> {
        if self.tokens.is_empty() {
            None
        } else {
            Some(self.tokens.remove(0))
        }
    }

    /// Adds a token to the front, so that it is the next one popped.
    pub fn push(&mut self, token: Token) {
        self.tokens.insert(0, token);
    }

    /// Adds tokens to the front, preserving their order.
    pub fn push_all(&mut self, tokens: &[Token]) {
        self.tokens.splice(0..0, tokens.iter().copied());
    }

    pub fn into_tokens(self) -> Vec<Token> {
        self.tokens
    }
}

impl From<Vec<Token>> for TokenList {
    fn from(tokens: Vec<Token>) -> Self {
        TokenList::new(tokens)
    }
}

/// The kind of a group.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GroupKind {
    /// A group delimited by begin group and end group characters, `{...}`.
    Brace,
    /// A group delimited by `\begingroup` and `\endgroup`.
    Semisimple,
    /// Math mode, `$...$` or, if display, `$$...$$`.
    Math { display: bool },
    /// A LaTeX environment, `\begin{name}...\end{name}`.
    Environment(String),
}

impl GroupKind {
    /// Returns how the group is closed, for error messages.
    pub fn closer(&self) -> String {
        match self {
            GroupKind::Brace => "}".into(),
            GroupKind::Semisimple => r"\endgroup".into(),
            GroupKind::Math { display: false } => "$".into(),
            GroupKind::Math { display: true } => "$$".into(),
            GroupKind::Environment(name) => format![r"\end{{{name}}}"],
        }
    }
}

/// A group: a region of input with its own scope.
///
/// The VM creates a group when the group opens.
/// Listeners may collect the output produced inside the group in its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub kind: GroupKind,
    /// The token that opened the group.
    pub open: Token,
    /// The token that closed the group, set when the group ends.
    pub close: Option<Token>,
    pub content: TokenList,
}

impl Group {
    pub fn new(kind: GroupKind, open: Token) -> Group {
        Group {
            kind,
            open,
            close: None,
            content: Default::default(),
        }
    }

    pub fn is_math(&self) -> bool {
        matches!(self.kind, GroupKind::Math { .. })
    }
}

/// Input with no semantic effect that is kept for round-tripping, like a comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ignoreable {
    pub text: String,
    pub trace_key: trace::Key,
}

/// Any object the interpreter produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Object {
    Token(Token),
    Group(Group),
    List(TokenList),
    Number(i32),
    Dimension(Dimen),
    Ignoreable(Ignoreable),
}

impl Object {
    /// Returns the tokens that represent this object, as used by `\the`.
    ///
    /// Numbers and dimensions become other and space character tokens with the given trace key.
    /// Groups include their delimiters if the group was closed.
    pub fn to_tokens(&self, trace_key: trace::Key) -> Vec<Token> {
        match self {
            Object::Token(token) => vec![*token],
            Object::Group(group) => {
                let mut tokens = vec![group.open];
                tokens.extend(group.content.tokens.iter().copied());
                tokens.extend(group.close);
                tokens
            }
            Object::List(list) => list.tokens.clone(),
            Object::Number(n) => string_to_tokens(&n.to_string(), trace_key),
            Object::Dimension(d) => string_to_tokens(&d.to_string(), trace_key),
            Object::Ignoreable(_) => vec![],
        }
    }

    /// Returns the object as text, with control sequences written in TeX syntax.
    pub fn to_text(&self, interner: &CsNameInterner) -> String {
        match self {
            Object::Ignoreable(ignoreable) => ignoreable.text.clone(),
            _ => crate::token::write_tokens(&self.to_tokens(trace::Key::dummy()), interner),
        }
    }
}

/// Converts a string to the tokens `\string` would produce for it.
pub fn string_to_tokens(s: &str, trace_key: trace::Key) -> Vec<Token> {
    s.chars()
        .map(|c| Token::new_string_char(c, trace_key))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letters(s: &str) -> Vec<Token> {
        s.chars()
            .map(|c| Token::new_letter(c, trace::Key::dummy()))
            .collect()
    }

    #[test]
    fn token_list_is_a_stack() {
        let mut list = TokenList::new(letters("bc"));
        list.push(Token::new_letter('a', trace::Key::dummy()));
        assert_eq!(list.tokens, letters("abc"));
        assert_eq!(list.pop(), Some(Token::new_letter('a', trace::Key::dummy())));
        list.push_all(&letters("xy"));
        assert_eq!(list.tokens, letters("xybc"));
    }

    #[test]
    fn clone_is_independent() {
        let original = TokenList::new(letters("ab"));
        let mut copy = original.clone();
        copy.pop();
        assert_eq!(original.len(), 2);
        assert_eq!(copy.len(), 1);
    }

    #[test]
    fn numbers_and_dimensions_to_tokens() {
        let interner = CsNameInterner::default();
        assert_eq!(Object::Number(-12).to_text(&interner), "-12");
        assert_eq!(Object::Dimension(Dimen::ONE * 2).to_text(&interner), "2.0pt");
        let key = trace::Key::dummy();
        assert_eq!(
            Object::Number(7).to_tokens(key),
            vec![Token::new_other('7', key)]
        );
    }

    #[test]
    fn group_to_tokens() {
        let key = trace::Key::dummy();
        let mut group = Group::new(GroupKind::Brace, Token::new_begin_group('{', key));
        group.content = TokenList::new(letters("a"));
        group.close = Some(Token::new_end_group('}', key));
        let interner = CsNameInterner::default();
        assert_eq!(Object::Group(group).to_text(&interner), "{a}");
    }
}
