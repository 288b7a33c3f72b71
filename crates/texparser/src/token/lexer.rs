//! The tokenizer
//!
//! The lexer turns source code into tokens using the current category codes.
//! Category codes are looked up character by character as the input is consumed,
//!     so a `\catcode` assignment affects everything tokenized after it and nothing before.
//!
//! Whitespace follows TeX's three input states:
//!
//! - at the start of a line, spaces are skipped and an end of line produces `\par`,
//! - in the middle of a line, a space or end of line produces one space token,
//! - after a space token or a control word, spaces and an end of line are skipped.
//!
//! A control word (escape followed by letters) is followed by the skipping state,
//!     so `\alpha   x` is `\alpha` then `x`.
//! A control symbol (escape followed by one non-letter) is followed by the mid line state,
//!     so `\@   x` is `\@`, a space, then `x`.

use crate::object::Ignoreable;
use crate::token::trace::{Key, KeyRange};
use crate::token::{CatCode, CsNameInterner, Token, Value};
use std::rc::Rc;

/// Errors the lexer can produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A character with category code invalid appeared in the input.
    InvalidCharacter(char, Key),
    /// The input ended immediately after an escape character.
    EmptyControlSequence(Key),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    NewLine,
    MidLine,
    SkipBlanks,
}

/// Tokenizer for one piece of source code.
#[derive(Debug)]
pub struct Lexer {
    source: Rc<str>,
    pos: usize,
    keys: KeyRange,
    state: State,
    retain_comments: bool,
    comments: Vec<Ignoreable>,
}

impl Lexer {
    pub fn new(source: Rc<str>, keys: KeyRange) -> Lexer {
        Lexer {
            source,
            pos: 0,
            keys,
            state: State::NewLine,
            retain_comments: false,
            comments: vec![],
        }
    }

    /// Keep the text of comments so they can be retrieved with [Lexer::take_comments].
    pub fn retain_comments(&mut self, retain: bool) {
        self.retain_comments = retain;
    }

    /// Returns the comments skipped since the last call.
    pub fn take_comments(&mut self) -> Vec<Ignoreable> {
        std::mem::take(&mut self.comments)
    }

    /// Discards the rest of the input.
    pub fn end(&mut self) {
        self.pos = self.source.len();
    }

    /// Returns whether all of the input has been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.source.len()
    }

    /// Returns the next token, or `None` if the input is exhausted.
    pub fn next<F: Fn(u32) -> CatCode>(
        &mut self,
        cat_code_fn: F,
        interner: &mut CsNameInterner,
    ) -> Result<Option<Token>, Error> {
        while let Some((c, next_pos)) = self.read_char(self.pos, &cat_code_fn) {
            let key = self.keys.key_at(self.pos);
            let code = cat_code_fn(c as u32);
            let char_start = self.pos;
            self.pos = next_pos;
            match code {
                CatCode::Escape => {
                    return self.control_sequence(key, &cat_code_fn, interner).map(Some);
                }
                CatCode::Space => {
                    if self.state == State::MidLine {
                        self.state = State::SkipBlanks;
                        return Ok(Some(Token::new_space(' ', key)));
                    }
                }
                CatCode::EndOfLine => {
                    self.skip_rest_of_line(char_start);
                    let state = std::mem::replace(&mut self.state, State::NewLine);
                    match state {
                        State::NewLine => {
                            let par = interner.get_or_intern("par");
                            return Ok(Some(Token::new_control_sequence(par, key)));
                        }
                        State::MidLine => return Ok(Some(Token::new_space(' ', key))),
                        State::SkipBlanks => {}
                    }
                }
                CatCode::Comment => {
                    let start = self.pos;
                    self.skip_rest_of_line(char_start);
                    if self.retain_comments {
                        let text = self.source[start..self.pos].trim_end_matches(|c: char| c == '\n' || c == '\r');
                        self.comments.push(Ignoreable {
                            text: text.to_string(),
                            trace_key: key,
                        });
                    }
                    self.state = State::NewLine;
                }
                CatCode::Ignored => {}
                CatCode::Invalid => return Err(Error::InvalidCharacter(c, key)),
                _ => {
                    self.state = State::MidLine;
                    // Only categories that appear in tokens reach this branch.
                    if let Some(value) = Value::new(c, code) {
                        return Ok(Some(Token::new_from_value(value, key)));
                    }
                }
            }
        }
        Ok(None)
    }

    fn control_sequence<F: Fn(u32) -> CatCode>(
        &mut self,
        key: Key,
        cat_code_fn: &F,
        interner: &mut CsNameInterner,
    ) -> Result<Token, Error> {
        let (first, mut pos) = match self.read_char(self.pos, cat_code_fn) {
            None => return Err(Error::EmptyControlSequence(key)),
            Some(first) => first,
        };
        let mut name = String::from(first);
        let first_code = cat_code_fn(first as u32);
        if first_code == CatCode::Letter {
            while let Some((c, next_pos)) = self.read_char(pos, cat_code_fn) {
                if cat_code_fn(c as u32) != CatCode::Letter {
                    break;
                }
                name.push(c);
                pos = next_pos;
            }
            self.state = State::SkipBlanks;
        } else if first_code == CatCode::Space {
            self.state = State::SkipBlanks;
        } else {
            self.state = State::MidLine;
        }
        self.pos = pos;
        Ok(Token::new_control_sequence(
            interner.get_or_intern(&name),
            key,
        ))
    }

    /// Reads the character at the byte position, applying `^^` notation.
    ///
    /// Returns the character and the position just after it.
    fn read_char<F: Fn(u32) -> CatCode>(&self, pos: usize, cat_code_fn: &F) -> Option<(char, usize)> {
        let mut chars = self.source[pos..].chars();
        let c = chars.next()?;
        let after_c = pos + c.len_utf8();
        if cat_code_fn(c as u32) != CatCode::Superscript {
            return Some((c, after_c));
        }
        let mut lookahead = chars.clone();
        if lookahead.next() != Some(c) {
            return Some((c, after_c));
        }
        let third = match lookahead.next() {
            None => return Some((c, after_c)),
            Some(third) => third,
        };
        let after_third = after_c + c.len_utf8() + third.len_utf8();
        if let Some(fourth) = lookahead.next() {
            if let (Some(high), Some(low)) = (lower_hex_digit(third), lower_hex_digit(fourth)) {
                if let Some(decoded) = char::from_u32(high * 16 + low) {
                    return Some((decoded, after_third + fourth.len_utf8()));
                }
            }
        }
        let code = third as u32;
        if code >= 128 {
            return Some((c, after_c));
        }
        let decoded = if code < 64 { code + 64 } else { code - 64 };
        char::from_u32(decoded).map(|decoded| (decoded, after_third))
    }

    /// Skips to just after the end of the current line.
    ///
    /// `start` is the position of the character that triggered the skip.
    /// A line ends at a carriage return, a newline, or a carriage return followed by a newline.
    /// If the character is itself a line terminator, only that terminator is skipped.
    fn skip_rest_of_line(&mut self, start: usize) {
        let terminator = if self.source[start..].starts_with(['\r', '\n']) {
            Some(start)
        } else {
            self.source[self.pos..]
                .find(['\r', '\n'])
                .map(|i| self.pos + i)
        };
        self.pos = match terminator {
            None => self.source.len(),
            Some(i) if self.source[i..].starts_with("\r\n") => i + 2,
            Some(i) => i + 1,
        };
    }
}

fn lower_hex_digit(c: char) -> Option<u32> {
    match c {
        '0'..='9' | 'a'..='f' => c.to_digit(16),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Debug, PartialEq, Eq)]
    enum TokenOrString {
        Character(char, CatCode),
        ControlSequence(String),
    }
    use TokenOrString::*;

    fn cs(name: &str) -> TokenOrString {
        ControlSequence(name.to_string())
    }

    fn lex(input: &str, overrides: &[(char, CatCode)]) -> Result<Vec<TokenOrString>, Error> {
        let mut map: HashMap<u32, CatCode> = HashMap::new();
        for (c, code) in overrides {
            map.insert(*c as u32, *code);
        }
        let cat_code_fn = |c: u32| map.get(&c).copied().unwrap_or(CatCode::default_for(c));
        let mut interner = CsNameInterner::default();
        let mut lexer = Lexer::new(input.into(), KeyRange::for_testing());
        let mut result = vec![];
        while let Some(token) = lexer.next(cat_code_fn, &mut interner)? {
            result.push(match token.value() {
                Value::CommandRef(crate::token::CommandRef::ControlSequence(name)) => {
                    ControlSequence(interner.resolve(name).unwrap().to_string())
                }
                _ => {
                    let (c, code) = token.char_and_cat_code().unwrap();
                    Character(c, code)
                }
            });
        }
        Ok(result)
    }

    macro_rules! lexer_tests {
        ( $( ($name: ident, $input: expr, $( $expected: expr ),* ), )+ ) => {
            $(
            #[test]
            fn $name() {
                let want: Vec<TokenOrString> = vec![ $( $expected ),* ];
                assert_eq!(lex($input, &[]).unwrap(), want);
            }
            )+
        };
    }

    lexer_tests![
        (
            control_word_skips_trailing_spaces,
            r"\alpha   x",
            cs("alpha"),
            Character('x', CatCode::Letter)
        ),
        (
            control_symbol_keeps_one_space,
            r"\@   x",
            cs("@"),
            Character(' ', CatCode::Space),
            Character('x', CatCode::Letter)
        ),
        (
            control_word_ended_by_digit,
            r"\count1",
            cs("count"),
            Character('1', CatCode::Other)
        ),
        (
            spaces_collapse,
            "a   b",
            Character('a', CatCode::Letter),
            Character(' ', CatCode::Space),
            Character('b', CatCode::Letter)
        ),
        (
            newline_is_a_space,
            "a\nb",
            Character('a', CatCode::Letter),
            Character(' ', CatCode::Space),
            Character('b', CatCode::Letter)
        ),
        (
            blank_line_is_par,
            "a\n\nb",
            Character('a', CatCode::Letter),
            Character(' ', CatCode::Space),
            cs("par"),
            Character('b', CatCode::Letter)
        ),
        (
            many_blank_lines_one_par_each,
            "a\n  \n\nb",
            Character('a', CatCode::Letter),
            Character(' ', CatCode::Space),
            cs("par"),
            cs("par"),
            Character('b', CatCode::Letter)
        ),
        (
            crlf_is_one_end_of_line,
            "a\r\nb",
            Character('a', CatCode::Letter),
            Character(' ', CatCode::Space),
            Character('b', CatCode::Letter)
        ),
        (
            cr_only_line_endings,
            "a\rb\rc",
            Character('a', CatCode::Letter),
            Character(' ', CatCode::Space),
            Character('b', CatCode::Letter),
            Character(' ', CatCode::Space),
            Character('c', CatCode::Letter)
        ),
        (
            cr_only_blank_line_is_par,
            "a\r\rb",
            Character('a', CatCode::Letter),
            Character(' ', CatCode::Space),
            cs("par"),
            Character('b', CatCode::Letter)
        ),
        (
            comment_ends_at_carriage_return,
            "a%x\rb",
            Character('a', CatCode::Letter),
            Character('b', CatCode::Letter)
        ),
        (
            caret_end_of_line_discards_rest_of_line,
            "a^^Mxyz\nb",
            Character('a', CatCode::Letter),
            Character(' ', CatCode::Space),
            Character('b', CatCode::Letter)
        ),
        (
            leading_spaces_on_line_skipped,
            "a\n    b",
            Character('a', CatCode::Letter),
            Character(' ', CatCode::Space),
            Character('b', CatCode::Letter)
        ),
        (
            comment_removes_rest_of_line_and_newline,
            "a% comment\nb",
            Character('a', CatCode::Letter),
            Character('b', CatCode::Letter)
        ),
        (
            comment_then_blank_line,
            "a%\n\nb",
            Character('a', CatCode::Letter),
            cs("par"),
            Character('b', CatCode::Letter)
        ),
        (
            control_word_at_end_of_line,
            "\\relax\nb",
            cs("relax"),
            Character('b', CatCode::Letter)
        ),
        (
            groups_and_specials,
            "{$#&^_~}",
            Character('{', CatCode::BeginGroup),
            Character('$', CatCode::MathShift),
            Character('#', CatCode::Parameter),
            Character('&', CatCode::AlignmentTab),
            Character('^', CatCode::Superscript),
            Character('_', CatCode::Subscript),
            Character('~', CatCode::Active),
            Character('}', CatCode::EndGroup)
        ),
        (
            caret_notation_offset,
            "^^:^^!",
            Character('z', CatCode::Letter),
            Character('a', CatCode::Letter)
        ),
        (
            caret_notation_hex,
            "^^41^^7a",
            Character('A', CatCode::Letter),
            Character('z', CatCode::Letter)
        ),
        (
            caret_in_control_word,
            r"\ab^^63d",
            cs("abcd")
        ),
        (
            single_caret_is_superscript,
            "^x",
            Character('^', CatCode::Superscript),
            Character('x', CatCode::Letter)
        ),
        (ignored_character, "a\u{0}b", Character('a', CatCode::Letter), Character('b', CatCode::Letter)),
        (
            non_ascii_letters,
            r"\café é→",
            cs("café"),
            Character('é', CatCode::Letter),
            Character('→', CatCode::Other)
        ),
    ];

    #[test]
    fn caret_notation_end_of_line_and_invalid() {
        // ^^M is an end of line and ^^? is invalid, so these are not tokens: check the errors.
        assert_eq!(
            lex("^^?", &[]),
            Err(Error::InvalidCharacter('\u{7F}', KeyRange::for_testing().key_at(0)))
        );
        assert_eq!(
            lex("a^^Mb", &[]).unwrap(),
            vec![Character('a', CatCode::Letter), Character(' ', CatCode::Space)]
        );
    }

    #[test]
    fn catcode_overrides() {
        assert_eq!(
            lex(r"\make@letter @", &[('@', CatCode::Letter)]).unwrap(),
            vec![cs("make@letter"), Character('@', CatCode::Letter)]
        );
        assert_eq!(
            lex("[x]", &[('[', CatCode::BeginGroup), (']', CatCode::EndGroup)]).unwrap(),
            vec![
                Character('[', CatCode::BeginGroup),
                Character('x', CatCode::Letter),
                Character(']', CatCode::EndGroup),
            ]
        );
    }

    #[test]
    fn empty_control_sequence() {
        assert_eq!(
            lex("a\\", &[]),
            Err(Error::EmptyControlSequence(KeyRange::for_testing().key_at(1)))
        );
    }

    #[test]
    fn comments_are_retained_when_asked() {
        let mut interner = CsNameInterner::default();
        let mut lexer = Lexer::new("a% first\n%second\nb".into(), KeyRange::for_testing());
        lexer.retain_comments(true);
        let cat_code_fn = CatCode::default_for;
        while lexer.next(cat_code_fn, &mut interner).unwrap().is_some() {}
        let comments: Vec<String> = lexer.take_comments().into_iter().map(|c| c.text).collect();
        assert_eq!(comments, vec![" first".to_string(), "second".to_string()]);
    }
}
