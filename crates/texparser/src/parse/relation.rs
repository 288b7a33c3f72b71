//! Parsing of relations (<, = and >)
//!
//! A relation is a character token with category code 12 (other) and value <, = or >.

use crate::prelude as txl;
use crate::traits::*;
use crate::{token, vm};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ordering(pub std::cmp::Ordering);

impl Default for Ordering {
    fn default() -> Self {
        Ordering(std::cmp::Ordering::Equal)
    }
}

impl Ordering {
    /// Whether `lhs` and `rhs` are related by this ordering.
    pub fn holds<T: Ord>(&self, lhs: &T, rhs: &T) -> bool {
        lhs.cmp(rhs) == self.0
    }
}

impl<S: ParserState> Parsable<S> for Ordering {
    fn parse_impl(input: &mut vm::ExpandedStream<S>) -> txl::Result<Self> {
        while get_optional_element![
            input,
            token::Value::Space(_) => (),
        ]
        .is_some()
        {}
        Ok(get_required_element![
            input,
            "a relation",
            format!["a relation is a token with category code {} and one of the following values: <, =, >", token::CatCode::Other],
            token::Value::Other('<') => Ordering(std::cmp::Ordering::Less),
            token::Value::Other('=') => Ordering(std::cmp::Ordering::Equal),
            token::Value::Other('>') => Ordering(std::cmp::Ordering::Greater),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::testing::*;

    parse_success_tests![
        (less_than, r"<a", Ordering(std::cmp::Ordering::Less)),
        (equals, r"=a", Ordering(std::cmp::Ordering::Equal)),
        (greater_than, r">a", Ordering(std::cmp::Ordering::Greater)),
        (leading_spaces, r"  >a", Ordering(std::cmp::Ordering::Greater)),
    ];

    #[derive(Default)]
    struct State;

    impl ParserState for State {
        fn cat_code(&self, code_point: u32) -> token::CatCode {
            if code_point == '<' as u32 {
                return token::CatCode::Letter;
            }
            token::CatCode::default_for(code_point)
        }
    }

    parse_failure_tests![
        Ordering,
        State,
        (empty_input, ""),
        (letter, "a"),
        (control_sequence, r"\A"),
        (incorrect_catcode, "<"),
    ];

    #[test]
    fn holds() {
        assert!(Ordering(std::cmp::Ordering::Less).holds(&1, &2));
        assert!(!Ordering(std::cmp::Ordering::Greater).holds(&1, &2));
    }
}
