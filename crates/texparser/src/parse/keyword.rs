use crate::prelude as txl;
use crate::token;
use crate::traits::*;
use crate::vm;

/// Parses a keyword like `pt` or `by` from the input.
///
/// Spaces before the keyword are skipped.
/// Letters match case insensitively, as in TeX.
/// If the keyword is not found the tokens that were read are put back and false is returned.
pub fn parse_keyword<S: ParserState>(
    input: &mut vm::ExpandedStream<S>,
    keyword: &str,
) -> txl::Result<bool> {
    while get_optional_element![
        input,
        token::Value::Space(_) => (),
    ]
    .is_some()
    {}
    let mut matched: Vec<token::Token> = Vec::with_capacity(keyword.len());
    let mut found = true;
    for want in keyword.chars() {
        let Some(token) = input.next()? else {
            found = false;
            break;
        };
        matched.push(token);
        let is_match = match token.value() {
            token::Value::Letter(c) | token::Value::Other(c) => c.eq_ignore_ascii_case(&want),
            _ => false,
        };
        if !is_match {
            found = false;
            break;
        }
    }
    if found {
        return Ok(true);
    }
    for token in matched.into_iter().rev() {
        input.back(token);
    }
    Ok(false)
}

/// When parsed, this type consumes an optional `by` keyword from the input stream.
pub struct OptionalBy;

impl<S: ParserState> Parsable<S> for OptionalBy {
    fn parse_impl(input: &mut vm::ExpandedStream<S>) -> txl::Result<Self> {
        parse_keyword(input, "by")?;
        Ok(OptionalBy {})
    }
}

/// When parsed, this type consumes an optional equals from the token stream.
pub struct OptionalEquals;

impl<S: ParserState> Parsable<S> for OptionalEquals {
    fn parse_impl(input: &mut vm::ExpandedStream<S>) -> txl::Result<Self> {
        parse_optional_equals(input)?;
        Ok(OptionalEquals {})
    }
}

/// When parsed, this type consumes an optional equals from the token stream without performing expansion.
pub struct OptionalEqualsUnexpanded;

impl<S: ParserState> Parsable<S> for OptionalEqualsUnexpanded {
    fn parse_impl(input: &mut vm::ExpandedStream<S>) -> txl::Result<Self> {
        parse_optional_equals(input.unexpanded())?;
        Ok(OptionalEqualsUnexpanded {})
    }
}

// Optional spaces followed by an optional equals sign.
fn parse_optional_equals<I: TokenStream>(input: &mut I) -> txl::Result<()> {
    while let Some(found_equals) = get_optional_element![
        input,
        token::Value::Other('=') => true,
        token::Value::Space(_) => false,
    ] {
        if found_equals {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::trace;
    use std::collections::HashMap;

    fn run(source: &str, keyword: &str) -> (bool, String) {
        let mut vm = vm::VM::<()>::new(HashMap::new());
        vm.push_source(trace::Origin::String("test".into()), source.into())
            .unwrap();
        let input = vm::ExecutionInput::new(&mut vm);
        let found = parse_keyword(input.expanded(), keyword).unwrap();
        let mut rest = String::new();
        while let Some(token) = input.next().unwrap() {
            rest.extend(token.char());
        }
        (found, rest)
    }

    #[test]
    fn keyword_found() {
        assert_eq!(run("pt1", "pt"), (true, "1".to_string()));
    }

    #[test]
    fn keyword_case_insensitive() {
        assert_eq!(run("  PT1", "pt"), (true, "1".to_string()));
    }

    #[test]
    fn keyword_partial_match_is_restored() {
        assert_eq!(run("px", "pt"), (false, "px".to_string()));
    }

    #[test]
    fn keyword_end_of_input() {
        assert_eq!(run("p", "pt"), (false, "p".to_string()));
    }
}
