//! Commands that alter the expansion process (`\relax`, `\noexpand`, `\expandafter`)

use texparser::prelude as txl;
use texparser::traits::*;
use texparser::*;

pub const RELAX_DOC: &str = "Do nothing";
pub const NOEXPAND_DOC: &str = "Prevent the next token from being expanded";
pub const EXPANDAFTER_DOC: &str = "Expand the token after the next token, then put the next token back";

/// Get the `\relax` command.
pub fn get_relax<S: ParserState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(relax_fn).with_doc(RELAX_DOC)
}

fn relax_fn<S>(_: token::Token, _: &mut vm::ExecutionInput<S>) -> txl::Result<()> {
    Ok(())
}

/// Get the `\noexpand` command.
///
/// The command only works if the state's [ParserState::expansion_override_hook]
///     calls [noexpand_hook].
pub fn get_noexpand<S: ParserState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_expansion(noexpand_fn)
        .with_tag(NO_EXPAND_TAG.get())
        .with_doc(NOEXPAND_DOC)
}

static NO_EXPAND_TAG: command::StaticTag = command::StaticTag::new();

fn noexpand_fn<S: ParserState>(
    _: token::Token,
    input: &mut vm::ExpansionInput<S>,
) -> txl::Result<()> {
    Err(input.fatal_error(
        error::SimpleFailedPreconditionError::new("\\noexpand ran without the noexpand hook")
            .with_note("the state's expansion_override_hook must call noexpand_hook"),
    ))
}

/// Expansion override hook that implements `\noexpand`.
#[inline]
pub fn noexpand_hook<S: ParserState>(
    token: token::Token,
    input: &mut vm::ExpansionInput<S>,
    tag: Option<command::Tag>,
) -> txl::Result<Option<token::Token>> {
    // Fast path: this is not the \noexpand command.
    if tag != Some(NO_EXPAND_TAG.get()) {
        return Ok(None);
    }
    noexpand_hook_finish(token, input)
}

fn noexpand_hook_finish<S: ParserState>(
    token: token::Token,
    input: &mut vm::ExpansionInput<S>,
) -> txl::Result<Option<token::Token>> {
    match input.unexpanded().next()? {
        None => Err(input.fatal_error(
            error::SimpleTokenError::new(token, "unexpected end of input after \\noexpand")
                .with_kind(error::Kind::EndOfInput)
                .with_note("\\noexpand must be followed by a token"),
        )),
        Some(next) => Ok(Some(next)),
    }
}

/// Get the `\expandafter` command.
pub fn get_expandafter<S: ParserState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_expansion(expandafter_fn).with_doc(EXPANDAFTER_DOC)
}

fn expandafter_fn<S: ParserState>(
    expandafter_token: token::Token,
    input: &mut vm::ExpansionInput<S>,
) -> txl::Result<()> {
    let Some(next) = input.unexpanded().next()? else {
        return Err(input.fatal_error(
            error::SimpleTokenError::new(
                expandafter_token,
                "unexpected end of input while reading the first token after \\expandafter",
            )
            .with_kind(error::Kind::EndOfInput)
            .with_note("\\expandafter must be followed by two tokens"),
        ));
    };
    if input.unexpanded().peek()?.is_none() {
        return Err(input.fatal_error(
            error::SimpleTokenError::new(
                next,
                "unexpected end of input while reading the second token after \\expandafter",
            )
            .with_kind(error::Kind::EndOfInput)
            .with_note("\\expandafter must be followed by two tokens"),
        ));
    }
    input.expanded().expand_once()?;
    input.expansions_mut().push(next);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::def;
    use crate::prefix;
    use std::collections::HashMap;
    use texparser::vm::implement_has_component;
    use texparser_testing::*;

    #[derive(Default)]
    struct State {
        prefix: prefix::Component,
        testing: TestingComponent,
    }

    impl ParserState for State {
        fn expansion_override_hook(
            token: token::Token,
            input: &mut vm::ExpansionInput<Self>,
            tag: Option<command::Tag>,
        ) -> txl::Result<Option<token::Token>> {
            noexpand_hook(token, input, tag)
        }

        fn recoverable_error_hook(
            vm: &vm::VM<Self>,
            recoverable_error: Box<error::Error>,
        ) -> txl::Result<()> {
            TestingComponent::recoverable_error_hook(vm, recoverable_error)
        }
    }

    implement_has_component![State {
        prefix: prefix::Component,
        testing: TestingComponent,
    }];

    fn built_in_commands() -> HashMap<&'static str, command::BuiltIn<State>> {
        HashMap::from([
            ("def", def::get_def()),
            ("edef", def::get_edef()),
            ("expandafter", get_expandafter()),
            ("noexpand", get_noexpand()),
            ("relax", get_relax()),
        ])
    }

    test_suite![
        expansion_equality_tests(
            (relax, r"a\relax b", "ab"),
            (noexpand_character, r"\noexpand a", "a"),
            (
                noexpand_inside_edef,
                r"\def\a{x}\edef\b{\noexpand\a}\def\a{y}\b",
                "y"
            ),
            (
                noexpand_then_relax,
                r"\def\a{x}\edef\b{\noexpand\relax\a}\b",
                "x"
            ),
            (expandafter_character, r"\expandafter a\relax b", "ab"),
            (expandafter_space, r"\expandafter a b", "a b"),
            (
                expandafter_only_expands_once,
                r"\def\a{\b}\def\b{x}\def\c#1{(#1)}\expandafter\c\a",
                r"(x)"
            ),
            (
                expandafter_reorders,
                r"\def\a#1{[#1]}\def\b{B}\expandafter\a\b",
                r"[B]"
            ),
            (
                texbook_exercise_20_5,
                r"\def\a{\b}\def\b{\c}\def\c{C}\def\d#1{(#1)}\expandafter\d\a",
                r"(C)"
            ),
            (
                expandafter_chain,
                r"\def\a#1#2{(#1,#2)}\def\b{B}\def\c{C}\expandafter\expandafter\expandafter\a\expandafter\b\c",
                r"(B,C)"
            ),
        ),
        failure_tests(
            (noexpand_end_of_input, r"\noexpand"),
            (expandafter_end_of_input_1, r"\expandafter"),
            (expandafter_end_of_input_2, r"\expandafter a"),
        ),
    ];
}
