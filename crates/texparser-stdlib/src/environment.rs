//! LaTeX environments
//!
//! `\newenvironment{name}[n][default]{begin code}{end code}` defines two macros,
//!     `\name` holding the begin code and `\endname` holding the end code.
//! `\begin{name}` opens a group and expands `\name`;
//!     `\end{name}` expands `\endname` and then closes the group.
//! The group is closed by the internal command `\@endenvironment{name}`, which checks
//!     that the environment being ended is the one most recently begun.

use crate::newcommand;
use texparser::object::{string_to_tokens, GroupKind};
use texparser::prelude as txl;
use texparser::token::Token;
use texparser::traits::*;
use texparser::*;

pub const NEWENVIRONMENT_DOC: &str = "Define a new environment";
pub const RENEWENVIRONMENT_DOC: &str = "Redefine an existing environment";
pub const BEGIN_DOC: &str = "Begin an environment, \\begin{name}";
pub const END_DOC: &str = "End an environment, \\end{name}";
pub const ENDENVIRONMENT_DOC: &str = "Close the group of an environment";

/// Name of the internal command that closes the group of an environment.
pub const ENDENVIRONMENT: &str = "@endenvironment";

/// Get the `\newenvironment` command.
pub fn get_newenvironment<S: ParserState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(newenvironment_fn).with_doc(NEWENVIRONMENT_DOC)
}

/// Get the `\renewenvironment` command.
pub fn get_renewenvironment<S: ParserState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(renewenvironment_fn).with_doc(RENEWENVIRONMENT_DOC)
}

fn newenvironment_fn<S: ParserState>(
    token: Token,
    input: &mut vm::ExecutionInput<S>,
) -> txl::Result<()> {
    define_environment(token, input, false)
}

fn renewenvironment_fn<S: ParserState>(
    token: Token,
    input: &mut vm::ExecutionInput<S>,
) -> txl::Result<()> {
    define_environment(token, input, true)
}

fn define_environment<S: ParserState>(
    token: Token,
    input: &mut vm::ExecutionInput<S>,
    renew: bool,
) -> txl::Result<()> {
    let short = parse::pop_modifier(input, '*')?;
    let name = pop_environment_name(token, input)?;
    let (num_parameters, default) = newcommand::pop_signature(token, input)?;
    let begin_code = parse::pop_arg(input)?;
    let end_code = parse::pop_arg(input)?;
    let begin = intern(input, &name);
    let end = intern(input, &format!["end{name}"]);
    match (renew, input.commands_map().is_defined(&begin)) {
        (false, true) => {
            input.error(
                error::SimpleTokenError::new(token, format!["environment {name} already defined"])
                    .with_note(r"use \renewenvironment to change the definition of an existing environment"),
            )?;
            return Ok(());
        }
        (true, false) => {
            input.error(
                error::SimpleTokenError::new(token, format!["environment {name} is not defined"])
                    .with_kind(error::Kind::UndefinedCommand)
                    .with_note(r"use \newenvironment to define a new environment"),
            )?;
        }
        _ => {}
    }
    newcommand::define_macro(token, input, begin, num_parameters, default, begin_code, !short)?;
    newcommand::define_macro(token, input, end, 0, None, end_code, !short)
}

fn pop_environment_name<S: ParserState>(
    token: Token,
    input: &mut vm::ExecutionInput<S>,
) -> txl::Result<String> {
    let name = parse::pop_label_string(input)?;
    if name.is_empty() {
        return Err(input.fatal_error(
            error::SimpleTokenError::new(token, "missing environment name")
                .with_note(r"the name of an environment is given in braces, like \begin{itemize}"),
        ));
    }
    Ok(name)
}

fn intern<S: ParserState>(input: &mut vm::ExecutionInput<S>, name: &str) -> token::CommandRef {
    token::CommandRef::ControlSequence(input.cs_name_interner_mut().get_or_intern(name))
}

/// Get the `\begin` command.
pub fn get_begin<S: ParserState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(begin_fn).with_doc(BEGIN_DOC)
}

fn begin_fn<S: ParserState>(token: Token, input: &mut vm::ExecutionInput<S>) -> txl::Result<()> {
    let name = pop_environment_name(token, input)?;
    let begin = intern(input, &name);
    input.begin_group(GroupKind::Environment(name.clone()), token);
    if input.commands_map().is_defined(&begin) {
        input.push_expansion(&[Token::new_command_ref(begin, token.trace_key())]);
        return Ok(());
    }
    // The group stays open so that the matching \end still balances.
    input.error(
        error::SimpleTokenError::new(token, format!["environment {name} is not defined"])
            .with_kind(error::Kind::UndefinedCommand),
    )
}

/// Get the `\end` command.
pub fn get_end<S: ParserState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(end_fn).with_doc(END_DOC)
}

fn end_fn<S: ParserState>(token: Token, input: &mut vm::ExecutionInput<S>) -> txl::Result<()> {
    let name = pop_environment_name(token, input)?;
    let end = intern(input, &format!["end{name}"]);
    let close = input.cs_name_interner_mut().get_or_intern(ENDENVIRONMENT);
    let key = token.trace_key();
    let mut expansion = Vec::with_capacity(name.len() + 4);
    if input.commands_map().is_defined(&end) {
        expansion.push(Token::new_command_ref(end, key));
    }
    expansion.push(Token::new_control_sequence(close, key));
    expansion.push(Token::new_begin_group('{', key));
    expansion.extend(string_to_tokens(&name, key));
    expansion.push(Token::new_end_group('}', key));
    input.push_expansion(&expansion);
    Ok(())
}

/// Get the `\@endenvironment` command.
pub fn get_endenvironment<S: ParserState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(endenvironment_fn).with_doc(ENDENVIRONMENT_DOC)
}

fn endenvironment_fn<S: ParserState>(
    token: Token,
    input: &mut vm::ExecutionInput<S>,
) -> txl::Result<()> {
    let name = pop_environment_name(token, input)?;
    if let Some(GroupKind::Environment(open)) = input.groups().last().map(|group| &group.kind) {
        if *open != name {
            return Err(input.fatal_error(
                error::SimpleTokenError::new(token, format![r"\begin{{{open}}} ended by \end{{{name}}}"])
                    .with_kind(error::Kind::UnbalancedGroup)
                    .with_note(format![r"the innermost open environment must be closed with \end{{{open}}}"]),
            ));
        }
    }
    input.end_group(GroupKind::Environment(name), token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{def, newcommand, prefix};
    use std::collections::HashMap;
    use texparser::vm::implement_has_component;
    use texparser_testing::*;

    #[derive(Default)]
    struct State {
        prefix: prefix::Component,
        testing: TestingComponent,
    }

    impl ParserState for State {
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
            ("@endenvironment", get_endenvironment()),
            ("@testopt", newcommand::get_testopt()),
            ("begin", get_begin()),
            ("def", def::get_def()),
            ("end", get_end()),
            ("newenvironment", get_newenvironment()),
            ("renewenvironment", get_renewenvironment()),
        ])
    }

    #[test]
    fn listener_sees_environment_group() {
        let events = run_listener_test::<State, vm::DefaultHandlers>(
            r"\newenvironment{foo}{}{}\begin{foo}\end{foo}",
            &[TestOption::BuiltInCommands(built_in_commands)],
        );
        assert_eq!(
            events,
            vec![
                Event::BeginParse,
                Event::BeginGroup(GroupKind::Environment("foo".into())),
                Event::EndGroup(GroupKind::Environment("foo".into())),
                Event::EndParse,
            ]
        );
    }

    test_suite![
        expansion_equality_tests(
            (
                begin_and_end_code,
                r"\newenvironment{foo}{(}{)}\begin{foo}x\end{foo}",
                "(x)"
            ),
            (
                environment_is_a_group,
                r"\def\a{o}\newenvironment{foo}{\def\a{i}}{}\begin{foo}\a\end{foo}\a",
                "io"
            ),
            (
                end_code_runs_inside_the_group,
                r"\def\a{o}\newenvironment{foo}{\def\a{i}}{\a}\begin{foo}\end{foo}\a",
                "io"
            ),
            (
                with_argument,
                r"\newenvironment{foo}[1]{(#1}{)}\begin{foo}{a}b\end{foo}",
                "(ab)"
            ),
            (
                with_default_argument,
                r"\newenvironment{foo}[1][d]{(#1}{)}\begin{foo}b\end{foo}",
                "(db)"
            ),
            (
                with_given_optional_argument,
                r"\newenvironment{foo}[1][d]{(#1}{)}\begin{foo}[e]b\end{foo}",
                "(eb)"
            ),
            (
                nested,
                r"\newenvironment{a}{(}{)}\newenvironment{b}{[}{]}\begin{a}\begin{b}x\end{b}\end{a}",
                "([x])"
            ),
            (
                name_with_star,
                r"\newenvironment{a*}{(}{)}\begin{a*}x\end{a*}",
                "(x)"
            ),
            (
                renewenvironment,
                r"\newenvironment{a}{x}{}\renewenvironment{a}{y}{}\begin{a}\end{a}",
                "y"
            ),
            (
                environment_from_def,
                r"\def\foo{(}\begin{foo}x\end{foo}",
                "(x"
            ),
        ),
        recoverable_failure_tests(
            (undefined_environment, r"\begin{a}x\end{a}", "x"),
            (
                newenvironment_already_defined,
                r"\newenvironment{a}{x}{}\newenvironment{a}{y}{}\begin{a}\end{a}",
                "x"
            ),
            (
                renewenvironment_undefined,
                r"\renewenvironment{a}{y}{}\begin{a}\end{a}",
                "y"
            ),
        ),
        failure_tests(
            (
                mismatched_names,
                r"\newenvironment{a}{}{}\newenvironment{b}{}{}\begin{a}\begin{b}\end{a}"
            ),
            (end_without_begin, r"\newenvironment{a}{}{}\end{a}"),
            (unclosed_environment, r"\newenvironment{a}{}{}\begin{a}"),
            (brace_closes_environment, r"\newenvironment{a}{}{}\begin{a}}"),
            (missing_name, r"\begin{}"),
            (parameter_in_end_code, r"\newenvironment{a}[1]{}{#1}"),
        ),
    ];
}
