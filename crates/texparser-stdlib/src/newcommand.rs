//! LaTeX command definitions: `\newcommand`, `\renewcommand` and `\providecommand`
//!
//! `\newcommand{\name}[n][default]{body}` defines a macro with `n` undelimited parameters.
//! The starred form defines a short macro, whose arguments may not contain `\par`.
//!
//! When a default is given the first parameter becomes optional.
//! This is implemented the way LaTeX does it: `\name` expands to
//!     `\@testopt \\name {default}`, where `\\name` is an internal macro whose first
//!     parameter is delimited by square brackets.
//! `\@testopt` inserts `[default]` when the next token is not `[`.

use crate::def;
use texparser::prelude as txl;
use texparser::texmacro::{Macro, Parameter, Replacement};
use texparser::token::{write_tokens, Token, Value};
use texparser::traits::*;
use texparser::*;
use texparser_stdext::algorithms::substringsearch::Matcher;
use texparser_stdext::collections::scopedmap::Scope;

pub const NEWCOMMAND_DOC: &str = "Define a new command; it is an error if the command already exists";
pub const RENEWCOMMAND_DOC: &str = "Redefine an existing command";
pub const PROVIDECOMMAND_DOC: &str = "Define a command if it does not already exist";
pub const TESTOPT_DOC: &str = "Insert a default optional argument if none follows";

/// Name of the internal command that inserts default optional arguments.
pub const TESTOPT: &str = "@testopt";

#[derive(Clone, Copy, PartialEq, Eq)]
enum Policy {
    New,
    Renew,
    Provide,
}

/// Get the `\newcommand` command.
pub fn get_newcommand<S: ParserState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(newcommand_fn).with_doc(NEWCOMMAND_DOC)
}

/// Get the `\renewcommand` command.
pub fn get_renewcommand<S: ParserState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(renewcommand_fn).with_doc(RENEWCOMMAND_DOC)
}

/// Get the `\providecommand` command.
pub fn get_providecommand<S: ParserState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(providecommand_fn).with_doc(PROVIDECOMMAND_DOC)
}

fn newcommand_fn<S: ParserState>(
    token: token::Token,
    input: &mut vm::ExecutionInput<S>,
) -> txl::Result<()> {
    define_command(token, input, Policy::New)
}

fn renewcommand_fn<S: ParserState>(
    token: token::Token,
    input: &mut vm::ExecutionInput<S>,
) -> txl::Result<()> {
    define_command(token, input, Policy::Renew)
}

fn providecommand_fn<S: ParserState>(
    token: token::Token,
    input: &mut vm::ExecutionInput<S>,
) -> txl::Result<()> {
    define_command(token, input, Policy::Provide)
}

fn define_command<S: ParserState>(
    token: token::Token,
    input: &mut vm::ExecutionInput<S>,
    policy: Policy,
) -> txl::Result<()> {
    let short = parse::pop_modifier(input, '*')?;
    let name = pop_command_name(token, input)?;
    let (num_parameters, default) = pop_signature(token, input)?;
    let body = parse::pop_arg(input)?;
    let defined = input.commands_map().is_defined(&name);
    match (policy, defined) {
        (Policy::New, true) => {
            let name = name.to_string(input.vm().cs_name_interner());
            input.error(
                error::SimpleTokenError::new(token, format!["command {name} already defined"])
                    .with_note(r"use \renewcommand to change the definition of an existing command"),
            )?;
            return Ok(());
        }
        (Policy::Renew, false) => {
            let name = name.to_string(input.vm().cs_name_interner());
            input.error(
                error::SimpleTokenError::new(token, format!["command {name} is not defined"])
                    .with_kind(error::Kind::UndefinedCommand)
                    .with_note(r"use \newcommand to define a new command"),
            )?;
        }
        (Policy::Provide, true) => return Ok(()),
        _ => {}
    }
    define_macro(token, input, name, num_parameters, default, body, !short)
}

fn pop_command_name<S: ParserState>(
    token: token::Token,
    input: &mut vm::ExecutionInput<S>,
) -> txl::Result<token::CommandRef> {
    let tokens = parse::pop_arg(input)?;
    if let [name] = tokens.as_slice() {
        if let Some(command_ref) = name.command_ref() {
            return Ok(command_ref);
        }
    }
    let got = tokens.first().copied().unwrap_or(token);
    Err(input.fatal_error(parse::Error::new(
        input.vm(),
        "a control sequence",
        Some(got),
        r"the name of a command is a single control sequence, like \newcommand{\foo}{...}",
    )))
}

/// Pops the optional number of parameters and the optional default of the first parameter.
pub(crate) fn pop_signature<S: ParserState>(
    token: token::Token,
    input: &mut vm::ExecutionInput<S>,
) -> txl::Result<(usize, Option<Vec<Token>>)> {
    let num_parameters = match parse::pop_opt_arg(input)? {
        None => 0,
        Some(tokens) => {
            let text = write_tokens(&tokens, input.vm().cs_name_interner());
            match text.trim().parse::<usize>() {
                Ok(n) if n <= 9 => n,
                _ => {
                    let got = tokens.first().copied().unwrap_or(token);
                    return Err(input.fatal_error(
                        error::SimpleTokenError::new(got, "invalid number of parameters")
                            .with_note("the number of parameters is a number between 0 and 9, like [2]"),
                    ));
                }
            }
        }
    };
    let default = match num_parameters {
        0 => None,
        _ => parse::pop_opt_arg(input)?,
    };
    Ok((num_parameters, default))
}

/// Defines a macro with `num_parameters` undelimited parameters, the first optional
///     if a default is provided.
pub(crate) fn define_macro<S: ParserState>(
    token: token::Token,
    input: &mut vm::ExecutionInput<S>,
    name: token::CommandRef,
    num_parameters: usize,
    default: Option<Vec<Token>>,
    body: Vec<Token>,
    long: bool,
) -> txl::Result<()> {
    let replacement = def::build_replacement(input, body, num_parameters)?;
    let Some(default) = default else {
        let parameters = vec![Parameter::Undelimited; num_parameters];
        let user_defined_macro = Macro::new(vec![], parameters, replacement).with_long(long);
        input
            .commands_map_mut()
            .insert_macro(name, user_defined_macro, Scope::Local);
        return Ok(());
    };
    let key = token.trace_key();
    let inner_name = name.to_string(input.vm().cs_name_interner());
    let inner = token::CommandRef::ControlSequence(
        input.cs_name_interner_mut().get_or_intern(&inner_name),
    );
    let mut parameters = vec![Parameter::Delimited(Matcher::new(vec![Value::Other(']')]))];
    parameters.extend(vec![Parameter::Undelimited; num_parameters.saturating_sub(1)]);
    let inner_macro =
        Macro::new(vec![Token::new_other('[', key)], parameters, replacement).with_long(long);

    let testopt = input.cs_name_interner_mut().get_or_intern(TESTOPT);
    let mut outer = vec![
        Token::new_control_sequence(testopt, key),
        Token::new_command_ref(inner, key),
        Token::new_begin_group('{', key),
    ];
    outer.extend(default);
    outer.push(Token::new_end_group('}', key));
    let outer_macro = Macro::new(vec![], vec![], vec![Replacement::Tokens(outer)]);

    let commands_map = input.commands_map_mut();
    commands_map.insert_macro(inner, inner_macro, Scope::Local);
    commands_map.insert_macro(name, outer_macro, Scope::Local);
    Ok(())
}

/// Get the `\@testopt` expansion primitive.
///
/// `\@testopt \cmd {default}` expands to `\cmd` if the next token is `[`,
///     and to `\cmd[{default}]` otherwise.
pub fn get_testopt<S: ParserState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_expansion(testopt_fn).with_doc(TESTOPT_DOC)
}

fn testopt_fn<S: ParserState>(
    token: token::Token,
    input: &mut vm::ExpansionInput<S>,
) -> txl::Result<()> {
    let target = parse::pop_arg(input)?;
    let default = parse::pop_arg(input)?;
    let has_optional = loop {
        match input.unexpanded().peek()? {
            Some(next) if matches!(next.value(), Value::Space(_)) => {
                input.unexpanded().consume()?;
            }
            Some(next) => break next.value() == Value::Other('['),
            None => break false,
        }
    };
    let key = token.trace_key();
    let mut expansion = target;
    if !has_optional {
        expansion.push(Token::new_other('[', key));
        expansion.push(Token::new_begin_group('{', key));
        expansion.extend(default);
        expansion.push(Token::new_end_group('}', key));
        expansion.push(Token::new_other(']', key));
    }
    input.push_expansion(&expansion);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{def, output, prefix, the};
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
            ("@testopt", get_testopt()),
            ("def", def::get_def()),
            ("detokenize", the::get_detokenize()),
            ("meaning", the::get_meaning()),
            ("newcommand", get_newcommand()),
            ("par", output::get_par()),
            ("providecommand", get_providecommand()),
            ("renewcommand", get_renewcommand()),
        ])
    }

    test_suite![
        expansion_equality_tests(
            (no_parameters, r"\newcommand\a{x}\a", "x"),
            (braced_name, r"\newcommand{\a}{x}\a", "x"),
            (two_parameters, r"\newcommand{\a}[2]{#2#1}\a xy", "yx"),
            (
                default_used,
                r"\newcommand{\a}[2][d]{(#1,#2)}\a{y}",
                "(d,y)"
            ),
            (
                default_overridden,
                r"\newcommand{\a}[2][d]{(#1,#2)}\a[o]{y}",
                "(o,y)"
            ),
            (
                default_with_one_parameter,
                r"\newcommand{\a}[1][d]{(#1)}\a\a[e]",
                "(d)(e)"
            ),
            (empty_default, r"\newcommand{\a}[1][]{(#1)}\a", "()"),
            (long_by_default, r"\newcommand\a[1]{x#1y}\a{\par}", "xy"),
            (
                defined_locally,
                r"{\newcommand\a{x}}\providecommand\a{y}\a",
                "y"
            ),
            (
                renewcommand,
                r"\newcommand\a{x}\renewcommand\a{y}\a",
                "y"
            ),
            (
                providecommand_keeps_existing,
                r"\newcommand\a{x}\providecommand\a{y}\a",
                "x"
            ),
            (providecommand_defines, r"\providecommand\a{y}\a", "y"),
            (
                meaning_of_simple_command,
                r"\newcommand\a[1]{(#1)}\meaning\a",
                r"\detokenize{\long macro:#1->(#1)}"
            ),
            (
                meaning_of_short_command,
                r"\newcommand*\a[1]{(#1)}\meaning\a",
                r"\detokenize{macro:#1->(#1)}"
            ),
        ),
        recoverable_failure_tests(
            (
                newcommand_already_defined,
                r"\newcommand\a{x}\newcommand\a{y}\a",
                "x"
            ),
            (renewcommand_undefined, r"\renewcommand\a{y}\a", "y"),
        ),
        failure_tests(
            (name_is_not_a_command, r"\newcommand{ab}{x}"),
            (name_is_two_tokens, r"\newcommand{\a\b}{x}"),
            (bad_number_of_parameters, r"\newcommand\a[x]{y}"),
            (too_many_parameters, r"\newcommand\a[10]{y}"),
            (parameter_out_of_range, r"\newcommand\a[1]{#2}"),
            (short_command_rejects_par, r"\newcommand*\a[1]{#1}\a{\par}"),
            (end_of_input, r"\newcommand\a"),
        ),
    ];
}
