//! Primitives for creating user-defined macros (`\def` and friends)

use crate::prefix;
use texparser::prelude as txl;
use texparser::texmacro::{Macro, Parameter, Replacement};
use texparser::token::Value;
use texparser::traits::*;
use texparser::*;
use texparser_stdext::algorithms::substringsearch::Matcher;
use texparser_stdext::collections::scopedmap::Scope;

pub const DEF_DOC: &str = "Define a custom macro";
pub const GDEF_DOC: &str = "Define a custom macro globally";
pub const EDEF_DOC: &str = "Define a custom macro, fully expanding the replacement text first";
pub const XDEF_DOC: &str = "Define a custom macro globally, fully expanding the replacement text first";

static DEF_TAG: command::StaticTag = command::StaticTag::new();

/// Tag shared by `\def`, `\gdef`, `\edef` and `\xdef`.
pub fn def_tag() -> command::Tag {
    DEF_TAG.get()
}

/// Get the `\def` command.
pub fn get_def<S: HasComponent<prefix::Component>>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(def_primitive_fn)
        .with_tag(def_tag())
        .with_doc(DEF_DOC)
}

/// Get the `\gdef` command.
pub fn get_gdef<S: HasComponent<prefix::Component>>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(gdef_primitive_fn)
        .with_tag(def_tag())
        .with_doc(GDEF_DOC)
}

/// Get the `\edef` command.
pub fn get_edef<S: HasComponent<prefix::Component>>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(edef_primitive_fn)
        .with_tag(def_tag())
        .with_doc(EDEF_DOC)
}

/// Get the `\xdef` command.
pub fn get_xdef<S: HasComponent<prefix::Component>>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(xdef_primitive_fn)
        .with_tag(def_tag())
        .with_doc(XDEF_DOC)
}

fn def_primitive_fn<S: HasComponent<prefix::Component>>(
    def_token: token::Token,
    input: &mut vm::ExecutionInput<S>,
) -> txl::Result<()> {
    parse_and_set_macro(def_token, input, false, false)
}

fn gdef_primitive_fn<S: HasComponent<prefix::Component>>(
    def_token: token::Token,
    input: &mut vm::ExecutionInput<S>,
) -> txl::Result<()> {
    parse_and_set_macro(def_token, input, true, false)
}

fn edef_primitive_fn<S: HasComponent<prefix::Component>>(
    def_token: token::Token,
    input: &mut vm::ExecutionInput<S>,
) -> txl::Result<()> {
    parse_and_set_macro(def_token, input, false, true)
}

fn xdef_primitive_fn<S: HasComponent<prefix::Component>>(
    def_token: token::Token,
    input: &mut vm::ExecutionInput<S>,
) -> txl::Result<()> {
    parse_and_set_macro(def_token, input, true, true)
}

fn parse_and_set_macro<S: HasComponent<prefix::Component>>(
    _: token::Token,
    input: &mut vm::ExecutionInput<S>,
    set_globally_override: bool,
    expand_replacement_text: bool,
) -> txl::Result<()> {
    let component = input.state_mut().component_mut();
    let mut scope = component.take_scope();
    let long = component.take_long();
    let protected = component.take_protected();
    if set_globally_override {
        scope = Scope::Global;
    }
    let name = token::CommandRef::parse(input)?;
    let (prefix, raw_parameters, open_token, replacement_end_token) =
        parse_prefix_and_parameters(input.unexpanded())?;
    let parameters: Vec<Parameter> = raw_parameters
        .into_iter()
        .map(|delimiter| match delimiter {
            None => Parameter::Undelimited,
            Some(tokens) => Parameter::Delimited(Matcher::new(
                tokens.into_iter().map(|t| t.value()).collect(),
            )),
        })
        .collect();
    let mut replacement_text = vec![];
    parse::finish_parsing_balanced_tokens(input.unexpanded(), open_token, &mut replacement_text)?;
    if expand_replacement_text {
        replacement_text = vm::expand_fully(replacement_text, input)?;
    }
    let mut replacement = build_replacement(input, replacement_text, parameters.len())?;
    if let Some(final_token) = replacement_end_token {
        match replacement.last_mut() {
            Some(Replacement::Tokens(tokens)) => tokens.push(final_token),
            _ => replacement.push(Replacement::Tokens(vec![final_token])),
        }
    }
    let user_defined_macro = Macro::new(prefix, parameters, replacement)
        .with_long(long)
        .with_protected(protected);
    input
        .commands_map_mut()
        .insert_macro(name, user_defined_macro, scope);
    Ok(())
}

const PARAMETER_NOTE: &str =
    "a parameter token must be followed by a single digit number, another parameter token, or a begin group token {";

/// Returns the prefix, the delimiters of each parameter, the token that opened
///     the replacement text and, under the `#{` rule, the token to append to the replacement text.
#[allow(clippy::type_complexity)]
fn parse_prefix_and_parameters<S: ParserState>(
    input: &mut vm::UnexpandedStream<S>,
) -> txl::Result<(
    Vec<token::Token>,
    Vec<Option<Vec<token::Token>>>,
    token::Token,
    Option<token::Token>,
)> {
    let mut prefix = Vec::new();
    let mut parameters: Vec<Option<Vec<token::Token>>> = Vec::new();
    let push = |prefix: &mut Vec<token::Token>,
                parameters: &mut Vec<Option<Vec<token::Token>>>,
                token: token::Token| match parameters.last_mut() {
        None => prefix.push(token),
        Some(delimiter) => delimiter.get_or_insert_with(Vec::new).push(token),
    };
    loop {
        let token = input.next_or_err("reading the parameter text of a macro")?;
        match token.value() {
            Value::BeginGroup(_) => {
                return Ok((prefix, parameters, token, None));
            }
            Value::EndGroup(_) => {
                return Err(input.fatal_error(
                    error::SimpleTokenError::new(
                        token,
                        "unexpected end group token while parsing the parameter text of a macro",
                    )
                    .with_note("the parameter text of a macro must end with a begin group token {"),
                ));
            }
            Value::Parameter(_) => {
                let parameter_token = input.next_or_err("reading the token after a parameter token")?;
                match parameter_token.value() {
                    Value::BeginGroup(_) => {
                        // the #{ rule: the brace is both a delimiter and the start of the replacement
                        push(&mut prefix, &mut parameters, parameter_token);
                        return Ok((prefix, parameters, parameter_token, Some(parameter_token)));
                    }
                    Value::CommandRef(_) => {
                        return Err(input.fatal_error(
                            error::SimpleTokenError::new(
                                parameter_token,
                                "unexpected control sequence after a parameter token",
                            )
                            .with_note(PARAMETER_NOTE),
                        ));
                    }
                    _ => {
                        let index = parameter_token.char().and_then(char_to_parameter_index);
                        let Some(index) = index else {
                            return Err(input.fatal_error(
                                error::SimpleTokenError::new(
                                    parameter_token,
                                    "unexpected character after a parameter token",
                                )
                                .with_note(PARAMETER_NOTE),
                            ));
                        };
                        if index != parameters.len() {
                            return Err(input.fatal_error(
                                error::SimpleTokenError::new(
                                    parameter_token,
                                    format!["unexpected parameter number {}", index + 1],
                                )
                                .with_note(format![
                                    "this macro has {} parameter(s) so far, so parameter number #{} was expected",
                                    parameters.len(),
                                    parameters.len() + 1
                                ]),
                            ));
                        }
                        parameters.push(None);
                    }
                }
            }
            _ => push(&mut prefix, &mut parameters, token),
        }
    }
}

fn char_to_parameter_index(c: char) -> Option<usize> {
    match c {
        '1'..='9' => Some(c as usize - '1' as usize),
        _ => None,
    }
}

/// Splits the replacement text into tokens and parameter references.
///
/// `##` becomes a single parameter token.
pub(crate) fn build_replacement<S: ParserState>(
    input: &vm::ExecutionInput<S>,
    replacement_text: Vec<token::Token>,
    num_parameters: usize,
) -> txl::Result<Vec<Replacement>> {
    let mut result = vec![];
    let push = |result: &mut Vec<Replacement>, token| match result.last_mut() {
        Some(Replacement::Tokens(tokens)) => {
            tokens.push(token);
        }
        _ => {
            result.push(Replacement::Tokens(vec![token]));
        }
    };
    let mut iter = replacement_text.into_iter();
    while let Some(token) = iter.next() {
        if !matches!(token.value(), Value::Parameter(_)) {
            push(&mut result, token);
            continue;
        }
        let Some(parameter_token) = iter.next() else {
            return Err(input.fatal_error(
                error::SimpleTokenError::new(
                    token,
                    "a parameter token at the end of the replacement text must be followed by a number",
                )
                .with_note("to include a literal parameter token, write ##"),
            ));
        };
        if let Value::Parameter(_) = parameter_token.value() {
            push(&mut result, parameter_token);
            continue;
        }
        let index = match parameter_token.value() {
            Value::CommandRef(_) => None,
            _ => parameter_token.char().and_then(char_to_parameter_index),
        };
        match index {
            Some(index) if index < num_parameters => {
                result.push(Replacement::Parameter(index));
            }
            _ => {
                let expected = match num_parameters {
                    0 => "no parameter number, because this macro has 0 parameters".to_string(),
                    1 => "the number 1, because this macro has only 1 parameter".to_string(),
                    n => format!["a number between 1 and {n} inclusive, because this macro has {n} parameters"],
                };
                return Err(input.fatal_error(
                    error::SimpleTokenError::new(
                        parameter_token,
                        "unexpected token while reading a parameter number",
                    )
                    .with_note(format!["expected {expected}"]),
                ));
            }
        }
    }
    Ok(result)
}
