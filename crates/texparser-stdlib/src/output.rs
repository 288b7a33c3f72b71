//! Primitives and handlers that send output to the listener
//!
//! [Handlers] writes characters to the listener with the current typographic settings,
//!     and turns `^`, `_` and `&` into script and alignment events.
//! The commands here (`\par`, `\verb`, `\href`, `\includegraphics`) each map onto one
//!     listener sink.

use crate::catcode;
use std::path::Path;
use texparser::object::Object;
use texparser::prelude as txl;
use texparser::token::{write_tokens, CatCode, Token, Value};
use texparser::traits::*;
use texparser::*;

pub const PAR_DOC: &str = "End the current paragraph";
pub const VERB_DOC: &str = "Typeset text verbatim, like \\verb|text| or \\verb*|text|";
pub const HREF_DOC: &str = "Create a hyperlink, \\href{url}{text}";
pub const INCLUDEGRAPHICS_DOC: &str = "Include a graphic, \\includegraphics[key=value,...]{name}";

/// Handlers that send characters to the listener.
pub struct Handlers;

impl<S: ParserState> vm::Handlers<S> for Handlers {
    fn character_handler(token: Token, input: &mut vm::ExecutionInput<S>) -> txl::Result<()> {
        match token.value() {
            Value::Superscript(_) => script(token, input, true),
            Value::Subscript(_) => script(token, input, false),
            Value::AlignmentTab(_) => {
                input.vm().listener.borrow_mut().tab();
                Ok(())
            }
            Value::Parameter(c) => input.error(
                error::SimpleTokenError::new(
                    token,
                    format!["the macro parameter character {c} cannot be used outside a macro definition"],
                )
                .with_note(format!["to write the character itself, use \\{c}"]),
            ),
            Value::Space(_) => {
                let vm = input.vm();
                if !vm.settings().is_math() {
                    vm.listener.borrow_mut().write(" ", vm.settings());
                }
                Ok(())
            }
            _ => {
                if let Some(c) = token.char() {
                    let vm = input.vm();
                    vm.listener
                        .borrow_mut()
                        .write(c.encode_utf8(&mut [0; 4]), vm.settings());
                }
                Ok(())
            }
        }
    }
}

fn script<S: ParserState>(
    token: Token,
    input: &mut vm::ExecutionInput<S>,
    superscript: bool,
) -> txl::Result<()> {
    let Some(argument) = parse::pop_object(input)? else {
        return Err(input.fatal_error(
            error::SimpleTokenError::new(token, "the input ended before the script's argument")
                .with_kind(error::Kind::EndOfInput)
                .with_note("a script is followed by a single token or a group, like x^2 or x^{10}"),
        ));
    };
    let vm = input.vm();
    let text = match &argument {
        Object::Group(group) => write_tokens(&group.content.tokens, vm.cs_name_interner()),
        other => other.to_text(vm.cs_name_interner()),
    };
    let mut listener = vm.listener.borrow_mut();
    if superscript {
        listener.superscript(&argument, &text);
    } else {
        listener.subscript(&argument, &text);
    }
    Ok(())
}

/// Get the `\par` command.
pub fn get_par<S: ParserState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(par_fn).with_doc(PAR_DOC)
}

fn par_fn<S: ParserState>(_: Token, input: &mut vm::ExecutionInput<S>) -> txl::Result<()> {
    input.vm().listener.borrow_mut().par();
    Ok(())
}

/// Get the `\verb` command.
///
/// The verbatim text is read with every special character made an other character,
///     so `\verb|\foo {|` gives the text `\foo {`.
pub fn get_verb<S: HasComponent<catcode::Component>>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(verb_fn).with_doc(VERB_DOC)
}

fn verb_fn<S: HasComponent<catcode::Component>>(
    token: Token,
    input: &mut vm::ExecutionInput<S>,
) -> txl::Result<()> {
    let starred = parse::pop_modifier(input, '*')?;
    let saved = input.state().component().table().clone();
    let table = input.state_mut().component_mut().table_mut();
    for code_point in 0..128_u32 {
        if !matches!(table.get(code_point), CatCode::Letter | CatCode::Other) {
            table.set(code_point, CatCode::Other);
        }
    }
    let result = read_verbatim(token, input);
    *input.state_mut().component_mut().table_mut() = saved;
    let text = result?;
    input.vm().listener.borrow_mut().verb(&text, starred);
    Ok(())
}

fn read_verbatim<S: ParserState>(
    verb_token: Token,
    input: &mut vm::ExecutionInput<S>,
) -> txl::Result<String> {
    let delimiter = input
        .unexpanded()
        .next_or_err("reading the delimiter of \\verb")?;
    let delimiter_char = match (delimiter.value(), delimiter.char()) {
        (Value::CommandRef(_), _) | (_, None) => {
            return Err(input.fatal_error(
                error::SimpleTokenError::new(delimiter, "\\verb must be followed by a delimiter character")
                    .with_note("the verbatim text is enclosed in two copies of one character, like \\verb|text|"),
            ))
        }
        (_, Some(c)) => c,
    };
    let mut text = String::new();
    loop {
        let token = input
            .unexpanded()
            .next_or_err("reading the verbatim text of \\verb")?;
        match (token.value(), token.char()) {
            // Tokens read before the category codes changed.
            (Value::CommandRef(command_ref), _) => {
                text.push_str(&command_ref.to_string(input.vm().cs_name_interner()))
            }
            (_, Some('\n' | '\r')) => {
                return Err(input.fatal_error(
                    error::SimpleTokenError::new(verb_token, "\\verb ended by the end of the line")
                        .with_kind(error::Kind::EndOfInput)
                        .with_note(format!["the verbatim text must end with {delimiter_char} on the same line"]),
                ))
            }
            (_, Some(c)) if c == delimiter_char => return Ok(text),
            (_, Some(c)) => text.push(c),
            (_, None) => {}
        }
    }
}

/// Get the `\href` command.
pub fn get_href<S: ParserState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(href_fn).with_doc(HREF_DOC)
}

fn href_fn<S: ParserState>(_: Token, input: &mut vm::ExecutionInput<S>) -> txl::Result<()> {
    let url = parse::pop_arg(input)?;
    let url = write_tokens(&url, input.vm().cs_name_interner());
    let text = parse::pop_arg(input)?;
    let text = vm::expand_fully(text, input)?;
    let text = write_tokens(&text, input.vm().cs_name_interner());
    input
        .vm()
        .listener
        .borrow_mut()
        .href(url.trim(), text.trim());
    Ok(())
}

/// Get the `\includegraphics` command.
pub fn get_includegraphics<S: ParserState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(includegraphics_fn).with_doc(INCLUDEGRAPHICS_DOC)
}

fn includegraphics_fn<S: ParserState>(
    _: Token,
    input: &mut vm::ExecutionInput<S>,
) -> txl::Result<()> {
    parse::pop_modifier(input, '*')?;
    let options = match parse::pop_opt_arg(input)? {
        None => vec![],
        Some(tokens) => parse_key_values(&tokens, input.vm().cs_name_interner()),
    };
    let name = parse::pop_label_string(input)?;
    let mut listener = input.vm().listener.borrow_mut();
    listener.includegraphics(&options, &name);
    listener.add_file_reference(Path::new(&name));
    Ok(())
}

/// Splits `key=value` pairs separated by commas.
///
/// Commas inside braces do not separate pairs, and one pair of braces around a value is removed.
/// A key without a value gets the empty string.
fn parse_key_values(tokens: &[Token], interner: &token::CsNameInterner) -> Vec<(String, String)> {
    let mut items: Vec<Vec<Token>> = vec![vec![]];
    let mut depth = 0_usize;
    for token in tokens {
        match token.value() {
            Value::BeginGroup(_) => depth += 1,
            Value::EndGroup(_) => depth = depth.saturating_sub(1),
            Value::Other(',') if depth == 0 => {
                items.push(vec![]);
                continue;
            }
            _ => {}
        }
        if let Some(item) = items.last_mut() {
            item.push(*token);
        }
    }
    items
        .iter()
        .filter_map(|item| {
            let text = write_tokens(item, interner);
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            let (key, value) = text.split_once('=').unwrap_or((text, ""));
            let value = value.trim();
            let value = value
                .strip_prefix('{')
                .and_then(|v| v.strip_suffix('}'))
                .unwrap_or(value);
            Some((key.trim().to_string(), value.to_string()))
        })
        .collect()
}
