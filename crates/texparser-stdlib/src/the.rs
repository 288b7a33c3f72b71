//! Primitives that turn values and tokens into text
//!
//! `\the`, `\number`, `\romannumeral`, `\string`, `\detokenize` and `\meaning` all
//!     expand to character tokens of category other, except that spaces stay spaces.
//! `\csname ... \endcsname` goes the other way and turns characters into a control sequence.

use crate::expansion;
use texparser::object::string_to_tokens;
use texparser::prelude as txl;
use texparser::token::Value;
use texparser::traits::*;
use texparser::*;
use texparser_stdext::collections::scopedmap::Scope;

pub const THE_DOC: &str = "Output the value of a variable as text";
pub const NUMBER_DOC: &str = "Output a number as text";
pub const ROMANNUMERAL_DOC: &str = "Output a number in lowercase roman numerals";
pub const STRING_DOC: &str = "Output a token as text";
pub const DETOKENIZE_DOC: &str = "Output balanced text as text";
pub const CSNAME_DOC: &str = "Build a control sequence from the characters up to \\endcsname";
pub const ENDCSNAME_DOC: &str = "End a control sequence name started by \\csname";
pub const MEANING_DOC: &str = "Output the meaning of a token as text";

/// Get the `\the` expansion primitive.
pub fn get_the<S: ParserState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_expansion(the_primitive_fn).with_doc(THE_DOC)
}

fn the_primitive_fn<S: ParserState>(
    the_token: token::Token,
    input: &mut vm::ExpansionInput<S>,
) -> txl::Result<()> {
    let token = input.next_or_err("reading the argument of \\the")?;
    let command_ref = match token.value() {
        Value::CommandRef(command_ref) => command_ref,
        _ => {
            return Err(input.fatal_error(
                error::SimpleTokenError::new(token, "\\the cannot be applied to a character")
                    .with_kind(error::Kind::TypeMismatch)
                    .with_note("\\the applies to variables, like \\count 0 or \\catcode `\\a"),
            ))
        }
    };
    let command::Command::Variable(cmd) = input.commands_map().get_command(&command_ref).clone()
    else {
        let name = command_ref.to_string(input.vm().cs_name_interner());
        return Err(input.fatal_error(
            error::SimpleTokenError::new(token, format!["\\the cannot be applied to {name}"])
                .with_kind(error::Kind::TypeMismatch)
                .with_note("\\the applies to variables, like \\count 0 or \\catcode `\\a"),
        ));
    };
    let key = the_token.trace_key();
    let tokens = match cmd.value(token, input.expanded())? {
        variable::ValueRef::Int(i) => int_to_tokens(key, *i),
        variable::ValueRef::Dimen(d) => string_to_tokens(&d.to_string(), key),
        variable::ValueRef::CatCode(c) => int_to_tokens(key, c.int() as i32),
        variable::ValueRef::TokenList(tokens) => tokens.clone(),
    };
    input.push_expansion(&tokens);
    Ok(())
}

fn int_to_tokens(key: token::trace::Key, i: i32) -> Vec<token::Token> {
    string_to_tokens(&i.to_string(), key)
}

/// Get the `\number` expansion primitive.
pub fn get_number<S: ParserState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_expansion(number_primitive_fn).with_doc(NUMBER_DOC)
}

fn number_primitive_fn<S: ParserState>(
    token: token::Token,
    input: &mut vm::ExpansionInput<S>,
) -> txl::Result<()> {
    let i = i32::parse(input)?;
    input.push_expansion(&int_to_tokens(token.trace_key(), i));
    Ok(())
}

/// Get the `\romannumeral` expansion primitive.
pub fn get_romannumeral<S: ParserState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_expansion(romannumeral_primitive_fn).with_doc(ROMANNUMERAL_DOC)
}

fn romannumeral_primitive_fn<S: ParserState>(
    token: token::Token,
    input: &mut vm::ExpansionInput<S>,
) -> txl::Result<()> {
    let i = i32::parse(input)?;
    input.push_expansion(&string_to_tokens(&to_roman_numeral(i), token.trace_key()));
    Ok(())
}

/// Non-positive numbers have an empty representation.
fn to_roman_numeral(mut n: i32) -> String {
    const NUMERALS: [(i32, &str); 13] = [
        (1000, "m"),
        (900, "cm"),
        (500, "d"),
        (400, "cd"),
        (100, "c"),
        (90, "xc"),
        (50, "l"),
        (40, "xl"),
        (10, "x"),
        (9, "ix"),
        (5, "v"),
        (4, "iv"),
        (1, "i"),
    ];
    let mut s = String::new();
    for (value, numeral) in NUMERALS {
        while n >= value {
            s.push_str(numeral);
            n -= value;
        }
    }
    s
}

/// Get the `\string` expansion primitive.
pub fn get_string<S: ParserState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_expansion(string_primitive_fn).with_doc(STRING_DOC)
}

fn string_primitive_fn<S: ParserState>(
    token: token::Token,
    input: &mut vm::ExpansionInput<S>,
) -> txl::Result<()> {
    let next = input
        .unexpanded()
        .next_or_err("reading the argument of \\string")?;
    let s = match next.value() {
        Value::CommandRef(command_ref) => command_ref.to_string(input.vm().cs_name_interner()),
        _ => next.char().map(String::from).unwrap_or_default(),
    };
    input.push_expansion(&string_to_tokens(&s, token.trace_key()));
    Ok(())
}

/// Get the `\detokenize` expansion primitive.
pub fn get_detokenize<S: ParserState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_expansion(detokenize_primitive_fn).with_doc(DETOKENIZE_DOC)
}

fn detokenize_primitive_fn<S: ParserState>(
    token: token::Token,
    input: &mut vm::ExpansionInput<S>,
) -> txl::Result<()> {
    let tokens = parse::pop_arg(input)?;
    let s = token::write_tokens(&tokens, input.vm().cs_name_interner());
    input.push_expansion(&string_to_tokens(&s, token.trace_key()));
    Ok(())
}

static ENDCSNAME_TAG: command::StaticTag = command::StaticTag::new();

/// Get the `\csname` expansion primitive.
pub fn get_csname<S: ParserState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_expansion(csname_primitive_fn).with_doc(CSNAME_DOC)
}

/// Get the `\endcsname` command.
pub fn get_endcsname<S: ParserState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(endcsname_primitive_fn)
        .with_tag(ENDCSNAME_TAG.get())
        .with_doc(ENDCSNAME_DOC)
}

fn csname_primitive_fn<S: ParserState>(
    csname_token: token::Token,
    input: &mut vm::ExpansionInput<S>,
) -> txl::Result<()> {
    let mut name = String::new();
    loop {
        let token = input.next_or_err("reading the name after \\csname")?;
        match token.value() {
            Value::CommandRef(command_ref) => {
                if input.commands_map().get_tag(&command_ref) == Some(ENDCSNAME_TAG.get()) {
                    break;
                }
                let found = command_ref.to_string(input.vm().cs_name_interner());
                return Err(input.fatal_error(
                    error::SimpleTokenError::new(
                        token,
                        format!["unexpected command {found} while building a control sequence name"],
                    )
                    .with_note("only character tokens may appear between \\csname and \\endcsname"),
                ));
            }
            _ => {
                if let Some(c) = token.char() {
                    name.push(c);
                }
            }
        }
    }
    let cs_name = input.cs_name_interner_mut().get_or_intern(&name);
    let command_ref = token::CommandRef::ControlSequence(cs_name);
    if !input.commands_map().is_defined(&command_ref) {
        let relax = expansion::get_relax::<S>().cmd().clone();
        input
            .commands_map_mut()
            .insert(command_ref, relax, Scope::Local);
    }
    input.push_expansion(&[token::Token::new_control_sequence(
        cs_name,
        csname_token.trace_key(),
    )]);
    Ok(())
}

fn endcsname_primitive_fn<S: ParserState>(
    token: token::Token,
    input: &mut vm::ExecutionInput<S>,
) -> txl::Result<()> {
    Err(input.fatal_error(
        error::SimpleTokenError::new(token, "extra \\endcsname")
            .with_note("\\endcsname must be preceded by a matching \\csname"),
    ))
}

/// Get the `\meaning` expansion primitive.
pub fn get_meaning<S: ParserState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_expansion(meaning_primitive_fn).with_doc(MEANING_DOC)
}

fn meaning_primitive_fn<S: ParserState>(
    meaning_token: token::Token,
    input: &mut vm::ExpansionInput<S>,
) -> txl::Result<()> {
    let token = input
        .unexpanded()
        .next_or_err("reading the argument of \\meaning")?;
    let meaning = meaning(token, input.vm());
    input.push_expansion(&string_to_tokens(&meaning, meaning_token.trace_key()));
    Ok(())
}

/// Returns the meaning of the token as `\meaning` prints it.
pub fn meaning<S>(token: token::Token, vm: &vm::VM<S>) -> String {
    let interner = vm.cs_name_interner();
    let command_ref = match token.value() {
        Value::CommandRef(command_ref) => command_ref,
        value => return character_meaning(value),
    };
    match vm.commands_map.get_command(&command_ref) {
        command::Command::Macro(texmacro) => texmacro.meaning(interner),
        command::Command::CharacterTokenAlias(value) => character_meaning(*value),
        command::Command::Undefined => "undefined".to_string(),
        cmd => {
            let built_in_name = vm
                .commands_map
                .built_in_commands()
                .iter()
                .filter(|(_, built_in)| built_in.cmd().meaning_eq(cmd))
                .filter_map(|(cs_name, _)| interner.resolve(*cs_name))
                .min();
            match built_in_name {
                Some(name) => format!["\\{name}"],
                None => command_ref.to_string(interner),
            }
        }
    }
}

fn character_meaning(value: Value) -> String {
    let (c, description) = match value {
        Value::BeginGroup(c) => (c, "begin-group character"),
        Value::EndGroup(c) => (c, "end-group character"),
        Value::MathShift(c) => (c, "math shift character"),
        Value::AlignmentTab(c) => (c, "alignment tab character"),
        Value::Parameter(c) => (c, "macro parameter character"),
        Value::Superscript(c) => (c, "superscript character"),
        Value::Subscript(c) => (c, "subscript character"),
        Value::Space(c) => (c, "blank space"),
        Value::Letter(c) => (c, "the letter"),
        Value::Other(c) => (c, "the character"),
        Value::CommandRef(token::CommandRef::ActiveCharacter(c)) => (c, "active character"),
        Value::CommandRef(token::CommandRef::ControlSequence(_)) => return "control sequence".into(),
    };
    format!["{description} {c}"]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{catcode, def, registers};
    use std::collections::HashMap;
    use texparser::token::CatCode;
    use texparser::vm::implement_has_component;
    use texparser_testing::*;

    #[derive(Default)]
    struct State {
        catcode: catcode::Component,
        count: registers::Component<i32, 256>,
        dimen: registers::Component<texparser::types::Dimen, 256>,
        prefix: crate::prefix::Component,
        testing: TestingComponent,
    }

    impl ParserState for State {
        fn cat_code(&self, code_point: u32) -> CatCode {
            catcode::cat_code(self, code_point)
        }

        fn recoverable_error_hook(
            vm: &vm::VM<Self>,
            recoverable_error: Box<error::Error>,
        ) -> txl::Result<()> {
            TestingComponent::recoverable_error_hook(vm, recoverable_error)
        }
    }

    implement_has_component![State {
        catcode: catcode::Component,
        count: registers::Component<i32, 256>,
        dimen: registers::Component<texparser::types::Dimen, 256>,
        prefix: crate::prefix::Component,
        testing: TestingComponent,
    }];

    fn built_in_commands() -> HashMap<&'static str, command::BuiltIn<State>> {
        HashMap::from([
            ("catcode", catcode::get_catcode()),
            ("count", registers::get_count()),
            ("csname", get_csname()),
            ("def", def::get_def()),
            ("detokenize", get_detokenize()),
            ("dimen", registers::get_dimen()),
            ("endcsname", get_endcsname()),
            ("meaning", get_meaning()),
            ("number", get_number()),
            ("relax", expansion::get_relax()),
            ("romannumeral", get_romannumeral()),
            ("string", get_string()),
            ("the", get_the()),
        ])
    }

    #[test]
    fn roman_numerals() {
        assert_eq!(to_roman_numeral(1984), "mcmlxxxiv");
        assert_eq!(to_roman_numeral(14), "xiv");
        assert_eq!(to_roman_numeral(0), "");
        assert_eq!(to_roman_numeral(-5), "");
    }

    test_suite![
        expansion_equality_tests(
            (the_count, r"\count 1 = -42 \the\count 1", r"-42"),
            (the_catcode, r"\the\catcode `\{", r"1"),
            (
                the_dimen,
                r"\dimen 1 = 1.5pt \the\dimen 1",
                r"\detokenize{1.5pt}"
            ),
            (the_dimen_zero, r"\the\dimen 1", r"\detokenize{0.0pt}"),
            (number_base_case, r"\number 42", r"42"),
            (number_leading_zeros, r"\number 0042", r"42"),
            (number_of_variable, r"\count 3 = 7 \number\count 3", r"7"),
            (
                romannumeral_base_case,
                r"\romannumeral 14",
                r"\detokenize{xiv}"
            ),
            (romannumeral_zero, r"\romannumeral 0 x", r"x"),
            (
                string_control_sequence,
                r"\string\foo",
                r"\detokenize{\foo}"
            ),
            (string_character, r"\string a", r"\detokenize{a}"),
            (
                detokenize_macro_body,
                r"\def\a{x}\detokenize{\a y}",
                r"\detokenize{\a y}"
            ),
            (csname_base_case, r"\def\ab{x}\csname ab\endcsname", r"x"),
            (
                csname_expands_contents,
                r"\def\b{b}\def\ab{x}\csname a\b\endcsname",
                r"x"
            ),
            (
                csname_undefined_is_relax,
                r"\csname undefined\endcsname y",
                r"y"
            ),
            (
                meaning_macro,
                r"\def\a#1{(#1)}\meaning\a",
                r"\detokenize{macro:#1->(#1)}"
            ),
            (
                meaning_primitive,
                r"\meaning\number",
                r"\detokenize{\number}"
            ),
            (
                meaning_letter,
                r"\meaning a",
                r"\detokenize{the letter a}"
            ),
            (
                meaning_undefined,
                r"\meaning\undefined",
                r"\detokenize{undefined}"
            ),
        ),
        failure_tests(
            (the_character, r"\the a"),
            (the_macro, r"\def\a{}\the\a"),
            (the_end_of_input, r"\the"),
            (csname_with_command, r"\csname a\count\endcsname"),
            (csname_end_of_input, r"\csname abc"),
            (extra_endcsname, r"\endcsname"),
        ),
    ];
}
