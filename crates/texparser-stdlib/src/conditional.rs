//! Conditional primitives (if, else, fi, and switch) and `\newif`
//!
//! A conditional is an expansion command.
//! When it evaluates to true it records an open branch and expands to nothing,
//!     so that the true branch is read next.
//! When it evaluates to false it skips the true branch without expanding it,
//!     up to the matching `\else` or `\fi`.
//! Skipping only looks at the tags of commands,
//!     and counts nested conditionals so that their `\else` and `\fi` are skipped too.
//!
//! Every conditional command must be tagged with the if tag returned by [if_tag];
//!     otherwise nesting is miscounted.

use crate::prefix;
use texparser::parse::Ordering;
use texparser::prelude as txl;
use texparser::traits::*;
use texparser::*;

pub const ELSE_DOC: &str = "Start the else branch of a conditional or switch statement";
pub const IFCASE_DOC: &str = "Begin a switch statement";
pub const IFNUM_DOC: &str = "Compare two integers";
pub const IFODD_DOC: &str = "Check if an integer is odd";
pub const IFTRUE_DOC: &str = "Evaluate the true branch";
pub const IFFALSE_DOC: &str = "Evaluate the false branch";
pub const IFX_DOC: &str = "Check if two tokens have the same meaning";
pub const IFDEFINED_DOC: &str = "Check if a control sequence is defined";
pub const FI_DOC: &str = "End a conditional or switch statement";
pub const OR_DOC: &str = "Begin the next branch of a switch statement";
pub const NEWIF_DOC: &str = "Define a new boolean switch";

/// Component that tracks the conditional branches being expanded.
#[derive(Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Component {
    // Each element is a conditional whose branch is being expanded.
    // Nested conditionals are further up the stack.
    // It is used to verify that \else, \or and \fi tokens are valid.
    #[cfg_attr(feature = "serde", serde(skip))]
    branches: Vec<Branch>,
}

impl Component {
    /// Number of conditionals whose branches are currently being expanded.
    pub fn depth(&self) -> usize {
        self.branches.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BranchKind {
    // The true branch of an if conditional.
    True,
    // The false branch of an if conditional, or the default branch of a switch statement.
    Else,
    // A regular case branch of a switch statement.
    Switch,
}

#[derive(Debug, Clone, Copy)]
struct Branch {
    token: token::Token,
    kind: BranchKind,
}

static IF_TAG: command::StaticTag = command::StaticTag::new();
static ELSE_TAG: command::StaticTag = command::StaticTag::new();
static OR_TAG: command::StaticTag = command::StaticTag::new();
static FI_TAG: command::StaticTag = command::StaticTag::new();
static NEWIF_TAG: command::StaticTag = command::StaticTag::new();

/// Tag shared by every conditional command.
pub fn if_tag() -> command::Tag {
    IF_TAG.get()
}

pub fn newif_tag() -> command::Tag {
    NEWIF_TAG.get()
}

fn push_branch<S: HasComponent<Component>>(
    input: &mut vm::ExpansionInput<S>,
    token: token::Token,
    kind: BranchKind,
) {
    input
        .state_mut()
        .component_mut()
        .branches
        .push(Branch { token, kind });
}

fn pop_branch<S: HasComponent<Component>>(input: &mut vm::ExpansionInput<S>) -> Option<Branch> {
    input.state_mut().component_mut().branches.pop()
}

/// Where skipping stopped.
enum Stop {
    Else,
    Or,
    Fi,
}

// Skips tokens without expanding them until a \fi at depth zero,
// or an \else or \or at depth zero if the corresponding flag is set.
fn skip<S: HasComponent<Component>>(
    original_token: token::Token,
    input: &mut vm::ExpansionInput<S>,
    stop_at_else: bool,
    stop_at_or: bool,
    doing: &str,
) -> txl::Result<Stop> {
    let mut depth: usize = 0;
    while let Some(token) = input.unexpanded().next()? {
        let token::Value::CommandRef(command_ref) = token.value() else {
            continue;
        };
        let Some(tag) = input.commands_map().get_tag(&command_ref) else {
            continue;
        };
        if tag == IF_TAG.get() {
            depth += 1;
        } else if tag == FI_TAG.get() {
            if depth == 0 {
                return Ok(Stop::Fi);
            }
            depth -= 1;
        } else if depth == 0 && stop_at_else && tag == ELSE_TAG.get() {
            return Ok(Stop::Else);
        } else if depth == 0 && stop_at_or && tag == OR_TAG.get() {
            return Ok(Stop::Or);
        }
    }
    Err(input.fatal_error(
        error::SimpleTokenError::new(
            original_token,
            format!["unexpected end of input while {doing}"],
        )
        .with_kind(error::Kind::EndOfInput)
        .with_note("each conditional must be terminated by a \\fi command"),
    ))
}

// Runs when a conditional evaluates to true.
fn true_case<S: HasComponent<Component>>(
    token: token::Token,
    input: &mut vm::ExpansionInput<S>,
) -> txl::Result<()> {
    push_branch(input, token, BranchKind::True);
    Ok(())
}

// Runs when a conditional evaluates to false.
fn false_case<S: HasComponent<Component>>(
    token: token::Token,
    input: &mut vm::ExpansionInput<S>,
) -> txl::Result<()> {
    match skip(token, input, true, false, "skipping the true branch of a conditional")? {
        Stop::Else => push_branch(input, token, BranchKind::Else),
        Stop::Or | Stop::Fi => {}
    }
    Ok(())
}

macro_rules! create_if_primitive {
    ($if_fn: ident, $if_primitive_fn: ident, $get_if: ident, $docs: expr) => {
        fn $if_primitive_fn<S: HasComponent<Component>>(
            token: token::Token,
            input: &mut vm::ExpansionInput<S>,
        ) -> txl::Result<()> {
            match $if_fn(input)? {
                true => true_case(token, input),
                false => false_case(token, input),
            }
        }

        pub fn $get_if<S: HasComponent<Component>>() -> command::BuiltIn<S> {
            command::BuiltIn::new_expansion($if_primitive_fn)
                .with_tag(IF_TAG.get())
                .with_doc($docs)
        }
    };
}

fn if_true<S>(_: &mut vm::ExpansionInput<S>) -> txl::Result<bool> {
    Ok(true)
}

fn if_false<S>(_: &mut vm::ExpansionInput<S>) -> txl::Result<bool> {
    Ok(false)
}

fn if_num<S: ParserState>(input: &mut vm::ExpansionInput<S>) -> txl::Result<bool> {
    let (a, ordering, b) = <(i32, Ordering, i32)>::parse(input)?;
    Ok(ordering.holds(&a, &b))
}

fn if_odd<S: ParserState>(input: &mut vm::ExpansionInput<S>) -> txl::Result<bool> {
    let n = i32::parse(input)?;
    Ok(n % 2 != 0)
}

// Compares the meanings of the next two unexpanded tokens.
fn if_x<S: ParserState>(input: &mut vm::ExpansionInput<S>) -> txl::Result<bool> {
    let a = input
        .unexpanded()
        .next_or_err("reading the first token after \\ifx")?;
    let b = input
        .unexpanded()
        .next_or_err("reading the second token after \\ifx")?;
    let commands_map = input.commands_map();
    let resolve = |token: token::Token| -> Result<command::Command<S>, token::Value> {
        match token.value() {
            token::Value::CommandRef(command_ref) => {
                match commands_map.get_command(&command_ref) {
                    command::Command::CharacterTokenAlias(value) => Err(*value),
                    cmd => Ok(cmd.clone()),
                }
            }
            value => Err(value),
        }
    };
    Ok(match (resolve(a), resolve(b)) {
        (Ok(a), Ok(b)) => a.meaning_eq(&b),
        (Err(a), Err(b)) => a == b,
        _ => false,
    })
}

fn if_defined<S: ParserState>(input: &mut vm::ExpansionInput<S>) -> txl::Result<bool> {
    let token = input
        .unexpanded()
        .next_or_err("reading the token after \\ifdefined")?;
    Ok(match token.value() {
        token::Value::CommandRef(command_ref) => input.commands_map().is_defined(&command_ref),
        _ => true,
    })
}

create_if_primitive![if_true, if_true_primitive_fn, get_iftrue, IFTRUE_DOC];
create_if_primitive![if_false, if_false_primitive_fn, get_iffalse, IFFALSE_DOC];
create_if_primitive![if_num, if_num_primitive_fn, get_ifnum, IFNUM_DOC];
create_if_primitive![if_odd, if_odd_primitive_fn, get_ifodd, IFODD_DOC];
create_if_primitive![if_x, if_x_primitive_fn, get_ifx, IFX_DOC];
create_if_primitive![if_defined, if_defined_primitive_fn, get_ifdefined, IFDEFINED_DOC];

fn if_case_primitive_fn<S: HasComponent<Component>>(
    ifcase_token: token::Token,
    input: &mut vm::ExpansionInput<S>,
) -> txl::Result<()> {
    let mut cases_to_skip = i32::parse(input)?;
    loop {
        if cases_to_skip == 0 {
            push_branch(input, ifcase_token, BranchKind::Switch);
            return Ok(());
        }
        match skip(ifcase_token, input, true, true, "skipping the cases of \\ifcase")? {
            Stop::Or => {
                // Negative cases never match.
                cases_to_skip = cases_to_skip.saturating_sub(1);
            }
            Stop::Else => {
                push_branch(input, ifcase_token, BranchKind::Else);
                return Ok(());
            }
            Stop::Fi => return Ok(()),
        }
    }
}

/// Get the `\ifcase` primitive.
pub fn get_ifcase<S: HasComponent<Component>>() -> command::BuiltIn<S> {
    command::BuiltIn::new_expansion(if_case_primitive_fn)
        .with_tag(IF_TAG.get())
        .with_doc(IFCASE_DOC)
}

fn unexpected_error<S: ParserState>(
    input: &vm::ExpansionInput<S>,
    token: token::Token,
    name: &str,
    note: &str,
) -> Box<error::Error> {
    input.fatal_error(
        error::SimpleTokenError::new(token, format!["unexpected \\{name} command"])
            .with_note(note.to_string()),
    )
}

fn or_primitive_fn<S: HasComponent<Component>>(
    or_token: token::Token,
    input: &mut vm::ExpansionInput<S>,
) -> txl::Result<()> {
    match pop_branch(input) {
        Some(Branch {
            kind: BranchKind::Switch,
            token,
        }) => {
            skip(token, input, false, false, "skipping the remaining cases of \\ifcase")?;
            Ok(())
        }
        other => {
            if let Some(branch) = other {
                push_branch(input, branch.token, branch.kind);
            }
            Err(unexpected_error(
                input,
                or_token,
                "or",
                "an \\or command is only valid inside a case branch of \\ifcase",
            ))
        }
    }
}

/// Get the `\or` primitive.
pub fn get_or<S: HasComponent<Component>>() -> command::BuiltIn<S> {
    command::BuiltIn::new_expansion(or_primitive_fn)
        .with_tag(OR_TAG.get())
        .with_doc(OR_DOC)
}

fn else_primitive_fn<S: HasComponent<Component>>(
    else_token: token::Token,
    input: &mut vm::ExpansionInput<S>,
) -> txl::Result<()> {
    match pop_branch(input) {
        Some(Branch {
            kind: BranchKind::True | BranchKind::Switch,
            token,
        }) => {
            skip(token, input, false, false, "skipping the false branch of a conditional")?;
            Ok(())
        }
        other => {
            if let Some(branch) = other {
                push_branch(input, branch.token, branch.kind);
            }
            Err(unexpected_error(
                input,
                else_token,
                "else",
                "an \\else command is only valid inside the true branch of a conditional",
            ))
        }
    }
}

/// Get the `\else` primitive.
pub fn get_else<S: HasComponent<Component>>() -> command::BuiltIn<S> {
    command::BuiltIn::new_expansion(else_primitive_fn)
        .with_tag(ELSE_TAG.get())
        .with_doc(ELSE_DOC)
}

fn fi_primitive_fn<S: HasComponent<Component>>(
    fi_token: token::Token,
    input: &mut vm::ExpansionInput<S>,
) -> txl::Result<()> {
    match pop_branch(input) {
        Some(_) => Ok(()),
        None => Err(unexpected_error(
            input,
            fi_token,
            "fi",
            "a \\fi command is only valid after a conditional",
        )),
    }
}

/// Get the `\fi` primitive.
pub fn get_fi<S: HasComponent<Component>>() -> command::BuiltIn<S> {
    command::BuiltIn::new_expansion(fi_primitive_fn)
        .with_tag(FI_TAG.get())
        .with_doc(FI_DOC)
}

/// Get the `\newif` command.
///
/// `\newif\iffoo` defines `\iffoo` as false, along with the macros `\footrue` and `\foofalse`
///     which expand to `\let\iffoo\iftrue` and `\let\iffoo\iffalse`.
pub fn get_newif<S>() -> command::BuiltIn<S>
where
    S: HasComponent<Component> + HasComponent<prefix::Component>,
{
    command::BuiltIn::new_execution(newif_primitive_fn)
        .with_tag(NEWIF_TAG.get())
        .with_doc(NEWIF_DOC)
}

fn newif_primitive_fn<S>(newif_token: token::Token, input: &mut vm::ExecutionInput<S>) -> txl::Result<()>
where
    S: HasComponent<Component> + HasComponent<prefix::Component>,
{
    let scope = HasComponent::<prefix::Component>::component_mut(input.state_mut()).take_scope();
    let command_ref = token::CommandRef::parse(input)?;
    let name = match command_ref {
        token::CommandRef::ControlSequence(cs_name) => input
            .vm()
            .cs_name_interner()
            .resolve(cs_name)
            .and_then(|name| name.strip_prefix("if"))
            .filter(|suffix| !suffix.is_empty())
            .map(str::to_string),
        token::CommandRef::ActiveCharacter(_) => None,
    };
    let Some(name) = name else {
        let cs = command_ref.to_string(input.vm().cs_name_interner());
        return Err(input.fatal_error(
            error::SimpleTokenError::new(newif_token, format!["{cs} is not a valid switch name"])
                .with_note("the name of a switch must begin with `if`, like \\iffoo"),
        ));
    };
    let trace_key = newif_token.trace_key();
    let interner = input.cs_name_interner_mut();
    let let_name = interner.get_or_intern("let");
    let true_name = interner.get_or_intern("iftrue");
    let false_name = interner.get_or_intern("iffalse");
    let setters = [
        (format!["{name}true"], true_name),
        (format!["{name}false"], false_name),
    ];
    for (setter_name, value_name) in setters {
        let setter = input.cs_name_interner_mut().get_or_intern(&setter_name);
        let replacement = vec![
            token::Token::new_control_sequence(let_name, trace_key),
            token::Token::new_command_ref(command_ref, trace_key),
            token::Token::new_control_sequence(value_name, trace_key),
        ];
        let tex_macro = texmacro::Macro::new(
            vec![],
            vec![],
            vec![texmacro::Replacement::Tokens(replacement)],
        );
        input.commands_map_mut().insert_macro(
            token::CommandRef::ControlSequence(setter),
            tex_macro,
            scope,
        );
    }
    input
        .commands_map_mut()
        .insert(command_ref, get_iffalse::<S>().cmd().clone(), scope);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{alias, def, registers, the};
    use std::collections::HashMap;
    use texparser::vm::implement_has_component;
    use texparser_stdext::collections::scopedmap::Scope;
    use texparser_testing::*;

    #[derive(Default)]
    struct State {
        conditional: Component,
        count: registers::Component<i32, 256>,
        prefix: prefix::Component,
        testing: TestingComponent,
    }

    impl ParserState for State {
        fn variable_assignment_scope_hook(state: &mut Self) -> Scope {
            prefix::variable_assignment_scope_hook(state)
        }

        fn recoverable_error_hook(
            vm: &vm::VM<Self>,
            recoverable_error: Box<error::Error>,
        ) -> txl::Result<()> {
            TestingComponent::recoverable_error_hook(vm, recoverable_error)
        }
    }

    implement_has_component![State {
        conditional: Component,
        count: registers::Component<i32, 256>,
        prefix: prefix::Component,
        testing: TestingComponent,
    }];

    fn built_in_commands() -> HashMap<&'static str, command::BuiltIn<State>> {
        HashMap::from([
            ("count", registers::get_count()),
            ("countdef", registers::get_countdef()),
            ("def", def::get_def()),
            ("else", get_else()),
            ("fi", get_fi()),
            ("global", prefix::get_global()),
            ("ifcase", get_ifcase()),
            ("ifdefined", get_ifdefined()),
            ("iffalse", get_iffalse()),
            ("ifnum", get_ifnum()),
            ("ifodd", get_ifodd()),
            ("iftrue", get_iftrue()),
            ("ifx", get_ifx()),
            ("let", alias::get_let()),
            ("newif", get_newif()),
            ("or", get_or()),
            ("the", the::get_the()),
        ])
    }

    test_suite![
        expansion_equality_tests(
            (iftrue_base_case, r"\iftrue a\else b\fi c", "ac"),
            (iftrue_no_else, r"\iftrue a\fi c", "ac"),
            (iffalse_base_case, r"\iffalse a\else b\fi c", "bc"),
            (iffalse_no_else, r"\iffalse a\fi c", "c"),
            (
                iffalse_branch_is_not_expanded,
                r"\def\sentinel{\undefined}\iffalse \sentinel\else b\fi c",
                "bc"
            ),
            (
                iftrue_else_branch_is_not_expanded,
                r"\def\sentinel{\undefined}\iftrue a\else\sentinel\fi c",
                "ac"
            ),
            (
                nested_false_in_false,
                r"\iffalse \iftrue a\else b\fi \else c\fi d",
                "cd"
            ),
            (
                nested_true_in_true,
                r"\iftrue \iffalse a\else b\fi \else c\fi d",
                "bd"
            ),
            (
                nested_in_else,
                r"\iftrue a\else \iftrue b\else c\fi \fi d",
                "ad"
            ),
            (ifnum_less_than_true, r"\ifnum 4<5a\else b\fi c", "ac"),
            (ifnum_less_than_false, r"\ifnum 5<4a\else b\fi c", "bc"),
            (ifnum_equal_true, r"\ifnum 4=4a\else b\fi c", "ac"),
            (ifnum_greater_than_true, r"\ifnum 5>4a\else b\fi c", "ac"),
            (
                ifnum_with_variable,
                r"\count 1 = 7 \ifnum\count 1 > 6 a\else b\fi c",
                "ac"
            ),
            (
                ifnum_with_macro,
                r"\def\n{12}\ifnum\n=12 a\else b\fi c",
                "ac"
            ),
            (ifodd_odd, r"\ifodd 3a\else b\fi c", "ac"),
            (ifodd_even, r"\ifodd 4a\else b\fi c", "bc"),
            (ifodd_negative, r"\ifodd -3a\else b\fi c", "ac"),
            (ifx_same_letter, r"\ifx aay\else n\fi", "y"),
            (ifx_different_letters, r"\ifx aby\else n\fi", "n"),
            (
                ifx_same_macros,
                r"\def\a{x}\def\b{x}\ifx\a\b y\else n\fi",
                "y"
            ),
            (
                ifx_different_macros,
                r"\def\a{x}\def\b{y}\ifx\a\b y\else n\fi",
                "n"
            ),
            (ifx_let_alias, r"\def\a{x}\let\b\a\ifx\a\b y\else n\fi", "y"),
            (ifx_character_alias, r"\let\a=z\ifx\a zy\else n\fi", "y"),
            (ifx_undefined, r"\ifx\undefinedA\undefinedB y\else n\fi", "y"),
            (ifx_primitives, r"\let\a\ifx\ifx\a\ifx y\else n\fi", "y"),
            (
                ifx_countdef_same_register,
                r"\countdef\a 1 \countdef\b 1 \ifx\a\b y\else n\fi",
                "y"
            ),
            (
                ifx_countdef_different_registers,
                r"\countdef\a 1 \countdef\b 2 \ifx\a\b y\else n\fi",
                "n"
            ),
            (ifx_register_array, r"\let\c\count \ifx\c\count y\else n\fi", "y"),
            (ifdefined_true, r"\def\a{}\ifdefined\a y\else n\fi", "y"),
            (ifdefined_false, r"\ifdefined\a y\else n\fi", "n"),
            (ifdefined_primitive, r"\ifdefined\def y\else n\fi", "y"),
            (ifcase_zero, r"\ifcase 0 a\or b\or c\else d\fi e", "ae"),
            (ifcase_one, r"\ifcase 1 a\or b\or c\else d\fi e", "be"),
            (ifcase_two, r"\ifcase 2 a\or b\or c\else d\fi e", "ce"),
            (ifcase_else, r"\ifcase 3 a\or b\or c\else d\fi e", "de"),
            (ifcase_negative, r"\ifcase -1 a\or b\else d\fi e", "de"),
            (ifcase_no_match, r"\ifcase 3 a\or b\fi e", "e"),
            (
                ifcase_nested,
                r"\ifcase 1 a\or \ifcase 0 x\or y\fi\or c\fi e",
                "xe"
            ),
            (
                ifcase_skips_nested_or,
                r"\ifcase 1 \ifcase 0 x\or y\fi\or b\fi e",
                "be"
            ),
            (newif_default_false, r"\newif\iffoo\iffoo y\else n\fi", "n"),
            (
                newif_set_true,
                r"\newif\iffoo\footrue\iffoo y\else n\fi",
                "y"
            ),
            (
                newif_set_false,
                r"\newif\iffoo\footrue\foofalse\iffoo y\else n\fi",
                "n"
            ),
            (
                newif_local,
                r"\newif\iffoo{\footrue}\iffoo y\else n\fi",
                "n"
            ),
            (
                newif_global,
                r"\newif\iffoo{\global\footrue}\iffoo y\else n\fi",
                "y"
            ),
            (
                newif_nested_skip,
                r"\newif\iffoo\iffalse \iffoo a\else b\fi \else c\fi",
                "c"
            ),
            (
                conditional_in_macro,
                r"\def\choose#1{\ifnum #1>0 pos\else nonpos\fi}\choose{5}\choose{-1}",
                "posnonpos"
            ),
        ),
        failure_tests(
            (iftrue_end_of_input, r"\iffalse a"),
            (else_not_expected, r"a\else"),
            (fi_not_expected, r"a\fi"),
            (or_not_expected, r"a\or"),
            (or_in_if, r"\iftrue a\or b\fi"),
            (ifcase_end_of_input, r"\ifcase 2 a\or b"),
            (ifnum_missing_relation, r"\ifnum 1 2 a\fi"),
            (ifx_end_of_input, r"\ifx a"),
            (newif_bad_name, r"\newif\foo"),
            (newif_only_if, r"\newif\if"),
        ),
    ];

    #[test]
    fn expand_once_ifnum_with_relation_from_macro() {
        let mut vm = vm::VM::<State>::new(built_in_commands());
        vm.parse::<vm::DefaultHandlers>(
            token::trace::Origin::String("def.tex".into()),
            r"\def\x{1<2}".into(),
        )
        .unwrap();
        vm.push_source(
            token::trace::Origin::String("ifnum.tex".into()),
            r"\ifnum\x T\else F\fi".into(),
        )
        .unwrap();
        let input = vm::ExpansionInput::new(&mut vm);
        let ifnum = input.unexpanded().next().unwrap().unwrap();
        let result = vm::expand_once(ifnum, input).unwrap().unwrap();
        let chars: String = result.iter().filter_map(|t| t.char()).collect();
        assert_eq!(chars, "T");
        let next = input.unexpanded().next().unwrap().unwrap();
        assert!(next.char().is_none());
    }
}
