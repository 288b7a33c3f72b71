//! The expansion protocol and the dispatch of unexpandable tokens

use super::streams::expand_command;
use super::{ExecutionInput, ExpandedStream, ExpansionInput, ParserState, Source, SourceKind};
use crate::command::{self, Command};
use crate::error;
use crate::object::{GroupKind, TokenList};
use crate::prelude as txl;
use crate::token::{Token, Value};
use crate::traits::*;

/// Whether the token refers to an expandable command: a macro or an expansion primitive.
pub fn can_expand<S>(token: Token, commands_map: &command::Map<S>) -> bool {
    match token.value() {
        Value::CommandRef(command_ref) => commands_map.get_command(&command_ref).can_expand(),
        _ => false,
    }
}

/// Expands the token once and returns the resulting tokens.
///
/// Returns [None] if the token is not expandable.
/// The expansion is not itself expanded; `\a` defined by `\def\a{\b}` expands to `\b`.
/// Arguments are read from the input following the token.
pub fn expand_once<S: ParserState>(
    token: Token,
    input: &mut ExpansionInput<S>,
) -> txl::Result<Option<Vec<Token>>> {
    let vm = input.vm_mut();
    if !can_expand(token, &vm.commands_map) {
        return Ok(None);
    }
    vm.internal.sources.push(Source {
        expansions: vec![],
        kind: SourceKind::Capture,
    });
    let capture = vm.internal.sources.len() - 1;
    let result = expand_command(vm, token);
    let mut captured = if capture < vm.internal.sources.len()
        && matches!(vm.internal.sources[capture].kind, SourceKind::Capture)
    {
        vm.internal.sources.remove(capture).expansions
    } else {
        vec![]
    };
    captured.reverse();
    if let Some(override_token) = result? {
        captured.insert(0, override_token);
    }
    Ok(Some(captured))
}

/// Fully expands the tokens.
///
/// Expansion is repeated until no expandable tokens remain, except for tokens protected
///     from expansion with `\noexpand` and macros defined with `\protected`.
/// Non-expandable tokens are returned unchanged, so the function is idempotent on input
///     that contains no expandable commands.
pub fn expand_fully<S: ParserState, I: AsMut<ExpandedStream<S>>>(
    tokens: Vec<Token>,
    input: &mut I,
) -> txl::Result<Vec<Token>> {
    let input = ExpansionInput::new(input.as_mut().vm_mut());
    let mut list = TokenList::new(tokens);
    input.vm_mut().internal.suppress_protected += 1;
    let result = input.with_stack(&mut list, |input| {
        let mut expanded = vec![];
        while let Some(token) = input.next()? {
            expanded.push(token);
        }
        Ok(expanded)
    });
    let internal = &mut input.vm_mut().internal;
    internal.suppress_protected = internal.suppress_protected.saturating_sub(1);
    result
}

/// Processes a token that was not expanded.
///
/// This is the body of the VM's main loop: commands are run, variables are assigned,
///     braces begin and end groups, and everything else goes to the [super::Handlers].
pub fn process<S: ParserState>(token: Token, input: &mut ExecutionInput<S>) -> txl::Result<()> {
    let handlers = input.vm().internal.handlers.clone();
    match token.value() {
        Value::CommandRef(command_ref) => {
            let command = input.commands_map().get_command(&command_ref).clone();
            match command {
                Command::Execution(f, _) => f(token, input).map_err(|err| {
                    err.propagate(input.vm(), error::OperationKind::Execution, token)
                }),
                Command::Variable(cmd) => {
                    let scope = S::variable_assignment_scope_hook(input.state_mut());
                    cmd.set_value_using_input(token, input, scope)
                }
                Command::CharacterTokenAlias(value) => {
                    process(Token::new_from_value(value, token.trace_key()), input)
                }
                Command::Expansion(_, _) | Command::Macro(_) => {
                    (handlers.unexpanded_expansion)(token, input)
                }
                Command::Undefined => (handlers.undefined)(token, input),
            }
        }
        Value::BeginGroup(_) => {
            input.begin_group(GroupKind::Brace, token);
            Ok(())
        }
        Value::EndGroup(_) => input.end_group(GroupKind::Brace, token),
        Value::MathShift(_) => (handlers.math_shift)(token, input),
        _ => (handlers.character)(token, input),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::BuiltIn;
    use crate::texmacro::{Macro, Replacement};
    use crate::token::trace;
    use crate::vm::VM;
    use std::collections::HashMap;
    use texparser_stdext::collections::scopedmap::Scope;

    #[derive(Default)]
    struct State;

    impl ParserState for State {}

    fn letter_x(token: Token, input: &mut ExpansionInput<State>) -> txl::Result<()> {
        input.push_expansion(&[Token::new_letter('x', token.trace_key())]);
        Ok(())
    }

    fn peek(_: Token, input: &mut ExpansionInput<State>) -> txl::Result<()> {
        let token = input.next_or_err("peeking")?;
        input.back(token);
        Ok(())
    }

    fn setup(source: &str) -> Box<VM<State>> {
        let mut vm = VM::<State>::new(HashMap::from([
            ("peek", BuiltIn::new_expansion(peek)),
            ("x", BuiltIn::new_expansion(letter_x)),
        ]));
        let key = trace::Key::dummy();
        let a = vm.internal.cs_name_interner.get_or_intern("a");
        let x = vm.internal.cs_name_interner.get_or_intern("x");
        let body = vec![
            Token::new_control_sequence(x, key),
            Token::new_letter('y', key),
        ];
        vm.commands_map.insert_macro(
            crate::token::CommandRef::ControlSequence(a),
            Macro::new(vec![], vec![], vec![Replacement::Tokens(body)]),
            Scope::Local,
        );
        vm.push_source(trace::Origin::String("test".into()), source.into())
            .unwrap();
        vm
    }

    fn chars(tokens: &[Token]) -> String {
        tokens.iter().filter_map(|t| t.char()).collect()
    }

    #[test]
    fn expand_once_does_not_expand_result() {
        let mut vm = setup(r"\a");
        let input = ExpansionInput::new(&mut vm);
        let token = input.unexpanded().next().unwrap().unwrap();
        let result = expand_once(token, input).unwrap().unwrap();
        assert_eq!(result.len(), 2);
        assert!(can_expand(result[0], input.commands_map()));
        assert_eq!(chars(&result), "y");
    }

    #[test]
    fn expand_once_keeps_order_of_tokens_put_back() {
        let mut vm = setup(r"\peek\a z");
        let input = ExpansionInput::new(&mut vm);
        let token = input.unexpanded().next().unwrap().unwrap();
        let result = expand_once(token, input).unwrap().unwrap();
        assert_eq!(chars(&result), "xy");
        let next = input.unexpanded().next().unwrap().unwrap();
        assert_eq!(next.char(), Some('z'));
    }

    #[test]
    fn expand_once_non_expandable() {
        let mut vm = setup("b");
        let input = ExpansionInput::new(&mut vm);
        let token = input.unexpanded().next().unwrap().unwrap();
        assert_eq!(expand_once(token, input).unwrap(), None);
    }

    #[test]
    fn expand_fully_is_idempotent() {
        let mut vm = setup(r"\a\a");
        let input = ExpansionInput::new(&mut vm);
        let mut tokens = vec![];
        while let Some(token) = input.unexpanded().next().unwrap() {
            tokens.push(token);
        }
        let once = expand_fully(tokens, input).unwrap();
        assert_eq!(chars(&once), "xyxy");
        let twice = expand_fully(once.clone(), input).unwrap();
        assert_eq!(once, twice);
    }
}
