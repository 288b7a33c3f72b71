//! `\let` aliasing command

use crate::prefix;
use texparser::parse::OptionalEqualsUnexpanded;
use texparser::prelude as txl;
use texparser::traits::*;
use texparser::*;

pub const LET_DOC: &str = "Assign a command or character to a control sequence";

/// Get the `\let` command.
pub fn get_let<S: HasComponent<prefix::Component>>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(let_primitive_fn)
        .with_tag(let_tag())
        .with_doc(LET_DOC)
}

static LET_TAG: command::StaticTag = command::StaticTag::new();

pub fn let_tag() -> command::Tag {
    LET_TAG.get()
}

fn let_primitive_fn<S: HasComponent<prefix::Component>>(
    _: token::Token,
    input: &mut vm::ExecutionInput<S>,
) -> txl::Result<()> {
    let scope = input.state_mut().component_mut().take_scope();
    let alias = token::CommandRef::parse(input)?;
    OptionalEqualsUnexpanded::parse(input)?;
    // One optional space is allowed after the equals sign.
    let mut token = input
        .unexpanded()
        .next_or_err("reading the right hand side of a \\let assignment")?;
    if let token::Value::Space(_) = token.value() {
        token = input
            .unexpanded()
            .next_or_err("reading the right hand side of a \\let assignment")?;
    }
    input.commands_map_mut().alias_token(alias, token, scope);
    Ok(())
}
