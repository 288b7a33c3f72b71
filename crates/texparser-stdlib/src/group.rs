//! Semi-simple groups: `\begingroup` and `\endgroup`
//!
//! These behave like braces except that they can only close each other.
//! A group opened with `\begingroup` and closed with `}` is an error, and vice versa.

use texparser::object::GroupKind;
use texparser::prelude as txl;
use texparser::traits::*;
use texparser::*;

pub const BEGINGROUP_DOC: &str = "Begin a group that must be ended with \\endgroup";
pub const ENDGROUP_DOC: &str = "End a group that was begun with \\begingroup";

/// Get the `\begingroup` command.
pub fn get_begingroup<S: ParserState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(begingroup_fn).with_doc(BEGINGROUP_DOC)
}

fn begingroup_fn<S: ParserState>(
    token: token::Token,
    input: &mut vm::ExecutionInput<S>,
) -> txl::Result<()> {
    input.begin_group(GroupKind::Semisimple, token);
    Ok(())
}

/// Get the `\endgroup` command.
pub fn get_endgroup<S: ParserState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(endgroup_fn).with_doc(ENDGROUP_DOC)
}

fn endgroup_fn<S: ParserState>(
    token: token::Token,
    input: &mut vm::ExecutionInput<S>,
) -> txl::Result<()> {
    input.end_group(GroupKind::Semisimple, token)
}
