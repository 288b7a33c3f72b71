//! Variable arithmetic: `\advance`, `\multiply` and `\divide`

use std::fmt::Display;
use texparser::parse::OptionalBy;
use texparser::prelude as txl;
use texparser::traits::*;
use texparser::types::Dimen;
use texparser::variable::SupportedType;
use texparser::*;
use texparser_stdext::collections::scopedmap::Scope;

pub const ADVANCE_DOC: &str = "Add an integer or dimension to a variable";
pub const MULTIPLY_DOC: &str = "Multiply a variable by an integer";
pub const DIVIDE_DOC: &str = "Divide a variable by an integer";

static MATH_TAG: command::StaticTag = command::StaticTag::new();

/// Tag shared by the arithmetic commands.
pub fn math_tag() -> command::Tag {
    MATH_TAG.get()
}

/// Get the `\advance` command.
pub fn get_advance<S: ParserState>() -> command::BuiltIn<S> {
    get_command::<S, AdvanceOp>()
}

/// Get the `\multiply` command.
pub fn get_multiply<S: ParserState>() -> command::BuiltIn<S> {
    get_command::<S, MultiplyOp>()
}

/// Get the `\divide` command.
pub fn get_divide<S: ParserState>() -> command::BuiltIn<S> {
    get_command::<S, DivideOp>()
}

fn get_command<S: ParserState, O: Op>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(math_primitive_fn::<S, O>)
        .with_tag(math_tag())
        .with_doc(O::DOC)
}

/// Arithmetic operations on [i32] and [Dimen].
trait Arithmetic: Copy + Display {
    fn wrapping_add(self, rhs: Self) -> Self;
    fn checked_mul(self, rhs: i32) -> Option<Self>;
    fn checked_div(self, rhs: i32) -> Option<Self>;
}

impl Arithmetic for i32 {
    fn wrapping_add(self, rhs: Self) -> Self {
        i32::wrapping_add(self, rhs)
    }
    fn checked_mul(self, rhs: i32) -> Option<Self> {
        i32::checked_mul(self, rhs)
    }
    fn checked_div(self, rhs: i32) -> Option<Self> {
        i32::checked_div(self, rhs)
    }
}

impl Arithmetic for Dimen {
    fn wrapping_add(self, rhs: Self) -> Self {
        Dimen(self.0.wrapping_add(rhs.0))
    }
    fn checked_mul(self, rhs: i32) -> Option<Self> {
        Dimen::checked_mul(self, rhs).ok()
    }
    fn checked_div(self, rhs: i32) -> Option<Self> {
        if rhs == 0 {
            return None;
        }
        Dimen::checked_div(self, rhs).ok()
    }
}

trait Op {
    const DOC: &'static str;
    const NAME: &'static str;
    /// Whether the right hand side has the same type as the variable.
    /// Otherwise it is an integer.
    const RHS_SAME: bool;

    fn apply<N: Arithmetic>(lhs: N, rhs_same: N, rhs_int: i32) -> Result<N, ArithmeticError>;

    fn apply_to_variable<S: ParserState, N>(
        variable: variable::TypedVariable<S, N>,
        input: &mut vm::ExecutionInput<S>,
        scope: Scope,
    ) -> txl::Result<()>
    where
        N: Arithmetic + SupportedType + Default + Parsable<S>,
    {
        let lhs = *variable.get(input.state());
        let (rhs_same, rhs_int) = if Self::RHS_SAME {
            (N::parse(input)?, 0)
        } else {
            (N::default(), i32::parse(input)?)
        };
        let result = match Self::apply(lhs, rhs_same, rhs_int) {
            Ok(result) => result,
            Err(err) => return Err(input.fatal_error(err)),
        };
        variable.set(input, scope, result);
        Ok(())
    }
}

struct AdvanceOp;

impl Op for AdvanceOp {
    const DOC: &'static str = ADVANCE_DOC;
    const NAME: &'static str = "addition";
    const RHS_SAME: bool = true;
    fn apply<N: Arithmetic>(lhs: N, rhs: N, _: i32) -> Result<N, ArithmeticError> {
        // TeX wraps on integer overflow here.
        Ok(lhs.wrapping_add(rhs))
    }
}

struct MultiplyOp;

impl Op for MultiplyOp {
    const DOC: &'static str = MULTIPLY_DOC;
    const NAME: &'static str = "multiplication";
    const RHS_SAME: bool = false;
    fn apply<N: Arithmetic>(lhs: N, _: N, rhs: i32) -> Result<N, ArithmeticError> {
        lhs.checked_mul(rhs).ok_or_else(|| ArithmeticError::Overflow {
            op_name: Self::NAME,
            lhs: format!["{lhs}"],
            rhs: format!["{rhs}"],
        })
    }
}

struct DivideOp;

impl Op for DivideOp {
    const DOC: &'static str = DIVIDE_DOC;
    const NAME: &'static str = "division";
    const RHS_SAME: bool = false;
    fn apply<N: Arithmetic>(lhs: N, _: N, rhs: i32) -> Result<N, ArithmeticError> {
        if rhs == 0 {
            return Err(ArithmeticError::DivisionByZero {
                numerator: format!["{lhs}"],
            });
        }
        lhs.checked_div(rhs).ok_or_else(|| ArithmeticError::Overflow {
            op_name: Self::NAME,
            lhs: format!["{lhs}"],
            rhs: format!["{rhs}"],
        })
    }
}

#[derive(Debug)]
enum ArithmeticError {
    Overflow {
        op_name: &'static str,
        lhs: String,
        rhs: String,
    },
    DivisionByZero {
        numerator: String,
    },
}

impl error::TexError for ArithmeticError {
    fn kind(&self) -> error::Kind {
        error::Kind::TypeMismatch
    }

    fn location(&self) -> error::Location {
        error::Location::Unlocated
    }

    fn title(&self) -> String {
        match self {
            ArithmeticError::Overflow { op_name, .. } => format!["overflow in {op_name}"],
            ArithmeticError::DivisionByZero { .. } => "division by zero".into(),
        }
    }

    fn notes(&self) -> Vec<String> {
        match self {
            ArithmeticError::Overflow { lhs, rhs, .. } => vec![
                format!["left hand side evaluated to {lhs}"],
                format!["right hand side evaluated to {rhs}"],
            ],
            ArithmeticError::DivisionByZero { numerator } => {
                vec![format!["numerator evaluated to {numerator}"]]
            }
        }
    }
}

fn math_primitive_fn<S: ParserState, O: Op>(
    op_token: token::Token,
    input: &mut vm::ExecutionInput<S>,
) -> txl::Result<()> {
    let scope = S::variable_assignment_scope_hook(input.state_mut());
    let token = input.next_or_err("reading the variable after an arithmetic command")?;
    let cmd = match token.value() {
        token::Value::CommandRef(command_ref) => {
            match input.commands_map().get_command(&command_ref) {
                command::Command::Variable(cmd) => cmd.clone(),
                command::Command::Undefined => {
                    return Err(input.fatal_error(error::UndefinedCommandError::new(
                        input.vm(),
                        token,
                    )))
                }
                cmd => {
                    let description = format!["control sequence referencing {cmd}"];
                    return Err(input.fatal_error(
                        parse::Error::new(input.vm(), "a variable", Some(token), "")
                            .with_got_override("got a non-variable command")
                            .with_annotation_override(description),
                    ));
                }
            }
        }
        _ => {
            return Err(input.fatal_error(
                parse::Error::new(input.vm(), "a variable", Some(token), "")
                    .with_got_override("got a character token"),
            ))
        }
    };
    let variable = cmd.resolve(token, input.as_mut())?;
    OptionalBy::parse(input)?;
    match variable {
        variable::Variable::Int(variable) => O::apply_to_variable(variable, input, scope),
        variable::Variable::Dimen(variable) => O::apply_to_variable(variable, input, scope),
        other => Err(input.fatal_error(
            error::SimpleTokenError::new(
                op_token,
                format!["arithmetic commands cannot be applied to {}", other.type_name()],
            )
            .with_kind(error::Kind::TypeMismatch)
            .with_note("only integer and dimension variables support arithmetic"),
        )),
    }
}
