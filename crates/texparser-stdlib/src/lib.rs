//! # The texparser standard library
//!
//! This crate contains implementations of TeX and LaTeX primitives for texparser,
//!     and [StdLibState], a state type that supports all of them.
//!
//! ```
//! use texparser::token::trace::Origin;
//! use texparser_stdlib::{output, StdLibState};
//!
//! let mut vm = StdLibState::new_vm();
//! let source = r"\newcommand{\hello}[1]{Hello, #1!}\hello{World}".to_string();
//! vm.parse::<output::Handlers>(Origin::String("doc.tex".into()), source).unwrap();
//! ```

extern crate texparser;
extern crate texparser_stdext;

use std::collections::HashMap;

use texparser::command;
use texparser::prelude as txl;
use texparser::texmacro;
use texparser::token;
use texparser::traits::*;
use texparser::types::Dimen;
use texparser::vm;
use texparser::vm::implement_has_component;
use texparser_stdext::collections::scopedmap::Scope;

pub mod alias;
pub mod catcode;
pub mod conditional;
pub mod def;
pub mod environment;
pub mod expansion;
pub mod group;
pub mod input;
pub mod math;
pub mod message;
pub mod newcommand;
pub mod output;
pub mod prefix;
pub mod registers;
pub mod the;
pub mod tracingmacros;
pub mod typography;

/// A state struct that is compatible with every primitive in the standard library.
#[derive(Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StdLibState {
    pub catcode: catcode::Component,
    pub conditional: conditional::Component,
    pub prefix: prefix::Component,
    pub registers_i32: registers::Component<i32, 32768>,
    pub registers_dimen: registers::Component<Dimen, 256>,
    pub registers_token_list: registers::Component<Vec<token::Token>, 256>,
    pub tracing_macros: tracingmacros::Component,
    #[cfg(test)]
    #[cfg_attr(feature = "serde", serde(skip))]
    testing: texparser_testing::TestingComponent,
}

impl ParserState for StdLibState {
    #[inline]
    fn cat_code(&self, code_point: u32) -> token::CatCode {
        catcode::cat_code(self, code_point)
    }

    #[inline]
    fn post_macro_expansion_hook(
        token: token::Token,
        input: &vm::ExpansionInput<Self>,
        tex_macro: &texmacro::Macro,
        arguments: &[&[token::Token]],
        reversed_expansion: &[token::Token],
    ) {
        tracingmacros::hook(token, input, tex_macro, arguments, reversed_expansion)
    }

    #[inline]
    fn expansion_override_hook(
        token: token::Token,
        input: &mut vm::ExpansionInput<Self>,
        tag: Option<command::Tag>,
    ) -> txl::Result<Option<token::Token>> {
        expansion::noexpand_hook(token, input, tag)
    }

    #[inline]
    fn variable_assignment_scope_hook(state: &mut Self) -> Scope {
        prefix::variable_assignment_scope_hook(state)
    }

    #[cfg(test)]
    fn recoverable_error_hook(
        vm: &vm::VM<Self>,
        recoverable_error: Box<texparser::error::Error>,
    ) -> txl::Result<()> {
        texparser_testing::TestingComponent::recoverable_error_hook(vm, recoverable_error)
    }
}

impl StdLibState {
    pub fn all_initial_built_ins() -> HashMap<&'static str, command::BuiltIn<StdLibState>> {
        let mut built_ins = HashMap::from([
            ("@endenvironment", environment::get_endenvironment()),
            ("@testopt", newcommand::get_testopt()),
            //
            ("advance", math::get_advance()),
            //
            ("begin", environment::get_begin()),
            ("begingroup", group::get_begingroup()),
            ("bfseries", typography::get_bfseries()),
            //
            ("catcode", catcode::get_catcode()),
            ("color", typography::get_color()),
            ("count", registers::get_count()),
            ("countdef", registers::get_countdef()),
            ("csname", the::get_csname()),
            //
            ("def", def::get_def()),
            ("detokenize", the::get_detokenize()),
            ("dimen", registers::get_dimen()),
            ("dimendef", registers::get_dimendef()),
            ("divide", math::get_divide()),
            ("document", expansion::get_relax()),
            //
            ("edef", def::get_edef()),
            ("else", conditional::get_else()),
            ("em", typography::get_em()),
            ("emph", typography::get_emph()),
            ("end", environment::get_end()),
            ("endcsname", the::get_endcsname()),
            ("enddocument", expansion::get_relax()),
            ("endgroup", group::get_endgroup()),
            ("endinput", input::get_endinput()),
            ("expandafter", expansion::get_expandafter()),
            //
            ("fi", conditional::get_fi()),
            //
            ("gdef", def::get_gdef()),
            ("global", prefix::get_global()),
            //
            ("href", output::get_href()),
            //
            ("ifcase", conditional::get_ifcase()),
            ("ifdefined", conditional::get_ifdefined()),
            ("iffalse", conditional::get_iffalse()),
            ("ifnum", conditional::get_ifnum()),
            ("ifodd", conditional::get_ifodd()),
            ("iftrue", conditional::get_iftrue()),
            ("ifx", conditional::get_ifx()),
            ("includegraphics", output::get_includegraphics()),
            ("input", input::get_input()),
            ("itshape", typography::get_itshape()),
            //
            ("let", alias::get_let()),
            ("long", prefix::get_long()),
            //
            ("makeatletter", catcode::get_makeatletter()),
            ("makeatother", catcode::get_makeatother()),
            ("mdseries", typography::get_mdseries()),
            ("meaning", the::get_meaning()),
            ("message", message::get_message()),
            ("multiply", math::get_multiply()),
            //
            ("newcommand", newcommand::get_newcommand()),
            ("newenvironment", environment::get_newenvironment()),
            ("newif", conditional::get_newif()),
            ("noexpand", expansion::get_noexpand()),
            ("normalfont", typography::get_normalfont()),
            ("number", the::get_number()),
            //
            ("or", conditional::get_or()),
            //
            ("par", output::get_par()),
            ("protected", prefix::get_protected()),
            ("providecommand", newcommand::get_providecommand()),
            //
            ("relax", expansion::get_relax()),
            ("renewcommand", newcommand::get_renewcommand()),
            ("renewenvironment", environment::get_renewenvironment()),
            ("rmfamily", typography::get_rmfamily()),
            ("romannumeral", the::get_romannumeral()),
            //
            ("scshape", typography::get_scshape()),
            ("sffamily", typography::get_sffamily()),
            ("show", message::get_show()),
            ("slshape", typography::get_slshape()),
            ("string", the::get_string()),
            //
            ("textbf", typography::get_textbf()),
            ("textcolor", typography::get_textcolor()),
            ("textit", typography::get_textit()),
            ("textrm", typography::get_textrm()),
            ("textsc", typography::get_textsc()),
            ("textsf", typography::get_textsf()),
            ("textsl", typography::get_textsl()),
            ("texttt", typography::get_texttt()),
            ("the", the::get_the()),
            ("toks", registers::get_toks()),
            ("toksdef", registers::get_toksdef()),
            ("tracingmacros", tracingmacros::get_tracingmacros()),
            ("ttfamily", typography::get_ttfamily()),
            //
            ("upshape", typography::get_upshape()),
            //
            ("verb", output::get_verb()),
            //
            ("xdef", def::get_xdef()),
        ]);
        built_ins.extend(typography::size_commands());
        built_ins
    }

    /// Definitions that are not built-in commands: the active character `~` is a non-breaking space.
    pub fn initialize(vm: &mut vm::VM<StdLibState>) {
        vm.commands_map.insert(
            token::CommandRef::ActiveCharacter('~'),
            command::Command::CharacterTokenAlias(token::Value::Other('\u{a0}')),
            Scope::Global,
        );
    }

    /// Create a new VM that uses the standard library's state and all of its commands.
    pub fn new_vm() -> Box<vm::VM<StdLibState>> {
        let mut vm = vm::VM::<StdLibState>::new(StdLibState::all_initial_built_ins());
        StdLibState::initialize(&mut vm);
        vm
    }
}

implement_has_component![StdLibState {
    catcode: catcode::Component,
    conditional: conditional::Component,
    prefix: prefix::Component,
    registers_i32: registers::Component<i32, 32768>,
    registers_dimen: registers::Component<Dimen, 256>,
    registers_token_list: registers::Component<Vec<token::Token>, 256>,
    tracing_macros: tracingmacros::Component,
}];

#[cfg(test)]
implement_has_component![StdLibState {
    testing: texparser_testing::TestingComponent,
}];
