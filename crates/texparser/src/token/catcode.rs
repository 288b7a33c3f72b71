//! Category codes and the category code table.

use std::collections::HashMap;
use std::fmt;

/// The category of a character, which determines how the tokenizer treats it.
///
/// The numeric values are the ones TeX uses (`\catcode`\{=1` and so on).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum CatCode {
    Escape = 0,
    BeginGroup = 1,
    EndGroup = 2,
    MathShift = 3,
    AlignmentTab = 4,
    EndOfLine = 5,
    Parameter = 6,
    Superscript = 7,
    Subscript = 8,
    Ignored = 9,
    Space = 10,
    Letter = 11,
    Other = 12,
    Active = 13,
    Comment = 14,
    Invalid = 15,
}

use CatCode::*;

const ALL: [CatCode; 16] = [
    Escape,
    BeginGroup,
    EndGroup,
    MathShift,
    AlignmentTab,
    EndOfLine,
    Parameter,
    Superscript,
    Subscript,
    Ignored,
    Space,
    Letter,
    Other,
    Active,
    Comment,
    Invalid,
];

impl CatCode {
    /// The category codes of the 128 ASCII characters in plain TeX.
    pub const PLAIN_TEX_DEFAULTS: [CatCode; 128] = {
        let mut codes = [Other; 128];
        codes[0] = Ignored;
        codes[b'\t' as usize] = Space;
        codes[b'\n' as usize] = EndOfLine;
        codes[b'\r' as usize] = EndOfLine;
        codes[b' ' as usize] = Space;
        codes[b'#' as usize] = Parameter;
        codes[b'$' as usize] = MathShift;
        codes[b'%' as usize] = Comment;
        codes[b'&' as usize] = AlignmentTab;
        codes[b'\\' as usize] = Escape;
        codes[b'^' as usize] = Superscript;
        codes[b'_' as usize] = Subscript;
        codes[b'{' as usize] = BeginGroup;
        codes[b'}' as usize] = EndGroup;
        codes[b'~' as usize] = Active;
        codes[127] = Invalid;
        let mut c = b'A';
        while c <= b'Z' {
            codes[c as usize] = Letter;
            codes[(c + 32) as usize] = Letter;
            c += 1;
        }
        codes
    };

    /// Returns the category code with the given TeX number, if it is in the range [0, 15].
    pub fn from_int(i: i64) -> Option<CatCode> {
        usize::try_from(i).ok().and_then(|i| ALL.get(i)).copied()
    }

    /// Returns the TeX number of this category code.
    pub fn int(self) -> u8 {
        self as u8
    }

    /// Returns the category a code point has when no assignment has been made.
    ///
    /// ASCII characters follow plain TeX.
    /// Other alphabetic characters are letters and everything else is other,
    ///     including numbers that are not valid code points.
    pub fn default_for(code_point: u32) -> CatCode {
        if let Some(code) = CatCode::PLAIN_TEX_DEFAULTS.get(code_point as usize) {
            return *code;
        }
        match char::from_u32(code_point) {
            Some(c) if c.is_alphabetic() => Letter,
            _ => Other,
        }
    }

    /// Whether the tokenizer turns characters of this category into tokens of the same category.
    pub fn is_token_category(self) -> bool {
        !matches!(self, Escape | EndOfLine | Ignored | Comment | Invalid)
    }
}

impl fmt::Display for CatCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Escape => "escape",
            BeginGroup => "begin group",
            EndGroup => "end group",
            MathShift => "math shift",
            AlignmentTab => "alignment tab",
            EndOfLine => "end of line",
            Parameter => "parameter",
            Superscript => "superscript",
            Subscript => "subscript",
            Ignored => "ignored",
            Space => "space",
            Letter => "letter",
            Other => "other",
            Active => "active",
            Comment => "comment",
            Invalid => "invalid",
        };
        write!(f, "{name} ({})", self.int())
    }
}

impl Default for CatCode {
    fn default() -> Self {
        Other
    }
}

/// Mutable map from code points to category codes.
///
/// Lookups never fail: code points without an assignment get [CatCode::default_for].
/// Changes only affect characters that are tokenized afterwards.
/// Grouping is not handled here; the `\catcode` variable restores old values through the save stack.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CatCodeTable {
    #[cfg_attr(feature = "serde", serde(with = "ascii_serde"))]
    ascii: [CatCode; 128],
    non_ascii: HashMap<u32, CatCode>,
}

impl Default for CatCodeTable {
    fn default() -> Self {
        CatCodeTable {
            ascii: CatCode::PLAIN_TEX_DEFAULTS,
            non_ascii: HashMap::new(),
        }
    }
}

impl CatCodeTable {
    /// Returns the table used by LaTeX packages, in which `@` is a letter.
    pub fn latex_internal() -> CatCodeTable {
        let mut table = CatCodeTable::default();
        table.set('@' as u32, Letter);
        table
    }

    /// Returns the current category code of the code point.
    #[inline]
    pub fn get(&self, code_point: u32) -> CatCode {
        *self.get_ref(code_point)
    }

    /// Returns a reference to the current category code of the code point.
    pub fn get_ref(&self, code_point: u32) -> &CatCode {
        match self.ascii.get(code_point as usize) {
            Some(code) => code,
            None => match self.non_ascii.get(&code_point) {
                Some(code) => code,
                None => match CatCode::default_for(code_point) {
                    Letter => &Letter,
                    _ => &Other,
                },
            },
        }
    }

    /// Returns a mutable reference to the category code of the code point.
    pub fn get_mut(&mut self, code_point: u32) -> &mut CatCode {
        match self.ascii.get_mut(code_point as usize) {
            Some(code) => code,
            None => self
                .non_ascii
                .entry(code_point)
                .or_insert_with(|| CatCode::default_for(code_point)),
        }
    }

    /// Sets the category code of the code point.
    pub fn set(&mut self, code_point: u32, code: CatCode) {
        *self.get_mut(code_point) = code;
    }
}

#[cfg(feature = "serde")]
mod ascii_serde {
    use super::CatCode;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(a: &[CatCode; 128], s: S) -> Result<S::Ok, S::Error> {
        a.as_slice().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[CatCode; 128], D::Error> {
        let v = Vec::<CatCode>::deserialize(d)?;
        v.try_into()
            .map_err(|_| serde::de::Error::custom("expected 128 category codes"))
    }
}
