//! Typographic settings
//!
//! The interpreter does not typeset, but converters need to know the font
//!     and color in effect when text is written.
//! The VM keeps a stack of [Settings] with one entry per open group;
//!     switches like `\bfseries` change the top entry and ending the group
//!     restores the enclosing settings.

/// Font family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Family {
    #[default]
    Roman,
    SansSerif,
    Typewriter,
    Calligraphic,
}

/// Font shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Shape {
    #[default]
    Upright,
    Italic,
    Slanted,
    /// Emphasis; italic in upright text and upright in italic text.
    Emphasized,
    SmallCaps,
}

/// Font weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Weight {
    #[default]
    Medium,
    Bold,
}

/// Font size, from `\tiny` to `\Huge`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Size {
    Tiny,
    ScriptSize,
    FootnoteSize,
    Small,
    #[default]
    NormalSize,
    Large,
    Larger,
    Largest,
    Huge,
    Hugest,
}

impl Size {
    /// All sizes with the name of the LaTeX command that selects them.
    pub const ALL: [(&'static str, Size); 10] = [
        ("tiny", Size::Tiny),
        ("scriptsize", Size::ScriptSize),
        ("footnotesize", Size::FootnoteSize),
        ("small", Size::Small),
        ("normalsize", Size::NormalSize),
        ("large", Size::Large),
        ("Large", Size::Larger),
        ("LARGE", Size::Largest),
        ("huge", Size::Huge),
        ("Huge", Size::Hugest),
    ];
}

/// Whether the interpreter is in text or math mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Mode {
    #[default]
    Text,
    InlineMath,
    DisplayMath,
}

/// The typographic state at one point of the input.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Settings {
    pub family: Family,
    pub shape: Shape,
    pub weight: Weight,
    pub size: Size,
    pub mode: Mode,
    /// Name of the text color, if one has been set.
    pub foreground: Option<String>,
    /// Name of the background color, if one has been set.
    pub background: Option<String>,
}

impl Settings {
    pub fn is_math(&self) -> bool {
        self.mode != Mode::Text
    }

    /// Applies `\em`: toggles between emphasized and upright.
    pub fn toggle_emphasis(&mut self) {
        self.shape = match self.shape {
            Shape::Emphasized | Shape::Italic | Shape::Slanted => Shape::Upright,
            _ => Shape::Emphasized,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emphasis_toggles() {
        let mut settings = Settings::default();
        settings.toggle_emphasis();
        assert_eq!(settings.shape, Shape::Emphasized);
        settings.toggle_emphasis();
        assert_eq!(settings.shape, Shape::Upright);
        settings.shape = Shape::Italic;
        settings.toggle_emphasis();
        assert_eq!(settings.shape, Shape::Upright);
    }
}
