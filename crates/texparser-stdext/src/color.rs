//! Terminal coloring
//!
//! Diagnostics are colored with the [colored](https://docs.rs/colored) crate
//!     when the `color` Cargo feature is enabled.
//! Code should call the methods of [Colorize] rather than the crate directly;
//!     without the feature the methods return the string unchanged.
//!
//! ```
//! use texparser_stdext::color::Colorize;
//! println!["{}", "undefined control sequence".bold().bright_red()];
//! ```

#[cfg(feature = "color")]
pub type ColoredString = colored::ColoredString;

#[cfg(not(feature = "color"))]
pub type ColoredString = String;

macro_rules! colorize_methods {
    ( $( $method: ident, )+ ) => {
        /// Coloring methods on strings.
        pub trait Colorize {
            $(
                fn $method(self) -> ColoredString;
            )+
        }

        #[cfg(feature = "color")]
        impl Colorize for ColoredString {
            $(
                fn $method(self) -> ColoredString {
                    colored::Colorize::$method(self)
                }
            )+
        }

        #[cfg(feature = "color")]
        impl Colorize for &str {
            $(
                fn $method(self) -> ColoredString {
                    colored::Colorize::$method(self)
                }
            )+
        }

        #[cfg(not(feature = "color"))]
        impl Colorize for String {
            $(
                fn $method(self) -> ColoredString {
                    self
                }
            )+
        }

        #[cfg(not(feature = "color"))]
        impl Colorize for &str {
            $(
                fn $method(self) -> ColoredString {
                    self.to_string()
                }
            )+
        }
    };
}

colorize_methods!(
    bold,
    bright_blue,
    bright_cyan,
    bright_red,
    bright_yellow,
    dimmed,
    italic,
);
