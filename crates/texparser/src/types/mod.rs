//! Numeric types used in TeX
//!
//! Dimensions are fixed point numbers of points with 16 fractional bits,
//!     exactly as in Knuth's TeX, so that arithmetic on them rounds the same way.

use std::fmt::Write;

/// A dimension, stored as a whole number of scaled points (1pt = 2^16sp).
///
/// TeX limits the magnitude of a dimension to [Dimen::MAX], a little under 16384pt.
#[derive(Default, PartialEq, Eq, Debug, Copy, Clone, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Dimen(pub i32);

/// Error returned when a computation leaves the range of a dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverflowError;

impl Dimen {
    pub const ZERO: Dimen = Dimen(0);

    /// One point.
    pub const ONE: Dimen = Dimen(1 << 16);

    pub const TWO: Dimen = Dimen(1 << 17);

    /// Largest legal dimension, (2^30-1)sp.
    pub const MAX: Dimen = Dimen((1 << 30) - 1);

    /// Returns the given whole number of points, or an error if it is out of range.
    pub fn from_integer(i: i32) -> Result<Dimen, OverflowError> {
        if i >= (1 << 14) || i <= -(1 << 14) {
            Err(OverflowError)
        } else {
            Ok(Dimen(Dimen::ONE.0 * i))
        }
    }

    /// Converts decimal digits after the decimal point to a fraction of a point,
    ///     rounding the way TeX does.
    pub fn from_decimal_fraction(digits: &[u8]) -> Dimen {
        let mut a = 0;
        for d in digits.iter().rev() {
            a = (a + (*d as i32) * Dimen::TWO.0) / 10
        }
        Dimen((a + 1) / 2)
    }

    /// Calculates _xn_/_d_ and the remainder, where _x_ is this dimension.
    pub fn xn_over_d(&self, n: i32, d: i32) -> Result<(Dimen, Dimen), OverflowError> {
        if d == 0 {
            return Err(OverflowError);
        }
        let b = (self.0 as i64) * (n as i64);
        let remainder = (b % (d as i64)) as i32;
        let b = b / (d as i64);
        if b < -(Dimen::MAX.0 as i64) || b > Dimen::MAX.0 as i64 {
            return Err(OverflowError);
        }
        Ok((Dimen(b as i32), Dimen(remainder)))
    }

    /// Calculates _nx_+_y_, where _x_ is this dimension.
    pub fn nx_plus_y(self, n: i32, y: Dimen) -> Result<Dimen, OverflowError> {
        let result = (self.0 as i64) * (n as i64) + (y.0 as i64);
        if result.abs() > Dimen::MAX.0 as i64 {
            return Err(OverflowError);
        }
        Ok(Dimen(result as i32))
    }

    pub fn checked_add(self, rhs: Dimen) -> Result<Dimen, OverflowError> {
        self.nx_plus_y(1, rhs)
    }

    pub fn checked_mul(self, n: i32) -> Result<Dimen, OverflowError> {
        self.nx_plus_y(n, Dimen::ZERO)
    }

    /// Divides, truncating towards zero like TeX's `\divide`.
    pub fn checked_div(self, n: i32) -> Result<Dimen, OverflowError> {
        self.0.checked_div(n).map(Dimen).ok_or(OverflowError)
    }

    pub fn integer_part(self) -> i32 {
        self.0 / Dimen::ONE.0
    }

    pub fn fractional_part(self) -> Dimen {
        Dimen(self.0 % Dimen::ONE.0)
    }

    pub fn abs(self) -> Dimen {
        Dimen(self.0.abs())
    }
}

impl std::fmt::Display for Dimen {
    /// Prints the dimension the way `\the` does, with the fewest decimal
    ///     digits that convert back to the same number of scaled points.
    fn fmt(&self, fm: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = *self;
        if s.0 < 0 {
            fm.write_char('-')?;
        }
        write!(fm, "{}.", s.abs().integer_part())?;
        let mut f = s.abs().fractional_part().0 * 10 + 5;
        let mut delta = 10;
        loop {
            if delta > Dimen::ONE.0 {
                // round the last digit
                f += 0o100000 - 50000;
            }
            let digit = f / Dimen::ONE.0;
            fm.write_char(char::from_digit(digit as u32, 10).unwrap_or('0'))?;
            f = (f % Dimen::ONE.0) * 10;
            delta *= 10;
            if f <= delta {
                break;
            }
        }
        write!(fm, "pt")
    }
}

impl std::ops::Add<Dimen> for Dimen {
    type Output = Dimen;
    fn add(self, rhs: Dimen) -> Self::Output {
        Dimen(self.0 + rhs.0)
    }
}

impl std::ops::Sub<Dimen> for Dimen {
    type Output = Dimen;
    fn sub(self, rhs: Dimen) -> Self::Output {
        Dimen(self.0 - rhs.0)
    }
}

impl std::ops::Mul<i32> for Dimen {
    type Output = Dimen;
    fn mul(self, rhs: i32) -> Self::Output {
        Dimen(self.0 * rhs)
    }
}

impl std::ops::Div<i32> for Dimen {
    type Output = Dimen;
    fn div(self, rhs: i32) -> Self::Output {
        Dimen(self.0 / rhs)
    }
}

impl std::ops::Neg for Dimen {
    type Output = Dimen;
    fn neg(self) -> Self::Output {
        Dimen(-self.0)
    }
}

/// Physical unit of a dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Point,
    Pica,
    Inch,
    BigPoint,
    Centimeter,
    Millimeter,
    DidotPoint,
    Cicero,
    ScaledPoint,
}

impl Unit {
    /// All units with their two letter abbreviations.
    pub const ALL: [(&'static str, Unit); 9] = [
        ("pt", Unit::Point),
        ("in", Unit::Inch),
        ("pc", Unit::Pica),
        ("cm", Unit::Centimeter),
        ("mm", Unit::Millimeter),
        ("bp", Unit::BigPoint),
        ("dd", Unit::DidotPoint),
        ("cc", Unit::Cicero),
        ("sp", Unit::ScaledPoint),
    ];

    /// Parses a unit from its two letter abbreviation.
    pub fn parse(s: &str) -> Option<Self> {
        Unit::ALL
            .iter()
            .find(|(abbreviation, _)| *abbreviation == s)
            .map(|(_, unit)| *unit)
    }

    /// Returns the fraction (_n_, _d_) such that _x_ of this unit is _nx_/_d_ points.
    pub fn conversion_fraction(&self) -> (i32, i32) {
        use Unit::*;
        match self {
            Point => (1, 1),
            Pica => (12, 1),
            Inch => (7227, 100),
            BigPoint => (7227, 7200),
            Centimeter => (7227, 254),
            Millimeter => (7227, 2540),
            DidotPoint => (1238, 1157),
            Cicero => (14856, 1157),
            ScaledPoint => (1, 1 << 16),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(format!["{}", Dimen::ZERO], "0.0pt");
        assert_eq!(format!["{}", Dimen::ONE], "1.0pt");
        assert_eq!(
            format!["{}", Dimen::ONE + Dimen::from_decimal_fraction(&[5])],
            "1.5pt"
        );
        assert_eq!(
            format!["{}", -(Dimen::ONE * 3 + Dimen::from_decimal_fraction(&[2, 5]))],
            "-3.25pt"
        );
        assert_eq!(format!["{}", Dimen(1)], "0.00002pt");
    }

    #[test]
    fn overflow() {
        assert_eq!(Dimen::from_integer(1 << 14), Err(OverflowError));
        assert_eq!(Dimen::MAX.checked_add(Dimen(1)), Err(OverflowError));
        assert_eq!(Dimen::ONE.checked_div(0), Err(OverflowError));
        assert_eq!(Dimen::ONE.checked_mul(3), Ok(Dimen::ONE * 3));
    }

    #[test]
    fn parse_unit() {
        assert_eq!(Unit::parse("cm"), Some(Unit::Centimeter));
        assert_eq!(Unit::parse("em"), None);
    }
}
