//! Rational constants appearing in constraints
//!
//! Guards compare variables against constants that may be integers or
//! decimals (e.g. `amount_w >= 2.5`). Constants are stored as a [`Fraction`]
//! so that the interval algebra of the oracle can compare bounds exactly.
//! Fractions are always stored in their simplified form.

use std::{
    cmp::Ordering,
    fmt::{self, Debug, Display},
    ops,
    str::FromStr,
};

/// Type representing a rational number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fraction {
    /// True if the fraction is smaller than 0
    negated: bool,
    /// Numerator
    numerator: u64,
    /// Denominator, never 0
    denominator: u64,
}

impl Fraction {
    /// Create a new fraction
    ///
    /// The fraction is simplified upon creation.
    ///
    /// Panics if the denominator is 0.
    ///
    /// # Example
    ///
    /// ```rust
    /// use dpn_constraints::fraction::Fraction;
    ///
    /// let f = Fraction::new(42, 4, false);
    /// assert_eq!(f.numerator(), 21);
    /// assert_eq!(f.denominator(), 2);
    /// ```
    pub fn new(numerator: u64, denominator: u64, negated: bool) -> Self {
        assert!(denominator != 0, "Denominator of a fraction must not be 0");

        if numerator == 0 {
            return Self {
                negated: false,
                numerator: 0,
                denominator: 1,
            };
        }

        let gcd = num::integer::gcd(numerator, denominator);
        Self {
            negated,
            numerator: numerator / gcd,
            denominator: denominator / gcd,
        }
    }

    /// Fraction representing 0
    pub fn zero() -> Self {
        Self::from(0)
    }

    /// Fraction representing 1
    pub fn one() -> Self {
        Self::from(1)
    }

    /// Returns true if the fraction is smaller than 0
    pub fn is_negative(&self) -> bool {
        self.negated
    }

    /// Check whether the fraction represents an integer
    ///
    /// # Example
    ///
    /// ```rust
    /// use dpn_constraints::fraction::Fraction;
    ///
    /// assert!(!Fraction::new(1, 2, false).is_integer());
    /// assert!(Fraction::new(4, 2, true).is_integer());
    /// ```
    pub fn is_integer(&self) -> bool {
        self.denominator == 1
    }

    /// Get the numerator of the fraction
    pub fn numerator(&self) -> u64 {
        self.numerator
    }

    /// Get the denominator of the fraction
    pub fn denominator(&self) -> u64 {
        self.denominator
    }

    /// Largest integer smaller or equal to the fraction
    ///
    /// # Example
    ///
    /// ```rust
    /// use dpn_constraints::fraction::Fraction;
    ///
    /// assert_eq!(Fraction::new(5, 2, false).floor(), 2);
    /// assert_eq!(Fraction::new(5, 2, true).floor(), -3);
    /// ```
    pub fn floor(&self) -> i128 {
        let quotient = i128::from(self.numerator / self.denominator);
        if !self.negated {
            return quotient;
        }

        if self.is_integer() {
            -quotient
        } else {
            -quotient - 1
        }
    }

    /// Smallest integer greater or equal to the fraction
    ///
    /// # Example
    ///
    /// ```rust
    /// use dpn_constraints::fraction::Fraction;
    ///
    /// assert_eq!(Fraction::new(5, 2, false).ceil(), 3);
    /// assert_eq!(Fraction::new(5, 2, true).ceil(), -2);
    /// ```
    pub fn ceil(&self) -> i128 {
        -((-*self).floor())
    }
}

impl Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "-")?;
        }

        if self.is_integer() {
            return write!(f, "{}", self.numerator);
        }

        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

impl From<i64> for Fraction {
    fn from(value: i64) -> Self {
        Fraction::new(value.unsigned_abs(), 1, value < 0)
    }
}

impl From<i32> for Fraction {
    fn from(value: i32) -> Self {
        Fraction::from(value as i64)
    }
}

impl From<u32> for Fraction {
    fn from(value: u32) -> Self {
        Fraction::new(value as u64, 1, false)
    }
}

impl From<bool> for Fraction {
    fn from(value: bool) -> Self {
        Fraction::from(value as i64)
    }
}

impl TryFrom<i128> for Fraction {
    type Error = ();

    /// Convert an integer whose magnitude fits into the numerator
    fn try_from(value: i128) -> Result<Self, Self::Error> {
        let numerator = u64::try_from(value.unsigned_abs()).map_err(|_| ())?;
        Ok(Fraction::new(numerator, 1, value < 0))
    }
}

impl TryFrom<Fraction> for i64 {
    type Error = ();

    /// Try to convert the fraction into an integer
    fn try_from(value: Fraction) -> Result<Self, Self::Error> {
        if !value.is_integer() {
            return Err(());
        }

        let res = i64::try_from(value.numerator).map_err(|_| ())?;
        if value.negated { Ok(-res) } else { Ok(res) }
    }
}

impl ops::Neg for Fraction {
    type Output = Self;

    fn neg(self) -> Self::Output {
        if self.numerator == 0 {
            return self;
        }

        Self {
            negated: !self.negated,
            numerator: self.numerator,
            denominator: self.denominator,
        }
    }
}

impl PartialOrd for Fraction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Fraction {
    fn cmp(&self, other: &Self) -> Ordering {
        let a = self.numerator as u128 * other.denominator as u128;
        let b = other.numerator as u128 * self.denominator as u128;

        match (self.negated, other.negated) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            // For negative fractions, reverse the comparison
            (true, true) => a.cmp(&b).reverse(),
            (false, false) => a.cmp(&b),
        }
    }
}

/// Error returned when a string does not describe a rational constant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFractionError(String);

impl std::error::Error for ParseFractionError {}

impl Display for ParseFractionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is not a valid numeric constant", self.0)
    }
}

impl FromStr for Fraction {
    type Err = ParseFractionError;

    /// Parse integers (`-3`), decimals (`2.25`) and fractions (`9/4`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseFractionError(s.to_string());
        let trimmed = s.trim();
        let (negated, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };

        if let Some((num, den)) = digits.split_once('/') {
            let num = num.trim().parse::<u64>().map_err(|_| err())?;
            let den = den.trim().parse::<u64>().map_err(|_| err())?;
            if den == 0 {
                return Err(err());
            }
            return Ok(Fraction::new(num, den, negated));
        }

        if let Some((int, frac)) = digits.split_once('.') {
            if int.is_empty() || frac.is_empty() || frac.len() > 18 {
                return Err(err());
            }
            let denominator = 10u64.pow(frac.len() as u32);
            let int = int.parse::<u64>().map_err(|_| err())?;
            let frac = frac.parse::<u64>().map_err(|_| err())?;
            let numerator = int
                .checked_mul(denominator)
                .and_then(|n| n.checked_add(frac))
                .ok_or_else(err)?;
            return Ok(Fraction::new(numerator, denominator, negated));
        }

        let numerator = digits.parse::<u64>().map_err(|_| err())?;
        Ok(Fraction::new(numerator, 1, negated))
    }
}
