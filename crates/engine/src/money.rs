use std::fmt;

/// Money amount represented as **integer minor units** (kobo).
///
/// Every balance and ledger amount in the engine is an `i64` of minor units;
/// this type wraps it for fee arithmetic and for formatting notices.
///
/// # Examples
///
/// ```rust
/// use engine::Money;
///
/// let amount = Money::new(140_000);
/// assert_eq!(amount.minor(), 140_000);
/// assert_eq!(amount.to_string(), "₦1,400.00");
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a new amount from minor units.
    #[must_use]
    pub const fn new(minor: i64) -> Self {
        Self(minor)
    }

    /// Returns the raw value in minor units.
    #[must_use]
    pub const fn minor(self) -> i64 {
        self.0
    }

    /// `self * bps / 10_000`, rounded half-up to the nearest minor unit.
    ///
    /// Returns `None` on overflow or for negative amounts.
    #[must_use]
    pub fn percent_bps(self, bps: u32) -> Option<Money> {
        if self.0 < 0 {
            return None;
        }
        let scaled = i128::from(self.0) * i128::from(bps);
        let rounded = (scaled + 5_000) / 10_000;
        i64::try_from(rounded).ok().map(Money)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let major = (abs / 100).to_string();
        let minor = abs % 100;

        let mut grouped = String::with_capacity(major.len() + major.len() / 3);
        for (idx, ch) in major.chars().enumerate() {
            if idx > 0 && (major.len() - idx) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }
        write!(f, "{sign}₦{grouped}.{minor:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_groups_thousands() {
        assert_eq!(Money::new(0).to_string(), "₦0.00");
        assert_eq!(Money::new(5).to_string(), "₦0.05");
        assert_eq!(Money::new(140_000).to_string(), "₦1,400.00");
        assert_eq!(Money::new(5_000_000_00).to_string(), "₦5,000,000.00");
        assert_eq!(Money::new(-1050).to_string(), "-₦10.50");
    }

    #[test]
    fn percent_rounds_half_up() {
        assert_eq!(Money::new(7_000_000).percent_bps(200), Some(Money::new(140_000)));
        assert_eq!(Money::new(25).percent_bps(200), Some(Money::new(1)));
        assert_eq!(Money::new(24).percent_bps(200), Some(Money::new(0)));
        assert_eq!(Money::new(-1).percent_bps(200), None);
    }
}
