use serde::{Deserialize, Serialize};

use crate::EngineError;

/// ISO currency code of a deployment.
///
/// A deployment settles in exactly one currency. Every transaction row still
/// records its currency so history stays self-describing.
///
/// ## Minor units
///
/// Amounts are stored as `i64` **minor units** (see `Money`). NGN has 2 minor
/// units, so `1,400.00 NGN` ⇄ `140000` kobo.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Ngn,
}

impl Currency {
    /// Canonical currency code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Currency::Ngn => "NGN",
        }
    }

    /// Number of fraction digits used when formatting/parsing amounts.
    #[must_use]
    pub const fn minor_units(self) -> u8 {
        match self {
            Currency::Ngn => 2,
        }
    }

    /// Upper bound for the gateway fee shown on a receipt, in minor units.
    #[must_use]
    pub const fn receipt_fee_cap_minor(self) -> i64 {
        match self {
            Currency::Ngn => 100_000,
        }
    }
}

impl core::fmt::Display for Currency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

impl TryFrom<&str> for Currency {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "NGN" => Ok(Currency::Ngn),
            other => Err(EngineError::InvalidInput(format!(
                "unsupported currency: {other}"
            ))),
        }
    }
}
