//! Contribution rule resolver.
//!
//! Decides which savings product a contribution actually lands in, given what
//! the member asked for, the account's contribution mode and how many
//! ICA/PIGGY/ESUSU contributions the account already made this calendar month.
//!
//! The resolver is pure. Settlement calls it twice: once before taking any
//! lock (fail fast on bad input) and once under lock, inside the unit of work
//! that commits. Only the second answer is authoritative.

use serde::{Deserialize, Serialize};

use crate::{ContributionMode, Product, ResultEngine};

/// Default size of the monthly ICA-only window.
pub const DEFAULT_ICA_ONLY_LIMIT: u32 = 10;

/// Facts derived from mode and monthly count, independent of the request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleState {
    pub all_ica: bool,
    pub ica_only_window_active: bool,
    pub remaining_ica_only: u32,
    pub allow_piggy: bool,
    pub default_product: Product,
}

/// Outcome of resolving one request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub requested: Option<Product>,
    pub resolved: Product,
    pub adjusted: bool,
    pub notice: Option<String>,
    pub state: RuleState,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContributionRules {
    ica_only_limit: u32,
}

impl Default for ContributionRules {
    fn default() -> Self {
        Self::new(DEFAULT_ICA_ONLY_LIMIT)
    }
}

impl ContributionRules {
    /// The window is at least one contribution wide.
    #[must_use]
    pub fn new(ica_only_limit: u32) -> Self {
        Self {
            ica_only_limit: ica_only_limit.max(1),
        }
    }

    #[must_use]
    pub fn ica_only_limit(&self) -> u32 {
        self.ica_only_limit
    }

    #[must_use]
    pub fn state(&self, mode: ContributionMode, monthly_count: u64) -> RuleState {
        let all_ica = mode == ContributionMode::AllIca;
        let limit = u64::from(self.ica_only_limit);
        let ica_only_window_active = monthly_count < limit;
        let remaining_ica_only = u32::try_from(limit.saturating_sub(monthly_count)).unwrap_or(0);
        let allow_piggy = !all_ica && !ica_only_window_active;
        RuleState {
            all_ica,
            ica_only_window_active,
            remaining_ica_only,
            allow_piggy,
            default_product: if allow_piggy {
                Product::Piggy
            } else {
                Product::Ica
            },
        }
    }

    /// Resolves a raw requested product.
    ///
    /// `None` or a blank string means "no preference". Anything that is not
    /// `ICA`, `PIGGY` or `ESUSU` (case-insensitive) is `InvalidProduct`.
    pub fn resolve(
        &self,
        requested: Option<&str>,
        mode: ContributionMode,
        monthly_count: u64,
    ) -> ResultEngine<Resolution> {
        let requested = requested
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Product::parse_requested)
            .transpose()?;
        Ok(self.resolve_product(requested, mode, monthly_count))
    }

    /// Resolves an already-typed request. `FEE` is never produced for a
    /// member request, callers parse with [`Product::parse_requested`].
    #[must_use]
    pub fn resolve_product(
        &self,
        requested: Option<Product>,
        mode: ContributionMode,
        monthly_count: u64,
    ) -> Resolution {
        let state = self.state(mode, monthly_count);

        // Esusu is gated by group membership, not by the ICA window.
        if requested == Some(Product::Esusu) {
            return Resolution {
                requested,
                resolved: Product::Esusu,
                adjusted: false,
                notice: None,
                state,
            };
        }

        let wanted = requested.unwrap_or(state.default_product);
        let (resolved, notice) = match wanted {
            Product::Piggy if state.all_ica => (
                Product::Ica,
                Some("Your contribution mode is set to ICA only.".to_string()),
            ),
            Product::Piggy if state.ica_only_window_active => (
                Product::Ica,
                Some(format!(
                    "The first {} monthly contributions are ICA only.",
                    self.ica_only_limit
                )),
            ),
            other => (other, None),
        };

        Resolution {
            requested,
            resolved,
            adjusted: resolved != wanted,
            notice,
            state,
        }
    }
}
