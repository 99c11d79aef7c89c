//! Command structs for engine operations.
//!
//! These types group parameters for settlement operations, keeping call sites
//! readable and avoiding long argument lists. Every command carries the
//! `occurred_at` instant it is applied at; the calendar month of a
//! contribution is derived from it.

use chrono::{DateTime, Utc};

use crate::gateway::{BankDetails, PaymentPurpose};

/// Register a member account.
#[derive(Clone, Debug)]
pub struct NewAccountCmd {
    pub id: Option<String>,
    pub name: String,
    pub password: String,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub member_no: Option<i64>,
    pub esusu_member: bool,
    pub occurred_at: DateTime<Utc>,
}

impl NewAccountCmd {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        password: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            password: password.into(),
            email: None,
            mobile: None,
            member_no: None,
            esusu_member: false,
            occurred_at,
        }
    }

    /// Use a caller-chosen id instead of a random UUID.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    #[must_use]
    pub fn mobile(mut self, mobile: impl Into<String>) -> Self {
        self.mobile = Some(mobile.into());
        self
    }

    #[must_use]
    pub fn member_no(mut self, member_no: i64) -> Self {
        self.member_no = Some(member_no);
        self
    }

    #[must_use]
    pub fn esusu_member(mut self, esusu_member: bool) -> Self {
        self.esusu_member = esusu_member;
        self
    }
}

/// Contribute from the wallet balance into a savings product.
#[derive(Clone, Debug)]
pub struct WalletContributionCmd {
    pub account_id: String,
    pub amount_minor: i64,
    /// Raw requested product; `None` lets the resolver pick.
    pub product: Option<String>,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl WalletContributionCmd {
    #[must_use]
    pub fn new(
        account_id: impl Into<String>,
        amount_minor: i64,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            amount_minor,
            product: None,
            description: None,
            occurred_at,
        }
    }

    #[must_use]
    pub fn product(mut self, product: impl Into<String>) -> Self {
        self.product = Some(product.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Start a gateway-funded payment.
#[derive(Clone, Debug)]
pub struct InitializePaymentCmd {
    pub account_id: String,
    pub amount_minor: i64,
    pub purpose: PaymentPurpose,
    /// Only meaningful for [`PaymentPurpose::Contribution`].
    pub product: Option<String>,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl InitializePaymentCmd {
    #[must_use]
    pub fn new(
        account_id: impl Into<String>,
        amount_minor: i64,
        purpose: PaymentPurpose,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            amount_minor,
            purpose,
            product: None,
            description: None,
            occurred_at,
        }
    }

    #[must_use]
    pub fn product(mut self, product: impl Into<String>) -> Self {
        self.product = Some(product.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Settle a gateway reference.
#[derive(Clone, Debug)]
pub struct ReconcileCmd {
    pub reference: String,
    /// Authenticated account asking for verification; `None` for webhooks.
    pub caller: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl ReconcileCmd {
    #[must_use]
    pub fn new(reference: impl Into<String>, occurred_at: DateTime<Utc>) -> Self {
        Self {
            reference: reference.into(),
            caller: None,
            occurred_at,
        }
    }

    #[must_use]
    pub fn caller(mut self, account_id: impl Into<String>) -> Self {
        self.caller = Some(account_id.into());
        self
    }
}

/// Move funds to another member's wallet.
#[derive(Clone, Debug)]
pub struct WalletTransferCmd {
    pub account_id: String,
    /// Account id, member number, email or public wallet id.
    pub recipient: String,
    pub amount_minor: i64,
    pub password: String,
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl WalletTransferCmd {
    #[must_use]
    pub fn new(
        account_id: impl Into<String>,
        recipient: impl Into<String>,
        amount_minor: i64,
        password: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            recipient: recipient.into(),
            amount_minor,
            password: password.into(),
            note: None,
            occurred_at,
        }
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Move funds from the Piggy balance back to the wallet.
#[derive(Clone, Debug)]
pub struct PiggyWithdrawalCmd {
    pub account_id: String,
    pub amount_minor: i64,
    pub occurred_at: DateTime<Utc>,
}

impl PiggyWithdrawalCmd {
    #[must_use]
    pub fn new(
        account_id: impl Into<String>,
        amount_minor: i64,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            amount_minor,
            occurred_at,
        }
    }
}

/// Whether a bank payout is the member's own withdrawal or a transfer to a
/// third party. Only the recorded transaction kind differs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PayoutKind {
    #[default]
    Withdrawal,
    Transfer,
}

/// Pay out from the wallet to an external bank account.
#[derive(Clone, Debug)]
pub struct BankPayoutCmd {
    pub account_id: String,
    pub amount_minor: i64,
    pub bank: BankDetails,
    pub password: String,
    pub kind: PayoutKind,
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl BankPayoutCmd {
    #[must_use]
    pub fn new(
        account_id: impl Into<String>,
        amount_minor: i64,
        bank: BankDetails,
        password: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            amount_minor,
            bank,
            password: password.into(),
            kind: PayoutKind::Withdrawal,
            note: None,
            occurred_at,
        }
    }

    #[must_use]
    pub fn kind(mut self, kind: PayoutKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}
