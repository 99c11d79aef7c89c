//! Engine values to wire DTOs.

use api_types::{
    account::AccountView,
    contribution::{
        ContributionMode as ApiMode, ContributionView, Product as ApiProduct, ResolutionView,
    },
    payment::{PaymentPurpose as ApiPurpose, PaymentVerified, ReceiptView, ReferenceStatus},
    transaction::{TransactionKind as ApiKind, TransactionStatus as ApiStatus, TransactionView},
};
use engine::{
    AccountSummary, Contribution, ContributionMode, Currency, MarkerStatus, Product,
    ReconcileOutcome, Resolution, Transaction, TransactionKind, TransactionStatus,
    gateway::{PaymentPurpose, Receipt},
};

pub(crate) fn product(product: Product) -> ApiProduct {
    match product {
        Product::Ica => ApiProduct::Ica,
        Product::Piggy => ApiProduct::Piggy,
        Product::Esusu => ApiProduct::Esusu,
        Product::Fee => ApiProduct::Fee,
    }
}

pub(crate) fn mode(mode: ContributionMode) -> ApiMode {
    match mode {
        ContributionMode::Auto => ApiMode::Auto,
        ContributionMode::AllIca => ApiMode::AllIca,
    }
}

pub(crate) fn engine_mode(mode: ApiMode) -> ContributionMode {
    match mode {
        ApiMode::Auto => ContributionMode::Auto,
        ApiMode::AllIca => ContributionMode::AllIca,
    }
}

pub(crate) fn purpose(purpose: PaymentPurpose) -> ApiPurpose {
    match purpose {
        PaymentPurpose::Deposit => ApiPurpose::Deposit,
        PaymentPurpose::Fee => ApiPurpose::Fee,
        PaymentPurpose::Contribution => ApiPurpose::Contribution,
    }
}

pub(crate) fn marker_status(status: MarkerStatus) -> ReferenceStatus {
    match status {
        MarkerStatus::Settled => ReferenceStatus::Settled,
        MarkerStatus::Unmatched => ReferenceStatus::Unmatched,
    }
}

pub(crate) fn kind(kind: TransactionKind) -> ApiKind {
    match kind {
        TransactionKind::Contribution => ApiKind::Contribution,
        TransactionKind::Deposit => ApiKind::Deposit,
        TransactionKind::Fee => ApiKind::Fee,
        TransactionKind::Withdrawal => ApiKind::Withdrawal,
        TransactionKind::Transfer => ApiKind::Transfer,
        TransactionKind::WalletTransferSent => ApiKind::WalletTransferSent,
        TransactionKind::WalletTransferReceived => ApiKind::WalletTransferReceived,
        TransactionKind::MonthlyFee => ApiKind::MonthlyFee,
    }
}

fn status(status: TransactionStatus) -> ApiStatus {
    match status {
        TransactionStatus::Pending => ApiStatus::Pending,
        TransactionStatus::Completed => ApiStatus::Completed,
        TransactionStatus::Failed => ApiStatus::Failed,
    }
}

fn currency(currency: Currency) -> api_types::Currency {
    match currency {
        Currency::Ngn => api_types::Currency::Ngn,
    }
}

pub(crate) fn resolution(resolution: Resolution) -> ResolutionView {
    ResolutionView {
        requested: resolution.requested.map(product),
        resolved: product(resolution.resolved),
        adjusted: resolution.adjusted,
        notice: resolution.notice,
    }
}

pub(crate) fn account(summary: AccountSummary) -> AccountView {
    AccountView {
        id: summary.id,
        name: summary.name,
        email: summary.email,
        wallet_id: summary.wallet_id,
        wallet_balance_minor: summary.wallet_balance_minor,
        ica_balance_minor: summary.ica_balance_minor,
        piggy_balance_minor: summary.piggy_balance_minor,
        contribution_mode: mode(summary.contribution_mode),
        esusu_member: summary.esusu_member,
        created_at: summary.created_at,
    }
}

pub(crate) fn contribution(contribution: Contribution) -> ContributionView {
    ContributionView {
        id: contribution.id,
        product: product(contribution.product),
        amount_minor: contribution.amount_minor,
        year: contribution.year,
        month: contribution.month,
        contribution_date: contribution.contribution_date,
        description: contribution.description,
        created_at: contribution.created_at,
    }
}

pub(crate) fn transaction(tx: Transaction) -> TransactionView {
    TransactionView {
        id: tx.id,
        kind: kind(tx.kind),
        amount_minor: tx.amount_minor,
        currency: currency(tx.currency),
        status: status(tx.status),
        reference: tx.reference,
        note: tx.note,
        created_at: tx.created_at,
    }
}

pub(crate) fn receipt(receipt: Receipt) -> ReceiptView {
    ReceiptView {
        gateway_transaction_id: receipt.gateway_transaction_id,
        reference: receipt.reference,
        status: receipt.status,
        amount_minor: receipt.amount_minor,
        requested_amount_minor: receipt.requested_amount_minor,
        fees_minor: receipt.fees_minor,
        net_amount_minor: receipt.net_amount_minor,
        currency: receipt.currency,
        channel: receipt.channel,
        paid_at: receipt.paid_at,
        customer_email: receipt.customer_email,
        payment_type: receipt.payment_type,
        sender_name: receipt.sender_name,
        sender_bank: receipt.sender_bank,
        narration: receipt.narration,
    }
}

pub(crate) fn verified(outcome: ReconcileOutcome) -> PaymentVerified {
    PaymentVerified {
        reference: outcome.reference,
        status: marker_status(outcome.status),
        replayed: outcome.replayed,
        purpose: purpose(outcome.purpose),
        product: outcome.product.map(product),
        amount_minor: outcome.amount_minor,
        resolution: outcome.resolution.map(resolution),
        receipt: receipt(outcome.receipt),
    }
}
