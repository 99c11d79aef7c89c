use chrono::{DateTime, Datelike, Utc};
use sea_orm::{DatabaseTransaction, TransactionTrait};

use crate::{
    Contribution, ContributionInfo, ContributionMode, ContributionOutcome, EngineError, Product,
    ResultEngine, Transaction, TransactionKind, TransactionStatus, WalletContributionCmd,
    rules::Resolution,
    util::{ensure_positive_amount, normalize_optional_text},
};

use super::{
    Engine,
    ledger::{BalanceChanges, LockedAccounts},
    with_tx,
};

impl Engine {
    /// Contributes from the wallet into ICA or Piggy.
    ///
    /// The product is resolved once before any lock (bad input fails fast)
    /// and again under the account lock; the locked resolution is the one
    /// committed. Esusu goes through the group flow and is refused here.
    pub async fn contribute_from_wallet(
        &self,
        cmd: WalletContributionCmd,
    ) -> ResultEngine<ContributionOutcome> {
        let WalletContributionCmd {
            account_id,
            amount_minor,
            product,
            description,
            occurred_at,
        } = cmd;
        ensure_positive_amount(amount_minor)?;
        let description = normalize_optional_text(description.as_deref());
        let (year, month) = (occurred_at.year(), occurred_at.month());

        let account = self.require_account(&self.database, &account_id).await?;
        let count = self
            .monthly_count(&self.database, &account_id, year, month)
            .await?;
        let preview = self.rules.resolve(product.as_deref(), account.mode()?, count)?;
        ensure_wallet_product(preview.resolved)?;

        let reserve_id = self.config.reserve_account_id.clone();
        with_tx!(self, |db_tx| {
            let mut locked = self
                .lock_accounts(&db_tx, &[account_id.as_str(), reserve_id.as_str()])
                .await?;
            let account = locked
                .get(&account_id)
                .ok_or_else(|| EngineError::KeyNotFound("account not exists".to_string()))?;
            let count = self
                .monthly_count(&db_tx, &account_id, year, month)
                .await?;
            let resolution = self
                .rules
                .resolve_product(preview.requested, account.mode()?, count);
            ensure_wallet_product(resolution.resolved)?;
            if account.wallet_balance < amount_minor {
                return Err(EngineError::InsufficientBalance);
            }

            let mut changes = BalanceChanges::default();
            changes.contribute(&account_id, &reserve_id, resolution.resolved, amount_minor);
            self.apply_balance_changes(&db_tx, &mut locked, changes)
                .await?;

            let transaction = Transaction::new(
                &account_id,
                TransactionKind::Contribution,
                amount_minor,
                self.config.currency,
                TransactionStatus::Completed,
                occurred_at,
            )?
            .note(Some(format!("{} contribution", resolution.resolved)));
            self.insert_transaction(&db_tx, &transaction).await?;

            let contribution = self
                .record_contribution(
                    &db_tx,
                    &account_id,
                    resolution.resolved,
                    amount_minor,
                    occurred_at,
                    description,
                )
                .await?;
            tracing::info!(
                account_id = %account_id,
                product = %resolution.resolved,
                adjusted = resolution.adjusted,
                amount_minor,
                "wallet contribution settled"
            );
            Ok(contribution_outcome(
                &locked,
                &account_id,
                contribution,
                transaction,
                resolution,
            ))
        })
    }

    pub(super) async fn record_contribution(
        &self,
        db_tx: &DatabaseTransaction,
        account_id: &str,
        product: Product,
        amount_minor: i64,
        occurred_at: DateTime<Utc>,
        description: Option<String>,
    ) -> ResultEngine<Contribution> {
        let contribution =
            Contribution::new(account_id, product, amount_minor, occurred_at, description)?;
        self.insert_contribution(db_tx, &contribution).await?;
        Ok(contribution)
    }

    /// Read-only projection of the resolver for the account's current month.
    pub async fn contribution_info(
        &self,
        account_id: &str,
        at: DateTime<Utc>,
    ) -> ResultEngine<ContributionInfo> {
        let account = self.require_account(&self.database, account_id).await?;
        let mode = account.mode()?;
        let monthly_count = self
            .monthly_count(&self.database, account_id, at.year(), at.month())
            .await?;
        let state = self.rules.state(mode, monthly_count);

        let mut allowed_products = vec![Product::Ica];
        if state.allow_piggy {
            allowed_products.push(Product::Piggy);
        }
        if account.esusu_member {
            allowed_products.push(Product::Esusu);
        }
        let mode_description = match mode {
            ContributionMode::AllIca => "All contributions go to ICA.".to_string(),
            ContributionMode::Auto if state.ica_only_window_active => format!(
                "The first {} monthly contributions go to ICA, {} remaining this month.",
                self.rules.ica_only_limit(),
                state.remaining_ica_only
            ),
            ContributionMode::Auto => {
                "ICA-only window complete, Piggy contributions are open.".to_string()
            }
        };
        Ok(ContributionInfo {
            contribution_mode: mode,
            mode_description,
            monthly_count,
            ica_only_limit: self.rules.ica_only_limit(),
            state,
            allowed_products,
        })
    }
}

fn ensure_wallet_product(product: Product) -> ResultEngine<()> {
    match product {
        Product::Ica | Product::Piggy => Ok(()),
        Product::Esusu => Err(EngineError::InvalidProduct(
            "ESUSU contributions are handled through the Esusu group flow".to_string(),
        )),
        Product::Fee => Err(EngineError::InvalidProduct(Product::Fee.to_string())),
    }
}

fn contribution_outcome(
    locked: &LockedAccounts,
    account_id: &str,
    contribution: Contribution,
    transaction: Transaction,
    resolution: Resolution,
) -> ContributionOutcome {
    let (wallet, ica, piggy) = locked
        .get(account_id)
        .map(|m| (m.wallet_balance, m.ica_balance, m.piggy_balance))
        .unwrap_or_default();
    ContributionOutcome {
        contribution_id: contribution.id,
        transaction_id: transaction.id,
        amount_minor: contribution.amount_minor,
        resolution,
        wallet_balance_minor: wallet,
        ica_balance_minor: ica,
        piggy_balance_minor: piggy,
    }
}
