use sea_orm::TransactionTrait;
use uuid::Uuid;

use crate::{
    BankPayoutCmd, EngineError, PayoutKind, PayoutOutcome, PiggyWithdrawalCmd,
    PiggyWithdrawalOutcome, ResultEngine, Transaction, TransactionKind, TransactionStatus,
    gateway::{BankDetails, PayoutRequest},
    util::{ensure_positive_amount, normalize_optional_text, normalize_required_text},
};

use super::{
    Engine,
    ledger::{BalanceChanges, BalanceDelta},
    with_tx,
};

impl PayoutKind {
    fn transaction_kind(self) -> TransactionKind {
        match self {
            Self::Withdrawal => TransactionKind::Withdrawal,
            Self::Transfer => TransactionKind::Transfer,
        }
    }
}

impl Engine {
    /// Moves funds from the Piggy balance back into the wallet.
    pub async fn withdraw_from_piggy(
        &self,
        cmd: PiggyWithdrawalCmd,
    ) -> ResultEngine<PiggyWithdrawalOutcome> {
        let PiggyWithdrawalCmd {
            account_id,
            amount_minor,
            occurred_at,
        } = cmd;
        ensure_positive_amount(amount_minor)?;

        with_tx!(self, |db_tx| {
            let mut locked = self.lock_accounts(&db_tx, &[account_id.as_str()]).await?;
            let account = locked
                .get(&account_id)
                .ok_or_else(|| EngineError::KeyNotFound("account not exists".to_string()))?;
            if account.piggy_balance < amount_minor {
                return Err(EngineError::InsufficientPiggyBalance);
            }

            let mut changes = BalanceChanges::default();
            changes.add(
                &account_id,
                BalanceDelta {
                    wallet: amount_minor,
                    ica: 0,
                    piggy: -amount_minor,
                },
            );
            self.apply_balance_changes(&db_tx, &mut locked, changes)
                .await?;

            let transaction = Transaction::new(
                &account_id,
                TransactionKind::Deposit,
                amount_minor,
                self.config.currency,
                TransactionStatus::Completed,
                occurred_at,
            )?
            .note(Some("Piggy withdrawal to wallet".to_string()));
            self.insert_transaction(&db_tx, &transaction).await?;

            let account = locked
                .get(&account_id)
                .ok_or_else(|| EngineError::KeyNotFound("account not exists".to_string()))?;
            Ok(PiggyWithdrawalOutcome {
                transaction_id: transaction.id,
                amount_minor,
                wallet_balance_minor: account.wallet_balance,
                piggy_balance_minor: account.piggy_balance,
            })
        })
    }

    /// Pays out from the wallet to a bank account.
    ///
    /// The wallet is debited only after the gateway confirmed the payout. A
    /// gateway failure rolls back the unit of work with nothing recorded.
    pub async fn payout_to_bank(&self, cmd: BankPayoutCmd) -> ResultEngine<PayoutOutcome> {
        let BankPayoutCmd {
            account_id,
            amount_minor,
            bank,
            password,
            kind,
            note,
            occurred_at,
        } = cmd;
        ensure_positive_amount(amount_minor)?;
        let bank = BankDetails {
            account_number: normalize_required_text(&bank.account_number, "account number")?,
            bank_code: normalize_required_text(&bank.bank_code, "bank code")?,
            account_name: normalize_required_text(&bank.account_name, "account name")?,
        };
        let note = normalize_optional_text(note.as_deref());
        self.reauthenticate(&account_id, &password).await?;

        with_tx!(self, |db_tx| {
            let mut locked = self.lock_accounts(&db_tx, &[account_id.as_str()]).await?;
            let account = locked
                .get(&account_id)
                .ok_or_else(|| EngineError::KeyNotFound("account not exists".to_string()))?;
            if account.wallet_balance < amount_minor {
                return Err(EngineError::InsufficientBalance);
            }

            let request = PayoutRequest {
                amount_minor,
                reason: note
                    .clone()
                    .unwrap_or_else(|| format!("Payout to {}", bank.account_name)),
                destination: bank.clone(),
                reference: format!("payout-{}", Uuid::new_v4().simple()),
                currency: self.config.currency.code().to_string(),
            };
            let payout = self.gateway.payout(request).await.map_err(|err| {
                tracing::warn!(account_id = %account_id, error = %err, "gateway payout failed");
                EngineError::from(err)
            })?;
            if !payout.success {
                return Err(EngineError::GatewayRejected(
                    payout
                        .message
                        .unwrap_or_else(|| format!("payout status: {}", payout.status)),
                ));
            }

            self.apply_balance_changes(&db_tx, &mut locked, {
                let mut changes = BalanceChanges::default();
                changes.add(&account_id, BalanceDelta::wallet(-amount_minor));
                changes
            })
            .await?;

            let transaction = Transaction::new(
                &account_id,
                kind.transaction_kind(),
                amount_minor,
                self.config.currency,
                TransactionStatus::Completed,
                occurred_at,
            )?
            .reference(Some(payout.reference.clone()))
            .note(Some(note.unwrap_or_else(|| {
                format!("{} ({})", bank.account_name, bank.account_number)
            })));
            self.insert_transaction(&db_tx, &transaction).await?;
            tracing::info!(
                account_id = %account_id,
                reference = %payout.reference,
                amount_minor,
                "bank payout settled"
            );

            Ok(PayoutOutcome {
                transaction_id: transaction.id,
                kind: transaction.kind,
                reference: payout.reference,
                gateway_status: payout.status,
                amount_minor,
                wallet_balance_minor: locked
                    .get(&account_id)
                    .map(|m| m.wallet_balance)
                    .unwrap_or_default(),
            })
        })
    }
}
