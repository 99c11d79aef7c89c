use sea_orm::TransactionTrait;

use crate::{
    EngineError, ResultEngine, Transaction, TransactionKind, TransactionStatus, TransferOutcome,
    WalletTransferCmd,
    util::{ensure_positive_amount, normalize_optional_text},
};

use super::{
    Engine,
    ledger::{BalanceChanges, BalanceDelta},
    with_tx,
};

impl Engine {
    /// Moves wallet funds to another member.
    ///
    /// Both rows are locked through [`Engine::lock_accounts`], so opposite
    /// transfers between the same pair lock in the same order. The sent and
    /// received rows are written with the first kind label the schema takes.
    pub async fn transfer_to_wallet(&self, cmd: WalletTransferCmd) -> ResultEngine<TransferOutcome> {
        let WalletTransferCmd {
            account_id,
            recipient,
            amount_minor,
            password,
            note,
            occurred_at,
        } = cmd;
        ensure_positive_amount(amount_minor)?;
        let note = normalize_optional_text(note.as_deref());
        self.reauthenticate(&account_id, &password).await?;

        let recipient = self.find_recipient(&self.database, &recipient).await?;
        if recipient.id == account_id {
            return Err(EngineError::SelfTransferNotAllowed);
        }
        let sender_name = self.require_account(&self.database, &account_id).await?.name;

        with_tx!(self, |db_tx| {
            let mut locked = self
                .lock_accounts(&db_tx, &[account_id.as_str(), recipient.id.as_str()])
                .await?;
            let sender = locked
                .get(&account_id)
                .ok_or_else(|| EngineError::KeyNotFound("account not exists".to_string()))?;
            if sender.wallet_balance < amount_minor {
                return Err(EngineError::InsufficientBalance);
            }

            let mut changes = BalanceChanges::default();
            changes.add(&account_id, BalanceDelta::wallet(-amount_minor));
            changes.add(&recipient.id, BalanceDelta::wallet(amount_minor));
            self.apply_balance_changes(&db_tx, &mut locked, changes)
                .await?;

            let sent = Transaction::new(
                &account_id,
                TransactionKind::WalletTransferSent,
                amount_minor,
                self.config.currency,
                TransactionStatus::Completed,
                occurred_at,
            )?
            .note(Some(
                note.clone()
                    .unwrap_or_else(|| format!("Transfer to {}", recipient.name)),
            ));
            let sent = self
                .insert_transaction_with_fallback(&db_tx, sent, &TransactionKind::SENT_FALLBACK)
                .await?;

            let received = Transaction::new(
                &recipient.id,
                TransactionKind::WalletTransferReceived,
                amount_minor,
                self.config.currency,
                TransactionStatus::Completed,
                occurred_at,
            )?
            .note(Some(
                note.clone()
                    .unwrap_or_else(|| format!("Transfer from {sender_name}")),
            ));
            let received = self
                .insert_transaction_with_fallback(
                    &db_tx,
                    received,
                    &TransactionKind::RECEIVED_FALLBACK,
                )
                .await?;

            let wallet_balance_minor = locked
                .get(&account_id)
                .map(|m| m.wallet_balance)
                .unwrap_or_default();
            tracing::info!(
                from = %account_id,
                to = %recipient.id,
                amount_minor,
                sent_kind = sent.kind.as_str(),
                received_kind = received.kind.as_str(),
                "wallet transfer settled"
            );
            Ok(TransferOutcome {
                sent_transaction_id: sent.id,
                received_transaction_id: received.id,
                sent_kind: sent.kind,
                received_kind: received.kind,
                recipient_id: recipient.id.clone(),
                recipient_name: recipient.name.clone(),
                amount_minor,
                wallet_balance_minor,
            })
        })
    }
}
