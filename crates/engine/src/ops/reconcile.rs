use chrono::{DateTime, Datelike, Utc};
use sea_orm::{ActiveValue, DatabaseTransaction, TransactionTrait, prelude::*};

use crate::{
    EngineError, Product, ReconcileCmd, ReconcileOutcome, ResultEngine,
    gateway::{PaymentPurpose, PaymentTag, Receipt},
    gateway_references::{self, MarkerStatus},
    rules::Resolution,
    util::{ensure_positive_amount, is_unique_violation, normalize_required_text},
};

use super::{
    Engine,
    ledger::{BalanceChanges, BalanceDelta},
    with_tx,
};

/// What the first processing of a reference did.
enum Settlement {
    Settled {
        product: Option<Product>,
        resolution: Option<Resolution>,
    },
    Unmatched,
}

impl Engine {
    /// Verifies `reference` with the gateway and settles it at most once.
    ///
    /// The reference marker is the first row written by the unit of work and
    /// commits together with the balance mutation, so a crash in between
    /// leaves neither. A second call for a processed reference hits the
    /// marker's primary key and replays the stored result without mutating
    /// anything.
    ///
    /// A gateway timeout means "unknown": nothing is written and the caller
    /// retries later.
    pub async fn reconcile(&self, cmd: ReconcileCmd) -> ResultEngine<ReconcileOutcome> {
        let ReconcileCmd {
            reference,
            caller,
            occurred_at,
        } = cmd;
        let reference = normalize_required_text(&reference, "reference")?;

        let verified = self.gateway.verify(&reference).await.map_err(|err| {
            tracing::warn!(reference = %reference, error = %err, "gateway verify failed");
            EngineError::from(err)
        })?;
        // The marker is keyed on the reference the gateway settled, so a
        // differently spelled request for the same payment must not pass.
        if verified.reference != reference {
            tracing::warn!(
                requested = %reference,
                answered = %verified.reference,
                "gateway answered for another reference"
            );
            return Err(EngineError::GatewayRejected(format!(
                "gateway answered for {} instead of {reference}",
                verified.reference
            )));
        }
        if !verified.success {
            return Err(EngineError::GatewayRejected(format!(
                "payment {reference} is not successful (status: {})",
                verified.status
            )));
        }
        let tag = verified.tag.clone().ok_or_else(|| {
            EngineError::InvalidInput(format!("payment {reference} carries no account tag"))
        })?;
        if let Some(caller) = caller.as_deref()
            && caller != tag.account_id
        {
            return Err(EngineError::Forbidden(format!(
                "payment {reference} belongs to another account"
            )));
        }
        let amount_minor = verified.amount_minor;
        ensure_positive_amount(amount_minor)?;
        let receipt = Receipt::from_verified(
            &verified,
            self.config.currency,
            Some(tag.purpose.as_str()),
        );

        let settled: ResultEngine<Settlement> = with_tx!(self, |db_tx| {
            self.settle_reference(&db_tx, &reference, &tag, amount_minor, occurred_at)
                .await
        });

        match settled {
            Ok(Settlement::Settled {
                product,
                resolution,
            }) => {
                tracing::info!(
                    reference = %reference,
                    account_id = %tag.account_id,
                    purpose = tag.purpose.as_str(),
                    amount_minor,
                    "gateway payment settled"
                );
                Ok(ReconcileOutcome {
                    reference,
                    account_id: tag.account_id,
                    purpose: tag.purpose,
                    product,
                    amount_minor,
                    status: MarkerStatus::Settled,
                    replayed: false,
                    resolution,
                    receipt,
                })
            }
            Ok(Settlement::Unmatched) => {
                tracing::error!(
                    reference = %reference,
                    account_id = %tag.account_id,
                    amount_minor,
                    "no matching pending transaction, manual reconciliation required"
                );
                Err(EngineError::NoMatchingPendingTransaction(reference))
            }
            Err(EngineError::Database(err)) if is_unique_violation(&err) => {
                tracing::debug!(reference = %reference, "reference already processed");
                self.replay_reference(reference, receipt).await
            }
            Err(err) => Err(err),
        }
    }

    async fn settle_reference(
        &self,
        db_tx: &DatabaseTransaction,
        reference: &str,
        tag: &PaymentTag,
        amount_minor: i64,
        occurred_at: DateTime<Utc>,
    ) -> ResultEngine<Settlement> {
        gateway_references::ActiveModel {
            reference: ActiveValue::Set(reference.to_string()),
            account_id: ActiveValue::Set(tag.account_id.clone()),
            purpose: ActiveValue::Set(tag.purpose.as_str().to_string()),
            product: ActiveValue::Set(tag.product.map(|p| p.as_str().to_string())),
            amount_minor: ActiveValue::Set(amount_minor),
            status: ActiveValue::Set(MarkerStatus::Settled.as_str().to_string()),
            transaction_id: ActiveValue::Set(None),
            created_at: ActiveValue::Set(occurred_at),
        }
        .insert(db_tx)
        .await?;

        let Some(pending) = self
            .find_pending_locked(
                db_tx,
                &tag.account_id,
                tag.purpose.transaction_kind(),
                amount_minor,
                reference,
            )
            .await?
        else {
            self.mark_reference(db_tx, reference, MarkerStatus::Unmatched, None, None)
                .await?;
            return Ok(Settlement::Unmatched);
        };

        let reserve_id = self.config.reserve_account_id.as_str();
        let lock_ids: Vec<&str> = match tag.purpose {
            PaymentPurpose::Contribution => vec![tag.account_id.as_str(), reserve_id],
            PaymentPurpose::Deposit | PaymentPurpose::Fee => vec![tag.account_id.as_str()],
        };
        let mut locked = self.lock_accounts(db_tx, &lock_ids).await?;

        let mut changes = BalanceChanges::default();
        changes.add(&tag.account_id, BalanceDelta::wallet(amount_minor));

        let mut resolution = None;
        if tag.purpose == PaymentPurpose::Contribution {
            let account = locked
                .get(&tag.account_id)
                .ok_or_else(|| EngineError::KeyNotFound("account not exists".to_string()))?;
            let count = self
                .monthly_count(
                    db_tx,
                    &tag.account_id,
                    occurred_at.year(),
                    occurred_at.month(),
                )
                .await?;
            let requested = tag.product.filter(|p| *p != Product::Fee);
            let resolved = self
                .rules
                .resolve_product(requested, account.mode()?, count);
            changes.contribute(&tag.account_id, reserve_id, resolved.resolved, amount_minor);
            self.record_contribution(
                db_tx,
                &tag.account_id,
                resolved.resolved,
                amount_minor,
                occurred_at,
                tag.description.clone(),
            )
            .await?;
            resolution = Some(resolved);
        }

        self.apply_balance_changes(db_tx, &mut locked, changes)
            .await?;
        self.complete_pending(db_tx, &pending.id, reference).await?;

        let product = resolution.as_ref().map(|r| r.resolved);
        self.mark_reference(
            db_tx,
            reference,
            MarkerStatus::Settled,
            product,
            Some(&pending.id),
        )
        .await?;
        Ok(Settlement::Settled {
            product,
            resolution,
        })
    }

    async fn mark_reference(
        &self,
        db_tx: &DatabaseTransaction,
        reference: &str,
        status: MarkerStatus,
        product: Option<Product>,
        transaction_id: Option<&str>,
    ) -> ResultEngine<()> {
        let mut marker = gateway_references::ActiveModel {
            reference: ActiveValue::Set(reference.to_string()),
            status: ActiveValue::Set(status.as_str().to_string()),
            transaction_id: ActiveValue::Set(transaction_id.map(str::to_string)),
            ..Default::default()
        };
        if let Some(product) = product {
            marker.product = ActiveValue::Set(Some(product.as_str().to_string()));
        }
        marker.update(db_tx).await?;
        Ok(())
    }

    /// Side-effect-free read of the first processing of `reference`.
    async fn replay_reference(
        &self,
        reference: String,
        receipt: Receipt,
    ) -> ResultEngine<ReconcileOutcome> {
        let marker = gateway_references::Entity::find_by_id(reference.clone())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("reference {reference}")))?;
        Ok(ReconcileOutcome {
            account_id: marker.account_id,
            purpose: PaymentPurpose::try_from(marker.purpose.as_str())?,
            product: marker
                .product
                .as_deref()
                .map(Product::try_from)
                .transpose()?,
            amount_minor: marker.amount_minor,
            status: MarkerStatus::try_from(marker.status.as_str())?,
            replayed: true,
            resolution: None,
            receipt,
            reference,
        })
    }
}
