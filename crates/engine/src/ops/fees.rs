//! Monthly fee batch.
//!
//! On the first day of a month every account that contributed to ICA or
//! Piggy during the previous month is charged a percentage of that total.
//! The eligible set is computed by [`assess_monthly_fees`], a pure function;
//! each account is then charged in its own unit of work so one failure never
//! stops the batch.

use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicBool, Ordering},
};

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use sea_orm::{PaginatorTrait, QueryFilter, TransactionTrait, prelude::*};

use crate::{
    Contribution, EngineError, FeeBatchOutcome, FeeBatchReport, Money, Product, ResultEngine,
    Transaction, TransactionKind, TransactionStatus,
    config::{DEFAULT_MONTHLY_FEE_RATE_BPS, MONTHLY_FEE_DESCRIPTION},
    contributions, transactions,
    util::previous_month,
};

use super::{
    Engine,
    ledger::{BalanceChanges, BalanceDelta},
    with_tx,
};

/// Fee owed by one contributor for the base month.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeeAssessment {
    pub account_id: String,
    pub base_minor: i64,
    pub fee_minor: i64,
}

/// Sums ICA and Piggy contributions per account and applies `rate_bps`.
///
/// Only the products in [`Product::FEE_BASE`] count; the caller filters the
/// month. The result is ordered by account id.
pub fn assess_monthly_fees(contributions: &[Contribution], rate_bps: u32) -> Vec<FeeAssessment> {
    let mut bases: BTreeMap<&str, i64> = BTreeMap::new();
    for contribution in contributions
        .iter()
        .filter(|c| Product::FEE_BASE.contains(&c.product))
    {
        let base = bases.entry(contribution.account_id.as_str()).or_default();
        *base = base.saturating_add(contribution.amount_minor);
    }
    bases
        .into_iter()
        .filter(|(_, base)| *base > 0)
        .map(|(account_id, base_minor)| FeeAssessment {
            account_id: account_id.to_string(),
            base_minor,
            fee_minor: Money::new(base_minor)
                .percent_bps(rate_bps)
                .map(Money::minor)
                .unwrap_or_default(),
        })
        .collect()
}

#[derive(Debug, PartialEq, Eq)]
enum FeeCharge {
    Applied,
    Insufficient,
    AlreadyCharged,
    ZeroFee,
}

/// Puts the batch back to `Idle` however the run ends.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Engine {
    pub fn fee_rate_bps(&self) -> u32 {
        match self.config.monthly_fee_rate_bps {
            0 => DEFAULT_MONTHLY_FEE_RATE_BPS,
            bps => bps,
        }
    }

    /// Runs the monthly fee batch for `today`.
    ///
    /// A no-op unless `today` is the first of the month; a trigger while a
    /// run is in progress returns [`FeeBatchOutcome::AlreadyRunning`].
    pub async fn run_monthly_fee_batch(&self, today: NaiveDate) -> ResultEngine<FeeBatchOutcome> {
        if today.day() != 1 {
            tracing::debug!(%today, "monthly fee batch not due");
            return Ok(FeeBatchOutcome::NotDue);
        }
        if self
            .fee_batch_running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!(%today, "monthly fee batch already running");
            return Ok(FeeBatchOutcome::AlreadyRunning);
        }
        let _running = RunningGuard(&self.fee_batch_running);

        let (base_year, base_month) = previous_month(today);
        let rate_bps = self.fee_rate_bps();
        let models = contributions::Entity::find()
            .filter(contributions::Column::Year.eq(base_year))
            .filter(contributions::Column::Month.eq(base_month as i32))
            .filter(
                contributions::Column::Product
                    .is_in(Product::FEE_BASE.map(|p| p.as_str().to_string())),
            )
            .all(&self.database)
            .await?;
        let contributions = models
            .into_iter()
            .map(Contribution::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;
        let assessments: Vec<FeeAssessment> = assess_monthly_fees(&contributions, rate_bps)
            .into_iter()
            .filter(|a| a.account_id != self.config.reserve_account_id)
            .collect();

        let occurred_at = today.and_time(NaiveTime::MIN).and_utc();
        let period = format!("{base_year}-{base_month:02}");
        let mut report = FeeBatchReport {
            run_date: Some(today),
            base_year,
            base_month,
            rate_bps,
            eligible: assessments.len(),
            ..FeeBatchReport::default()
        };

        for assessment in &assessments {
            match self
                .charge_monthly_fee(assessment, &period, occurred_at)
                .await
            {
                Ok(FeeCharge::Applied) => {
                    report.applied += 1;
                    report.total_fees_minor += assessment.fee_minor;
                }
                Ok(FeeCharge::Insufficient) => {
                    report.insufficient += 1;
                    tracing::warn!(
                        account_id = %assessment.account_id,
                        fee_minor = assessment.fee_minor,
                        "insufficient wallet balance for monthly fee"
                    );
                }
                Ok(FeeCharge::AlreadyCharged | FeeCharge::ZeroFee) => report.skipped += 1,
                Err(err) => {
                    report.errored += 1;
                    tracing::warn!(
                        account_id = %assessment.account_id,
                        error = %err,
                        "monthly fee charge failed"
                    );
                }
            }
        }

        tracing::info!(
            %today,
            period = %period,
            rate = rate_bps,
            eligible = report.eligible,
            applied = report.applied,
            insufficient = report.insufficient,
            skipped = report.skipped,
            errored = report.errored,
            "monthly fee batch completed"
        );
        Ok(FeeBatchOutcome::Completed(report))
    }

    async fn charge_monthly_fee(
        &self,
        assessment: &FeeAssessment,
        period: &str,
        occurred_at: DateTime<Utc>,
    ) -> ResultEngine<FeeCharge> {
        if assessment.fee_minor <= 0 {
            return Ok(FeeCharge::ZeroFee);
        }
        let account_id = assessment.account_id.as_str();
        if self
            .fee_already_charged(&self.database, account_id, occurred_at)
            .await?
        {
            return Ok(FeeCharge::AlreadyCharged);
        }

        let reserve_id = self.config.reserve_account_id.as_str();
        let fee_minor = assessment.fee_minor;
        let note = format!("Monthly fee for {period}");
        with_tx!(self, |db_tx| {
            let mut locked = self.lock_accounts(&db_tx, &[account_id, reserve_id]).await?;
            if self
                .fee_already_charged(&db_tx, account_id, occurred_at)
                .await?
            {
                return Ok(FeeCharge::AlreadyCharged);
            }
            let wallet_balance = locked
                .get(account_id)
                .map(|m| m.wallet_balance)
                .ok_or_else(|| EngineError::KeyNotFound("account not exists".to_string()))?;

            if wallet_balance < fee_minor {
                if !self
                    .failed_fee_recorded(&db_tx, account_id, &note)
                    .await?
                {
                    let failed = Transaction::new(
                        account_id,
                        TransactionKind::MonthlyFee,
                        fee_minor,
                        self.config.currency,
                        TransactionStatus::Failed,
                        occurred_at,
                    )?
                    .note(Some(note.clone()));
                    self.insert_transaction(&db_tx, &failed).await?;
                }
                Ok(FeeCharge::Insufficient)
            } else {
                let mut changes = BalanceChanges::default();
                changes.add(account_id, BalanceDelta::wallet(-fee_minor));
                changes.add(reserve_id, BalanceDelta::wallet(fee_minor));
                self.apply_balance_changes(&db_tx, &mut locked, changes)
                    .await?;
                self.record_contribution(
                    &db_tx,
                    account_id,
                    Product::Fee,
                    fee_minor,
                    occurred_at,
                    Some(MONTHLY_FEE_DESCRIPTION.to_string()),
                )
                .await?;
                let charged = Transaction::new(
                    account_id,
                    TransactionKind::MonthlyFee,
                    fee_minor,
                    self.config.currency,
                    TransactionStatus::Completed,
                    occurred_at,
                )?
                .note(Some(note.clone()));
                self.insert_transaction(&db_tx, &charged).await?;
                Ok(FeeCharge::Applied)
            }
        })
    }

    /// A FEE contribution carrying the batch description exists for the
    /// month of `at`.
    async fn fee_already_charged<C: ConnectionTrait>(
        &self,
        db: &C,
        account_id: &str,
        at: DateTime<Utc>,
    ) -> ResultEngine<bool> {
        let count = contributions::Entity::find()
            .filter(contributions::Column::AccountId.eq(account_id))
            .filter(contributions::Column::Product.eq(Product::Fee.as_str()))
            .filter(contributions::Column::Year.eq(at.year()))
            .filter(contributions::Column::Month.eq(at.month() as i32))
            .filter(contributions::Column::Description.eq(MONTHLY_FEE_DESCRIPTION))
            .count(db)
            .await?;
        Ok(count > 0)
    }

    async fn failed_fee_recorded<C: ConnectionTrait>(
        &self,
        db: &C,
        account_id: &str,
        note: &str,
    ) -> ResultEngine<bool> {
        let count = transactions::Entity::find()
            .filter(transactions::Column::AccountId.eq(account_id))
            .filter(transactions::Column::Kind.eq(TransactionKind::MonthlyFee.as_str()))
            .filter(transactions::Column::Status.eq(TransactionStatus::Failed.as_str()))
            .filter(transactions::Column::Note.eq(note))
            .count(db)
            .await?;
        Ok(count > 0)
    }
}
