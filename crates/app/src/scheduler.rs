//! Daily tick driving the monthly fee batch.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use engine::{Engine, FeeBatchOutcome};

/// Time left until the next UTC midnight strictly after `now`.
fn until_next_midnight(now: DateTime<Utc>) -> Duration {
    let next = (now.date_naive() + TimeDelta::days(1))
        .and_time(NaiveTime::MIN)
        .and_utc();
    (next - now).to_std().unwrap_or(Duration::from_secs(1))
}

/// Runs the batch once at startup, then at every UTC midnight. The batch is
/// a no-op except on the first of the month and charges each account at most
/// once per month, so a start on the 1st after midnight still collects it.
pub async fn run(engine: Arc<Engine>) {
    loop {
        tick(&engine, Utc::now().date_naive()).await;
        tokio::time::sleep(until_next_midnight(Utc::now())).await;
    }
}

async fn tick(engine: &Engine, today: NaiveDate) -> Option<FeeBatchOutcome> {
    match engine.run_monthly_fee_batch(today).await {
        Ok(outcome) => {
            if let FeeBatchOutcome::Completed(report) = &outcome {
                tracing::debug!(
                    %today,
                    applied = report.applied,
                    total_fees_minor = report.total_fees_minor,
                    "fee batch tick done"
                );
            }
            Some(outcome)
        }
        Err(err) => {
            tracing::error!(%today, "monthly fee batch failed: {err}");
            None
        }
    }
}
