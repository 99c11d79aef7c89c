mod common;

use chrono::NaiveDate;
use common::{RESERVE, at, harness};
use engine::{FeeBatchOutcome, MONTHLY_FEE_DESCRIPTION, Product, WalletContributionCmd};

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn completed(outcome: FeeBatchOutcome) -> engine::FeeBatchReport {
    match outcome {
        FeeBatchOutcome::Completed(report) => report,
        other => panic!("expected a completed run, got {other:?}"),
    }
}

#[tokio::test]
async fn monthly_fee_is_charged_once_per_month() {
    let h = harness().await;
    let a = h.account("a", 100_000).await;
    h.engine
        .contribute_from_wallet(WalletContributionCmd::new(&a, 50_000, at(2026, 2, 3)))
        .await
        .unwrap();
    h.engine
        .contribute_from_wallet(WalletContributionCmd::new(&a, 20_000, at(2026, 2, 17)))
        .await
        .unwrap();
    let (wallet_before, ica, _) = h.balances(&a).await;
    assert_eq!((wallet_before, ica), (30_000, 70_000));
    let reserve_before = h.balances(RESERVE).await.0;

    let report = completed(h.engine.run_monthly_fee_batch(date(2026, 3, 1)).await.unwrap());
    assert_eq!((report.base_year, report.base_month), (2026, 2));
    assert_eq!(report.rate_bps, 200);
    assert_eq!(report.eligible, 1);
    assert_eq!(report.applied, 1);
    assert_eq!(report.total_fees_minor, 1_400);
    assert_eq!(h.balances(&a).await.0, 28_600);
    assert_eq!(h.balances(RESERVE).await.0, reserve_before + 1_400);

    let rerun = completed(h.engine.run_monthly_fee_batch(date(2026, 3, 1)).await.unwrap());
    assert_eq!(rerun.applied, 0);
    assert_eq!(rerun.skipped, 1);
    assert_eq!(h.balances(&a).await.0, 28_600);

    let fees: Vec<_> = h
        .engine
        .list_contributions(&a)
        .await
        .unwrap()
        .into_iter()
        .filter(|c| c.product == Product::Fee)
        .collect();
    assert_eq!(fees.len(), 1);
    assert_eq!((fees[0].year, fees[0].month), (2026, 3));
    assert_eq!(fees[0].description.as_deref(), Some(MONTHLY_FEE_DESCRIPTION));

    // The fee deduction does not use up the member's ICA-only window.
    let info = h.engine.contribution_info(&a, at(2026, 3, 2)).await.unwrap();
    assert_eq!(info.monthly_count, 0);
}

#[tokio::test]
async fn batch_only_runs_on_the_first_of_the_month() {
    let h = harness().await;
    let a = h.account("a", 10_000).await;
    h.engine
        .contribute_from_wallet(WalletContributionCmd::new(&a, 5_000, at(2026, 2, 3)))
        .await
        .unwrap();

    let outcome = h.engine.run_monthly_fee_batch(date(2026, 3, 2)).await.unwrap();
    assert_eq!(outcome, FeeBatchOutcome::NotDue);
    assert_eq!(h.balances(&a).await.0, 5_000);
}

#[tokio::test]
async fn insufficient_wallet_records_one_failed_fee() {
    let h = harness().await;
    let a = h.account("a", 10_000).await;
    h.engine
        .contribute_from_wallet(WalletContributionCmd::new(&a, 10_000, at(2026, 2, 3)))
        .await
        .unwrap();
    assert_eq!(h.balances(&a).await.0, 0);

    for _ in 0..2 {
        let report = completed(h.engine.run_monthly_fee_batch(date(2026, 3, 1)).await.unwrap());
        assert_eq!(report.insufficient, 1);
        assert_eq!(report.applied, 0);
    }

    assert_eq!(
        h.count(
            "SELECT COUNT(*) FROM transactions WHERE account_id = ? AND kind = 'monthly_fee' AND status = 'failed'",
            vec![a.clone().into()],
        )
        .await,
        1
    );
    assert_eq!(h.balances(&a).await, (0, 10_000, 0));
}

#[tokio::test]
async fn only_the_previous_month_is_assessed() {
    let h = harness().await;
    let a = h.account("a", 100_000).await;
    let b = h.account("b", 100_000).await;
    h.engine
        .contribute_from_wallet(WalletContributionCmd::new(&a, 10_000, at(2026, 1, 20)))
        .await
        .unwrap();
    h.engine
        .contribute_from_wallet(WalletContributionCmd::new(&b, 10_000, at(2026, 2, 20)))
        .await
        .unwrap();

    let report = completed(h.engine.run_monthly_fee_batch(date(2026, 3, 1)).await.unwrap());
    assert_eq!(report.eligible, 1);
    assert_eq!(report.total_fees_minor, 200);
    assert_eq!(h.balances(&a).await.0, 90_000);
    assert_eq!(h.balances(&b).await.0, 89_800);
}

#[tokio::test]
async fn january_run_assesses_december() {
    let h = harness().await;
    let a = h.account("a", 100_000).await;
    h.engine
        .contribute_from_wallet(WalletContributionCmd::new(&a, 25_000, at(2025, 12, 30)))
        .await
        .unwrap();

    let report = completed(h.engine.run_monthly_fee_batch(date(2026, 1, 1)).await.unwrap());
    assert_eq!((report.base_year, report.base_month), (2025, 12));
    assert_eq!(report.total_fees_minor, 500);
}
