mod common;

use common::{RESERVE, at, harness};
use engine::{ContributionMode, EngineError, Product, TransactionKind, WalletContributionCmd};

#[tokio::test]
async fn piggy_requests_land_in_ica_until_the_window_closes() {
    let h = harness().await;
    let a = h.account("a", 1_000_000).await;

    for day in 1..=10 {
        let outcome = h
            .engine
            .contribute_from_wallet(
                WalletContributionCmd::new(&a, 1_000, at(2026, 3, day)).product("PIGGY"),
            )
            .await
            .unwrap();
        assert_eq!(outcome.resolution.resolved, Product::Ica);
        assert!(outcome.resolution.adjusted);
        assert!(outcome.resolution.notice.is_some());
    }

    let eleventh = h
        .engine
        .contribute_from_wallet(
            WalletContributionCmd::new(&a, 1_000, at(2026, 3, 11)).product("piggy"),
        )
        .await
        .unwrap();
    assert_eq!(eleventh.resolution.resolved, Product::Piggy);
    assert!(!eleventh.resolution.adjusted);

    assert_eq!(h.balances(&a).await, (989_000, 10_000, 1_000));
    // ICA is remitted to the reserve wallet, Piggy stays with the member.
    assert_eq!(h.balances(RESERVE).await.0, 10_000);
    assert_eq!(h.engine.list_contributions(&a).await.unwrap().len(), 11);
}

#[tokio::test]
async fn window_restarts_each_calendar_month() {
    let h = harness().await;
    let a = h.account("a", 100_000).await;
    for day in 1..=10 {
        h.engine
            .contribute_from_wallet(WalletContributionCmd::new(&a, 100, at(2026, 3, day)))
            .await
            .unwrap();
    }

    let april = h
        .engine
        .contribute_from_wallet(WalletContributionCmd::new(&a, 100, at(2026, 4, 1)).product("PIGGY"))
        .await
        .unwrap();
    assert_eq!(april.resolution.resolved, Product::Ica);

    let info = h.engine.contribution_info(&a, at(2026, 4, 2)).await.unwrap();
    assert_eq!(info.monthly_count, 1);
    assert_eq!(info.state.remaining_ica_only, 9);
    assert_eq!(info.allowed_products, vec![Product::Ica]);
}

#[tokio::test]
async fn no_request_defaults_to_piggy_after_the_window() {
    let h = harness().await;
    let a = h.account("a", 100_000).await;
    for day in 1..=10 {
        h.engine
            .contribute_from_wallet(WalletContributionCmd::new(&a, 100, at(2026, 3, day)))
            .await
            .unwrap();
    }
    let outcome = h
        .engine
        .contribute_from_wallet(WalletContributionCmd::new(&a, 100, at(2026, 3, 20)))
        .await
        .unwrap();
    assert_eq!(outcome.resolution.resolved, Product::Piggy);

    let info = h.engine.contribution_info(&a, at(2026, 3, 21)).await.unwrap();
    assert!(!info.state.ica_only_window_active);
    assert_eq!(info.allowed_products, vec![Product::Ica, Product::Piggy]);
}

#[tokio::test]
async fn all_ica_mode_never_credits_piggy() {
    let h = harness().await;
    let a = h.account("a", 100_000).await;
    let summary = h
        .engine
        .set_contribution_mode(&a, ContributionMode::AllIca)
        .await
        .unwrap();
    assert_eq!(summary.contribution_mode, ContributionMode::AllIca);

    for day in 1..=12 {
        let outcome = h
            .engine
            .contribute_from_wallet(
                WalletContributionCmd::new(&a, 100, at(2026, 3, day)).product("PIGGY"),
            )
            .await
            .unwrap();
        assert_eq!(outcome.resolution.resolved, Product::Ica);
    }
    assert_eq!(h.balances(&a).await, (98_800, 1_200, 0));
}

#[tokio::test]
async fn insufficient_wallet_leaves_everything_untouched() {
    let h = harness().await;
    let a = h.account("a", 500).await;

    let err = h
        .engine
        .contribute_from_wallet(WalletContributionCmd::new(&a, 1_000, at(2026, 3, 1)))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::InsufficientBalance);

    assert_eq!(h.balances(&a).await, (500, 0, 0));
    assert_eq!(h.balances(RESERVE).await, (0, 0, 0));
    assert!(h.engine.list_contributions(&a).await.unwrap().is_empty());
    assert!(h.engine.list_transactions(&a, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn invalid_requests_fail_before_any_write() {
    let h = harness().await;
    let a = h.account("a", 10_000).await;

    let err = h
        .engine
        .contribute_from_wallet(WalletContributionCmd::new(&a, 0, at(2026, 3, 1)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let err = h
        .engine
        .contribute_from_wallet(WalletContributionCmd::new(&a, 100, at(2026, 3, 1)).product("GOLD"))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::InvalidProduct("GOLD".to_string()));

    let err = h
        .engine
        .contribute_from_wallet(WalletContributionCmd::new(&a, 100, at(2026, 3, 1)).product("FEE"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidProduct(_)));

    let err = h
        .engine
        .contribute_from_wallet(
            WalletContributionCmd::new(&a, 100, at(2026, 3, 1)).product("ESUSU"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidProduct(_)));

    let err = h
        .engine
        .contribute_from_wallet(WalletContributionCmd::new("ghost", 100, at(2026, 3, 1)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    assert_eq!(h.balances(&a).await, (10_000, 0, 0));
}

#[tokio::test]
async fn contribution_writes_history_rows() {
    let h = harness().await;
    let a = h.account("a", 10_000).await;
    h.engine
        .contribute_from_wallet(
            WalletContributionCmd::new(&a, 2_500, at(2026, 3, 5)).description("  March savings "),
        )
        .await
        .unwrap();

    let contributions = h.engine.list_contributions(&a).await.unwrap();
    assert_eq!(contributions.len(), 1);
    assert_eq!(contributions[0].product, Product::Ica);
    assert_eq!((contributions[0].year, contributions[0].month), (2026, 3));
    assert_eq!(contributions[0].description.as_deref(), Some("March savings"));

    let transactions = h.engine.list_transactions(&a, None).await.unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].kind, TransactionKind::Contribution);
    assert_eq!(transactions[0].amount_minor, 2_500);
}
