//! Initial schema migration.
//!
//! - `accounts`: member balances (wallet, ICA, Piggy) and contribution mode
//! - `contributions`: append-only contribution history
//! - `transactions`: append-only money movement history
//!
//! Balances and amounts are `BIGINT` minor units guarded by `CHECK`
//! constraints; the transaction `kind` is constrained to a fixed label set.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Iden)]
enum Accounts {
    Table,
    Id,
    Name,
    Email,
    Mobile,
    MemberNo,
    PasswordHash,
    WalletBalance,
    IcaBalance,
    PiggyBalance,
    ContributionMode,
    EsusuMember,
    CreatedAt,
}

#[derive(Iden)]
enum Contributions {
    Table,
    Id,
    AccountId,
    Product,
    AmountMinor,
    Year,
    Month,
    ContributionDate,
    Description,
    CreatedAt,
}

#[derive(Iden)]
enum Transactions {
    Table,
    Id,
    AccountId,
    Kind,
    AmountMinor,
    Currency,
    Status,
    Reference,
    Note,
    CreatedAt,
}

const TRANSACTION_KINDS: [&str; 8] = [
    "contribution",
    "deposit",
    "fee",
    "withdrawal",
    "transfer",
    "wallet_transfer_sent",
    "wallet_transfer_received",
    "monthly_fee",
];

fn non_negative_balance(column: Accounts) -> ColumnDef {
    ColumnDef::new(column)
        .big_integer()
        .not_null()
        .default(0)
        .check(Expr::col(column).gte(0))
        .to_owned()
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Accounts
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Accounts::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Accounts::Name).string().not_null())
                    .col(ColumnDef::new(Accounts::Email).string().unique_key())
                    .col(ColumnDef::new(Accounts::Mobile).string())
                    .col(ColumnDef::new(Accounts::MemberNo).big_integer().unique_key())
                    .col(ColumnDef::new(Accounts::PasswordHash).string().not_null())
                    .col(non_negative_balance(Accounts::WalletBalance))
                    .col(non_negative_balance(Accounts::IcaBalance))
                    .col(non_negative_balance(Accounts::PiggyBalance))
                    .col(
                        ColumnDef::new(Accounts::ContributionMode)
                            .string()
                            .not_null()
                            .default("auto")
                            .check(
                                Expr::col(Accounts::ContributionMode).is_in(["auto", "all_ica"]),
                            ),
                    )
                    .col(
                        ColumnDef::new(Accounts::EsusuMember)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Accounts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Contributions
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Contributions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Contributions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Contributions::AccountId).string().not_null())
                    .col(
                        ColumnDef::new(Contributions::Product)
                            .string()
                            .not_null()
                            .check(
                                Expr::col(Contributions::Product)
                                    .is_in(["ICA", "PIGGY", "ESUSU", "FEE"]),
                            ),
                    )
                    .col(
                        ColumnDef::new(Contributions::AmountMinor)
                            .big_integer()
                            .not_null()
                            .check(Expr::col(Contributions::AmountMinor).gt(0)),
                    )
                    .col(ColumnDef::new(Contributions::Year).integer().not_null())
                    .col(ColumnDef::new(Contributions::Month).integer().not_null())
                    .col(
                        ColumnDef::new(Contributions::ContributionDate)
                            .date()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Contributions::Description).string())
                    .col(
                        ColumnDef::new(Contributions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-contributions-account_id")
                            .from(Contributions::Table, Contributions::AccountId)
                            .to(Accounts::Table, Accounts::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-contributions-account_id-year-month")
                    .table(Contributions::Table)
                    .col(Contributions::AccountId)
                    .col(Contributions::Year)
                    .col(Contributions::Month)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-contributions-year-month-product")
                    .table(Contributions::Table)
                    .col(Contributions::Year)
                    .col(Contributions::Month)
                    .col(Contributions::Product)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Transactions
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Transactions::AccountId).string().not_null())
                    .col(
                        ColumnDef::new(Transactions::Kind)
                            .string()
                            .not_null()
                            .check(Expr::col(Transactions::Kind).is_in(TRANSACTION_KINDS)),
                    )
                    .col(
                        ColumnDef::new(Transactions::AmountMinor)
                            .big_integer()
                            .not_null()
                            .check(Expr::col(Transactions::AmountMinor).gt(0)),
                    )
                    .col(
                        ColumnDef::new(Transactions::Currency)
                            .string()
                            .not_null()
                            .default("NGN"),
                    )
                    .col(
                        ColumnDef::new(Transactions::Status)
                            .string()
                            .not_null()
                            .check(
                                Expr::col(Transactions::Status)
                                    .is_in(["pending", "completed", "failed"]),
                            ),
                    )
                    .col(ColumnDef::new(Transactions::Reference).string())
                    .col(ColumnDef::new(Transactions::Note).string())
                    .col(
                        ColumnDef::new(Transactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-account_id")
                            .from(Transactions::Table, Transactions::AccountId)
                            .to(Accounts::Table, Accounts::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-account_id-created_at")
                    .table(Transactions::Table)
                    .col(Transactions::AccountId)
                    .col(Transactions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-account_id-status-kind")
                    .table(Transactions::Table)
                    .col(Transactions::AccountId)
                    .col(Transactions::Status)
                    .col(Transactions::Kind)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Contributions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await?;
        Ok(())
    }
}
