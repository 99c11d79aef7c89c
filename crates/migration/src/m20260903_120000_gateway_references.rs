//! Idempotency markers for payment gateway references.
//!
//! The primary key on `reference` is what makes reconciliation apply a
//! verified payment at most once.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum GatewayReferences {
    Table,
    Reference,
    AccountId,
    Purpose,
    Product,
    AmountMinor,
    Status,
    TransactionId,
    CreatedAt,
}

#[derive(Iden)]
enum Accounts {
    Table,
    Id,
}

#[derive(Iden)]
enum Transactions {
    Table,
    Id,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(GatewayReferences::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GatewayReferences::Reference)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(GatewayReferences::AccountId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GatewayReferences::Purpose)
                            .string()
                            .not_null()
                            .check(
                                Expr::col(GatewayReferences::Purpose)
                                    .is_in(["deposit", "fee", "contribution"]),
                            ),
                    )
                    .col(ColumnDef::new(GatewayReferences::Product).string())
                    .col(
                        ColumnDef::new(GatewayReferences::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GatewayReferences::Status)
                            .string()
                            .not_null()
                            .check(
                                Expr::col(GatewayReferences::Status)
                                    .is_in(["settled", "unmatched"]),
                            ),
                    )
                    .col(ColumnDef::new(GatewayReferences::TransactionId).string())
                    .col(
                        ColumnDef::new(GatewayReferences::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-gateway_references-account_id")
                            .from(GatewayReferences::Table, GatewayReferences::AccountId)
                            .to(Accounts::Table, Accounts::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-gateway_references-transaction_id")
                            .from(GatewayReferences::Table, GatewayReferences::TransactionId)
                            .to(Transactions::Table, Transactions::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-gateway_references-account_id")
                    .table(GatewayReferences::Table)
                    .col(GatewayReferences::AccountId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(GatewayReferences::Table).to_owned())
            .await?;
        Ok(())
    }
}
