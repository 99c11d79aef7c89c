//! Balance store and ledger writer primitives shared by every settlement path.
//!
//! All helpers take the caller's `DatabaseTransaction`: they never open a
//! unit of work on their own, except the savepoints used by the transaction
//! kind fallback.

use std::collections::{BTreeMap, BTreeSet};

use sea_orm::{
    ActiveValue, DatabaseTransaction, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait, prelude::*, sea_query::Expr,
};

use crate::{
    Contribution, EngineError, Product, ResultEngine, Transaction, TransactionKind,
    TransactionStatus, accounts, contributions, transactions, util::is_kind_constraint_violation,
};

use super::Engine;

/// Accounts locked by the current unit of work, keyed (and therefore
/// iterated) by id.
pub(super) type LockedAccounts = BTreeMap<String, accounts::Model>;

/// Signed change to an account's three balances.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(super) struct BalanceDelta {
    pub wallet: i64,
    pub ica: i64,
    pub piggy: i64,
}

impl BalanceDelta {
    pub(super) fn wallet(amount: i64) -> Self {
        Self {
            wallet: amount,
            ..Self::default()
        }
    }

    fn merge(&mut self, other: BalanceDelta) {
        self.wallet += other.wallet;
        self.ica += other.ica;
        self.piggy += other.piggy;
    }

    fn is_zero(self) -> bool {
        self == Self::default()
    }
}

/// Pending balance changes of one unit of work. Deltas for the same account
/// are merged so each row is written once.
#[derive(Debug, Default)]
pub(super) struct BalanceChanges(BTreeMap<String, BalanceDelta>);

impl BalanceChanges {
    pub(super) fn add(&mut self, account_id: &str, delta: BalanceDelta) {
        self.0
            .entry(account_id.to_string())
            .or_default()
            .merge(delta);
    }

    /// Moves `amount` of a contribution out of the wallet into `product`.
    ///
    /// ICA funds sit in the reserve wallet and are mirrored by the member's
    /// ICA balance. Esusu funds stay in the wallet.
    pub(super) fn contribute(
        &mut self,
        account_id: &str,
        reserve_id: &str,
        product: Product,
        amount: i64,
    ) {
        match product {
            Product::Ica => {
                self.add(
                    account_id,
                    BalanceDelta {
                        wallet: -amount,
                        ica: amount,
                        piggy: 0,
                    },
                );
                self.add(reserve_id, BalanceDelta::wallet(amount));
            }
            Product::Piggy => self.add(
                account_id,
                BalanceDelta {
                    wallet: -amount,
                    ica: 0,
                    piggy: amount,
                },
            ),
            Product::Esusu | Product::Fee => {}
        }
    }
}

impl Engine {
    pub(super) async fn require_account<C: ConnectionTrait>(
        &self,
        db: &C,
        account_id: &str,
    ) -> ResultEngine<accounts::Model> {
        accounts::Entity::find_by_id(account_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("account not exists".to_string()))
    }

    /// Takes the exclusive row locks of `account_ids` in ascending id order.
    ///
    /// Every multi-account operation goes through here, so two units of work
    /// touching the same accounts always lock them in the same order.
    pub(super) async fn lock_accounts(
        &self,
        db_tx: &DatabaseTransaction,
        account_ids: &[&str],
    ) -> ResultEngine<LockedAccounts> {
        let ids: BTreeSet<String> = account_ids.iter().map(|id| (*id).to_string()).collect();
        let mut locked = LockedAccounts::new();
        for id in ids {
            let model = accounts::Entity::find_by_id(id.clone())
                .lock_exclusive()
                .one(db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound(format!("account {id} not exists")))?;
            locked.insert(id, model);
        }
        Ok(locked)
    }

    /// Applies `changes` to locked rows. A balance going below zero is
    /// `InsufficientBalance` (or `InsufficientPiggyBalance`) and the caller's
    /// unit of work is dropped.
    pub(super) async fn apply_balance_changes(
        &self,
        db_tx: &DatabaseTransaction,
        locked: &mut LockedAccounts,
        changes: BalanceChanges,
    ) -> ResultEngine<()> {
        for (account_id, delta) in changes.0 {
            if delta.is_zero() {
                continue;
            }
            let model = locked.get_mut(&account_id).ok_or_else(|| {
                EngineError::KeyNotFound(format!("account {account_id} is not locked"))
            })?;
            let wallet = checked_balance(model.wallet_balance, delta.wallet)
                .ok_or(EngineError::InsufficientBalance)?;
            let ica = checked_balance(model.ica_balance, delta.ica)
                .ok_or(EngineError::InsufficientBalance)?;
            let piggy = checked_balance(model.piggy_balance, delta.piggy)
                .ok_or(EngineError::InsufficientPiggyBalance)?;

            accounts::ActiveModel {
                id: ActiveValue::Set(account_id.clone()),
                wallet_balance: ActiveValue::Set(wallet),
                ica_balance: ActiveValue::Set(ica),
                piggy_balance: ActiveValue::Set(piggy),
                ..Default::default()
            }
            .update(db_tx)
            .await?;

            model.wallet_balance = wallet;
            model.ica_balance = ica;
            model.piggy_balance = piggy;
        }
        Ok(())
    }

    /// Number of ICA/PIGGY/ESUSU contributions of the account in a calendar month.
    pub(super) async fn monthly_count<C: ConnectionTrait>(
        &self,
        db: &C,
        account_id: &str,
        year: i32,
        month: u32,
    ) -> ResultEngine<u64> {
        let tracked = Product::WINDOW_TRACKED.map(|p| p.as_str().to_string());
        let count = contributions::Entity::find()
            .filter(contributions::Column::AccountId.eq(account_id))
            .filter(contributions::Column::Year.eq(year))
            .filter(contributions::Column::Month.eq(month as i32))
            .filter(contributions::Column::Product.is_in(tracked))
            .count(db)
            .await?;
        Ok(count)
    }

    pub(super) async fn insert_contribution(
        &self,
        db_tx: &DatabaseTransaction,
        contribution: &Contribution,
    ) -> ResultEngine<()> {
        contributions::ActiveModel::from(contribution)
            .insert(db_tx)
            .await?;
        Ok(())
    }

    pub(super) async fn insert_transaction(
        &self,
        db_tx: &DatabaseTransaction,
        transaction: &Transaction,
    ) -> ResultEngine<()> {
        transactions::ActiveModel::from(transaction)
            .insert(db_tx)
            .await?;
        Ok(())
    }

    /// Inserts `transaction` with the first kind of `kinds` the schema accepts.
    ///
    /// Each attempt runs in its own savepoint so a rejected label leaves the
    /// outer unit of work usable. Only a kind constraint rejection moves on to
    /// the next label.
    pub(super) async fn insert_transaction_with_fallback(
        &self,
        db_tx: &DatabaseTransaction,
        transaction: Transaction,
        kinds: &[TransactionKind],
    ) -> ResultEngine<Transaction> {
        let mut last_err = None;
        for kind in kinds {
            let candidate = Transaction {
                kind: *kind,
                ..transaction.clone()
            };
            let savepoint = db_tx.begin().await?;
            match transactions::ActiveModel::from(&candidate)
                .insert(&savepoint)
                .await
            {
                Ok(_) => {
                    savepoint.commit().await?;
                    return Ok(candidate);
                }
                Err(err) if is_kind_constraint_violation(&err) => {
                    tracing::warn!(
                        kind = kind.as_str(),
                        "transaction kind rejected by schema, trying next label"
                    );
                    savepoint.rollback().await?;
                    last_err = Some(err);
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(match last_err {
            Some(err) => err.into(),
            None => EngineError::InvalidInput("no transaction kind to try".to_string()),
        })
    }

    /// `pending` row of the account matching kind and amount, locked.
    ///
    /// The row initialized with `reference` wins; otherwise the newest match.
    pub(super) async fn find_pending_locked(
        &self,
        db_tx: &DatabaseTransaction,
        account_id: &str,
        kind: TransactionKind,
        amount_minor: i64,
        reference: &str,
    ) -> ResultEngine<Option<transactions::Model>> {
        let pending = || {
            transactions::Entity::find()
                .filter(transactions::Column::AccountId.eq(account_id))
                .filter(transactions::Column::Kind.eq(kind.as_str()))
                .filter(transactions::Column::AmountMinor.eq(amount_minor))
                .filter(transactions::Column::Status.eq(TransactionStatus::Pending.as_str()))
        };
        let by_reference = pending()
            .filter(transactions::Column::Reference.eq(reference))
            .lock_exclusive()
            .one(db_tx)
            .await?;
        if by_reference.is_some() {
            return Ok(by_reference);
        }
        let newest = pending()
            .order_by_desc(transactions::Column::CreatedAt)
            .lock_exclusive()
            .one(db_tx)
            .await?;
        Ok(newest)
    }

    /// `pending → completed`, at most once. Only the status changes; the
    /// settling reference is recorded on its marker.
    pub(super) async fn complete_pending(
        &self,
        db_tx: &DatabaseTransaction,
        transaction_id: &str,
        reference: &str,
    ) -> ResultEngine<()> {
        let result = transactions::Entity::update_many()
            .col_expr(
                transactions::Column::Status,
                Expr::value(TransactionStatus::Completed.as_str()),
            )
            .filter(transactions::Column::Id.eq(transaction_id))
            .filter(transactions::Column::Status.eq(TransactionStatus::Pending.as_str()))
            .exec(db_tx)
            .await?;
        if result.rows_affected != 1 {
            return Err(EngineError::NoMatchingPendingTransaction(
                reference.to_string(),
            ));
        }
        Ok(())
    }
}

fn checked_balance(current: i64, delta: i64) -> Option<i64> {
    current.checked_add(delta).filter(|value| *value >= 0)
}
