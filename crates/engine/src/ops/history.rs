use sea_orm::{QueryFilter, QueryOrder, QuerySelect, prelude::*};

use crate::{
    Contribution, ResultEngine, Transaction, contributions, gateway_references, transactions,
};

use super::Engine;

/// Default page size of [`Engine::list_transactions`].
pub const DEFAULT_TRANSACTION_LIMIT: u64 = 50;

impl Engine {
    /// Contribution history, newest first.
    pub async fn list_contributions(&self, account_id: &str) -> ResultEngine<Vec<Contribution>> {
        self.require_account(&self.database, account_id).await?;
        let models = contributions::Entity::find()
            .filter(contributions::Column::AccountId.eq(account_id))
            .order_by_desc(contributions::Column::CreatedAt)
            .order_by_desc(contributions::Column::Id)
            .all(&self.database)
            .await?;
        models.into_iter().map(Contribution::try_from).collect()
    }

    /// Transaction history, newest first. `limit` defaults to
    /// [`DEFAULT_TRANSACTION_LIMIT`].
    pub async fn list_transactions(
        &self,
        account_id: &str,
        limit: Option<u64>,
    ) -> ResultEngine<Vec<Transaction>> {
        self.require_account(&self.database, account_id).await?;
        let limit = limit.filter(|l| *l > 0).unwrap_or(DEFAULT_TRANSACTION_LIMIT);
        let models = transactions::Entity::find()
            .filter(transactions::Column::AccountId.eq(account_id))
            .order_by_desc(transactions::Column::CreatedAt)
            .order_by_desc(transactions::Column::Id)
            .limit(limit)
            .all(&self.database)
            .await?;
        models.into_iter().map(Transaction::try_from).collect()
    }

    /// Transaction row a gateway reference was settled on, or else the row it
    /// was initialized with.
    pub async fn transaction_by_reference(
        &self,
        account_id: &str,
        reference: &str,
    ) -> ResultEngine<Option<Transaction>> {
        let settled_on = gateway_references::Entity::find_by_id(reference)
            .filter(gateway_references::Column::AccountId.eq(account_id))
            .one(&self.database)
            .await?
            .and_then(|marker| marker.transaction_id);
        let query = transactions::Entity::find()
            .filter(transactions::Column::AccountId.eq(account_id));
        let query = match settled_on {
            Some(id) => query.filter(transactions::Column::Id.eq(id)),
            None => query.filter(transactions::Column::Reference.eq(reference)),
        };
        let model = query.one(&self.database).await?;
        model.map(Transaction::try_from).transpose()
    }
}
