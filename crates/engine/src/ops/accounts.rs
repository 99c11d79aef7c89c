use chrono::Utc;
use sea_orm::{ActiveValue, QueryFilter, QueryOrder, prelude::*};
use uuid::Uuid;

use crate::{
    AccountSummary, ContributionMode, EngineError, NewAccountCmd, ResultEngine, accounts,
    public_id::normalize_wallet_token,
    util::{normalize_optional_text, normalize_required_text},
};

use super::Engine;

/// One way of naming a transfer recipient. Strategies are tried in order;
/// each is a read without side effects.
#[derive(Clone, Debug, PartialEq, Eq)]
enum RecipientLookup {
    AccountId(String),
    MemberNo(i64),
    Email(String),
    WalletId(String),
}

impl RecipientLookup {
    fn chain(raw: &str) -> Vec<RecipientLookup> {
        let value = raw.trim();
        if value.is_empty() {
            return Vec::new();
        }
        let mut chain = vec![RecipientLookup::AccountId(value.to_string())];
        if let Ok(member_no) = value.parse::<i64>() {
            chain.push(RecipientLookup::MemberNo(member_no));
        }
        if value.contains('@') {
            chain.push(RecipientLookup::Email(value.to_ascii_lowercase()));
        }
        chain.push(RecipientLookup::WalletId(value.to_string()));
        chain
    }
}

impl Engine {
    /// Registers a member with zero balances and mode `auto`.
    pub async fn create_account(&self, cmd: NewAccountCmd) -> ResultEngine<AccountSummary> {
        let name = normalize_required_text(&cmd.name, "name")?;
        if cmd.password.is_empty() {
            return Err(EngineError::InvalidInput(
                "password must not be empty".to_string(),
            ));
        }
        let id = match normalize_optional_text(cmd.id.as_deref()) {
            Some(id) => id,
            None => Uuid::new_v4().to_string(),
        };
        let password_hash = bcrypt::hash(&cmd.password, self.config.password_hash_cost)
            .map_err(|err| EngineError::InvalidInput(format!("cannot hash password: {err}")))?;

        let model = accounts::ActiveModel {
            id: ActiveValue::Set(id),
            name: ActiveValue::Set(name),
            email: ActiveValue::Set(
                normalize_optional_text(cmd.email.as_deref()).map(|e| e.to_ascii_lowercase()),
            ),
            mobile: ActiveValue::Set(normalize_optional_text(cmd.mobile.as_deref())),
            member_no: ActiveValue::Set(cmd.member_no),
            password_hash: ActiveValue::Set(password_hash),
            wallet_balance: ActiveValue::Set(0),
            ica_balance: ActiveValue::Set(0),
            piggy_balance: ActiveValue::Set(0),
            contribution_mode: ActiveValue::Set(ContributionMode::Auto.as_str().to_string()),
            esusu_member: ActiveValue::Set(cmd.esusu_member),
            created_at: ActiveValue::Set(cmd.occurred_at),
        }
        .insert(&self.database)
        .await?;
        tracing::info!(account_id = %model.id, "account created");
        Ok(self.summary_of(&model))
    }

    /// Creates the reserve account if it is missing. Nobody can log into it:
    /// its password hash is not a bcrypt hash.
    pub async fn ensure_reserve_account(&self) -> ResultEngine<()> {
        let id = self.config.reserve_account_id.clone();
        if accounts::Entity::find_by_id(id.clone())
            .one(&self.database)
            .await?
            .is_some()
        {
            return Ok(());
        }
        accounts::ActiveModel {
            id: ActiveValue::Set(id.clone()),
            name: ActiveValue::Set("Reserve".to_string()),
            email: ActiveValue::Set(None),
            mobile: ActiveValue::Set(None),
            member_no: ActiveValue::Set(None),
            password_hash: ActiveValue::Set("!".to_string()),
            wallet_balance: ActiveValue::Set(0),
            ica_balance: ActiveValue::Set(0),
            piggy_balance: ActiveValue::Set(0),
            contribution_mode: ActiveValue::Set(ContributionMode::AllIca.as_str().to_string()),
            esusu_member: ActiveValue::Set(false),
            created_at: ActiveValue::Set(Utc::now()),
        }
        .insert(&self.database)
        .await?;
        tracing::info!(account_id = %id, "reserve account created");
        Ok(())
    }

    /// Checks a login (account id or email) and password, returning the
    /// account id.
    pub async fn authenticate(&self, login: &str, password: &str) -> ResultEngine<String> {
        let login = login.trim();
        let model = match accounts::Entity::find_by_id(login.to_string())
            .one(&self.database)
            .await?
        {
            Some(model) => Some(model),
            None => {
                accounts::Entity::find()
                    .filter(accounts::Column::Email.eq(login.to_ascii_lowercase()))
                    .one(&self.database)
                    .await?
            }
        };
        match model {
            Some(model) if verify_password(password, &model.password_hash) => Ok(model.id),
            _ => Err(EngineError::Unauthorized("invalid credentials".to_string())),
        }
    }

    /// Password re-check required before money leaves an account.
    pub(super) async fn reauthenticate(&self, account_id: &str, password: &str) -> ResultEngine<()> {
        let model = self.require_account(&self.database, account_id).await?;
        if !verify_password(password, &model.password_hash) {
            return Err(EngineError::Unauthorized(
                "password confirmation failed".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn account_summary(&self, account_id: &str) -> ResultEngine<AccountSummary> {
        let model = self.require_account(&self.database, account_id).await?;
        Ok(self.summary_of(&model))
    }

    pub async fn public_wallet_id(&self, account_id: &str) -> ResultEngine<Option<String>> {
        let model = self.require_account(&self.database, account_id).await?;
        Ok(self.public_ids.wallet_id(&model.id, model.member_no))
    }

    pub async fn set_contribution_mode(
        &self,
        account_id: &str,
        mode: ContributionMode,
    ) -> ResultEngine<AccountSummary> {
        self.require_account(&self.database, account_id).await?;
        let model = accounts::ActiveModel {
            id: ActiveValue::Set(account_id.to_string()),
            contribution_mode: ActiveValue::Set(mode.as_str().to_string()),
            ..Default::default()
        }
        .update(&self.database)
        .await?;
        Ok(self.summary_of(&model))
    }

    /// Resolves a recipient through the lookup chain: account id, member
    /// number, email, public wallet id.
    pub(super) async fn find_recipient<C: ConnectionTrait>(
        &self,
        db: &C,
        raw: &str,
    ) -> ResultEngine<accounts::Model> {
        for lookup in RecipientLookup::chain(raw) {
            if let Some(model) = self.find_by_lookup(db, &lookup).await? {
                return Ok(model);
            }
        }
        Err(EngineError::RecipientNotFound)
    }

    async fn find_by_lookup<C: ConnectionTrait>(
        &self,
        db: &C,
        lookup: &RecipientLookup,
    ) -> ResultEngine<Option<accounts::Model>> {
        let model = match lookup {
            RecipientLookup::AccountId(id) => {
                accounts::Entity::find_by_id(id.clone()).one(db).await?
            }
            RecipientLookup::MemberNo(member_no) => {
                accounts::Entity::find()
                    .filter(accounts::Column::MemberNo.eq(*member_no))
                    .one(db)
                    .await?
            }
            RecipientLookup::Email(email) => {
                accounts::Entity::find()
                    .filter(accounts::Column::Email.eq(email.as_str()))
                    .one(db)
                    .await?
            }
            RecipientLookup::WalletId(token) => {
                let exact = token.to_ascii_uppercase();
                let normalized = normalize_wallet_token(token);
                accounts::Entity::find()
                    .filter(accounts::Column::MemberNo.is_not_null())
                    .order_by_asc(accounts::Column::Id)
                    .all(db)
                    .await?
                    .into_iter()
                    .find(|model| {
                        self.public_ids
                            .wallet_id(&model.id, model.member_no)
                            .is_some_and(|id| {
                                id == exact || normalize_wallet_token(&id) == normalized
                            })
                    })
            }
        };
        Ok(model)
    }

    pub(super) fn summary_of(&self, model: &accounts::Model) -> AccountSummary {
        AccountSummary {
            id: model.id.clone(),
            name: model.name.clone(),
            email: model.email.clone(),
            wallet_id: self.public_ids.wallet_id(&model.id, model.member_no),
            wallet_balance_minor: model.wallet_balance,
            ica_balance_minor: model.ica_balance,
            piggy_balance_minor: model.piggy_balance,
            contribution_mode: model.mode().unwrap_or_default(),
            esusu_member: model.esusu_member,
            created_at: model.created_at,
        }
    }
}

fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}
