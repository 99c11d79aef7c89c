use chrono::Datelike;
use sea_orm::TransactionTrait;

use crate::{
    EngineError, InitializePaymentCmd, PaymentInitialization, Product, ResultEngine, Transaction,
    TransactionKind, TransactionStatus,
    gateway::{InitializeRequest, PaymentPurpose, PaymentTag},
    util::{ensure_positive_amount, normalize_optional_text, payer_identity},
};

use super::{Engine, with_tx};

impl PaymentPurpose {
    /// Kind of the `pending` row recorded for this purpose.
    pub(crate) fn transaction_kind(self) -> TransactionKind {
        match self {
            Self::Deposit => TransactionKind::Deposit,
            Self::Fee => TransactionKind::Fee,
            Self::Contribution => TransactionKind::Contribution,
        }
    }
}

impl Engine {
    /// Starts a gateway-funded payment.
    ///
    /// The `pending` row is written only after the gateway accepted the
    /// payment: a failed or timed out call leaves nothing behind and may be
    /// retried freely (each call gets a fresh reference).
    pub async fn initialize_payment(
        &self,
        cmd: InitializePaymentCmd,
    ) -> ResultEngine<PaymentInitialization> {
        let InitializePaymentCmd {
            account_id,
            amount_minor,
            purpose,
            product,
            description,
            occurred_at,
        } = cmd;
        ensure_positive_amount(amount_minor)?;
        let account = self.require_account(&self.database, &account_id).await?;

        let resolution = match purpose {
            PaymentPurpose::Contribution => {
                let count = self
                    .monthly_count(
                        &self.database,
                        &account_id,
                        occurred_at.year(),
                        occurred_at.month(),
                    )
                    .await?;
                let resolution = self.rules.resolve(product.as_deref(), account.mode()?, count)?;
                if resolution.resolved == Product::Esusu && !account.esusu_member {
                    return Err(EngineError::InvalidProduct(
                        "ESUSU is only available to Esusu group members".to_string(),
                    ));
                }
                Some(resolution)
            }
            PaymentPurpose::Deposit | PaymentPurpose::Fee => None,
        };

        let tag = PaymentTag {
            account_id: account_id.clone(),
            purpose,
            product: resolution.as_ref().map(|r| r.resolved),
            description: normalize_optional_text(description.as_deref()),
        };
        let request = InitializeRequest {
            amount_minor,
            payer_identity: payer_identity(&account, &self.config.payer_domain),
            callback_url: self.callback_url(&tag),
            tag,
        };
        let initialized = self.gateway.initialize(request).await.map_err(|err| {
            tracing::warn!(account_id = %account_id, error = %err, "gateway initialize failed");
            EngineError::from(err)
        })?;

        let transaction = Transaction::new(
            &account_id,
            purpose.transaction_kind(),
            amount_minor,
            self.config.currency,
            TransactionStatus::Pending,
            occurred_at,
        )?
        .reference(Some(initialized.reference.clone()));
        self.insert_transaction_autocommit(&transaction).await?;
        tracing::info!(
            account_id = %account_id,
            reference = %initialized.reference,
            purpose = purpose.as_str(),
            amount_minor,
            "gateway payment initialized"
        );

        Ok(PaymentInitialization {
            transaction_id: transaction.id,
            authorization_url: initialized.authorization_url,
            reference: initialized.reference,
            access_code: initialized.access_code,
            purpose,
            resolution,
        })
    }

    async fn insert_transaction_autocommit(&self, transaction: &Transaction) -> ResultEngine<()> {
        with_tx!(self, |db_tx| self.insert_transaction(&db_tx, transaction).await)
    }

    fn callback_url(&self, tag: &PaymentTag) -> String {
        let base = self.config.callback_base_url.trim_end_matches('/');
        match (tag.purpose, tag.product) {
            (PaymentPurpose::Fee, _) => format!("{base}/dashboard?firstPayment=success"),
            (PaymentPurpose::Deposit, _) => format!("{base}/dashboard/wallet?status=success"),
            (PaymentPurpose::Contribution, product) => format!(
                "{base}/dashboard/contribute?status=success&type={}",
                product.unwrap_or(Product::Ica)
            ),
        }
    }
}
