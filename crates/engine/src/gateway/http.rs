use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};

use super::{
    GatewayError, InitializeRequest, InitializedPayment, PaymentGateway, PaymentTag,
    PayoutRequest, PayoutResult, VerifiedPayment,
};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Connection settings of [`HttpGateway`].
#[derive(Clone, Debug)]
pub struct HttpGatewayConfig {
    pub base_url: String,
    /// Bearer secret. Empty means "not configured": every call fails with
    /// [`GatewayError::NotConfigured`] without touching the network.
    pub secret_key: String,
    pub timeout: Duration,
}

impl Default for HttpGatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.paystack.co".to_string(),
            secret_key: String::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Paystack-compatible gateway client.
#[derive(Clone, Debug)]
pub struct HttpGateway {
    base_url: Url,
    secret_key: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: bool,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct InitializeData {
    authorization_url: String,
    reference: String,
    access_code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Customer {
    email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Authorization {
    channel: Option<String>,
    sender_name: Option<String>,
    sender_bank: Option<String>,
    sender_bank_account_number: Option<String>,
    narration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    id: Option<i64>,
    #[serde(default)]
    status: String,
    reference: String,
    amount: i64,
    requested_amount: Option<i64>,
    fees: Option<i64>,
    currency: Option<String>,
    channel: Option<String>,
    gateway_response: Option<String>,
    paid_at: Option<String>,
    created_at: Option<String>,
    #[serde(default)]
    customer: Option<Customer>,
    #[serde(default)]
    metadata: Value,
    #[serde(default)]
    authorization: Option<Authorization>,
}

#[derive(Debug, Deserialize)]
struct RecipientData {
    recipient_code: String,
}

#[derive(Debug, Deserialize)]
struct TransferData {
    reference: Option<String>,
    #[serde(default)]
    status: String,
}

#[derive(Debug, Serialize)]
struct InitializeBody<'a> {
    email: &'a str,
    amount: i64,
    callback_url: &'a str,
    metadata: Value,
}

impl HttpGateway {
    pub fn new(config: HttpGatewayConfig) -> Result<Self, GatewayError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|err| GatewayError::Unavailable(format!("invalid base_url: {err}")))?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| GatewayError::Unavailable(err.to_string()))?;
        Ok(Self {
            base_url,
            secret_key: config.secret_key,
            http,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, GatewayError> {
        if self.secret_key.trim().is_empty() {
            return Err(GatewayError::NotConfigured);
        }
        self.base_url
            .join(path)
            .map_err(|err| GatewayError::Unavailable(format!("invalid endpoint {path}: {err}")))
    }

    /// `transaction/verify/<reference>` with the reference as one
    /// percent-encoded segment, so it can never add a query or walk the path.
    fn verify_endpoint(&self, reference: &str) -> Result<Url, GatewayError> {
        let mut url = self.endpoint("transaction/verify")?;
        url.path_segments_mut()
            .map_err(|()| GatewayError::Unavailable("base_url cannot carry a path".to_string()))?
            .pop_if_empty()
            .push(reference);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, GatewayError> {
        let res = request
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(transport_error)?;

        let status = res.status();
        let envelope = res.json::<Envelope<T>>().await.map_err(transport_error);
        match (status, envelope) {
            (StatusCode::UNAUTHORIZED, _) => {
                Err(GatewayError::Rejected("invalid gateway api key".to_string()))
            }
            (status, Ok(envelope)) if status.is_success() && envelope.status => envelope
                .data
                .ok_or_else(|| GatewayError::Rejected("gateway returned no data".to_string())),
            (status, Ok(envelope)) if status.is_client_error() || !envelope.status => {
                Err(GatewayError::Rejected(envelope.message))
            }
            (status, Ok(envelope)) => Err(GatewayError::Unavailable(format!(
                "{status}: {}",
                envelope.message
            ))),
            (status, Err(_)) if status.is_server_error() => {
                Err(GatewayError::Unavailable(status.to_string()))
            }
            (_, Err(err)) => Err(err),
        }
    }
}

fn transport_error(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout(err.to_string())
    } else if err.is_decode() {
        GatewayError::Rejected(format!("unreadable gateway response: {err}"))
    } else {
        GatewayError::Unavailable(err.to_string())
    }
}

fn parse_timestamp(value: Option<&str>) -> Option<DateTime<Utc>> {
    value
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Metadata comes back as an object, as a JSON string or as garbage.
fn parse_tag(metadata: &Value) -> Option<PaymentTag> {
    match metadata {
        Value::Object(_) => serde_json::from_value(metadata.clone()).ok(),
        Value::String(raw) => serde_json::from_str(raw).ok(),
        _ => None,
    }
}

impl From<VerifyData> for VerifiedPayment {
    fn from(data: VerifyData) -> Self {
        let authorization = data.authorization.unwrap_or_default();
        Self {
            success: data.status == "success",
            tag: parse_tag(&data.metadata),
            paid_at: parse_timestamp(data.paid_at.as_deref()),
            created_at: parse_timestamp(data.created_at.as_deref()),
            reference: data.reference,
            status: data.status,
            amount_minor: data.amount,
            requested_amount_minor: data.requested_amount,
            fees_minor: data.fees,
            currency: data.currency,
            payer_identity: data.customer.and_then(|c| c.email),
            channel: data.channel.or(authorization.channel),
            gateway_response: data.gateway_response,
            gateway_transaction_id: data.id,
            sender_name: authorization.sender_name,
            sender_bank: authorization.sender_bank,
            sender_account_number: authorization.sender_bank_account_number,
            narration: authorization.narration,
        }
    }
}

#[async_trait::async_trait]
impl PaymentGateway for HttpGateway {
    async fn initialize(
        &self,
        request: InitializeRequest,
    ) -> Result<InitializedPayment, GatewayError> {
        let endpoint = self.endpoint("transaction/initialize")?;
        let mut metadata = serde_json::to_value(&request.tag)
            .map_err(|err| GatewayError::Rejected(err.to_string()))?;
        metadata["custom_fields"] = json!([
            {
                "display_name": "Payment Type",
                "variable_name": "payment_type",
                "value": request.tag.purpose.as_str(),
            }
        ]);
        let body = InitializeBody {
            email: &request.payer_identity,
            amount: request.amount_minor,
            callback_url: &request.callback_url,
            metadata,
        };
        let data: InitializeData = self.send(self.http.post(endpoint).json(&body)).await?;
        Ok(InitializedPayment {
            authorization_url: data.authorization_url,
            reference: data.reference,
            access_code: data.access_code,
        })
    }

    async fn verify(&self, reference: &str) -> Result<VerifiedPayment, GatewayError> {
        let endpoint = self.verify_endpoint(reference)?;
        let data: VerifyData = self.send(self.http.get(endpoint)).await?;
        Ok(data.into())
    }

    async fn payout(&self, request: PayoutRequest) -> Result<PayoutResult, GatewayError> {
        let recipient_endpoint = self.endpoint("transferrecipient")?;
        let recipient: RecipientData = self
            .send(self.http.post(recipient_endpoint).json(&json!({
                "type": "nuban",
                "name": request.destination.account_name,
                "account_number": request.destination.account_number,
                "bank_code": request.destination.bank_code,
                "currency": request.currency,
            })))
            .await?;

        let transfer_endpoint = self.endpoint("transfer")?;
        let transfer: TransferData = self
            .send(self.http.post(transfer_endpoint).json(&json!({
                "source": "balance",
                "amount": request.amount_minor,
                "recipient": recipient.recipient_code,
                "reason": request.reason,
                "reference": request.reference,
            })))
            .await?;

        let success = matches!(transfer.status.as_str(), "success" | "pending" | "otp");
        Ok(PayoutResult {
            success,
            reference: transfer.reference.unwrap_or(request.reference),
            message: (!success).then(|| format!("transfer status: {}", transfer.status)),
            status: transfer.status,
        })
    }
}
