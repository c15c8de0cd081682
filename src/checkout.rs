use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use stripe::{
    CheckoutSession, CheckoutSessionId, CheckoutSessionMode, CheckoutSessionPaymentStatus,
    CreateCheckoutSession, CreateCheckoutSessionLineItems, CreateCheckoutSessionLineItemsPriceData,
    CreateCheckoutSessionLineItemsPriceDataProductData, Currency, Expandable,
};

use crate::error::Error;

/// What the service needs to open a hosted checkout page for one parcel.
#[derive(Debug, Clone)]
pub struct NewSession {
    /// Price in the smallest currency unit.
    pub unit_amount: i64,
    pub parcel_name: String,
    pub sender_email: String,
    pub parcel_id: String,
}

#[derive(Debug, Clone)]
pub struct CreatedSession {
    pub id: String,
    pub url: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Paid,
    Unpaid,
    NoPaymentRequired,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Paid => "paid",
            Self::Unpaid => "unpaid",
            Self::NoPaymentRequired => "no_payment_required",
        }
    }
}

impl From<CheckoutSessionPaymentStatus> for SessionStatus {
    fn from(status: CheckoutSessionPaymentStatus) -> Self {
        match status {
            CheckoutSessionPaymentStatus::Paid => Self::Paid,
            CheckoutSessionPaymentStatus::Unpaid => Self::Unpaid,
            CheckoutSessionPaymentStatus::NoPaymentRequired => Self::NoPaymentRequired,
        }
    }
}

/// The provider's answer about one session, trimmed to the fields the
/// confirmation flow acts on.
#[derive(Debug, Clone)]
pub struct CheckoutSummary {
    /// Payment intent id; doubles as the idempotency key for payments.
    pub transaction_id: Option<String>,
    pub status: SessionStatus,
    /// Settled amount in the smallest currency unit.
    pub amount_total: Option<i64>,
    pub currency: Option<String>,
    pub customer_email: Option<String>,
    pub parcel_id: Option<String>,
    pub parcel_name: Option<String>,
}

#[async_trait]
pub trait CheckoutGateway: Send + Sync {
    async fn create_session(&self, request: NewSession) -> Result<CreatedSession, Error>;

    async fn fetch_session(&self, session_id: &str) -> Result<CheckoutSummary, Error>;
}

#[derive(Clone)]
pub struct CheckoutClient(pub Arc<dyn CheckoutGateway>);

impl std::ops::Deref for CheckoutClient {
    type Target = dyn CheckoutGateway;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

pub struct StripeCheckout {
    client: stripe::Client,
    site_domain: String,
}

impl StripeCheckout {
    pub fn new(secret_key: String, site_domain: String) -> Self {
        Self {
            client: stripe::Client::new(secret_key),
            site_domain,
        }
    }

    pub fn new_from_env() -> Self {
        let secret_key = std::env::var("STRIPE_SECRET_KEY")
            .expect("Missing required environment variable: STRIPE_SECRET_KEY");
        let site_domain = std::env::var("SITE_DOMAIN")
            .expect("Missing required environment variable: SITE_DOMAIN");

        Self::new(secret_key, site_domain)
    }
}

#[async_trait]
impl CheckoutGateway for StripeCheckout {
    async fn create_session(&self, request: NewSession) -> Result<CreatedSession, Error> {
        // the provider substitutes the placeholder when it redirects
        let success_url = format!(
            "{}/dashboard/payment-success?session_id={{CHECKOUT_SESSION_ID}}",
            self.site_domain
        );
        let cancel_url = format!("{}/dashboard/payment-cancelled", self.site_domain);

        let mut params = CreateCheckoutSession::new();
        params.mode = Some(CheckoutSessionMode::Payment);
        params.success_url = Some(&success_url);
        params.cancel_url = Some(&cancel_url);
        params.customer_email = Some(&request.sender_email);

        params.line_items = Some(vec![CreateCheckoutSessionLineItems {
            price_data: Some(CreateCheckoutSessionLineItemsPriceData {
                currency: Currency::USD,
                unit_amount: Some(request.unit_amount),
                product_data: Some(CreateCheckoutSessionLineItemsPriceDataProductData {
                    name: request.parcel_name.clone(),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            quantity: Some(1),
            ..Default::default()
        }]);

        let mut metadata = HashMap::new();
        metadata.insert("parcelId".to_string(), request.parcel_id.clone());
        metadata.insert("parcelName".to_string(), request.parcel_name.clone());
        params.metadata = Some(metadata);

        let session = CheckoutSession::create(&self.client, params).await?;

        let url = session.url.ok_or(Error::CustomStr(
            StatusCode::BAD_GATEWAY,
            "checkout session has no hosted url",
        ))?;

        Ok(CreatedSession {
            id: session.id.to_string(),
            url,
        })
    }

    async fn fetch_session(&self, session_id: &str) -> Result<CheckoutSummary, Error> {
        let session_id = session_id.parse::<CheckoutSessionId>().map_err(|_| {
            Error::CustomStr(StatusCode::BAD_REQUEST, "invalid checkout session id")
        })?;

        let session = CheckoutSession::retrieve(&self.client, &session_id, &[]).await?;

        let metadata = session.metadata.unwrap_or_default();

        Ok(CheckoutSummary {
            transaction_id: session.payment_intent.map(|intent| match intent {
                Expandable::Id(id) => id.to_string(),
                Expandable::Object(intent) => intent.id.to_string(),
            }),
            status: session.payment_status.into(),
            amount_total: session.amount_total,
            currency: session.currency.map(|currency| currency.to_string()),
            customer_email: session.customer_email,
            parcel_id: metadata.get("parcelId").cloned(),
            parcel_name: metadata.get("parcelName").cloned(),
        })
    }
}

#[cfg(test)]
pub mod testing {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use axum::http::StatusCode;

    use crate::error::Error;

    use super::{CheckoutGateway, CheckoutSummary, CreatedSession, NewSession};

    /// Scriptable gateway: tests register summaries by session id and
    /// inspect the sessions handlers asked to create.
    #[derive(Default)]
    pub struct FakeCheckout {
        sessions: Mutex<HashMap<String, CheckoutSummary>>,
        created: Mutex<Vec<NewSession>>,
    }

    impl FakeCheckout {
        pub fn script_session(&self, session_id: &str, summary: CheckoutSummary) {
            self.sessions
                .lock()
                .unwrap()
                .insert(session_id.to_string(), summary);
        }

        pub fn created_sessions(&self) -> Vec<NewSession> {
            self.created.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CheckoutGateway for FakeCheckout {
        async fn create_session(&self, request: NewSession) -> Result<CreatedSession, Error> {
            let mut created = self.created.lock().unwrap();
            created.push(request);

            let id = format!("cs_test_{}", created.len());
            Ok(CreatedSession {
                url: format!("https://checkout.test/c/pay/{}", id),
                id,
            })
        }

        async fn fetch_session(&self, session_id: &str) -> Result<CheckoutSummary, Error> {
            self.sessions
                .lock()
                .unwrap()
                .get(session_id)
                .cloned()
                .ok_or(Error::CustomStr(
                    StatusCode::BAD_GATEWAY,
                    "unknown checkout session",
                ))
        }
    }
}
