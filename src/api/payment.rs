use std::str::FromStr;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use bson::{doc, oid::ObjectId};
use rust_decimal::{prelude::ToPrimitive, Decimal};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    checkout::{CheckoutClient, NewSession, SessionStatus},
    error::Error,
    identity::Identity,
    store::{ParcelStore, PaymentStore, UpdateSummary},
    tracking,
    util::{DecimalString, FormattedDateTime, ObjectIdString},
};

/// A settled payment. Written exactly once per provider transaction.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PaymentModel {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    /// Settled amount in whole currency units.
    pub amount: Decimal,
    pub transaction_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    pub payment_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_email: Option<String>,
    pub parcel_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parcel_name: Option<String>,
    pub paid_at: bson::DateTime,
    pub tracking_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: ObjectIdString,

    pub amount: Decimal,
    pub transaction_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    pub payment_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_email: Option<String>,
    pub parcel_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parcel_name: Option<String>,
    pub paid_at: FormattedDateTime,
    pub tracking_id: String,
}

impl From<PaymentModel> for Payment {
    fn from(payment: PaymentModel) -> Self {
        Self {
            id: payment.id.into(),
            amount: payment.amount,
            transaction_id: payment.transaction_id,
            currency: payment.currency,
            payment_status: payment.payment_status,
            sender_email: payment.sender_email,
            parcel_id: payment.parcel_id,
            parcel_name: payment.parcel_name,
            paid_at: payment.paid_at.into(),
            tracking_id: payment.tracking_id,
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub cost: DecimalString,
    pub parcel_name: String,
    pub sender_email: String,
    pub parcel_id: String,
}

#[derive(Serialize, Debug)]
pub struct CreateSessionResponse {
    pub url: String,
}

#[tracing::instrument(skip_all)]
pub async fn create_checkout_session(
    State(checkout): State<CheckoutClient>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<Json<CreateSessionResponse>, Error> {
    let cost = Decimal::from(request.cost);

    // whole currency units only, the fraction is dropped before converting
    let unit_amount = cost
        .trunc()
        .checked_mul(Decimal::from(100))
        .and_then(|cents| cents.to_i64())
        .ok_or(Error::CustomStr(
            StatusCode::UNPROCESSABLE_ENTITY,
            "cost is out of range",
        ))?;

    let session = checkout
        .create_session(NewSession {
            unit_amount,
            parcel_name: request.parcel_name,
            sender_email: request.sender_email,
            parcel_id: request.parcel_id,
        })
        .await?;

    tracing::debug!("created checkout session {}", session.id);

    Ok(Json(CreateSessionResponse { url: session.url }))
}

#[derive(Deserialize, Debug)]
pub struct ConfirmQuery {
    pub session_id: String,
}

#[derive(Serialize, Debug)]
#[serde(untagged)]
pub enum ConfirmResponse {
    #[serde(rename_all = "camelCase")]
    AlreadyProcessed {
        success: bool,
        message: &'static str,
        tracking_id: String,
        transaction_id: String,
    },
    #[serde(rename_all = "camelCase")]
    PaidFirstTime {
        success: bool,
        modify_parcel: UpdateSummary,
        tracking_id: String,
        transaction_id: String,
        payment_info: Payment,
    },
    NotPaid { success: bool },
}

#[tracing::instrument(skip_all, fields(session_id = %query.session_id))]
pub async fn confirm(
    State(checkout): State<CheckoutClient>,
    State(parcels): State<ParcelStore>,
    State(payments): State<PaymentStore>,
    Query(query): Query<ConfirmQuery>,
) -> Result<Json<ConfirmResponse>, Error> {
    let session = checkout.fetch_session(&query.session_id).await?;

    // replays of the success redirect must not double-record the payment
    if let Some(transaction_id) = &session.transaction_id {
        if let Some(existing) = payments.find_by_transaction_id(transaction_id).await? {
            tracing::debug!("payment for {} already recorded", existing.transaction_id);
            return Ok(Json(ConfirmResponse::AlreadyProcessed {
                success: true,
                message: "Payment already processed",
                tracking_id: existing.tracking_id,
                transaction_id: existing.transaction_id,
            }));
        }
    }

    if session.status != SessionStatus::Paid {
        return Ok(Json(ConfirmResponse::NotPaid { success: false }));
    }

    let transaction_id = session.transaction_id.ok_or(Error::CustomStr(
        StatusCode::BAD_GATEWAY,
        "paid checkout session carries no payment intent",
    ))?;

    let parcel_id = session.parcel_id.ok_or(Error::CustomStr(
        StatusCode::BAD_GATEWAY,
        "paid checkout session carries no parcel id",
    ))?;
    let parcel_id = ObjectId::from_str(&parcel_id).map_err(|_| {
        Error::CustomStr(
            StatusCode::BAD_GATEWAY,
            "paid checkout session carries a malformed parcel id",
        )
    })?;

    // the tracking id exists only once the payment settles
    let tracking_id = tracking::generate();

    let modify_parcel = parcels
        .update(
            parcel_id,
            doc! {
                "paymentStatus": "paid",
                "trackingId": &tracking_id,
            },
        )
        .await?;

    let payment = PaymentModel {
        id: ObjectId::new(),
        amount: Decimal::new(session.amount_total.unwrap_or_default(), 2),
        transaction_id: transaction_id.clone(),
        currency: session.currency,
        payment_status: session.status.as_str().to_string(),
        sender_email: session.customer_email,
        parcel_id: parcel_id.to_hex(),
        parcel_name: session.parcel_name,
        paid_at: OffsetDateTime::now_utc().into(),
        tracking_id: tracking_id.clone(),
    };

    tracing::debug!("recording settled payment {:?}", payment);
    payments.insert(&payment).await?;

    Ok(Json(ConfirmResponse::PaidFirstTime {
        success: true,
        modify_parcel,
        tracking_id,
        transaction_id,
        payment_info: payment.into(),
    }))
}

#[derive(Deserialize, Debug)]
pub struct HistoryQuery {
    pub email: Option<String>,
}

pub async fn history(
    identity: Identity,
    State(payments): State<PaymentStore>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<Payment>>, Error> {
    if let Some(email) = &query.email {
        if *email != identity.email {
            tracing::debug!("tried reading another sender's payments");
            return Err(Error::Forbidden);
        }
    }

    let payments = payments.list(query.email.as_deref()).await?;

    Ok(Json(payments.into_iter().map(Into::into).collect()))
}
