use std::str::FromStr;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use bson::{oid::ObjectId, Document};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tap::TapFallible;
use time::OffsetDateTime;

use crate::{
    error::Error,
    store::{DeleteSummary, InsertSummary, ParcelStore, UpdateSummary},
    util::{FormattedDateTime, ObjectIdString},
};

/// A parcel as stored. Senders may attach fields this service does not
/// interpret; those ride along in `extra`.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ParcelModel {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parcel_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<Decimal>,

    /// Absent until a checkout settles, then `"paid"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_id: Option<String>,

    pub created_at: bson::DateTime,

    #[serde(flatten)]
    pub extra: Document,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Parcel {
    pub id: ObjectIdString,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parcel_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_id: Option<String>,

    pub created_at: FormattedDateTime,

    #[serde(flatten)]
    pub extra: Document,
}

impl From<ParcelModel> for Parcel {
    fn from(parcel: ParcelModel) -> Self {
        Self {
            id: parcel.id.into(),
            sender_email: parcel.sender_email,
            parcel_name: parcel.parcel_name,
            cost: parcel.cost,
            payment_status: parcel.payment_status,
            tracking_id: parcel.tracking_id,
            created_at: parcel.created_at.into(),
            extra: parcel.extra,
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct IndexQuery {
    pub email: Option<String>,
}

pub async fn index(
    State(parcels): State<ParcelStore>,
    Query(query): Query<IndexQuery>,
) -> Result<Json<Vec<Parcel>>, Error> {
    let parcels = parcels.list(query.email.as_deref()).await?;

    Ok(Json(parcels.into_iter().map(Into::into).collect()))
}

pub async fn show(
    State(parcels): State<ParcelStore>,
    Path(parcel_id): Path<String>,
) -> Result<Json<Parcel>, Error> {
    let parcel_id = ObjectId::from_str(&parcel_id)
        .map_err(|_| Error::NoResource)
        .tap_err(|_| tracing::debug!("tried accessing parcel with malformed id"))?;

    let parcel = parcels
        .find_by_id(parcel_id)
        .await?
        .ok_or(Error::NoResource)
        .tap_err(|_| tracing::debug!("tried accessing non existing parcel"))?;

    Ok(Json(parcel.into()))
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    pub sender_email: Option<String>,
    pub parcel_name: Option<String>,
    pub cost: Option<Decimal>,

    #[serde(flatten)]
    pub extra: Document,
}

#[tracing::instrument(skip_all)]
pub async fn create(
    State(parcels): State<ParcelStore>,
    Json(request): Json<CreateRequest>,
) -> Result<Json<InsertSummary>, Error> {
    let mut extra = request.extra;
    // stamped fields win over caller supplied ones
    extra.remove("_id");
    extra.remove("createdAt");

    let model = ParcelModel {
        id: ObjectId::new(),
        sender_email: request.sender_email,
        parcel_name: request.parcel_name,
        cost: request.cost,
        payment_status: None,
        tracking_id: None,
        created_at: OffsetDateTime::now_utc().into(),
        extra,
    };

    tracing::debug!("creating parcel {:?}", model);
    let summary = parcels.insert(&model).await?;

    Ok(Json(summary))
}

#[tracing::instrument(skip_all, fields(id = %parcel_id))]
pub async fn update(
    State(parcels): State<ParcelStore>,
    Path(parcel_id): Path<String>,
    Json(mut changes): Json<Document>,
) -> Result<Json<UpdateSummary>, Error> {
    let parcel_id = ObjectId::from_str(&parcel_id)
        .map_err(|_| Error::NoResource)
        .tap_err(|_| tracing::debug!("tried updating parcel with malformed id"))?;

    changes.remove("_id");

    tracing::debug!("merging parcel changes {:?}", changes);
    let summary = parcels.update(parcel_id, changes).await?;

    Ok(Json(summary))
}

#[tracing::instrument(skip_all, fields(id = %parcel_id))]
pub async fn delete(
    State(parcels): State<ParcelStore>,
    Path(parcel_id): Path<String>,
) -> Result<Json<DeleteSummary>, Error> {
    let parcel_id = ObjectId::from_str(&parcel_id)
        .map_err(|_| Error::NoResource)
        .tap_err(|_| tracing::debug!("tried deleting parcel with malformed id"))?;

    tracing::debug!("deleting parcel");
    let summary = parcels.delete(parcel_id).await?;

    Ok(Json(summary))
}
