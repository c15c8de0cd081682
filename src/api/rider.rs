use std::str::FromStr;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use bson::{oid::ObjectId, Document};
use serde::{Deserialize, Serialize};
use tap::TapFallible;
use time::OffsetDateTime;

use crate::{
    api::user::UserRole,
    error::Error,
    store::{InsertSummary, RiderStore, UpdateSummary, UserStore},
    util::{FormattedDateTime, ObjectIdString},
};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RiderStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl RiderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

/// A rider application. Applications start out pending and are resolved
/// by an operator.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RiderModel {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub status: RiderStatus,

    pub created_at: bson::DateTime,

    #[serde(flatten)]
    pub extra: Document,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Rider {
    pub id: ObjectIdString,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub status: RiderStatus,

    pub created_at: FormattedDateTime,

    #[serde(flatten)]
    pub extra: Document,
}

impl From<RiderModel> for Rider {
    fn from(rider: RiderModel) -> Self {
        Self {
            id: rider.id.into(),
            email: rider.email,
            status: rider.status,
            created_at: rider.created_at.into(),
            extra: rider.extra,
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct IndexQuery {
    pub status: Option<String>,
}

pub async fn index(
    State(riders): State<RiderStore>,
    Query(query): Query<IndexQuery>,
) -> Result<Json<Vec<Rider>>, Error> {
    let riders = riders.list(query.status.as_deref()).await?;

    Ok(Json(riders.into_iter().map(Into::into).collect()))
}

#[derive(Deserialize, Debug)]
pub struct ApplyRequest {
    pub email: Option<String>,

    #[serde(flatten)]
    pub extra: Document,
}

#[tracing::instrument(skip_all)]
pub async fn apply(
    State(riders): State<RiderStore>,
    Json(request): Json<ApplyRequest>,
) -> Result<Json<InsertSummary>, Error> {
    let mut extra = request.extra;
    // stamped fields win over caller supplied ones
    extra.remove("_id");
    extra.remove("status");
    extra.remove("createdAt");

    let model = RiderModel {
        id: ObjectId::new(),
        email: request.email,
        status: RiderStatus::default(),
        created_at: OffsetDateTime::now_utc().into(),
        extra,
    };

    tracing::debug!("recording rider application {:?}", model);
    let summary = riders.insert(&model).await?;

    Ok(Json(summary))
}

#[derive(Deserialize, Debug)]
pub struct UpdateStatusRequest {
    pub status: RiderStatus,
    pub email: Option<String>,
}

#[tracing::instrument(skip_all, fields(id = %rider_id))]
pub async fn update_status(
    State(riders): State<RiderStore>,
    State(users): State<UserStore>,
    Path(rider_id): Path<String>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<UpdateSummary>, Error> {
    let rider_id = ObjectId::from_str(&rider_id)
        .map_err(|_| Error::NoResource)
        .tap_err(|_| tracing::debug!("tried updating rider with malformed id"))?;

    tracing::debug!("setting rider status to {}", request.status.as_str());
    let summary = riders.set_status(rider_id, request.status).await?;

    if request.status == RiderStatus::Approved {
        if let Some(email) = &request.email {
            let promoted = users.set_role_by_email(email, UserRole::Rider).await?;
            if promoted.matched_count == 0 {
                tracing::debug!("approved rider has no matching user account");
            }
        }
    }

    Ok(Json(summary))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use axum::{
        extract::{Path, Query},
        Json,
    };
    use bson::{doc, oid::ObjectId};

    use crate::{
        api::{
            tests::bootstrap,
            user::{UserModel, UserRole},
        },
        error::Error,
        store::{RiderRepository, UserRepository},
    };

    use super::{ApplyRequest, IndexQuery, RiderModel, RiderStatus, UpdateStatusRequest};

    fn rider(email: &str, status: RiderStatus) -> RiderModel {
        RiderModel {
            id: ObjectId::new(),
            email: Some(email.to_string()),
            status,
            created_at: bson::DateTime::from_millis(1_000),
            extra: doc! {},
        }
    }

    fn user(email: &str) -> UserModel {
        UserModel {
            id: ObjectId::new(),
            email: email.to_string(),
            role: UserRole::User,
            created_at: bson::DateTime::from_millis(1_000),
            extra: doc! {},
        }
    }

    #[tokio::test]
    async fn test_apply_starts_pending() {
        let bootstrap = bootstrap();

        let Json(summary) = super::apply(
            bootstrap.riders(),
            Json(ApplyRequest {
                email: Some("rider@example.com".to_string()),
                extra: doc! { "status": "approved", "vehicle": "bike" },
            }),
        )
        .await
        .unwrap();

        let riders = bootstrap.app_state.riders.list(None).await.unwrap();
        assert_eq!(riders.len(), 1);
        assert_eq!(summary.inserted_id, riders[0].id);
        assert_eq!(riders[0].email.as_deref(), Some("rider@example.com"));
        // the stamped status replaced the caller supplied value
        assert_eq!(riders[0].status, RiderStatus::Pending);
        assert_eq!(riders[0].extra.get_str("vehicle").unwrap(), "bike");
        assert!(riders[0].extra.get("status").is_none());
    }

    #[tokio::test]
    async fn test_index_filters_by_status() {
        let bootstrap = bootstrap();

        bootstrap
            .app_state
            .riders
            .insert(&rider("pending@example.com", RiderStatus::Pending))
            .await
            .unwrap();
        bootstrap
            .app_state
            .riders
            .insert(&rider("approved@example.com", RiderStatus::Approved))
            .await
            .unwrap();

        let Json(riders) = super::index(
            bootstrap.riders(),
            Query(IndexQuery {
                status: Some("approved".to_string()),
            }),
        )
        .await
        .unwrap();

        assert_eq!(riders.len(), 1);
        assert_eq!(riders[0].email.as_deref(), Some("approved@example.com"));

        let Json(riders) = super::index(
            bootstrap.riders(),
            Query(IndexQuery {
                status: Some("junk".to_string()),
            }),
        )
        .await
        .unwrap();
        assert!(riders.is_empty());

        let Json(riders) = super::index(bootstrap.riders(), Query(IndexQuery { status: None }))
            .await
            .unwrap();
        assert_eq!(riders.len(), 2);
    }

    #[tokio::test]
    async fn test_approval_promotes_user() {
        let bootstrap = bootstrap();

        bootstrap
            .app_state
            .users
            .insert(&user("rider@example.com"))
            .await
            .unwrap();
        let application = rider("rider@example.com", RiderStatus::Pending);
        bootstrap.app_state.riders.insert(&application).await.unwrap();

        let Json(summary) = super::update_status(
            bootstrap.riders(),
            bootstrap.users(),
            Path(application.id.to_string()),
            Json(UpdateStatusRequest {
                status: RiderStatus::Approved,
                email: Some("rider@example.com".to_string()),
            }),
        )
        .await
        .unwrap();

        assert_eq!(summary.matched_count, 1);
        assert_eq!(summary.modified_count, 1);

        let promoted = bootstrap
            .app_state
            .users
            .find_by_email("rider@example.com")
            .await
            .unwrap()
            .expect("user should still exist");
        assert_eq!(promoted.role, UserRole::Rider);
    }

    #[tokio::test]
    async fn test_approval_without_user_account() {
        let bootstrap = bootstrap();

        let application = rider("rider@example.com", RiderStatus::Pending);
        bootstrap.app_state.riders.insert(&application).await.unwrap();

        let Json(summary) = super::update_status(
            bootstrap.riders(),
            bootstrap.users(),
            Path(application.id.to_string()),
            Json(UpdateStatusRequest {
                status: RiderStatus::Approved,
                email: Some("rider@example.com".to_string()),
            }),
        )
        .await
        .unwrap();

        // the application still resolves even though nobody gets promoted
        assert_eq!(summary.matched_count, 1);
        assert_eq!(summary.modified_count, 1);
    }

    #[tokio::test]
    async fn test_rejection_leaves_user_untouched() {
        let bootstrap = bootstrap();

        bootstrap
            .app_state
            .users
            .insert(&user("rider@example.com"))
            .await
            .unwrap();
        let application = rider("rider@example.com", RiderStatus::Pending);
        bootstrap.app_state.riders.insert(&application).await.unwrap();

        super::update_status(
            bootstrap.riders(),
            bootstrap.users(),
            Path(application.id.to_string()),
            Json(UpdateStatusRequest {
                status: RiderStatus::Rejected,
                email: Some("rider@example.com".to_string()),
            }),
        )
        .await
        .unwrap();

        let riders = bootstrap.app_state.riders.list(None).await.unwrap();
        assert_eq!(riders[0].status, RiderStatus::Rejected);

        let untouched = bootstrap
            .app_state
            .users
            .find_by_email("rider@example.com")
            .await
            .unwrap()
            .expect("user should still exist");
        assert_eq!(untouched.role, UserRole::User);
    }

    #[tokio::test]
    async fn test_update_status_non_existing_rider() {
        let bootstrap = bootstrap();

        let Json(summary) = super::update_status(
            bootstrap.riders(),
            bootstrap.users(),
            Path(ObjectId::new().to_string()),
            Json(UpdateStatusRequest {
                status: RiderStatus::Approved,
                email: None,
            }),
        )
        .await
        .unwrap();

        assert_eq!(summary.matched_count, 0);
        assert_eq!(summary.modified_count, 0);

        let malformed = super::update_status(
            bootstrap.riders(),
            bootstrap.users(),
            Path("not-an-id".to_string()),
            Json(UpdateStatusRequest {
                status: RiderStatus::Approved,
                email: None,
            }),
        )
        .await
        .expect_err("");
        assert_matches!(malformed, Error::NoResource);
    }
}
