use axum::{extract::State, Json};
use bson::{oid::ObjectId, Document};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    error::Error,
    store::{InsertSummary, UserStore},
};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Rider,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Rider => "rider",
            Self::Admin => "admin",
        }
    }
}

/// An account. Registration stamps the role; promotion to rider happens
/// through the rider approval flow.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserModel {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub email: String,
    pub role: UserRole,

    pub created_at: bson::DateTime,

    #[serde(flatten)]
    pub extra: Document,
}

#[derive(Deserialize, Debug)]
pub struct RegisterRequest {
    pub email: String,

    #[serde(flatten)]
    pub extra: Document,
}

#[derive(Serialize, Debug)]
#[serde(untagged)]
pub enum RegisterResponse {
    AlreadyRegistered { message: &'static str },
    Registered(InsertSummary),
}

#[tracing::instrument(skip_all, fields(email = %request.email))]
pub async fn register(
    State(users): State<UserStore>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, Error> {
    if users.find_by_email(&request.email).await?.is_some() {
        tracing::debug!("account already registered");
        return Ok(Json(RegisterResponse::AlreadyRegistered {
            message: "User already exists",
        }));
    }

    let mut extra = request.extra;
    // stamped fields win over caller supplied ones
    extra.remove("_id");
    extra.remove("role");
    extra.remove("createdAt");

    let model = UserModel {
        id: ObjectId::new(),
        email: request.email,
        role: UserRole::default(),
        created_at: OffsetDateTime::now_utc().into(),
        extra,
    };

    tracing::debug!("registering user {:?}", model);
    let summary = users.insert(&model).await?;

    Ok(Json(RegisterResponse::Registered(summary)))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use axum::Json;
    use bson::doc;

    use crate::{api::tests::bootstrap, store::UserRepository};

    use super::{RegisterRequest, RegisterResponse, UserRole};

    #[tokio::test]
    async fn test_register_new_user() {
        let bootstrap = bootstrap();

        let Json(response) = super::register(
            bootstrap.users(),
            Json(RegisterRequest {
                email: "sender@example.com".to_string(),
                extra: doc! { "name": "Sender" },
            }),
        )
        .await
        .unwrap();

        let summary = assert_matches!(response, RegisterResponse::Registered(summary) => summary);

        let stored = bootstrap
            .app_state
            .users
            .find_by_email("sender@example.com")
            .await
            .unwrap()
            .expect("user should exist after registration");

        assert_eq!(summary.inserted_id, stored.id);
        assert_eq!(stored.role, UserRole::User);
        assert_eq!(stored.extra.get_str("name").unwrap(), "Sender");
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let bootstrap = bootstrap();

        let Json(first) = super::register(
            bootstrap.users(),
            Json(RegisterRequest {
                email: "sender@example.com".to_string(),
                extra: doc! { "attempt": 1 },
            }),
        )
        .await
        .unwrap();
        assert_matches!(first, RegisterResponse::Registered(_));

        let Json(second) = super::register(
            bootstrap.users(),
            Json(RegisterRequest {
                email: "sender@example.com".to_string(),
                extra: doc! { "attempt": 2 },
            }),
        )
        .await
        .unwrap();

        assert_matches!(
            second,
            RegisterResponse::AlreadyRegistered {
                message: "User already exists",
            }
        );

        // the first registration is untouched
        let stored = bootstrap
            .app_state
            .users
            .find_by_email("sender@example.com")
            .await
            .unwrap()
            .expect("user should still exist");
        assert_eq!(stored.extra.get_i32("attempt").unwrap(), 1);
    }

    #[tokio::test]
    async fn test_register_ignores_caller_role() {
        let bootstrap = bootstrap();

        super::register(
            bootstrap.users(),
            Json(RegisterRequest {
                email: "sender@example.com".to_string(),
                extra: doc! { "role": "admin" },
            }),
        )
        .await
        .unwrap();

        let stored = bootstrap
            .app_state
            .users
            .find_by_email("sender@example.com")
            .await
            .unwrap()
            .expect("user should exist after registration");

        assert_eq!(stored.role, UserRole::User);
        assert!(stored.extra.get("role").is_none());
    }
}
