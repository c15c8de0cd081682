use axum::{
    http::{StatusCode, Uri},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0} not found")]
    NotFound(Uri),

    #[error("No resource found")]
    NoResource,

    #[error("{0}")]
    DatabaseError(#[from] mongodb::error::Error),

    #[error("{0}")]
    CheckoutError(#[from] stripe::StripeError),

    #[error("{0}")]
    Unauthorized(UnauthorizedType),

    #[error("Forbidden access")]
    Forbidden,

    #[error("{0}")]
    BSONSerError(#[from] bson::ser::Error),

    #[error("{0}")]
    BSONDeError(#[from] bson::de::Error),

    #[error("{1}")]
    CustomStr(StatusCode, &'static str),
}

#[derive(Debug, thiserror::Error)]
pub enum UnauthorizedType {
    #[error("Unauthorized access")]
    MissingAuthorization,

    #[error("Unauthorized access")]
    InvalidAccessToken,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorJson {
    r#type: String,
    message: String,
}

impl From<Error> for ErrorJson {
    fn from(err: Error) -> Self {
        let r#type = err.to_string_variant();

        // storage failures keep their detail in the log, not the body
        let message = match err {
            Error::DatabaseError(..) | Error::BSONSerError(..) | Error::BSONDeError(..) => {
                "Internal server error".to_string()
            }
            Error::NotFound(..)
            | Error::NoResource
            | Error::CheckoutError(..)
            | Error::Unauthorized(..)
            | Error::Forbidden
            | Error::CustomStr(..) => err.to_string(),
        };

        Self { message, r#type }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        tracing::error!("error: {:?}", self);
        let status = match self {
            Self::Unauthorized(..) => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(..) | Self::NoResource => StatusCode::NOT_FOUND,
            Self::CheckoutError(..) => StatusCode::BAD_GATEWAY,
            Self::DatabaseError(..) | Self::BSONSerError(..) | Self::BSONDeError(..) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::CustomStr(code, ..) => code,
        };

        let error = ErrorJson::from(self);

        (status, Json(error)).into_response()
    }
}

impl Error {
    pub fn to_string_variant(&self) -> String {
        macro_rules! match_var {
            ($id:ident !) => {
                Self::$id
            };
            ($id:ident (..)) => {
                Self::$id(..)
            };
        }

        macro_rules! variant {
            ($($name:ident $tt:tt),+) => {
                match self {
                    $(
                        match_var!($name $tt) => {
                            stringify!($name)
                       }
                    )+
                }
            };
        }

        variant! {
            NotFound(..),
            NoResource!,
            Forbidden!,
            DatabaseError(..),
            CheckoutError(..),
            BSONSerError(..),
            BSONDeError(..),
            Unauthorized(..),
            CustomStr(..)
        }
        .to_string()
    }
}
