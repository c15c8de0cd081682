//! Storage gateway: one repository trait per collection, with a MongoDB
//! implementation for the server and an in-memory one for tests.

use std::sync::Arc;

use async_trait::async_trait;
use bson::{oid::ObjectId, Document};
use serde::{Deserialize, Serialize};

use crate::{
    api::{
        parcel::ParcelModel,
        payment::PaymentModel,
        rider::{RiderModel, RiderStatus},
        user::{UserModel, UserRole},
    },
    error::Error,
    util::ObjectIdString,
};

pub mod memory;
pub mod mongo;

#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
#[serde(rename_all = "camelCase")]
pub struct InsertSummary {
    pub inserted_id: ObjectIdString,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSummary {
    pub matched_count: u64,
    pub modified_count: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSummary {
    pub deleted_count: u64,
}

impl From<mongodb::results::UpdateResult> for UpdateSummary {
    fn from(result: mongodb::results::UpdateResult) -> Self {
        Self {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
        }
    }
}

impl From<mongodb::results::DeleteResult> for DeleteSummary {
    fn from(result: mongodb::results::DeleteResult) -> Self {
        Self {
            deleted_count: result.deleted_count,
        }
    }
}

#[async_trait]
pub trait ParcelRepository: Send + Sync {
    /// Parcels, newest first, optionally narrowed to one sender.
    async fn list(&self, sender_email: Option<&str>) -> Result<Vec<ParcelModel>, Error>;

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<ParcelModel>, Error>;

    async fn insert(&self, parcel: &ParcelModel) -> Result<InsertSummary, Error>;

    /// Merges `changes` into the stored document, `$set` style. Fields not
    /// named in `changes` are left as they are.
    async fn update(&self, id: ObjectId, changes: Document) -> Result<UpdateSummary, Error>;

    async fn delete(&self, id: ObjectId) -> Result<DeleteSummary, Error>;
}

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<PaymentModel>, Error>;

    async fn insert(&self, payment: &PaymentModel) -> Result<InsertSummary, Error>;

    /// Payments, most recently paid first, optionally narrowed to one sender.
    async fn list(&self, sender_email: Option<&str>) -> Result<Vec<PaymentModel>, Error>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserModel>, Error>;

    async fn insert(&self, user: &UserModel) -> Result<InsertSummary, Error>;

    async fn set_role_by_email(&self, email: &str, role: UserRole)
        -> Result<UpdateSummary, Error>;
}

#[async_trait]
pub trait RiderRepository: Send + Sync {
    async fn list(&self, status: Option<&str>) -> Result<Vec<RiderModel>, Error>;

    async fn insert(&self, rider: &RiderModel) -> Result<InsertSummary, Error>;

    async fn set_status(&self, id: ObjectId, status: RiderStatus) -> Result<UpdateSummary, Error>;
}

#[derive(Clone)]
pub struct ParcelStore(pub Arc<dyn ParcelRepository>);

impl std::ops::Deref for ParcelStore {
    type Target = dyn ParcelRepository;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

#[derive(Clone)]
pub struct PaymentStore(pub Arc<dyn PaymentRepository>);

impl std::ops::Deref for PaymentStore {
    type Target = dyn PaymentRepository;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

#[derive(Clone)]
pub struct UserStore(pub Arc<dyn UserRepository>);

impl std::ops::Deref for UserStore {
    type Target = dyn UserRepository;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

#[derive(Clone)]
pub struct RiderStore(pub Arc<dyn RiderRepository>);

impl std::ops::Deref for RiderStore {
    type Target = dyn RiderRepository;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}
