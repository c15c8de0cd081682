//! In-memory repositories backed by `tokio::sync::RwLock`. Not durable;
//! they exist for tests and for running the service without a deployment.

use async_trait::async_trait;
use bson::{oid::ObjectId, Document};
use tokio::sync::RwLock;

use crate::{
    api::{
        parcel::ParcelModel,
        payment::PaymentModel,
        rider::{RiderModel, RiderStatus},
        user::{UserModel, UserRole},
    },
    error::Error,
};

use super::{
    DeleteSummary, InsertSummary, ParcelRepository, PaymentRepository, RiderRepository,
    UpdateSummary, UserRepository,
};

/// Replays a `$set` document on top of a stored model by round-tripping it
/// through its BSON form, the same merge `update_one` performs server side.
fn merge_set<T>(model: &T, changes: Document) -> Result<(T, UpdateSummary), Error>
where
    T: serde::Serialize + serde::de::DeserializeOwned,
{
    let mut document = bson::to_document(model)?;

    let mut modified_count = 0;
    for (key, value) in changes {
        if document.get(&key) != Some(&value) {
            modified_count = 1;
        }
        document.insert(key, value);
    }

    let merged = bson::from_document(document)?;

    Ok((
        merged,
        UpdateSummary {
            matched_count: 1,
            modified_count,
        },
    ))
}

#[derive(Default)]
pub struct MemoryParcels {
    parcels: RwLock<Vec<ParcelModel>>,
}

#[async_trait]
impl ParcelRepository for MemoryParcels {
    async fn list(&self, sender_email: Option<&str>) -> Result<Vec<ParcelModel>, Error> {
        let parcels = self.parcels.read().await;

        let mut parcels: Vec<ParcelModel> = parcels
            .iter()
            .filter(|parcel| match sender_email {
                Some(email) => parcel.sender_email.as_deref() == Some(email),
                None => true,
            })
            .cloned()
            .collect();

        parcels.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(parcels)
    }

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<ParcelModel>, Error> {
        let parcels = self.parcels.read().await;

        Ok(parcels.iter().find(|parcel| parcel.id == id).cloned())
    }

    async fn insert(&self, parcel: &ParcelModel) -> Result<InsertSummary, Error> {
        self.parcels.write().await.push(parcel.clone());

        Ok(InsertSummary {
            inserted_id: parcel.id.into(),
        })
    }

    async fn update(&self, id: ObjectId, changes: Document) -> Result<UpdateSummary, Error> {
        let mut parcels = self.parcels.write().await;

        let Some(parcel) = parcels.iter_mut().find(|parcel| parcel.id == id) else {
            return Ok(UpdateSummary {
                matched_count: 0,
                modified_count: 0,
            });
        };

        let (merged, summary) = merge_set(parcel, changes)?;
        *parcel = merged;

        Ok(summary)
    }

    async fn delete(&self, id: ObjectId) -> Result<DeleteSummary, Error> {
        let mut parcels = self.parcels.write().await;

        let before = parcels.len();
        parcels.retain(|parcel| parcel.id != id);

        Ok(DeleteSummary {
            deleted_count: (before - parcels.len()) as u64,
        })
    }
}

#[derive(Default)]
pub struct MemoryPayments {
    payments: RwLock<Vec<PaymentModel>>,
}

#[async_trait]
impl PaymentRepository for MemoryPayments {
    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<PaymentModel>, Error> {
        let payments = self.payments.read().await;

        Ok(payments
            .iter()
            .find(|payment| payment.transaction_id == transaction_id)
            .cloned())
    }

    async fn insert(&self, payment: &PaymentModel) -> Result<InsertSummary, Error> {
        self.payments.write().await.push(payment.clone());

        Ok(InsertSummary {
            inserted_id: payment.id.into(),
        })
    }

    async fn list(&self, sender_email: Option<&str>) -> Result<Vec<PaymentModel>, Error> {
        let payments = self.payments.read().await;

        let mut payments: Vec<PaymentModel> = payments
            .iter()
            .filter(|payment| match sender_email {
                Some(email) => payment.sender_email.as_deref() == Some(email),
                None => true,
            })
            .cloned()
            .collect();

        payments.sort_by(|a, b| b.paid_at.cmp(&a.paid_at));

        Ok(payments)
    }
}

#[derive(Default)]
pub struct MemoryUsers {
    users: RwLock<Vec<UserModel>>,
}

#[async_trait]
impl UserRepository for MemoryUsers {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserModel>, Error> {
        let users = self.users.read().await;

        Ok(users.iter().find(|user| user.email == email).cloned())
    }

    async fn insert(&self, user: &UserModel) -> Result<InsertSummary, Error> {
        self.users.write().await.push(user.clone());

        Ok(InsertSummary {
            inserted_id: user.id.into(),
        })
    }

    async fn set_role_by_email(
        &self,
        email: &str,
        role: UserRole,
    ) -> Result<UpdateSummary, Error> {
        let mut users = self.users.write().await;

        let Some(user) = users.iter_mut().find(|user| user.email == email) else {
            return Ok(UpdateSummary {
                matched_count: 0,
                modified_count: 0,
            });
        };

        let modified_count = u64::from(user.role != role);
        user.role = role;

        Ok(UpdateSummary {
            matched_count: 1,
            modified_count,
        })
    }
}

#[derive(Default)]
pub struct MemoryRiders {
    riders: RwLock<Vec<RiderModel>>,
}

#[async_trait]
impl RiderRepository for MemoryRiders {
    async fn list(&self, status: Option<&str>) -> Result<Vec<RiderModel>, Error> {
        let riders = self.riders.read().await;

        Ok(riders
            .iter()
            .filter(|rider| match status {
                Some(status) => rider.status.as_str() == status,
                None => true,
            })
            .cloned()
            .collect())
    }

    async fn insert(&self, rider: &RiderModel) -> Result<InsertSummary, Error> {
        self.riders.write().await.push(rider.clone());

        Ok(InsertSummary {
            inserted_id: rider.id.into(),
        })
    }

    async fn set_status(&self, id: ObjectId, status: RiderStatus) -> Result<UpdateSummary, Error> {
        let mut riders = self.riders.write().await;

        let Some(rider) = riders.iter_mut().find(|rider| rider.id == id) else {
            return Ok(UpdateSummary {
                matched_count: 0,
                modified_count: 0,
            });
        };

        let modified_count = u64::from(rider.status != status);
        rider.status = status;

        Ok(UpdateSummary {
            matched_count: 1,
            modified_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use bson::{doc, oid::ObjectId};

    use crate::{api::parcel::ParcelModel, store::ParcelRepository};

    use super::MemoryParcels;

    fn parcel(sender_email: &str) -> ParcelModel {
        ParcelModel {
            id: ObjectId::new(),
            sender_email: Some(sender_email.to_string()),
            parcel_name: Some("books".to_string()),
            cost: None,
            payment_status: None,
            tracking_id: None,
            created_at: bson::DateTime::now(),
            extra: doc! { "weightKg": 2 },
        }
    }

    #[tokio::test]
    async fn test_update_merges_changes_into_document() {
        let parcels = MemoryParcels::default();
        let model = parcel("sender@example.com");
        parcels.insert(&model).await.unwrap();

        let summary = parcels
            .update(
                model.id,
                doc! { "paymentStatus": "paid", "note": "fragile" },
            )
            .await
            .unwrap();
        assert_eq!(summary.matched_count, 1);
        assert_eq!(summary.modified_count, 1);

        let stored = parcels.find_by_id(model.id).await.unwrap().unwrap();
        assert_eq!(stored.payment_status.as_deref(), Some("paid"));
        assert_eq!(stored.extra.get_str("note").unwrap(), "fragile");
        assert_eq!(stored.extra.get_i32("weightKg").unwrap(), 2);
        assert_eq!(stored.sender_email, model.sender_email);
    }

    #[tokio::test]
    async fn test_update_with_unchanged_value_modifies_nothing() {
        let parcels = MemoryParcels::default();
        let model = parcel("sender@example.com");
        parcels.insert(&model).await.unwrap();

        let summary = parcels
            .update(model.id, doc! { "weightKg": 2 })
            .await
            .unwrap();
        assert_eq!(summary.matched_count, 1);
        assert_eq!(summary.modified_count, 0);
    }

    #[tokio::test]
    async fn test_update_unknown_id_matches_nothing() {
        let parcels = MemoryParcels::default();

        let summary = parcels
            .update(ObjectId::new(), doc! { "paymentStatus": "paid" })
            .await
            .unwrap();
        assert_eq!(summary.matched_count, 0);
        assert_eq!(summary.modified_count, 0);
    }
}
