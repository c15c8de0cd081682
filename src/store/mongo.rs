use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Document};
use mongodb::{options::FindOptions, Collection};

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

pub async fn connect(mongo_url: &str) -> Result<mongodb::Client, Error> {
    let options = mongodb::options::ClientOptions::parse(mongo_url).await?;
    let client = mongodb::Client::with_options(options)?;

    // surfaces an unreachable deployment at startup
    client
        .database("admin")
        .run_command(doc! { "ping": 1 }, None)
        .await?;

    Ok(client)
}

#[derive(Clone)]
pub struct MongoParcels(pub Collection<ParcelModel>);

#[async_trait]
impl ParcelRepository for MongoParcels {
    async fn list(&self, sender_email: Option<&str>) -> Result<Vec<ParcelModel>, Error> {
        let filter = sender_email.map(|email| doc! { "senderEmail": email });
        let options = FindOptions::builder()
            .sort(doc! { "createdAt": -1 })
            .build();

        let mut cursor = self.0.find(filter, options).await?;

        let mut parcels = vec![];
        while cursor.advance().await? {
            parcels.push(cursor.deserialize_current()?);
        }

        Ok(parcels)
    }

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<ParcelModel>, Error> {
        self.0
            .find_one(doc! { "_id": id }, None)
            .await
            .map_err(Into::into)
    }

    async fn insert(&self, parcel: &ParcelModel) -> Result<InsertSummary, Error> {
        self.0.insert_one(parcel, None).await?;

        Ok(InsertSummary {
            inserted_id: parcel.id.into(),
        })
    }

    async fn update(&self, id: ObjectId, changes: Document) -> Result<UpdateSummary, Error> {
        let result = self
            .0
            .update_one(doc! { "_id": id }, doc! { "$set": changes }, None)
            .await?;

        Ok(result.into())
    }

    async fn delete(&self, id: ObjectId) -> Result<DeleteSummary, Error> {
        let result = self.0.delete_one(doc! { "_id": id }, None).await?;

        Ok(result.into())
    }
}

#[derive(Clone)]
pub struct MongoPayments(pub Collection<PaymentModel>);

#[async_trait]
impl PaymentRepository for MongoPayments {
    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<PaymentModel>, Error> {
        self.0
            .find_one(doc! { "transactionId": transaction_id }, None)
            .await
            .map_err(Into::into)
    }

    async fn insert(&self, payment: &PaymentModel) -> Result<InsertSummary, Error> {
        self.0.insert_one(payment, None).await?;

        Ok(InsertSummary {
            inserted_id: payment.id.into(),
        })
    }

    async fn list(&self, sender_email: Option<&str>) -> Result<Vec<PaymentModel>, Error> {
        let filter = sender_email.map(|email| doc! { "senderEmail": email });
        let options = FindOptions::builder().sort(doc! { "paidAt": -1 }).build();

        let mut cursor = self.0.find(filter, options).await?;

        let mut payments = vec![];
        while cursor.advance().await? {
            payments.push(cursor.deserialize_current()?);
        }

        Ok(payments)
    }
}

#[derive(Clone)]
pub struct MongoUsers(pub Collection<UserModel>);

#[async_trait]
impl UserRepository for MongoUsers {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserModel>, Error> {
        self.0
            .find_one(doc! { "email": email }, None)
            .await
            .map_err(Into::into)
    }

    async fn insert(&self, user: &UserModel) -> Result<InsertSummary, Error> {
        self.0.insert_one(user, None).await?;

        Ok(InsertSummary {
            inserted_id: user.id.into(),
        })
    }

    async fn set_role_by_email(
        &self,
        email: &str,
        role: UserRole,
    ) -> Result<UpdateSummary, Error> {
        let result = self
            .0
            .update_one(
                doc! { "email": email },
                doc! { "$set": { "role": role.as_str() } },
                None,
            )
            .await?;

        Ok(result.into())
    }
}

#[derive(Clone)]
pub struct MongoRiders(pub Collection<RiderModel>);

#[async_trait]
impl RiderRepository for MongoRiders {
    async fn list(&self, status: Option<&str>) -> Result<Vec<RiderModel>, Error> {
        let filter = status.map(|status| doc! { "status": status });

        let mut cursor = self.0.find(filter, None).await?;

        let mut riders = vec![];
        while cursor.advance().await? {
            riders.push(cursor.deserialize_current()?);
        }

        Ok(riders)
    }

    async fn insert(&self, rider: &RiderModel) -> Result<InsertSummary, Error> {
        self.0.insert_one(rider, None).await?;

        Ok(InsertSummary {
            inserted_id: rider.id.into(),
        })
    }

    async fn set_status(&self, id: ObjectId, status: RiderStatus) -> Result<UpdateSummary, Error> {
        let result = self
            .0
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "status": status.as_str() } },
                None,
            )
            .await?;

        Ok(result.into())
    }
}
