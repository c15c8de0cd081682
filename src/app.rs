use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    checkout::{CheckoutClient, StripeCheckout},
    identity::{IdentityClient, JwtVerifier},
    store::{
        memory::{MemoryParcels, MemoryPayments, MemoryRiders, MemoryUsers},
        mongo::{self, MongoParcels, MongoPayments, MongoRiders, MongoUsers},
        ParcelStore, PaymentStore, RiderStore, UserStore,
    },
};

#[derive(FromRef, Clone)]
pub struct AppState {
    pub checkout: CheckoutClient,
    pub identity: IdentityClient,

    pub parcels: ParcelStore,
    pub payments: PaymentStore,
    pub users: UserStore,
    pub riders: RiderStore,
}

impl AppState {
    pub async fn new(
        mongo_url: &str,
        database_name: &str,
        checkout: CheckoutClient,
        identity: IdentityClient,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let client = mongo::connect(mongo_url).await?;

        let db = client.database(database_name);
        Ok(Self {
            checkout,
            identity,

            parcels: ParcelStore(Arc::new(MongoParcels(db.collection("parcels")))),
            payments: PaymentStore(Arc::new(MongoPayments(db.collection("payments")))),
            users: UserStore(Arc::new(MongoUsers(db.collection("users")))),
            riders: RiderStore(Arc::new(MongoRiders(db.collection("riders")))),
        })
    }

    /// State with every repository held in process memory. Nothing survives
    /// a restart.
    pub fn new_in_memory(checkout: CheckoutClient, identity: IdentityClient) -> Self {
        Self {
            checkout,
            identity,

            parcels: ParcelStore(Arc::new(MemoryParcels::default())),
            payments: PaymentStore(Arc::new(MemoryPayments::default())),
            users: UserStore(Arc::new(MemoryUsers::default())),
            riders: RiderStore(Arc::new(MemoryRiders::default())),
        }
    }

    pub async fn new_from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let mongo_url = std::env::var("MONGODB_URI")
            .expect("Missing required environment variable: MONGODB_URI");

        let checkout = CheckoutClient(Arc::new(StripeCheckout::new_from_env()));
        let identity = IdentityClient(Arc::new(JwtVerifier::new_from_env()));

        Self::new(&mongo_url, "parcelpost", checkout, identity).await
    }
}
