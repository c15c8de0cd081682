pub mod parcel;
pub mod payment;
pub mod rider;
pub mod user;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::extract::State;

    use crate::{
        app::AppState,
        checkout::{testing::FakeCheckout, CheckoutClient},
        identity::{testing::StaticVerifier, Identity, IdentityClient},
        store::{ParcelStore, PaymentStore, RiderStore, UserStore},
    };

    pub struct Bootstrap {
        pub app_state: AppState,
        pub checkout: Arc<FakeCheckout>,
    }

    impl Bootstrap {
        pub fn parcels(&self) -> State<ParcelStore> {
            State(self.app_state.parcels.clone())
        }

        pub fn payments(&self) -> State<PaymentStore> {
            State(self.app_state.payments.clone())
        }

        pub fn users(&self) -> State<UserStore> {
            State(self.app_state.users.clone())
        }

        pub fn riders(&self) -> State<RiderStore> {
            State(self.app_state.riders.clone())
        }

        pub fn checkout_client(&self) -> State<CheckoutClient> {
            State(self.app_state.checkout.clone())
        }

        pub fn identity(&self, email: &str) -> Identity {
            Identity {
                email: email.to_string(),
            }
        }
    }

    pub fn bootstrap() -> Bootstrap {
        let checkout = Arc::new(FakeCheckout::default());

        let app_state = AppState::new_in_memory(
            CheckoutClient(checkout.clone()),
            IdentityClient(Arc::new(StaticVerifier)),
        );

        Bootstrap {
            app_state,
            checkout,
        }
    }
}
