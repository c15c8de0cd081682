pub mod api;
pub mod app;
pub mod checkout;
pub mod error;
pub mod identity;
pub mod store;
pub mod tracking;
pub mod util;
