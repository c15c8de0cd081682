use std::net::SocketAddr;

use axum::{routing, Router};
use parcelpost::app::AppState;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "parcelpost=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let app_state = AppState::new_from_env().await.unwrap();

    let app = Router::new()
        .route("/", routing::get(liveness))
        .route("/parcels", routing::get(parcelpost::api::parcel::index))
        .route("/parcels", routing::post(parcelpost::api::parcel::create))
        .route("/parcels/:id", routing::get(parcelpost::api::parcel::show))
        .route("/parcels/:id", routing::patch(parcelpost::api::parcel::update))
        .route("/parcels/:id", routing::delete(parcelpost::api::parcel::delete))
        .route(
            "/create-checkout-session",
            routing::post(parcelpost::api::payment::create_checkout_session),
        )
        .route(
            "/payment-success",
            routing::patch(parcelpost::api::payment::confirm),
        )
        .route("/payments", routing::get(parcelpost::api::payment::history))
        .route("/users", routing::post(parcelpost::api::user::register))
        .route("/riders", routing::get(parcelpost::api::rider::index))
        .route("/riders", routing::post(parcelpost::api::rider::apply))
        .route("/riders/:id", routing::patch(parcelpost::api::rider::update_status))
        .fallback(fallback)
        .with_state(app_state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::cors::CorsLayer::permissive());

    let port = std::env::var("PORT")
        .ok()
        .and_then(|port| port.parse().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::debug!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .unwrap();
}

async fn liveness() -> &'static str {
    "Parcelpost backend is running"
}

async fn fallback(uri: axum::http::Uri) -> parcelpost::error::Error {
    parcelpost::error::Error::NotFound(uri)
}
