use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, Set};
use tokio::net::TcpListener;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use local_services_backend::{
    config::Config, db, entities::service, routes, utils::crypto::EmailCipher, AppState,
};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "local_services_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env();
    tracing::info!("Starting server at {}", config.server_addr());

    let crypto = EmailCipher::from_hex(&config.encryption_key)
        .expect("ENCRYPTION_KEY must be a hex-encoded 32-byte key");

    // Connect to database and run migrations
    let db = db::connect_and_migrate(&config)
        .await
        .expect("Failed to prepare database");
    tracing::info!("Database ready");

    // Seed a starter catalog on an empty database
    seed_services(&db).await;

    // Create app state
    let state = AppState {
        db,
        config: config.clone(),
        crypto,
    };

    // Rate limiting: 300 requests per 15 minutes per IP
    let governor_config = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(3)
            .burst_size(300)
            .finish()
            .unwrap(),
    );

    let allowed_origin = config
        .allowed_origin
        .parse::<HeaderValue>()
        .expect("Invalid ALLOWED_ORIGIN");

    // Create router with middleware
    let app = routes::create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(allowed_origin)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(GovernorLayer::new(governor_config));

    // Start server with socket address for rate limiting
    let addr: SocketAddr = config.server_addr().parse().expect("Invalid address");
    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}

/// Seed a handful of services so a fresh install has something to browse
async fn seed_services(db: &sea_orm::DatabaseConnection) {
    let count = service::Entity::find()
        .count(db)
        .await
        .expect("Failed to count services");

    if count > 0 {
        return;
    }

    let samples: [(&str, &str, i64, f64, f64); 3] = [
        (
            "Emergency Plumbing",
            "24/7 plumbing repairs for leaks, blockages and burst pipes.",
            85000,
            -0.1278,
            51.5074,
        ),
        (
            "Home Electrical Services",
            "Certified electrician for rewiring, sockets and lighting.",
            65000,
            -0.1410,
            51.5010,
        ),
        (
            "Deep Cleaning",
            "End-of-tenancy and spring deep cleans for homes and offices.",
            40000,
            -0.1200,
            51.5150,
        ),
    ];

    for (title, description, price_cents, lng, lat) in samples {
        let seeded = service::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(title.to_string()),
            description: Set(description.to_string()),
            price: Set(Decimal::new(price_cents, 2)),
            provider_name: Set("Local Services Demo".to_string()),
            provider_contact: Set("02079460000".to_string()),
            provider_email: Set("demo@localservices.example".to_string()),
            lng: Set(Some(lng)),
            lat: Set(Some(lat)),
            created_by: Set(None),
            created_at: Set(Utc::now().into()),
        };
        seeded.insert(db).await.expect("Failed to seed service");
    }

    tracing::info!("Seeded starter service catalog");
}
