use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use villa_api::{app, AppState, AuthConfig};
use villa_booking::{
    Aggregator, AvailabilityCalculator, BookingLedger, DispatchPolicy, LedgerRules,
    NotificationDispatcher, OtpTtls, Stores, VerificationService,
};
use villa_core::clock::{Clock, SystemClock};
use villa_core::notify::Notifier;
use villa_store::app_config::{Config, DispatchMode, StorageBackend};
use villa_store::{
    DbClient, LogMailer, MemoryStore, PgBookingRepository, PgPlaceRepository, PgUserRepository,
    PgVerificationRepository, RedisClient, SmtpMailer,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "villa_api=debug,villa_booking=debug,tower_http=debug,axum::rejection=trace".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Villa API on port {}", config.server.port);

    let stores = build_stores(&config).await?;

    // Redis is only needed for rate limiting
    let redis = match &config.redis {
        Some(redis) => Some(Arc::new(
            RedisClient::new(&redis.url)
                .await
                .context("Failed to connect to Redis")?,
        )),
        None => {
            tracing::warn!("No redis configured, rate limiting disabled");
            None
        }
    };

    let notifier: Arc<dyn Notifier> = match &config.notifications.smtp {
        Some(smtp) => Arc::new(SmtpMailer::new(smtp).context("Failed to configure SMTP")?),
        None => {
            tracing::warn!("No SMTP configured, emails will only be logged");
            Arc::new(LogMailer)
        }
    };
    let policy = match config.notifications.mode {
        DispatchMode::Background => DispatchPolicy::Background,
        DispatchMode::Inline => DispatchPolicy::Inline {
            timeout: Duration::from_millis(config.notifications.timeout_ms),
        },
    };
    let dispatcher = NotificationDispatcher::new(notifier, policy);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let app_state = AppState {
        ledger: Arc::new(BookingLedger::new(
            stores.clone(),
            dispatcher.clone(),
            clock.clone(),
            LedgerRules {
                verify_price: config.booking.verify_price,
                reject_overlaps: config.booking.reject_overlaps,
                max_nights: config.booking.max_nights,
            },
        )),
        availability: Arc::new(AvailabilityCalculator::new(stores.bookings.clone())),
        verification: Arc::new(VerificationService::new(
            stores.clone(),
            dispatcher,
            clock,
            OtpTtls {
                registration: config.otp.registration_ttl_seconds,
                cancellation: config.otp.cancellation_ttl_seconds,
            },
        )),
        aggregator: Arc::new(Aggregator::new(stores)),
        redis,
        rate_limit: config.rate_limit.clone(),
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
        },
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

async fn build_stores(config: &Config) -> anyhow::Result<Stores> {
    match config.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage, data is lost on restart");
            let store = Arc::new(MemoryStore::new());
            Ok(Stores {
                bookings: store.clone(),
                places: store.clone(),
                users: store.clone(),
                verifications: store,
            })
        }
        StorageBackend::Postgres => {
            let db_config = config
                .database
                .as_ref()
                .context("storage.backend is postgres but [database] is missing")?;
            let db = DbClient::new(db_config)
                .await
                .context("Failed to connect to Postgres")?;
            db.migrate().await.context("Failed to run migrations")?;

            Ok(Stores {
                bookings: Arc::new(PgBookingRepository::new(db.pool.clone())),
                places: Arc::new(PgPlaceRepository::new(db.pool.clone())),
                users: Arc::new(PgUserRepository::new(db.pool.clone())),
                verifications: Arc::new(PgVerificationRepository::new(db.pool)),
            })
        }
    }
}
