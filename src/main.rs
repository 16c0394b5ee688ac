use axum::Router;
use clap::Parser;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use std::sync::Arc;
use std::time::Duration;

use cardgate::activation::Coordinator;
use cardgate::config::Config;
use cardgate::crypto::{EnvelopeKey, SigningKeys};
use cardgate::db::{AppState, create_pool, init_db, init_ledger_db, queries};
use cardgate::handlers;
use cardgate::models::{CardStatus, CreateCard, TimeType};
use cardgate::replay::ReplayGuard;

#[derive(Parser, Debug)]
#[command(name = "cardgate")]
#[command(about = "Activation server for license cards")]
struct Cli {
    /// Print fresh envelope and signing keys, then exit
    #[arg(long)]
    generate_keys: bool,

    /// Insert demo cards (dev mode only)
    #[arg(long)]
    seed: bool,
}

fn print_generated_keys() {
    let envelope = EnvelopeKey::generate();
    let (secret, public) = SigningKeys::generate_keypair();

    println!("# Shared with client builds");
    println!("CARDGATE_ENVELOPE_KEY={}", envelope);
    println!("# Server only");
    println!("CARDGATE_SIGNING_KEY={}", secret);
    println!("# Embed in clients to verify responses");
    println!("# public key: {}", public);
}

/// Seeds the card store with one Unused card per duration category.
/// Skipped when the store already holds unused cards.
fn seed_dev_cards(state: &AppState) {
    let conn = state.db.get().expect("Failed to get db connection for seeding");

    let existing = queries::count_cards_by_status(&conn, CardStatus::Unused)
        .expect("Failed to count cards");
    if existing > 0 {
        tracing::info!("Card store already has unused cards, skipping seed");
        return;
    }

    let demo = [
        (TimeType::Hourly, 0, 60),
        (TimeType::Daily, 1, 0),
        (TimeType::Weekly, 7, 0),
        (TimeType::Monthly, 30, 0),
        (TimeType::Yearly, 365, 0),
    ];

    tracing::info!("============================================");
    tracing::info!("SEEDING DEV CARDS");
    tracing::info!("============================================");

    println!();
    println!("--- COPY FROM HERE ---");
    for (time_type, days, minutes) in demo {
        let card = queries::create_card(
            &conn,
            &CreateCard {
                value: None,
                app_id: "dev-app".to_string(),
                user_id: "dev-user".to_string(),
                user_name: "Dev User".to_string(),
                days,
                minutes,
                time_type,
                remark: "seeded".to_string(),
            },
        )
        .expect("Failed to create dev card");
        println!("  {}: {}", time_type.as_ref(), card.value);
    }
    println!("--- END COPY ---");
    println!();
}

/// Spawns a background task that drops expired cache entries every 5 minutes.
fn spawn_cache_sweep_task(coordinator: Arc<Coordinator>) {
    tokio::spawn(async move {
        let interval = Duration::from_secs(5 * 60);
        loop {
            tokio::time::sleep(interval).await;
            let swept = coordinator.sweep_caches();
            if swept > 0 {
                tracing::debug!("Swept {} expired cache entries", swept);
            }
        }
    });

    tracing::info!("Background cache sweep started (runs every 5 minutes)");
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.generate_keys {
        print_generated_keys();
        return;
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cardgate=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });

    if config.dev_mode {
        tracing::info!("Running in DEVELOPMENT mode");
    }

    let db_pool = create_pool(&config.database_path).expect("Failed to create database pool");
    let ledger_pool = create_pool(&config.ledger_database_path)
        .expect("Failed to create ledger database pool");

    {
        let conn = db_pool.get().expect("Failed to get connection");
        init_db(&conn).expect("Failed to initialize database");
    }
    {
        let conn = ledger_pool.get().expect("Failed to get ledger connection");
        init_ledger_db(&conn).expect("Failed to initialize ledger database");
    }

    let coordinator = Arc::new(Coordinator::new(config.cache_ttl, config.throttle));

    let state = AppState {
        db: db_pool,
        ledger: ledger_pool,
        envelope: config.envelope_key.clone(),
        signing: config.signing_keys.clone(),
        replay: ReplayGuard::new(config.replay_window_secs),
        coordinator: coordinator.clone(),
    };

    tracing::info!(
        public_key = %state.signing.public_key_base64(),
        "Responses are signed with this key"
    );

    if cli.seed {
        if !config.dev_mode {
            tracing::warn!("--seed flag ignored: not in dev mode (set CARDGATE_ENV=dev)");
        } else {
            seed_dev_cards(&state);
        }
    }

    spawn_cache_sweep_task(coordinator);

    let mut app = Router::new().merge(handlers::public::router(config.rate_limit));

    if config.dev_mode {
        app = app.merge(handlers::dev::router());
        tracing::info!("DEV endpoints enabled: POST /dev/cards, POST /dev/cards/{{value}}/admin");
    }

    let app = app
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("cardgate listening on {}", addr);

    // Connect info feeds the per-IP rate limiter
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Failed to start server");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
