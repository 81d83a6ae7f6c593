use crate::server::ServerState;
use serde::Deserialize;
use sqlx::postgres::PgPoolOptions;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vidhyaloan_common::{
    composer::GateConfig,
    moderation::ModerationPolicy,
    snowflake::{NodeId, PartOutOfRangeError},
};
use vidhyaloan_db::client::DbClient;

mod server;

#[derive(Debug, Error)]
enum InitError {
    #[error("Error parsing .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("Error parsing environment: {0}")]
    Envy(#[from] envy::Error),
    #[error("Invalid node id: {0}")]
    NodeId(PartOutOfRangeError),
    #[error("Error connecting to the database: {0}")]
    Database(sqlx::Error),
    #[error("Error running migrations: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("Error binding tcp listener: {0}")]
    TcpBind(std::io::Error),
    #[error("Error serving server: {0}")]
    TcpServe(std::io::Error),
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct Env {
    server_address: IpAddr,
    server_port: u16,
    database_url: String,
    node_id: u16,
    duplicate_threshold: Option<usize>,
    similar_limit: Option<usize>,
}

fn install_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "vidhyaloan_api=debug,vidhyaloan_db=debug,vidhyaloan_common=debug,\
                tower_http=debug,axum::rejection=trace,sqlx=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn get_env() -> Result<Env, InitError> {
    if let Err(e) = dotenvy::dotenv() {
        if e.not_found() {
            debug!("No .dotenv file found");
        } else {
            return Err(e.into());
        }
    }

    envy::from_env().map_err(InitError::from)
}

#[tokio::main]
async fn main() -> Result<(), InitError> {
    install_tracing();
    let env = get_env()?;

    let node_id = NodeId::try_from(env.node_id).map_err(InitError::NodeId)?;

    let pool = PgPoolOptions::new()
        .connect(&env.database_url)
        .await
        .map_err(InitError::Database)?;
    vidhyaloan_db::MIGRATOR.run(&pool).await?;

    let mut gate = GateConfig::default();
    if let Some(duplicate_threshold) = env.duplicate_threshold {
        gate.duplicate_threshold = duplicate_threshold;
    }
    if let Some(similar_limit) = env.similar_limit {
        gate.similar_limit = similar_limit;
    }

    let state = ServerState {
        db_client: Arc::new(DbClient::new(pool, node_id)),
        gate,
        policy: Arc::new(ModerationPolicy::default()),
    };

    let tracing_layer = TraceLayer::new_for_http();
    let app = server::routes().with_state(state).layer(tracing_layer);

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if let Err(error) = tokio::signal::ctrl_c().await {
                error!(%error, "Listening for ctrl-c failed");
                return;
            }
            info!("Shutting down");
            shutdown.cancel();
        }
    });

    let server_address = SocketAddr::new(env.server_address, env.server_port);
    let listener = tokio::net::TcpListener::bind(server_address)
        .await
        .map_err(InitError::TcpBind)?;
    info!(%server_address, "Listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(InitError::TcpServe)?;

    Ok(())
}
