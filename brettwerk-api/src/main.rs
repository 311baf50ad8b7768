use crate::server::ServerState;
use brettwerk_common::model::auth::TokenSecret;
use brettwerk_db::{BoardStore, mongo::MongoStore};
use mongodb::Client;
use serde::Deserialize;
use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod schema;
mod server;

#[derive(Debug, Error)]
enum InitError {
    #[error("Error parsing .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("Error parsing environment: {0}")]
    Envy(#[from] envy::Error),
    #[error("Error setting up the mongodb client: {0}")]
    Mongo(#[from] mongodb::error::Error),
    #[error("Error binding tcp listener: {0}")]
    TcpBind(std::io::Error),
    #[error("Error serving server: {0}")]
    TcpServe(std::io::Error),
}

const DEV_TOKEN_SECRET: &str = "SECRET";

fn default_token_secret() -> String {
    DEV_TOKEN_SECRET.to_owned()
}

fn default_mongo_database() -> String {
    "brettwerk".to_owned()
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct Env {
    server_address: IpAddr,
    server_port: u16,
    mongo_uri: String,
    #[serde(default = "default_mongo_database")]
    mongo_database: String,
    #[serde(default = "default_token_secret")]
    token_secret: String,
}

fn install_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "brettwerk_api=debug,brettwerk_common=debug,brettwerk_db=debug,\
                tower_http=debug,axum::rejection=trace,mongodb=info"
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

    if env.token_secret == DEV_TOKEN_SECRET {
        warn!("TOKEN_SECRET is not set, tokens are signed with the built-in development secret");
    }

    let mongo_client = Client::with_uri_str(&env.mongo_uri).await?;
    let store = MongoStore::new(mongo_client.database(&env.mongo_database));

    // A database that is down at startup is reported but not fatal;
    // requests fail individually until it comes back.
    match store.ping().await {
        Ok(()) => info!(database = %env.mongo_database, "Connected to mongodb"),
        Err(error) => error!(%error, "Could not reach mongodb"),
    }
    if let Err(error) = store.ensure_indexes().await {
        error!(%error, "Could not create mongodb indexes");
    }

    let store: Arc<dyn BoardStore> = Arc::new(store);
    let state = ServerState::new(store, TokenSecret::from(env.token_secret));

    let tracing_layer = TraceLayer::new_for_http();
    let app = server::routes().layer(tracing_layer).with_state(state);

    let server_address = SocketAddr::new(env.server_address, env.server_port);
    let listener = tokio::net::TcpListener::bind(server_address)
        .await
        .map_err(InitError::TcpBind)?;
    info!(%server_address, "Serving");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(InitError::TcpServe)?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        error!(%error, "Could not listen for the shutdown signal");
    }
}
