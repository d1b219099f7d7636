use crate::server::ServerState;
use serde::Deserialize;
use socialsphere_client::{feed::FeedClient, provider::MemoryIdentityProvider, session::SessionGateway};
use socialsphere_common::{model::SocialsphereSnowflakeGenerator, snowflake::NodeId};
use socialsphere_store::memory::MemoryStore;
use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod server;

#[derive(Debug, Error)]
enum InitError {
    #[error("Error parsing .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("Error parsing environment: {0}")]
    Envy(#[from] envy::Error),
    #[error("Error binding tcp listener: {0}")]
    TcpBind(std::io::Error),
    #[error("Error serving server: {0}")]
    TcpServe(std::io::Error),
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct Env {
    server_address: IpAddr,
    server_port: u16,
    #[serde(default)]
    store_node_id: u16,
}

fn install_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "socialsphere_api=debug,\
                socialsphere_client=debug,\
                socialsphere_store=debug,\
                tower_http=debug,axum::rejection=trace"
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

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "Failed to listen for ctrl-c, shutting down");
    }
    debug!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<(), InitError> {
    install_tracing();
    let env = get_env()?;

    let node_id = NodeId::new(env.store_node_id).unwrap_or_else(|| {
        tracing::warn!(configured = env.store_node_id, "Node id out of range, using 0");
        NodeId::new_unchecked(0)
    });
    let store = Arc::new(MemoryStore::new(node_id));
    let state = ServerState {
        gateway: Arc::new(SessionGateway::new(
            Arc::new(MemoryIdentityProvider::default()),
            store.clone(),
        )),
        feed: Arc::new(FeedClient::new(
            store,
            SocialsphereSnowflakeGenerator::new(node_id),
        )),
    };

    let tracing_layer = TraceLayer::new_for_http();
    let app = server::routes().layer(tracing_layer).with_state(state);

    let server_address = SocketAddr::new(env.server_address, env.server_port);
    let listener = tokio::net::TcpListener::bind(server_address)
        .await
        .map_err(InitError::TcpBind)?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(InitError::TcpServe)?;

    Ok(())
}
