use std::{error::Error, sync::Arc};

use axum::http::{
    header::{AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use tokio::{fs, net, task};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{
    layer::SubscriberExt as _, util::SubscriberInitExt as _, EnvFilter,
};

use ticket_desk::{
    config,
    db::{self, memory, Store},
    http::{self, AppState},
    Config,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = fs::read_to_string("config.toml").await?;
    let config = toml::from_str::<Config>(&config)?;

    let store: Arc<dyn Store> = match &config.db {
        config::Db::Postgres { url } => {
            let (db_client, db_connection) = db::connect(url).await?;

            task::spawn(async move {
                if let Err(e) = db_connection.await {
                    panic!("database connection failed: {e}");
                }
            });

            Arc::new(db_client)
        }
        config::Db::Memory => Arc::new(memory::Store::default()),
    };

    let origins = config
        .http
        .cors
        .allowed_origins
        .iter()
        .map(|origin| origin.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()?;
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_origin(origins);

    let app = http::router(AppState::new(store, &config))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let listener = net::TcpListener::bind(config.http.server.addr).await?;
    info!("listening on {}", config.http.server.addr);
    axum::serve(listener, app).await?;

    Ok(())
}
