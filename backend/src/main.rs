use std::{error::Error, net::SocketAddr, sync::Arc};

use clap::Parser;
use runfinder::{AppState, config::Settings, create_router};
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(author, version, about = "Running route discovery HTTP service")]
struct Cli {
    /// Address the HTTP server listens on
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8080")]
    bind: SocketAddr,

    #[command(flatten)]
    settings: Settings,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "runfinder=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let discovery = Arc::new(cli.settings.discovery()?);
    tracing::info!(
        "catalog holds {} route(s) from {}",
        discovery.catalog().len(),
        cli.settings.routes_file.display()
    );
    let conversation = cli.settings.conversation(discovery.clone());
    tracing::info!("offering cities: {}", conversation.cities().join(", "));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let app = create_router(AppState::new(conversation, discovery)).layer(cors);

    tracing::info!("starting runfinder on http://{}", cli.bind);
    let listener = tokio::net::TcpListener::bind(cli.bind).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
