use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

use clap::{Parser, Subcommand};
use http::{
    Method,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use livekit_api::services::room::{CreateRoomOptions, RoomClient};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use anyhow::anyhow;

use jarvis_gateway::{ServerConfig, routes, state::AppState};

/// Jarvis Gateway - Conversational assistant relay server
#[derive(Parser, Debug)]
#[command(name = "jarvis-gateway")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Provision a LiveKit media room
    CreateRoom {
        /// Room name
        #[arg(default_value = "assistant-room")]
        name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Initialize crypto provider for TLS connections
    // This must be done before any TLS connections are attempted
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install default crypto provider"))?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration from environment
    let config = ServerConfig::from_env().map_err(|e| anyhow!(e.to_string()))?;

    // Handle subcommands
    if let Some(Commands::CreateRoom { name }) = cli.command {
        return create_room(&config, &name).await;
    }

    let address = config.address();
    let cors_origins = config.cors_allowed_origins.clone();
    println!("Starting server on {address}");

    // Create application state
    let app_state = Arc::new(AppState::new(config));

    // Configure CORS
    let cors_layer = if let Some(ref origins) = cors_origins {
        if origins == "*" {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([AUTHORIZATION, CONTENT_TYPE])
                .allow_credentials(false)
        } else {
            // Parse comma-separated origins
            let origins: Vec<_> = origins
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([AUTHORIZATION, CONTENT_TYPE])
                .allow_credentials(true)
        }
    } else {
        // No CORS configured: same-origin only.
        info!(
            "CORS not configured, defaulting to same-origin only. \
             Set CORS_ALLOWED_ORIGINS to enable cross-origin access."
        );
        CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([AUTHORIZATION, CONTENT_TYPE])
            .allow_credentials(false)
    };

    // Combine REST and WebSocket routes
    let app = routes::create_api_router()
        .merge(routes::create_chat_router())
        .with_state(app_state)
        .layer(cors_layer);

    // Parse socket address
    let socket_addr: SocketAddr = address
        .parse()
        .map_err(|e| anyhow!("Invalid server address '{}': {}", address, e))?;

    println!("Server listening on http://{}", socket_addr);

    let listener = TcpListener::bind(&socket_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Provision a media room on the configured LiveKit deployment.
async fn create_room(config: &ServerConfig, name: &str) -> anyhow::Result<()> {
    let (Some(url), Some(api_key), Some(api_secret)) = (
        config.livekit_url.as_ref(),
        config.livekit_api_key.as_ref(),
        config.livekit_api_secret.as_ref(),
    ) else {
        anyhow::bail!("Missing LIVEKIT_URL / LIVEKIT_API_KEY / LIVEKIT_API_SECRET in environment");
    };

    let client = RoomClient::with_api_key(url, api_key, api_secret);
    let room = client
        .create_room(name, CreateRoomOptions::default())
        .await
        .map_err(|e| anyhow!("Failed to create room: {}", e))?;

    println!("Room created: {} (sid {})", room.name, room.sid);
    Ok(())
}
