mod api;
mod config;
mod greeting;
mod sessions;
mod setup;
mod together;
mod twilio;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use config::Config;
use sessions::SessionStore;
use together::chat::TogetherClient;
use twilio::outbound::TwilioClient;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Shared application state accessible from all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub twilio: Arc<TwilioClient>,
    pub together: Arc<TogetherClient>,
    /// Conversation transcripts for active calls, keyed by CallSid.
    pub sessions: SessionStore,
    /// System prompt loaded once at startup; read-only for the process lifetime.
    pub system_prompt: Arc<String>,
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        Some("--setup") => setup::run(),
        Some("--version") => println!("voice-relay {VERSION}"),
        Some("--help") | Some("-h") => print_usage(),
        Some(other) => {
            eprintln!("Unknown option: {other}");
            print_usage();
            std::process::exit(1);
        }
        None => {
            let rt = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");
            rt.block_on(server());
        }
    }
}

fn print_usage() {
    println!("voice-relay {VERSION}");
    println!("Turn-based AI calling agent bridging Twilio voice to Together AI");
    println!();
    println!("Usage: voice-relay [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --setup     Run interactive configuration wizard");
    println!("  --version   Print version");
    println!("  --help, -h  Print this help message");
    println!();
    println!("Without options, starts the webhook server.");
}

async fn server() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voice_relay=info,tower_http=info".into()),
        )
        .init();

    // Load config
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        "Starting voice-relay"
    );

    // Load the system prompt
    let system_prompt = match config.load_system_prompt() {
        Ok(p) => {
            tracing::info!(
                path = %config.agent.prompt_file,
                chars = p.len(),
                "Loaded system prompt"
            );
            p
        }
        Err(e) => {
            eprintln!("Failed to load system prompt: {e}");
            std::process::exit(1);
        }
    };

    // Build shared state
    let state = AppState {
        twilio: Arc::new(TwilioClient::new(
            &config.twilio,
            &config.server.external_url,
        )),
        together: Arc::new(TogetherClient::new(&config.together)),
        sessions: SessionStore::new(config.agent.session_timeout_secs),
        system_prompt: Arc::new(system_prompt),
        config: config.clone(),
    };

    // Build router
    let app = Router::new()
        // Health check
        .route("/", get(health))
        // Outbound call API
        .route("/make-call", post(api::outbound::handle_make_call))
        // Twilio webhooks
        .route(
            "/voice-handler",
            get(twilio::webhook::handle_voice).post(twilio::webhook::handle_voice),
        )
        .route(
            "/recording-status",
            post(twilio::webhook::handle_recording_status),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .expect("Invalid server address");

    tracing::info!(%addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind");

    axum::serve(listener, app).await.expect("Server error");
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    message: &'static str,
    active_calls: usize,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        message: "AI calling agent is running!",
        active_calls: state.sessions.active().await,
    })
}
