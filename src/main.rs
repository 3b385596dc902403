use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use clap::{Parser, Subcommand};
use http::{
    HeaderName, Method,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use tokio::net::TcpListener;
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

use anyhow::{Context, anyhow};

use realtime_console::{
    ServerConfig,
    core::audio::decode_wav,
    core::credentials::{CredentialProvider, FileCredentialStore},
    core::voice_bot::VoiceBot,
    routes,
    state::AppState,
};

/// Realtime console - static console server, API proxy and voice bot
#[derive(Parser, Debug)]
#[command(name = "realtime-console")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Subcommand to run (defaults to `serve`)
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the console and proxy `/api`
    Serve,

    /// Run voice-bot turns over recorded audio files
    VoiceBot {
        /// WAV files, or raw PCM16 mono at the configured input rate; one turn each
        #[arg(required = true, value_name = "AUDIO")]
        inputs: Vec<PathBuf>,

        /// Directory the spoken replies are written to
        #[arg(short = 'o', long = "output-dir", default_value = ".")]
        output_dir: PathBuf,
    },

    /// Persist an OpenAI API key in the key file
    SetKey {
        /// The API key
        key: String,
    },

    /// Remove the stored API key
    ClearKey,
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

    // Load configuration from file or environment
    let config = if let Some(ref config_path) = cli.config {
        println!("Loading configuration from {}", config_path.display());
        ServerConfig::from_file(config_path).map_err(|e| anyhow!(e.to_string()))?
    } else {
        ServerConfig::from_env().map_err(|e| anyhow!(e.to_string()))?
    };

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::VoiceBot { inputs, output_dir } => {
            run_voice_bot(config, &inputs, &output_dir).await
        }
        Commands::SetKey { key } => {
            let store = key_file(&config)?;
            store.store(&key)?;
            println!("API key saved to {}", store.path().display());
            Ok(())
        }
        Commands::ClearKey => {
            let store = key_file(&config)?;
            store.clear()?;
            println!("API key removed from {}", store.path().display());
            Ok(())
        }
    }
}

fn key_file(config: &ServerConfig) -> anyhow::Result<FileCredentialStore> {
    let path = config
        .api_key_file
        .as_ref()
        .ok_or_else(|| anyhow!("No key file configured. Set API_KEY_FILE or providers.api_key_file"))?;
    Ok(FileCredentialStore::open(path)?)
}

/// Run one voice-bot turn per input file, keeping the conversation across them.
async fn run_voice_bot(
    config: ServerConfig,
    inputs: &[PathBuf],
    output_dir: &Path,
) -> anyhow::Result<()> {
    let credentials = config.credentials()?;
    let extension = config.voice_bot.speech_format.as_str();

    tokio::fs::create_dir_all(output_dir)
        .await
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let mut bot = VoiceBot::new(
        reqwest::Client::new(),
        config.voice_bot.clone(),
        credentials,
    );

    for (turn, input) in inputs.iter().enumerate() {
        let raw = tokio::fs::read(input)
            .await
            .with_context(|| format!("Failed to read {}", input.display()))?;

        let is_wav = input
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"));
        let pcm = if is_wav {
            let (pcm, sample_rate) = decode_wav(&raw)?;
            bot.set_input_sample_rate(sample_rate);
            pcm
        } else {
            bot.set_input_sample_rate(config.voice_bot.input_sample_rate);
            raw
        };

        bot.start_recording()?;
        let outcome = match bot.run_turn(&pcm).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(input = %input.display(), "Turn failed: {}", e);
                println!("[{}] error: {}", input.display(), e);
                continue;
            }
        };

        let output = output_dir.join(format!("reply_{}.{}", turn + 1, extension));
        tokio::fs::write(&output, &outcome.audio)
            .await
            .with_context(|| format!("Failed to write {}", output.display()))?;

        println!("You: {}", outcome.transcript);
        println!("Bot: {}", outcome.reply);
        println!("Audio: {}", output.display());
    }

    Ok(())
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let address = config.address();
    let tls_config = config.tls.clone();
    let rate_limit_rps = config.rate_limit_requests_per_second;
    let rate_limit_burst = config.rate_limit_burst_size;
    let cors_origins = config.cors_allowed_origins.clone();
    println!("Starting server on {address}");

    // Create application state
    let app_state = AppState::new(config).await;

    // Configure rate limiting (disabled when rate >= 100000 for performance testing)
    let governor_layer = if rate_limit_rps < 100000 {
        let governor_config = GovernorConfigBuilder::default()
            .per_second(rate_limit_rps as u64)
            .burst_size(rate_limit_burst)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow!("Failed to build rate limiter config"))?;
        Some(GovernorLayer::new(governor_config))
    } else {
        println!("Rate limiting disabled (rate >= 100000/s)");
        None
    };

    let allowed_headers = [
        AUTHORIZATION,
        CONTENT_TYPE,
        HeaderName::from_static("x-requested-with"),
    ];
    let allowed_methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];

    // Configure CORS
    let cors_layer = if let Some(ref origins) = cors_origins {
        if origins == "*" {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(allowed_methods)
                .allow_headers(allowed_headers)
                .allow_credentials(false)
        } else {
            // Parse comma-separated origins
            let origins: Vec<_> = origins
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(allowed_methods)
                .allow_headers(allowed_headers)
                .allow_credentials(true)
        }
    } else {
        info!(
            "CORS not configured, defaulting to same-origin only. \
             Set CORS_ALLOWED_ORIGINS to enable cross-origin access."
        );
        CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(allowed_headers)
            .allow_credentials(false)
    };

    // Security headers
    let security_headers = tower::ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            http::header::X_CONTENT_TYPE_OPTIONS,
            http::HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            http::header::X_FRAME_OPTIONS,
            http::HeaderValue::from_static("SAMEORIGIN"),
        ));

    let app: Router = routes::create_app(app_state)
        .layer(cors_layer)
        .layer(tower::util::option_layer(governor_layer))
        .layer(security_headers);

    // Parse socket address
    let socket_addr: SocketAddr = address
        .parse()
        .map_err(|e| anyhow!("Invalid server address '{}': {}", address, e))?;

    // Start server with or without TLS
    if let Some(tls) = tls_config {
        // Load TLS configuration from certificate and key files
        let rustls_config = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
            .await
            .map_err(|e| {
                anyhow!(
                    "Failed to load TLS certificates from {} and {}: {}",
                    tls.cert_path.display(),
                    tls.key_path.display(),
                    e
                )
            })?;

        println!("Server listening on https://{} (TLS enabled)", socket_addr);

        axum_server::bind_rustls(socket_addr, rustls_config)
            .serve(app.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .map_err(|e| anyhow!("TLS server error: {}", e))?;
    } else {
        println!("Server listening on http://{}", socket_addr);

        let listener = TcpListener::bind(&socket_addr).await?;
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await?;
    }

    Ok(())
}
