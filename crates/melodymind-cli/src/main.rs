// SPDX-License-Identifier: GPL-3.0-or-later
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use axum::serve;
use clap::{Parser, Subcommand};
use melodymind_api::router;
use melodymind_application::{AppState, Insights, Recommendations};
use melodymind_config::{load as load_config, AppConfig, HttpConfig};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "melodymind", version, about = "Hybrid music recommendations")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP API.
    Serve,
    /// Recommend from the trained model for a listener and seed track.
    Hybrid {
        #[arg(long)]
        user: String,
        #[arg(long)]
        track: String,
        #[arg(long)]
        count: Option<usize>,
    },
    /// Discover tracks around an artist and/or track using Last.fm.
    Discover {
        #[arg(long)]
        artist: Option<String>,
        #[arg(long)]
        track: Option<String>,
        #[arg(long)]
        count: Option<usize>,
        /// Language tags to keep, comma separated.
        #[arg(long, value_delimiter = ',')]
        languages: Vec<String>,
    },
    /// Show tags, artwork and a summary for an artist or track.
    Insights {
        #[arg(long)]
        artist: Option<String>,
        #[arg(long)]
        track: Option<String>,
    },
    /// List listeners in the model, or one listener's tracks.
    Users {
        #[arg(long)]
        tracks_for: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    init_tracing(&config.telemetry.log_level);

    match cli.command {
        Command::Serve => run_server(config).await,
        Command::Hybrid { user, track, count } => {
            let state = AppState::from_config(config)?;
            let recommender = state.hybrid()?;
            let recommendations = recommender.recommend(&user, &track, state.clamp_count(count));
            print_recommendations(&recommendations, cli.json)
        }
        Command::Discover {
            artist,
            track,
            count,
            languages,
        } => {
            let state = AppState::from_config(config)?;
            let service = state.discovery()?;
            let count = state.clamp_count(count);
            let Some(basis) = service
                .resolve_basis(artist.as_deref(), track.as_deref())
                .await
            else {
                println!("No matching artist or track found. Try entering both names.");
                return Ok(());
            };
            let recommendations = service.recommend(&basis, count, languages.as_slice()).await;
            print_recommendations(&recommendations, cli.json)
        }
        Command::Insights { artist, track } => {
            let state = AppState::from_config(config)?;
            let service = state.discovery()?;
            let basis = service
                .resolve_basis(artist.as_deref(), track.as_deref())
                .await
                .context("no matching artist or track found")?;
            let insights = service
                .get_insights(&basis)
                .await
                .with_context(|| format!("no details available for {basis}"))?;
            print_insights(&insights, cli.json)
        }
        Command::Users { tracks_for } => {
            let state = AppState::from_config(config)?;
            let recommender = state.hybrid()?;
            let names = match tracks_for {
                Some(user) => recommender.tracks_for_user(&user),
                None => recommender.known_users(),
            };
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&names)?);
            } else {
                for name in names {
                    println!("{name}");
                }
            }
            Ok(())
        }
    }
}

async fn run_server(config: AppConfig) -> Result<()> {
    let state = AppState::from_config(config.clone())?;
    state.on_start();

    let listener = TcpListener::bind(bind_addr(&config.http)?).await?;
    let addr = listener.local_addr()?;
    info!(target: "cli", "listening on {}", addr);

    serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn init_tracing(default_level: &str) {
    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_names(true)
        .with_level(true);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn bind_addr(http: &HttpConfig) -> Result<SocketAddr> {
    let addr = format!("{}:{}", http.host, http.port);
    addr.parse()
        .with_context(|| format!("invalid listen address {addr}"))
}

fn print_recommendations(recommendations: &Recommendations, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(recommendations)?);
        return Ok(());
    }

    if let Some(basis) = &recommendations.basis {
        println!("Recommendations for {basis}:");
    }
    for (position, item) in recommendations.items.iter().enumerate() {
        println!(
            "{:>2}. {} by {} [{}]",
            position + 1,
            item.track_name,
            item.artist_name,
            item.source
        );
        if let Some(art_url) = &item.art_url {
            println!("    art: {art_url}");
        }
        println!("    listen: {}", item.youtube_search_url());
    }
    if let Some(message) = &recommendations.message {
        println!("{message}");
    } else if recommendations.exhausted {
        println!(
            "Only {} of {} requested tracks were found.",
            recommendations.items.len(),
            recommendations.requested
        );
    }
    Ok(())
}

fn print_insights(insights: &Insights, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(insights)?);
        return Ok(());
    }

    match &insights.artist {
        Some(artist) => println!("{} by {}", insights.name, artist),
        None => println!("{}", insights.name),
    }
    if !insights.tags.is_empty() {
        println!("tags: {}", insights.tags.join(", "));
    }
    println!("art: {}", insights.art_url);
    println!("{}", insights.summary);
    Ok(())
}

async fn shutdown_signal() {
    let interrupt = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            warn!(target: "cli", %error, "failed to install ctrl-c handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(error) => {
                warn!(target: "cli", %error, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => {},
        _ = terminate => {},
    }

    info!(target: "cli", "shutdown signal received");
}
