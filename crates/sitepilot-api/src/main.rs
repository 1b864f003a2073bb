//! SitePilot CLI and HTTP entry point.
//!
//! Binary name: `sitepilot`
//!
//! Parses CLI arguments, sets up tracing, opens storage, then dispatches to
//! the command handler or starts the HTTP server.

mod cli;
mod http;
mod state;

use anyhow::Context;
use clap::Parser;
use clap_complete::generate;

use sitepilot_observe::tracing_setup::{TracingOptions, init_tracing, shutdown_tracing};

use cli::chat::loop_runner::{ChatOptions, run_chat_loop};
use cli::{Cli, Commands};
use state::{AppState, Storage};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions need neither tracing nor storage
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "sitepilot", &mut std::io::stdout());
        return Ok(());
    }

    let options = TracingOptions {
        default_filter: TracingOptions::filter_for_verbosity(cli.quiet, cli.verbose).to_string(),
        json: cli.json,
        otel: cli.otel,
    };
    init_tracing(&options).map_err(|e| anyhow::anyhow!("initializing tracing: {e}"))?;

    let result = run(cli).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Serve { port, host } => {
            let state = AppState::init().await?;
            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("binding {addr}"))?;

            tracing::info!(%addr, data_dir = %state.storage.data_dir.display(), "SitePilot listening");
            if !cli.quiet {
                println!(
                    "  {} SitePilot listening on {}",
                    console::style("⚡").bold(),
                    console::style(format!("http://{addr}")).cyan()
                );
                println!("  {}", console::style("Press Ctrl+C to stop").dim());
            }

            let router = http::router::build_router(state);
            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            if !cli.quiet {
                println!("\n  Server stopped.");
            }
        }

        Commands::Chat {
            conversation,
            site,
            user,
            stream,
        } => {
            let state = AppState::init().await?;
            run_chat_loop(
                &state,
                ChatOptions {
                    conversation_id: conversation,
                    site_id: site,
                    user_id: user,
                    stream,
                },
            )
            .await?;
        }

        Commands::Log {
            site,
            conversation,
            limit,
        } => {
            let storage = Storage::open().await?;
            cli::log::show_log(&storage, site, conversation, limit, cli.json).await?;
        }

        Commands::Key { name, user } => {
            let storage = Storage::open().await?;
            cli::key::create_key(&storage, &name, &user, cli.json).await?;
        }

        Commands::Completions { .. } => {}
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
