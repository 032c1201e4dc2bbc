//! Lectern CLI and REST API entry point.
//!
//! Binary name: `lectern`

mod cli;
mod http;
mod state;

use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};

use cli::{Cli, Commands, PersonaCommand};
use lectern_observe::tracing_setup::{TracingOptions, init_tracing, shutdown_tracing};
use lectern_types::persona::PersonaProfile;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info,lectern=debug",
        _ => "trace",
    };
    init_tracing(&TracingOptions {
        default_level,
        json: cli.json,
        enable_otel: cli.otel,
    })
    .map_err(|e| anyhow::anyhow!("tracing init failed: {e}"))?;

    let state = AppState::init(cli.config.as_deref()).await?;

    let result = match cli.command {
        Commands::Serve { host, port } => serve(state, host, port).await,

        Commands::Persona { action } => match action {
            PersonaCommand::Create {
                name,
                kind,
                description,
                search,
                model,
                book,
                role,
                profession,
                interest,
                era,
                bio,
                prompt,
            } => {
                let args = cli::persona::CreateArgs {
                    name,
                    kind,
                    description,
                    search,
                    model,
                    profile: PersonaProfile {
                        book_name: book,
                        role_name: role,
                        profession,
                        interest,
                        historical_era: era,
                        bio,
                        custom_prompt: prompt,
                        ..Default::default()
                    },
                };
                cli::persona::create_persona(&state, args, cli.json).await
            }
            PersonaCommand::List { kind } => cli::persona::list_personas(&state, kind, cli.json).await,
            PersonaCommand::Show { id } => cli::persona::show_persona(&state, &id, cli.json).await,
            PersonaCommand::Delete { id } => cli::persona::delete_persona(&state, &id, cli.json).await,
        },

        Commands::Chat {
            persona_id,
            message,
            session,
        } => cli::chat::chat(&state, &persona_id, &message, session.as_deref(), cli.json).await,
    };

    shutdown_tracing();
    result
}

async fn serve(state: AppState, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| state.config.server.host.clone());
    let port = port.unwrap_or(state.config.server.port);
    let addr = format!("{host}:{port}");

    let janitor = state.janitor.clone().spawn(
        Duration::from_secs(state.config.history.purge_interval_secs.max(1)),
        state.shutdown.clone(),
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(
        %addr,
        data_dir = %state.data_dir.display(),
        "lectern API listening"
    );
    println!("Lectern API listening on http://{addr}");

    let shutdown = state.shutdown.clone();
    let router = http::router::build_router(state);
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            info!("shutdown signal received");
            shutdown.cancel();
        })
        .await?;

    let _ = janitor.await;
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for Ctrl+C");
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
                warn!(error = %e, "cannot listen for SIGTERM");
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
