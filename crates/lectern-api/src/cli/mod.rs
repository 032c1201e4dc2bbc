//! CLI command definitions for the `lectern` binary.

pub mod chat;
pub mod persona;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Talk to book characters, readers, and historical figures.
#[derive(Parser)]
#[command(name = "lectern", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file (default: {data_dir}/config.toml).
    #[arg(long, global = true, env = "LECTERN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// More log output (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export spans to stdout via OpenTelemetry.
    #[arg(long, global = true, hide = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the REST API server.
    Serve {
        /// Host to bind to (default from config).
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (default from config).
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Manage personas.
    Persona {
        #[command(subcommand)]
        action: PersonaCommand,
    },

    /// Send one message to a persona and stream the reply.
    Chat {
        /// Persona ID.
        persona_id: String,

        /// The message to send.
        message: String,

        /// History window to use instead of the persona's shared one.
        #[arg(long)]
        session: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum PersonaCommand {
    /// Create a persona.
    Create {
        #[arg(long)]
        name: String,

        /// character, reader, or historical.
        #[arg(long, default_value = "character")]
        kind: String,

        #[arg(long, default_value = "")]
        description: String,

        /// Let the persona search the web.
        #[arg(long)]
        search: bool,

        /// Model override for this persona.
        #[arg(long)]
        model: Option<String>,

        #[arg(long)]
        book: Option<String>,

        #[arg(long)]
        role: Option<String>,

        #[arg(long)]
        profession: Option<String>,

        #[arg(long)]
        interest: Option<String>,

        #[arg(long)]
        era: Option<String>,

        #[arg(long)]
        bio: Option<String>,

        /// Extra instructions appended to the system prompt.
        #[arg(long)]
        prompt: Option<String>,
    },

    /// List personas.
    #[command(alias = "ls")]
    List {
        /// Filter by kind.
        #[arg(long)]
        kind: Option<String>,
    },

    /// Show one persona.
    Show { id: String },

    /// Delete a persona.
    #[command(alias = "rm")]
    Delete { id: String },
}
