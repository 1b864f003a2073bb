//! CLI command definitions for the `sitepilot` binary.

pub mod chat;
pub mod key;
pub mod log;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

use sitepilot_types::conversation::ConversationId;
use sitepilot_types::site::SiteId;

/// Build and run a website by talking to it.
#[derive(Parser)]
#[command(name = "sitepilot", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export spans to stdout through OpenTelemetry.
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP turn endpoint.
    Serve {
        /// Port to listen on.
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Talk to the co-pilot in the terminal.
    Chat {
        /// Resume an existing conversation.
        #[arg(long)]
        conversation: Option<ConversationId>,

        /// Work on an existing site.
        #[arg(long)]
        site: Option<SiteId>,

        /// Verified user id; required to publish or roll back.
        #[arg(long, env = "SITEPILOT_USER")]
        user: Option<String>,

        /// Show content drafts field by field as they are written.
        #[arg(long)]
        stream: bool,
    },

    /// Show a site's snapshots and recent mutations.
    Log {
        /// Site to inspect.
        #[arg(long, conflicts_with = "conversation", required_unless_present = "conversation")]
        site: Option<SiteId>,

        /// Inspect the site created in this conversation.
        #[arg(long)]
        conversation: Option<ConversationId>,

        /// Number of mutations to show.
        #[arg(short = 'n', long, default_value = "20")]
        limit: u32,
    },

    /// Create an API key for the HTTP endpoint.
    Key {
        /// Label for the key.
        name: String,

        /// User the key authenticates as.
        #[arg(long)]
        user: String,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_log_requires_a_target() {
        assert!(Cli::try_parse_from(["sitepilot", "log"]).is_err());
        let site = SiteId::new();
        let cli = Cli::try_parse_from(["sitepilot", "log", "--site", &site.to_string()]).unwrap();
        match cli.command {
            Commands::Log { site: Some(parsed), limit, .. } => {
                assert_eq!(parsed, site);
                assert_eq!(limit, 20);
            }
            _ => panic!("expected log command"),
        }
    }

    #[test]
    fn test_verbosity_counts() {
        let cli = Cli::try_parse_from(["sitepilot", "-vv", "completions", "bash"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }
}
