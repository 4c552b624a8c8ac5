use clap::{Parser, Subcommand};

use crate::connectors::ConnectorKind;

/// Mobile Flows connectors for third-party SaaS backends
#[derive(Parser)]
#[command(name = "connectors", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start a connector server
    Serve {
        /// Which backend to serve
        #[arg(short, long, env = "CONNECTOR")]
        connector: ConnectorKind,
        /// Port to bind (defaults to CONNECTOR_PORT / PORT, then 3000)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print the discovery document a connector would advertise
    Discovery {
        #[arg(short, long)]
        connector: ConnectorKind,
        /// Public base URL of the connector
        #[arg(long, default_value = "http://localhost:3000")]
        base_url: String,
    },

    /// List the available connectors
    List,
}
