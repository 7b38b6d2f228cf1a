mod call;
mod demo;
mod resources;
mod serve;

pub use demo::{HitCounter, demo_catalog, demo_engine};

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "switchboard",
    version,
    about = "A single-endpoint command dispatch server",
    long_about = "Switchboard serves one HTTP endpoint that dispatches [command, parameter] \
                  requests to named resources discovered from a directory tree. Commands, \
                  hooks and plugins are activated by marker files; replies always carry a \
                  {code, info, body} envelope."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the dispatch endpoint over HTTP (or HTTPS with a certificate)
    Serve {
        /// Resource directory to scan at startup
        #[arg(value_name = "RESOURCE_DIR", default_value = "demos")]
        root: PathBuf,
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1:8000")]
        addr: SocketAddr,
        /// PEM certificate chain; enables TLS together with --tls-key
        #[arg(long, value_name = "CERT_PEM", requires = "tls_key")]
        tls_cert: Option<PathBuf>,
        /// PEM private key for --tls-cert
        #[arg(long, value_name = "KEY_PEM", requires = "tls_cert")]
        tls_key: Option<PathBuf>,
    },
    /// Dispatch one command locally and print the reply envelope
    Call {
        /// Command name
        command: String,
        /// Parameter, parsed as JSON; a bare word is taken as a string
        parameter: Option<String>,
        /// Resource directory to scan
        #[arg(long, value_name = "RESOURCE_DIR", default_value = "demos")]
        root: PathBuf,
    },
    /// List the resources a directory tree activates
    Resources {
        /// Resource directory to scan
        #[arg(value_name = "RESOURCE_DIR", default_value = "demos")]
        root: PathBuf,
    },
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // serve logs to stderr as well; one-shot commands keep stdout clean
    // and log to file only
    let to_stderr = matches!(cli.command, Commands::Serve { .. });
    let _guard = switchboard_core::logging::init_logging("cli", to_stderr);

    let rt = tokio::runtime::Runtime::new()?;

    match cli.command {
        Commands::Serve {
            root,
            addr,
            tls_cert,
            tls_key,
        } => rt.block_on(serve::run(root, addr, tls_cert, tls_key)),
        Commands::Call {
            command,
            parameter,
            root,
        } => rt.block_on(call::run(root, command, parameter)),
        Commands::Resources { root } => resources::run(root),
    }
}
