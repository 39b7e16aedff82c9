//! Command line entry points

pub mod serve;

use clap::{Parser, Subcommand};

/// Speech Gateway - one HTTP and WebSocket front for several text-to-speech engines
#[derive(Parser)]
#[command(name = "speech-gateway")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the gateway server
    Serve(serve::ServeArgs),
}
