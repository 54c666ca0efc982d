use clap::{Parser, Subcommand, ValueHint};
use std::path::PathBuf;

#[derive(Parser)]
#[command(about, version, name = "ssp")]
/// Semantic service proxy: serves the state of things as cached RDF graphs
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the gateway HTTP server
    Serve {
        /// Host and port to listen to
        #[arg(short, long, default_value = "localhost:7878", value_hint = ValueHint::Hostname)]
        bind: String,
        /// Allows cross-origin requests
        #[arg(long)]
        cors: bool,
        /// Seconds a graph stays cached after it has expired
        #[arg(long, default_value_t = 10)]
        grace_period_secs: u64,
        /// Seconds a data origin may take to answer before it is unregistered
        #[arg(long, default_value_t = 5)]
        accessor_timeout_secs: u64,
        /// Serve the RDF files of this directory as data origins
        #[arg(long, value_hint = ValueHint::DirPath)]
        files_directory: Option<PathBuf>,
        /// Prefix of the graph names of the served files
        #[arg(long, requires = "files_directory", value_hint = ValueHint::Url)]
        files_graph_prefix: Option<String>,
        /// Seconds between two evaluations of a virtual sensor
        #[arg(long, default_value_t = 60)]
        virtual_sensor_period_secs: u64,
        /// Do not cache anything, every read is forwarded to the data origins
        ///
        /// SPARQL queries and resource lookups return empty results in this mode.
        #[arg(long)]
        dummy_cache: bool,
    },
}
