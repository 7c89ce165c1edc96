use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Command-line client for the aria2 download daemon.
///
/// With no command, lists every download the daemon knows about.
#[derive(Parser, Debug)]
#[command(name = "ariactl", author, version, about, long_about = None)]
pub struct Cli {
    /// Daemon host, with or without scheme.
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Daemon RPC port.
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    /// RPC secret token.
    #[arg(short, long, global = true)]
    pub secret: Option<String>,

    /// Configuration file to read instead of the default location.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log debug messages to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Pause downloads.
    #[command(visible_alias = "stop")]
    Pause {
        #[command(flatten)]
        target: Target,
        /// Pause without contacting BitTorrent trackers first.
        #[arg(short, long)]
        force: bool,
    },

    /// Resume paused downloads.
    #[command(visible_alias = "start")]
    Resume {
        #[command(flatten)]
        target: Target,
    },

    /// Remove downloads.
    #[command(visible_aliases = ["rm", "del", "delete"])]
    Remove {
        #[command(flatten)]
        target: Target,
        /// Remove without contacting BitTorrent trackers first.
        #[arg(short, long)]
        force: bool,
    },

    /// Listen to notifications and run hook commands for each event.
    Listen {
        /// TOML file mapping handler names to commands.
        #[arg(short, long = "callbacks-module", value_name = "FILE")]
        callbacks_module: PathBuf,
        /// Event types to react to (start, pause, stop, complete, btcomplete,
        /// error). All when omitted.
        #[arg(value_name = "EVENT_TYPES")]
        event_types: Vec<String>,
    },

    /// Show the download list.
    Show,

    /// Call a remote method directly.
    Call {
        /// Method name, with or without the `aria2.`/`system.` prefix.
        method: String,
        /// Parameters passed as strings.
        #[arg(short = 'P', long, num_args = 1.., conflicts_with = "json_params")]
        params: Vec<String>,
        /// Parameters as a JSON array.
        #[arg(short = 'J', long = "json-params", value_name = "JSON")]
        json_params: Option<String>,
    },

    /// Remove every finished download result.
    #[command(visible_aliases = ["autopurge", "autoclear"])]
    Purge,

    /// Add downloads from URIs.
    Add {
        #[arg(required = true)]
        uris: Vec<String>,
    },

    /// Add downloads from magnet links.
    AddMagnets {
        #[arg(required = true)]
        uris: Vec<String>,
    },

    /// Add downloads from torrent files.
    AddTorrents {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Add downloads from metalink files.
    AddMetalinks {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

/// Downloads a batch command acts on.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct Target {
    /// GIDs of the downloads.
    pub gids: Vec<String>,
    /// Act on every download.
    #[arg(short, long)]
    pub all: bool,
}
