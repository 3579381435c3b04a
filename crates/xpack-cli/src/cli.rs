use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "xpack",
    version,
    about = "Pack a directory tree into a ZIP archive",
    after_help = "\
Configuration file lookup order:
  1. --config <path>             (explicit flag)
  2. $XPACK_CONFIG               (environment variable)
  3. ./xpack.yaml                (project)
  4. Platform user config dir + /xpack/config.yaml (e.g. ~/.config)
  5. Platform system config path (Unix: /etc/xpack/config.yaml)

Without a config file xpack runs on built-in defaults.

Environment variables:
  XPACK_CONFIG      Path to configuration file (overrides default search)
  NO_COLOR          Disable colored console output"
)]
pub(crate) struct Cli {
    /// Path to configuration file (overrides XPACK_CONFIG and default search)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Archive a directory into a ZIP file (default command)
    Pack(PackArgs),

    /// Generate a minimal configuration file
    Config {
        /// Destination path (default: ./xpack.yaml)
        #[arg(short, long, conflicts_with = "user")]
        dest: Option<String>,

        /// Write to the per-user config location instead of the working directory
        #[arg(long)]
        user: bool,
    },
}

/// Overrides for a single pack run. Anything left unset falls back to the
/// config file, then to built-in defaults.
#[derive(Args, Default)]
pub(crate) struct PackArgs {
    /// Directory to archive
    pub source: Option<String>,

    /// Output ZIP path
    pub dest: Option<String>,

    /// Compression method (deflate, stored)
    #[arg(long)]
    pub compression: Option<String>,

    /// Keep going after a file fails and report all failures at the end
    #[arg(long)]
    pub continue_on_error: bool,

    /// Archive the targets of symbolic links instead of skipping them
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Pause before each entry (e.g. 150ms, 1s)
    #[arg(long)]
    pub delay: Option<String>,

    /// Render the run's log to a PNG at this path
    #[arg(long)]
    pub log_image: Option<String>,

    /// Wait until removable media is mounted (default mount path: /media)
    #[arg(long, num_args = 0..=1, default_missing_value = "")]
    pub wait_for_media: Option<String>,

    /// Ask for confirmation before starting
    #[arg(long)]
    pub confirm: bool,

    /// Answer the confirmation prompt with yes
    #[arg(short, long)]
    pub yes: bool,
}
