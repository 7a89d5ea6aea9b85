use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "objstore")]
#[command(about = "Single-node object store", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true, env = "OBJSTORE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the blob storage directory
    #[arg(long, global = true)]
    pub storage_dir: Option<PathBuf>,

    /// Override the index database path
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(long)]
        port: Option<u16>,
    },

    /// Store a new object and print its id
    Put {
        /// Object path
        path: String,

        /// File to read, or "-" for stdin
        file: PathBuf,
    },

    /// Write an object's bytes to stdout or a file
    Get {
        #[command(flatten)]
        target: Target,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace an object's bytes
    Update {
        #[command(flatten)]
        target: Target,

        /// File to read, or "-" for stdin
        file: PathBuf,
    },

    /// Delete an object
    Delete {
        #[command(flatten)]
        target: Target,
    },

    /// Print an object's index record as JSON
    Stat {
        #[command(flatten)]
        target: Target,
    },

    /// List all objects
    List,

    /// Repair the store after an interrupted run
    Recover,
}

/// An object token and the namespace it belongs to.
#[derive(Args)]
pub struct Target {
    /// Object id or path
    pub token: String,

    /// Treat the token as an object id
    #[arg(long = "id", conflicts_with = "by_path")]
    pub by_id: bool,

    /// Treat the token as an object path
    #[arg(long = "path")]
    pub by_path: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_target_flags_conflict() {
        let parsed = Cli::try_parse_from(["objstore", "get", "abc", "--id", "--path"]);
        assert!(parsed.is_err());

        let parsed = Cli::try_parse_from(["objstore", "get", "docs/a.txt", "--path"]).unwrap();
        match parsed.command {
            Commands::Get { target, output } => {
                assert_eq!(target.token, "docs/a.txt");
                assert!(target.by_path);
                assert!(!target.by_id);
                assert!(output.is_none());
            }
            _ => panic!("expected get"),
        }
    }
}
