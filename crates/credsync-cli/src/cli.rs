//! Command-line interface definitions

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Sync provider credentials into rendered secrets
#[derive(Parser, Debug)]
#[command(name = "credsync", version, about, long_about = None)]
pub struct Cli {
    /// Config file (defaults to ~/.config/credsync/config.yaml)
    #[arg(long, global = true, env = "CREDSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Serve credentials from a YAML fixture instead of the provider API
    #[arg(long, global = true)]
    pub fixture: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve and render the spec objects in a file, printing the secrets as JSON
    Render {
        /// YAML file holding one or more spec documents
        spec_file: PathBuf,
    },

    /// Reconcile every spec object in a directory once
    Sync {
        /// Directory of YAML spec documents
        spec_dir: PathBuf,

        /// Directory the rendered secrets are written to
        #[arg(long)]
        out: PathBuf,
    },

    /// Keep reconciling a spec directory until interrupted
    Watch {
        /// Directory of YAML spec documents
        spec_dir: PathBuf,

        /// Directory the rendered secrets are written to
        #[arg(long)]
        out: PathBuf,
    },
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
    fn test_parse_sync_with_global_flags() {
        let cli = Cli::try_parse_from([
            "credsync", "sync", "specs", "--out", "secrets", "--fixture", "fixture.yaml",
        ])
        .unwrap();

        assert_eq!(cli.fixture, Some(PathBuf::from("fixture.yaml")));
        match cli.command {
            Command::Sync { spec_dir, out } => {
                assert_eq!(spec_dir, PathBuf::from("specs"));
                assert_eq!(out, PathBuf::from("secrets"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_watch_requires_out() {
        assert!(Cli::try_parse_from(["credsync", "watch", "specs"]).is_err());
    }
}
