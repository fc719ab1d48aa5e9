//! Command-line interface for zonefand

use std::path::PathBuf;

use clap::Parser;

use zf_core::constants::paths;

#[derive(Debug, Parser)]
#[command(name = "zonefand")]
#[command(version)]
#[command(about = "Zonefan - closed-loop fan-zone control for GPU servers")]
#[command(long_about = "Zonefan - closed-loop fan-zone control for GPU servers

Samples GPU and CPU temperatures on a fixed cadence, resolves a target
duty on the configured curve, and drives the Supermicro fan zones over
IPMI. The BMC's default fan preset is restored on exit.

ENVIRONMENT VARIABLES:
    ZONEFAN_LOG    Log filter (trace, debug, info, warn, error);
                   overrides -v when set")]
pub struct Cli {
    /// Path to the JSON configuration file
    #[arg(default_value = paths::DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Raise log verbosity (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Validate the configuration, print the resolved curve, and exit
    #[arg(long)]
    pub check: bool,
}

impl Cli {
    /// Default log filter implied by the `-v` count.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["zonefand"]);
        assert_eq!(cli.config, PathBuf::from(paths::DEFAULT_CONFIG_FILE));
        assert_eq!(cli.verbose, 0);
        assert!(!cli.check);
        assert_eq!(cli.log_level(), "info");
    }

    #[test]
    fn test_explicit_config_path() {
        let cli = Cli::parse_from(["zonefand", "/tmp/fans.json"]);
        assert_eq!(cli.config, PathBuf::from("/tmp/fans.json"));
    }

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(Cli::parse_from(["zonefand", "-v"]).log_level(), "debug");
        assert_eq!(Cli::parse_from(["zonefand", "-vv"]).log_level(), "trace");
        assert_eq!(Cli::parse_from(["zonefand", "-vvv"]).log_level(), "trace");
    }

    #[test]
    fn test_check_flag() {
        assert!(Cli::parse_from(["zonefand", "--check"]).check);
    }
}
