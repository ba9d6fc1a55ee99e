//! Verity command-line tool
//!
//! Computes fingerprints and digests the same way the issuance path does, and
//! runs an end-to-end demo against the in-memory effect system.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use verity_core::VerityConfig;

mod commands;

use commands::{
    demo,
    inspect::{self, DigestArgs, FingerprintArgs, NormalizeArgs},
};

#[derive(Parser)]
#[command(name = "verity")]
#[command(about = "Verity - letter issuance and verification tooling", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path (TOML or JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override one configuration value, applied after file and environment
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_override, global = true)]
    overrides: Vec<(String, String)>,
}

fn parse_override(raw: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {raw:?}"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in {raw:?}"));
    }
    Ok((key.to_string(), value.to_string()))
}

#[derive(Subcommand)]
enum Commands {
    /// Fingerprint a letter version
    Fingerprint(FingerprintArgs),

    /// SHA-256 digest of letter content
    Digest(DigestArgs),

    /// Normalize a JSON tag payload
    NormalizeTags(NormalizeArgs),

    /// Create, approve, issue, verify and revoke a letter in memory
    Demo,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config =
        VerityConfig::resolve(cli.config.as_deref()).with_context(|| match &cli.config {
            Some(path) => format!("loading config from {}", path.display()),
            None => "loading config from the environment".to_string(),
        })?;
    config
        .apply_overrides(cli.overrides.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .context("applying --set overrides")?;

    let level = if cli.verbose {
        "debug"
    } else {
        config.log_level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Fingerprint(args) => inspect::fingerprint(args)?,
        Commands::Digest(args) => inspect::digest(args)?,
        Commands::NormalizeTags(args) => inspect::normalize(args)?,
        Commands::Demo => demo::run(config).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_overrides_parse() {
        let cli = Cli::try_parse_from([
            "verity",
            "--set",
            "default-max-prints=3",
            "--set",
            "verification_base_url=https://letters.example/verify",
            "demo",
        ])
        .unwrap();
        assert_eq!(
            cli.overrides,
            vec![
                ("default-max-prints".to_string(), "3".to_string()),
                (
                    "verification_base_url".to_string(),
                    "https://letters.example/verify".to_string()
                ),
            ]
        );
    }

    #[test]
    fn test_override_needs_key_and_equals() {
        assert!(parse_override("log-level").is_err());
        assert!(parse_override("=debug").is_err());
        assert_eq!(
            parse_override("verify-access-key=").unwrap(),
            ("verify-access-key".to_string(), String::new())
        );
    }
}
