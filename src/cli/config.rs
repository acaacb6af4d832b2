// CLI configuration
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use flac_relay::{CatalogConfig, ServiceConfig};
use reqwest::Url;

/// flac-relay - stream FLAC tracks with catalog tags written in
#[derive(Parser, Debug)]
#[command(name = "flac-relay")]
#[command(about = "Streams FLAC tracks from an object store, rewriting their tags from a catalog", long_about = None)]
#[command(version)]
pub struct Config {
    /// Quiet mode (only warnings and errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (log every metadata block)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

impl Config {
    /// Default log filter for the chosen verbosity; RUST_LOG still wins
    pub fn log_filter(&self) -> &'static str {
        if self.quiet {
            "warn"
        } else if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP service
    Serve(ServeArgs),

    /// Rewrite the tags of a local file
    Rewrite {
        /// Source FLAC file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Field to overwrite, as KEY=VALUE (repeatable)
        #[arg(short, long = "tag", value_name = "KEY=VALUE")]
        tags: Vec<TagArg>,
    },

    /// Show the metadata blocks of local file(s)
    Inspect {
        /// FLAC file path(s)
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "pretty")]
        format: OutputFormat,
    },
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, env = "FLAC_RELAY_LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Base URL of the catalog service
    #[arg(long, env = "FLAC_RELAY_CATALOG_URL")]
    pub catalog_url: Url,

    /// Catalog username
    #[arg(long, env = "FLAC_RELAY_CATALOG_USERNAME", default_value = "")]
    pub catalog_username: String,

    /// Catalog password
    #[arg(long, env = "FLAC_RELAY_CATALOG_PASSWORD", default_value = "", hide_env_values = true)]
    pub catalog_password: String,

    /// Base URL of the object store
    #[arg(long, env = "FLAC_RELAY_STORE_URL")]
    pub store_url: Url,

    /// Connect timeout for upstream requests, in seconds
    #[arg(long, default_value_t = 10)]
    pub connect_timeout_secs: u64,

    /// Give up on an upstream that sends nothing for this long, in seconds
    #[arg(long, env = "FLAC_RELAY_READ_TIMEOUT", default_value_t = 30)]
    pub read_timeout_secs: u64,
}

impl ServeArgs {
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            listen: self.listen,
            catalog: CatalogConfig {
                url: self.catalog_url.clone(),
                username: self.catalog_username.clone(),
                password: self.catalog_password.clone(),
            },
            store_url: self.store_url.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            read_timeout: Duration::from_secs(self.read_timeout_secs),
        }
    }
}

/// Output format for `inspect`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human readable listing
    #[default]
    Pretty,
    /// JSON
    Json,
}

/// A `KEY=VALUE` pair given on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagArg {
    pub key: String,
    pub value: String,
}

impl FromStr for TagArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, value) = s
            .split_once('=')
            .ok_or_else(|| format!("expected KEY=VALUE, got {:?}", s))?;
        if key.is_empty() || !key.bytes().all(|b| (0x20..=0x7D).contains(&b) && b != b'=') {
            return Err(format!("invalid field name {:?}", key));
        }
        Ok(TagArg {
            key: key.to_string(),
            value: value.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_serve_flags() {
        let config = Config::try_parse_from([
            "flac-relay",
            "serve",
            "--catalog-url",
            "http://catalog.local",
            "--store-url",
            "http://store.local",
            "--catalog-username",
            "relay",
        ])
        .unwrap();

        let Commands::Serve(args) = config.command else {
            panic!("expected serve");
        };
        let service = args.service_config();
        assert_eq!(service.listen, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(service.catalog.username, "relay");
        assert_eq!(service.connect_timeout, Duration::from_secs(10));
        assert_eq!(service.read_timeout, Duration::from_secs(30));
    }

    #[test]
    fn read_timeout_flag() {
        let config = Config::try_parse_from([
            "flac-relay",
            "serve",
            "--catalog-url",
            "http://catalog.local",
            "--store-url",
            "http://store.local",
            "--read-timeout-secs",
            "5",
        ])
        .unwrap();

        let Commands::Serve(args) = config.command else {
            panic!("expected serve");
        };
        assert_eq!(args.service_config().read_timeout, Duration::from_secs(5));
    }

    #[test]
    fn tag_args() {
        let tag: TagArg = "TITLE=A = B".parse().unwrap();
        assert_eq!(tag.key, "TITLE");
        assert_eq!(tag.value, "A = B");
        assert!("TITLE".parse::<TagArg>().is_err());
        assert!("=x".parse::<TagArg>().is_err());
    }

    #[test]
    fn verbosity_sets_filter() {
        let config = Config::try_parse_from(["flac-relay", "-v", "inspect", "a.flac"]).unwrap();
        assert_eq!(config.log_filter(), "debug");
    }
}
