//! Command-line interface for the connector.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::Config;
use crate::error::Result;
use crate::format::RecordBody;
use crate::oai::{
    render_response, Engine, ErrorCode, HarvestRequest, Payload, RecordList, Verb,
};
use crate::server;
use crate::token::{FileCursorStore, ResumptionTokenStore};

/// OAI Connector - Harvesting interface for a Solr-backed repository.
#[derive(Parser)]
#[command(name = "oai-connector")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (default: $OAI_CONNECTOR_CONFIG)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the protocol over HTTP.
    Serve {
        /// Address to listen on
        #[arg(short, long, default_value = "127.0.0.1:8080")]
        addr: SocketAddr,

        /// Seconds between sweeps of expired resumption tokens (0 disables)
        #[arg(long, default_value_t = 3600)]
        sweep_interval: u64,
    },

    /// Answer a single request and print the XML response.
    Request {
        /// Verb (e.g., Identify, ListRecords)
        verb: String,

        /// Further arguments as KEY=VALUE (e.g., metadataPrefix=oai_dc)
        #[arg(value_parser = parse_key_value)]
        args: Vec<(String, String)>,
    },

    /// Run a complete list harvest, following resumption tokens.
    Harvest {
        /// Metadata prefix to harvest
        #[arg(short, long, default_value = "oai_dc")]
        metadata_prefix: String,

        /// Lower datestamp bound
        #[arg(long)]
        from: Option<String>,

        /// Upper datestamp bound
        #[arg(long)]
        until: Option<String>,

        /// Set to harvest
        #[arg(short, long)]
        set: Option<String>,

        /// Harvest headers only (ListIdentifiers)
        #[arg(long)]
        identifiers_only: bool,

        /// Directory to write each response page to
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Delete expired resumption tokens.
    SweepTokens,
}

impl Cli {
    /// Log level used when `RUST_LOG` is not set.
    #[must_use]
    pub fn default_log_level(&self) -> &'static str {
        match self.command {
            Commands::Serve { .. } => "info",
            _ => "warn",
        }
    }
}

fn parse_key_value(s: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    if key.is_empty() {
        return Err(format!("empty key in '{s}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None => Config::from_env(),
    }
}

/// Run the CLI.
pub fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve {
            addr,
            sweep_interval,
        } => {
            let engine = Engine::from_config(config)?;
            server::serve(engine, addr, Duration::from_secs(sweep_interval))
        }
        Commands::Request { verb, args } => {
            let engine = Engine::from_config(config)?;
            let mut bag = vec![("verb".to_string(), verb)];
            bag.extend(args);
            println!("{}", engine.respond(bag));
            Ok(())
        }
        Commands::Harvest {
            metadata_prefix,
            from,
            until,
            set,
            identifiers_only,
            output,
        } => {
            let verb = if identifiers_only {
                Verb::ListIdentifiers
            } else {
                Verb::ListRecords
            };
            let mut args = vec![
                ("verb", verb.as_str().to_string()),
                ("metadataPrefix", metadata_prefix),
            ];
            args.extend(from.map(|v| ("from", v)));
            args.extend(until.map(|v| ("until", v)));
            args.extend(set.map(|v| ("set", v)));
            let request = HarvestRequest::parse(args)?;
            let engine = Engine::from_config(config)?;
            harvest_command(&engine, request, output.as_deref())
        }
        Commands::SweepTokens => sweep_command(&config),
    }
}

/// Running totals of a harvest.
#[derive(Debug, Default)]
struct HarvestSummary {
    pages: usize,
    records: usize,
    failed: usize,
}

fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    #[allow(clippy::expect_used)] // Static template string that is guaranteed to be valid
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("valid template"),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn switch_to_bar(pb: &ProgressBar, total: u64) {
    pb.set_length(total);
    #[allow(clippy::expect_used)] // Static template string that is guaranteed to be valid
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .expect("valid template")
            .progress_chars("=> "),
    );
}

/// Execute the harvest command.
fn harvest_command(engine: &Engine, first: HarvestRequest, output: Option<&Path>) -> Result<()> {
    if let Some(dir) = output {
        std::fs::create_dir_all(dir)?;
    }

    println!(
        "{} {} from {}",
        style("Harvesting").bold(),
        style(first.metadata_prefix.as_deref().unwrap_or_default()).cyan(),
        style(&engine.config().identify.repository_name).green()
    );

    let pb = progress_bar();
    pb.set_message("Requesting first page...");

    let verb = first.verb;
    let mut request = first;
    let mut summary = HarvestSummary::default();
    loop {
        let outcome = engine.handle(&request);
        let list = match &outcome {
            Ok(Payload::ListRecords(list) | Payload::ListIdentifiers(list)) => list,
            Ok(_) => break,
            Err(e) if e.code == ErrorCode::NoRecordsMatch => break,
            Err(e) => {
                pb.finish_and_clear();
                return Err(e.clone().into());
            }
        };

        summary.pages += 1;
        summary.records += list.records.len();
        summary.failed += count_failed(list);
        if let Some(resumption) = &list.resumption {
            if pb.length().is_none() {
                switch_to_bar(&pb, resumption.complete_list_size as u64);
            }
        }
        pb.set_position(summary.records as u64);
        pb.set_message(format!("page {}", summary.pages));

        if let Some(dir) = output {
            let path = dir.join(format!("page-{:05}.xml", summary.pages));
            let xml = render_response(
                Some(&request),
                &outcome,
                &engine.config().identify.base_url,
                Utc::now(),
            );
            if let Err(e) = std::fs::write(&path, xml) {
                pb.finish_and_clear();
                return Err(e.into());
            }
        }

        let Some(token) = next_token(list) else {
            break;
        };
        request = HarvestRequest {
            resumption_token: Some(token),
            ..HarvestRequest::new(verb)
        };
    }
    pb.finish_and_clear();

    println!();
    println!("  Pages: {}", summary.pages);
    println!("  Records: {}", style(summary.records).green());
    if summary.failed > 0 {
        println!("  Failed: {}", style(summary.failed).yellow().bold());
    }
    if let Some(dir) = output {
        println!(
            "{} {}",
            style("Saved to:").green().bold(),
            dir.display()
        );
    }
    Ok(())
}

fn count_failed(list: &RecordList) -> usize {
    list.records
        .iter()
        .filter(|r| matches!(r.body, RecordBody::Failed(_)))
        .count()
}

fn next_token(list: &RecordList) -> Option<String> {
    list.resumption.as_ref().and_then(|r| r.token.clone())
}

/// Execute the sweep-tokens command.
fn sweep_command(config: &Config) -> Result<()> {
    let store = FileCursorStore::new(&config.tokens.folder)?;
    let tokens = ResumptionTokenStore::new(Arc::new(store), config.tokens.expiration_secs);
    let removed = tokens.sweep(Utc::now())?;
    println!(
        "{} {} expired resumption token(s) from {}",
        style("Removed").green().bold(),
        removed,
        config.tokens.folder.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_serve_defaults() {
        let cli = Cli::parse_from(["oai-connector", "serve"]);
        let Commands::Serve {
            addr,
            sweep_interval,
        } = cli.command
        else {
            panic!("expected serve");
        };
        assert_eq!(addr, "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(sweep_interval, 3600);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_cli_parse_request_with_arguments() {
        let cli = Cli::parse_from([
            "oai-connector",
            "--config",
            "connector.yaml",
            "request",
            "GetRecord",
            "identifier=PPN1",
            "metadataPrefix=oai_dc",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("connector.yaml")));
        let Commands::Request { verb, args } = cli.command else {
            panic!("expected request");
        };
        assert_eq!(verb, "GetRecord");
        assert_eq!(
            args,
            vec![
                ("identifier".to_string(), "PPN1".to_string()),
                ("metadataPrefix".to_string(), "oai_dc".to_string()),
            ]
        );
    }

    #[test]
    fn test_cli_rejects_malformed_argument() {
        let result = Cli::try_parse_from(["oai-connector", "request", "Identify", "nonsense"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parse_harvest() {
        let cli = Cli::parse_from([
            "oai-connector",
            "harvest",
            "--metadata-prefix",
            "mets",
            "--from",
            "2020-01-01",
            "--identifiers-only",
        ]);
        assert_eq!(cli.default_log_level(), "warn");
        let Commands::Harvest {
            metadata_prefix,
            from,
            until,
            identifiers_only,
            ..
        } = cli.command
        else {
            panic!("expected harvest");
        };
        assert_eq!(metadata_prefix, "mets");
        assert_eq!(from.as_deref(), Some("2020-01-01"));
        assert!(until.is_none());
        assert!(identifiers_only);
    }

    #[test]
    fn test_serve_logs_at_info() {
        let cli = Cli::parse_from(["oai-connector", "serve"]);
        assert_eq!(cli.default_log_level(), "info");
    }

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("set=a=b"),
            Ok(("set".to_string(), "a=b".to_string()))
        );
        assert!(parse_key_value("=x").is_err());
    }
}
