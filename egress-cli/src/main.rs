// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Egress — outbound HTTP request audit log
//
//  request:  one intercepted call through reqwest
//  logs:     stored entries for one week
//  weeks:    weeks that have data, newest first
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use anyhow::{Context, bail};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use egress_client::{Interceptor, ReqwestTransport};
use egress_core::{EgressConfig, OutboundRequest};
use egress_observability::SensitiveFields;
use egress_store::open_store;
use egress_store::week::{entries_for_week, store_week_lookups, week_start_for};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{Subscriber, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;

#[derive(Parser, Debug)]
#[command(name = "egress", version, about = "Egress — outbound HTTP request audit log")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "egress.yaml")]
    config: PathBuf,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Perform one intercepted HTTP request and print the response
    Request {
        /// HTTP method, e.g. GET or POST
        method: String,
        url: String,
        /// Request header, `Name: value` (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,
        /// Query parameter, `name=value` (repeatable)
        #[arg(short, long = "query")]
        query: Vec<String>,
        /// JSON request body
        #[arg(long, conflicts_with = "form")]
        json: Option<String>,
        /// Form field, `name=value` (repeatable)
        #[arg(long)]
        form: Vec<String>,
    },
    /// Print stored entries for one week (default: current week)
    Logs {
        /// Any day of the week to show, YYYY-MM-DD
        #[arg(long)]
        week: Option<NaiveDate>,
    },
    /// List the weeks that have stored entries
    Weeks,
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ── Tracing ──
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    // stdout carries command output only.
    tracing::subscriber::set_global_default(log_subscriber(filter, cli.log_json, std::io::stderr))?;

    // ── Config ──
    if cli.config.exists() {
        info!(path = %cli.config.display(), "Loading config file");
    } else {
        info!(path = %cli.config.display(), "No config file found, using defaults");
    }
    let config = EgressConfig::load(&cli.config)?;

    match cli.command {
        Command::Request { method, url, headers, query, json, form } => {
            let mut request = OutboundRequest::new(
                http::Method::from_bytes(method.to_ascii_uppercase().as_bytes())
                    .with_context(|| format!("invalid HTTP method: {method}"))?,
                url,
            );
            for header in &headers {
                let (name, value) = split_pair(header, ':')?;
                request = request.header(name, value);
            }
            for param in &query {
                let (name, value) = split_pair(param, '=')?;
                request = request.query(name, value);
            }
            if let Some(body) = json {
                let value = serde_json::from_str(&body).context("--json is not valid JSON")?;
                request = request.json(value);
            } else if !form.is_empty() {
                let mut fields = BTreeMap::new();
                for field in &form {
                    let (name, value) = split_pair(field, '=')?;
                    fields.insert(name.to_string(), value.to_string());
                }
                request = request.form(fields);
            }
            run_request(&config, request).await
        }
        Command::Logs { week } => {
            let store = open_store(&config.store)?;
            let start = week_start_for(week.unwrap_or_else(|| Utc::now().date_naive()));
            let entries = entries_for_week(&*store, start)?;
            info!(week = %start, entries = entries.len(), "Entries loaded");
            for stored in entries {
                println!("{}", serde_json::to_string(&stored)?);
            }
            Ok(())
        }
        Command::Weeks => {
            let store = open_store(&config.store)?;
            for week in store_week_lookups(&*store, Utc::now().date_naive())? {
                println!("{}  {}", week.start, week.label);
            }
            Ok(())
        }
        Command::Config => {
            print!("{}", config.to_yaml()?);
            Ok(())
        }
    }
}

async fn run_request(config: &EgressConfig, request: OutboundRequest) -> anyhow::Result<()> {
    let store = open_store(&config.store)?;
    let transport = ReqwestTransport::new(&config.client)?;
    let client = Interceptor::new(transport, store);

    let guard = if config.interception.enabled {
        let fields = SensitiveFields::new(config.interception.sensitive_fields.iter().cloned());
        Some(client.activate(fields)?)
    } else {
        info!("Interception disabled in config, request will not be recorded");
        None
    };

    let result = client.perform(request).await;
    if let Some(guard) = guard {
        guard.deactivate()?;
    }

    let response = result?;
    println!("{}", response.status);
    for (name, value) in &response.headers {
        println!("{name}: {value}");
    }
    println!();
    println!("{}", response.text());
    Ok(())
}

fn log_subscriber<W>(filter: EnvFilter, json: bool, writer: W) -> Box<dyn Subscriber + Send + Sync>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(writer);
    if json {
        Box::new(builder.json().finish())
    } else {
        Box::new(builder.with_ansi(false).finish())
    }
}

/// `"Name: value"` / `"name=value"` → `("Name", "value")`.
fn split_pair(raw: &str, sep: char) -> anyhow::Result<(&str, &str)> {
    match raw.split_once(sep) {
        Some((name, value)) if !name.trim().is_empty() => Ok((name.trim(), value.trim())),
        _ => bail!("expected `name{sep}value`, got `{raw}`"),
    }
}
