//! Nginx Request Exporter CLI
//!
//! Runs the exporter, or checks how a log line would be parsed.
//!
//! # Usage
//!
//! ```bash
//! nginx-request-exporter --help
//! nginx-request-exporter --nginx.syslog-address unix:/run/nginx-exporter.sock
//! nginx-request-exporter parse 'time:0.005 status=200 method="GET"'
//! ```

#![deny(unsafe_code)]

use anyhow::Result;
use api::{Config, SyslogAddress};
use clap::{Parser, Subcommand, ValueEnum};
use shared::config::HistogramBuckets;
use shared::parser::parse_content;

/// Nginx Request Exporter - Prometheus histograms from nginx access logs
#[derive(Parser)]
#[command(name = "nginx-request-exporter")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Address to listen on for web interface and telemetry
    #[arg(long = "web.listen-address", global = true)]
    listen_address: Option<String>,

    /// Path under which to expose metrics
    #[arg(long = "web.telemetry-path", global = true)]
    metrics_path: Option<String>,

    /// Syslog listen address (UDP address or unix:<path>)
    #[arg(long = "nginx.syslog-address", global = true)]
    syslog_address: Option<SyslogAddress>,

    /// Comma-separated list of histogram buckets
    #[arg(long = "histogram.buckets", global = true)]
    buckets: Option<HistogramBuckets>,

    /// Prefix of every exported metric name
    #[arg(long = "metric.namespace", global = true)]
    namespace: Option<String>,

    /// Syslog tag of accepted messages
    #[arg(long = "syslog.tag", global = true)]
    tag: Option<String>,

    /// Capacity of the channel between the syslog listener and ingestion
    #[arg(long = "channel.capacity", global = true)]
    channel_capacity: Option<usize>,

    /// Seconds allowed for draining buffered messages on shutdown
    #[arg(long = "drain.timeout-secs", global = true)]
    drain_timeout_secs: Option<u64>,

    /// Log output format
    #[arg(
        long,
        value_enum,
        env = "NGINX_EXPORTER_LOG_FORMAT",
        default_value_t = LogFormat::Text,
        global = true
    )]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the exporter (default)
    Serve,
    /// Parse a log line content and print the result as JSON
    Parse {
        /// Content of the syslog message, e.g. 'time:0.5 status=200'
        content: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

impl Cli {
    /// Applies the flags that were given on top of `config`.
    fn apply(&self, mut config: Config) -> Result<Config> {
        if let Some(address) = &self.listen_address {
            config.listen_address.clone_from(address);
        }
        if let Some(path) = &self.metrics_path {
            config.metrics_path.clone_from(path);
        }
        if let Some(address) = &self.syslog_address {
            config.syslog_address = address.clone();
        }
        if let Some(buckets) = &self.buckets {
            config.exporter.buckets = buckets.clone();
        }
        if let Some(namespace) = &self.namespace {
            config.exporter.namespace.clone_from(namespace);
        }
        if let Some(tag) = &self.tag {
            config.exporter.expected_tag.clone_from(tag);
        }
        if let Some(capacity) = self.channel_capacity {
            config.exporter.channel_capacity = capacity;
        }
        if let Some(secs) = self.drain_timeout_secs {
            config.exporter.drain_timeout_secs = secs;
        }

        config.validate()?;
        Ok(config)
    }
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
}

fn parse_to_json(content: &str) -> Result<String> {
    let record = parse_content(content)?;
    Ok(serde_json::to_string_pretty(&record)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::Parse { content }) => {
            println!("{}", parse_to_json(content)?);
            Ok(())
        }
        Some(Commands::Serve) | None => {
            init_tracing(cli.log_format);
            let config = cli.apply(Config::from_env()?)?;
            api::run_server_with_config(config).await
        }
    }
}
