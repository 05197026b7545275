//! dynocsv command-line entry point.
//!
//! Exports a DynamoDB table, index or key-condition query to a CSV file.
//!
//! # Environment
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `LOG_LEVEL` | `warn` | Log level filter, used when `RUST_LOG` is unset |
//! | `RUST_LOG` | - | Fine-grained tracing filter |
//! | `AWS_PROFILE` | `default` | Profile used when `--profile` is not given |
//! | `DYNOCSV_ENDPOINT_URL` | - | Endpoint override, same as `--endpoint-url` |
//! | `DYNOCSV_BUFFER_CAPACITY` | `1000` | Rows held back before the header is written |
//! | `DYNOCSV_PAGE_SIZE` | - | Items requested per page |

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use dynocsv_aws::{AwsStoreClient, SessionConfig};
use dynocsv_core::{ColumnPolicy, ExportConfig, ExportRequest, QueryParams, SortFlags, export};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "dynocsv", version)]
#[command(about = "Export DynamoDB table, index or query results to CSV", long_about = None)]
struct Args {
    /// Table to export.
    #[arg(short, long)]
    table: String,

    /// Secondary index to scan or query instead of the table.
    #[arg(short, long)]
    index: Option<String>,

    /// Columns to export, in order. Disables column discovery.
    #[arg(short, long, value_delimiter = ',')]
    columns: Vec<String>,

    /// Columns to leave out of a discovered column set.
    #[arg(short, long = "skip-columns", value_delimiter = ',')]
    skip_columns: Vec<String>,

    /// Maximum number of records to export; 0 exports everything.
    #[arg(short, long, default_value_t = 0)]
    limit: usize,

    /// AWS shared-config profile.
    #[arg(short, long)]
    profile: Option<String>,

    /// Hash key value. Switches from scan to query.
    #[arg(long)]
    hash: Option<String>,

    /// Sort key equals this value.
    #[arg(long)]
    sort: Option<String>,

    /// Sort key greater than this value.
    #[arg(long)]
    sort_gt: Option<String>,

    /// Sort key greater than or equal to this value.
    #[arg(long)]
    sort_ge: Option<String>,

    /// Sort key less than this value.
    #[arg(long)]
    sort_lt: Option<String>,

    /// Sort key less than or equal to this value.
    #[arg(long)]
    sort_le: Option<String>,

    /// Sort key begins with this prefix.
    #[arg(long)]
    sort_begins_with: Option<String>,

    /// Sort key between two comma separated values, inclusive.
    #[arg(long, value_name = "LO,HI")]
    sort_between: Option<String>,

    /// Output file. Defaults to `<table>.csv`.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// DynamoDB endpoint override, e.g. a local instance.
    #[arg(long, env = "DYNOCSV_ENDPOINT_URL")]
    endpoint_url: Option<String>,

    /// Log level filter, used when `RUST_LOG` is unset.
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    log_level: String,
}

impl Args {
    /// Validate flag combinations into an export request.
    fn export_request(&self) -> Result<ExportRequest> {
        let flags = SortFlags {
            sort: self.sort.clone(),
            sort_gt: self.sort_gt.clone(),
            sort_ge: self.sort_ge.clone(),
            sort_lt: self.sort_lt.clone(),
            sort_le: self.sort_le.clone(),
            sort_begins_with: self.sort_begins_with.clone(),
            sort_between: self.sort_between.clone(),
        };
        let query = QueryParams::from_flags(self.hash.clone(), flags)?;
        let columns = ColumnPolicy::from_lists(self.columns.clone(), self.skip_columns.clone())?;

        Ok(ExportRequest {
            table_name: self.table.clone(),
            index_name: self.index.clone().filter(|i| !i.is_empty()),
            query,
            columns,
            limit: (self.limit > 0).then_some(self.limit),
        })
    }

    fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("{}.csv", self.table)))
    }
}

/// Log to stderr so stdout only carries the column list.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level)?;

    let request = args.export_request()?;
    let output = args.output_path();

    let session = SessionConfig::from_env(args.profile.as_deref(), args.endpoint_url.clone());
    let client = AwsStoreClient::from_conf(&session.load().await);

    let file = File::create(&output)
        .with_context(|| format!("failed to create {}", output.display()))?;
    let summary = export(
        &client,
        &request,
        &ExportConfig::from_env(),
        BufWriter::new(file),
    )
    .await
    .with_context(|| format!("failed to export table {}", request.table_name))?;

    if request.columns.is_discovered() && !summary.attributes.is_empty() {
        println!("{}", summary.attributes.join(","));
    }
    if summary.forced_display {
        warn!(
            columns = summary.attributes.len(),
            "Columns were added after the header was written; rows before them are narrower than the column list above"
        );
    }

    info!(
        table = %request.table_name,
        records = summary.records,
        output = %output.display(),
        "Export complete"
    );
    Ok(())
}
