use clap::Parser;
use s3access::io::storage::is_object_uri;
use s3access::relay::DEFAULT_CAPACITY;
use s3access::{
    ExportConfig, ExportError, ExportOutcome, Exporter, Hour, LocalStorage, LogRelay, Storage,
    StorageOptions,
};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "s3access-export")]
#[command(version)]
#[command(about = "Export one hour of S3 server access logs to a partitioned Parquet dataset", long_about = None)]
struct Args {
    /// Directory holding raw access-log files
    #[arg(long, env = "SRC")]
    src: String,

    /// Directory receiving the dataset
    #[arg(long, env = "DST")]
    dst: String,

    /// Directory for hour markers; omit to disable tracking
    #[arg(long, env = "TRACKING")]
    tracking: Option<String>,

    /// Hour to export as YYYY-MM-DD-HH (defaults to the previous UTC hour)
    #[arg(long, env = "HOUR")]
    hour: Option<Hour>,

    /// Seconds each stage may take
    #[arg(long, env = "TIMEOUT", default_value_t = 300)]
    timeout: u64,

    #[arg(long, env = "INPUT_S3_ACL")]
    input_s3_acl: Option<String>,
    #[arg(long, env = "INPUT_S3_ENDPOINT")]
    input_s3_endpoint: Option<String>,
    #[arg(long, env = "INPUT_S3_REGION")]
    input_s3_region: Option<String>,

    #[arg(long, env = "OUTPUT_S3_ACL")]
    output_s3_acl: Option<String>,
    #[arg(long, env = "OUTPUT_S3_ENDPOINT")]
    output_s3_endpoint: Option<String>,
    #[arg(long, env = "OUTPUT_S3_REGION")]
    output_s3_region: Option<String>,

    /// Log filter, e.g. `info` or `s3access=debug`
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl Args {
    fn into_config(self) -> ExportConfig {
        ExportConfig {
            source_root: self.src,
            destination_root: self.dst,
            tracking_root: self.tracking,
            hour: self.hour.unwrap_or_else(Hour::previous_utc),
            timeout: Duration::from_secs(self.timeout),
            input: StorageOptions {
                region: self.input_s3_region,
                endpoint: self.input_s3_endpoint,
                acl: self.input_s3_acl,
            },
            output: StorageOptions {
                region: self.output_s3_region,
                endpoint: self.output_s3_endpoint,
                acl: self.output_s3_acl,
            },
            ..ExportConfig::default()
        }
    }
}

fn init_logging(filter: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(filter)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn run(config: ExportConfig) -> anyhow::Result<ExportOutcome> {
    let roots = [
        Some(&config.source_root),
        Some(&config.destination_root),
        config.tracking_root.as_ref(),
    ];
    if let Some(remote) = roots.into_iter().flatten().find(|r| is_object_uri(r)) {
        anyhow::bail!(
            "{remote}: object store roots need an embedding application that supplies an ObjectIO client"
        );
    }

    let relay = LogRelay::spawn(DEFAULT_CAPACITY)?;
    let local: Arc<dyn Storage> = Arc::new(LocalStorage);
    let outcome = Exporter::new(config, Arc::clone(&local), local, relay.handle())
        .and_then(|exporter| exporter.run());
    relay.shutdown();
    Ok(outcome?)
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = init_logging(&args.log_level) {
        eprintln!("invalid log filter {:?}: {e}", args.log_level);
        return ExitCode::FAILURE;
    }

    let config = args.into_config();
    tracing::info!(
        hour = %config.hour,
        src = %config.source_root,
        dst = %config.destination_root,
        "starting export"
    );

    match run(config) {
        Ok(outcome) => {
            tracing::info!(?outcome, "export finished");
            ExitCode::SUCCESS
        }
        Err(e) => {
            let config_error = e
                .downcast_ref::<ExportError>()
                .is_some_and(ExportError::is_config);
            tracing::error!(config_error, "export failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}
