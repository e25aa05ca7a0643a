use clap::Parser;
use reindex_bench::{BenchConfig, HttpGateway, ReindexWorkflow, ResetPolicy};
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "reindex-bench",
    about = "Benchmark and validate bucket reindexing against an object store"
)]
struct Cli {
    /// Base URL of the store's HTTP API
    #[arg(long, env = "REINDEX_BENCH_URL", default_value = "http://127.0.0.1:2020")]
    url: String,

    /// Number of objects to create/find
    #[arg(short = 'n', long = "nbobjects", default_value_t = 1000)]
    nbobjects: u64,

    /// Maximum concurrent puts within one insert wave
    #[arg(long, env = "REINDEX_BENCH_CONCURRENCY", default_value = "100")]
    concurrency: NonZeroUsize,

    /// Objects per reindex chunk call
    #[arg(long, default_value = "100")]
    reindex_chunk: NonZeroUsize,

    /// Bucket name to benchmark against
    #[arg(long, default_value = "reindex_bench")]
    bucket: String,

    /// Additional options to pass to findobjects, as JSON
    #[arg(long = "findobjectsopts")]
    findobjectsopts: Option<String>,

    /// Reuse an existing bucket instead of recreating it
    #[arg(long)]
    reuse_bucket: bool,

    /// Treat count or property mismatches during verification as fatal
    #[arg(long)]
    strict: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let find_opts = match cli.findobjectsopts.as_deref() {
        Some(raw) if !raw.is_empty() => match serde_json::from_str(raw) {
            Ok(value) => Some(value),
            Err(e) => {
                eprintln!("invalid --findobjectsopts JSON: {}", e);
                std::process::exit(1);
            }
        },
        _ => None,
    };

    let config = BenchConfig {
        bucket: cli.bucket,
        total_objects: cli.nbobjects,
        concurrency: cli.concurrency,
        reindex_chunk: cli.reindex_chunk,
        reset_policy: if cli.reuse_bucket {
            ResetPolicy::ReuseIfExists
        } else {
            ResetPolicy::Recreate
        },
        strict_verify: cli.strict,
        find_opts,
    };

    let gateway = Arc::new(HttpGateway::new(&cli.url));
    let workflow = ReindexWorkflow::new(gateway, config);

    if workflow.run().await.is_err() {
        // Already logged by the workflow.
        std::process::exit(1);
    }
}
