//! Device-grid harness entry point
//!
//! This file is the test binary that runs the launch test across the device
//! matrix against a real grid account.
//! Run with: cargo test --package gridrun-e2e --test e2e

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use gridrun_common::config::{non_blank, parse_proxy_port};
use gridrun_common::{Credentials, HarnessConfig};
use gridrun_e2e::{E2eResult, LaunchTest, Matrix, TestCase, TestRunner};

#[derive(Parser, Debug)]
#[command(name = "gridrun-e2e")]
#[command(about = "Device-grid test harness for GridRun")]
struct Args {
    /// Application bundle to upload
    #[arg(long, env = "APP_ZIP")]
    app: Option<PathBuf>,

    /// Grid account name
    #[arg(long, env = "SAUCE_USERNAME")]
    username: Option<String>,

    /// Grid access key
    #[arg(long, env = "SAUCE_ACCESS_KEY", hide_env_values = true)]
    access_key: Option<String>,

    /// Build tag attached to every session
    #[arg(long, env = "BUILD_TAG")]
    build_tag: Option<String>,

    /// Local tunnel port; reach the grid through loopback when set
    #[arg(long, env = "SELENIUM_PORT")]
    proxy_port: Option<String>,

    /// Device matrix YAML (defaults to the built-in matrix)
    #[arg(short, long)]
    matrix: Option<PathBuf>,

    /// Run only the test with this name
    #[arg(short, long)]
    name: Option<String>,

    /// Concurrent workers
    #[arg(short, long, default_value = "4")]
    workers: usize,

    /// Output directory for results
    #[arg(short, long, default_value = "test-results")]
    output: PathBuf,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = Args::parse();

    let credentials = match Credentials::from_parts(args.username.take(), args.access_key.take()) {
        Ok(credentials) => credentials,
        Err(e) => {
            eprintln!("Skipping: {}", e);
            return;
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create tokio runtime: {}", e);
            std::process::exit(2);
        }
    };
    let result = rt.block_on(async_main(args, credentials));

    match result {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}

async fn async_main(args: Args, credentials: Credentials) -> E2eResult<bool> {
    let mut config = HarnessConfig::new(credentials);
    config.artifact_path = args.app.filter(|path| !path.as_os_str().is_empty());
    config.build_tag = non_blank(args.build_tag);
    config.proxy_port = parse_proxy_port(args.proxy_port)?;
    config.workers = args.workers;

    let matrix = match &args.matrix {
        Some(path) => Matrix::from_file(path)?,
        None => Matrix::hard_coded(),
    };

    let cases: Vec<TestCase> = ["launchTest"]
        .into_iter()
        .filter(|name| args.name.as_deref().map_or(true, |wanted| wanted == *name))
        .map(|name| TestCase::new(name, LaunchTest))
        .collect();

    let runner = TestRunner::new(config)?
        .with_matrix(matrix)
        .with_output_dir(args.output);

    let results = runner.run(&cases).await?;
    runner.write_results(&results)?;

    Ok(results.failed == 0 && results.skipped == 0)
}
