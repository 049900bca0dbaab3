//! Smoke-test entry point
//!
//! Expects the Crypto Report Generator dev server to already be running
//! on the target URL; all flags are optional. Exit codes: 0 when no
//! check failed, 1 when at least one check recorded FAIL, 2 when the
//! harness itself could not run.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crypto_smoke::driver::{Browser, DriverConfig};
use crypto_smoke::runner::{RunnerConfig, SmokeRunner};
use crypto_smoke::SmokeResult;

#[derive(Parser, Debug)]
#[command(name = "crypto-smoke")]
#[command(about = "UI smoke tests for the Crypto Report Generator")]
struct Args {
    /// Base URL of the running target app
    #[arg(long, env = "SMOKE_BASE_URL", default_value = "http://localhost:3000")]
    base_url: String,

    /// Directory for captured screenshots
    #[arg(long, default_value = "tests/screenshots")]
    screenshots: PathBuf,

    /// Output directory for the JSON run report
    #[arg(short, long, default_value = "test-results")]
    output: PathBuf,

    /// Browser to use (chromium, firefox, webkit)
    #[arg(long, default_value = "chromium")]
    browser: String,

    /// Run in headless mode
    #[arg(long, default_value = "true")]
    headless: bool,

    /// Viewport width
    #[arg(long, default_value = "1280")]
    viewport_width: u32,

    /// Viewport height
    #[arg(long, default_value = "720")]
    viewport_height: u32,

    /// Seconds to wait for the target server before starting anyway
    #[arg(long, default_value = "30")]
    server_wait_secs: u64,

    /// Default timeout for in-page operations, in milliseconds
    #[arg(long, default_value = "120000")]
    default_timeout_ms: u64,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    let args = Args::parse();

    let rt = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");
    let result = rt.block_on(async_main(args));

    match result {
        Ok(success) => {
            if success {
                std::process::exit(0);
            } else {
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}

async fn async_main(args: Args) -> SmokeResult<bool> {
    let browser = match args.browser.as_str() {
        "firefox" => Browser::Firefox,
        "webkit" => Browser::Webkit,
        _ => Browser::Chromium,
    };

    let config = RunnerConfig {
        base_url: args.base_url,
        screenshot_dir: args.screenshots,
        output_dir: args.output,
        server_wait: Duration::from_secs(args.server_wait_secs),
        driver: DriverConfig {
            browser,
            headless: args.headless,
            viewport_width: args.viewport_width,
            viewport_height: args.viewport_height,
            default_timeout: Duration::from_millis(args.default_timeout_ms),
            ..Default::default()
        },
    };

    let runner = SmokeRunner::with_config(config);
    let report = runner.run().await?;
    runner.write_results(&report)?;

    Ok(report.success())
}
