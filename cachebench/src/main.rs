//! Command line entry point: resolve the configuration, run the
//! benchmark, print the report.

use std::process::ExitCode;

use cachebench::client::CacheClient;
use cachebench::config::{Args, Config};
use cachebench::{bench, report};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let args: Args = argh::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact()
        .init();

    let config = match Config::resolve(&args) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err:#}");
            return ExitCode::from(2);
        }
    };

    let client = CacheClient::new(&config.host, config.port);
    match bench::run(&client, &config) {
        Ok(result) => {
            report::print(&result);
            ExitCode::SUCCESS
        }
        Err(err) => {
            let err = anyhow::Error::new(err);
            eprintln!("benchmark failed: {err:#}");
            ExitCode::from(1)
        }
    }
}
