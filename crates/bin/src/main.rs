use std::time::Duration;

use clap::Parser;
use iamprobe::{Catalog, ProbeConfig, Sink, discover};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

mod cli;
mod output;

use cli::Cli;
use output::OutputFormat;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut cli = Cli::parse();
    init_tracing(&cli);

    // Move the token straight into the zeroizing config.
    let config = ProbeConfig::new(cli.project.clone(), std::mem::take(&mut cli.token))
        .with_tasks(cli.threads)
        .with_endpoint(cli.endpoint.clone())
        .with_timeout(Duration::from_secs(cli.timeout));
    config.validate()?;

    let catalog = match &cli.permissions_file {
        Some(path) => Catalog::load_from_file(path).await?,
        None => Catalog::builtin(),
    };

    let writer = output::open(cli.output.as_deref())
        .await
        .map_err(|e| format!("failed to open output file: {e}"))?;

    // Stop every shard at its next iteration on Ctrl-C; results so far are kept.
    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, stopping after in-flight requests");
                cancel.cancel();
            }
        }
    });

    let report = match cli.output_format() {
        OutputFormat::Plain => discover(&config, &catalog, Sink::streaming(writer), cancel).await?,
        OutputFormat::Json => {
            let report = discover(&config, &catalog, Sink::collecting(), cancel).await?;
            if let Err(e) = output::write_json(writer, &report.findings()).await {
                tracing::error!("Failed to write output: {e}");
            }
            report
        }
    };

    if !report.errors.is_empty() {
        tracing::warn!(
            "{} task error(s) occurred; results may be incomplete",
            report.errors.len()
        );
    }

    Ok(())
}

fn init_tracing(cli: &Cli) {
    let directive = if cli.debug {
        "iamprobe=debug"
    } else {
        "iamprobe=info"
    };
    let filter = EnvFilter::from_default_env().add_directive(directive.parse().unwrap());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if cli.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}
