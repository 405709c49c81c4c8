use std::sync::Arc;

use anyhow::Result;
use monitor_demo::{
    config::{Timing, WORKER_COUNT},
    coordinator::Coordinator,
    events::ConsoleReporter,
};

fn main() -> Result<()> {
    // stdout carries the status lines, diagnostics go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let coordinator = Coordinator::new(Arc::new(ConsoleReporter), Timing::default());
    coordinator.run(WORKER_COUNT)?;
    Ok(())
}
