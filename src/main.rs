//! gpu-translate binary: the ingest → sort → bucket → dispatch loop.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{error, info};

use gpu_translate::batch::assembler::MaxiBatch;
use gpu_translate::batch::sentence::Sentence;
use gpu_translate::config::{Cli, Config};
use gpu_translate::gpu::device::{detect_device, DeviceContext};
use gpu_translate::inference::decoder::Decoder;
use gpu_translate::inference::model::ModelState;
use gpu_translate::pipeline::dispatcher::TaskDispatcher;
use gpu_translate::pipeline::output::OutputCollector;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "gpu_translate=debug"
    } else {
        "gpu_translate=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    info!("gpu-translate v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load(&cli.config)?;
    let config = Arc::new(config);

    info!(
        mini_batch = config.batch.mini_batch,
        maxi_batch = config.batch.maxi_batch,
        workers = config.workers.threads,
        "Configuration loaded"
    );

    let device = detect_device();
    info!(
        device = device.name,
        budget = config.device.memory_budget,
        "Device context"
    );
    let ctx = Arc::new(DeviceContext::new(config.device.memory_budget));

    let model = Arc::new(ModelState::load(ctx.clone(), &config));

    // Completed translations flow to the reordering collector; its
    // task ends once every decoder sender is dropped.
    let (tx, mut rx) = tokio::sync::mpsc::channel(256);
    let collector_task = tokio::spawn(async move {
        let mut collector = OutputCollector::new(std::io::stdout());
        while let Some(translation) = rx.recv().await {
            if let Err(e) = collector.add(translation) {
                error!(%e, "Failed to write output");
                break;
            }
        }
        let written = collector.written_count();
        if let Err(e) = collector.finish() {
            error!(%e, "Failed to flush output");
        }
        written
    });

    let mut dispatcher = TaskDispatcher::new(
        Decoder::new(ctx.clone(), tx),
        model.clone(),
        config.workers.threads,
    );

    let reader: Box<dyn AsyncBufRead + Unpin> = match &cli.input {
        Some(path) => Box::new(BufReader::new(File::open(path).await?)),
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    info!("Reading input");
    let timer = Instant::now();

    let mini_size = config.batch.mini_batch;
    let mut maxi = MaxiBatch::new(config.batch.maxi_batch);
    let mut line_num = 0u64;

    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        maxi.accept(Sentence::new(line_num, model.tokenize(&line)));
        line_num += 1;

        if maxi.is_full() {
            maxi.finalize();
            while !maxi.is_empty() {
                dispatcher.submit(maxi.next_mini_batch(mini_size));
            }
            maxi = MaxiBatch::new(config.batch.maxi_batch);
        }
    }

    // Trailing partial maxi batch: sorted and drained identically.
    if !maxi.is_empty() {
        maxi.finalize();
        while !maxi.is_empty() {
            dispatcher.submit(maxi.next_mini_batch(mini_size));
        }
    }

    dispatcher.drain_and_shutdown().await;
    let written = collector_task.await?;

    info!(
        sentences = line_num,
        written,
        peak_device_bytes = ctx.peak_bytes(),
        elapsed_ms = timer.elapsed().as_millis() as u64,
        "Translation complete"
    );

    Ok(())
}
