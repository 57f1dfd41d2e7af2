//! Line pipeline application: stdin lines in, transformed lines out.

use std::future::Future;
use std::sync::Arc;

use snafu::ResultExt;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use workline_core::init_metrics;

use crate::builder::PipelineBuilder;
use crate::config::{Config, LinePipelineConfig};
use crate::error::{AppError, IoSnafu, TaskJoinSnafu};
use crate::pipeline::Pipeline;
use crate::queue::Queue;

/// Line counts of one application run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub lines_read: u64,
    pub lines_written: u64,
}

/// Assemble the `Pipeline<String>` a line pipeline config describes.
pub fn build_pipeline(config: &LinePipelineConfig) -> Result<Pipeline<String>, AppError> {
    let mut builder = PipelineBuilder::with_config(config.engine.clone());
    builder
        .create_new()
        .named(config.name.as_str())
        .consuming_from(Queue::bounded(config.input_capacity));

    for (index, stage) in config.stages.iter().enumerate() {
        debug!(
            pipeline = %config.name,
            index,
            op = stage.op.name(),
            degree = stage.degree,
            "Staging op"
        );
        builder.then_running(stage.op.clone().into_action(index)?, stage.degree);
    }

    if config.discard_output {
        builder.discard_output();
    } else {
        builder.outputting_to(Queue::bounded(config.output_capacity));
    }

    Ok(builder.build()?)
}

/// Run the configured pipeline over stdin and stdout until input ends or a
/// shutdown signal arrives.
pub async fn run(config: Config) -> Result<RunStats, AppError> {
    if let Some(address) = &config.metrics.address {
        init_metrics(address)?;
        info!(address = %address, "Metrics exporter listening");
    }

    run_lines(
        &config.pipeline,
        tokio::io::stdin(),
        tokio::io::stdout(),
        workline_core::shutdown_signal(),
    )
    .await
}

/// Run a line pipeline from `reader` to `writer`.
///
/// When `shutdown` resolves, reading stops, the input is closed and the
/// pipeline is interrupted. Lines already written stay written.
///
/// A write failure stops reading, interrupts the pipeline and returns without
/// waiting for the run to complete. A pipeline configured as not interruptible
/// is left behind with its workers blocked on the undrained output.
pub async fn run_lines<R, W, S>(
    config: &LinePipelineConfig,
    reader: R,
    mut writer: W,
    shutdown: S,
) -> Result<RunStats, AppError>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin,
    S: Future<Output = ()> + Send + 'static,
{
    let pipeline = Arc::new(build_pipeline(config)?);
    info!(
        pipeline = %pipeline.name(),
        stages = pipeline.steps().len(),
        discard_output = config.discard_output,
        "Starting line pipeline"
    );

    let completion = pipeline.run();
    let stop = CancellationToken::new();

    let shutdown_task = {
        let pipeline = Arc::clone(&pipeline);
        let stop = stop.clone();
        tokio::spawn(async move {
            shutdown.await;
            stop.cancel();
            pipeline.interrupt();
        })
    };

    let feeder = tokio::spawn(feed(
        BufReader::new(reader),
        pipeline.input().clone(),
        stop.clone(),
    ));

    let mut lines_written = 0;
    if let Some(output) = pipeline.output() {
        let mut written = Ok(());
        while let Some(line) = output.recv().await {
            written = write_line(&mut writer, &line).await;
            if written.is_err() {
                break;
            }
            lines_written += 1;
        }
        if written.is_ok() {
            written = writer.flush().await.context(IoSnafu);
        }
        if let Err(e) = written {
            stop.cancel();
            shutdown_task.abort();
            pipeline.interrupt();
            return Err(e);
        }
    }

    completion.await;
    shutdown_task.abort();
    let lines_read = feeder.await.context(TaskJoinSnafu)??;

    let stats = RunStats {
        lines_read,
        lines_written,
    };
    info!(
        pipeline = %pipeline.name(),
        lines_read,
        lines_written,
        interrupted = stop.is_cancelled(),
        "Line pipeline finished"
    );
    Ok(stats)
}

/// Push every line of `reader` into `input`, then close it.
async fn feed<R>(reader: R, input: Queue<String>, stop: CancellationToken) -> Result<u64, AppError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut read = 0;

    let result = loop {
        let line = tokio::select! {
            biased;

            _ = stop.cancelled() => break Ok(()),
            line = lines.next_line() => line,
        };

        match line {
            Ok(Some(line)) => {
                read += 1;
                let sent = tokio::select! {
                    biased;

                    _ = stop.cancelled() => break Ok(()),
                    sent = input.send(line) => sent,
                };
                if sent.is_err() {
                    debug!("Pipeline input closed, stopping reader");
                    break Ok(());
                }
            }
            Ok(None) => break Ok(()),
            Err(e) => break Err(e),
        }
    };

    input.close();
    debug!(lines = read, "Input closed");
    result.context(IoSnafu)?;
    Ok(read)
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, line: &str) -> Result<(), AppError> {
    writer.write_all(line.as_bytes()).await.context(IoSnafu)?;
    writer.write_all(b"\n").await.context(IoSnafu)
}
