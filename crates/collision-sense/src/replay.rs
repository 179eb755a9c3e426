//! Replay of recorded detections
//!
//! A producer task parses one [`DetectionFrame`] JSON object per line and
//! runs the pipeline; a consumer writes each [`FrameAssessment`] as a JSON
//! line. The two are joined by a latest-frame-wins channel, so a slow
//! consumer sees fewer frames rather than stale ones.

use frame_channel::{channel, FrameReceiver};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::detection::DetectionFrame;
use crate::pipeline::{CollisionPipeline, FrameAssessment};
use crate::PipelineError;

/// Counters for a finished replay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Frames parsed and processed
    pub frames_processed: usize,
    /// Lines that failed to parse
    pub malformed_lines: usize,
    /// Assessments written by the consumer
    pub frames_emitted: usize,
    /// Assessments overwritten before the consumer took them
    pub frames_dropped: usize,
}

#[derive(Default)]
struct ProducerStats {
    processed: usize,
    malformed: usize,
}

/// Replay a JSON-lines detection stream through the pipeline.
///
/// `fps` paces the producer; 0 replays as fast as possible.
pub async fn run_replay<R, W>(
    reader: R,
    pipeline: Arc<CollisionPipeline>,
    fps: f64,
    mut writer: W,
) -> Result<ReplaySummary, PipelineError>
where
    R: AsyncBufRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin,
{
    let (tx, mut rx) = channel::<FrameAssessment>();
    let frame_interval = (fps > 0.0).then(|| Duration::from_secs_f64(1.0 / fps));

    info!("Starting replay (fps={})", fps);

    let producer = tokio::spawn(async move {
        let mut lines = reader.lines();
        let mut stats = ProducerStats::default();
        let mut line_no = 0usize;

        while let Some(line) = lines.next_line().await? {
            line_no += 1;
            if line.trim().is_empty() {
                continue;
            }

            let frame: DetectionFrame = match serde_json::from_str(&line) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!("Line {}: malformed detection frame: {}", line_no, e);
                    stats.malformed += 1;
                    continue;
                }
            };

            let assessment = pipeline.process_frame(&frame);
            stats.processed += 1;

            if tx.send(assessment).is_err() {
                debug!("Consumer gone, stopping producer");
                break;
            }

            if let Some(interval) = frame_interval {
                tokio::time::sleep(interval).await;
            }
        }

        Ok::<_, PipelineError>(stats)
    });

    let emitted = match write_assessments(&mut rx, &mut writer).await {
        Ok(emitted) => emitted,
        Err(e) => {
            warn!("Replay output failed, stopping producer: {}", e);
            producer.abort();
            return Err(e);
        }
    };

    let stats = producer
        .await
        .map_err(|e| PipelineError::Task(e.to_string()))??;
    let channel_stats = rx.stats();

    let summary = ReplaySummary {
        frames_processed: stats.processed,
        malformed_lines: stats.malformed,
        frames_emitted: emitted,
        frames_dropped: channel_stats.dropped,
    };

    info!(
        "Replay finished: {} processed, {} emitted, {} dropped, {} malformed",
        summary.frames_processed, summary.frames_emitted, summary.frames_dropped, summary.malformed_lines
    );

    Ok(summary)
}

async fn write_assessments<W>(
    rx: &mut FrameReceiver<FrameAssessment>,
    writer: &mut W,
) -> Result<usize, PipelineError>
where
    W: AsyncWrite + Unpin,
{
    let mut emitted = 0usize;
    while let Some(assessment) = rx.recv().await {
        let json = serde_json::to_string(&assessment)?;
        writer.write_all(json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        emitted += 1;
    }
    writer.flush().await?;
    Ok(emitted)
}
