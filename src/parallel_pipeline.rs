// THEORY:
// The `parallel_pipeline` module runs region detection for many frames at once.
// A single frame is always scanned sequentially by one `RegionDetector`; what
// runs in parallel are whole frames. Each worker task owns its own detector, so
// no detector state is ever shared and nothing inside a detector is locked.
//
// A dispatcher task hands incoming frames to the workers round-robin. Every
// frame carries a oneshot channel on which its worker sends the owned result
// back, so callers can await frames individually or as a batch.

use crate::core_modules::blob::Blob;
use crate::core_modules::error::DetectorError;
use crate::core_modules::region_detector::{DetectorConfig, RegionDetector, ScanStats};
use futures::future::join_all;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Configuration of a `DetectorPool`.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub width: u32,
    pub height: u32,
    /// Constraints every worker's detector is created with.
    pub detector: DetectorConfig,
    /// Number of worker tasks, each owning one detector.
    pub workers: usize,
}

impl PipelineConfig {
    /// One worker per logical CPU with default constraints.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            detector: DetectorConfig::default(),
            workers: num_cpus::get(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("detection failed: {0}")]
    Detection(#[from] DetectorError),

    #[error("the worker pool is shut down")]
    WorkerUnavailable,

    #[error("a worker stopped before returning its result")]
    WorkerDropped,
}

/// A packed single-channel frame submitted to the pool.
#[derive(Debug, Clone)]
pub struct Frame {
    pub id: u64,
    pub data: Vec<u8>,
}

/// The owned detection result for one frame.
#[derive(Debug, Clone)]
pub struct FrameBlobs {
    pub frame_id: u64,
    pub blobs: Vec<Blob>,
    pub stats: ScanStats,
}

struct FrameTask {
    frame: Frame,
    result_sender: oneshot::Sender<Result<FrameBlobs, DetectorError>>,
}

/// A pool of workers, each running its own `RegionDetector`.
pub struct DetectorPool {
    task_sender: mpsc::UnboundedSender<FrameTask>,
    dispatcher: JoinHandle<()>,
    workers: Vec<JoinHandle<()>>,
    frame_counter: AtomicU64,
}

impl DetectorPool {
    /// Spawns the dispatcher and the workers. Must be called from within a
    /// tokio runtime.
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        let worker_count = config.workers.max(1);

        // Detectors are built up front so that a bad configuration fails here.
        let detectors = (0..worker_count)
            .map(|_| RegionDetector::new(config.width, config.height, config.detector))
            .collect::<Result<Vec<_>, _>>()?;

        let (task_sender, mut task_receiver) = mpsc::unbounded_channel::<FrameTask>();
        let (worker_senders, worker_receivers): (Vec<_>, Vec<_>) = (0..worker_count)
            .map(|_| mpsc::unbounded_channel::<FrameTask>())
            .unzip();

        let dispatcher = tokio::spawn(async move {
            let mut worker_idx = 0;
            while let Some(task) = task_receiver.recv().await {
                if let Err(mpsc::error::SendError(task)) = worker_senders[worker_idx].send(task) {
                    log::warn!("worker {} is gone, dropping frame {}", worker_idx, task.frame.id);
                }
                worker_idx = (worker_idx + 1) % worker_count;
            }
        });

        let workers = detectors
            .into_iter()
            .zip(worker_receivers)
            .enumerate()
            .map(|(idx, (mut detector, mut worker_receiver))| {
                tokio::spawn(async move {
                    while let Some(task) = worker_receiver.recv().await {
                        let result = Self::process_frame_worker(&mut detector, &task.frame);
                        if task.result_sender.send(result).is_err() {
                            log::debug!("worker {}: caller dropped frame {}", idx, task.frame.id);
                        }
                    }
                })
            })
            .collect();

        log::debug!(
            "detector pool started: {} workers for {}x{} frames",
            worker_count,
            config.width,
            config.height
        );

        Ok(Self {
            task_sender,
            dispatcher,
            workers,
            frame_counter: AtomicU64::new(0),
        })
    }

    fn process_frame_worker(
        detector: &mut RegionDetector,
        frame: &Frame,
    ) -> Result<FrameBlobs, DetectorError> {
        let blobs = detector.find_blobs(&frame.data)?.to_vec();
        Ok(FrameBlobs {
            frame_id: frame.id,
            blobs,
            stats: detector.stats(),
        })
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Detects the regions of one frame.
    pub async fn detect(&self, frame: Frame) -> Result<FrameBlobs, PipelineError> {
        let (result_sender, result_receiver) = oneshot::channel();
        self.task_sender
            .send(FrameTask {
                frame,
                result_sender,
            })
            .map_err(|_| PipelineError::WorkerUnavailable)?;

        result_receiver
            .await
            .map_err(|_| PipelineError::WorkerDropped)?
            .map_err(PipelineError::from)
    }

    /// Detects the regions of a packed frame, numbering it automatically.
    pub async fn detect_pixels(&self, data: Vec<u8>) -> Result<FrameBlobs, PipelineError> {
        let id = self.frame_counter.fetch_add(1, Ordering::Relaxed);
        self.detect(Frame { id, data }).await
    }

    /// Detects several frames concurrently. Results keep the input order.
    pub async fn detect_batch(&self, frames: Vec<Frame>) -> Vec<Result<FrameBlobs, PipelineError>> {
        join_all(frames.into_iter().map(|frame| self.detect(frame))).await
    }

    /// Stops accepting frames and waits for the workers to drain.
    pub async fn shutdown(self) {
        drop(self.task_sender);
        if let Err(e) = self.dispatcher.await {
            log::warn!("dispatcher ended abnormally: {}", e);
        }
        for worker in self.workers {
            if let Err(e) = worker.await {
                log::warn!("worker ended abnormally: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(workers: usize) -> PipelineConfig {
        PipelineConfig {
            workers,
            ..PipelineConfig::new(3, 2)
        }
    }

    #[tokio::test]
    async fn detects_a_single_frame() {
        let pool = DetectorPool::new(config(2)).unwrap();
        let result = pool
            .detect(Frame {
                id: 7,
                data: vec![1, 1, 0, 1, 0, 0],
            })
            .await
            .unwrap();

        assert_eq!(result.frame_id, 7);
        let mut sizes: Vec<u32> = result.blobs.iter().map(|b| b.size()).collect();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![3, 3]);
        assert_eq!(result.stats.blobs, 2);
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn batch_results_keep_input_order() {
        let pool = DetectorPool::new(config(3)).unwrap();
        let frames: Vec<Frame> = (0..10u8)
            .map(|i| Frame {
                id: i as u64,
                data: vec![i, i, i, 0, 0, i],
            })
            .collect();

        let results = pool.detect_batch(frames).await;
        assert_eq!(results.len(), 10);
        for (i, result) in results.into_iter().enumerate() {
            let result = result.unwrap();
            assert_eq!(result.frame_id, i as u64);
            // Frame 0 is uniform; the others split into two regions.
            let expected = if i == 0 { 1 } else { 2 };
            assert_eq!(result.blobs.len(), expected);
        }
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn frame_errors_are_reported_per_frame() {
        let pool = DetectorPool::new(config(1)).unwrap();
        let err = pool.detect_pixels(vec![0; 5]).await.unwrap_err();
        assert_eq!(
            err,
            PipelineError::Detection(DetectorError::BufferSizeMismatch { expected: 6, actual: 5 })
        );

        let ok = pool.detect_pixels(vec![0; 6]).await.unwrap();
        assert_eq!(ok.frame_id, 1);
        assert_eq!(ok.blobs.len(), 1);
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn invalid_dimensions_fail_at_construction() {
        let result = DetectorPool::new(PipelineConfig {
            width: 0,
            ..config(1)
        });
        assert!(matches!(
            result,
            Err(PipelineError::Detection(DetectorError::InvalidDimensions { .. }))
        ));
    }

    #[tokio::test]
    async fn zero_workers_still_runs_one() {
        let pool = DetectorPool::new(config(0)).unwrap();
        assert_eq!(pool.worker_count(), 1);
        pool.shutdown().await;
    }
}
