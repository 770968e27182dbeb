// THEORY:
// This file is the main entry point for the `region_detector` library crate.
// It exposes the `RegionDetector` and the data structures it produces (`Blob`,
// `ScanLine`, `Rect`, ...) as the public API. The arena and the disjoint-set
// forest that drive the scan are internal building blocks that live under
// `core_modules` next to the detector itself.
//
// The `parallel_pipeline` module sits on top: it feeds whole frames to a pool
// of workers, each owning its own detector, for callers that need to process
// several streams at once.

pub mod core_modules;
pub mod parallel_pipeline;

pub use core_modules::blob::{Blob, PcaInfo};
pub use core_modules::error::DetectorError;
pub use core_modules::image_view::{ImageView, Point, Rect};
pub use core_modules::region_detector::{DetectorConfig, RegionDetector, ScanStats};
pub use core_modules::scan_line::ScanLine;
pub use parallel_pipeline::{DetectorPool, Frame, FrameBlobs, PipelineConfig, PipelineError};
