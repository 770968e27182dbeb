// Example runner: detects the regions of an image file and prints a summary.
//
// Usage: region_detector <image> [levels] [min_size]
//
// The image is converted to 8-bit grey and quantized to `levels` grey levels
// (default 4) so that photographs break into a manageable number of regions.

use flexi_logger::Logger;
use region_detector::{DetectorConfig, RegionDetector};
use std::process::ExitCode;

fn main() -> ExitCode {
    // The handle has to outlive the run for the logger to stay installed.
    let _logger = Logger::try_with_env_or_str("info")
        .and_then(|logger| logger.start())
        .map_err(|e| eprintln!("Logger initialization failed with {}", e))
        .ok();

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        eprintln!("usage: region_detector <image> [levels] [min_size]");
        return ExitCode::FAILURE;
    };
    let levels: u32 = args.next().and_then(|s| s.parse().ok()).unwrap_or(4).clamp(2, 256);
    let min_size: u32 = args.next().and_then(|s| s.parse().ok()).unwrap_or(20);

    let mut image = match image::open(&path) {
        Ok(image) => image.to_luma8(),
        Err(e) => {
            log::error!("cannot open {}: {}", path, e);
            return ExitCode::FAILURE;
        }
    };

    let step = (256 / levels) as u8;
    for pixel in image.pixels_mut() {
        pixel.0[0] = (pixel.0[0] / step) * step;
    }

    let config = DetectorConfig {
        min_size,
        ..DetectorConfig::default()
    };
    let mut detector = match RegionDetector::new(image.width(), image.height(), config) {
        Ok(detector) => detector,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let blobs = match detector.find_blobs_in_image(&image) {
        Ok(blobs) => blobs,
        Err(e) => {
            log::error!("detection failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    log::info!("{}: {} regions of at least {} pixels", path, blobs.len(), min_size);
    for blob in blobs {
        let bb = blob.bounding_box();
        let (cx, cy) = blob.center();
        let pca = blob.pca();
        println!(
            "#{:<4} value={:<3} size={:<7} box=({},{} {}x{}) center=({:.1},{:.1}) axes=({:.1},{:.1}) border={}",
            blob.id,
            blob.value(),
            blob.size(),
            bb.x,
            bb.y,
            bb.width,
            bb.height,
            cx,
            cy,
            pca.major_axis,
            pca.minor_axis,
            blob.is_border_region()
        );
    }
    ExitCode::SUCCESS
}
