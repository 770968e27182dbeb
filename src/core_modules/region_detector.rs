// THEORY:
// The `RegionDetector` is the engine of the crate. It finds every maximal
// 4-connected region of equal pixel value in a single-channel 8-bit frame in
// one raster pass, then reports the regions that satisfy the configured size
// and value constraints as `Blob`s.
//
// Key architectural principles & algorithm steps:
// 1.  **Run-Length Scan**: Every row is cut into maximal runs of equal value
//     (`ScanLine`s). All bookkeeping happens once per run, not once per pixel.
// 2.  **Online Union-Find**: A run inherits the part of the equal-valued pixels
//     directly above it. If those pixels belong to two different parts, the
//     parts are unified on the spot (`BlobPartForest::union`). This is where a
//     "U" whose arms meet at the bottom row becomes one region: no label written
//     for the arms is ever rewritten, later lookups simply resolve through the
//     forest. A run with no matching pixel above starts a new part.
// 3.  **Label Grid**: One `u32` per pixel records the part a pixel was first
//     assigned to. It is the lookup table for the row below and is sized once
//     per frame size; every frame overwrites all of it.
// 4.  **Assembly & Filtering**: After the last row, every part that was not
//     absorbed by another one is a complete region. Regions within the size and
//     value bounds become `Blob`s.
// 5.  **No Per-Frame Churn**: The forest's arenas and the label grid are reused
//     across calls. The result list is the only thing rebuilt per frame.
// 6.  **Stateless Across Frames**: Every call is independent. There is no
//     identity of regions from one frame to the next at this layer.

use crate::core_modules::blob::Blob;
use crate::core_modules::blob_part::BlobPartForest;
use crate::core_modules::error::DetectorError;
use crate::core_modules::image_view::{ImageView, Point, Rect};
use crate::core_modules::region_graph::RegionGraph;
use crate::core_modules::scan_line::{NONE, ScanLine};
use image::GrayImage;

/// Initial number of part slots; grows on demand.
const DEFAULT_PART_CAPACITY: usize = 1000;
/// Initial number of run slots. Frames hold far more runs than regions.
const DEFAULT_LINE_CAPACITY: usize = 10000;

/// Size and value constraints for reported regions. Bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectorConfig {
    /// Smallest reported region, in pixels.
    pub min_size: u32,
    /// Largest reported region, in pixels.
    pub max_size: u32,
    /// Smallest reported region value.
    pub min_value: u8,
    /// Largest reported region value.
    pub max_value: u8,
    /// Whether to record which reported regions share an edge.
    pub create_graph: bool,
}

impl Default for DetectorConfig {
    /// Reports every region up to `2 << 20` pixels. A single region larger
    /// than that, such as a uniform frame of more than about two megapixels,
    /// is filtered out unless `max_size` is raised.
    fn default() -> Self {
        Self {
            min_size: 1,
            max_size: 2 << 20,
            min_value: 0,
            max_value: 255,
            create_graph: false,
        }
    }
}

impl DetectorConfig {
    #[inline]
    fn accepts(&self, size: u32, value: u8) -> bool {
        (self.min_size..=self.max_size).contains(&size)
            && (self.min_value..=self.max_value).contains(&value)
    }
}

/// Counters of the most recent detection pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Runs emitted by the scan.
    pub scan_lines: usize,
    /// Parts allocated by the scan, absorbed ones included.
    pub blob_parts: usize,
    /// Distinct regions before filtering.
    pub regions: usize,
    /// Regions reported after filtering.
    pub blobs: usize,
}

/// Detects connected regions of equal value in 8-bit single-channel frames.
pub struct RegionDetector {
    /// Configured frame width in pixels.
    width: u32,
    /// Configured frame height in pixels.
    height: u32,
    /// Constraints applied in the assembly step.
    config: DetectorConfig,
    /// Part handle of every pixel, as first assigned during the scan.
    label_grid: Vec<u32>,
    /// Parts and runs of the current pass.
    forest: BlobPartForest,
    /// Pairs of adjacent parts; only collected for the region graph.
    adjacency: Vec<(u32, u32)>,
    /// Region index of each representative part; scratch for the region graph.
    region_of_part: Vec<u32>,
    /// Blob id of each region, `NONE` if filtered out.
    blob_of_region: Vec<u32>,
    /// Neighbourhood and enclosure of every region of the last pass.
    graph: RegionGraph,
    /// Result of the most recent pass.
    blobs: Vec<Blob>,
    stats: ScanStats,
}

impl RegionDetector {
    /// Creates a detector for `width x height` frames.
    pub fn new(width: u32, height: u32, config: DetectorConfig) -> Result<Self, DetectorError> {
        if width == 0 || height == 0 {
            return Err(DetectorError::InvalidDimensions { width, height });
        }
        Ok(Self {
            width,
            height,
            config,
            label_grid: vec![0; width as usize * height as usize],
            forest: BlobPartForest::new(DEFAULT_PART_CAPACITY, DEFAULT_LINE_CAPACITY),
            adjacency: Vec::new(),
            region_of_part: Vec::new(),
            blob_of_region: Vec::new(),
            graph: RegionGraph::default(),
            blobs: Vec::new(),
            stats: ScanStats::default(),
        })
    }

    /// Creates a detector with explicit size and value bounds.
    pub fn with_constraints(
        width: u32,
        height: u32,
        min_size: u32,
        max_size: u32,
        min_value: u8,
        max_value: u8,
    ) -> Result<Self, DetectorError> {
        Self::new(
            width,
            height,
            DetectorConfig {
                min_size,
                max_size,
                min_value,
                max_value,
                ..DetectorConfig::default()
            },
        )
    }

    /// Reconfigures the frame size. Reallocates the label grid only if the
    /// size actually changes.
    pub fn set_size(&mut self, width: u32, height: u32) -> Result<(), DetectorError> {
        if width == 0 || height == 0 {
            return Err(DetectorError::InvalidDimensions { width, height });
        }
        if width == self.width && height == self.height {
            return Ok(());
        }
        log::debug!(
            "label grid resized from {}x{} to {}x{}",
            self.width,
            self.height,
            width,
            height
        );
        self.width = width;
        self.height = height;
        self.label_grid = vec![0; width as usize * height as usize];
        Ok(())
    }

    pub fn set_min_size(&mut self, min_size: u32) {
        self.config.min_size = min_size;
    }

    pub fn set_max_size(&mut self, max_size: u32) {
        self.config.max_size = max_size;
    }

    pub fn set_min_value(&mut self, min_value: u8) {
        self.config.min_value = min_value;
    }

    pub fn set_max_value(&mut self, max_value: u8) {
        self.config.max_value = max_value;
    }

    pub fn set_constraints(&mut self, min_size: u32, max_size: u32, min_value: u8, max_value: u8) {
        self.config.min_size = min_size;
        self.config.max_size = max_size;
        self.config.min_value = min_value;
        self.config.max_value = max_value;
    }

    pub fn set_create_graph(&mut self, on: bool) {
        self.config.create_graph = on;
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Blobs of the most recent pass.
    pub fn blobs(&self) -> &[Blob] {
        &self.blobs
    }

    pub fn stats(&self) -> ScanStats {
        self.stats
    }

    /// The reported blob containing a frame position, if any.
    pub fn click(&self, position: Point) -> Option<&Blob> {
        self.blobs.iter().find(|blob| blob.contains(position))
    }

    /// Detects regions in a packed, row-major frame of the configured size.
    pub fn find_blobs(&mut self, pixels: &[u8]) -> Result<&[Blob], DetectorError> {
        let expected = self.width as usize * self.height as usize;
        if pixels.len() != expected {
            return Err(DetectorError::BufferSizeMismatch {
                expected,
                actual: pixels.len(),
            });
        }
        let view = ImageView::new(pixels, self.width, self.height)?;
        self.find_blobs_in_view(&view)
    }

    /// Detects regions in a `GrayImage`, adopting its size.
    pub fn find_blobs_in_image(&mut self, image: &GrayImage) -> Result<&[Blob], DetectorError> {
        self.find_blobs_in_view(&ImageView::from(image))
    }

    /// Detects regions in a view, adopting its size. Blob coordinates are
    /// frame coordinates, so a region of interest reports positions relative
    /// to the full frame.
    pub fn find_blobs_in_view(&mut self, view: &ImageView<'_>) -> Result<&[Blob], DetectorError> {
        self.set_size(view.width(), view.height())?;

        // The previous frame's result goes first; the forest is empty here.
        self.blobs.clear();
        self.adjacency.clear();
        self.forest.clear();

        self.scan(view);
        self.assemble(view);

        log::debug!(
            "{}x{} frame: {} runs, {} parts, {} regions, {} blobs",
            view.width(),
            view.height(),
            self.stats.scan_lines,
            self.stats.blob_parts,
            self.stats.regions,
            self.stats.blobs
        );

        // Blobs own copies of their runs, so the arenas can be recycled now.
        self.forest.clear();
        Ok(&self.blobs)
    }

    /// Phase A: cuts every row into runs and links runs of equal value that
    /// touch vertically.
    fn scan(&mut self, view: &ImageView<'_>) {
        let width = view.width() as usize;
        let graph = self.config.create_graph;

        for y in 0..view.height() {
            let row = view.row(y);
            let above = (y > 0).then(|| view.row(y - 1));
            let offset = y as usize * width;
            let mut left_part = NONE;
            let mut x = 0;

            while x < width {
                let value = row[x];
                let start = x;
                while x < width && row[x] == value {
                    x += 1;
                }
                let end = x - 1;

                let mut part = NONE;
                if let Some(above) = above {
                    let above_labels = &self.label_grid[offset - width..offset];
                    let mut last_label = NONE;
                    for cx in start..=end {
                        if above[cx] != value {
                            continue;
                        }
                        let label = above_labels[cx];
                        // Pixels of one run above share a label.
                        if label == last_label {
                            continue;
                        }
                        last_label = label;
                        part = if part == NONE {
                            self.forest.find(label)
                        } else {
                            self.forest.union(part, label)
                        };
                    }
                }
                if part == NONE {
                    part = self.forest.new_part();
                }

                self.forest
                    .attach(part, ScanLine::new(y, start as u32, end as u32, value));
                self.label_grid[offset + start..=offset + end].fill(part);

                if graph {
                    self.record_adjacency(above, offset, start, end, value, part, left_part);
                }
                left_part = part;
            }
        }
    }

    /// Notes the parts bordering the run `start..=end` to the left and above.
    #[allow(clippy::too_many_arguments)]
    fn record_adjacency(
        &mut self,
        above: Option<&[u8]>,
        offset: usize,
        start: usize,
        end: usize,
        value: u8,
        part: u32,
        left_part: u32,
    ) {
        if left_part != NONE {
            self.adjacency.push((left_part, part));
        }
        let Some(above) = above else {
            return;
        };
        let width = above.len();
        let above_labels = &self.label_grid[offset - width..offset];
        let mut last_label = NONE;
        for cx in start..=end {
            if above[cx] == value || above_labels[cx] == last_label {
                continue;
            }
            last_label = above_labels[cx];
            self.adjacency.push((part, last_label));
        }
    }

    /// Phase B: turns every unabsorbed part that passes the constraints into
    /// a `Blob`, in part issuance order.
    fn assemble(&mut self, view: &ImageView<'_>) {
        let origin = view.origin();
        let area = view.frame_rect();
        let local = Rect::new(0, 0, view.width(), view.height());
        let graph = self.config.create_graph;
        let mut regions = 0;

        if graph {
            self.graph.clear();
            self.blob_of_region.clear();
            self.region_of_part.clear();
            self.region_of_part.resize(self.forest.part_count(), NONE);
        }

        for (index, part) in self.forest.parts().iter().enumerate() {
            if part.inside_other {
                continue;
            }
            regions += 1;
            let value = part.mean_value();
            let accepted = self.config.accepts(part.size, value);

            if graph {
                let bounds = part_bounds(&self.forest, index as u32);
                let border = bounds.x == 0
                    || bounds.y == 0
                    || bounds.right() == local.right()
                    || bounds.bottom() == local.bottom();
                self.region_of_part[index] = self.graph.add_region(bounds, border);
                let blob = if accepted { self.blobs.len() as u32 } else { NONE };
                self.blob_of_region.push(blob);
            }
            if !accepted {
                continue;
            }

            let id = self.blobs.len();
            let lines = self
                .forest
                .lines_of(index as u32)
                .map(|line| line.translated(origin.x, origin.y))
                .collect();
            self.blobs.push(Blob::from_scan_lines(id, lines, value, area));
        }

        if graph {
            self.link_blobs();
        }

        self.stats = ScanStats {
            scan_lines: self.forest.line_count(),
            blob_parts: self.forest.part_count(),
            regions,
            blobs: self.blobs.len(),
        };
    }

    /// Builds the region graph from the adjacency pairs of the scan and
    /// copies neighbours and enclosure onto the reported blobs. A blob's
    /// parent is its closest enclosing region that was reported.
    fn link_blobs(&mut self) {
        for &(a, b) in &self.adjacency {
            let ra = self.region_of_part[self.forest.find_const(a) as usize];
            let rb = self.region_of_part[self.forest.find_const(b) as usize];
            self.graph.link(ra, rb);
        }
        self.graph.finish();

        for region in 0..self.graph.len() as u32 {
            let blob = self.blob_of_region[region as usize];
            if blob == NONE {
                continue;
            }

            let neighbours = self
                .graph
                .neighbours(region)
                .iter()
                .map(|&n| self.blob_of_region[n as usize])
                .filter(|&n| n != NONE)
                .map(|n| n as usize)
                .collect();
            self.blobs[blob as usize].neighbours = neighbours;

            let mut ancestor = self.graph.parent(region);
            while ancestor != NONE && self.blob_of_region[ancestor as usize] == NONE {
                ancestor = self.graph.parent(ancestor);
            }
            if ancestor != NONE {
                let parent = self.blob_of_region[ancestor as usize] as usize;
                self.blobs[blob as usize].parent = Some(parent);
                self.blobs[parent].sub_regions.push(blob as usize);
            }
        }
    }
}

/// Bounding box of a part's runs in scan coordinates.
fn part_bounds(forest: &BlobPartForest, part: u32) -> Rect {
    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0;
    let mut max_y = 0;
    for line in forest.lines_of(part) {
        min_x = min_x.min(line.start);
        max_x = max_x.max(line.end);
        min_y = min_y.min(line.row);
        max_y = max_y.max(line.row);
    }
    Rect::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector(width: u32, height: u32) -> RegionDetector {
        RegionDetector::new(width, height, DetectorConfig::default()).unwrap()
    }

    fn sizes(blobs: &[Blob]) -> Vec<u32> {
        let mut sizes: Vec<u32> = blobs.iter().map(Blob::size).collect();
        sizes.sort_unstable();
        sizes
    }

    #[test]
    fn default_config_caps_region_size() {
        let config = DetectorConfig::default();
        assert!(config.accepts(2 << 20, 0));
        assert!(!config.accepts((2 << 20) + 1, 0));

        let raised = DetectorConfig {
            max_size: u32::MAX,
            ..config
        };
        assert!(raised.accepts(2048 * 1536, 255));
    }

    #[test]
    fn rejects_zero_dimensions() {
        assert!(matches!(
            RegionDetector::new(0, 4, DetectorConfig::default()),
            Err(DetectorError::InvalidDimensions { width: 0, height: 4 })
        ));
        let mut rd = detector(2, 2);
        assert!(rd.set_size(3, 0).is_err());
        assert_eq!((rd.width(), rd.height()), (2, 2));
    }

    #[test]
    fn rejects_mismatched_buffers() {
        let mut rd = detector(3, 3);
        assert_eq!(
            rd.find_blobs(&[0; 8]).unwrap_err(),
            DetectorError::BufferSizeMismatch { expected: 9, actual: 8 }
        );
    }

    #[test]
    fn single_pixel_frame() {
        let mut rd = detector(1, 1);
        let blobs = rd.find_blobs(&[77]).unwrap();
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].size(), 1);
        assert_eq!(blobs[0].value(), 77);
    }

    #[test]
    fn every_row_labels_its_own_pixels() {
        // Row 2 has to see the labels row 1 wrote, not stale ones.
        #[rustfmt::skip]
        let frame = [
            1, 1, 0,
            0, 1, 0,
            0, 1, 1,
        ];
        let mut rd = detector(3, 3);
        let blobs = rd.find_blobs(&frame).unwrap();
        assert_eq!(sizes(blobs), vec![2, 2, 5]);
        assert_eq!(rd.stats().blob_parts, 3);

        let mut column = detector(1, 4);
        let blobs = column.find_blobs(&[8, 8, 8, 8]).unwrap();
        assert_eq!(sizes(blobs), vec![4]);
        assert_eq!(column.stats().blob_parts, 1);
    }

    #[test]
    fn u_shape_merges_late() {
        #[rustfmt::skip]
        let frame = [
            1, 0, 0, 0, 1,
            1, 0, 0, 0, 1,
            1, 1, 1, 1, 1,
        ];
        let mut rd = detector(5, 3);
        let blobs = rd.find_blobs(&frame).unwrap();
        assert_eq!(sizes(blobs), vec![6, 9]);
        let stats = rd.stats();
        assert_eq!(stats.regions, 2);
        // The two arms started as separate parts.
        assert_eq!(stats.blob_parts, 3);
    }

    #[test]
    fn merge_within_a_single_run() {
        // The bottom run touches three separate columns at once.
        #[rustfmt::skip]
        let frame = [
            2, 0, 2, 0, 2,
            2, 2, 2, 2, 2,
        ];
        let mut rd = detector(5, 2);
        let blobs = rd.find_blobs(&frame).unwrap();
        assert_eq!(sizes(blobs), vec![1, 1, 8]);
    }

    #[test]
    fn diagonal_pixels_are_not_connected() {
        #[rustfmt::skip]
        let frame = [
            5, 0,
            0, 5,
        ];
        let mut rd = detector(2, 2);
        let blobs = rd.find_blobs(&frame).unwrap();
        assert_eq!(blobs.len(), 4);
        assert!(blobs.iter().all(|b| b.size() == 1));
    }

    #[test]
    fn constraints_filter_regions() {
        #[rustfmt::skip]
        let frame = [
            9, 9, 9, 0,
            9, 9, 9, 0,
            0, 0, 0, 0,
        ];
        let mut rd = RegionDetector::with_constraints(4, 3, 1, 100, 1, 255).unwrap();
        let blobs = rd.find_blobs(&frame).unwrap();
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].value(), 9);

        rd.set_min_size(7);
        rd.set_min_value(0);
        let blobs = rd.find_blobs(&frame).unwrap();
        assert_eq!(blobs.len(), 0);

        rd.set_min_size(6);
        rd.set_max_value(0);
        let blobs = rd.find_blobs(&frame).unwrap();
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].value(), 0);
        assert_eq!(blobs[0].size(), 6);
        assert_eq!(rd.stats().regions, 2);
    }

    #[test]
    fn repeated_calls_are_independent() {
        let first = [1, 1, 2, 2];
        let second = [3, 4, 4, 4];
        let mut rd = detector(4, 1);
        let a: Vec<Blob> = rd.find_blobs(&first).unwrap().to_vec();
        let b: Vec<Blob> = rd.find_blobs(&second).unwrap().to_vec();
        let c: Vec<Blob> = rd.find_blobs(&first).unwrap().to_vec();

        assert_eq!(a, c);
        assert_eq!(sizes(&b), vec![1, 3]);
        assert_eq!(a[0].value(), 1);
    }

    #[test]
    fn set_size_is_idempotent_and_reallocates_on_change() {
        let mut rd = detector(2, 2);
        rd.set_size(2, 2).unwrap();
        rd.set_size(3, 1).unwrap();
        let blobs = rd.find_blobs(&[1, 1, 1]).unwrap();
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].size(), 3);
    }

    #[test]
    fn view_adopts_size_and_reports_frame_coordinates() {
        #[rustfmt::skip]
        let frame = [
            0, 0, 0, 0,
            0, 7, 7, 0,
            0, 7, 0, 0,
        ];
        let view = ImageView::new(&frame, 4, 3).unwrap();
        let roi = view.roi(Rect::new(1, 1, 3, 2)).unwrap();
        let mut rd = detector(10, 10);
        let blobs = rd.find_blobs_in_view(&roi).unwrap();

        let sevens: Vec<&Blob> = blobs.iter().filter(|b| b.value() == 7).collect();
        assert_eq!(sevens.len(), 1);
        assert_eq!(sevens[0].bounding_box(), Rect::new(1, 1, 2, 2));
        assert_eq!((rd.width(), rd.height()), (3, 2));
        assert!(rd.click(Point::new(2, 1)).is_some_and(|b| b.value() == 7));
        assert!(rd.click(Point::new(0, 0)).is_none());
    }

    #[test]
    fn region_graph_links_adjacent_blobs() {
        #[rustfmt::skip]
        let frame = [
            1, 1, 1, 1,
            1, 2, 3, 1,
            1, 1, 1, 1,
        ];
        let mut rd = detector(4, 3);
        rd.set_create_graph(true);
        let blobs = rd.find_blobs(&frame).unwrap();
        assert_eq!(blobs.len(), 3);

        let by_value = |v: u8| blobs.iter().find(|b| b.value() == v).unwrap();
        let ring = by_value(1);
        let two = by_value(2);
        let three = by_value(3);

        assert_eq!(ring.neighbours(), &[two.id, three.id]);
        assert_eq!(two.neighbours(), &[ring.id, three.id]);
        assert_eq!(three.neighbours(), &[ring.id, two.id]);
        assert!(ring.is_border_region());
        assert!(!two.is_border_region());

        assert_eq!(ring.parent(), None);
        assert_eq!(ring.sub_regions(), &[two.id, three.id]);
        assert_eq!(two.parent(), Some(ring.id));
        assert_eq!(three.parent(), Some(ring.id));
        assert!(two.sub_regions().is_empty());
    }

    #[test]
    fn wall_across_the_frame_encloses_nothing() {
        #[rustfmt::skip]
        let frame = [
            0, 0, 5, 0,
            0, 0, 5, 0,
            0, 0, 5, 0,
        ];
        let mut rd = detector(4, 3);
        rd.set_create_graph(true);
        let blobs = rd.find_blobs(&frame).unwrap();
        assert_eq!(blobs.len(), 3);
        assert!(blobs.iter().all(|b| b.parent().is_none() && b.sub_regions().is_empty()));
    }

    #[test]
    fn graph_is_empty_when_disabled() {
        let mut rd = detector(3, 3);
        let blobs = rd.find_blobs(&[1, 1, 1, 1, 2, 1, 1, 1, 1]).unwrap();
        assert!(blobs.iter().all(|b| b.neighbours().is_empty()));
        assert!(blobs.iter().all(|b| b.parent().is_none() && b.sub_regions().is_empty()));
    }
}
