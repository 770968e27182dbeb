// THEORY:
// A `Blob` is the final, user-facing result of the region detector: one
// maximal 4-connected region of equal pixel value that passed the size and
// value constraints. It is built once, at the end of a detection pass, from the
// runs of a representative `BlobPart`, and from then on it is independent of
// the detector's arenas.
//
// Key architectural principles:
// 1.  **Owned Data Container**: A `Blob` owns a copy of its runs. Callers can
//     keep blobs across frames; a new detection never changes a blob that was
//     already handed out.
// 2.  **Run-Based Features**: Everything a consumer usually asks for (bounding
//     box, centre of gravity, principal axes) is computed from the runs in
//     closed form, never by visiting single pixels.
// 3.  **Image-Dependent Features**: The contour trace needs the pixels again.
//     Those methods take the same `ImageView` the blob was detected in; the
//     caller has to keep that frame unchanged for as long as it wants them.
// 4.  **Per-Frame Identity Only**: `id` is the blob's index in the detector's
//     result list for the frame it came from. There is no identity across
//     frames at this layer.

use crate::core_modules::image_view::{ImageView, Point, Rect};
use crate::core_modules::scan_line::ScanLine;
use std::f64::consts::PI;

/// Principal axes of a region, from its second-order central moments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PcaInfo {
    /// Length of the major axis (twice the standard deviation along it).
    pub major_axis: f64,
    /// Length of the minor axis.
    pub minor_axis: f64,
    /// Orientation of the major axis in radians; 0 is along +x.
    pub major_angle: f64,
    /// Orientation of the minor axis in radians.
    pub minor_angle: f64,
}

/// A connected region detected in a single frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Blob {
    /// Index of this blob in the detector's result list. Not persistent.
    pub id: usize,
    /// Number of pixels in the region.
    size: u32,
    /// Mean pixel value of the region.
    value: u8,
    /// The smallest rectangle enclosing every pixel of the region.
    bounding_box: Rect,
    /// Centre of gravity in frame coordinates.
    center: (f64, f64),
    /// Whether the region touches the border of the scanned area.
    is_border: bool,
    /// The region's runs in frame coordinates.
    scan_lines: Vec<ScanLine>,
    /// Ids of adjacent blobs; filled only when the region graph is enabled.
    pub(crate) neighbours: Vec<usize>,
    /// Id of the closest enclosing blob; region graph only.
    pub(crate) parent: Option<usize>,
    /// Ids of the blobs this one directly encloses; region graph only.
    pub(crate) sub_regions: Vec<usize>,
}

impl Blob {
    /// Builds a blob from runs given in frame coordinates. `area` is the frame
    /// area that was scanned and decides the border flag.
    pub fn from_scan_lines(id: usize, scan_lines: Vec<ScanLine>, value: u8, area: Rect) -> Self {
        let mut min_x = u32::MAX;
        let mut min_y = u32::MAX;
        let mut max_x = 0;
        let mut max_y = 0;
        let mut size = 0u32;
        let mut sum_x = 0.0;
        let mut sum_y = 0.0;

        for line in &scan_lines {
            min_x = min_x.min(line.start);
            max_x = max_x.max(line.end);
            min_y = min_y.min(line.row);
            max_y = max_y.max(line.row);
            let len = line.width();
            size += len;
            sum_x += line.center_x() * len as f64;
            sum_y += line.row as f64 * len as f64;
        }

        let (bounding_box, center) = if size == 0 {
            (Rect::default(), (0.0, 0.0))
        } else {
            (
                Rect::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1),
                (sum_x / size as f64, sum_y / size as f64),
            )
        };

        let is_border = size > 0
            && (bounding_box.x == area.x
                || bounding_box.y == area.y
                || bounding_box.right() == area.right()
                || bounding_box.bottom() == area.bottom());

        Self {
            id,
            size,
            value,
            bounding_box,
            center,
            is_border,
            scan_lines,
            neighbours: Vec::new(),
            parent: None,
            sub_regions: Vec::new(),
        }
    }

    #[inline]
    pub fn size(&self) -> u32 {
        self.size
    }

    #[inline]
    pub fn value(&self) -> u8 {
        self.value
    }

    #[inline]
    pub fn bounding_box(&self) -> Rect {
        self.bounding_box
    }

    #[inline]
    pub fn center(&self) -> (f64, f64) {
        self.center
    }

    #[inline]
    pub fn is_border_region(&self) -> bool {
        self.is_border
    }

    pub fn scan_lines(&self) -> &[ScanLine] {
        &self.scan_lines
    }

    /// Ids of the blobs sharing an edge with this one.
    pub fn neighbours(&self) -> &[usize] {
        &self.neighbours
    }

    /// The blob directly enclosing this one.
    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    /// Ids of the blobs directly enclosed by this one, ascending.
    pub fn sub_regions(&self) -> &[usize] {
        &self.sub_regions
    }

    /// Ids of every blob enclosed by this one at any depth, ascending.
    /// `blobs` must be the list this blob was reported in.
    pub fn all_sub_regions(&self, blobs: &[Blob]) -> Vec<usize> {
        let mut all = Vec::new();
        let mut pending = self.sub_regions.clone();
        while let Some(id) = pending.pop() {
            all.push(id);
            pending.extend_from_slice(&blobs[id].sub_regions);
        }
        all.sort_unstable();
        all
    }

    /// Ids of the enclosing blobs, innermost first.
    /// `blobs` must be the list this blob was reported in.
    pub fn parent_tree(&self, blobs: &[Blob]) -> Vec<usize> {
        let mut tree = Vec::new();
        let mut current = self.parent;
        while let Some(id) = current {
            tree.push(id);
            current = blobs[id].parent;
        }
        tree
    }

    /// Every pixel of the region, run by run.
    pub fn pixels(&self) -> Vec<Point> {
        self.scan_lines
            .iter()
            .flat_map(|l| (l.start..=l.end).map(move |x| Point::new(x, l.row)))
            .collect()
    }

    pub fn contains(&self, point: Point) -> bool {
        self.bounding_box.contains(point)
            && self.scan_lines.iter().any(|l| l.contains(point.x, point.y))
    }

    /// Principal component analysis of the pixel positions.
    pub fn pca(&self) -> PcaInfo {
        let mut n = 0.0;
        let mut sum_x = 0.0;
        let mut sum_y = 0.0;
        let mut sum_xx = 0.0;
        let mut sum_yy = 0.0;
        let mut sum_xy = 0.0;

        for line in &self.scan_lines {
            let len = line.width() as f64;
            let y = line.row as f64;
            let start = line.start as f64;
            let end = line.end as f64;
            // Sums over k in [start, end] as differences of prefix sums.
            let xs = prefix_sum(end) - prefix_sum(start - 1.0);
            let xxs = prefix_sum_of_squares(end) - prefix_sum_of_squares(start - 1.0);

            n += len;
            sum_x += xs;
            sum_y += len * y;
            sum_xx += xxs;
            sum_yy += len * y * y;
            sum_xy += y * xs;
        }

        if n == 0.0 {
            return PcaInfo {
                major_axis: 0.0,
                minor_axis: 0.0,
                major_angle: 0.0,
                minor_angle: PI / 2.0,
            };
        }

        let avg_x = sum_x / n;
        let avg_y = sum_y / n;
        let sxx = sum_xx / n - avg_x * avg_x;
        let syy = sum_yy / n - avg_y * avg_y;
        let sxy = sum_xy / n - avg_x * avg_y;

        let p = 0.5 * (sxx + syy);
        let d = (0.25 * (sxx - syy) * (sxx - syy) + sxy * sxy).sqrt();
        let major_angle = (p + d - sxx).atan2(sxy);

        PcaInfo {
            major_axis: 2.0 * (p + d).max(0.0).sqrt(),
            minor_axis: 2.0 * (p - d).max(0.0).sqrt(),
            major_angle,
            minor_angle: major_angle + PI / 2.0,
        }
    }

    /// Topmost, then leftmost pixel of the region.
    pub fn start_pixel(&self) -> Option<Point> {
        self.scan_lines
            .iter()
            .min_by_key(|l| (l.row, l.start))
            .map(|l| Point::new(l.start, l.row))
    }

    /// Traces the outer contour with a 4-neighbour walk, clockwise from the
    /// start pixel. `view` must be the frame the blob was detected in.
    pub fn boundary(&self, view: &ImageView<'_>) -> Vec<Point> {
        let Some(start) = self.start_pixel() else {
            return Vec::new();
        };
        let Some(value) = view.get_frame(start) else {
            return Vec::new();
        };
        if self.size == 1 {
            return vec![start];
        }
        trace_contour(view, start, value)
    }

    /// The contour of `boundary` without the points that can be dropped
    /// while the rest stays 8-connected. Diagonal stretches become one pixel
    /// thick.
    pub fn thinned_boundary(&self, view: &ImageView<'_>) -> Vec<Point> {
        thin(&self.boundary(view))
    }

    pub fn boundary_point_count(&self, view: &ImageView<'_>, thinned: bool) -> usize {
        if thinned {
            self.thinned_boundary(view).len()
        } else {
            self.boundary(view).len()
        }
    }

    /// Estimated length of the contour. Every point of the thinned contour
    /// contributes by the slope through it: 1 between two straight steps,
    /// `sqrt(2)` between two diagonal ones and `sqrt(1.25)` otherwise.
    pub fn boundary_length(&self, view: &ImageView<'_>) -> f64 {
        contour_length(&self.thinned_boundary(view))
    }

    /// `U² / (4πA)` with `U` from `boundary_length`. Close to 1 for a disc,
    /// growing for ragged or elongated shapes.
    pub fn form_factor(&self, view: &ImageView<'_>) -> f64 {
        if self.size == 0 {
            return 0.0;
        }
        let u = self.boundary_length(view);
        u * u / (4.0 * PI * self.size as f64)
    }
}

fn touches(a: Point, b: Point) -> bool {
    a.x.abs_diff(b.x) <= 1 && a.y.abs_diff(b.y) <= 1
}

/// Skips every contour point whose successor is still an 8-neighbour of the
/// last kept point.
fn thin(boundary: &[Point]) -> Vec<Point> {
    let n = boundary.len();
    if n < 3 {
        return boundary.to_vec();
    }

    let mut last = boundary[0];
    let mut thinned = vec![last];
    let mut i = 2;
    while i < n {
        if !touches(boundary[i], last) {
            i -= 1;
        }
        last = boundary[i];
        thinned.push(last);
        i += 2;
    }
    if !touches(thinned[0], last) {
        thinned.push(boundary[n - 1]);
    }
    thinned
}

fn contour_length(points: &[Point]) -> f64 {
    const STEP: [f64; 3] = [1.0, 1.118_033_988_749_895, std::f64::consts::SQRT_2];

    let n = points.len();
    if n < 2 {
        return n as f64;
    }
    let diagonal = |a: Point, b: Point| a.x != b.x && a.y != b.y;
    (0..n)
        .map(|i| {
            let cur = points[i];
            let pre = points[(i + n - 1) % n];
            let post = points[(i + 1) % n];
            STEP[diagonal(pre, cur) as usize + diagonal(post, cur) as usize]
        })
        .sum()
}

/// sum(i=0..k) i
fn prefix_sum(k: f64) -> f64 {
    k * (k + 1.0) / 2.0
}

/// sum(i=0..k) i*i
fn prefix_sum_of_squares(k: f64) -> f64 {
    k * (k + 1.0) * (2.0 * k + 1.0) / 6.0
}

//     0
//   3 c 1
//     2
const DIR_X: [i64; 4] = [0, 1, 0, -1];
const DIR_Y: [i64; 4] = [-1, 0, 1, 0];

fn trace_contour(view: &ImageView<'_>, start: Point, value: u8) -> Vec<Point> {
    let origin = view.origin();
    let width = view.width() as i64;
    let height = view.height() as i64;

    // One step: the first matching neighbour, turning clockwise from `dir`.
    let step = |x: i64, y: i64, dir: usize| -> Option<(i64, i64, usize)> {
        (0..4).map(|k| (dir + k) % 4).find_map(|d| {
            let nx = x + DIR_X[d];
            let ny = y + DIR_Y[d];
            let inside = nx >= 0 && nx < width && ny >= 0 && ny < height;
            (inside && view.get(nx as u32, ny as u32) == value).then_some((nx, ny, (d + 3) % 4))
        })
    };
    let to_frame = |x: i64, y: i64| Point::new(x as u32 + origin.x, y as u32 + origin.y);

    let mut x = (start.x - origin.x) as i64;
    let mut y = (start.y - origin.y) as i64;
    let mut points = vec![start];

    let Some((nx, ny, dir)) = step(x, y, 0) else {
        return points;
    };
    let stop = (nx, ny, dir);
    (x, y) = (nx, ny);
    let mut dir = dir;

    loop {
        points.push(to_frame(x, y));
        let Some((nx, ny, nd)) = step(x, y, dir) else {
            break;
        };
        (x, y, dir) = (nx, ny, nd);
        if (x, y, dir) == stop {
            break;
        }
    }

    // The walk ends on the start pixel again.
    points.pop();
    points
}
