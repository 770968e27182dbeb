// THEORY:
// A `ScanLine` is one maximal run of identical pixel values inside a single
// image row. The detector never looks at individual pixels once a row has been
// cut into runs: merging, size accounting and every shape feature of a `Blob`
// are computed from these records.
//
// While a frame is being scanned, each run also carries two arena handles: the
// part it was first attached to and the next run of the same part. The latter
// turns the runs of a part into an intrusive singly linked list, so that
// merging two parts is an O(1) splice instead of a copy.

/// Marks the end of a run list or a missing arena handle.
pub(crate) const NONE: u32 = u32::MAX;

/// A maximal horizontal run of equal-valued pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanLine {
    /// The image row of the run.
    pub row: u32,
    /// First column of the run.
    pub start: u32,
    /// Last column of the run (inclusive).
    pub end: u32,
    /// The pixel value shared by every pixel of the run.
    pub value: u8,
    /// Part the run was attached to when it was emitted.
    pub(crate) part: u32,
    /// Next run owned by the same part.
    pub(crate) next: u32,
}

impl Default for ScanLine {
    fn default() -> Self {
        Self {
            row: 0,
            start: 0,
            end: 0,
            value: 0,
            part: NONE,
            next: NONE,
        }
    }
}

impl ScanLine {
    pub fn new(row: u32, start: u32, end: u32, value: u8) -> Self {
        debug_assert!(start <= end);
        Self {
            row,
            start,
            end,
            value,
            ..Self::default()
        }
    }

    /// Number of pixels covered by the run.
    #[inline]
    pub fn width(&self) -> u32 {
        self.end - self.start + 1
    }

    /// Horizontal centre of the run.
    #[inline]
    pub fn center_x(&self) -> f64 {
        (self.start as f64 + self.end as f64) * 0.5
    }

    #[inline]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        y == self.row && x >= self.start && x <= self.end
    }

    /// The same run moved by a frame offset.
    pub(crate) fn translated(&self, dx: u32, dy: u32) -> Self {
        Self {
            row: self.row + dy,
            start: self.start + dx,
            end: self.end + dx,
            value: self.value,
            part: NONE,
            next: NONE,
        }
    }
}
