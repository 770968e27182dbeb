// THEORY:
// A `BlobPart` is a region that is still being assembled while the frame is
// scanned. Two parts that look unrelated at one row may turn out to be the same
// region a few rows later (think of the two arms of a "U"). Instead of walking
// back over the label grid to relabel everything the losing part already owns,
// parts form a disjoint-set forest:
//
// 1.  **Union by size**: `union` makes the larger part the representative and
//     splices the smaller part's runs and statistics into it. The absorbed part
//     is flagged `inside_other` and keeps a parent link to its new owner.
// 2.  **Path compression on read**: `find` follows parent links to the live
//     representative and shortens the path it walked. Stale label grid entries
//     therefore cost one lookup, never a rescan.
// 3.  **Arena storage**: Parts and runs both live in `Arena`s owned by the
//     forest and are addressed by `u32` handles. Nothing is freed per part; the
//     whole forest is reset between frames.

use crate::core_modules::arena::Arena;
use crate::core_modules::scan_line::{NONE, ScanLine};

/// An in-progress, mergeable aggregation of runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlobPart {
    /// Parent link; a representative points at itself.
    pub(crate) parent: u32,
    /// Number of pixels owned, including absorbed parts.
    pub size: u32,
    /// Sum of the values of every owned pixel.
    pub value_sum: u64,
    /// First owned run.
    pub(crate) head: u32,
    /// Last owned run, for O(1) splicing.
    pub(crate) tail: u32,
    /// Number of owned runs.
    pub line_count: u32,
    /// Set once this part has been absorbed by another one.
    pub inside_other: bool,
}

impl Default for BlobPart {
    fn default() -> Self {
        Self {
            parent: NONE,
            size: 0,
            value_sum: 0,
            head: NONE,
            tail: NONE,
            line_count: 0,
            inside_other: false,
        }
    }
}

impl BlobPart {
    /// Mean value of the owned pixels.
    pub fn mean_value(&self) -> u8 {
        if self.size == 0 {
            return 0;
        }
        (self.value_sum / self.size as u64) as u8
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        !self.inside_other
    }
}

/// The parts and runs of one frame, linked as a disjoint-set forest.
#[derive(Debug, Clone)]
pub struct BlobPartForest {
    parts: Arena<BlobPart>,
    lines: Arena<ScanLine>,
}

impl BlobPartForest {
    pub fn new(part_capacity: usize, line_capacity: usize) -> Self {
        Self {
            parts: Arena::new(part_capacity),
            lines: Arena::new(line_capacity),
        }
    }

    /// Forgets every part and run, keeping both arenas' storage.
    pub fn clear(&mut self) {
        self.parts.clear();
        self.lines.clear();
    }

    /// Starts a new, empty part.
    #[inline]
    pub fn new_part(&mut self) -> u32 {
        let index = self.parts.push(BlobPart::default());
        self.parts[index].parent = index;
        index
    }

    /// Emits `line` and appends it to the run list of `part`.
    /// `part` must be a representative.
    #[inline]
    pub fn attach(&mut self, part: u32, mut line: ScanLine) -> u32 {
        debug_assert!(self.parts[part].is_root());
        line.part = part;
        line.next = NONE;
        let len = line.width();
        let value = line.value as u64;
        let index = self.lines.push(line);

        let owner = &mut self.parts[part];
        let previous_tail = owner.tail;
        if owner.head == NONE {
            owner.head = index;
        }
        owner.tail = index;
        owner.size += len;
        owner.value_sum += value * len as u64;
        owner.line_count += 1;

        if previous_tail != NONE {
            self.lines[previous_tail].next = index;
        }
        index
    }

    /// Returns the representative of `part`, compressing the path to it.
    #[inline]
    pub fn find(&mut self, part: u32) -> u32 {
        let mut root = part;
        loop {
            let parent = self.parts[root].parent;
            if parent == root {
                break;
            }
            root = parent;
        }

        let mut current = part;
        while current != root {
            let parent = self.parts[current].parent;
            self.parts[current].parent = root;
            current = parent;
        }
        root
    }

    /// Representative lookup without path compression.
    pub fn find_const(&self, part: u32) -> u32 {
        let mut root = part;
        loop {
            let parent = self.parts[root].parent;
            if parent == root {
                return root;
            }
            root = parent;
        }
    }

    /// Unifies the sets holding `a` and `b` and returns the surviving
    /// representative. A union of a set with itself is a no-op.
    pub fn union(&mut self, a: u32, b: u32) -> u32 {
        let a = self.find(a);
        let b = self.find(b);
        if a == b {
            return a;
        }

        // Larger part survives; on a tie the older part keeps its identity.
        let (keep, absorb) = {
            let (sa, sb) = (self.parts[a].size, self.parts[b].size);
            if sa > sb || (sa == sb && a < b) { (a, b) } else { (b, a) }
        };
        self.absorb(keep, absorb);
        keep
    }

    /// Moves the runs and statistics of `other` into `into`.
    fn absorb(&mut self, into: u32, other: u32) {
        let donor = self.parts[other];
        {
            let absorbed = &mut self.parts[other];
            absorbed.parent = into;
            absorbed.inside_other = true;
            absorbed.head = NONE;
            absorbed.tail = NONE;
        }

        let previous_tail = {
            let owner = &mut self.parts[into];
            owner.size += donor.size;
            owner.value_sum += donor.value_sum;
            owner.line_count += donor.line_count;
            let previous_tail = owner.tail;
            if donor.head != NONE {
                if owner.head == NONE {
                    owner.head = donor.head;
                }
                owner.tail = donor.tail;
            }
            previous_tail
        };

        if previous_tail != NONE && donor.head != NONE {
            self.lines[previous_tail].next = donor.head;
        }
    }

    #[inline]
    pub fn part(&self, index: u32) -> &BlobPart {
        &self.parts[index]
    }

    /// All parts issued since the last `clear`, in issuance order.
    pub fn parts(&self) -> &[BlobPart] {
        self.parts.as_slice()
    }

    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    #[inline]
    pub fn line(&self, index: u32) -> &ScanLine {
        &self.lines[index]
    }

    /// Iterates over the runs owned by `part`.
    pub fn lines_of(&self, part: u32) -> PartLines<'_> {
        PartLines {
            lines: &self.lines,
            current: self.parts[part].head,
        }
    }
}

/// Iterator over the run list of one part.
pub struct PartLines<'a> {
    lines: &'a Arena<ScanLine>,
    current: u32,
}

impl<'a> Iterator for PartLines<'a> {
    type Item = &'a ScanLine;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current == NONE {
            return None;
        }
        let line = &self.lines[self.current];
        self.current = line.next;
        Some(line)
    }
}
