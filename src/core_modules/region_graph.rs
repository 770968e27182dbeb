// THEORY:
// The `RegionGraph` describes how the regions of one frame sit next to and
// inside each other. It is built only when the region graph is enabled, and it
// spans every region of the frame, including the ones the size and value
// constraints later drop, so that filtering never changes what encloses what.
//
// Two regions are neighbours if they share an edge. A non-border region is a
// direct sub-region of a neighbour `outer` if it cannot reach the frame border
// without crossing `outer`. The search walks the neighbourhood from the inner
// region, never entering `outer`, and gives up as soon as it meets a border
// region or a region reaching beyond the bounding box of `outer`. A region
// whose only neighbour is `outer` is enclosed by it without any search.

use crate::core_modules::image_view::Rect;
use crate::core_modules::scan_line::NONE;

#[derive(Debug, Default)]
pub(crate) struct RegionGraph {
    bounds: Vec<Rect>,
    border: Vec<bool>,
    neighbours: Vec<Vec<u32>>,
    parent: Vec<u32>,
}

impl RegionGraph {
    pub fn clear(&mut self) {
        self.bounds.clear();
        self.border.clear();
        self.neighbours.clear();
        self.parent.clear();
    }

    /// Adds a region and returns its index.
    pub fn add_region(&mut self, bounds: Rect, border: bool) -> u32 {
        let index = self.bounds.len() as u32;
        self.bounds.push(bounds);
        self.border.push(border);
        self.neighbours.push(Vec::new());
        index
    }

    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    /// Records that two regions share an edge.
    pub fn link(&mut self, a: u32, b: u32) {
        if a != b {
            self.neighbours[a as usize].push(b);
            self.neighbours[b as usize].push(a);
        }
    }

    /// Neighbours of a region in ascending order. Valid after `finish`.
    pub fn neighbours(&self, region: u32) -> &[u32] {
        &self.neighbours[region as usize]
    }

    /// The region directly enclosing `region`, or `NONE`. Valid after `finish`.
    pub fn parent(&self, region: u32) -> u32 {
        self.parent[region as usize]
    }

    /// Deduplicates the neighbour lists and resolves which region encloses
    /// which. If two neighbours both enclose a region, the lower index wins.
    pub fn finish(&mut self) {
        for list in &mut self.neighbours {
            list.sort_unstable();
            list.dedup();
        }

        let count = self.len();
        self.parent.clear();
        self.parent.resize(count, NONE);
        let mut seen = vec![false; count];
        let mut stack = Vec::new();

        for outer in 0..count as u32 {
            for i in 0..self.neighbours[outer as usize].len() {
                let inner = self.neighbours[outer as usize][i];
                if self.parent[inner as usize] != NONE || self.border[inner as usize] {
                    continue;
                }
                if self.neighbours[inner as usize].len() == 1
                    || self.encloses(outer, inner, &mut seen, &mut stack)
                {
                    self.parent[inner as usize] = outer;
                }
            }
        }
    }

    fn encloses(&self, outer: u32, inner: u32, seen: &mut [bool], stack: &mut Vec<u32>) -> bool {
        let limit = self.bounds[outer as usize];
        let escapes =
            |r: u32| self.border[r as usize] || !limit.encloses(self.bounds[r as usize]);
        if escapes(inner) {
            return false;
        }

        seen.fill(false);
        seen[outer as usize] = true;
        seen[inner as usize] = true;
        stack.clear();
        stack.push(inner);

        while let Some(region) = stack.pop() {
            for &next in &self.neighbours[region as usize] {
                if seen[next as usize] {
                    continue;
                }
                if escapes(next) {
                    return false;
                }
                seen[next as usize] = true;
                stack.push(next);
            }
        }
        true
    }
}
