//! Grid-based spatial index over line envelopes.
//!
//! # Algorithm
//!
//! 1. Divide degree space into uniform square cells of `cell_degrees`.
//! 2. Each line is stored in every cell its envelope overlaps.
//! 3. A box query collects the lines from every cell the box overlaps and
//!    keeps those whose envelope really intersects the box.
//!
//! Updates re-file a line under its new envelope, so the index stays current
//! while a sweep extends kept lines and deletes donors.

use hashbrown::{HashMap, HashSet};

use crate::geometry::BBox;
use crate::topology::point::LineId;

/// Guards against pathological envelopes spanning millions of cells.
const MAX_CELLS_PER_AXIS: i64 = 4096;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct CellCoord {
    x: i64,
    y: i64,
}

/// Uniform grid of line ids keyed by cell.
#[derive(Clone, Debug)]
pub struct GridIndex {
    cell_degrees: f64,
    inv_cell: f64,
    cells: HashMap<CellCoord, Vec<LineId>>,
    envelopes: HashMap<LineId, BBox>,
    /// Lines whose envelope spans too many cells; always scanned.
    oversized: HashSet<LineId>,
}

impl GridIndex {
    /// Create an empty index. Non-positive or non-finite sizes fall back to
    /// [`crate::config::DEFAULT_INDEX_CELL_DEGREES`].
    pub fn new(cell_degrees: f64) -> Self {
        let cell_degrees = if cell_degrees.is_finite() && cell_degrees > 0.0 {
            cell_degrees
        } else {
            crate::config::DEFAULT_INDEX_CELL_DEGREES
        };
        Self {
            cell_degrees,
            inv_cell: 1.0 / cell_degrees,
            cells: HashMap::new(),
            envelopes: HashMap::new(),
            oversized: HashSet::new(),
        }
    }

    #[inline]
    pub fn cell_degrees(&self) -> f64 {
        self.cell_degrees
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.envelopes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.envelopes.is_empty()
    }

    /// Envelope the line is currently filed under.
    pub fn envelope(&self, line: LineId) -> Option<&BBox> {
        self.envelopes.get(&line)
    }

    fn cell_range(&self, bbox: &BBox) -> Option<(CellCoord, CellCoord)> {
        let lo = CellCoord {
            x: (bbox.min_lon * self.inv_cell).floor() as i64,
            y: (bbox.min_lat * self.inv_cell).floor() as i64,
        };
        let hi = CellCoord {
            x: (bbox.max_lon * self.inv_cell).floor() as i64,
            y: (bbox.max_lat * self.inv_cell).floor() as i64,
        };
        let small = hi.x - lo.x < MAX_CELLS_PER_AXIS && hi.y - lo.y < MAX_CELLS_PER_AXIS;
        small.then_some((lo, hi))
    }

    /// Insert or re-file `line` under `bbox`.
    pub fn insert(&mut self, line: LineId, bbox: BBox) {
        self.remove(line);
        match self.cell_range(&bbox) {
            Some((lo, hi)) => {
                for x in lo.x..=hi.x {
                    for y in lo.y..=hi.y {
                        self.cells.entry(CellCoord { x, y }).or_default().push(line);
                    }
                }
            }
            None => {
                self.oversized.insert(line);
            }
        }
        self.envelopes.insert(line, bbox);
    }

    /// Drop `line` from the index. Returns its previous envelope.
    pub fn remove(&mut self, line: LineId) -> Option<BBox> {
        let bbox = self.envelopes.remove(&line)?;
        if !self.oversized.remove(&line) {
            if let Some((lo, hi)) = self.cell_range(&bbox) {
                for x in lo.x..=hi.x {
                    for y in lo.y..=hi.y {
                        let key = CellCoord { x, y };
                        if let Some(ids) = self.cells.get_mut(&key) {
                            ids.retain(|&l| l != line);
                            if ids.is_empty() {
                                self.cells.remove(&key);
                            }
                        }
                    }
                }
            }
        }
        Some(bbox)
    }

    /// Lines whose envelope intersects `bbox`, each reported once, unordered.
    pub fn query(&self, bbox: &BBox) -> Vec<LineId> {
        let mut seen: HashSet<LineId> = HashSet::new();
        let mut hits = Vec::new();
        let mut consider = |line: LineId| {
            if seen.insert(line)
                && self
                    .envelopes
                    .get(&line)
                    .is_some_and(|env| env.intersects(bbox))
            {
                hits.push(line);
            }
        };
        match self.cell_range(bbox) {
            Some((lo, hi)) => {
                for x in lo.x..=hi.x {
                    for y in lo.y..=hi.y {
                        if let Some(ids) = self.cells.get(&CellCoord { x, y }) {
                            ids.iter().copied().for_each(&mut consider);
                        }
                    }
                }
            }
            // The query itself is oversized: fall back to a full scan.
            None => self.envelopes.keys().copied().for_each(&mut consider),
        }
        self.oversized.iter().copied().for_each(&mut consider);
        hits
    }
}
