#![allow(dead_code)]
use line_sieve::prelude::*;

pub fn vid(u: u64) -> VertexId {
    VertexId::new(u).unwrap()
}

pub fn lid(u: u64) -> LineId {
    LineId::new(u).unwrap()
}

/// Id offset of the donor twin of a track vertex.
pub const TWIN: u64 = 100;

/// Track spacing in degrees, about 11 m at the equator.
pub const STEP: f64 = 1e-4;

/// Position `i` on an east-west track along the equator.
pub fn track(i: u64) -> LatLon {
    LatLon::new(0.0, i as f64 * STEP)
}

/// Vertices `1..=n` on the track, plus a twin `TWIN + i` at each position:
/// a second source's copy of the same point.
pub fn track_store(n: u64) -> LineStore {
    let mut s = LineStore::new();
    for i in 1..=n {
        s.add_vertex(vid(i), track(i), Tags::new()).unwrap();
        s.add_vertex(vid(TWIN + i), track(i), Tags::new()).unwrap();
    }
    s
}

pub fn add_line(s: &mut LineStore, id: u64, vertices: &[u64]) {
    add_line_tagged(s, id, vertices, "");
}

pub fn add_line_tagged(s: &mut LineStore, id: u64, vertices: &[u64], tags: &str) {
    s.add_line(lid(id), vertices.iter().map(|&v| vid(v)).collect(), Tags::parse(tags))
        .unwrap();
}

/// Raw vertex ids of a line.
pub fn ids(s: &LineStore, line: u64) -> Vec<u64> {
    s.line(lid(line))
        .unwrap()
        .vertices()
        .iter()
        .map(|v| v.get())
        .collect()
}

pub fn is_deleted(s: &LineStore, line: u64) -> bool {
    s.line(lid(line)).unwrap().deleted
}

/// Everything observable about a store, for before/after comparisons.
pub fn snapshot(s: &LineStore) -> (Vec<Line>, Vec<Vertex>) {
    (
        s.lines().cloned().collect(),
        s.vertices().into_iter().cloned().collect(),
    )
}
