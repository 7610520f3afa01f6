//! Cross-source marker attributes on vertices.
//!
//! Ingestion leaves pending relationships on vertices:
//!
//! - `dupe=n<id>`: this vertex duplicates vertex `<id>`.
//! - `conn=w<id>,n<id>,…`: this vertex should be connected to the listed
//!   entities.
//!
//! When a merge makes a donor vertex redundant, references to it are
//! redirected to the retained kept-line vertex, and a `dupe` relation between
//! the two merged vertices is resolved by stripping the marker from both.
//! The redundant vertex's other attributes are then carried onto the
//! retained vertex wherever it lacks the key. Markers are not carried; they
//! stay on the vertex that was flagged.

use std::collections::BTreeMap;

use hashbrown::{HashMap, HashSet};

use crate::algs::correspondence::CorrespondenceSet;
use crate::data::store::LineStore;
use crate::data::tags::Tags;
use crate::topology::point::{EntityId, LineId, VertexId};

/// "this vertex duplicates …" marker.
pub const DUPE_KEY: &str = "dupe";
/// "this vertex connects to …" marker.
pub const CONN_KEY: &str = "conn";

const MARKER_KEYS: [&str; 2] = [DUPE_KEY, CONN_KEY];

/// Entity references in a marker value. Malformed items are skipped.
pub fn references(value: &str) -> Vec<EntityId> {
    value
        .split(',')
        .filter(|item| !item.trim().is_empty())
        .filter_map(|item| match item.parse::<EntityId>() {
            Ok(id) => Some(id),
            Err(e) => {
                log::debug!("ignoring marker item: {e}");
                None
            }
        })
        .collect()
}

/// Rewrite every reference in `value` found in `redirects`. Returns `None`
/// when nothing changed; malformed items are kept verbatim.
pub fn rewrite(value: &str, redirects: &HashMap<EntityId, EntityId>) -> Option<String> {
    let mut changed = false;
    let items: Vec<String> = value
        .split(',')
        .map(|item| match item.parse::<EntityId>().ok().and_then(|id| redirects.get(&id)) {
            Some(to) => {
                changed = true;
                to.to_string()
            }
            None => item.to_string(),
        })
        .collect();
    changed.then(|| items.join(","))
}

/// New tags for one vertex, plus the marker keys removed from it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagEdit {
    pub vertex: VertexId,
    pub tags: Tags,
    pub stripped: Vec<String>,
}

/// Compute the vertex tag edits implied by merging `donor` into `kept`,
/// sorted by vertex id.
pub fn plan_tag_edits(
    store: &LineStore,
    kept: LineId,
    donor: LineId,
    set: &CorrespondenceSet,
) -> Vec<TagEdit> {
    let mut redirects: HashMap<EntityId, EntityId> = HashMap::new();
    redirects.insert(EntityId::Line(donor), EntityId::Line(kept));
    let mut resolved: HashSet<VertexId> = HashSet::new();

    for pair in set.pairs().iter().filter(|p| !p.is_shared()) {
        let (k, d) = (pair.vertex_a, pair.vertex_b);
        redirects.insert(EntityId::Vertex(d), EntityId::Vertex(k));
        if dupe_points_at(store, k, d) || dupe_points_at(store, d, k) {
            resolved.insert(k);
            resolved.insert(d);
        }
    }

    // Pending tags per vertex; anything absent still has its stored tags.
    let mut working: BTreeMap<VertexId, (Tags, Vec<String>)> = BTreeMap::new();
    for vertex in store.vertices() {
        if vertex.deleted || !MARKER_KEYS.iter().any(|k| vertex.tags.contains_key(k)) {
            continue;
        }
        let mut tags = vertex.tags.clone();
        let mut stripped = Vec::new();
        if resolved.contains(&vertex.id) && tags.remove(DUPE_KEY).is_some() {
            stripped.push(DUPE_KEY.to_string());
        }
        for key in MARKER_KEYS {
            let rewritten = tags.get(key).and_then(|value| rewrite(value, &redirects));
            if let Some(value) = rewritten {
                tags.insert(key, value);
            }
        }
        if tags != vertex.tags {
            working.insert(vertex.id, (tags, stripped));
        }
    }

    for pair in set.pairs().iter().filter(|p| !p.is_shared()) {
        let (k, d) = (pair.vertex_a, pair.vertex_b);
        let Some(donor_tags) = current_tags(store, &working, d) else {
            continue;
        };
        let Some(mut kept_tags) = current_tags(store, &working, k) else {
            continue;
        };
        let mut carried = false;
        for (key, value) in donor_tags.iter() {
            if !MARKER_KEYS.contains(&key) && !kept_tags.contains_key(key) {
                kept_tags.insert(key, value);
                carried = true;
            }
        }
        if carried {
            working.entry(k).or_default().0 = kept_tags;
        }
    }

    working
        .into_iter()
        .filter(|(id, (tags, _))| store.vertex(*id).is_some_and(|v| &v.tags != tags))
        .map(|(vertex, (tags, stripped))| TagEdit {
            vertex,
            tags,
            stripped,
        })
        .collect()
}

fn current_tags(
    store: &LineStore,
    working: &BTreeMap<VertexId, (Tags, Vec<String>)>,
    id: VertexId,
) -> Option<Tags> {
    match working.get(&id) {
        Some((tags, _)) => Some(tags.clone()),
        None => store.vertex(id).map(|v| v.tags.clone()),
    }
}

fn dupe_points_at(store: &LineStore, from: VertexId, to: VertexId) -> bool {
    store
        .vertex(from)
        .and_then(|v| v.tags.get(DUPE_KEY))
        .is_some_and(|value| references(value).contains(&EntityId::Vertex(to)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::correspondence::CorrespondencePair;
    use crate::geometry::LatLon;

    fn vid(raw: u64) -> VertexId {
        VertexId::new(raw).unwrap()
    }

    fn lid(raw: u64) -> LineId {
        LineId::new(raw).unwrap()
    }

    #[test]
    fn parse_and_rewrite_values() {
        assert_eq!(
            references("w1, n2,bogus,n3"),
            vec![
                EntityId::Line(lid(1)),
                EntityId::Vertex(vid(2)),
                EntityId::Vertex(vid(3))
            ]
        );
        let redirects: HashMap<_, _> = [(EntityId::Vertex(vid(2)), EntityId::Vertex(vid(9)))]
            .into_iter()
            .collect();
        assert_eq!(rewrite("w1,n2,x", &redirects).as_deref(), Some("w1,n9,x"));
        assert_eq!(rewrite("n3", &redirects), None);
    }

    #[test]
    fn dupe_between_merged_vertices_is_stripped_and_attributes_carried() {
        let mut s = LineStore::new();
        s.add_vertex(vid(1), LatLon::new(0.0, 0.0), Tags::new()).unwrap();
        s.add_vertex(vid(2), LatLon::new(0.0, 0.0), Tags::parse("dupe=n1 highway=stop"))
            .unwrap();
        s.add_vertex(vid(3), LatLon::new(1.0, 1.0), Tags::parse("conn=w20,n2")).unwrap();
        s.add_vertex(vid(4), LatLon::new(1.0, 1.0), Tags::parse("dupe=n5")).unwrap();
        s.add_line(lid(10), vec![vid(1)], Tags::new()).unwrap();
        s.add_line(lid(20), vec![vid(2)], Tags::new()).unwrap();
        let set = CorrespondenceSet::new(vec![CorrespondencePair::new(0, vid(1), 0, vid(2))]);

        let edits = plan_tag_edits(&s, lid(10), lid(20), &set);
        assert_eq!(edits.len(), 3);
        assert_eq!(edits[0].vertex, vid(1));
        assert_eq!(edits[0].tags, Tags::parse("highway=stop"));
        assert!(edits[0].stripped.is_empty());
        assert_eq!(edits[1].vertex, vid(2));
        assert_eq!(edits[1].stripped, vec![DUPE_KEY.to_string()]);
        assert_eq!(edits[1].tags, Tags::parse("highway=stop"));
        assert_eq!(edits[2].vertex, vid(3));
        assert_eq!(edits[2].tags.get(CONN_KEY), Some("w10,n1"));
        assert!(edits[2].stripped.is_empty());
    }

    #[test]
    fn kept_values_win_over_donor_values() {
        let mut s = LineStore::new();
        s.add_vertex(vid(1), LatLon::new(0.0, 0.0), Tags::parse("highway=stop"))
            .unwrap();
        s.add_vertex(vid(2), LatLon::new(0.0, 0.0), Tags::parse("highway=give_way ref=7"))
            .unwrap();
        s.add_vertex(vid(3), LatLon::new(0.0, 0.0), Tags::parse("name=shared")).unwrap();
        s.add_line(lid(10), vec![vid(1), vid(3)], Tags::new()).unwrap();
        s.add_line(lid(20), vec![vid(2), vid(3)], Tags::new()).unwrap();
        let set = CorrespondenceSet::new(vec![
            CorrespondencePair::new(0, vid(1), 0, vid(2)),
            CorrespondencePair::new(1, vid(3), 1, vid(3)),
        ]);

        let edits = plan_tag_edits(&s, lid(10), lid(20), &set);
        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].vertex, vid(1));
        assert_eq!(edits[0].tags, Tags::parse("highway=stop ref=7"));
    }
}
