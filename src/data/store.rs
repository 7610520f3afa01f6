//! `LineStore`: arena of shared vertices and the lines referencing them.
//!
//! Vertices are owned by the store and addressed by [`VertexId`]; a line only
//! holds an ordered list of ids, so any number of lines can share a vertex.
//! Nothing is ever garbage-collected: a vertex disappears only when it is
//! explicitly marked deleted.
//!
//! Every geometry change recomputes the line's cached envelope and re-files it
//! in the internal [`GridIndex`], which backs the store's [`SpatialIndex`]
//! implementation.

use hashbrown::HashMap;

use crate::config::ConflateConfig;
use crate::conflate_error::ConflateError;
use crate::data::tags::Tags;
use crate::debug_invariants::DebugInvariants;
use crate::geometry::{BBox, LatLon};
use crate::spatial::{GridIndex, SpatialIndex};
use crate::topology::point::{EntityId, LineId, VertexId};

/// A point entity, shared by any number of lines.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Vertex {
    pub id: VertexId,
    pub coord: LatLon,
    pub tags: Tags,
    pub deleted: bool,
}

/// An ordered polyline of vertex handles.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Line {
    pub id: LineId,
    vertices: Vec<VertexId>,
    pub tags: Tags,
    pub deleted: bool,
    /// Derived from `vertices`; `None` for a line without vertices.
    envelope: Option<BBox>,
}

impl Line {
    #[inline]
    pub fn vertices(&self) -> &[VertexId] {
        &self.vertices
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    #[inline]
    pub fn envelope(&self) -> Option<&BBox> {
        self.envelope.as_ref()
    }
}

/// Arena of vertices and lines with an always-current spatial index.
#[derive(Clone, Debug)]
pub struct LineStore {
    vertices: HashMap<VertexId, Vertex>,
    lines: HashMap<LineId, Line>,
    /// Insertion order of lines; the sweep walks lines in this order.
    order: Vec<LineId>,
    rank: HashMap<LineId, usize>,
    index: GridIndex,
}

impl Default for LineStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LineStore {
    /// Creates an empty store with the default index cell size.
    pub fn new() -> Self {
        Self::with_cell_degrees(crate::config::DEFAULT_INDEX_CELL_DEGREES)
    }

    /// Creates an empty store whose spatial index uses `cell_degrees` cells.
    pub fn with_cell_degrees(cell_degrees: f64) -> Self {
        Self {
            vertices: HashMap::new(),
            lines: HashMap::new(),
            order: Vec::new(),
            rank: HashMap::new(),
            index: GridIndex::new(cell_degrees),
        }
    }

    /// Creates an empty store sized by `config.index_cell_degrees`, after
    /// validating the whole config.
    pub fn from_config(config: &ConflateConfig) -> Result<Self, ConflateError> {
        config.validate()?;
        Ok(Self::with_cell_degrees(config.index_cell_degrees))
    }

    /// Cell edge of the spatial index, in degrees.
    pub fn cell_degrees(&self) -> f64 {
        self.index.cell_degrees()
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn num_lines(&self) -> usize {
        self.lines.len()
    }

    // ---------------------------------------------------------------------
    // Ingestion
    // ---------------------------------------------------------------------

    /// Adds a vertex. Fails if the id is taken or the coordinate is not a
    /// valid latitude/longitude.
    pub fn add_vertex(&mut self, id: VertexId, coord: LatLon, tags: Tags) -> Result<(), ConflateError> {
        if !coord.is_valid() {
            return Err(ConflateError::InvalidCoordinate {
                vertex: id,
                lat: coord.lat,
                lon: coord.lon,
            });
        }
        if self.vertices.contains_key(&id) {
            return Err(ConflateError::DuplicateEntity(EntityId::Vertex(id)));
        }
        self.vertices.insert(
            id,
            Vertex {
                id,
                coord,
                tags,
                deleted: false,
            },
        );
        Ok(())
    }

    /// Adds a line over existing vertices. Fails if the id is taken or any
    /// vertex is unknown.
    pub fn add_line(&mut self, id: LineId, vertices: Vec<VertexId>, tags: Tags) -> Result<(), ConflateError> {
        if self.lines.contains_key(&id) {
            return Err(ConflateError::DuplicateEntity(EntityId::Line(id)));
        }
        let envelope = self.envelope_of(&vertices)?;
        if let Some(bbox) = envelope {
            self.index.insert(id, bbox);
        }
        self.lines.insert(
            id,
            Line {
                id,
                vertices,
                tags,
                deleted: false,
                envelope,
            },
        );
        self.rank.insert(id, self.order.len());
        self.order.push(id);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertices.get(&id)
    }

    pub fn line(&self, id: LineId) -> Option<&Line> {
        self.lines.get(&id)
    }

    pub fn try_vertex(&self, id: VertexId) -> Result<&Vertex, ConflateError> {
        self.vertices.get(&id).ok_or(ConflateError::MissingVertex(id))
    }

    pub fn try_line(&self, id: LineId) -> Result<&Line, ConflateError> {
        self.lines.get(&id).ok_or(ConflateError::MissingLine(id))
    }

    /// Line ids in insertion order (deleted lines included).
    pub fn line_ids(&self) -> &[LineId] {
        &self.order
    }

    /// Lines in insertion order (deleted lines included).
    pub fn lines(&self) -> impl Iterator<Item = &Line> + '_ {
        self.order.iter().filter_map(|id| self.lines.get(id))
    }

    /// All vertices sorted by id.
    pub fn vertices(&self) -> Vec<&Vertex> {
        let mut out: Vec<&Vertex> = self.vertices.values().collect();
        out.sort_unstable_by_key(|v| v.id);
        out
    }

    /// Position of `id` in insertion order, used to sort query results stably.
    pub fn insertion_rank(&self, id: LineId) -> Option<usize> {
        self.rank.get(&id).copied()
    }

    /// Coordinates of a line's vertices, in order.
    pub fn line_coords(&self, id: LineId) -> Result<Vec<LatLon>, ConflateError> {
        self.try_line(id)?
            .vertices
            .iter()
            .map(|&v| self.try_vertex(v).map(|vx| vx.coord))
            .collect()
    }

    fn envelope_of(&self, vertices: &[VertexId]) -> Result<Option<BBox>, ConflateError> {
        let coords = vertices
            .iter()
            .map(|&v| self.try_vertex(v).map(|vx| vx.coord))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(BBox::from_coords(coords))
    }

    // ---------------------------------------------------------------------
    // Mutation primitives
    // ---------------------------------------------------------------------

    /// Replaces a line's vertex sequence, returning the previous one.
    pub fn set_line_vertices(
        &mut self,
        id: LineId,
        vertices: Vec<VertexId>,
    ) -> Result<Vec<VertexId>, ConflateError> {
        let envelope = self.envelope_of(&vertices)?;
        let line = self.lines.get_mut(&id).ok_or(ConflateError::MissingLine(id))?;
        line.envelope = envelope;
        let previous = std::mem::replace(&mut line.vertices, vertices);
        match envelope {
            Some(bbox) => self.index.insert(id, bbox),
            None => {
                self.index.remove(id);
            }
        }
        Ok(previous)
    }

    /// Sets a line's deleted flag, returning the previous value.
    pub fn set_line_deleted(&mut self, id: LineId, deleted: bool) -> Result<bool, ConflateError> {
        let line = self.lines.get_mut(&id).ok_or(ConflateError::MissingLine(id))?;
        Ok(std::mem::replace(&mut line.deleted, deleted))
    }

    /// Sets a vertex's deleted flag, returning the previous value.
    pub fn set_vertex_deleted(&mut self, id: VertexId, deleted: bool) -> Result<bool, ConflateError> {
        let vertex = self.vertices.get_mut(&id).ok_or(ConflateError::MissingVertex(id))?;
        Ok(std::mem::replace(&mut vertex.deleted, deleted))
    }

    /// Replaces a vertex's tags, returning the previous map.
    pub fn replace_vertex_tags(&mut self, id: VertexId, tags: Tags) -> Result<Tags, ConflateError> {
        let vertex = self.vertices.get_mut(&id).ok_or(ConflateError::MissingVertex(id))?;
        Ok(std::mem::replace(&mut vertex.tags, tags))
    }
}

impl SpatialIndex for LineStore {
    fn search_lines(&self, bbox: &BBox) -> Vec<LineId> {
        self.index.query(bbox)
    }
}

impl DebugInvariants for LineStore {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "LineStore");
    }

    fn validate_invariants(&self) -> Result<(), ConflateError> {
        for id in &self.order {
            let line = self.try_line(*id)?;
            let envelope = self.envelope_of(&line.vertices)?;
            if envelope != line.envelope {
                return Err(ConflateError::StaleEnvelope(*id));
            }
            if envelope.is_some() && self.index.envelope(*id) != envelope.as_ref() {
                return Err(ConflateError::UnindexedLine(*id));
            }
        }
        Ok(())
    }
}
