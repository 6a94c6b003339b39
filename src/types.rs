use std::hash::{Hash, Hasher};

use crate::triangulation::TriangulationError;
use crate::container::triangle_orientation;
use crate::utils::{circumcircle, Circle, Orientation};

#[cfg(not(feature = "f32"))]
pub mod f64;
#[cfg(not(feature = "f32"))]
pub use f64::*;

#[cfg(feature = "f32")]
pub mod f32;
#[cfg(feature = "f32")]
pub use f32::*;

#[cfg(not(feature = "u64_indexes"))]
pub mod u32;
#[cfg(not(feature = "u64_indexes"))]
pub use u32::IndexType;

#[cfg(feature = "u64_indexes")]
pub mod u64;
#[cfg(feature = "u64_indexes")]
pub use u64::IndexType;

pub mod vertex;
pub use vertex::Vertex2d;

pub type VertexId = IndexType;
pub type TriangleId = IndexType;

pub type TriangleVertexIndex = u8;
pub const VERT_1: TriangleVertexIndex = 0;
pub const VERT_2: TriangleVertexIndex = 1;
pub const VERT_3: TriangleVertexIndex = 2;

/// An edge between two vertices.
///
/// The edge remembers the direction it was created with (`from` -> `to`), but two edges
/// compare (and hash) equal as soon as they link the same two vertices, whatever their direction.
#[derive(Debug, Copy, Clone, Eq)]
pub struct Edge {
    pub from: VertexId,
    pub to: VertexId,
}
impl Edge {
    #[inline]
    pub fn new(from: VertexId, to: VertexId) -> Self {
        Self { from, to }
    }

    #[inline]
    pub fn reversed(&self) -> Edge {
        Edge::new(self.to, self.from)
    }

    /// Returns true if both edges link the same vertices in the same direction
    #[inline]
    pub fn directed_equals(&self, other: &Edge) -> bool {
        self.from == other.from && self.to == other.to
    }

    #[inline]
    fn sorted_ids(&self) -> (VertexId, VertexId) {
        if self.from <= self.to {
            (self.from, self.to)
        } else {
            (self.to, self.from)
        }
    }
}
impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        self.sorted_ids() == other.sorted_ids()
    }
}
impl Hash for Edge {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.sorted_ids().hash(state);
    }
}

/// A triangle referencing three vertices, always stored in a counter-clockwise order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriangleData {
    /// Triangle vertices indexes
    pub(crate) verts: [VertexId; 3],
}

impl TriangleData {
    /// Creates a triangle from 3 vertex ids, reordering them if needed so that the triangle is counter-clockwise.
    ///
    /// `vertices` are the input vertices: ids past their end are container vertices.
    ///
    /// Fails with [`TriangulationError::DegenerateGeometry`] if the vertices are collinear or coincident.
    pub fn new_ccw(
        verts: [VertexId; 3],
        vertices: &[Vertex],
    ) -> Result<Self, TriangulationError> {
        let [a, b, c] = verts;
        match triangle_orientation(verts, vertices) {
            Orientation::CounterClockwise => Ok(Self { verts: [a, b, c] }),
            Orientation::Clockwise => Ok(Self { verts: [a, c, b] }),
            Orientation::Colinear => Err(TriangulationError::DegenerateGeometry { verts }),
        }
    }

    #[inline]
    pub fn verts(&self) -> [VertexId; 3] {
        self.verts
    }

    #[inline]
    pub fn v1(&self) -> VertexId {
        self.verts[VERT_1 as usize]
    }
    #[inline]
    pub fn v2(&self) -> VertexId {
        self.verts[VERT_2 as usize]
    }
    #[inline]
    pub fn v3(&self) -> VertexId {
        self.verts[VERT_3 as usize]
    }

    #[inline]
    pub fn edge12(&self) -> Edge {
        Edge::new(self.v1(), self.v2())
    }
    #[inline]
    pub fn edge23(&self) -> Edge {
        Edge::new(self.v2(), self.v3())
    }
    #[inline]
    pub fn edge31(&self) -> Edge {
        Edge::new(self.v3(), self.v1())
    }

    /// Edges of the triangle, each one oriented counter-clockwise
    #[inline]
    pub fn edges(&self) -> [Edge; 3] {
        [self.edge12(), self.edge23(), self.edge31()]
    }

    #[inline]
    pub fn contains_vertex(&self, vertex_id: VertexId) -> bool {
        self.verts.contains(&vertex_id)
    }

    /// Circumcircle of the triangle, [None] if one of its vertices is a container vertex
    pub fn circumcircle(&self, vertices: &[Vertex]) -> Option<Circle> {
        let [v1, v2, v3] = self.verts.map(|v| vertices.get(v as usize).copied());
        circumcircle(v1?, v2?, v3?)
    }
}

/// Flat buffer of triangles. Triangle ids are indexes into the buffer and are not stable across removals.
#[derive(Clone, Debug, Default)]
pub struct Triangles {
    pub buffer: Vec<TriangleData>,
}
impl Triangles {
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn get(&self, id: TriangleId) -> &TriangleData {
        &self.buffer[id as usize]
    }

    #[inline]
    pub fn buffer(&self) -> &Vec<TriangleData> {
        &self.buffer
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.buffer.len()
    }
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
    #[inline]
    pub fn next_id(&self) -> TriangleId {
        self.buffer.len() as TriangleId
    }

    #[inline]
    pub fn push(&mut self, triangle: TriangleData) {
        self.buffer.push(triangle)
    }

    /// Removes the triangles with the given ids.
    ///
    /// `sorted_ids` MUST be sorted in ascending order and contain no duplicates.
    /// Removal is done by swap-remove from the highest id down, so that lower ids stay valid during the removal.
    pub fn remove_sorted(&mut self, sorted_ids: &[TriangleId]) {
        for &id in sorted_ids.iter().rev() {
            self.buffer.swap_remove(id as usize);
        }
    }
}

///////////////////////////////////////////////////////////
///                                                     ///
///                        Tests                        ///
///                                                     ///
///////////////////////////////////////////////////////////
