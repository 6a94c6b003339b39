//! Container triangle wrapping the input vertices.
//!
//! The container vertices have no coordinates. With `n` input vertices, the container vertices have the ids
//! `n`, `n + 1` and `n + 2` and stand for the points `(-M, -M²)`, `(M, -M²)` and `(0, M²)`, with `M` arbitrarily large.
//! Predicates involving them are evaluated in the limit `M → ∞`, from the sign of the dominant term of
//! the exact determinant. Only comparisons between input coordinates remain, so these predicates are exact too.
//!
//! Circumcircles through container vertices degenerate into half-planes, which never contain a triangle
//! between input vertices: the container can't remove any of them, whatever the shape or the scale of the input.

use crate::{
    triangulation::TriangulationError,
    types::{Float, TriangleData, Vertex, VertexId},
    utils::{is_vertex_in_triangle_circumcircle, triplet_orientation, Orientation},
};

#[cfg(feature = "profile_traces")]
use tracing::{span, Level};

pub const CONTAINER_VERTICES_COUNT: usize = 3;

/// Axis-aligned bounding box of a set of vertices
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BoundingBox {
    pub min: Vertex,
    pub max: Vertex,
}
impl BoundingBox {
    /// Returns [None] if `vertices` is empty
    pub fn from_vertices(vertices: &[Vertex]) -> Option<Self> {
        let first = *vertices.first()?;
        let (mut min, mut max) = (first, first);
        for vertex in vertices.iter().skip(1) {
            min = min.min(*vertex);
            max = max.max(*vertex);
        }
        Some(Self { min, max })
    }

    #[inline]
    pub fn width(&self) -> Float {
        self.max.x - self.min.x
    }

    #[inline]
    pub fn height(&self) -> Float {
        self.max.y - self.min.y
    }

    /// Largest side of the box, or 1 if the box is a single point.
    ///
    /// Used as the unit length of relative tolerances.
    #[inline]
    pub fn extent(&self) -> Float {
        let extent = self.width().max(self.height());
        if extent > 0. {
            extent
        } else {
            1.
        }
    }
}

/// The super-triangle wrapping all the vertices to triangulate
#[derive(Debug, Clone)]
pub struct ContainerTriangle {
    pub triangle: TriangleData,
    /// Id of the first container vertex, which is also the count of input vertices.
    /// The 3 container vertices are the only ones with an id `>=` to this one.
    pub min_container_vertex_id: VertexId,
    /// Bounds of the input vertices
    pub bounds: BoundingBox,
}
impl ContainerTriangle {
    /// Creates the container triangle of `vertices`. This triangle initially defines a Delaunay triangulation
    /// which is comprised of a single triangle.
    ///
    /// Fails with [TriangulationError::EmptyInput] if `vertices` is empty.
    pub fn new(vertices: &[Vertex]) -> Result<Self, TriangulationError> {
        #[cfg(feature = "profile_traces")]
        let _span = span!(Level::TRACE, "container_triangle").entered();

        let bounds = BoundingBox::from_vertices(vertices).ok_or(TriangulationError::EmptyInput)?;

        let min_container_vertex_id = vertices.len() as VertexId;
        let triangle = TriangleData::new_ccw(
            [
                min_container_vertex_id,
                min_container_vertex_id + 1,
                min_container_vertex_id + 2,
            ],
            vertices,
        )?;

        Ok(Self {
            triangle,
            min_container_vertex_id,
            bounds,
        })
    }

    #[inline]
    pub fn is_container_vertex(&self, vertex_id: VertexId) -> bool {
        vertex_id >= self.min_container_vertex_id
    }
}

/// Index (0, 1 or 2) of `vertex_id` in the container triangle, [None] for an input vertex.
#[inline(always)]
fn container_index(vertex_id: VertexId, vertices: &[Vertex]) -> Option<usize> {
    (vertex_id as usize).checked_sub(vertices.len())
}

/// Exact sign of `a - b`
#[inline(always)]
fn sign_of_difference(a: Float, b: Float) -> i8 {
    if a > b {
        1
    } else if a < b {
        -1
    } else {
        0
    }
}

#[inline(always)]
fn orientation_from_sign(sign: i8) -> Orientation {
    match sign {
        1 => Orientation::CounterClockwise,
        -1 => Orientation::Clockwise,
        _ => Orientation::Colinear,
    }
}

/// Orientation of the triangle `verts`, any of them may be a container vertex.
///
/// `vertices` are the input vertices only.
pub fn triangle_orientation(verts: [VertexId; 3], vertices: &[Vertex]) -> Orientation {
    #[cfg(feature = "more_profile_traces")]
    let _span = span!(Level::TRACE, "triangle_orientation").entered();

    let [a, b, c] = verts;
    if a == b || b == c || c == a {
        return Orientation::Colinear;
    }
    let v = |id: VertexId| vertices[id as usize];
    // Cyclic rotations of the triangle keep its orientation
    match verts.map(|id| container_index(id, vertices)) {
        [None, None, None] => triplet_orientation(v(a), v(b), v(c)),
        [None, None, Some(k)] => orientation_with_container_vertex(v(a), v(b), k),
        [Some(k), None, None] => orientation_with_container_vertex(v(b), v(c), k),
        [None, Some(k), None] => orientation_with_container_vertex(v(c), v(a), k),
        [None, Some(i), Some(j)] | [Some(j), None, Some(i)] | [Some(i), Some(j), None] => {
            orientation_of_container_vertices(i, j)
        }
        [Some(i), Some(j), Some(_)] => orientation_of_container_vertices(i, j),
    }
}

/// Orientation of `(a, b, container vertex k)`
fn orientation_with_container_vertex(a: Vertex, b: Vertex, k: usize) -> Orientation {
    let dx = sign_of_difference(b.x, a.x);
    let dy = sign_of_difference(b.y, a.y);
    let sign = match (k, dx) {
        // (0, M²): M² (b.x - a.x) + a.x (b.y - a.y) when a.x == b.x
        (2, 0) => sign_of_difference(a.x, 0.) * dy,
        (2, _) => dx,
        // (-M, -M²): -M² (b.x - a.x) + M (b.y - a.y) + ...
        (0, 0) => dy,
        // (M, -M²): -M² (b.x - a.x) - M (b.y - a.y) + ...
        (_, 0) => -dy,
        _ => -dx,
    };
    orientation_from_sign(sign)
}

/// Orientation of `(a, container vertex i, container vertex j)`, which is also the one of the
/// container triangle `(i, j, k)`. The container vertices 0, 1, 2 are in counter-clockwise order.
#[inline]
fn orientation_of_container_vertices(i: usize, j: usize) -> Orientation {
    if j == (i + 1) % CONTAINER_VERTICES_COUNT {
        Orientation::CounterClockwise
    } else {
        Orientation::Clockwise
    }
}

/// Checks if vertex `p` is strictly inside the circumcircle of the counter-clockwise triangle `verts`,
/// any of them may be a container vertex.
///
/// `vertices` are the input vertices only. A vertex exactly on the circumcircle is considered outside of it.
pub fn is_vertex_in_circumcircle(verts: [VertexId; 3], vertices: &[Vertex], p: Vertex) -> bool {
    #[cfg(feature = "more_profile_traces")]
    let _span = span!(Level::TRACE, "is_vertex_in_circumcircle").entered();

    let [a, b, c] = verts;
    let v = |id: VertexId| vertices[id as usize];
    match verts.map(|id| container_index(id, vertices)) {
        [None, None, None] => is_vertex_in_triangle_circumcircle(&[v(a), v(b), v(c)], p),
        [None, None, Some(_)] => is_vertex_in_half_plane_1(v(a), v(b), p),
        [Some(_), None, None] => is_vertex_in_half_plane_1(v(b), v(c), p),
        [None, Some(_), None] => is_vertex_in_half_plane_1(v(c), v(a), p),
        // Counter-clockwise: the second container vertex follows the first one
        [None, Some(i), Some(_)] => is_vertex_in_half_plane_2(v(a), i, p),
        [Some(_), None, Some(i)] => is_vertex_in_half_plane_2(v(b), i, p),
        [Some(i), Some(_), None] => is_vertex_in_half_plane_2(v(c), i, p),
        // The container circumcircle contains every input vertex
        [Some(_), Some(_), Some(_)] => true,
    }
}

/// Circumcircle of `(a, b, container vertex)`: the open half-plane on the left of `a -> b`.
/// Vertices on the line `(a, b)` are inside if they are strictly between `a` and `b`.
fn is_vertex_in_half_plane_1(a: Vertex, b: Vertex, p: Vertex) -> bool {
    match triplet_orientation(a, b, p) {
        Orientation::CounterClockwise => true,
        Orientation::Clockwise => false,
        Orientation::Colinear => {
            let (a, b, p) = if a.x != b.x {
                (a.x, b.x, p.x)
            } else {
                (a.y, b.y, p.y)
            };
            (a < p && p < b) || (b < p && p < a)
        }
    }
}

/// Circumcircle of `(a, container vertex i, container vertex i + 1)`: a half-plane bounded by a line through `a`.
fn is_vertex_in_half_plane_2(a: Vertex, i: usize, p: Vertex) -> bool {
    match i {
        // (-M, -M²) and (M, -M²): below `a`, then closer to the symmetry axis x = 0
        0 => p.y < a.y || (p.y == a.y && p.x.abs() < a.x.abs()),
        // (M, -M²) and (0, M²): right of `a`, then above
        1 => p.x > a.x || (p.x == a.x && p.y > a.y),
        // (0, M²) and (-M, -M²): left of `a`, then above
        _ => p.x < a.x || (p.x == a.x && p.y > a.y),
    }
}

///////////////////////////////////////////////////////////
///                                                     ///
///                        Tests                        ///
///                                                     ///
///////////////////////////////////////////////////////////
