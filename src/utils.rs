//! Geometric predicates.
//!
//! Orientation and circumcircle tests are evaluated with adaptive precision arithmetic
//! ([robust]), so their sign is always exact. The tolerance is the same for both predicates: zero.
//! - A null orientation determinant means the three vertices are [Orientation::Colinear].
//! - A null in-circle determinant means the vertex is on the circle, which is treated as **outside**.

use robust::{incircle, orient2d, Coord};

use crate::triangulation::TriangulationError;
use crate::types::{Float, Vertex, Vertex2d, VertexId};

#[cfg(feature = "more_profile_traces")]
use tracing::{span, Level};

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Orientation {
    Colinear,
    Clockwise,
    CounterClockwise,
}

/// A circle, defined by its center and its squared radius
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Circle {
    pub center: Vertex,
    pub radius_squared: Float,
}
impl Circle {
    /// Returns true if `p` is strictly inside the circle.
    ///
    /// This is a floating point test, only meant for diagnostics.
    /// The triangulation itself uses [is_vertex_in_triangle_circumcircle].
    #[inline]
    pub fn contains(&self, p: Vertex) -> bool {
        self.center.distance_squared(p) < self.radius_squared
    }
}

#[inline(always)]
fn to_coord(v: Vertex) -> Coord<Float> {
    Coord { x: v.x, y: v.y }
}

/// Returns the orientation of an ordered triplet (p, q, r), from the sign of the cross product of (q - p) and (r - p).
#[inline]
pub fn triplet_orientation(p: Vertex, q: Vertex, r: Vertex) -> Orientation {
    #[cfg(feature = "more_profile_traces")]
    let _span = span!(Level::TRACE, "triplet_orientation").entered();

    let det = orient2d(to_coord(p), to_coord(q), to_coord(r));
    if det > 0. {
        Orientation::CounterClockwise
    } else if det < 0. {
        Orientation::Clockwise
    } else {
        Orientation::Colinear
    }
}

/// Checks if vertex `p` is strictly inside the circumcircle of the triangle formed by the first three vertices in `triangle`
/// - `triangle` contains the vertices of the triangle.
///     - length of `triangle` **MUST** be >= 3.
///     - `triangle` vertices must be in a counter-clockwise order
/// - `p` vertex to check
///
/// A vertex exactly on the circumcircle is considered outside of it.
#[inline(always)]
pub fn is_vertex_in_triangle_circumcircle(triangle: &[Vertex], p: Vertex) -> bool {
    #[cfg(feature = "more_profile_traces")]
    let _span = span!(Level::TRACE, "is_vertex_in_triangle_circumcircle").entered();

    incircle(
        to_coord(triangle[0]),
        to_coord(triangle[1]),
        to_coord(triangle[2]),
        to_coord(p),
    ) > 0.
}

/// Computes the circumcircle of a triangle.
///
/// Returns [None] if the vertices are collinear.
pub fn circumcircle(a: Vertex, b: Vertex, c: Vertex) -> Option<Circle> {
    if triplet_orientation(a, b, c) == Orientation::Colinear {
        return None;
    }
    let ab = b - a;
    let ac = c - a;
    let d = 2. * (ab.x * ac.y - ab.y * ac.x);
    let ab_len = ab.length_squared();
    let ac_len = ac.length_squared();
    let offset = Vertex::new(
        (ac.y * ab_len - ab.y * ac_len) / d,
        (ab.x * ac_len - ac.x * ab_len) / d,
    );
    Some(Circle {
        center: a + offset,
        radius_squared: offset.length_squared(),
    })
}

/// Signed area of a triangle, positive when counter-clockwise
#[inline]
pub fn signed_area(a: Vertex, b: Vertex, c: Vertex) -> Float {
    ((b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)) / 2.
}

/// Checks that all the vertices have finite coordinates.
///
/// Returns the id of the first invalid vertex as a [TriangulationError::NonFiniteVertex].
pub fn validate_vertices<T: Vertex2d>(vertices: &[T]) -> Result<(), TriangulationError> {
    for (index, vertex) in vertices.iter().enumerate() {
        if !vertex.x().is_finite() || !vertex.y().is_finite() {
            return Err(TriangulationError::NonFiniteVertex(index as VertexId));
        }
    }
    Ok(())
}

///////////////////////////////////////////////////////////
///                                                     ///
///                        Tests                        ///
///                                                     ///
///////////////////////////////////////////////////////////
