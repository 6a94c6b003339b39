//! Cavity extraction: finds the triangles invalidated by a new vertex and the polygon bounding them.
//!
//! The extraction only reads the mesh. It returns a [Cavity] describing the required changes,
//! which are then applied by the [crate::triangulation::Triangulator].

use hashbrown::{hash_map::Entry, HashMap};

use crate::{
    container::is_vertex_in_circumcircle,
    triangulation::{MeshDefect, TriangulationConfiguration, TriangulationError},
    types::{Edge, TriangleId, Triangles, Vertex, VertexId},
};

#[cfg(feature = "parallel_filtering")]
use rayon::iter::{IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator};

#[cfg(feature = "profile_traces")]
use tracing::{span, Level};

/// Triangles to remove and edges to connect to a vertex being inserted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cavity {
    /// Ids of the triangles whose circumcircle strictly contains the vertex, in ascending order
    pub bad_triangles: Vec<TriangleId>,
    /// Boundary of the cavity, as a closed counter-clockwise polygon: `boundary[i].to == boundary[i + 1].from`
    pub boundary: Vec<Edge>,
}
impl Cavity {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bad_triangles.is_empty()
    }
}

/// Returns the ids of all the triangles whose circumcircle strictly contains `vertex`, in ascending order.
///
/// `vertices` are the input vertices. Triangles may reference container vertices.
pub fn find_bad_triangles(
    triangles: &Triangles,
    vertices: &[Vertex],
    vertex: Vertex,
    config: &TriangulationConfiguration,
) -> Vec<TriangleId> {
    #[cfg(feature = "profile_traces")]
    let _span = span!(Level::TRACE, "find_bad_triangles").entered();

    #[cfg(feature = "parallel_filtering")]
    if triangles.count() > config.filter_parallel_tri_count_threshold {
        return triangles
            .buffer()
            .par_iter()
            .enumerate()
            .with_min_len(config.filter_parallel_min_batch_len)
            .filter_map(|(id, t)| {
                is_vertex_in_circumcircle(t.verts(), vertices, vertex).then_some(id as TriangleId)
            })
            .collect();
    }
    #[cfg(not(feature = "parallel_filtering"))]
    let _ = config;

    triangles
        .buffer()
        .iter()
        .enumerate()
        .filter(|(_, t)| is_vertex_in_circumcircle(t.verts(), vertices, vertex))
        .map(|(id, _)| id as TriangleId)
        .collect()
}

/// Computes the cavity created by inserting `vertex` in the mesh.
///
/// Returns an empty cavity if no triangle circumcircle strictly contains `vertex`,
/// which only happens when it coincides with a vertex already in the mesh.
pub fn extract_cavity(
    triangles: &Triangles,
    vertices: &[Vertex],
    vertex: Vertex,
    config: &TriangulationConfiguration,
) -> Result<Cavity, TriangulationError> {
    #[cfg(feature = "profile_traces")]
    let _span = span!(Level::TRACE, "extract_cavity").entered();

    let bad_triangles = find_bad_triangles(triangles, vertices, vertex, config);
    if bad_triangles.is_empty() {
        return Ok(Cavity::default());
    }
    let boundary = extract_cavity_boundary(triangles, &bad_triangles)?;
    Ok(Cavity {
        bad_triangles,
        boundary,
    })
}

struct EdgeOccurrences {
    /// Edge as first seen, with its direction in the first triangle
    first: Edge,
    count: usize,
}

/// Keeps the edges appearing in exactly one of the `bad_triangles` and chains them into a closed polygon.
///
/// Edges shared by two bad triangles are inside the cavity and are dropped.
pub(crate) fn extract_cavity_boundary(
    triangles: &Triangles,
    bad_triangles: &[TriangleId],
) -> Result<Vec<Edge>, TriangulationError> {
    #[cfg(feature = "profile_traces")]
    let _span = span!(Level::TRACE, "extract_cavity_boundary").entered();

    let mut occurrences: HashMap<Edge, EdgeOccurrences> =
        HashMap::with_capacity(3 * bad_triangles.len());
    // Edges in the order they were first encountered, so that the output does not depend on the hasher
    let mut ordered_edges = Vec::with_capacity(3 * bad_triangles.len());

    for &triangle_id in bad_triangles {
        for edge in triangles.get(triangle_id).edges() {
            match occurrences.entry(edge) {
                Entry::Occupied(mut entry) => {
                    let occurrence = entry.get_mut();
                    occurrence.count += 1;
                    if occurrence.count > 2 {
                        return Err(TriangulationError::CorruptMesh(
                            MeshDefect::NonManifoldEdge {
                                from: edge.from,
                                to: edge.to,
                                count: occurrence.count,
                            },
                        ));
                    }
                    // Two CCW triangles sharing an edge must walk it in opposite directions
                    if occurrence.first.directed_equals(&edge) {
                        return Err(TriangulationError::CorruptMesh(
                            MeshDefect::InconsistentWinding {
                                from: edge.from,
                                to: edge.to,
                            },
                        ));
                    }
                }
                Entry::Vacant(entry) => {
                    entry.insert(EdgeOccurrences {
                        first: edge,
                        count: 1,
                    });
                    ordered_edges.push(edge);
                }
            }
        }
    }

    let boundary_edges: Vec<Edge> = ordered_edges
        .into_iter()
        .filter(|edge| occurrences[edge].count == 1)
        .collect();

    chain_boundary_edges(boundary_edges)
}

/// Orders the boundary edges so that each edge starts where the previous one ends.
///
/// The edges MUST all be oriented counter-clockwise around the cavity, which is the case
/// when they come from counter-clockwise triangles.
fn chain_boundary_edges(boundary_edges: Vec<Edge>) -> Result<Vec<Edge>, TriangulationError> {
    let Some(&first) = boundary_edges.first() else {
        return Err(TriangulationError::CorruptMesh(MeshDefect::EmptyCavityBoundary));
    };

    let mut next_edge: HashMap<VertexId, Edge> = HashMap::with_capacity(boundary_edges.len());
    for &edge in boundary_edges.iter() {
        if next_edge.insert(edge.from, edge).is_some() {
            // The boundary goes through the same vertex twice
            return Err(TriangulationError::CorruptMesh(
                MeshDefect::PinchedCavityBoundary { vertex: edge.from },
            ));
        }
    }

    let mut polygon = Vec::with_capacity(boundary_edges.len());
    let mut current = first;
    loop {
        polygon.push(current);
        if current.to == first.from {
            break;
        }
        match next_edge.get(&current.to) {
            Some(&edge) if polygon.len() < boundary_edges.len() => current = edge,
            _ => {
                return Err(TriangulationError::CorruptMesh(
                    MeshDefect::OpenCavityBoundary { vertex: current.to },
                ))
            }
        }
    }

    if polygon.len() != boundary_edges.len() {
        // Several disjoint loops
        return Err(TriangulationError::CorruptMesh(
            MeshDefect::OpenCavityBoundary { vertex: first.from },
        ));
    }
    Ok(polygon)
}

///////////////////////////////////////////////////////////
///                                                     ///
///                        Tests                        ///
///                                                     ///
///////////////////////////////////////////////////////////
