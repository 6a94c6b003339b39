use thiserror::Error;
use tracing::{debug, error, warn};

use crate::cavity::{extract_cavity, Cavity};
use crate::container::ContainerTriangle;
use crate::types::{
    Float, TriangleData, Triangles, Vertex, Vertex2d, VertexId,
    DEFAULT_VERTEX_MERGE_TOLERANCE,
};
use crate::utils::validate_vertices;

#[cfg(feature = "parallel_filtering")]
use rayon::iter::{IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator};

#[cfg(feature = "progress_log")]
use tracing::info;

#[cfg(feature = "debug_context")]
use crate::debug::{DebugConfiguration, DebugContext, TriangulationPhase};

#[cfg(feature = "profile_traces")]
use tracing::{span, Level};

pub const DEFAULT_FILTER_PARALLEL_TRI_COUNT_THRESHOLD: usize = 100_000;
pub const DEFAULT_FILTER_PARALLEL_MIN_BATCH_LEN: usize = 1000;

#[derive(Clone, Debug)]
pub struct TriangulationConfiguration {
    /// Two vertices closer than this (on both axes) are merged. Relative to the largest side of the input bounding box.
    pub vertex_merge_tolerance: Float,
    /// Only used with the `parallel_filtering` feature.
    /// Above this count of triangles, bad triangles search and final filtering are done in parallel.
    pub filter_parallel_tri_count_threshold: usize,
    /// Only used with the `parallel_filtering` feature. Minimum count of triangles handled by one parallel task.
    pub filter_parallel_min_batch_len: usize,
    #[cfg(feature = "debug_context")]
    pub debug_config: DebugConfiguration,
}
impl Default for TriangulationConfiguration {
    fn default() -> Self {
        Self {
            vertex_merge_tolerance: DEFAULT_VERTEX_MERGE_TOLERANCE,
            filter_parallel_tri_count_threshold: DEFAULT_FILTER_PARALLEL_TRI_COUNT_THRESHOLD,
            filter_parallel_min_batch_len: DEFAULT_FILTER_PARALLEL_MIN_BATCH_LEN,
            #[cfg(feature = "debug_context")]
            debug_config: DebugConfiguration::default(),
        }
    }
}
impl TriangulationConfiguration {
    pub fn validate(&self) -> Result<(), TriangulationError> {
        if !self.vertex_merge_tolerance.is_finite() || self.vertex_merge_tolerance < 0. {
            return Err(TriangulationError::InvalidConfiguration(format!(
                "vertex_merge_tolerance must be a finite positive value, got {}",
                self.vertex_merge_tolerance
            )));
        }
        if self.filter_parallel_min_batch_len == 0 {
            return Err(TriangulationError::InvalidConfiguration(
                "filter_parallel_min_batch_len must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Internal invariant violations of the mesh
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum MeshDefect {
    #[error("edge ({from}, {to}) is shared by {count} triangles")]
    NonManifoldEdge {
        from: VertexId,
        to: VertexId,
        count: usize,
    },
    #[error("edge ({from}, {to}) has the same direction in two adjacent triangles")]
    InconsistentWinding { from: VertexId, to: VertexId },
    #[error("cavity boundary goes twice through vertex {vertex}")]
    PinchedCavityBoundary { vertex: VertexId },
    #[error("cavity boundary is not a single closed polygon (at vertex {vertex})")]
    OpenCavityBoundary { vertex: VertexId },
    #[error("cavity has no boundary edge")]
    EmptyCavityBoundary,
    #[error("vertex {vertex} is neither in a triangle circumcircle nor on an existing vertex")]
    UncoveredVertex { vertex: VertexId },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TriangulationError {
    /// No vertex to build the container triangle from
    #[error("no input vertex")]
    EmptyInput,
    /// Three vertices of a triangle are collinear or coincident
    #[error("degenerate triangle {verts:?}: vertices are collinear or coincident")]
    DegenerateGeometry { verts: [VertexId; 3] },
    /// A vertex is too close to a vertex already in the triangulation
    #[error("vertex {vertex} is a duplicate of vertex {existing}")]
    DuplicatePoint { vertex: VertexId, existing: VertexId },
    /// The mesh is not a valid triangulation anymore. Unrecoverable.
    #[error("corrupt mesh: {0}")]
    CorruptMesh(MeshDefect),
    #[error("vertex {0} has a non-finite coordinate")]
    NonFiniteVertex(VertexId),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

pub struct Triangulation {
    /// Indices of the original vertices by groups of 3 to form triangles, in a counter-clockwise order.
    pub triangles: Vec<[VertexId; 3]>,
    /// For each input vertex, the id of the vertex representing it in the triangulation.
    ///
    /// Identity for all vertices except the merged duplicates, which map to the first vertex they duplicate.
    pub vertex_merge_mapping: Vec<VertexId>,
    /// Vertices which could not be inserted without creating a degenerate triangle
    pub skipped_vertices: Vec<VertexId>,

    #[cfg(feature = "debug_context")]
    pub debug_context: DebugContext,
}
impl Triangulation {
    pub(crate) fn empty() -> Self {
        Self {
            triangles: Vec::new(),
            vertex_merge_mapping: Vec::new(),
            skipped_vertices: Vec::new(),
            #[cfg(feature = "debug_context")]
            debug_context: DebugContext::new(DebugConfiguration::default()),
        }
    }

    /// An empty triangulation is a valid result: fewer than 3 distinct vertices, or all vertices collinear.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Returns the ids of the vertices merged into another vertex
    pub fn merged_vertices(&self) -> impl Iterator<Item = (VertexId, VertexId)> + '_ {
        self.vertex_merge_mapping
            .iter()
            .enumerate()
            .map(|(id, &existing)| (id as VertexId, existing))
            .filter(|(id, existing)| id != existing)
    }
}

/// Creates a Delaunay triangulation of the input vertices, using the Bowyer-Watson algorithm.
///
/// Vertices are inserted in input order. Vertices that are identical (or extremely close to one another, see
/// [TriangulationConfiguration::vertex_merge_tolerance]) are merged: only the first one appears in the triangulation.
///
/// Vertices are expected to be valid floating points values, a [TriangulationError::NonFiniteVertex] is returned otherwise.
///
/// Fewer than 3 vertices, or collinear vertices, give an empty triangulation.
pub fn triangulation_from_2d_vertices<T: Vertex2d>(
    vertices: &[T],
    config: TriangulationConfiguration,
) -> Result<Triangulation, TriangulationError> {
    #[cfg(feature = "profile_traces")]
    let _span = span!(Level::TRACE, "triangulation_from_2d_vertices").entered();

    let mut triangulator = match Triangulator::new(vertices, config) {
        Ok(triangulator) => triangulator,
        Err(TriangulationError::EmptyInput) => return Ok(Triangulation::empty()),
        Err(err) => return Err(err),
    };
    triangulator.insert_all()?;
    Ok(triangulator.finalize())
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TriangulationState {
    Init,
    Inserting,
    Finalizing,
    Done,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InsertionOutcome {
    /// The vertex is now part of the mesh
    Inserted { removed: usize, created: usize },
    /// The vertex duplicates `existing` and was not inserted
    Merged { existing: VertexId },
    /// The vertex would have created degenerate triangles and was not inserted. The mesh is unchanged.
    Skipped,
}

/// Owns the mesh during the incremental insertion of the vertices
pub struct Triangulator {
    config: TriangulationConfiguration,
    /// Normalized input vertices. The container vertices have no coordinates.
    vertices: Vec<Vertex>,
    scale_factor: Float,
    container: ContainerTriangle,
    triangles: Triangles,
    state: TriangulationState,
    vertex_merge_mapping: Vec<VertexId>,
    skipped_vertices: Vec<VertexId>,
    #[cfg(feature = "debug_context")]
    debug_context: DebugContext,
}

impl Triangulator {
    /// Creates the container triangle around `vertices`. No vertex is inserted yet and the state is [TriangulationState::Init].
    pub fn new<T: Vertex2d>(
        vertices: &[T],
        config: TriangulationConfiguration,
    ) -> Result<Self, TriangulationError> {
        #[cfg(feature = "profile_traces")]
        let _span = span!(Level::TRACE, "triangulator_init").entered();

        config.validate()?;
        validate_vertices(vertices)?;

        let mut mesh_vertices: Vec<Vertex> =
            vertices.iter().map(|v| Vertex::new(v.x(), v.y())).collect();
        let scale_factor = normalize_vertices_coordinates(&mut mesh_vertices);
        let container = ContainerTriangle::new(&mesh_vertices)?;

        // Euler relation: at most 2n + 1 triangles including the ones touching the container vertices
        let mut triangles = Triangles::with_capacity(2 * vertices.len() + 1);
        triangles.push(container.triangle.clone());

        #[cfg(feature = "debug_context")]
        let mut debug_context = DebugContext::new(config.debug_config.clone());
        #[cfg(feature = "debug_context")]
        debug_context.push_snapshot(TriangulationPhase::ContainerTriangle, None, &triangles, &[0]);

        Ok(Self {
            config,
            vertices: mesh_vertices,
            scale_factor,
            container,
            triangles,
            state: TriangulationState::Init,
            vertex_merge_mapping: (0..vertices.len() as VertexId).collect(),
            skipped_vertices: Vec::new(),
            #[cfg(feature = "debug_context")]
            debug_context,
        })
    }

    #[inline]
    pub fn state(&self) -> TriangulationState {
        self.state
    }

    /// Current mesh, including the triangles connected to the container vertices
    #[inline]
    pub fn triangles(&self) -> &Triangles {
        &self.triangles
    }

    /// Input vertices, multiplied by [Triangulator::scale_factor]
    #[inline]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Power of two applied to the input coordinates
    #[inline]
    pub fn scale_factor(&self) -> Float {
        self.scale_factor
    }

    #[inline]
    pub fn container(&self) -> &ContainerTriangle {
        &self.container
    }

    /// Count of input vertices
    #[inline]
    pub fn input_count(&self) -> usize {
        self.vertices.len()
    }

    /// Inserts all the input vertices, in input order
    pub fn insert_all(&mut self) -> Result<(), TriangulationError> {
        #[cfg(feature = "profile_traces")]
        let _span = span!(Level::TRACE, "insert_all").entered();

        let input_count = self.input_count();
        for vertex_id in 0..input_count as VertexId {
            #[cfg(feature = "debug_context")]
            {
                let force_end = self.debug_context.advance_step();
                if force_end {
                    break;
                }
            }

            self.insert_vertex(vertex_id)?;

            #[cfg(feature = "progress_log")]
            {
                let index = vertex_id as usize;
                if index % ((input_count / 50) + 1) == 0 {
                    let progress = 100. * index as f32 / input_count as f32;
                    info!(
                        "Triangulation progress, {}%: {}/{}",
                        progress, index, input_count
                    );
                }
            }
        }
        Ok(())
    }

    /// Inserts one input vertex in the mesh.
    ///
    /// Only fails on a [TriangulationError::CorruptMesh], in which case the triangulation must be discarded.
    pub(crate) fn insert_vertex(
        &mut self,
        vertex_id: VertexId,
    ) -> Result<InsertionOutcome, TriangulationError> {
        #[cfg(feature = "profile_traces")]
        let _span = span!(Level::TRACE, "insert_vertex").entered();

        match self.state {
            TriangulationState::Init => self.state = TriangulationState::Inserting,
            TriangulationState::Inserting => (),
            TriangulationState::Finalizing | TriangulationState::Done => {
                unreachable!("vertices can't be inserted in a finalized triangulation")
            }
        }

        let vertex = self.vertices[vertex_id as usize];
        let cavity = match extract_cavity(&self.triangles, &self.vertices, vertex, &self.config) {
            Ok(cavity) => cavity,
            Err(err) => {
                error!("Failed to insert vertex {}: {}", vertex_id, err);
                return Err(err);
            }
        };

        if let Err(duplicate) = self.check_duplicate(vertex_id, vertex, &cavity) {
            return match duplicate {
                TriangulationError::DuplicatePoint { existing, .. } => {
                    debug!("Vertex {} merged into vertex {}", vertex_id, existing);
                    self.vertex_merge_mapping[vertex_id as usize] = existing;
                    Ok(InsertionOutcome::Merged { existing })
                }
                err => {
                    error!("Failed to insert vertex {}: {}", vertex_id, err);
                    Err(err)
                }
            };
        }

        // Build every new triangle before touching the mesh, so that a failure leaves it unchanged
        let new_triangles = match self.fill_cavity(vertex_id, &cavity) {
            Ok(new_triangles) => new_triangles,
            Err(err) => {
                debug!("Vertex {} skipped: {}", vertex_id, err);
                self.skipped_vertices.push(vertex_id);
                return Ok(InsertionOutcome::Skipped);
            }
        };

        self.triangles.remove_sorted(&cavity.bad_triangles);
        #[cfg(feature = "debug_context")]
        self.debug_context.push_snapshot(
            TriangulationPhase::RemoveBadTriangles,
            Some(vertex_id),
            &self.triangles,
            &cavity.bad_triangles,
        );

        let created = new_triangles.len();
        for triangle in new_triangles {
            self.triangles.push(triangle);
        }
        #[cfg(feature = "debug_context")]
        {
            let first_new_id = (self.triangles.count() - created) as crate::types::TriangleId;
            let created_ids: Vec<crate::types::TriangleId> =
                (first_new_id..self.triangles.next_id()).collect();
            self.debug_context.push_snapshot(
                TriangulationPhase::FillCavity,
                Some(vertex_id),
                &self.triangles,
                &created_ids,
            );
        }

        Ok(InsertionOutcome::Inserted {
            removed: cavity.bad_triangles.len(),
            created,
        })
    }

    /// Returns a [TriangulationError::DuplicatePoint] if `vertex` is too close to a vertex already in the mesh.
    ///
    /// An empty cavity means that no circumcircle strictly contains `vertex`, which is only possible
    /// if it lies exactly on a mesh vertex: in that case, all the triangles are searched.
    fn check_duplicate(
        &self,
        vertex_id: VertexId,
        vertex: Vertex,
        cavity: &Cavity,
    ) -> Result<(), TriangulationError> {
        let tolerance = self.config.vertex_merge_tolerance * self.container.bounds.extent();

        let existing = if cavity.is_empty() {
            let existing = self.triangles.buffer().iter().find_map(|triangle| {
                self.find_existing_close_vertex(triangle, vertex, tolerance)
            });
            if existing.is_none() {
                return Err(TriangulationError::CorruptMesh(
                    MeshDefect::UncoveredVertex { vertex: vertex_id },
                ));
            }
            existing
        } else {
            cavity.bad_triangles.iter().find_map(|&triangle_id| {
                self.find_existing_close_vertex(self.triangles.get(triangle_id), vertex, tolerance)
            })
        };

        match existing {
            Some(existing) => Err(TriangulationError::DuplicatePoint {
                vertex: vertex_id,
                existing,
            }),
            None => Ok(()),
        }
    }

    fn find_existing_close_vertex(
        &self,
        triangle: &TriangleData,
        vertex: Vertex,
        tolerance: Float,
    ) -> Option<VertexId> {
        triangle
            .verts()
            .into_iter()
            .filter(|&id| !self.container.is_container_vertex(id))
            .find(|&id| {
                let dist = self.vertices[id as usize] - vertex;
                dist.x.abs() <= tolerance && dist.y.abs() <= tolerance
            })
    }

    /// Connects each boundary edge of the cavity to `vertex_id`
    fn fill_cavity(
        &self,
        vertex_id: VertexId,
        cavity: &Cavity,
    ) -> Result<Vec<TriangleData>, TriangulationError> {
        cavity
            .boundary
            .iter()
            .map(|edge| TriangleData::new_ccw([edge.from, edge.to, vertex_id], &self.vertices))
            .collect()
    }

    /// Removes the container triangle and every triangle connected to it
    pub fn finalize(mut self) -> Triangulation {
        #[cfg(feature = "profile_traces")]
        let _span = span!(Level::TRACE, "finalize").entered();

        debug_assert_ne!(TriangulationState::Done, self.state);
        self.state = TriangulationState::Finalizing;

        let triangles = remove_wrapping(
            &self.triangles,
            self.container.min_container_vertex_id,
            &self.config,
            #[cfg(feature = "debug_context")]
            &mut self.debug_context,
        );

        let merged_count = self
            .vertex_merge_mapping
            .iter()
            .enumerate()
            .filter(|(id, existing)| *id as VertexId != **existing)
            .count();
        if merged_count > 0 {
            warn!(
                "{} duplicate vertices were merged during the triangulation",
                merged_count
            );
        }
        if !self.skipped_vertices.is_empty() {
            warn!(
                "{} vertices were skipped during the triangulation: {:?}",
                self.skipped_vertices.len(),
                self.skipped_vertices
            );
        }
        if triangles.is_empty() {
            let distinct_count = self.input_count() - merged_count - self.skipped_vertices.len();
            if let Some(cause) = empty_triangulation_cause(self.input_count(), distinct_count) {
                warn!(
                    "Triangulation of {} vertices is empty: {}",
                    self.input_count(),
                    cause
                );
            }
        }

        self.state = TriangulationState::Done;
        debug!(
            "Triangulation {:?}: {} triangles",
            self.state,
            triangles.len()
        );

        Triangulation {
            triangles,
            vertex_merge_mapping: self.vertex_merge_mapping,
            skipped_vertices: self.skipped_vertices,
            #[cfg(feature = "debug_context")]
            debug_context: self.debug_context,
        }
    }
}

/// Cause of an empty triangulation, [None] when fewer than 3 vertices were given.
///
/// Every triangle between input vertices survives the container removal, so only a lack of
/// distinct vertices or collinear vertices can leave the triangulation empty.
fn empty_triangulation_cause(input_count: usize, distinct_count: usize) -> Option<String> {
    if input_count < 3 {
        None
    } else if distinct_count < 3 {
        Some(format!(
            "only {} distinct vertices remain after merging duplicates",
            distinct_count
        ))
    } else {
        Some(format!("all the {} distinct vertices are collinear", distinct_count))
    }
}

/// Multiplies all the vertices by a power of two so that the largest coordinate magnitude is close to 1.
///
/// Multiplying by a power of two is exact (unless a coordinate underflows), so the orientation and
/// in-circle predicates keep their signs while their intermediate products can't overflow anymore.
///
/// Returns the scale factor.
pub(crate) fn normalize_vertices_coordinates(vertices: &mut [Vertex]) -> Float {
    #[cfg(feature = "profile_traces")]
    let _span = span!(Level::TRACE, "normalize_vertices_coordinates").entered();

    let max_abs = vertices
        .iter()
        .fold(0., |max: Float, v| max.max(v.x.abs()).max(v.y.abs()));
    if max_abs == 0. {
        return 1.;
    }

    // Keeps the scale factor itself finite for subnormal or huge inputs
    let max_exponent = (Float::MAX_EXP - 2) as Float;
    let exponent = max_abs.log2().floor().clamp(-max_exponent, max_exponent);
    let scale_factor = (2. as Float).powi(-(exponent as i32));

    for vertex in vertices.iter_mut() {
        *vertex *= scale_factor;
    }
    scale_factor
}

#[inline]
fn is_wrapping_triangle(triangle: &TriangleData, min_container_vertex_id: VertexId) -> bool {
    triangle
        .verts()
        .iter()
        .any(|&vert| vert >= min_container_vertex_id)
}

/// Keeps the triangles which only reference input vertices
pub(crate) fn remove_wrapping(
    triangles: &Triangles,
    min_container_vertex_id: VertexId,
    config: &TriangulationConfiguration,
    #[cfg(feature = "debug_context")] debug_context: &mut DebugContext,
) -> Vec<[VertexId; 3]> {
    #[cfg(feature = "profile_traces")]
    let _span = span!(Level::TRACE, "remove_wrapping").entered();

    #[cfg(feature = "parallel_filtering")]
    let indices = if triangles.count() > config.filter_parallel_tri_count_threshold {
        triangles
            .buffer()
            .par_iter()
            .with_min_len(config.filter_parallel_min_batch_len)
            .filter_map(|t| match is_wrapping_triangle(t, min_container_vertex_id) {
                true => None,
                false => Some(t.verts()),
            })
            .collect()
    } else {
        filter_wrapping(triangles, min_container_vertex_id)
    };
    #[cfg(not(feature = "parallel_filtering"))]
    let indices = {
        let _ = config;
        filter_wrapping(triangles, min_container_vertex_id)
    };

    #[cfg(feature = "debug_context")]
    {
        let mut filtered_debug_triangles = Triangles::with_capacity(indices.len());
        for t in triangles.buffer().iter() {
            if !is_wrapping_triangle(t, min_container_vertex_id) {
                filtered_debug_triangles.push(t.clone());
            }
        }
        debug_context.push_snapshot(
            TriangulationPhase::RemoveWrapping,
            None,
            &filtered_debug_triangles,
            &[],
        );
    }

    indices
}

fn filter_wrapping(triangles: &Triangles, min_container_vertex_id: VertexId) -> Vec<[VertexId; 3]> {
    let mut indices = Vec::with_capacity(triangles.count());
    for t in triangles.buffer().iter() {
        if !is_wrapping_triangle(t, min_container_vertex_id) {
            indices.push(t.verts());
        }
    }
    indices
}

///////////////////////////////////////////////////////////
///                                                     ///
///                        Tests                        ///
///                                                     ///
///////////////////////////////////////////////////////////
