use glam::DVec2;

/// The float type used in the algorithm's computations
pub type Float = f64;
/// The vertex type used in the algorithm's computations
pub type Vertex = DVec2;

/// Default relative distance under which two vertices are merged
pub const DEFAULT_VERTEX_MERGE_TOLERANCE: Float = 1e-10;
