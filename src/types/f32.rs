use glam::Vec2;

/// The float type used in the algorithm's computations
pub type Float = f32;
/// The vertex type used in the algorithm's computations
pub type Vertex = Vec2;

/// Default relative distance under which two vertices are merged
pub const DEFAULT_VERTEX_MERGE_TOLERANCE: Float = 1e-5;
