use ghx_bowyer_watson::triangulation_from_2d_vertices;
use ghx_bowyer_watson::{triangulation::TriangulationConfiguration, types::Vertex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::{layer::SubscriberExt, Registry};
use tracing_tracy::TracyLayer;

pub const SEED: &[u8; 32] = b"\xfb\xdc\x4e\xa0\x30\xde\x82\xba\x69\x97\x3c\x52\x49\x4d\x00\xca
\x5c\x21\xa3\x8d\x5c\xf2\x34\x4e\x58\x7d\x80\x16\x66\x23\x30";

pub fn uniform_f64() -> impl Iterator<Item = [f64; 2]> {
    uniform_distribution(1000.0, *SEED)
}

pub fn uniform_distribution(size: f64, seed: [u8; 32]) -> impl Iterator<Item = [f64; 2]> {
    let range = rand::distributions::Uniform::new(0., size);
    let mut rng = StdRng::from_seed(seed);
    core::iter::from_fn(move || Some([rng.sample(range), rng.sample(range)]))
}

// Bad triangles are searched with a full scan, keep it reasonable
const VERTICES_COUNT: usize = 20_000;

fn main() {
    let subscriber = Registry::default().with(TracyLayer::default());
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");

    let vertices: Vec<Vertex> = uniform_f64()
        .take(VERTICES_COUNT)
        .map(|vertex| Vertex::new(vertex[0], vertex[1]))
        .collect();

    let triangulation = triangulation_from_2d_vertices(
        &vertices,
        TriangulationConfiguration {
            filter_parallel_tri_count_threshold: 10000,
            filter_parallel_min_batch_len: 2000,
            ..Default::default()
        },
    )
    .expect("Triangulation should succeed");

    tracing::info!("{} triangles", triangulation.triangles.len());
}
