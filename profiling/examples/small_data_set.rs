use std::f64::consts::TAU;

use ghx_bowyer_watson::triangulation_from_2d_vertices;
use ghx_bowyer_watson::{triangulation::TriangulationConfiguration, types::Vertex};
use tracing_subscriber::{layer::SubscriberExt, Registry};
use tracing_tracy::TracyLayer;

const GRID_SIZE: usize = 30;
const RINGS_COUNT: usize = 8;
const VERTICES_PER_RING: usize = 64;

/// Square grid: every cell has 4 co-circular vertices
fn grid() -> impl Iterator<Item = Vertex> {
    (0..GRID_SIZE * GRID_SIZE).map(|i| Vertex::new((i % GRID_SIZE) as f64, (i / GRID_SIZE) as f64))
}

/// Concentric rings of co-circular vertices, centered on the grid
fn rings() -> impl Iterator<Item = Vertex> {
    let center = Vertex::splat((GRID_SIZE - 1) as f64 / 2.);
    (1..=RINGS_COUNT).flat_map(move |ring| {
        let radius = ring as f64 * 1.7;
        (0..VERTICES_PER_RING).map(move |i| {
            let angle = i as f64 * TAU / VERTICES_PER_RING as f64;
            center + radius * Vertex::new(angle.cos(), angle.sin())
        })
    })
}

/// Nearly collinear vertices below the grid, forming a very flat convex hull chain
fn flat_chain() -> impl Iterator<Item = Vertex> {
    let length = (GRID_SIZE - 1) as f64;
    (0..GRID_SIZE).map(move |i| {
        let x = i as f64;
        Vertex::new(x, -1. - 1e-9 * x * (length - x))
    })
}

fn main() {
    let subscriber = Registry::default().with(TracyLayer::default());
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");

    let vertices: Vec<Vertex> = grid().chain(rings()).chain(flat_chain()).collect();

    let triangulation = triangulation_from_2d_vertices(
        &vertices,
        TriangulationConfiguration {
            ..Default::default()
        },
    )
    .expect("Triangulation should succeed");

    tracing::info!(
        "{} vertices, {} triangles, {} merged vertices",
        vertices.len(),
        triangulation.triangles.len(),
        triangulation.merged_vertices().count()
    );
}
