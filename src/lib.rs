pub mod cavity;
pub mod container;
pub mod triangulation;
pub mod types;
pub mod utils;

#[cfg(feature = "debug_context")]
pub mod debug;

pub use glam;
pub use hashbrown;

pub use triangulation::{
    triangulation_from_2d_vertices, Triangulation, TriangulationConfiguration, TriangulationError,
};

///////////////////////////////////////////////////////////
///                                                     ///
///                        Tests                        ///
///                                                     ///
///////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use hashbrown::{HashMap, HashSet};
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use crate::{
        triangulation::TriangulationConfiguration,
        triangulation_from_2d_vertices,
        types::{Edge, Float, Vertex, VertexId},
        utils::{
            is_vertex_in_triangle_circumcircle, signed_area, triplet_orientation, Orientation,
        },
    };

    fn triangulate(vertices: &[Vertex]) -> Vec<[VertexId; 3]> {
        triangulation_from_2d_vertices(vertices, TriangulationConfiguration::default())
            .expect("Triangulation should succeed")
            .triangles
    }

    fn random_vertices(count: usize, seed: u64) -> Vec<Vertex> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..count)
            .map(|_| Vertex::new(rng.gen_range(0. ..1.), rng.gen_range(0. ..1.)))
            .collect()
    }

    fn sorted_triangles(triangles: &[[VertexId; 3]]) -> HashSet<[VertexId; 3]> {
        triangles
            .iter()
            .map(|t| {
                let mut t = *t;
                t.sort();
                t
            })
            .collect()
    }

    /// Andrew's monotone chain. Collinear vertices on the hull boundary are dropped.
    fn convex_hull(vertices: &[Vertex]) -> Vec<Vertex> {
        let mut sorted = vertices.to_vec();
        sorted.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
        sorted.dedup();

        let mut hull: Vec<Vertex> = Vec::new();
        for pass in 0..2 {
            let start = hull.len();
            for &v in sorted.iter() {
                while hull.len() >= start + 2
                    && triplet_orientation(hull[hull.len() - 2], hull[hull.len() - 1], v)
                        != Orientation::CounterClockwise
                {
                    hull.pop();
                }
                hull.push(v);
            }
            hull.pop();
            if pass == 0 {
                sorted.reverse();
            }
        }
        hull
    }

    fn polygon_area(polygon: &[Vertex]) -> Float {
        let mut area = 0.;
        for i in 1..polygon.len().saturating_sub(1) {
            area += signed_area(polygon[0], polygon[i], polygon[i + 1]);
        }
        area
    }

    fn triangles_area(vertices: &[Vertex], triangles: &[[VertexId; 3]]) -> Float {
        triangles
            .iter()
            .map(|t| {
                signed_area(
                    vertices[t[0] as usize],
                    vertices[t[1] as usize],
                    vertices[t[2] as usize],
                )
            })
            .sum()
    }

    fn assert_ccw(vertices: &[Vertex], triangles: &[[VertexId; 3]]) {
        for t in triangles {
            assert_eq!(
                Orientation::CounterClockwise,
                triplet_orientation(
                    vertices[t[0] as usize],
                    vertices[t[1] as usize],
                    vertices[t[2] as usize]
                ),
                "Triangle {t:?} is not counter-clockwise"
            );
        }
    }

    fn assert_delaunay(vertices: &[Vertex], triangles: &[[VertexId; 3]]) {
        for t in triangles {
            let triangle_vertices = t.map(|v| vertices[v as usize]);
            for (id, &vertex) in vertices.iter().enumerate() {
                if t.contains(&(id as VertexId)) {
                    continue;
                }
                assert!(
                    !is_vertex_in_triangle_circumcircle(&triangle_vertices, vertex),
                    "Vertex {id} is inside the circumcircle of triangle {t:?}"
                );
            }
        }
    }

    /// Checks that shared edges have opposite directions and returns the count of edges used by a single triangle
    fn assert_manifold(triangles: &[[VertexId; 3]]) -> usize {
        let mut edges: HashMap<Edge, Vec<Edge>> = HashMap::new();
        for t in triangles {
            for i in 0..3 {
                let edge = Edge::new(t[i], t[(i + 1) % 3]);
                edges.entry(edge).or_default().push(edge);
            }
        }
        let mut border_edges = 0;
        for occurrences in edges.values() {
            match occurrences.len() {
                1 => border_edges += 1,
                2 => assert!(occurrences[0].directed_equals(&occurrences[1].reversed())),
                count => panic!("Edge {:?} is used by {} triangles", occurrences[0], count),
            }
        }
        border_edges
    }

    fn assert_delaunay_triangulation(vertices: &[Vertex], triangles: &[[VertexId; 3]]) {
        assert_ccw(vertices, triangles);
        assert_delaunay(vertices, triangles);

        let hull = convex_hull(vertices);
        let border_edges = assert_manifold(triangles);
        assert_eq!(hull.len(), border_edges);

        let hull_area = polygon_area(&hull);
        let area = triangles_area(vertices, triangles);
        assert!(
            (hull_area - area).abs() <= 1e-9 * hull_area,
            "Triangles area {area} differs from convex hull area {hull_area}"
        );

        let n = vertices.len();
        assert_eq!(2 * n - hull.len() - 2, triangles.len());
    }

    #[test]
    fn delaunay_unit_square() {
        // 3-------------2
        // |             |
        // |             |
        // |             |
        // |             |
        // 0-------------1
        let vertices = vec![
            Vertex::new(0., 0.),
            Vertex::new(1., 0.),
            Vertex::new(1., 1.),
            Vertex::new(0., 1.),
        ];

        let triangles = triangulate(&vertices);

        assert_eq!(2, triangles.len());
        assert_ccw(&vertices, &triangles);
        assert_delaunay(&vertices, &triangles);
        assert_eq!(1., triangles_area(&vertices, &triangles));
        assert_eq!(4, assert_manifold(&triangles));
    }

    #[test]
    fn delaunay_single_triangle() {
        let vertices = vec![
            Vertex::new(0., 0.),
            Vertex::new(1., 0.),
            Vertex::new(0.5, 1.),
        ];

        let triangles = triangulate(&vertices);

        assert_eq!(1, triangles.len());
        assert_eq!(sorted_triangles(&[[0, 1, 2]]), sorted_triangles(&triangles));
        assert_ccw(&vertices, &triangles);
    }

    #[test]
    fn delaunay_collinear() {
        let vertices = vec![
            Vertex::new(0., 0.),
            Vertex::new(1., 0.),
            Vertex::new(2., 0.),
        ];

        let triangulation =
            triangulation_from_2d_vertices(&vertices, TriangulationConfiguration::default())
                .expect("Collinear vertices are not an error");

        assert!(triangulation.is_empty());
    }

    #[test]
    fn delaunay_many_collinear() {
        let vertices: Vec<Vertex> = (0..20)
            .map(|i| Vertex::new(i as Float * 0.25 - 3., 2. * i as Float + 1.))
            .collect();

        assert!(triangulate(&vertices).is_empty());
    }

    #[test]
    fn delaunay_grid() {
        // 4x4 grid: many co-circular vertices
        let mut vertices = Vec::new();
        for i in 0..4 {
            for j in 0..4 {
                vertices.push(Vertex::new(i as Float, j as Float));
            }
        }

        let triangles = triangulate(&vertices);

        assert_ccw(&vertices, &triangles);
        assert_delaunay(&vertices, &triangles);
        assert_manifold(&triangles);
        assert_eq!(9., triangles_area(&vertices, &triangles));
        // 16 vertices, 12 of them on the hull boundary
        assert_eq!(2 * 16 - 12 - 2, triangles.len());
    }

    #[test]
    fn delaunay_random_vertices() {
        for seed in 0..5 {
            let vertices = random_vertices(200, seed);
            let triangles = triangulate(&vertices);
            assert_delaunay_triangulation(&vertices, &triangles);
        }
    }

    #[test]
    fn delaunay_far_from_origin() {
        let vertices: Vec<Vertex> = random_vertices(100, 42)
            .into_iter()
            .map(|v| v * 100. + Vertex::new(1e6, -1e6))
            .collect();

        let triangles = triangulate(&vertices);

        assert_ccw(&vertices, &triangles);
        assert_delaunay(&vertices, &triangles);
        let hull = convex_hull(&vertices);
        assert_eq!(hull.len(), assert_manifold(&triangles));
        assert_eq!(2 * vertices.len() - hull.len() - 2, triangles.len());
    }

    #[test]
    fn delaunay_circle() {
        // Co-circular vertices around a center vertex
        let count = 12;
        let mut vertices = vec![Vertex::new(0., 0.)];
        for i in 0..count {
            let angle = i as Float * std::f64::consts::TAU as Float / count as Float;
            vertices.push(Vertex::new(angle.cos(), angle.sin()));
        }

        let triangles = triangulate(&vertices);

        assert_ccw(&vertices, &triangles);
        assert_manifold(&triangles);
        assert_eq!(2 * vertices.len() - count - 2, triangles.len());
    }

    #[test]
    fn thin_triangles_are_kept() {
        for eps in [1e-3, 1e-5, 1e-7, 1e-9, 1e-12, 1e-15] {
            let vertices = vec![
                Vertex::new(0., 0.),
                Vertex::new(1., -eps),
                Vertex::new(2., 0.),
            ];

            let triangles = triangulate(&vertices);

            assert_eq!(1, triangles.len(), "Thin triangle with height {eps}");
            assert_ccw(&vertices, &triangles);
        }
    }

    #[test]
    fn flat_hull_triangles_are_kept() {
        // A very flat convex chain below random vertices: every chain vertex is on the hull
        let mut vertices: Vec<Vertex> = (0..=10)
            .map(|i| {
                let x = i as Float;
                Vertex::new(x / 10., -1e-9 * x * (10. - x))
            })
            .collect();
        vertices.extend(random_vertices(50, 13).into_iter().map(|v| v + Vertex::new(0., 1e-3)));

        let triangles = triangulate(&vertices);

        assert_delaunay_triangulation(&vertices, &triangles);
        for i in 0..10 {
            let edge = Edge::new(i, i + 1);
            assert!(
                triangles
                    .iter()
                    .any(|t| (0..3).any(|k| Edge::new(t[k], t[(k + 1) % 3]) == edge)),
                "Hull edge {edge:?} is missing"
            );
        }
    }

    #[cfg(not(feature = "f32"))]
    #[test]
    fn huge_coordinates() {
        for scale in [1e290, 1e300, 1e305] {
            let vertices = vec![
                Vertex::new(-scale, 0.),
                Vertex::new(scale, 0.),
                Vertex::new(0., scale),
            ];

            let triangulation =
                triangulation_from_2d_vertices(&vertices, TriangulationConfiguration::default())
                    .expect("Huge coordinates are not an error");

            assert_eq!(
                sorted_triangles(&[[0, 1, 2]]),
                sorted_triangles(&triangulation.triangles),
                "Triangle of scale {scale}"
            );
        }
    }

    #[cfg(not(feature = "f32"))]
    #[test]
    fn scaling_by_power_of_two_gives_same_triangulation() {
        let vertices = random_vertices(100, 17);
        let reference = triangulate(&vertices);

        for exponent in [-900, -40, 40, 960, 1013] {
            let scale = (2. as Float).powi(exponent);
            let scaled: Vec<Vertex> = vertices.iter().map(|v| *v * scale).collect();
            assert_eq!(reference, triangulate(&scaled), "Scale 2^{exponent}");
        }
    }

    #[test]
    fn duplicates_do_not_change_triangulation() {
        let vertices = random_vertices(50, 7);
        let reference = triangulate(&vertices);

        let mut with_duplicates = vertices.clone();
        with_duplicates.extend_from_slice(&vertices[10..20]);
        with_duplicates.push(vertices[0]);

        let triangulation = triangulation_from_2d_vertices(
            &with_duplicates,
            TriangulationConfiguration::default(),
        )
        .expect("Triangulation should succeed");

        assert_eq!(
            sorted_triangles(&reference),
            sorted_triangles(&triangulation.triangles)
        );
        assert_eq!(11, triangulation.merged_vertices().count());
        assert_eq!(10, triangulation.vertex_merge_mapping[50]);
        assert_eq!(0, triangulation.vertex_merge_mapping[60]);
    }

    #[test]
    fn triangulation_is_deterministic() {
        let vertices = random_vertices(300, 3);
        assert_eq!(triangulate(&vertices), triangulate(&vertices));
    }

    #[test]
    fn insertion_order_does_not_change_triangle_set() {
        let vertices = random_vertices(100, 11);
        let reference = triangulate(&vertices);

        let mut reversed = vertices.clone();
        reversed.reverse();
        let last = vertices.len() as VertexId - 1;
        let remapped: Vec<[VertexId; 3]> = triangulate(&reversed)
            .iter()
            .map(|t| t.map(|v| last - v))
            .collect();

        assert_eq!(sorted_triangles(&reference), sorted_triangles(&remapped));
    }

    #[test]
    fn triangulation_from_arrays() {
        let vertices = vec![[0., 0.], [0., 5.], [5., 5.], [5., 0.], [2., 3.]];

        let triangulation =
            triangulation_from_2d_vertices(&vertices, TriangulationConfiguration::default())
                .expect("Triangulation should succeed");

        assert_eq!(4, triangulation.triangles.len());
        assert!(triangulation
            .triangles
            .iter()
            .all(|t| t.contains(&4)));
    }

    #[cfg(feature = "parallel_filtering")]
    #[test]
    fn parallel_filtering_gives_same_triangulation() {
        let vertices = random_vertices(500, 5);
        let parallel = triangulation_from_2d_vertices(
            &vertices,
            TriangulationConfiguration {
                filter_parallel_tri_count_threshold: 10,
                filter_parallel_min_batch_len: 16,
                ..Default::default()
            },
        )
        .expect("Triangulation should succeed");

        assert_eq!(triangulate(&vertices), parallel.triangles);
    }

    #[cfg(feature = "debug_context")]
    #[test]
    fn debug_snapshots() {
        use crate::debug::{DebugConfiguration, TriangulationPhase};

        let vertices = random_vertices(10, 1);
        let triangulation = triangulation_from_2d_vertices(
            &vertices,
            TriangulationConfiguration {
                debug_config: DebugConfiguration {
                    force_end_at_step: Some(4),
                    ..Default::default()
                },
                ..Default::default()
            },
        )
        .expect("Triangulation should succeed");

        let snapshots = &triangulation.debug_context.snapshots;
        assert_eq!(
            TriangulationPhase::ContainerTriangle,
            snapshots[0].triangulation_phase
        );
        assert_eq!(
            Some(TriangulationPhase::RemoveWrapping),
            snapshots.last().map(|s| s.triangulation_phase)
        );
        // 4 inserted vertices, 2 snapshots each
        assert_eq!(1 + 2 * 4 + 1, snapshots.len());
        assert!(triangulation.triangles.len() <= 2 * 4 - 3 - 2);
    }
}
