//! End-to-end tests of `analyze` on procedural meshes.

use approx::assert_relative_eq;
use meshvis_analysis::{
    analyze, AnalysisError, AnalysisMode, AnalysisSettings, NoProgress, SdfStatistic, Strategy,
};
use meshvis_math::{Point3, Vec3};
use meshvis_mesh::shapes::{cube, cuboid, uv_sphere};
use meshvis_mesh::TriMesh;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn translated(mut mesh: TriMesh, offset: Vec3) -> TriMesh {
    for v in &mut mesh.vertices {
        v.position += offset;
    }
    mesh.update_normals();
    mesh
}

/// A 4x4 slab with a wall hovering just above one edge.
fn l_shape() -> TriMesh {
    let mut mesh = cuboid(Vec3::new(4.0, 4.0, 0.2));
    let wall = translated(cuboid(Vec3::new(0.2, 4.0, 2.0)), Vec3::new(-1.9, 0.0, 1.2));
    mesh.merge(&wall);
    mesh
}

/// Flat `n` x `n` grid of unit cells centered on the origin, facing +z.
fn floor_grid(n: u32) -> TriMesh {
    let half = n as f64 / 2.0;
    let mut positions = Vec::new();
    for j in 0..=n {
        for i in 0..=n {
            positions.push(Point3::new(i as f64 - half, j as f64 - half, 0.0));
        }
    }
    let index = |i: u32, j: u32| j * (n + 1) + i;
    let mut triangles = Vec::new();
    for j in 0..n {
        for i in 0..n {
            triangles.push([index(i, j), index(i + 1, j), index(i + 1, j + 1)]);
            triangles.push([index(i, j), index(i + 1, j + 1), index(i, j + 1)]);
        }
    }
    TriMesh::from_triangles(positions, triangles).unwrap()
}

fn random_soup(rng: &mut StdRng, count: usize) -> TriMesh {
    let positions: Vec<Point3> = (0..count * 3)
        .map(|_| Point3::new(rng.gen(), rng.gen(), rng.gen()))
        .collect();
    let triangles = (0..count as u32)
        .map(|t| [3 * t, 3 * t + 1, 3 * t + 2])
        .collect();
    TriMesh::from_triangles(positions, triangles).unwrap()
}

fn run(mesh: &TriMesh, settings: &AnalysisSettings) -> (TriMesh, Vec<f64>) {
    let mut mesh = mesh.clone();
    let report = analyze(&mut mesh, settings, &mut NoProgress).unwrap();
    (mesh, report.face_field.values().to_vec())
}

fn all_modes() -> Vec<AnalysisMode> {
    vec![
        AnalysisMode::obscurance(),
        AnalysisMode::AmbientOcclusion,
        AnalysisMode::sdf(),
        AnalysisMode::Sdf {
            cone_angle: 0.5,
            statistic: SdfStatistic::TrimmedMean { fraction: 0.2 },
        },
        AnalysisMode::directional([0.3, 0.2, 1.0]),
        AnalysisMode::DirectionalVisibility {
            direction: [1.0, 0.0, 0.0],
            jitter: 0.2,
        },
        AnalysisMode::NormalAnalysis,
    ]
}

#[test]
fn test_results_independent_of_workers_and_strategy() {
    let mesh = l_shape();
    for mode in all_modes() {
        let base = AnalysisSettings::new(mode).with_rays(16).with_seed(7);
        let (_, reference) = run(&mesh, &base.clone().serial());
        for (workers, strategy) in [
            (4, Strategy::Inline),
            (4, Strategy::Threaded),
            (3, Strategy::Threaded),
        ] {
            let settings = base.clone().with_workers(workers).with_strategy(strategy);
            let (_, values) = run(&mesh, &settings);
            assert_eq!(values, reference, "{mode} with {workers} {strategy:?}");
        }
    }
}

#[test]
fn test_repeated_runs_identical() {
    let mesh = uv_sphere(1.0, 12, 6);
    let settings = AnalysisSettings::new(AnalysisMode::obscurance()).with_rays(8);
    let (first, a) = run(&mesh, &settings);
    let (second, b) = run(&mesh, &settings);
    assert_eq!(a, b);
    assert_eq!(first, second);
}

#[test]
fn test_seed_changes_samples() {
    let mesh = l_shape();
    let settings = AnalysisSettings::new(AnalysisMode::AmbientOcclusion).with_rays(16);
    let (_, a) = run(&mesh, &settings.clone().with_seed(1));
    let (_, b) = run(&mesh, &settings.with_seed(2));
    assert_ne!(a, b);
}

#[test]
fn test_value_ranges() {
    let mesh = l_shape();
    for mode in all_modes() {
        let settings = AnalysisSettings::new(mode).with_rays(16);
        let (out, values) = run(&mesh, &settings);
        for (f, &v) in values.iter().enumerate() {
            assert!(v.is_finite(), "{mode} face {f}");
            match mode {
                AnalysisMode::Sdf { .. } => assert!(v >= 0.0, "{mode} face {f}: {v}"),
                AnalysisMode::DirectionalVisibility { .. } => {
                    assert!(v == 0.0 || v == 1.0, "{mode} face {f}: {v}");
                    assert_eq!(out.faces[f].selected, v == 1.0);
                }
                _ => assert!((0.0..=1.0).contains(&v), "{mode} face {f}: {v}"),
            }
            assert_eq!(out.faces[f].quality, v);
        }
        for vertex in &out.vertices {
            assert!(vertex.quality.is_finite());
        }
    }
}

#[test]
fn test_obscurance_grows_with_tau() {
    let mesh = l_shape();
    let at = |tau: f64| {
        let settings = AnalysisSettings::new(AnalysisMode::Obscurance { tau }).with_rays(32);
        run(&mesh, &settings).1
    };
    let taus = [0.01, 0.1, 1.0, 10.0];
    let fields: Vec<Vec<f64>> = taus.iter().map(|&t| at(t)).collect();
    for pair in fields.windows(2) {
        for (low, high) in pair[0].iter().zip(&pair[1]) {
            assert!(low <= high);
        }
    }
    // the floor next to the wall is occluded at large tau
    assert!(fields[3].iter().any(|&v| v > 0.1));
}

#[test]
fn test_convex_meshes_are_unoccluded() {
    for mesh in [cube(1.0), uv_sphere(1.0, 24, 12)] {
        let settings = AnalysisSettings::new(AnalysisMode::AmbientOcclusion).with_rays(32);
        let (out, values) = run(&mesh, &settings);
        assert!(values.iter().all(|&v| v == 0.0));
        assert!(out.vertices.iter().all(|v| v.quality == 0.0));
    }
}

#[test]
fn test_sdf_of_thin_slab() {
    let mesh = cuboid(Vec3::new(4.0, 4.0, 0.2));
    let settings = AnalysisSettings::new(AnalysisMode::sdf()).with_rays(32);
    let (_, values) = run(&mesh, &settings);
    // bottom and top faces
    for &v in &values[..4] {
        assert_relative_eq!(v, 0.2, epsilon = 2e-3);
    }
}

#[test]
fn test_directional_shadow() {
    let mut mesh = floor_grid(10);
    let floor_faces = mesh.num_faces();
    mesh.merge(&translated(cube(1.0), Vec3::new(0.0, 0.0, 2.0)));

    let settings = AnalysisSettings::new(AnalysisMode::directional([0.0, 0.0, 1.0])).with_rays(4);
    let (out, values) = run(&mesh, &settings);

    for f in 0..floor_faces {
        let c = out.barycenter(f);
        let shadowed = c.x.abs() < 0.5 && c.y.abs() < 0.5;
        let expected = if shadowed { 0.0 } else { 1.0 };
        assert_eq!(values[f], expected, "floor face {f} at {c}");
        assert_eq!(out.faces[f].selected, !shadowed);
    }
    assert!(values[..floor_faces].iter().any(|&v| v == 0.0));
    // the cube's top faces see the light
    for f in floor_faces..out.num_faces() {
        if out.faces[f].normal.z > 0.99 {
            assert_eq!(values[f], 1.0);
        }
    }
}

#[test]
fn test_normal_analysis_repairs_cube() {
    let reference = cube(1.0);
    let mut mesh = reference.clone();
    for f in [0, 3, 7] {
        mesh.flip_face(f);
    }
    mesh.update_normals();

    let settings = AnalysisSettings::new(AnalysisMode::NormalAnalysis).with_rays(16);
    let report = analyze(&mut mesh, &settings, &mut NoProgress).unwrap();
    assert_eq!(report.flipped_faces, vec![0, 3, 7]);
    for (f, value) in report.face_field.values().iter().enumerate() {
        let expected = if [0, 3, 7].contains(&f) { 1.0 } else { 0.0 };
        assert_eq!(*value, expected, "face {f}");
    }
    for (repaired, original) in mesh.faces.iter().zip(&reference.faces) {
        assert_eq!(repaired.vertices, original.vertices);
        assert_relative_eq!(repaired.normal, original.normal, epsilon = 1e-12);
    }

    let again = analyze(&mut mesh, &settings, &mut NoProgress).unwrap();
    assert!(again.flipped_faces.is_empty());
}

#[test]
fn test_normal_analysis_repairs_sphere() {
    let reference = uv_sphere(1.0, 16, 8);
    let mut mesh = reference.clone();
    let flipped: Vec<usize> = (0..mesh.num_faces()).step_by(5).collect();
    for &f in &flipped {
        mesh.flip_face(f);
    }
    mesh.update_normals();

    let settings = AnalysisSettings::new(AnalysisMode::NormalAnalysis).with_rays(16);
    let report = analyze(&mut mesh, &settings, &mut NoProgress).unwrap();
    assert_eq!(report.flipped_faces, flipped);
    for (repaired, original) in mesh.faces.iter().zip(&reference.faces) {
        assert_eq!(repaired.vertices, original.vertices);
    }
}

#[test]
fn test_partition_invariance_on_random_soups() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..5 {
        let count = rng.gen_range(1..40);
        let mesh = random_soup(&mut rng, count);
        let base = AnalysisSettings::new(AnalysisMode::obscurance()).with_rays(8);
        let (_, reference) = run(&mesh, &base.clone().serial());
        for workers in 2..=6 {
            for strategy in [Strategy::Inline, Strategy::Threaded] {
                let settings = base.clone().with_workers(workers).with_strategy(strategy);
                assert_eq!(run(&mesh, &settings).1, reference);
            }
        }
    }
}

#[test]
fn test_open_mesh_is_unoccluded() {
    // a single open quad: every ray leaves through a boundary into empty space
    let quad = TriMesh::from_triangles(
        vec![
            Point3::new(-1.0, -1.0, 0.0),
            Point3::new(1.0, -1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(-1.0, 1.0, 0.0),
        ],
        vec![[0, 1, 2], [0, 2, 3]],
    )
    .unwrap();

    let cases = [
        (AnalysisMode::obscurance(), 0.0),
        (AnalysisMode::AmbientOcclusion, 0.0),
        (AnalysisMode::sdf(), 0.0),
        (AnalysisMode::directional([0.0, 0.0, 1.0]), 1.0),
        (AnalysisMode::NormalAnalysis, 0.0),
    ];
    for (mode, expected) in cases {
        let mut mesh = quad.clone();
        let settings = AnalysisSettings::new(mode).with_rays(64);
        let report = analyze(&mut mesh, &settings, &mut NoProgress).unwrap();
        for &v in report.face_field.values() {
            assert_eq!(v, expected, "{mode}");
            assert!(v.is_sign_positive(), "{mode} produced {v}");
        }
        assert!(report.flipped_faces.is_empty());
        for vertex in &mesh.vertices {
            assert_eq!(vertex.quality, expected, "{mode}");
        }
    }
}

#[test]
fn test_invalid_settings_leave_mesh_untouched() {
    let original = cube(1.0);
    let bad = [
        AnalysisSettings::default().with_rays(0),
        AnalysisSettings::default().with_workers(0),
        AnalysisSettings::new(AnalysisMode::Obscurance { tau: -1.0 }),
        AnalysisSettings::new(AnalysisMode::Obscurance { tau: f64::NAN }),
        AnalysisSettings::new(AnalysisMode::Sdf {
            cone_angle: 2.0,
            statistic: SdfStatistic::Median,
        }),
        AnalysisSettings::new(AnalysisMode::Sdf {
            cone_angle: 0.1,
            statistic: SdfStatistic::TrimmedMean { fraction: 0.7 },
        }),
        AnalysisSettings::new(AnalysisMode::directional([0.0, 0.0, 0.0])),
    ];
    for settings in bad {
        let mut mesh = original.clone();
        let err = analyze(&mut mesh, &settings, &mut NoProgress).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidSettings(_)), "{settings:?}");
        assert_eq!(mesh, original);
    }
}

#[test]
fn test_bad_indices_rejected() {
    let mut mesh = cube(1.0);
    mesh.faces[3].vertices[1] = 99;
    let original = mesh.clone();
    let mut calls = 0;
    let mut progress = |_: u8, _: &str| calls += 1;
    let err = analyze(&mut mesh, &AnalysisSettings::default(), &mut progress).unwrap_err();
    assert!(matches!(err, AnalysisError::InvalidMesh(_)));
    assert_eq!(mesh, original);
    assert_eq!(calls, 0);
}

#[test]
fn test_empty_mesh() {
    let mut mesh = TriMesh::new();
    let report = analyze(&mut mesh, &AnalysisSettings::default(), &mut NoProgress).unwrap();
    assert!(report.face_field.is_empty());
    assert!(report.vertex_field.is_empty());
    assert_eq!(report.rays_cast, 0);
    assert!(report.face_range().is_none());
}

#[test]
fn test_degenerate_faces_are_skipped() {
    let mut mesh = cube(1.0);
    mesh.faces.push(meshvis_mesh::Face::new([0, 1, 1]));
    let settings = AnalysisSettings::default().with_rays(8);
    let report = analyze(&mut mesh, &settings, &mut NoProgress).unwrap();
    assert_eq!(report.degenerate_faces, vec![12]);
    assert!(!report.face_field.is_defined(12));
    assert_eq!(report.rays_cast, 12 * 8);
}

#[test]
fn test_settings_from_toml() {
    let settings: AnalysisSettings = toml::from_str(
        r#"
        mode = "sdf"
        cone_angle = 0.2
        ray_count = 12
        workers = 2
        strategy = "inline"
        "#,
    )
    .unwrap();
    assert_eq!(settings.ray_count, 12);
    assert_eq!(settings.strategy, Strategy::Inline);
    let mut mesh = cuboid(Vec3::new(4.0, 4.0, 0.2));
    let report = analyze(&mut mesh, &settings, &mut NoProgress).unwrap();
    assert_eq!(report.mode.name(), "sdf");
}
