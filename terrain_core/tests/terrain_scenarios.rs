use std::sync::Arc;

use terrain_core::mesh::{self, FLAT_NORMAL};
use terrain_core::{
    BandPalette, DrawCommand, ElevationGrid, HeightThresholds, InputEvent, InteractionController,
    MeshParams, TerrainPipeline, ViewerConfig, ViewerKey,
};

const EPSILON: f32 = 1e-5;

fn bump() -> ElevationGrid {
    ElevationGrid::from_rows(vec![
        vec![0.0, 0.0, 0.0],
        vec![0.0, 10.0, 0.0],
        vec![0.0, 0.0, 0.0],
    ])
    .unwrap()
}

/// Cheap deterministic height field with plenty of slope variation.
fn rolling_grid(rows: usize, cols: usize) -> ElevationGrid {
    ElevationGrid::from_fn(rows, cols, |r, c| {
        let x = r as f32 * 0.37;
        let y = c as f32 * 0.21;
        100.0 + 50.0 * (2.0 * x).sin() * (2.0 * y).cos() + 25.0 * (4.0 * x).sin()
    })
    .unwrap()
}

#[test]
fn center_peak_is_high_and_border_is_water() {
    let params = MeshParams {
        height_scale: 1.0,
        thresholds: HeightThresholds {
            water: 0.3,
            low: 0.6,
            mid: 0.8,
        },
        ..MeshParams::default()
    };
    let mesh = mesh::build(&bump(), &params).unwrap();
    let palette = BandPalette::default();

    assert_eq!(mesh.vertex(1, 1).color, palette.high);
    for row in 0..3 {
        for col in 0..3 {
            if (row, col) != (1, 1) {
                assert_eq!(mesh.vertex(row, col).color, palette.water, "cell {row},{col}");
            }
        }
    }
}

#[test]
fn vertex_count_and_unit_normals_hold_for_many_shapes() {
    for (rows, cols) in [(2, 2), (2, 7), (5, 3), (17, 31), (50, 50)] {
        let grid = rolling_grid(rows, cols);
        let mesh = mesh::build(&grid, &MeshParams::default()).unwrap();
        assert_eq!(mesh.vertices().len(), rows * cols);
        assert_eq!(mesh.strips().len(), rows - 1);
        for vertex in mesh.vertices() {
            let [x, y, z] = vertex.normal;
            let length = (x * x + y * y + z * z).sqrt();
            assert!(
                (length - 1.0).abs() < EPSILON || vertex.normal == FLAT_NORMAL,
                "normal {:?} for {rows}x{cols}",
                vertex.normal
            );
        }
    }
}

#[test]
fn second_load_replaces_first_mesh() {
    let config = ViewerConfig::default();
    let mut pipeline = TerrainPipeline::new(&config);

    pipeline.load_data(Arc::new(rolling_grid(4, 4)), None).unwrap();
    pipeline.load_data(Arc::new(rolling_grid(6, 9)), None).unwrap();

    let plan = pipeline.frame(1200, 800);
    let drawn: Vec<_> = plan
        .commands
        .iter()
        .filter_map(|command| match command {
            DrawCommand::DrawTerrain {
                mesh, generation, ..
            } => Some((mesh.rows(), mesh.cols(), *generation)),
            _ => None,
        })
        .collect();
    assert_eq!(drawn, vec![(6, 9, 2)]);
}

#[test]
fn unordered_thresholds_leave_placeholder_in_place() {
    let mut config = ViewerConfig::default();
    config.thresholds.low = 0.1;
    let mut pipeline = TerrainPipeline::new(&config);
    assert!(pipeline.load_data(Arc::new(bump()), None).is_err());
    assert!(pipeline.generation().is_none());
    assert!(matches!(
        pipeline.frame(64, 64).commands.last(),
        Some(DrawCommand::DrawPlaceholder)
    ));
}

#[test]
fn flat_grid_is_all_water() {
    let grid = ElevationGrid::new(4, 5, vec![12.5; 20]).unwrap();
    let mesh = mesh::build(&grid, &MeshParams::default()).unwrap();
    let water = BandPalette::default().water;
    assert!(mesh.height_range().is_flat());
    assert!(mesh.vertices().iter().all(|v| v.color == water));
    assert!(mesh.vertices().iter().all(|v| v.position[2] == 12.5_f32 * 0.1));
}

#[test]
fn reset_is_idempotent_after_load() {
    let config = ViewerConfig::default();
    let mut pipeline = TerrainPipeline::new(&config);
    pipeline.load_data(Arc::new(bump()), None).unwrap();
    let camera = pipeline.camera_mut();
    camera.rotate(40.0, -12.0, 0.5);
    camera.pan(30.0, 30.0, 0.01);
    camera.reset();
    let once = camera.pose();
    camera.reset();
    assert_eq!(camera.pose(), once);
    assert_eq!(once.distance, 5.0);
}

#[test]
fn reset_key_after_load_returns_to_startup_distance() {
    let config = ViewerConfig::default();
    let mut pipeline = TerrainPipeline::new(&config);
    let mut controller = InteractionController::new(&config.camera);
    pipeline.load_data(Arc::new(bump()), None).unwrap();
    assert_eq!(pipeline.camera().distance, 8.0);

    controller.handle(InputEvent::Scroll { delta: 600.0 }, &mut pipeline);
    assert!(pipeline.camera().distance < 8.0);
    controller.handle(InputEvent::Key(ViewerKey::ResetCamera), &mut pipeline);
    assert_eq!(pipeline.camera().distance, 5.0);
    assert_eq!(pipeline.camera().rotation_x, -30.0);

    // A later load jumps back out to the loaded distance.
    pipeline.load_data(Arc::new(bump()), None).unwrap();
    assert_eq!(pipeline.camera().distance, 8.0);
}

#[test]
fn extreme_input_sequences_respect_camera_bounds() {
    let config = ViewerConfig::default();
    let mut pipeline = TerrainPipeline::new(&config);
    let mut controller = InteractionController::new(&config.camera);
    let (min, max) = pipeline.camera().distance_bounds();

    let deltas = [1.0e9_f32, -3.5e8, 120.0, -120.0, 0.0, 7.0e3, -1.0e4];
    for (i, &delta) in deltas.iter().cycle().take(200).enumerate() {
        controller.handle(InputEvent::Scroll { delta }, &mut pipeline);
        pipeline
            .camera_mut()
            .rotate(delta * (i as f32 - 100.0), delta, 0.5);
        let camera = pipeline.camera();
        assert!((-89.0..=89.0).contains(&camera.rotation_x));
        assert!((min..=max).contains(&camera.distance));
    }
}

#[test]
fn rotate_scenario_leaves_pitch_alone() {
    let config = ViewerConfig::default();
    let mut pipeline = TerrainPipeline::new(&config);
    let camera = pipeline.camera_mut();
    camera.rotate(1000.0, 0.0, 0.5);
    assert_eq!(camera.rotation_y, 500.0);
    assert_eq!(camera.rotation_x, -30.0);
}
