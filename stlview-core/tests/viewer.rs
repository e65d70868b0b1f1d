use std::io::Write;
use std::rc::Rc;

use approx::assert_relative_eq;
use stlview_core::{
    loader, Camera, LoadFailure, ManualScheduler, Material, Mesh, Node, Renderer, Scene,
    StlViewer, ViewerConfig,
};

/// Counts frames and remembers what it last saw
#[derive(Default)]
struct ProbeRenderer {
    frames: usize,
    size: (u32, u32),
    last_meshes: usize,
    last_light_y: Option<f32>,
    last_camera_z: f32,
}

impl Renderer<Scene, Camera> for ProbeRenderer {
    fn render(&mut self, scene: &Scene, camera: &Camera) -> anyhow::Result<()> {
        self.frames += 1;
        self.last_meshes = scene.meshes().count();
        self.last_light_y = scene.lights().next().map(|l| l.position.y);
        self.last_camera_z = camera.position.z;
        Ok(())
    }

    fn set_size(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }
}

fn viewer_with(config: ViewerConfig) -> (Rc<ManualScheduler>, StlViewer<ProbeRenderer>) {
    let scheduler = Rc::new(ManualScheduler::new());
    let viewer = StlViewer::new(
        config,
        ProbeRenderer::default(),
        scheduler.clone(),
        800,
        600,
    );
    (scheduler, viewer)
}

fn offset_cube() -> Mesh {
    let mut mesh = Mesh::cube(50.0);
    for triangle in &mut mesh.triangles {
        for vertex in &mut triangle.vertices {
            vertex.position.x += 300.0;
        }
    }
    mesh
}

#[test]
fn stock_scene_has_marker_cube_and_light() {
    let (_scheduler, viewer) = viewer_with(ViewerConfig::default());
    let scene = viewer.scene().borrow();

    assert_eq!(scene.meshes().count(), 1);
    let light = scene.light(viewer.light()).unwrap();
    assert_eq!(light.position.y, 5.0);
    assert_eq!(light.distance, 100.0);

    let marker = scene.meshes().next().unwrap();
    assert!(matches!(marker.material, Material::Basic { .. }));
    assert_eq!(viewer.renderer().borrow().size, (800, 600));
    assert_relative_eq!(viewer.camera().borrow().position.z, 500.0, epsilon = 1e-3);
}

#[test]
fn attached_model_is_centered_tilted_and_drawn() {
    let (scheduler, mut viewer) = viewer_with(ViewerConfig::default());
    let id = viewer.attach_model(Ok(offset_cube()), None).unwrap();
    viewer.start().unwrap();

    scheduler.advance_by(3);

    let scene = viewer.scene().borrow();
    let Some(Node::Mesh(model)) = scene.node(id) else {
        panic!("model node missing");
    };
    let bounds = model.mesh.bounding_box().unwrap();
    assert_relative_eq!(bounds.center().x, 0.0, epsilon = 1e-3);
    assert_relative_eq!(model.transform.rotation.x, -1.2);
    assert!(matches!(model.material, Material::Matcap { .. }));

    let renderer = viewer.renderer().borrow();
    assert_eq!(renderer.frames, 3);
    assert_eq!(renderer.last_meshes, 2);
}

#[test]
fn failed_load_is_returned_and_scene_keeps_rendering() {
    let (scheduler, mut viewer) = viewer_with(ViewerConfig::default());
    viewer.start().unwrap();

    let result = viewer.attach_model(loader::load_mesh_file("/nonexistent/part.stl"), None);

    assert!(matches!(result, Err(LoadFailure::Io { .. })));
    assert!(viewer.model().is_none());
    scheduler.advance();
    assert_eq!(viewer.renderer().borrow().frames, 1);
}

#[test]
fn model_loaded_from_disk() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        "solid tri\n facet normal 0 0 1\n  outer loop\n   vertex 0 0 0\n   vertex 10 0 0\n   vertex 0 10 0\n  endloop\n endfacet\nendsolid tri\n"
    )
    .unwrap();

    let (_scheduler, mut viewer) = viewer_with(ViewerConfig::default());
    let id = viewer
        .attach_model(loader::load_mesh_file(file.path()), None)
        .unwrap();

    assert_eq!(viewer.model(), Some(id));
}

#[test]
fn spin_trigger_rotates_model_each_frame() {
    let mut config = ViewerConfig::default();
    config.model.spin = [0.0, 0.05];
    let (scheduler, mut viewer) = viewer_with(config);
    let id = viewer.attach_model(Ok(Mesh::cube(20.0)), None).unwrap();
    viewer.start().unwrap();

    scheduler.advance_by(4);

    let mut scene = viewer.scene().borrow_mut();
    assert_relative_eq!(scene.mesh_mut(id).unwrap().transform.rotation.y, 0.2, epsilon = 1e-5);
}

#[test]
fn replacing_model_drops_old_spin_trigger() {
    let mut config = ViewerConfig::default();
    config.model.spin = [0.01, 0.0];
    let (scheduler, mut viewer) = viewer_with(config);
    viewer.attach_model(Ok(Mesh::cube(20.0)), None).unwrap();
    viewer.attach_model(Ok(Mesh::cube(30.0)), None).unwrap();
    viewer.start().unwrap();

    scheduler.advance_by(2);

    assert_eq!(viewer.frame_loop().triggers().len(), 1);
    assert_eq!(viewer.frame_loop().stats().trigger_faults, 0);
    assert_eq!(viewer.scene().borrow().meshes().count(), 2);
}

#[test]
fn no_spin_registers_no_trigger() {
    let (_scheduler, mut viewer) = viewer_with(ViewerConfig::default());
    viewer.attach_model(Ok(Mesh::cube(20.0)), None).unwrap();
    assert!(viewer.frame_loop().triggers().is_empty());
}

#[test]
fn light_height_is_bounded_and_visible_to_renderer() {
    let (scheduler, mut viewer) = viewer_with(ViewerConfig::default());
    viewer.start().unwrap();

    assert_eq!(viewer.set_light_y(25.0), 10.0);
    scheduler.advance();
    assert_eq!(viewer.renderer().borrow().last_light_y, Some(10.0));

    let y = viewer.nudge_light_y(-5);
    assert_relative_eq!(y, 9.5, epsilon = 1e-4);
    assert_relative_eq!(viewer.light_y(), 9.5, epsilon = 1e-4);
}

#[test]
fn resize_updates_camera_and_renderer() {
    let (_scheduler, mut viewer) = viewer_with(ViewerConfig::default());

    viewer.resize(1000, 500);

    assert_relative_eq!(viewer.camera().borrow().aspect, 2.0);
    assert_eq!(viewer.renderer().borrow().size, (1000, 500));
    assert_eq!(viewer.viewport(), (1000, 500));
}

#[test]
fn zoom_respects_configured_distance_bounds() {
    let (scheduler, mut viewer) = viewer_with(ViewerConfig::default());
    viewer.start().unwrap();

    viewer.zoom_steps(100);
    scheduler.advance();
    assert_relative_eq!(viewer.renderer().borrow().last_camera_z, 700.0, epsilon = 1e-2);

    viewer.zoom_steps(-100);
    assert_relative_eq!(viewer.controls().distance(), 100.0);
}

#[test]
fn two_viewers_do_not_share_state() {
    let (scheduler_a, mut a) = viewer_with(ViewerConfig::default());
    let (_scheduler_b, b) = viewer_with(ViewerConfig::default());
    a.start().unwrap();
    b.start().unwrap();

    a.set_light_y(-3.0);
    scheduler_a.advance_by(2);

    assert_relative_eq!(b.light_y(), 5.0);
    assert_eq!(a.renderer().borrow().frames, 2);
    assert_eq!(b.renderer().borrow().frames, 0);
}

#[test]
fn dropping_viewer_stops_its_loop() {
    let (scheduler, viewer) = viewer_with(ViewerConfig::default());
    viewer.start().unwrap();
    assert_eq!(scheduler.pending(), 1);

    drop(viewer);

    assert_eq!(scheduler.pending(), 0);
}

#[test]
fn light_height_with_inverted_bounds_is_still_clamped() {
    let mut config = ViewerConfig::default();
    config.debug.light_y_min = 10.0;
    config.debug.light_y_max = -10.0;
    let (_scheduler, mut viewer) = viewer_with(config);

    assert_relative_eq!(viewer.set_light_y(3.0), 3.0, epsilon = 1e-4);
    assert_eq!(viewer.set_light_y(40.0), 10.0);
    assert_eq!(
        viewer.debug_panel().bounds(viewer.light_control()),
        Some((-10.0, 10.0))
    );
}
