//! The model viewer: one loaded mesh, a marker cube, a point light with a
//! height control, orbit controls and the frame loop that draws them.
//!
//! Everything here is per instance; two viewers never share a scene, a
//! debug panel or a loop.

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::anyhow;
use nalgebra::Point3;

use crate::config::ViewerConfig;
use crate::controls::OrbitControls;
use crate::debug::{ControlId, DebugPanel};
use crate::error::{FrameFault, LoadFailure};
use crate::frame_loop::{FrameLoop, Renderer};
use crate::geometry::Mesh;
use crate::projection::Camera;
use crate::scene::{Color, Material, NodeId, PointLight, Scene, Texture};
use crate::schedule::FrameScheduler;
use crate::transform::{NodeTransform, RotationState};
use crate::trigger::{TriggerHandle, Triggers};

pub struct StlViewer<R> {
    config: ViewerConfig,
    controls: OrbitControls,
    debug: DebugPanel,
    light: NodeId,
    light_y: ControlId,
    model: Option<NodeId>,
    spin: Option<TriggerHandle>,
    viewport: (u32, u32),
    frame_loop: FrameLoop<Scene, Camera, R>,
}

impl<R> StlViewer<R>
where
    R: Renderer<Scene, Camera> + 'static,
{
    pub fn new(
        config: ViewerConfig,
        mut renderer: R,
        scheduler: Rc<dyn FrameScheduler>,
        width: u32,
        height: u32,
    ) -> Self {
        let mut scene = Scene::new();

        if config.marker.enabled {
            scene.add_mesh(
                Mesh::cube(config.marker.size),
                Material::Basic {
                    color: Color::from_hex(config.marker.color),
                },
                NodeTransform::default(),
            );
        }

        let [x, y, z] = config.light.position;
        let light = scene.add_light(PointLight {
            color: Color::from_hex(config.light.color),
            intensity: config.light.intensity,
            distance: config.light.distance,
            position: Point3::new(x, y, z),
        });

        let camera = Camera::from_config(&config.camera, width, height);
        let controls = OrbitControls::from_camera(
            &camera,
            config.controls.min_distance,
            config.controls.max_distance,
        );

        renderer.set_size(width, height);

        let scene = Rc::new(RefCell::new(scene));
        let frame_loop = FrameLoop::new(
            Rc::clone(&scene),
            Rc::new(RefCell::new(camera)),
            Rc::new(RefCell::new(renderer)),
            scheduler,
        )
        .with_policy(config.frame.fault_policy);

        let mut debug = DebugPanel::new();
        let (get_scene, set_scene) = (Rc::clone(&scene), scene);
        let light_y = debug
            .add_number(
                "light.y",
                move || {
                    get_scene
                        .borrow()
                        .light(light)
                        .map_or(0.0, |l| l.position.y)
                },
                move |value| {
                    if let Some(l) = set_scene.borrow_mut().light_mut(light) {
                        l.position.y = value;
                    }
                },
            )
            .min(config.debug.light_y_min)
            .max(config.debug.light_y_max)
            .step(config.debug.light_y_step)
            .id();

        let mut viewer = Self {
            config,
            controls,
            debug,
            light,
            light_y,
            model: None,
            spin: None,
            viewport: (width, height),
            frame_loop,
        };
        viewer.sync_camera();
        viewer
    }

    /// Add the loaded mesh to the scene, replacing any previous model.
    ///
    /// A failed load is logged and handed back; the rest of the scene keeps
    /// rendering without a model.
    pub fn attach_model(
        &mut self,
        loaded: Result<Mesh, LoadFailure>,
        matcap: Option<Texture>,
    ) -> Result<NodeId, LoadFailure> {
        let mut mesh = match loaded {
            Ok(mesh) => mesh,
            Err(failure) => {
                log::error!("model not shown: {failure}");
                return Err(failure);
            }
        };

        self.detach_model();

        mesh.compute_vertex_normals();
        mesh.center();

        let transform = NodeTransform {
            rotation: RotationState::new(self.config.model.rotation_x, 0.0, 0.0),
            ..NodeTransform::default()
        };
        let material = Material::Matcap {
            color: Color::from_hex(self.config.model.color),
            matcap,
        };
        let id = self
            .frame_loop
            .scene()
            .borrow_mut()
            .add_mesh(mesh, material, transform);
        self.model = Some(id);

        let [spin_x, spin_y] = self.config.model.spin;
        if spin_x != 0.0 || spin_y != 0.0 {
            let scene = Rc::clone(self.frame_loop.scene());
            self.spin = Some(self.frame_loop.add_trigger(move || {
                let mut scene = scene.borrow_mut();
                let node = scene
                    .mesh_mut(id)
                    .ok_or_else(|| anyhow!("model node {id:?} is no longer in the scene"))?;
                node.transform.rotation.rotate(spin_x, spin_y, 0.0);
                Ok(())
            }));
        }

        Ok(id)
    }

    pub fn detach_model(&mut self) {
        if let Some(handle) = self.spin.take() {
            self.frame_loop.off_trigger(handle);
        }
        if let Some(id) = self.model.take() {
            self.frame_loop.scene().borrow_mut().remove(id);
        }
    }

    /// Track a new viewport size: camera aspect, projection, output surface
    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
        self.frame_loop
            .camera()
            .borrow_mut()
            .set_viewport(width, height);
        self.frame_loop.renderer().borrow_mut().set_size(width, height);
        log::debug!("viewport resized to {width}x{height}");
    }

    pub fn orbit(&mut self, d_azimuth: f32, d_polar: f32) {
        self.controls.rotate(d_azimuth, d_polar);
        self.sync_camera();
    }

    /// Factors above 1 move away from the model
    pub fn zoom(&mut self, factor: f32) {
        self.controls.zoom(factor);
        self.sync_camera();
    }

    /// One configured rotate step in each direction
    pub fn orbit_steps(&mut self, azimuth_steps: i32, polar_steps: i32) {
        let step = self.config.controls.rotate_step;
        self.orbit(azimuth_steps as f32 * step, polar_steps as f32 * step);
    }

    /// Positive steps zoom out
    pub fn zoom_steps(&mut self, steps: i32) {
        self.zoom(self.config.controls.zoom_step.powi(steps));
    }

    fn sync_camera(&mut self) {
        let mut camera = self.frame_loop.camera().borrow_mut();
        self.controls.apply(&mut camera);
        camera.update_projection_matrix();
    }

    /// Returns the height actually applied after clamping and snapping
    pub fn set_light_y(&mut self, y: f32) -> f32 {
        self.debug.set(self.light_y, y).unwrap_or_default()
    }

    pub fn nudge_light_y(&mut self, steps: i32) -> f32 {
        self.debug.nudge(self.light_y, steps).unwrap_or_default()
    }

    pub fn light_y(&self) -> f32 {
        self.debug.value(self.light_y).unwrap_or_default()
    }

    pub fn start(&self) -> Result<(), FrameFault> {
        self.frame_loop.start()
    }

    pub fn stop(&self) {
        self.frame_loop.stop();
    }

    pub fn is_running(&self) -> bool {
        self.frame_loop.is_running()
    }

    /// Shared handle to this viewer's trigger registry
    pub fn triggers(&self) -> Triggers {
        self.frame_loop.triggers()
    }

    pub fn frame_loop(&self) -> &FrameLoop<Scene, Camera, R> {
        &self.frame_loop
    }

    pub fn scene(&self) -> &Rc<RefCell<Scene>> {
        self.frame_loop.scene()
    }

    pub fn camera(&self) -> &Rc<RefCell<Camera>> {
        self.frame_loop.camera()
    }

    pub fn renderer(&self) -> &Rc<RefCell<R>> {
        self.frame_loop.renderer()
    }

    pub fn debug_panel(&self) -> &DebugPanel {
        &self.debug
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn controls(&self) -> &OrbitControls {
        &self.controls
    }

    pub fn model(&self) -> Option<NodeId> {
        self.model
    }

    /// Debug control bound to the light's height
    pub fn light_control(&self) -> ControlId {
        self.light_y
    }

    pub fn light(&self) -> NodeId {
        self.light
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }
}
