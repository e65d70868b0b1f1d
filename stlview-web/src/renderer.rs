//! Canvas 2D renderer: flat-shaded triangles drawn back to front.

use anyhow::anyhow;
use nalgebra::{Matrix3, Matrix4, Vector3};
use stlview_core::{Camera, Color, Renderer, Scene};
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

const BACKGROUND: &str = "#000000";
const LIGHT_RADIUS: f64 = 4.0;

/// One projected triangle waiting to be painted
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Face {
    pub depth: f32,
    pub points: [(f32, f32); 3],
    pub fill: String,
}

pub struct CanvasRenderer {
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
    faces: Vec<Face>,
}

impl CanvasRenderer {
    pub fn new(canvas: HtmlCanvasElement) -> anyhow::Result<Self> {
        let context = canvas
            .get_context("2d")
            .map_err(|e| anyhow!("failed to get 2d context: {e:?}"))?
            .ok_or_else(|| anyhow!("canvas has no 2d context"))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| anyhow!("2d context has an unexpected type"))?;

        Ok(Self {
            canvas,
            context,
            faces: Vec::new(),
        })
    }

    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    fn collect_faces(&mut self, scene: &Scene, camera: &Camera) {
        let (width, height) = (self.canvas.width(), self.canvas.height());
        self.faces.clear();

        for node in scene.meshes() {
            let model = node.transform.model_matrix();
            let normal_matrix: Matrix3<f32> = (camera.view_matrix() * model)
                .fixed_view::<3, 3>(0, 0)
                .into_owned();

            'triangles: for triangle in &node.mesh.triangles {
                let mut points = [(0.0, 0.0); 3];
                let mut depth = 0.0;
                for (point, vertex) in points.iter_mut().zip(&triangle.vertices) {
                    let Some((x, y, z)) =
                        camera.project_to_screen(&vertex.position, &model, width, height)
                    else {
                        continue 'triangles;
                    };
                    *point = (x, y);
                    depth += z / 3.0;
                }

                let view_normal = (normal_matrix * triangle.calculate_normal())
                    .try_normalize(f32::EPSILON)
                    .unwrap_or_else(Vector3::zeros);
                let brightness = node.material.shade(&view_normal).clamp(0.0, 1.0);

                self.faces.push(Face {
                    depth,
                    points,
                    fill: css_color(node.material.color().scaled(brightness)),
                });
            }
        }

        sort_back_to_front(&mut self.faces);
    }

    fn paint_faces(&self) {
        for face in &self.faces {
            let [(x0, y0), (x1, y1), (x2, y2)] = face.points;
            self.context.set_fill_style_str(&face.fill);
            self.context.begin_path();
            self.context.move_to(x0 as f64, y0 as f64);
            self.context.line_to(x1 as f64, y1 as f64);
            self.context.line_to(x2 as f64, y2 as f64);
            self.context.close_path();
            self.context.fill();
        }
    }

    fn paint_lights(&self, scene: &Scene, camera: &Camera) -> anyhow::Result<()> {
        let (width, height) = (self.canvas.width(), self.canvas.height());
        for light in scene.lights() {
            let Some((x, y, _)) =
                camera.project_to_screen(&light.position, &Matrix4::identity(), width, height)
            else {
                continue;
            };
            self.context.set_fill_style_str(&css_color(light.color));
            self.context.begin_path();
            self.context
                .arc(x as f64, y as f64, LIGHT_RADIUS, 0.0, std::f64::consts::TAU)
                .map_err(|e| anyhow!("failed to draw light: {e:?}"))?;
            self.context.fill();
        }
        Ok(())
    }
}

impl Renderer<Scene, Camera> for CanvasRenderer {
    fn render(&mut self, scene: &Scene, camera: &Camera) -> anyhow::Result<()> {
        self.collect_faces(scene, camera);

        let (width, height) = (self.canvas.width() as f64, self.canvas.height() as f64);
        self.context.set_fill_style_str(BACKGROUND);
        self.context.fill_rect(0.0, 0.0, width, height);

        self.paint_faces();
        self.paint_lights(scene, camera)
    }

    fn set_size(&mut self, width: u32, height: u32) {
        self.canvas.set_width(width);
        self.canvas.set_height(height);
    }
}

pub(crate) fn css_color(color: Color) -> String {
    let (r, g, b) = color.to_rgb8();
    format!("rgb({r}, {g}, {b})")
}

/// Painter's order: larger NDC depth is farther away and drawn first
pub(crate) fn sort_back_to_front(faces: &mut [Face]) {
    faces.sort_by(|a, b| b.depth.total_cmp(&a.depth));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face(depth: f32) -> Face {
        Face {
            depth,
            points: [(0.0, 0.0); 3],
            fill: String::new(),
        }
    }

    #[test]
    fn test_css_color() {
        assert_eq!(css_color(Color::from_hex(0xff0000)), "rgb(255, 0, 0)");
        assert_eq!(css_color(Color::from_hex(0x00ff00)), "rgb(0, 255, 0)");
    }

    #[test]
    fn test_far_faces_painted_first() {
        let mut faces = vec![face(0.2), face(0.9), face(-0.5)];
        sort_back_to_front(&mut faces);
        let order: Vec<f32> = faces.iter().map(|f| f.depth).collect();
        assert_eq!(order, [0.9, 0.2, -0.5]);
    }
}
