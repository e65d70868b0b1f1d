/// ASCII rasterizer for terminal rendering
use crossterm::{
    cursor,
    style::{Color, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use nalgebra::{Matrix3, Matrix4, Vector3};
use std::io::{self, Stdout, Write};
use stlview_core::{Camera, Material, MeshNode, PointLight, Renderer, Scene, Triangle};

/// Character luminosity ramp for shading (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Terminal cells are roughly twice as tall as they are wide
pub const CELL_ASPECT: u32 = 2;

const LIGHT_GLYPH: char = 'o';

#[derive(Debug, Clone, Copy, PartialEq)]
struct Cell {
    glyph: char,
    color: Color,
}

const BLANK: Cell = Cell {
    glyph: ' ',
    color: Color::Reset,
};

/// ASCII renderer that rasterizes a scene into terminal characters.
///
/// `set_size` takes the viewport in square units: `(columns, rows * CELL_ASPECT)`.
pub struct AsciiRenderer<W: Write = Stdout> {
    out: W,
    width: usize,
    height: usize,
    depth_buffer: Vec<f32>,
    cells: Vec<Cell>,
    status: String,
}

impl AsciiRenderer<Stdout> {
    pub fn new(width: usize, height: usize) -> Self {
        Self::with_writer(io::stdout(), width, height)
    }
}

impl<W: Write> AsciiRenderer<W> {
    pub fn with_writer(out: W, width: usize, height: usize) -> Self {
        let size = width * height;
        Self {
            out,
            width,
            height,
            depth_buffer: vec![f32::INFINITY; size],
            cells: vec![BLANK; size],
            status: String::new(),
        }
    }

    /// Text drawn over the top row of the next frames
    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn glyph_at(&self, x: usize, y: usize) -> Option<char> {
        (x < self.width && y < self.height).then(|| self.cells[y * self.width + x].glyph)
    }

    pub fn writer(&self) -> &W {
        &self.out
    }

    pub fn clear(&mut self) {
        self.depth_buffer.fill(f32::INFINITY);
        self.cells.fill(BLANK);
    }

    /// Rasterize the scene into the cell buffer without writing it out
    pub fn rasterize(&mut self, scene: &Scene, camera: &Camera) {
        self.clear();
        for node in scene.meshes() {
            self.render_mesh(node, camera);
        }
        for light in scene.lights() {
            self.render_light(light, camera);
        }
    }

    fn render_mesh(&mut self, node: &MeshNode, camera: &Camera) {
        let model = node.transform.model_matrix();
        let model_view = camera.view_matrix() * model;
        let normal_matrix: Matrix3<f32> = model_view.fixed_view::<3, 3>(0, 0).into_owned();

        for triangle in &node.mesh.triangles {
            self.render_triangle(triangle, &model, &normal_matrix, &node.material, camera);
        }
    }

    fn render_triangle(
        &mut self,
        triangle: &Triangle,
        model_matrix: &Matrix4<f32>,
        normal_matrix: &Matrix3<f32>,
        material: &Material,
        camera: &Camera,
    ) {
        let mut screen_coords = [(0.0, 0.0, 0.0); 3];
        for (coords, vertex) in screen_coords.iter_mut().zip(&triangle.vertices) {
            match camera.project_to_screen(
                &vertex.position,
                model_matrix,
                self.width as u32,
                self.height as u32,
            ) {
                Some(projected) => *coords = projected,
                None => return, // Triangle is clipped
            }
        }

        let view_normal = (normal_matrix * triangle.calculate_normal())
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Vector3::zeros);
        let brightness = material.shade(&view_normal).clamp(0.0, 1.0);

        let char_index = (brightness * (LUMINOSITY_RAMP.len() - 1) as f32).round() as usize;
        let glyph = LUMINOSITY_RAMP[char_index.min(LUMINOSITY_RAMP.len() - 1)];
        let (r, g, b) = material.color().scaled(0.35 + 0.65 * brightness).to_rgb8();

        self.rasterize_triangle(
            &screen_coords,
            Cell {
                glyph,
                color: Color::Rgb { r, g, b },
            },
        );
    }

    fn render_light(&mut self, light: &PointLight, camera: &Camera) {
        let projected = camera.project_to_screen(
            &light.position,
            &Matrix4::identity(),
            self.width as u32,
            self.height as u32,
        );
        let Some((x, y, _)) = projected else {
            return;
        };
        let (x, y) = (x as usize, y as usize);
        if x < self.width && y < self.height {
            let (r, g, b) = light.color.to_rgb8();
            self.cells[y * self.width + x] = Cell {
                glyph: LIGHT_GLYPH,
                color: Color::Rgb { r, g, b },
            };
        }
    }

    fn rasterize_triangle(&mut self, coords: &[(f32, f32, f32); 3], cell: Cell) {
        if self.width == 0 || self.height == 0 {
            return;
        }
        let (v0, v1, v2) = (coords[0], coords[1], coords[2]);

        // Bounding box, clipped to screen bounds
        let min_x = (v0.0.min(v1.0).min(v2.0).floor() as i32).max(0);
        let max_x = (v0.0.max(v1.0).max(v2.0).ceil() as i32).min(self.width as i32 - 1);
        let min_y = (v0.1.min(v1.1).min(v2.1).floor() as i32).max(0);
        let max_y = (v0.1.max(v1.1).max(v2.1).ceil() as i32).min(self.height as i32 - 1);

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let px = x as f32 + 0.5;
                let py = y as f32 + 0.5;

                let Some((w0, w1, w2)) =
                    barycentric((v0.0, v0.1), (v1.0, v1.1), (v2.0, v2.1), (px, py))
                else {
                    continue;
                };
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }

                let depth = w0 * v0.2 + w1 * v1.2 + w2 * v2.2;
                let idx = y as usize * self.width + x as usize;
                if depth < self.depth_buffer[idx] {
                    self.depth_buffer[idx] = depth;
                    self.cells[idx] = cell;
                }
            }
        }
    }

    /// Write the cell buffer and status line to the output
    pub fn draw(&mut self) -> io::Result<()> {
        let mut current = None;
        for y in 0..self.height {
            self.out.queue(cursor::MoveTo(0, y as u16))?;
            for x in 0..self.width {
                let cell = self.cells[y * self.width + x];
                if current != Some(cell.color) {
                    self.out.queue(SetForegroundColor(cell.color))?;
                    current = Some(cell.color);
                }
                self.out.queue(Print(cell.glyph))?;
            }
        }

        if !self.status.is_empty() {
            let status: String = self.status.chars().take(self.width).collect();
            self.out
                .queue(cursor::MoveTo(0, 0))?
                .queue(SetForegroundColor(Color::Yellow))?
                .queue(Print(status))?;
        }

        self.out.queue(ResetColor)?;
        self.out.flush()
    }
}

impl<W: Write> Renderer<Scene, Camera> for AsciiRenderer<W> {
    fn render(&mut self, scene: &Scene, camera: &Camera) -> anyhow::Result<()> {
        self.rasterize(scene, camera);
        self.draw()?;
        Ok(())
    }

    fn set_size(&mut self, width: u32, height: u32) {
        let width = width as usize;
        let height = (height / CELL_ASPECT) as usize;
        if (width, height) == (self.width, self.height) {
            return;
        }
        self.width = width;
        self.height = height;
        self.depth_buffer = vec![f32::INFINITY; width * height];
        self.cells = vec![BLANK; width * height];
    }
}

/// Calculate barycentric coordinates for a point in a triangle
fn barycentric(
    v0: (f32, f32),
    v1: (f32, f32),
    v2: (f32, f32),
    p: (f32, f32),
) -> Option<(f32, f32, f32)> {
    let denom = (v1.1 - v2.1) * (v0.0 - v2.0) + (v2.0 - v1.0) * (v0.1 - v2.1);

    if denom.abs() < 1e-6 {
        return None;
    }

    let w0 = ((v1.1 - v2.1) * (p.0 - v2.0) + (v2.0 - v1.0) * (p.1 - v2.1)) / denom;
    let w1 = ((v2.1 - v0.1) * (p.0 - v2.0) + (v0.0 - v2.0) * (p.1 - v2.1)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some((w0, w1, w2))
}
