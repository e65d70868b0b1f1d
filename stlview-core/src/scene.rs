//! Scene graph: the meshes and lights a renderer draws each frame.
//!
//! Nodes are stored in insertion order and addressed by [`NodeId`]; ids are
//! never reused, so a stale id simply resolves to `None`.

use nalgebra::{Point3, Vector3};

use crate::geometry::Mesh;
use crate::transform::NodeTransform;

/// Linear RGB color with components in `0.0..=1.0`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// From a `0xRRGGBB` literal
    pub fn from_hex(hex: u32) -> Self {
        let channel = |shift: u32| ((hex >> shift) & 0xff) as f32 / 255.0;
        Self::new(channel(16), channel(8), channel(0))
    }

    pub fn to_rgb8(self) -> (u8, u8, u8) {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        (q(self.r), q(self.g), q(self.b))
    }

    pub fn scaled(self, factor: f32) -> Self {
        Self::new(self.r * factor, self.g * factor, self.b * factor)
    }
}

/// Single-channel texture used as a matcap lookup
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    luminance: Vec<f32>,
}

impl Texture {
    /// Returns `None` if `luminance` does not hold `width * height` texels
    pub fn new(width: u32, height: u32, luminance: Vec<f32>) -> Option<Self> {
        if width == 0 || height == 0 || luminance.len() != (width * height) as usize {
            return None;
        }
        Some(Self {
            width,
            height,
            luminance,
        })
    }

    /// Nearest-texel sample, `u` and `v` clamped to `0.0..=1.0`, `v` pointing up
    pub fn sample(&self, u: f32, v: f32) -> f32 {
        let x = (u.clamp(0.0, 1.0) * (self.width - 1) as f32).round() as u32;
        let y = ((1.0 - v.clamp(0.0, 1.0)) * (self.height - 1) as f32).round() as u32;
        self.luminance[(y * self.width + x) as usize]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Material {
    /// Unlit flat color
    Basic { color: Color },
    /// Unlit, shaded by looking the view-space normal up in a matcap
    Matcap {
        color: Color,
        matcap: Option<Texture>,
    },
}

impl Material {
    pub fn color(&self) -> Color {
        match self {
            Material::Basic { color } | Material::Matcap { color, .. } => *color,
        }
    }

    /// Brightness in `0.0..=1.0` for a surface with the given view-space normal
    pub fn shade(&self, view_normal: &Vector3<f32>) -> f32 {
        match self {
            Material::Basic { .. } => 1.0,
            Material::Matcap {
                matcap: Some(texture),
                ..
            } => texture.sample(view_normal.x * 0.5 + 0.5, view_normal.y * 0.5 + 0.5),
            // Porcelain-like falloff when no matcap image was supplied
            Material::Matcap { matcap: None, .. } => 0.25 + 0.75 * view_normal.z.max(0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointLight {
    pub color: Color,
    pub intensity: f32,
    /// Range of influence, 0 for unlimited
    pub distance: f32,
    pub position: Point3<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshNode {
    pub mesh: Mesh,
    pub material: Material,
    pub transform: NodeTransform,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Mesh(MeshNode),
    PointLight(PointLight),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Default)]
pub struct Scene {
    nodes: Vec<(NodeId, Node)>,
    next_id: usize,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.push((id, node));
        id
    }

    pub fn add_mesh(&mut self, mesh: Mesh, material: Material, transform: NodeTransform) -> NodeId {
        self.add(Node::Mesh(MeshNode {
            mesh,
            material,
            transform,
        }))
    }

    pub fn add_light(&mut self, light: PointLight) -> NodeId {
        self.add(Node::PointLight(light))
    }

    pub fn remove(&mut self, id: NodeId) -> Option<Node> {
        let index = self.nodes.iter().position(|(node_id, _)| *node_id == id)?;
        Some(self.nodes.remove(index).1)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes
            .iter()
            .find(|(node_id, _)| *node_id == id)
            .map(|(_, node)| node)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes
            .iter_mut()
            .find(|(node_id, _)| *node_id == id)
            .map(|(_, node)| node)
    }

    pub fn mesh_mut(&mut self, id: NodeId) -> Option<&mut MeshNode> {
        match self.node_mut(id)? {
            Node::Mesh(mesh) => Some(mesh),
            Node::PointLight(_) => None,
        }
    }

    pub fn light(&self, id: NodeId) -> Option<&PointLight> {
        match self.node(id)? {
            Node::PointLight(light) => Some(light),
            Node::Mesh(_) => None,
        }
    }

    pub fn light_mut(&mut self, id: NodeId) -> Option<&mut PointLight> {
        match self.node_mut(id)? {
            Node::PointLight(light) => Some(light),
            Node::Mesh(_) => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().map(|(_, node)| node)
    }

    pub fn meshes(&self) -> impl Iterator<Item = &MeshNode> {
        self.iter().filter_map(|node| match node {
            Node::Mesh(mesh) => Some(mesh),
            Node::PointLight(_) => None,
        })
    }

    pub fn lights(&self) -> impl Iterator<Item = &PointLight> {
        self.iter().filter_map(|node| match node {
            Node::PointLight(light) => Some(light),
            Node::Mesh(_) => None,
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
