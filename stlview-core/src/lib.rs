/// stlview core library - model viewing without a windowing backend
///
/// This crate holds everything a host needs to show an STL model: parsing,
/// geometry, camera and orbit controls, the scene graph, the per-frame
/// trigger registry and render loop, and the viewer that assembles them.
/// Hosts supply a [`Renderer`] and a [`FrameScheduler`].

pub mod config;
pub mod controls;
pub mod debug;
pub mod error;
pub mod frame_loop;
pub mod geometry;
pub mod loader;
#[cfg(not(target_arch = "wasm32"))]
pub mod logging;
pub mod projection;
pub mod scene;
pub mod schedule;
pub mod stl;
pub mod transform;
pub mod trigger;
pub mod viewer;

// Re-export commonly used types
pub use config::ViewerConfig;
pub use controls::OrbitControls;
pub use debug::{ControlId, DebugPanel};
pub use error::{ConfigError, FrameFault, LoadFailure};
pub use frame_loop::{FaultPolicy, FrameLoop, FrameStats, LoopHandle, LoopState, Renderer};
pub use geometry::{Aabb, Mesh, Triangle, Vertex};
pub use projection::{Camera, ProjectionMode};
pub use scene::{Color, Material, MeshNode, Node, NodeId, PointLight, Scene, Texture};
pub use schedule::{FrameCallback, FrameRequest, FrameScheduler, ManualScheduler};
pub use transform::{NodeTransform, RotationState, Transform};
pub use trigger::{trigger, Trigger, TriggerHandle, TriggerRegistry, Triggers};
pub use viewer::StlViewer;
