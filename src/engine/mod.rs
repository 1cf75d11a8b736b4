// Engine module - page curl geometry, page-turn state and GPU plumbing
//
// Leaf-first: vertex → clip → curl + shadow → page_turn.
// mesh/input/debug_overlay adapt the core to wgpu, winit and egui.

pub mod clip;
pub mod config;
pub mod curl;
pub mod debug_overlay;
pub mod error;
pub mod input;
pub mod layout;
pub mod mesh;
pub mod page;
pub mod page_turn;
pub mod shadow;
pub mod vertex;

// Re-export commonly used items
pub use self::config::Settings;
pub use curl::{CurlMesh, PageRect, TextureRect};
pub use error::CurlError;
pub use layout::{Margins, PageLayout, ViewMode};
pub use page::{CurlPage, PageImage, PageProvider, PageSide};
pub use page_turn::{CurlParams, CurlState, PageTurner, PointerAction, PointerEvent, SlotRole};
