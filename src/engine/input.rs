// Input state tracking for keyboard, mouse and touch.
// Turns winit events into pointer samples for the page turner and a
// per-frame snapshot of key presses.

use std::collections::HashSet;

use glam::DVec2;
use winit::event::{ElementState, Force, MouseButton, TouchPhase, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use super::page_turn::PointerAction;

/// Pointer sample in screen pixels (origin top-left, y down).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ScreenPointer {
    pub action:   PointerAction,
    pub position: DVec2,
    pub pressure: f64,
}

pub struct InputState {
    // Keyboard
    keys_held:    HashSet<KeyCode>,
    keys_pressed: HashSet<KeyCode>,

    // Mouse
    pub mouse_position: DVec2,
    mouse_down: bool,

    // Touch: only the first finger drives the curl.
    touch_id: Option<u64>,

    pub window_size: (u32, u32),
}

impl InputState {
    pub fn new() -> Self {
        Self {
            keys_held: HashSet::new(),
            keys_pressed: HashSet::new(),
            mouse_position: DVec2::ZERO,
            mouse_down: false,
            touch_id: None,
            window_size: (0, 0),
        }
    }

    /// Feed a winit WindowEvent into the input state. Returns a pointer
    /// sample if the event moved, pressed or released the pointer.
    pub fn process_event(&mut self, event: &WindowEvent) -> Option<ScreenPointer> {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    match event.state {
                        ElementState::Pressed => {
                            if self.keys_held.insert(key) {
                                self.keys_pressed.insert(key);
                            }
                        }
                        ElementState::Released => { self.keys_held.remove(&key); }
                    }
                }
                None
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.mouse_position = DVec2::new(position.x, position.y);
                self.mouse_down.then(|| self.mouse(PointerAction::Move))
            }
            WindowEvent::MouseInput { state, button: MouseButton::Left, .. } => {
                match state {
                    ElementState::Pressed => {
                        self.mouse_down = true;
                        Some(self.mouse(PointerAction::Down))
                    }
                    ElementState::Released if self.mouse_down => {
                        self.mouse_down = false;
                        Some(self.mouse(PointerAction::Up))
                    }
                    ElementState::Released => None,
                }
            }
            WindowEvent::CursorLeft { .. } if self.mouse_down => {
                self.mouse_down = false;
                Some(self.mouse(PointerAction::Cancel))
            }
            WindowEvent::Touch(touch) => {
                let action = match touch.phase {
                    TouchPhase::Started if self.touch_id.is_none() => {
                        self.touch_id = Some(touch.id);
                        PointerAction::Down
                    }
                    TouchPhase::Moved if self.touch_id == Some(touch.id) => PointerAction::Move,
                    TouchPhase::Ended if self.touch_id == Some(touch.id) => {
                        self.touch_id = None;
                        PointerAction::Up
                    }
                    TouchPhase::Cancelled if self.touch_id == Some(touch.id) => {
                        self.touch_id = None;
                        PointerAction::Cancel
                    }
                    _ => return None,
                };
                Some(ScreenPointer {
                    action,
                    position: DVec2::new(touch.location.x, touch.location.y),
                    pressure: touch.force.map_or(0.0, touch_pressure),
                })
            }
            WindowEvent::Resized(size) => {
                self.window_size = (size.width, size.height);
                None
            }
            _ => None,
        }
    }

    fn mouse(&self, action: PointerAction) -> ScreenPointer {
        ScreenPointer { action, position: self.mouse_position, pressure: 0.0 }
    }

    /// Call once per frame after update() and render() have consumed input.
    pub fn end_frame(&mut self) {
        self.keys_pressed.clear();
    }

    /// Key went down this frame.
    pub fn was_key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }
}

fn touch_pressure(force: Force) -> f64 {
    force.normalized().clamp(0.0, 1.0)
}
