//! Translation from winit window input to the core's `InputEvent`s. Winit
//! reports button changes without a position, so the cursor and button state
//! are tracked here between events.

use glam::Vec2;
use terrain_core::input::{InputEvent, PointerButtons, ViewerKey};
use winit::dpi::PhysicalPosition;
use winit::event::{ElementState, MouseButton, MouseScrollDelta};
use winit::keyboard::{Key, NamedKey};

/// Wheel units per notch, matching the angle-delta convention the camera
/// zoom speed is tuned for.
const WHEEL_NOTCH: f32 = 120.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Viewer(ViewerKey),
    Quit,
}

#[derive(Debug, Default)]
pub struct PointerTracker {
    cursor: Vec2,
    buttons: PointerButtons,
}

impl PointerTracker {
    pub fn cursor_moved(&mut self, position: PhysicalPosition<f64>) -> InputEvent {
        self.cursor = Vec2::new(position.x as f32, position.y as f32);
        InputEvent::PointerMoved {
            position: self.cursor,
            buttons: self.buttons,
        }
    }

    pub fn mouse_button(&mut self, button: MouseButton, state: ElementState) -> Option<InputEvent> {
        let pressed = state == ElementState::Pressed;
        match button {
            MouseButton::Left => self.buttons.primary = pressed,
            MouseButton::Right => self.buttons.secondary = pressed,
            _ => return None,
        }
        Some(if pressed {
            InputEvent::PointerPressed {
                position: self.cursor,
            }
        } else {
            InputEvent::PointerReleased
        })
    }
}

pub fn wheel(delta: MouseScrollDelta) -> InputEvent {
    let delta = match delta {
        MouseScrollDelta::LineDelta(_, lines) => lines * WHEEL_NOTCH,
        MouseScrollDelta::PixelDelta(pixels) => pixels.y as f32,
    };
    InputEvent::Scroll { delta }
}

pub fn key_action(key: &Key, state: ElementState) -> Option<KeyAction> {
    if state != ElementState::Pressed {
        return None;
    }
    match key {
        Key::Named(NamedKey::Escape) => Some(KeyAction::Quit),
        Key::Character(symbol) => ViewerKey::from_symbol(symbol.as_str()).map(KeyAction::Viewer),
        _ => None,
    }
}
