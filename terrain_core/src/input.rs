//! Maps pointer, wheel and key input onto camera and render-mode changes.
//! The host window translates its native events into [`InputEvent`] and
//! feeds them in as they arrive; each one is applied immediately.

use glam::Vec2;

use crate::config::CameraSettings;
use crate::pipeline::{RenderMode, TerrainPipeline};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PointerButtons {
    pub primary: bool,
    pub secondary: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerKey {
    ResetCamera,
    Wireframe,
    Solid,
    Reload,
}

impl ViewerKey {
    /// Default bindings: R reset, W wireframe, S solid, L reload.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "r" | "R" => Some(ViewerKey::ResetCamera),
            "w" | "W" => Some(ViewerKey::Wireframe),
            "s" | "S" => Some(ViewerKey::Solid),
            "l" | "L" => Some(ViewerKey::Reload),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerPressed { position: Vec2 },
    PointerReleased,
    PointerMoved { position: Vec2, buttons: PointerButtons },
    /// Wheel delta in angle units (120 per notch).
    Scroll { delta: f32 },
    Key(ViewerKey),
}

/// Things the host has to act on itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostRequest {
    Redraw,
    Reload,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InteractionController {
    last_pointer: Option<Vec2>,
    sensitivity: f32,
    pan_speed: f32,
    zoom_speed: f32,
}

impl InteractionController {
    pub fn new(settings: &CameraSettings) -> Self {
        Self {
            last_pointer: None,
            sensitivity: settings.mouse_sensitivity,
            pan_speed: settings.pan_speed,
            zoom_speed: settings.zoom_speed,
        }
    }

    pub fn last_pointer(&self) -> Option<Vec2> {
        self.last_pointer
    }

    pub fn handle(&mut self, event: InputEvent, pipeline: &mut TerrainPipeline) -> Option<HostRequest> {
        match event {
            InputEvent::PointerPressed { position } => {
                self.last_pointer = Some(position);
                None
            }
            InputEvent::PointerReleased => None,
            InputEvent::PointerMoved { position, buttons } => {
                let last = self.last_pointer.replace(position)?;
                let delta = position - last;
                let camera = pipeline.camera_mut();
                if buttons.primary {
                    camera.rotate(delta.x, delta.y, self.sensitivity);
                } else if buttons.secondary {
                    camera.pan(delta.x, delta.y, self.pan_speed);
                } else {
                    return None;
                }
                Some(HostRequest::Redraw)
            }
            InputEvent::Scroll { delta } => {
                pipeline.camera_mut().zoom(delta, self.zoom_speed);
                Some(HostRequest::Redraw)
            }
            InputEvent::Key(key) => {
                match key {
                    ViewerKey::ResetCamera => pipeline.camera_mut().reset(),
                    ViewerKey::Wireframe => pipeline.set_render_mode(RenderMode::Wireframe),
                    ViewerKey::Solid => pipeline.set_render_mode(RenderMode::Solid),
                    ViewerKey::Reload => return Some(HostRequest::Reload),
                }
                Some(HostRequest::Redraw)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewerConfig;

    fn setup() -> (InteractionController, TerrainPipeline) {
        let config = ViewerConfig::default();
        (
            InteractionController::new(&config.camera),
            TerrainPipeline::new(&config),
        )
    }

    fn moved(x: f32, y: f32, primary: bool, secondary: bool) -> InputEvent {
        InputEvent::PointerMoved {
            position: Vec2::new(x, y),
            buttons: PointerButtons { primary, secondary },
        }
    }

    #[test]
    fn first_move_only_records_position() {
        let (mut controller, mut pipeline) = setup();
        let before = pipeline.camera().pose();
        assert_eq!(controller.handle(moved(10.0, 10.0, true, false), &mut pipeline), None);
        assert_eq!(pipeline.camera().pose(), before);
        assert_eq!(controller.last_pointer(), Some(Vec2::new(10.0, 10.0)));
    }

    #[test]
    fn primary_drag_rotates() {
        let (mut controller, mut pipeline) = setup();
        controller.handle(
            InputEvent::PointerPressed {
                position: Vec2::new(100.0, 100.0),
            },
            &mut pipeline,
        );
        let request = controller.handle(moved(110.0, 104.0, true, false), &mut pipeline);
        assert_eq!(request, Some(HostRequest::Redraw));
        assert_eq!(pipeline.camera().rotation_y, 5.0);
        assert_eq!(pipeline.camera().rotation_x, -28.0);
    }

    #[test]
    fn secondary_drag_pans() {
        let (mut controller, mut pipeline) = setup();
        controller.handle(
            InputEvent::PointerPressed {
                position: Vec2::ZERO,
            },
            &mut pipeline,
        );
        controller.handle(moved(20.0, -10.0, false, true), &mut pipeline);
        let camera = pipeline.camera();
        assert!((camera.target_x + 0.2).abs() < 1e-6);
        assert!((camera.target_y + 0.1).abs() < 1e-6);
        assert_eq!(camera.rotation_y, 0.0);
    }

    #[test]
    fn hover_without_buttons_tracks_pointer_only() {
        let (mut controller, mut pipeline) = setup();
        controller.handle(moved(0.0, 0.0, false, false), &mut pipeline);
        let before = pipeline.camera().pose();
        assert_eq!(controller.handle(moved(50.0, 50.0, false, false), &mut pipeline), None);
        assert_eq!(pipeline.camera().pose(), before);
        assert_eq!(controller.last_pointer(), Some(Vec2::new(50.0, 50.0)));
    }

    #[test]
    fn scroll_zooms_in() {
        let (mut controller, mut pipeline) = setup();
        controller.handle(InputEvent::Scroll { delta: 1000.0 }, &mut pipeline);
        assert!((pipeline.camera().distance - 4.0).abs() < 1e-6);
    }

    #[test]
    fn keys_toggle_mode_and_reset() {
        let (mut controller, mut pipeline) = setup();
        controller.handle(InputEvent::Key(ViewerKey::Wireframe), &mut pipeline);
        assert_eq!(pipeline.render_mode(), RenderMode::Wireframe);
        controller.handle(InputEvent::Key(ViewerKey::Wireframe), &mut pipeline);
        assert_eq!(pipeline.render_mode(), RenderMode::Wireframe);
        controller.handle(InputEvent::Key(ViewerKey::Solid), &mut pipeline);
        assert_eq!(pipeline.render_mode(), RenderMode::Solid);

        pipeline.camera_mut().zoom(-2000.0, 0.001);
        controller.handle(InputEvent::Key(ViewerKey::ResetCamera), &mut pipeline);
        assert_eq!(pipeline.camera().distance, 5.0);

        assert_eq!(
            controller.handle(InputEvent::Key(ViewerKey::Reload), &mut pipeline),
            Some(HostRequest::Reload)
        );
    }

    #[test]
    fn key_symbols_map_to_bindings() {
        assert_eq!(ViewerKey::from_symbol("r"), Some(ViewerKey::ResetCamera));
        assert_eq!(ViewerKey::from_symbol("W"), Some(ViewerKey::Wireframe));
        assert_eq!(ViewerKey::from_symbol("x"), None);
    }
}
