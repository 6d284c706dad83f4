//! Raw input delivered to [`InteractiveControls`](super::interactive::InteractiveControls), and
//! the viewports it is resolved against.

use std::time::Duration;

use bevy_ecs::prelude::*;
use bevy_input::{keyboard::KeyCode, mouse::MouseScrollUnit};
use bevy_math::prelude::*;
use bevy_reflect::prelude::*;
use bevy_transform::prelude::*;

use crate::pointer::{
    camera::PointerCamera,
    tracker::{Modifiers, PointerButtons, PointerKind},
};

/// Identifies a viewport of one control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Reflect)]
pub struct ViewportId(pub usize);

impl ViewportId {
    /// The viewport a control is created with. It cannot be removed.
    pub const PRIMARY: Self = Self(0);
}

/// A rectangle of a window and the camera that renders it.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct Viewport {
    /// The window entity that receives input for this viewport.
    pub element: Entity,
    /// The viewport area in logical pixels, relative to the window's top left corner.
    pub rect: Rect,
    /// The camera pointers in this viewport are cast through.
    pub camera: PointerCamera,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            element: Entity::PLACEHOLDER,
            rect: Rect::default(),
            camera: PointerCamera::default(),
        }
    }
}

impl Viewport {
    pub fn new(element: Entity, rect: Rect, camera: PointerCamera) -> Self {
        Self {
            element,
            rect,
            camera,
        }
    }

    /// Does a position on `element` fall inside this viewport?
    pub fn contains(&self, element: Entity, position: Vec2) -> bool {
        self.element == element && self.rect.contains(position)
    }
}

/// A pointer event: a mouse, touch contact, or pen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerInput {
    /// Unique among pointers that are down at the same time.
    pub pointer_id: i32,
    pub kind: PointerKind,
    /// The window the event happened in.
    pub element: Entity,
    /// Logical pixels from the window's top left corner.
    pub position: Vec2,
    /// Buttons held after the event.
    pub buttons: PointerButtons,
    pub modifiers: Modifiers,
    pub timestamp: Duration,
}

impl PointerInput {
    /// An event with no buttons or modifiers, at time zero.
    pub fn new(pointer_id: i32, kind: PointerKind, element: Entity, position: Vec2) -> Self {
        Self {
            pointer_id,
            kind,
            element,
            position,
            buttons: PointerButtons::NONE,
            modifiers: Modifiers::default(),
            timestamp: Duration::ZERO,
        }
    }

    pub fn with_buttons(mut self, buttons: PointerButtons) -> Self {
        self.buttons = buttons;
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Set the timestamp.
    pub fn at(mut self, timestamp: Duration) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// A key press or release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInput {
    pub code: KeyCode,
    /// Generated by the OS while the key is held.
    pub repeat: bool,
    pub timestamp: Duration,
}

impl KeyInput {
    pub fn new(code: KeyCode) -> Self {
        Self {
            code,
            repeat: false,
            timestamp: Duration::ZERO,
        }
    }

    /// Mark the event as an OS key repeat.
    pub fn repeated(mut self) -> Self {
        self.repeat = true;
        self
    }

    pub fn at(mut self, timestamp: Duration) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// A scroll wheel or trackpad scroll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelInput {
    pub element: Entity,
    /// Cursor position, in logical pixels from the window's top left corner.
    pub position: Vec2,
    pub delta: Vec2,
    pub unit: MouseScrollUnit,
    pub modifiers: Modifiers,
    pub timestamp: Duration,
}

impl WheelInput {
    /// A line based scroll with no modifiers, at time zero.
    pub fn new(element: Entity, position: Vec2, delta: Vec2) -> Self {
        Self {
            element,
            position,
            delta,
            unit: MouseScrollUnit::Line,
            modifiers: Modifiers::default(),
            timestamp: Duration::ZERO,
        }
    }
}

/// What an XR controller did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum XrAction {
    /// The select button was pressed.
    SelectStart,
    /// The controller moved.
    Move,
    /// The select button was released.
    SelectEnd,
}

/// Input from an XR controller.
///
/// Controllers act as pointers whose id is the controller index, and whose ray follows the
/// controller transform. Send these as events to drive controls through the
/// [`InteractiveControlsPlugin`](super::systems::InteractiveControlsPlugin).
#[derive(Debug, Clone, Copy, PartialEq, Event)]
pub struct XrControllerInput {
    /// 0 or 1.
    pub controller: u8,
    pub action: XrAction,
    /// The controller pose in world space. The ray points along its forward direction.
    pub transform: GlobalTransform,
    pub timestamp: Duration,
}

impl XrControllerInput {
    pub fn new(controller: u8, action: XrAction, transform: GlobalTransform) -> Self {
        Self {
            controller,
            action,
            transform,
            timestamp: Duration::ZERO,
        }
    }

    pub fn at(mut self, timestamp: Duration) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// The id of the pointer this controller drives.
    pub fn pointer_id(&self) -> i32 {
        i32::from(self.controller)
    }
}

/// Any input a control can handle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerDown(PointerInput),
    PointerMove(PointerInput),
    PointerUp(PointerInput),
    /// The pointer was lost, for example when a touch is interrupted by the OS. Ends the gesture
    /// like [`InputEvent::PointerUp`], but never with inertia.
    PointerCancel(PointerInput),
    /// A context menu was requested at the pointer position.
    ContextMenu(PointerInput),
    Wheel(WheelInput),
    KeyDown(KeyInput),
    KeyUp(KeyInput),
    /// Something is being dragged over a viewport.
    DragOver(PointerInput),
    /// Something was dropped on a viewport.
    Drop(PointerInput),
    Xr(XrControllerInput),
}

/// Whether a control used an input.
///
/// Hosts can use this to suppress their default handling, such as opening a context menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputResponse {
    Consumed,
    Ignored,
}

impl InputResponse {
    pub fn is_consumed(self) -> bool {
        self == InputResponse::Consumed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_contains_positions_of_its_element_only() {
        let window = Entity::from_raw(7);
        let viewport = Viewport::new(window, Rect::new(10.0, 10.0, 110.0, 60.0), PointerCamera::default());
        assert!(viewport.contains(window, Vec2::new(50.0, 30.0)));
        assert!(!viewport.contains(window, Vec2::new(5.0, 30.0)));
        assert!(!viewport.contains(Entity::PLACEHOLDER, Vec2::new(50.0, 30.0)));
    }

    #[test]
    fn xr_controllers_map_to_pointer_ids() {
        let input = XrControllerInput::new(1, XrAction::Move, GlobalTransform::IDENTITY);
        assert_eq!(input.pointer_id(), 1);
    }
}
