//! The callbacks a control implements to react to tracked input.

use std::time::Duration;

use bevy_input::keyboard::KeyCode;

use super::input::WheelInput;
use crate::pointer::{center::CenterPointerTracker, tracker::PointerTracker};

/// Receives the tracked gestures of an [`InteractiveControls`](super::interactive::InteractiveControls).
///
/// Gizmos and camera rigs implement the callbacks they need; all of them do nothing by default.
/// Every pointer callback gets the pointer the event is about and the set of pointers it belongs
/// to, so multi-touch gestures can look at sibling pointers.
pub trait PointerSink: Send + Sync + 'static {
    /// A pointer was pressed and captured. `pointers` already contains it.
    fn on_tracked_pointer_down(&mut self, _pointer: &PointerTracker, _pointers: &[PointerTracker]) {
    }

    /// A captured pointer moved, or the inertial pointer glided.
    ///
    /// `center` is the centroid of `pointers`, the pivot for pinch and rotate gestures.
    fn on_tracked_pointer_move(
        &mut self,
        _pointer: &PointerTracker,
        _pointers: &[PointerTracker],
        _center: &CenterPointerTracker,
    ) {
    }

    /// A pointer moved over a viewport without being pressed.
    fn on_tracked_pointer_hover(&mut self, _pointer: &PointerTracker, _pointers: &[PointerTracker]) {
    }

    /// A gesture ended. `pointers` holds the pointers that are still down; it is empty when the
    /// last pointer, or the inertial pointer, is released.
    fn on_tracked_pointer_up(&mut self, _pointer: &PointerTracker, _pointers: &[PointerTracker]) {}

    fn on_tracked_key_down(&mut self, _code: KeyCode, _codes: &[KeyCode]) {}

    fn on_tracked_key_up(&mut self, _code: KeyCode, _codes: &[KeyCode]) {}

    /// Called after every key press and release, with all keys still held.
    fn on_tracked_key_change(&mut self, _code: KeyCode, _codes: &[KeyCode]) {}

    fn on_tracked_drag_over(&mut self, _pointer: &PointerTracker, _pointers: &[PointerTracker]) {}

    fn on_tracked_drop(&mut self, _pointer: &PointerTracker, _pointers: &[PointerTracker]) {}

    /// A scroll over a viewport. `pointer` is a transient pointer at the cursor position.
    fn on_tracked_wheel(&mut self, _wheel: &WheelInput, _pointer: &PointerTracker) {}

    /// Step a custom animation started with
    /// [`InteractiveControls::start_custom_animation`](super::interactive::InteractiveControls::start_custom_animation).
    ///
    /// Return `false` to stop the animation.
    fn on_animation_frame(&mut self, _channel: u32, _delta: Duration) -> bool {
        false
    }
}

impl PointerSink for () {}
