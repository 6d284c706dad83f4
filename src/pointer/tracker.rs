//! [`PointerTracker`], one live hardware pointer with its view and ray state.

use std::{fmt, time::Duration};

use bevy_input::mouse::MouseButton;
use bevy_log::prelude::*;
use bevy_math::{
    bounding::{Aabb3d, BoundingSphere, RayCast3d},
    prelude::*,
};
use bevy_reflect::prelude::*;
use bevy_transform::prelude::*;

use super::{
    camera::{view_coordinates, PointerCamera},
    ray::PointerPlane,
    Pointer2D, Pointer3D, Pointer6D,
};
use crate::controls::input::{PointerInput, Viewport, ViewportId};

/// The pointer id used by virtual pointers such as the
/// [`CenterPointerTracker`](super::center::CenterPointerTracker).
pub const VIRTUAL_POINTER_ID: i32 = -1;

/// The pressed buttons of a pointer, as a bitmask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Reflect)]
pub struct PointerButtons(pub u8);

impl PointerButtons {
    /// No button is pressed.
    pub const NONE: Self = Self(0);
    /// The primary button: left mouse button, touch contact, pen tip, or XR select.
    pub const PRIMARY: Self = Self(1);
    /// The secondary button, usually the right mouse button.
    pub const SECONDARY: Self = Self(2);
    /// The auxiliary button, usually the middle mouse button.
    pub const AUXILIARY: Self = Self(4);

    /// The bit for a mouse button, or [`Self::NONE`] for buttons without one.
    pub fn from_mouse_button(button: MouseButton) -> Self {
        match button {
            MouseButton::Left => Self::PRIMARY,
            MouseButton::Right => Self::SECONDARY,
            MouseButton::Middle => Self::AUXILIARY,
            _ => Self::NONE,
        }
    }

    /// Are no buttons pressed?
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Are all buttons of `other` pressed?
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// This mask with the buttons of `other` added.
    pub fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// This mask with the buttons of `other` removed.
    pub fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// The single pressed button. Combinations of buttons resolve to `None`.
    pub fn button(self) -> Option<MouseButton> {
        match self {
            Self::PRIMARY => Some(MouseButton::Left),
            Self::SECONDARY => Some(MouseButton::Right),
            Self::AUXILIARY => Some(MouseButton::Middle),
            _ => None,
        }
    }

    /// The single pressed button as an index: 0 primary, 1 secondary, 2 auxiliary, -1 otherwise.
    pub fn button_index(self) -> i8 {
        match self.button() {
            Some(MouseButton::Left) => 0,
            Some(MouseButton::Right) => 1,
            Some(MouseButton::Middle) => 2,
            _ => -1,
        }
    }
}

/// Modifier keys held while a pointer event happened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Reflect)]
pub struct Modifiers {
    /// Alt / Option
    pub alt: bool,
    /// Control
    pub ctrl: bool,
    /// Super / Command / Windows
    pub meta: bool,
    /// Shift
    pub shift: bool,
}

/// The hardware behind a pointer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Reflect)]
pub enum PointerKind {
    #[default]
    Mouse,
    Touch,
    Pen,
    /// An XR controller. Its ray comes from the controller transform instead of a screen position.
    Xr,
}

/// The volumes [`PointerTracker::intersect_objects`] can hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PickVolume {
    Aabb(Aabb3d),
    Sphere(BoundingSphere),
}

/// A ray cast hit on one of the objects passed to [`PointerTracker::intersect_objects`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerHit<K> {
    /// The key the object was passed in with.
    pub target: K,
    /// Distance along the current pointer ray.
    pub distance: f32,
    /// The hit position in world space.
    pub point: Vec3,
}

/// One live pointer: a mouse, a touch contact, a pen, or an XR controller.
///
/// The tracker owns the pointer's view space state and derives its world space rays from the
/// camera of the viewport the pointer was captured by. The dispatcher keeps exactly one tracker
/// per active pointer id.
#[derive(Debug, Clone, PartialEq)]
pub struct PointerTracker {
    pointer_id: i32,
    kind: PointerKind,
    buttons: PointerButtons,
    modifiers: Modifiers,
    timestamp: Duration,
    is_simulated: bool,
    viewport: Option<ViewportId>,
    camera: PointerCamera,
    view: Pointer2D,
    ray: Pointer6D,
}

impl PointerTracker {
    /// Start tracking a pointer event that happened in `viewport`.
    pub fn new(input: &PointerInput, viewport_id: ViewportId, viewport: &Viewport) -> Self {
        let view = Pointer2D::new(view_coordinates(input.position, viewport.rect));
        let mut ray = Pointer6D::default();
        ray.update_by_view_pointer(&viewport.camera, &view);
        // Object cameras push rays as updates, so the first one has to be a reset.
        ray.set(ray.current());
        Self {
            pointer_id: input.pointer_id,
            kind: input.kind,
            buttons: input.buttons,
            modifiers: input.modifiers,
            timestamp: input.timestamp,
            is_simulated: false,
            viewport: Some(viewport_id),
            camera: viewport.camera,
            view,
            ray,
        }
    }

    /// Start tracking an XR controller, casting its ray from the controller transform.
    pub fn from_object(
        pointer_id: i32,
        transform: &GlobalTransform,
        buttons: PointerButtons,
        timestamp: Duration,
    ) -> Self {
        let camera = PointerCamera::object(transform);
        Self {
            pointer_id,
            kind: PointerKind::Xr,
            buttons,
            modifiers: Modifiers::default(),
            timestamp,
            is_simulated: false,
            viewport: None,
            camera,
            view: Pointer2D::default(),
            ray: Pointer6D::new(camera.ray_through(Vec2::ZERO)),
        }
    }

    /// Apply a new event of the same pointer, seen through `viewport`.
    ///
    /// Updating a tracker with an event of another pointer is a bug in the caller. It panics in
    /// debug builds and is ignored in release builds.
    pub fn update(&mut self, input: &PointerInput, viewport: &Viewport) {
        if input.pointer_id != self.pointer_id {
            precondition_failed(format_args!(
                "pointer {} cannot be updated with an event of pointer {}",
                self.pointer_id, input.pointer_id
            ));
            return;
        }
        self.buttons = input.buttons;
        self.modifiers = input.modifiers;
        self.timestamp = input.timestamp;
        self.camera = viewport.camera;
        self.view
            .update(view_coordinates(input.position, viewport.rect));
        self.ray.update_by_view_pointer(&self.camera, &self.view);
    }

    /// Apply a new XR controller transform.
    pub fn update_from_object(
        &mut self,
        transform: &GlobalTransform,
        buttons: PointerButtons,
        timestamp: Duration,
    ) {
        self.buttons = buttons;
        self.timestamp = timestamp;
        self.camera = PointerCamera::object(transform);
        self.ray.update_by_view_pointer(&self.camera, &self.view);
    }

    /// Keep a released pointer gliding: extrapolate its last view space movement, damped in a
    /// framerate independent way, and recast its rays.
    ///
    /// Only simulated pointers can be damped. Calling this on a live pointer is a bug in the
    /// caller; it panics in debug builds and is ignored in release builds.
    pub fn simulate_damping(&mut self, damping_factor: f32, delta: Duration) {
        if !self.is_simulated {
            precondition_failed(format_args!(
                "pointer {} is not simulated and cannot be damped",
                self.pointer_id
            ));
            return;
        }
        let damping = (1.0 - damping_factor).powf(delta.as_secs_f32() * 60.0);
        self.view.update_by_inertia(damping);
        self.ray.update_by_view_pointer(&self.camera, &self.view);
        self.timestamp += delta;
    }

    /// Collapse the movement of this pointer, in view and ray space.
    pub fn clear_movement(&mut self) {
        self.view.clear_movement();
        self.ray.clear_movement();
    }

    /// Project the pointer rays onto a plane. See [`Pointer6D::project_on_plane`].
    pub fn project_on_plane(&self, plane: &PointerPlane, min_grazing_angle: f32) -> Option<Pointer3D> {
        self.ray.project_on_plane(plane, min_grazing_angle)
    }

    /// Where the current ray hits `plane`.
    pub fn intersect_plane(&self, plane: &PointerPlane) -> Option<Vec3> {
        plane.intersect(self.ray.current())
    }

    /// Cast the current ray against a set of bounding volumes. Hits are sorted nearest first.
    pub fn intersect_objects<K>(
        &self,
        objects: impl IntoIterator<Item = (K, PickVolume)>,
    ) -> Vec<PointerHit<K>> {
        let Some(ray) = self.ray.current().to_ray() else {
            return Vec::new();
        };
        let cast = RayCast3d::from_ray(ray, f32::MAX);
        let mut hits: Vec<_> = objects
            .into_iter()
            .filter_map(|(target, volume)| {
                let distance = match volume {
                    PickVolume::Aabb(aabb) => cast.aabb_intersection_at(&aabb),
                    PickVolume::Sphere(sphere) => cast.sphere_intersection_at(&sphere),
                }?;
                Some(PointerHit {
                    target,
                    distance,
                    point: ray.get_point(distance),
                })
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    /// Unique per active pointer. XR controllers use their controller index.
    pub fn pointer_id(&self) -> i32 {
        self.pointer_id
    }

    pub fn kind(&self) -> PointerKind {
        self.kind
    }

    /// All pressed buttons.
    pub fn buttons(&self) -> PointerButtons {
        self.buttons
    }

    /// The single pressed button, `None` if no button or several buttons are pressed.
    pub fn button(&self) -> Option<MouseButton> {
        self.buttons.button()
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Time of the last update.
    pub fn timestamp(&self) -> Duration {
        self.timestamp
    }

    /// Is this the inertial continuation of a released pointer?
    pub fn is_simulated(&self) -> bool {
        self.is_simulated
    }

    /// The viewport the pointer was captured by. `None` for XR controllers.
    pub fn viewport(&self) -> Option<ViewportId> {
        self.viewport
    }

    /// The camera the rays were last cast through.
    pub fn camera(&self) -> &PointerCamera {
        &self.camera
    }

    /// The pointer in normalized view space.
    pub fn view(&self) -> &Pointer2D {
        &self.view
    }

    /// The pointer rays in world space.
    pub fn ray(&self) -> &Pointer6D {
        &self.ray
    }

    pub(crate) fn set_simulated(&mut self) {
        self.is_simulated = true;
    }
}

fn precondition_failed(message: fmt::Arguments) {
    error!("{message}");
    if cfg!(debug_assertions) {
        panic!("{message}");
    }
}
