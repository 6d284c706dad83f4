//! Snapshots of the camera a pointer is cast through.

use bevy_log::prelude::*;
use bevy_math::prelude::*;
use bevy_reflect::prelude::*;
use bevy_render::camera::{
    CameraProjection, OrthographicProjection, PerspectiveProjection, Projection,
};
use bevy_transform::prelude::*;

use super::{Pointer2D, Pointer6D, RaySample};

/// How rays are cast through a [`PointerCamera`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Reflect)]
pub enum CameraKind {
    /// Rays start at the camera and pass through the view space point.
    Perspective,
    /// Rays start on the near plane at the view space point, and all point along the camera's
    /// forward direction.
    ///
    /// Starting at mid-depth would give the same intersections for anything beyond it, but bevy's
    /// default orthographic far plane puts mid-depth hundreds of units ahead of the camera, and
    /// planes in front of the ray origin would be missed. The near plane keeps every visible plane
    /// reachable.
    Orthographic,
    /// The "camera" is an object such as an XR controller. The ray starts at the object and points
    /// along its forward direction, regardless of any view space point.
    #[default]
    Object,
}

/// Everything needed to turn a view space pointer into a world space ray.
///
/// This is a copy of the camera state at the time it was taken, so it can be stored on pointers and
/// viewports without borrowing the camera.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct PointerCamera {
    /// The projection type.
    pub kind: CameraKind,
    /// The camera (or object) transform in world space.
    pub transform: GlobalTransform,
    /// Inverse of the projection matrix. Identity for [`CameraKind::Object`].
    pub view_from_clip: Mat4,
}

impl Default for PointerCamera {
    fn default() -> Self {
        Self::object(&GlobalTransform::IDENTITY)
    }
}

impl PointerCamera {
    /// Snapshot a perspective camera.
    pub fn perspective(projection: &PerspectiveProjection, transform: &GlobalTransform) -> Self {
        Self {
            kind: CameraKind::Perspective,
            transform: *transform,
            view_from_clip: projection.get_clip_from_view().inverse(),
        }
    }

    /// Snapshot an orthographic camera.
    pub fn orthographic(projection: &OrthographicProjection, transform: &GlobalTransform) -> Self {
        Self {
            kind: CameraKind::Orthographic,
            transform: *transform,
            view_from_clip: projection.get_clip_from_view().inverse(),
        }
    }

    /// Use an object, such as an XR controller, as the camera.
    pub fn object(transform: &GlobalTransform) -> Self {
        Self {
            kind: CameraKind::Object,
            transform: *transform,
            view_from_clip: Mat4::IDENTITY,
        }
    }

    /// Snapshot a camera with any supported [`Projection`].
    ///
    /// Projections other than perspective and orthographic are not supported. They fall back to
    /// casting rays along the camera's forward direction, so gestures keep working, if imprecisely.
    pub fn from_projection(projection: &Projection, transform: &GlobalTransform) -> Self {
        match projection {
            Projection::Perspective(perspective) => Self::perspective(perspective, transform),
            Projection::Orthographic(orthographic) => Self::orthographic(orthographic, transform),
            #[allow(unreachable_patterns)]
            _ => {
                warn_once!("Unsupported camera projection, pointer rays will follow the camera's forward direction.");
                Self::object(transform)
            }
        }
    }

    /// Cast a world space ray through a point in normalized view space.
    pub fn ray_through(&self, view_point: Vec2) -> RaySample {
        let forward = *self.transform.forward();
        match self.kind {
            CameraKind::Perspective => {
                let origin = self.transform.translation();
                // Reverse-z projections put the near plane at an NDC depth of 1.
                let near_point = self
                    .transform
                    .transform_point(self.view_from_clip.project_point3(view_point.extend(1.0)));
                RaySample::new(origin, (near_point - origin).normalize_or(forward))
            }
            CameraKind::Orthographic => {
                let origin = self
                    .transform
                    .transform_point(self.view_from_clip.project_point3(view_point.extend(1.0)));
                RaySample::new(origin, forward)
            }
            CameraKind::Object => RaySample::new(self.transform.translation(), forward),
        }
    }
}

/// Convert a logical pixel position into normalized view space of the viewport `rect`.
///
/// The result is `-1..1` on both axes inside the rect, with Y pointing up.
pub fn view_coordinates(position: Vec2, rect: Rect) -> Vec2 {
    let size = rect.size();
    if size.x <= 0.0 || size.y <= 0.0 {
        warn_once!("Pointer position resolved against an empty viewport {rect:?}");
        return Vec2::ZERO;
    }
    let relative = (position - rect.min) / size;
    Vec2::new(relative.x * 2.0 - 1.0, 1.0 - relative.y * 2.0)
}

impl Pointer6D {
    /// Rebuild the rays from a view space pointer and the camera it is seen through.
    ///
    /// Perspective and orthographic cameras recast all three samples from the matching view
    /// samples. An object camera ignores the view pointer and pushes the object's current ray as a
    /// new sample instead.
    pub fn update_by_view_pointer(&mut self, camera: &PointerCamera, view: &Pointer2D) {
        match camera.kind {
            CameraKind::Perspective | CameraKind::Orthographic => {
                *self = view.map(|point| camera.ray_through(point));
            }
            CameraKind::Object => self.update(camera.ray_through(Vec2::ZERO)),
        }
    }
}
