//! [`CenterPointerTracker`], the virtual pointer at the centroid of several live pointers.

use bevy_math::prelude::*;

use super::{
    ray::PointerPlane,
    tracker::{PointerTracker, VIRTUAL_POINTER_ID},
    Pointer2D, Pointer3D, Pointer6D,
};

/// The centroid of a set of pointers, used as the common pivot of multi-touch gestures.
///
/// The tracker only borrows the pointers. Its state is computed from them on every access and is
/// never cached, so it cannot go stale.
#[derive(Debug, Clone, Copy, Default)]
pub struct CenterPointerTracker<'a> {
    pointers: &'a [PointerTracker],
}

impl<'a> CenterPointerTracker<'a> {
    /// The centroid of `pointers`.
    pub fn new(pointers: &'a [PointerTracker]) -> Self {
        Self { pointers }
    }

    /// Follow a new set of pointers.
    pub fn update_center(&mut self, pointers: &'a [PointerTracker]) {
        self.pointers = pointers;
    }

    /// The pointers the centroid is computed from.
    pub fn pointers(&self) -> &'a [PointerTracker] {
        self.pointers
    }

    /// Always [`VIRTUAL_POINTER_ID`].
    pub fn pointer_id(&self) -> i32 {
        VIRTUAL_POINTER_ID
    }

    /// The average of the view space pointers. Zero if there are no pointers.
    pub fn view(&self) -> Pointer2D {
        Pointer2D::average(self.pointers.iter().map(|pointer| *pointer.view()))
    }

    /// The component-wise average of the pointer rays. Directions are not normalized.
    pub fn ray(&self) -> Pointer6D {
        Pointer6D::average(self.pointers.iter().map(|pointer| *pointer.ray()))
    }

    /// The average of the projections of every pointer onto `plane`.
    ///
    /// Each pointer is projected first and the results are averaged, which keeps the pivot under
    /// the fingers with perspective cameras. Pointers that miss the plane are left out; `None` if
    /// all of them do.
    pub fn project_on_plane(
        &self,
        plane: &PointerPlane,
        min_grazing_angle: f32,
    ) -> Option<Pointer3D> {
        let mut projections = self
            .pointers
            .iter()
            .filter_map(|pointer| pointer.project_on_plane(plane, min_grazing_angle))
            .peekable();
        projections.peek()?;
        Some(Pointer3D::average(projections))
    }

    /// Where the averaged current ray hits `plane`.
    pub fn intersect_plane(&self, plane: &PointerPlane) -> Option<Vec3> {
        plane.intersect(self.ray().current())
    }
}
