//! Projection of pointer rays onto planes, with grazing angle correction.
//!
//! When a ray is nearly parallel to the plane it is projected onto, a tiny rotation of the ray
//! moves the intersection point by a huge distance. A gizmo dragged along an axis that points at
//! the camera would fly off to infinity. To avoid this, rays that start at a shallow angle to the
//! plane and keep turning toward it are rotated toward the plane normal until they meet it at a
//! minimum angle. All samples of a pointer are rotated by the same amount, so relative motion is
//! preserved.

use std::f32::consts::FRAC_PI_6;

use bevy_log::prelude::*;
use bevy_math::{prelude::*, primitives::InfinitePlane3d};
use bevy_reflect::prelude::*;

use super::{Pointer3D, Pointer6D, RaySample};

/// The minimum angle between a ray and a plane used by gizmos unless configured otherwise: 30°.
pub const DEFAULT_MIN_GRAZING_ANGLE: f32 = FRAC_PI_6;

/// An infinite plane that pointers can be projected onto.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct PointerPlane {
    /// Any point on the plane.
    pub origin: Vec3,
    /// The plane normal.
    pub normal: Dir3,
}

impl PointerPlane {
    /// Create a plane through `origin` with the given `normal`.
    pub fn new(origin: Vec3, normal: Dir3) -> Self {
        Self { origin, normal }
    }

    /// Intersect a ray with the plane.
    ///
    /// Returns `None` if the ray direction is degenerate, the ray is parallel to the plane, or the
    /// plane is behind the ray origin.
    pub fn intersect(&self, ray: RaySample) -> Option<Vec3> {
        let ray = ray.to_ray()?;
        let distance = ray.intersect_plane(
            self.origin,
            InfinitePlane3d {
                normal: self.normal,
            },
        )?;
        Some(ray.get_point(distance))
    }
}

/// The signed angle between `direction` and the plane with the given `normal`.
///
/// Positive when the direction points along the normal, zero when it is parallel to the plane.
pub fn elevation(direction: Vec3, normal: Vec3) -> f32 {
    direction
        .normalize_or_zero()
        .dot(normal.normalize_or_zero())
        .clamp(-1.0, 1.0)
        .asin()
}

/// The rotation that brings a shallow `start` direction to `min_angle` from the plane.
///
/// The correction only applies while the `current` direction is closer to the plane than `start`,
/// so a pointer turning away from grazing keeps its raw rays. The rotation axis is
/// `start × normal`, so directions only tilt toward or away from the normal, and the sign of the
/// elevation is preserved. A `min_angle` of zero never corrects.
pub fn grazing_correction(
    start: Vec3,
    current: Vec3,
    normal: Vec3,
    min_angle: f32,
) -> Option<Quat> {
    if min_angle <= 0.0 {
        return None;
    }
    let start_elevation = elevation(start, normal);
    if start_elevation.abs() >= min_angle
        || elevation(current, normal).abs() >= start_elevation.abs()
    {
        return None;
    }
    let axis = start.cross(normal).try_normalize()?;
    let target = if start_elevation < 0.0 {
        -min_angle
    } else {
        min_angle
    };
    Some(Quat::from_axis_angle(axis, target - start_elevation))
}

impl Pointer6D {
    /// The rays of this pointer, normalized and corrected for the grazing angle to `plane`.
    ///
    /// The correction is computed from the start and current rays, and applied identically to all
    /// three rays. Returns `None` if any ray has a degenerate direction.
    pub fn corrected_for_plane(&self, plane: &PointerPlane, min_grazing_angle: f32) -> Option<Self> {
        let start = self.start().normalized()?;
        let current = self.current().normalized()?;
        let previous = self.previous().normalized()?;
        let rays = Self::from_samples(start, current, previous);
        Some(
            match grazing_correction(
                start.direction,
                current.direction,
                *plane.normal,
                min_grazing_angle,
            ) {
                Some(rotation) => rays.map(|ray| ray.rotated(rotation)),
                None => rays,
            },
        )
    }

    /// Project the pointer onto a plane, producing a world space pointer.
    ///
    /// A ray that misses the plane is treated as not having moved: the current sample falls back to
    /// the previous one and vice versa, and the start sample falls back to the previous one. `None`
    /// is returned only if no ray meets the plane at all.
    pub fn project_on_plane(
        &self,
        plane: &PointerPlane,
        min_grazing_angle: f32,
    ) -> Option<Pointer3D> {
        let rays = self.corrected_for_plane(plane, min_grazing_angle)?;
        let start = plane.intersect(rays.start());
        let current = plane.intersect(rays.current());
        let previous = plane.intersect(rays.previous());

        let previous = previous.or(current).or(start);
        let current = current.or(previous);
        let start = start.or(previous);
        match (start, current, previous) {
            (Some(start), Some(current), Some(previous)) => {
                Some(Pointer3D::from_samples(start, current, previous))
            }
            _ => {
                trace!("Pointer rays do not intersect {plane:?}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use super::*;

    const GROUND: PointerPlane = PointerPlane {
        origin: Vec3::ZERO,
        normal: Dir3::Z,
    };

    fn ray_at_elevation(degrees: f32) -> RaySample {
        let radians = degrees.to_radians();
        RaySample::new(Vec3::Z, Vec3::new(radians.cos(), 0.0, radians.sin()))
    }

    #[test]
    fn straight_down_projects_below_origin() {
        let rays = Pointer6D::new(RaySample::new(Vec3::new(1.0, 1.0, 5.0), Vec3::NEG_Z));
        let projected = rays
            .project_on_plane(&GROUND, DEFAULT_MIN_GRAZING_ANGLE)
            .unwrap();
        assert!(projected.current().abs_diff_eq(Vec3::new(1.0, 1.0, 0.0), 1e-5));
        assert_eq!(projected.movement(), Vec3::ZERO);
    }

    #[test]
    fn zero_min_angle_skips_correction() {
        let rays = Pointer6D::new(RaySample::new(Vec3::new(0.0, 0.0, 3.0), Vec3::NEG_Z));
        assert!(grazing_correction(Vec3::NEG_Z, Vec3::NEG_Z, Vec3::Z, 0.0).is_none());
        let shallow = Vec3::new(1.0, 0.0, -0.01);
        assert!(grazing_correction(shallow, shallow, Vec3::Z, 0.0).is_none());
        let corrected = rays.corrected_for_plane(&GROUND, 0.0).unwrap();
        assert_eq!(corrected, rays);
        assert_eq!(
            rays.project_on_plane(&GROUND, 0.0),
            Some(Pointer3D::new(Vec3::ZERO))
        );
    }

    #[test]
    fn shallow_start_ray_is_pinned_to_min_angle() {
        let mut rays = Pointer6D::new(ray_at_elevation(-5.0));
        rays.update(ray_at_elevation(-3.0));
        rays.update(ray_at_elevation(-4.0));

        let corrected = rays
            .corrected_for_plane(&GROUND, DEFAULT_MIN_GRAZING_ANGLE)
            .unwrap();
        let start_elevation = elevation(corrected.start().direction, Vec3::Z);
        assert!((start_elevation - (-DEFAULT_MIN_GRAZING_ANGLE)).abs() < 1e-5);

        let rotation = grazing_correction(
            rays.start().direction,
            rays.current().direction,
            Vec3::Z,
            DEFAULT_MIN_GRAZING_ANGLE,
        )
        .unwrap();
        for (original, corrected) in [
            (rays.current(), corrected.current()),
            (rays.previous(), corrected.previous()),
        ] {
            let expected = rotation * original.direction.normalize();
            assert!(corrected.direction.abs_diff_eq(expected, 1e-6));
            assert_eq!(corrected.origin, original.origin);
        }
        // The correction tilts every ray by the same amount.
        let tilt = elevation(corrected.current().direction, Vec3::Z)
            - elevation(rays.current().direction, Vec3::Z);
        assert!((tilt - (-25.0f32).to_radians()).abs() < 1e-4);
    }

    #[test]
    fn ray_turning_away_from_the_plane_is_not_corrected() {
        let mut rays = Pointer6D::new(ray_at_elevation(-5.0));
        rays.update(ray_at_elevation(-12.0));
        rays.update(ray_at_elevation(-20.0));

        let corrected = rays
            .corrected_for_plane(&GROUND, DEFAULT_MIN_GRAZING_ANGLE)
            .unwrap();
        assert_eq!(corrected, rays.corrected_for_plane(&GROUND, 0.0).unwrap());
        assert!((elevation(corrected.start().direction, Vec3::Z) + 5f32.to_radians()).abs() < 1e-5);
        assert!(
            (elevation(corrected.current().direction, Vec3::Z) + 20f32.to_radians()).abs() < 1e-5
        );

        // Holding still at the start angle is not turning toward the plane either.
        let still = ray_at_elevation(-5.0).direction;
        assert!(grazing_correction(still, still, Vec3::Z, DEFAULT_MIN_GRAZING_ANGLE).is_none());
    }

    #[test]
    fn correction_preserves_positive_sign() {
        let rotation = grazing_correction(
            ray_at_elevation(5.0).direction,
            ray_at_elevation(2.0).direction,
            Vec3::Z,
            DEFAULT_MIN_GRAZING_ANGLE,
        )
        .unwrap();
        let corrected = rotation * ray_at_elevation(5.0).direction;
        assert!((elevation(corrected, Vec3::Z) - DEFAULT_MIN_GRAZING_ANGLE).abs() < 1e-5);
    }

    #[test]
    fn steep_rays_are_not_corrected() {
        let steep = ray_at_elevation(-45.0).direction;
        let steeper = ray_at_elevation(-40.0).direction;
        assert!(grazing_correction(steep, steeper, Vec3::Z, DEFAULT_MIN_GRAZING_ANGLE).is_none());
        assert!((elevation(Vec3::NEG_Z, Vec3::Z) + FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn missing_current_ray_reports_no_movement() {
        let mut rays = Pointer6D::new(RaySample::new(Vec3::new(0.0, 0.0, 2.0), Vec3::NEG_Z));
        rays.update(RaySample::new(Vec3::new(1.0, 0.0, 2.0), Vec3::NEG_Z));
        // Pointing away from the plane.
        rays.update(RaySample::new(Vec3::new(2.0, 0.0, 2.0), Vec3::Z));
        let projected = rays.project_on_plane(&GROUND, 0.0).unwrap();
        assert_eq!(projected.current(), Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(projected.movement(), Vec3::ZERO);
        assert!(projected.offset().is_finite());
    }

    #[test]
    fn no_intersection_at_all_is_none() {
        let rays = Pointer6D::new(RaySample::new(Vec3::new(0.0, 0.0, 2.0), Vec3::Z));
        assert!(rays.project_on_plane(&GROUND, 0.0).is_none());
        assert!(Pointer6D::default()
            .project_on_plane(&GROUND, DEFAULT_MIN_GRAZING_ANGLE)
            .is_none());
    }
}
