//! Pointer state in view, world, and ray space, and the trackers built from them.
//!
//! Every pointer keeps three samples: where the gesture started, where it is now, and where it was
//! one update ago. Consumers read [`Pointer::movement`] for per-event deltas and
//! [`Pointer::offset`] for the delta accumulated over the whole gesture.

use std::{
    fmt::Debug,
    ops::{Add, Mul, Sub},
};

use bevy_math::prelude::*;
use bevy_reflect::prelude::*;

pub mod camera;
pub mod center;
pub mod ray;
pub mod tracker;

/// A pointer in normalized view space, `-1..1` on both axes with Y up.
pub type Pointer2D = Pointer<Vec2>;
/// A pointer in world space, produced by projecting a [`Pointer6D`] onto a plane.
pub type Pointer3D = Pointer<Vec3>;
/// A pointer in ray space, one ray per sample.
pub type Pointer6D = Pointer<RaySample>;

/// Values that can be stored as pointer samples.
///
/// Samples only need to support the arithmetic used to derive movement, offset, inertia, and
/// averages.
pub trait PointerSample:
    Copy + Default + PartialEq + Debug + Add<Output = Self> + Sub<Output = Self> + Mul<f32, Output = Self>
{
}

impl<T> PointerSample for T where
    T: Copy
        + Default
        + PartialEq
        + Debug
        + Add<Output = T>
        + Sub<Output = T>
        + Mul<f32, Output = T>
{
}

/// Start, current, and previous samples of one pointer.
///
/// `movement` and `offset` are derived on every access and cannot be set directly.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Pointer<T> {
    start: T,
    current: T,
    previous: T,
}

impl<T: PointerSample> Pointer<T> {
    /// A pointer resting at `sample`.
    pub fn new(sample: T) -> Self {
        Self {
            start: sample,
            current: sample,
            previous: sample,
        }
    }

    /// Build a pointer from explicit samples.
    pub fn from_samples(start: T, current: T, previous: T) -> Self {
        Self {
            start,
            current,
            previous,
        }
    }

    /// Where the gesture started.
    pub fn start(&self) -> T {
        self.start
    }

    /// The latest sample.
    pub fn current(&self) -> T {
        self.current
    }

    /// The sample before the latest one.
    pub fn previous(&self) -> T {
        self.previous
    }

    /// Reset all three samples to `sample`.
    pub fn set(&mut self, sample: T) {
        *self = Self::new(sample);
    }

    /// Push a new sample, shifting the current one into `previous`.
    pub fn update(&mut self, sample: T) {
        self.previous = self.current;
        self.current = sample;
    }

    /// Extrapolate the last movement, scaled by `damping`.
    ///
    /// Repeated calls decay the movement geometrically, which is how released pointers keep
    /// gliding.
    pub fn update_by_inertia(&mut self, damping: f32) {
        let movement = self.movement();
        self.update(self.current + movement * damping);
    }

    /// Collapse `previous` onto `current`, so that [`Pointer::movement`] is zero.
    pub fn clear_movement(&mut self) {
        self.previous = self.current;
    }

    /// `current - previous`
    pub fn movement(&self) -> T {
        self.current - self.previous
    }

    /// `current - start`
    pub fn offset(&self) -> T {
        self.current - self.start
    }

    /// Apply `f` to every sample.
    pub fn map<U: PointerSample>(&self, mut f: impl FnMut(T) -> U) -> Pointer<U> {
        Pointer {
            start: f(self.start),
            current: f(self.current),
            previous: f(self.previous),
        }
    }

    /// Sample-wise average of `pointers`.
    ///
    /// An empty input yields the zero pointer, and a single input is returned as is: the sum is
    /// only divided when there is more than one pointer.
    pub fn average(pointers: impl IntoIterator<Item = Self>) -> Self {
        let mut count = 0usize;
        let mut sum = Self::default();
        for pointer in pointers {
            sum.start = sum.start + pointer.start;
            sum.current = sum.current + pointer.current;
            sum.previous = sum.previous + pointer.previous;
            count += 1;
        }
        if count > 1 {
            let scale = (count as f32).recip();
            sum = sum.map(|sample| sample * scale);
        }
        sum
    }
}

/// One ray sample.
///
/// Unlike [`Ray3d`], the direction is a plain vector: the movement and offset of a [`Pointer6D`]
/// are component-wise differences that are only meaningful as deltas, and averaged rays are not
/// normalized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Reflect)]
pub struct RaySample {
    /// Where the ray starts, in world space.
    pub origin: Vec3,
    /// Where the ray points, in world space.
    pub direction: Vec3,
}

impl RaySample {
    /// Create a ray sample.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// The same ray with a unit length direction, if the direction is not degenerate.
    pub fn normalized(self) -> Option<Self> {
        let direction = self.direction.try_normalize()?;
        Some(Self {
            origin: self.origin,
            direction,
        })
    }

    /// Rotate the direction of the ray, keeping the origin.
    pub fn rotated(self, rotation: Quat) -> Self {
        Self {
            origin: self.origin,
            direction: rotation * self.direction,
        }
    }

    /// Convert into a [`Ray3d`].
    pub fn to_ray(self) -> Option<Ray3d> {
        let direction = Dir3::new(self.direction).ok()?;
        Some(Ray3d {
            origin: self.origin,
            direction,
        })
    }
}

impl From<Ray3d> for RaySample {
    fn from(ray: Ray3d) -> Self {
        Self::new(ray.origin, *ray.direction)
    }
}

impl Add for RaySample {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.origin + rhs.origin, self.direction + rhs.direction)
    }
}

impl Sub for RaySample {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.origin - rhs.origin, self.direction - rhs.direction)
    }
}

impl Mul<f32> for RaySample {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self::new(self.origin * rhs, self.direction * rhs)
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use super::*;

    fn random_vec2(rng: &mut StdRng) -> Vec2 {
        Vec2::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0))
    }

    #[test]
    fn movement_uses_the_two_latest_updates() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let start = random_vec2(&mut rng);
            let mut pointer = Pointer2D::new(start);
            let mut last_two = (start, start);
            for _ in 0..rng.gen_range(1..20) {
                let sample = random_vec2(&mut rng);
                pointer.update(sample);
                last_two = (last_two.1, sample);
            }
            assert_eq!(pointer.movement(), last_two.1 - last_two.0);
            assert_eq!(pointer.offset(), last_two.1 - start);
        }
    }

    #[test]
    fn set_resets_all_samples() {
        let mut pointer = Pointer3D::new(Vec3::ONE);
        pointer.update(Vec3::X);
        pointer.set(Vec3::Y);
        assert_eq!(pointer.start(), Vec3::Y);
        assert_eq!(pointer.previous(), Vec3::Y);
        assert_eq!(pointer.movement(), Vec3::ZERO);
        assert_eq!(pointer.offset(), Vec3::ZERO);
    }

    #[test]
    fn inertia_scales_the_last_movement() {
        let mut pointer = Pointer2D::new(Vec2::ZERO);
        pointer.update(Vec2::new(0.2, 0.0));
        pointer.update_by_inertia(0.5);
        assert_eq!(pointer.current(), Vec2::new(0.3, 0.0));
        assert_eq!(pointer.movement(), Vec2::new(0.1, 0.0));
        assert_eq!(pointer.start(), Vec2::ZERO);
    }

    #[test]
    fn clear_movement_keeps_offset() {
        let mut pointer = Pointer2D::new(Vec2::ZERO);
        pointer.update(Vec2::ONE);
        pointer.clear_movement();
        assert_eq!(pointer.movement(), Vec2::ZERO);
        assert_eq!(pointer.offset(), Vec2::ONE);
    }

    #[test]
    fn average_of_nothing_is_zero() {
        assert_eq!(Pointer2D::average([]), Pointer2D::default());
    }

    #[test]
    fn average_of_one_is_exact() {
        let pointer = Pointer2D::from_samples(
            Vec2::new(0.1, 0.7),
            Vec2::new(0.3, -0.9),
            Vec2::new(1.0 / 3.0, 0.2),
        );
        assert_eq!(Pointer2D::average([pointer]), pointer);
    }

    #[test]
    fn ray_sample_arithmetic_is_component_wise() {
        let a = RaySample::new(Vec3::X, Vec3::NEG_Z);
        let b = RaySample::new(Vec3::Y, Vec3::X);
        assert_eq!((a + b) * 0.5, RaySample::new(Vec3::new(0.5, 0.5, 0.0), Vec3::new(0.5, 0.0, -0.5)));
        assert_eq!(a - a, RaySample::default());
        assert!(RaySample::default().normalized().is_none());
    }
}
