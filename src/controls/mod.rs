//! Interactive controls: the gesture dispatcher, its input types, and the bevy systems that drive
//! it.

use std::time::Duration;

use bevy_reflect::prelude::*;

pub mod input;
pub mod interactive;
pub mod sink;
pub mod systems;

/// The damping factor of new controls.
pub const DEFAULT_DAMPING_FACTOR: f32 = 0.05;

/// Thresholds of the gesture dispatcher.
///
/// These are tuned by feel. The defaults work for mice, trackpads, and touch screens alike.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct InteractionSettings {
    /// A pointer released later than this after its last move does not glide.
    pub inertia_max_elapsed: Duration,
    /// A pointer released with less view space movement than this does not glide. Filters
    /// residual trackpad noise.
    pub inertia_min_movement: f32,
    /// A gliding pointer stops once its view space movement per frame drops below this.
    pub inertia_stop_movement: f32,
}

impl Default for InteractionSettings {
    fn default() -> Self {
        Self {
            inertia_max_elapsed: Duration::from_millis(100),
            inertia_min_movement: 0.01,
            inertia_stop_movement: 5e-5,
        }
    }
}
