//! A `bevy_pointer_controls` extension that draws the live pointers of interactive controls in the
//! scene. Useful while building gizmos, to see where pointer rays go and how the gesture center
//! moves.

use std::marker::PhantomData;

use bevy_app::prelude::*;
use bevy_color::{
    palettes::css::{GRAY, ORANGE, WHITE, YELLOW},
    Color,
};
use bevy_ecs::prelude::*;
use bevy_gizmos::prelude::*;
use bevy_math::prelude::*;
use bevy_reflect::prelude::*;

use crate::{
    controls::{interactive::InteractiveControls, sink::PointerSink},
    pointer::{center::CenterPointerTracker, Pointer6D, RaySample},
};

/// See the [module](self) docs.
pub struct PointerIndicatorPlugin<S>(PhantomData<fn() -> S>);

impl<S> Default for PointerIndicatorPlugin<S> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<S: PointerSink> Plugin for PointerIndicatorPlugin<S> {
    fn build(&self, app: &mut App) {
        app.add_systems(PostUpdate, draw_pointers::<S>)
            .register_type::<PointerIndicator>();
    }
}

/// Optional. Configures whether the pointers of a camera's [`InteractiveControls`] are drawn. The
/// indicator is enabled if this component is not present.
#[derive(Debug, Component, Reflect)]
pub struct PointerIndicator {
    /// Should the indicator be visible on this camera?
    pub enabled: bool,
    /// How far along the pointer rays the markers are drawn.
    pub distance: f32,
}

impl Default for PointerIndicator {
    fn default() -> Self {
        Self {
            enabled: true,
            distance: 1.0,
        }
    }
}

/// Use gizmos to draw a marker where each pointer ray is at the indicator distance, with a trail
/// showing its latest movement.
pub fn draw_pointers<S: PointerSink>(
    cameras: Query<(&InteractiveControls<S>, Option<&PointerIndicator>)>,
    mut gizmos: Gizmos,
) {
    for (controls, indicator) in cameras.iter() {
        let distance = match indicator {
            Some(indicator) if !indicator.enabled => continue,
            Some(indicator) => indicator.distance,
            None => PointerIndicator::default().distance,
        };
        let scale = distance * 0.01;

        let mut draw = |ray: &Pointer6D, color: Color| {
            let at = |sample: RaySample| sample.origin + sample.direction.normalize_or_zero() * distance;
            let current = at(ray.current());
            gizmos.sphere(current, scale, color);
            gizmos.line(at(ray.previous()), current, color);
        };

        if let Some(hover) = controls.hover() {
            draw(hover.ray(), GRAY.into());
        }
        for pointer in controls.pointers() {
            draw(pointer.ray(), WHITE.into());
        }
        if let Some(simulated) = controls.simulated() {
            draw(simulated.ray(), ORANGE.into());
        }
        if controls.pointers().len() > 1 {
            let center = CenterPointerTracker::new(controls.pointers());
            draw(&center.ray(), YELLOW.into());
        }
    }
}
