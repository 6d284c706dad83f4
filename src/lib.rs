//! Pointer and gesture handling for interactive 3D controls: transform gizmos, camera rigs, drag
//! handles, and anything else that turns screen input into motion in the scene.
//!
//! # Overview
//!
//! Mouse, touch, pen, and XR controller input is normalized into [`PointerTracker`]s. Each tracker
//! keeps its position in view space and its ray in world space, and can be projected onto a plane
//! to get a world space delta that is safe to apply to a transform, even when the plane is seen
//! edge-on.
//!
//! [`InteractiveControls`] tracks the pointers and keys of one or more viewports, runs the gesture
//! lifecycle (hover, down, move, up, and an optional inertial glide after release), and reports it
//! to a [`PointerSink`] you implement. Continuous effects run on a shared
//! [`AnimationScheduler`], and changes to control properties are reported to listeners
//! immediately, and batched into one change notification per frame.
//!
//! # Usage
//!
//! 1. Implement [`PointerSink`] for the state of your control.
//! 2. Add [`DefaultPointerControlsPlugins`] for that sink type.
//! 3. Add [`InteractiveControls`] to a camera entity, built with the app's
//!    [`AnimationScheduler`] resource.
//!
//! [`PointerTracker`]: pointer::tracker::PointerTracker
//! [`InteractiveControls`]: controls::interactive::InteractiveControls
//! [`PointerSink`]: controls::sink::PointerSink
//! [`AnimationScheduler`]: animation::AnimationScheduler

use std::marker::PhantomData;

use bevy_app::{PluginGroup, PluginGroupBuilder};

use controls::sink::PointerSink;

pub mod animation;
pub mod controls;
pub mod extensions;
pub mod observe;
pub mod pointer;

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        animation::{AnimationChannel, AnimationScheduler},
        controls::{
            input::{
                InputEvent, InputResponse, KeyInput, PointerInput, Viewport, ViewportId,
                WheelInput, XrAction, XrControllerInput,
            },
            interactive::{ControlProperty, InteractiveControls},
            sink::PointerSink,
            systems::{AnimationSchedulerPlugin, InteractiveControlsPlugin},
            InteractionSettings,
        },
        observe::{ControlEvent, PropertyObservable},
        pointer::{
            camera::PointerCamera,
            center::CenterPointerTracker,
            ray::{PointerPlane, DEFAULT_MIN_GRAZING_ANGLE},
            tracker::{PointerButtons, PointerKind, PointerTracker},
            Pointer2D, Pointer3D, Pointer6D,
        },
        DefaultPointerControlsPlugins,
    };
}

/// Adds [`InteractiveControlsPlugin`](controls::systems::InteractiveControlsPlugin) for `S`, and
/// the extensions enabled with cargo features.
pub struct DefaultPointerControlsPlugins<S>(PhantomData<fn() -> S>);

impl<S> Default for DefaultPointerControlsPlugins<S> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<S: PointerSink> PluginGroup for DefaultPointerControlsPlugins<S> {
    fn build(self) -> PluginGroupBuilder {
        let group = PluginGroupBuilder::start::<Self>()
            .add(controls::systems::InteractiveControlsPlugin::<S>::default());

        #[cfg(feature = "extension_pointer_indicator")]
        let group = group.add(extensions::pointer_indicator::PointerIndicatorPlugin::<S>::default());

        group
    }
}
