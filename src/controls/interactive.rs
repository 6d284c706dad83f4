//! [`InteractiveControls`], the gesture dispatcher behind every gizmo and camera rig.

use std::{fmt, slice, time::Duration};

use bevy_ecs::prelude::*;
use bevy_input::keyboard::KeyCode;
use bevy_log::prelude::*;
use bevy_math::prelude::*;

use super::{
    input::{
        InputEvent, InputResponse, KeyInput, PointerInput, Viewport, ViewportId, WheelInput,
        XrAction, XrControllerInput,
    },
    sink::PointerSink,
    InteractionSettings, DEFAULT_DAMPING_FACTOR,
};
use crate::{
    animation::{Animatable, AnimationChannel, AnimationKey, AnimationScheduler, ControlId},
    observe::{observed_setters, Observed, ObservedProperty, PropertyEvents, PropertyObservable},
    pointer::{
        center::CenterPointerTracker,
        tracker::{PointerButtons, PointerKind, PointerTracker, VIRTUAL_POINTER_ID},
    },
};

/// The observed properties of [`InteractiveControls`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlProperty {
    Enabled(bool),
    EnableDamping(bool),
    DampingFactor(f32),
}

impl ObservedProperty for ControlProperty {
    fn name(&self) -> &'static str {
        match self {
            ControlProperty::Enabled(_) => "enabled",
            ControlProperty::EnableDamping(_) => "enable_damping",
            ControlProperty::DampingFactor(_) => "damping_factor",
        }
    }
}

/// Tracks the pointers and keys of one or more viewports and turns them into gestures for a
/// [`PointerSink`].
///
/// The dispatcher is idle until a pointer moves over one of its viewports, hovers while the pointer
/// is up, and runs a gesture while one or more pointers are down. When damping is enabled and the
/// last pointer is released while still moving, the gesture continues with a simulated pointer
/// that glides to a stop.
///
/// Add it to a camera entity and the
/// [`InteractiveControlsPlugin`](super::systems::InteractiveControlsPlugin) keeps its primary
/// viewport in sync with the camera and feeds it window input. It can also be driven directly
/// with [`InteractiveControls::handle`].
#[derive(Component)]
pub struct InteractiveControls<S: PointerSink> {
    id: ControlId,
    sink: S,
    scheduler: AnimationScheduler,
    viewports: Vec<(ViewportId, Viewport)>,
    next_viewport: usize,
    pointers: Vec<PointerTracker>,
    hover: Option<PointerTracker>,
    simulated: Option<PointerTracker>,
    keys: Vec<KeyCode>,
    settings: InteractionSettings,
    enabled: Observed<bool>,
    enable_damping: Observed<bool>,
    damping_factor: Observed<f32>,
    events: PropertyEvents<ControlProperty>,
    disposed: bool,
}

impl<S: PointerSink> fmt::Debug for InteractiveControls<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InteractiveControls")
            .field("id", &self.id)
            .field("viewports", &self.viewports)
            .field("pointers", &self.pointers)
            .field("hover", &self.hover)
            .field("simulated", &self.simulated)
            .field("keys", &self.keys)
            .field("enabled", &*self.enabled)
            .field("disposed", &self.disposed)
            .finish_non_exhaustive()
    }
}

impl<S: PointerSink> InteractiveControls<S> {
    /// Create enabled controls for one viewport. Animations run on `scheduler`.
    pub fn new(sink: S, scheduler: AnimationScheduler, viewport: Viewport) -> Self {
        let id = ControlId::new();
        debug!("Interactive controls {id:?} connected");
        Self {
            id,
            sink,
            scheduler,
            viewports: vec![(ViewportId::PRIMARY, viewport)],
            next_viewport: ViewportId::PRIMARY.0 + 1,
            pointers: Vec::new(),
            hover: None,
            simulated: None,
            keys: Vec::new(),
            settings: InteractionSettings::default(),
            enabled: Observed::new(true),
            enable_damping: Observed::new(false),
            damping_factor: Observed::new(DEFAULT_DAMPING_FACTOR),
            events: PropertyEvents::default(),
            disposed: false,
        }
    }

    /// Enable inertia with the given damping factor.
    pub fn with_damping(mut self, damping_factor: f32) -> Self {
        self.enable_damping = Observed::new(true);
        self.damping_factor = Observed::new(damping_factor);
        self.check_damping_factor();
        self
    }

    pub fn with_settings(mut self, settings: InteractionSettings) -> Self {
        self.settings = settings;
        self
    }

    observed_setters! {
        ControlProperty;
        /// Connect or disconnect the controls. Disconnected controls ignore all input, forget
        /// their pointers and keys, and stop their animations.
        set_enabled(enabled: bool) => Enabled, enabled_changed;
        /// Let released pointers glide. Disabling this ends a running glide.
        set_enable_damping(enable_damping: bool) => EnableDamping, enable_damping_changed;
        /// How quickly released pointers slow down, in `(0, 1)`. The fraction of the velocity lost
        /// in every 60th of a second.
        set_damping_factor(damping_factor: f32) => DampingFactor, damping_factor_changed;
    }

    pub fn id(&self) -> ControlId {
        self.id
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// The scheduler the animations of these controls run on.
    pub fn scheduler(&self) -> &AnimationScheduler {
        &self.scheduler
    }

    pub fn settings(&self) -> &InteractionSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut InteractionSettings {
        &mut self.settings
    }

    pub fn enabled(&self) -> bool {
        *self.enabled
    }

    pub fn enable_damping(&self) -> bool {
        *self.enable_damping
    }

    pub fn damping_factor(&self) -> f32 {
        *self.damping_factor
    }

    /// Has [`InteractiveControls::dispose`] been called?
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// The pointers that are down, in the order they were pressed.
    pub fn pointers(&self) -> &[PointerTracker] {
        &self.pointers
    }

    /// The pointer hovering over a viewport, if any.
    pub fn hover(&self) -> Option<&PointerTracker> {
        self.hover.as_ref()
    }

    /// The gliding pointer of a released gesture, if any.
    pub fn simulated(&self) -> Option<&PointerTracker> {
        self.simulated.as_ref()
    }

    /// The keys that are held, in the order they were pressed.
    pub fn keys(&self) -> &[KeyCode] {
        &self.keys
    }

    pub fn viewport(&self, id: ViewportId) -> Option<&Viewport> {
        self.viewports
            .iter()
            .find(|(viewport_id, _)| *viewport_id == id)
            .map(|(_, viewport)| viewport)
    }

    pub fn viewports(&self) -> impl Iterator<Item = (ViewportId, &Viewport)> {
        self.viewports.iter().map(|(id, viewport)| (*id, viewport))
    }

    /// Serve another viewport. Pointers are resolved against viewports in the order they were
    /// added.
    pub fn add_viewport(&mut self, viewport: Viewport) -> ViewportId {
        let id = ViewportId(self.next_viewport);
        self.next_viewport += 1;
        self.viewports.push((id, viewport));
        id
    }

    /// Replace a viewport, for example when its camera moved. Returns `false` if there is no such
    /// viewport.
    pub fn set_viewport(&mut self, id: ViewportId, viewport: Viewport) -> bool {
        match self.viewports.iter_mut().find(|(viewport_id, _)| *viewport_id == id) {
            Some((_, existing)) => {
                *existing = viewport;
                true
            }
            None => false,
        }
    }

    /// Stop serving a viewport, ending the gestures of pointers it captured.
    pub fn remove_viewport(&mut self, id: ViewportId) -> Option<Viewport> {
        if id == ViewportId::PRIMARY {
            warn!("The primary viewport of interactive controls cannot be removed");
            return None;
        }
        let index = self
            .viewports
            .iter()
            .position(|(viewport_id, _)| *viewport_id == id)?;
        let (_, viewport) = self.viewports.remove(index);
        while let Some(index) = self
            .pointers
            .iter()
            .position(|pointer| pointer.viewport() == Some(id))
        {
            self.release(index);
        }
        if self
            .simulated
            .as_ref()
            .is_some_and(|pointer| pointer.viewport() == Some(id))
        {
            self.finish_inertia();
        }
        if self
            .hover
            .as_ref()
            .is_some_and(|pointer| pointer.viewport() == Some(id))
        {
            self.hover = None;
        }
        Some(viewport)
    }

    /// Route an input event. Disabled or disposed controls ignore everything.
    pub fn handle(&mut self, event: &InputEvent) -> InputResponse {
        if self.disposed || !*self.enabled {
            return InputResponse::Ignored;
        }
        match event {
            InputEvent::PointerDown(input) => self.pointer_down(input),
            InputEvent::PointerMove(input) => self.pointer_move(input),
            InputEvent::PointerUp(input) => self.pointer_up(input, true),
            InputEvent::PointerCancel(input) => self.pointer_up(input, false),
            InputEvent::ContextMenu(input) => {
                if self.active_index(input.pointer_id).is_some()
                    || self.resolve_viewport(input.element, input.position).is_some()
                {
                    InputResponse::Consumed
                } else {
                    InputResponse::Ignored
                }
            }
            InputEvent::Wheel(wheel) => self.wheel(wheel),
            InputEvent::KeyDown(key) => self.key_down(key),
            InputEvent::KeyUp(key) => self.key_up(key),
            InputEvent::DragOver(input) => self.drag(input, false),
            InputEvent::Drop(input) => self.drag(input, true),
            InputEvent::Xr(input) => self.xr(input),
        }
    }

    /// Step a custom animation every frame until [`PointerSink::on_animation_frame`] returns
    /// `false`. The first step runs immediately. Returns `false` if the animation was already
    /// running or the controls are disabled.
    pub fn start_custom_animation(&mut self, channel: u32) -> bool {
        if self.disposed || !*self.enabled {
            return false;
        }
        let scheduler = self.scheduler.clone();
        scheduler.start_animation(self, AnimationChannel::Custom(channel))
    }

    pub fn stop_custom_animation(&mut self, channel: u32) -> bool {
        self.scheduler
            .stop_animation(self.key(AnimationChannel::Custom(channel)))
    }

    /// Disconnect for good: forget all pointers and keys, stop all animations, and remove all
    /// listeners. Calling this again does nothing.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.disconnect();
        self.events.clear();
        debug!("Interactive controls {:?} disposed", self.id);
    }

    fn key(&self, channel: AnimationChannel) -> AnimationKey {
        AnimationKey::new(self.id, channel)
    }

    fn notify_property(&mut self, value: ControlProperty, previous: ControlProperty) {
        if self.events.notify(value, previous) && !self.disposed {
            self.scheduler
                .request_frame(self.key(AnimationChannel::ChangeBatch));
        }
    }

    fn enabled_changed(&mut self, _previous: bool) {
        if *self.enabled {
            debug!("Interactive controls {:?} connected", self.id);
        } else {
            self.disconnect();
        }
    }

    fn enable_damping_changed(&mut self, _previous: bool) {
        if !*self.enable_damping {
            self.finish_inertia();
        }
    }

    fn damping_factor_changed(&mut self, _previous: f32) {
        self.check_damping_factor();
    }

    fn check_damping_factor(&self) {
        let factor = *self.damping_factor;
        if !(factor > 0.0 && factor < 1.0) {
            warn!("Damping factor {factor} is outside of (0, 1), released pointers will not glide to a stop");
        }
    }

    fn disconnect(&mut self) {
        let change_pending = self.events.is_change_pending();
        self.pointers.clear();
        self.hover = None;
        self.simulated = None;
        self.keys.clear();
        self.scheduler.stop_all_animations(self.id);
        // The change notification is still owed to listeners.
        if change_pending && !self.disposed {
            self.scheduler
                .request_frame(self.key(AnimationChannel::ChangeBatch));
        }
        debug!("Interactive controls {:?} disconnected", self.id);
    }

    fn active_index(&self, pointer_id: i32) -> Option<usize> {
        self.pointers
            .iter()
            .position(|pointer| pointer.pointer_id() == pointer_id)
    }

    fn resolve_viewport(&self, element: Entity, position: Vec2) -> Option<(ViewportId, Viewport)> {
        self.viewports
            .iter()
            .find(|(_, viewport)| viewport.contains(element, position))
            .copied()
    }

    fn captured_viewport(&self, pointer: &PointerTracker) -> Option<Viewport> {
        pointer
            .viewport()
            .and_then(|id| self.viewport(id))
            .copied()
    }

    fn transient_pointer(&self, input: &PointerInput) -> Option<PointerTracker> {
        let (viewport_id, viewport) = self.resolve_viewport(input.element, input.position)?;
        Some(PointerTracker::new(input, viewport_id, &viewport))
    }

    fn pointer_down(&mut self, input: &PointerInput) -> InputResponse {
        // Another button of a pointer that is already down.
        if self.active_index(input.pointer_id).is_some() {
            return self.pointer_move(input);
        }
        let Some((viewport_id, viewport)) = self.resolve_viewport(input.element, input.position)
        else {
            return InputResponse::Ignored;
        };
        self.capture(PointerTracker::new(input, viewport_id, &viewport))
    }

    fn pointer_move(&mut self, input: &PointerInput) -> InputResponse {
        if let Some(index) = self.active_index(input.pointer_id) {
            let Some(viewport) = self.captured_viewport(&self.pointers[index]) else {
                return InputResponse::Ignored;
            };
            self.pointers[index].update(input, &viewport);
            return self.moved(index);
        }
        let Some((viewport_id, viewport)) = self.resolve_viewport(input.element, input.position)
        else {
            return InputResponse::Ignored;
        };
        match &mut self.hover {
            Some(hover)
                if hover.pointer_id() == input.pointer_id
                    && hover.viewport() == Some(viewport_id) =>
            {
                hover.update(input, &viewport);
            }
            hover => *hover = Some(PointerTracker::new(input, viewport_id, &viewport)),
        }
        self.hovered()
    }

    fn pointer_up(&mut self, input: &PointerInput, allow_inertia: bool) -> InputResponse {
        let Some(index) = self.active_index(input.pointer_id) else {
            return InputResponse::Ignored;
        };
        if allow_inertia
            && self.pointers.len() == 1
            && self.should_glide(&self.pointers[index], input.timestamp)
        {
            let mut pointer = self.pointers.remove(index);
            pointer.set_simulated();
            debug!("Pointer {} released with inertia", pointer.pointer_id());
            self.simulated = Some(pointer);
            let scheduler = self.scheduler.clone();
            scheduler.start_animation(self, AnimationChannel::Inertia);
        } else {
            self.release(index);
        }
        InputResponse::Consumed
    }

    fn should_glide(&self, pointer: &PointerTracker, released_at: Duration) -> bool {
        *self.enable_damping
            && released_at.saturating_sub(pointer.timestamp()) < self.settings.inertia_max_elapsed
            && pointer.view().movement().length() > self.settings.inertia_min_movement
    }

    fn capture(&mut self, pointer: PointerTracker) -> InputResponse {
        self.finish_inertia();
        if self
            .hover
            .as_ref()
            .is_some_and(|hover| hover.pointer_id() == pointer.pointer_id())
        {
            self.hover = None;
        }
        for other in &mut self.pointers {
            other.clear_movement();
        }
        trace!(
            "Pointer {} down, {} pointers active",
            pointer.pointer_id(),
            self.pointers.len() + 1
        );
        self.pointers.push(pointer);
        if let Some(pointer) = self.pointers.last() {
            self.sink.on_tracked_pointer_down(pointer, &self.pointers);
        }
        InputResponse::Consumed
    }

    fn moved(&mut self, index: usize) -> InputResponse {
        if self.pointers.len() > 1 {
            for (other, pointer) in self.pointers.iter_mut().enumerate() {
                if other != index {
                    pointer.clear_movement();
                }
            }
        }
        let center = CenterPointerTracker::new(&self.pointers);
        self.sink
            .on_tracked_pointer_move(&self.pointers[index], &self.pointers, &center);
        InputResponse::Consumed
    }

    fn release(&mut self, index: usize) {
        let pointer = self.pointers.remove(index);
        for other in &mut self.pointers {
            other.clear_movement();
        }
        trace!(
            "Pointer {} up, {} pointers active",
            pointer.pointer_id(),
            self.pointers.len()
        );
        self.sink.on_tracked_pointer_up(&pointer, &self.pointers);
    }

    fn hovered(&mut self) -> InputResponse {
        if let Some(hover) = &self.hover {
            self.sink
                .on_tracked_pointer_hover(hover, slice::from_ref(hover));
        }
        InputResponse::Ignored
    }

    fn step_inertia(&mut self, delta: Duration) {
        let key = self.key(AnimationChannel::Inertia);
        let Some(mut pointer) = self.simulated.take() else {
            self.scheduler.stop_animation(key);
            return;
        };
        pointer.simulate_damping(*self.damping_factor, delta);
        let pointers = slice::from_ref(&pointer);
        self.sink
            .on_tracked_pointer_move(&pointer, pointers, &CenterPointerTracker::new(pointers));
        if pointer.view().movement().length() < self.settings.inertia_stop_movement {
            self.scheduler.stop_animation(key);
            trace!("Pointer {} stopped gliding", pointer.pointer_id());
            self.sink.on_tracked_pointer_up(&pointer, &[]);
        } else {
            self.simulated = Some(pointer);
        }
    }

    fn finish_inertia(&mut self) {
        if let Some(pointer) = self.simulated.take() {
            self.scheduler
                .stop_animation(self.key(AnimationChannel::Inertia));
            trace!("Pointer {} glide interrupted", pointer.pointer_id());
            self.sink.on_tracked_pointer_up(&pointer, &[]);
        }
    }

    fn key_down(&mut self, key: &KeyInput) -> InputResponse {
        if key.repeat || self.keys.contains(&key.code) {
            return InputResponse::Ignored;
        }
        self.keys.push(key.code);
        self.sink.on_tracked_key_down(key.code, &self.keys);
        self.sink.on_tracked_key_change(key.code, &self.keys);
        InputResponse::Consumed
    }

    fn key_up(&mut self, key: &KeyInput) -> InputResponse {
        let Some(index) = self.keys.iter().position(|code| *code == key.code) else {
            return InputResponse::Ignored;
        };
        self.keys.remove(index);
        self.sink.on_tracked_key_up(key.code, &self.keys);
        self.sink.on_tracked_key_change(key.code, &self.keys);
        InputResponse::Consumed
    }

    fn wheel(&mut self, wheel: &WheelInput) -> InputResponse {
        let input = PointerInput::new(
            VIRTUAL_POINTER_ID,
            PointerKind::Mouse,
            wheel.element,
            wheel.position,
        )
        .with_modifiers(wheel.modifiers)
        .at(wheel.timestamp);
        let Some(pointer) = self.transient_pointer(&input) else {
            return InputResponse::Ignored;
        };
        self.sink.on_tracked_wheel(wheel, &pointer);
        InputResponse::Consumed
    }

    fn drag(&mut self, input: &PointerInput, dropped: bool) -> InputResponse {
        let Some(pointer) = self.transient_pointer(input) else {
            return InputResponse::Ignored;
        };
        let pointers = slice::from_ref(&pointer);
        if dropped {
            self.sink.on_tracked_drop(&pointer, pointers);
        } else {
            self.sink.on_tracked_drag_over(&pointer, pointers);
        }
        InputResponse::Consumed
    }

    fn xr(&mut self, input: &XrControllerInput) -> InputResponse {
        let pointer_id = input.pointer_id();
        let index = self.active_index(pointer_id);
        if index.is_some_and(|index| self.pointers[index].kind() != PointerKind::Xr) {
            warn_once!(
                "XR controller {} conflicts with an active pointer of the same id",
                input.controller
            );
            return InputResponse::Ignored;
        }
        match (input.action, index) {
            (XrAction::SelectStart, None) => self.capture(PointerTracker::from_object(
                pointer_id,
                &input.transform,
                PointerButtons::PRIMARY,
                input.timestamp,
            )),
            (XrAction::Move, Some(index)) => {
                self.pointers[index].update_from_object(
                    &input.transform,
                    PointerButtons::PRIMARY,
                    input.timestamp,
                );
                self.moved(index)
            }
            (XrAction::Move, None) => {
                match &mut self.hover {
                    Some(hover)
                        if hover.pointer_id() == pointer_id && hover.kind() == PointerKind::Xr =>
                    {
                        hover.update_from_object(
                            &input.transform,
                            PointerButtons::NONE,
                            input.timestamp,
                        );
                    }
                    hover => {
                        *hover = Some(PointerTracker::from_object(
                            pointer_id,
                            &input.transform,
                            PointerButtons::NONE,
                            input.timestamp,
                        ));
                    }
                }
                self.hovered()
            }
            (XrAction::SelectEnd, Some(index)) => {
                self.release(index);
                InputResponse::Consumed
            }
            (XrAction::SelectStart, Some(_)) | (XrAction::SelectEnd, None) => {
                InputResponse::Ignored
            }
        }
    }
}

impl<S: PointerSink> Animatable for InteractiveControls<S> {
    fn animation_owner(&self) -> ControlId {
        self.id
    }

    fn animate(&mut self, channel: AnimationChannel, delta: Duration) {
        match channel {
            AnimationChannel::Inertia => self.step_inertia(delta),
            AnimationChannel::ChangeBatch => self.events.flush(),
            AnimationChannel::Custom(custom) => {
                if !self.sink.on_animation_frame(custom, delta) {
                    self.scheduler.stop_animation(self.key(channel));
                }
            }
        }
    }
}

impl<S: PointerSink> PropertyObservable for InteractiveControls<S> {
    type Property = ControlProperty;

    fn property_events(&mut self) -> &mut PropertyEvents<ControlProperty> {
        &mut self.events
    }
}

impl<S: PointerSink> Drop for InteractiveControls<S> {
    fn drop(&mut self) {
        self.scheduler.stop_all_animations(self.id);
    }
}
