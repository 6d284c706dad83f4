//! Plugins and systems that connect [`InteractiveControls`] to bevy cameras and window input.

use std::marker::PhantomData;

use bevy_app::prelude::*;
use bevy_ecs::{prelude::*, system::SystemParam};
use bevy_input::{
    keyboard::{KeyCode, KeyboardInput},
    mouse::{MouseButtonInput, MouseWheel},
    touch::{TouchInput, TouchPhase},
    ButtonInput, ButtonState, InputSystem,
};
use bevy_log::prelude::*;
use bevy_math::prelude::*;
use bevy_platform::time::Instant;
use bevy_render::{
    camera::{Projection, RenderTarget},
    prelude::*,
};
use bevy_time::{Real, Time};
use bevy_transform::prelude::*;
use bevy_window::{
    CursorMoved, FileDragAndDrop, PrimaryWindow, RequestRedraw, Window, WindowRef,
};

use super::{
    input::{
        InputEvent, KeyInput, PointerInput, Viewport, ViewportId, WheelInput, XrControllerInput,
    },
    interactive::InteractiveControls,
    sink::PointerSink,
    InteractionSettings,
};
use crate::{
    animation::{Animatable, AnimationFrame, AnimationScheduler},
    pointer::{
        camera::PointerCamera,
        tracker::{Modifiers, PointerButtons, PointerKind},
    },
};

/// The pointer id of the mouse.
pub const MOUSE_POINTER_ID: i32 = 1;
/// Touch contacts use this plus the touch id as their pointer id.
pub const TOUCH_POINTER_ID_OFFSET: i32 = 2;

/// The stages of interactive controls in [`PreUpdate`], run in order after input is collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, SystemSet)]
pub enum InteractiveControlsSystems {
    /// Copy camera state into the primary viewport of each control.
    SyncViewports,
    /// Route window input to controls.
    Input,
    /// Start a frame of the [`AnimationScheduler`].
    BeginFrame,
    /// Step the animations due in the current frame.
    Animate,
}

/// The frame of the [`AnimationScheduler`] that is being run, if the loop is not suspended.
#[derive(Debug, Default, Resource)]
pub struct CurrentAnimationFrame(pub Option<AnimationFrame>);

/// Runs the shared [`AnimationScheduler`] once per app update.
pub struct AnimationSchedulerPlugin;

impl Plugin for AnimationSchedulerPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<AnimationScheduler>()
            .init_resource::<CurrentAnimationFrame>()
            .add_event::<RequestRedraw>()
            .configure_sets(
                PreUpdate,
                (
                    InteractiveControlsSystems::SyncViewports,
                    InteractiveControlsSystems::Input,
                    InteractiveControlsSystems::BeginFrame,
                    InteractiveControlsSystems::Animate,
                )
                    .chain()
                    .after(InputSystem),
            )
            .add_systems(
                PreUpdate,
                begin_animation_frame.in_set(InteractiveControlsSystems::BeginFrame),
            )
            // Property writes made during `Update` need another frame to be delivered.
            .add_systems(PostUpdate, request_animation_redraw);
    }
}

/// Start the next frame of the scheduler.
pub fn begin_animation_frame(
    scheduler: Res<AnimationScheduler>,
    mut frame: ResMut<CurrentAnimationFrame>,
) {
    frame.0 = scheduler.begin_frame(Instant::now());
}

/// Keep the app updating while animations are running.
pub fn request_animation_redraw(
    scheduler: Res<AnimationScheduler>,
    mut redraw: EventWriter<RequestRedraw>,
) {
    if scheduler.is_running() {
        redraw.write(RequestRedraw);
    }
}

/// Drives [`InteractiveControls<S>`] components on camera entities.
///
/// Add one per sink type. The [`AnimationSchedulerPlugin`] is added if it is missing.
pub struct InteractiveControlsPlugin<S>(PhantomData<fn() -> S>);

impl<S> Default for InteractiveControlsPlugin<S> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<S: PointerSink> Plugin for InteractiveControlsPlugin<S> {
    fn build(&self, app: &mut App) {
        if !app.is_plugin_added::<AnimationSchedulerPlugin>() {
            app.add_plugins(AnimationSchedulerPlugin);
        }
        app.add_event::<CursorMoved>()
            .add_event::<MouseButtonInput>()
            .add_event::<MouseWheel>()
            .add_event::<TouchInput>()
            .add_event::<KeyboardInput>()
            .add_event::<FileDragAndDrop>()
            .add_event::<XrControllerInput>()
            .add_systems(
                PreUpdate,
                (
                    InteractiveControls::<S>::sync_viewports
                        .in_set(InteractiveControlsSystems::SyncViewports),
                    InteractiveControls::<S>::forward_input.in_set(InteractiveControlsSystems::Input),
                    InteractiveControls::<S>::animate.in_set(InteractiveControlsSystems::Animate),
                ),
            )
            .register_type::<InteractionSettings>()
            .register_type::<PointerCamera>();
    }
}

/// Mouse state carried between frames by [`InputReaders`].
#[derive(Debug, Default)]
pub struct MouseState {
    buttons: PointerButtons,
    cursor: Option<(Entity, Vec2)>,
}

/// Reads window input and translates it into [`InputEvent`]s.
#[derive(SystemParam)]
pub struct InputReaders<'w, 's> {
    cursor: EventReader<'w, 's, CursorMoved>,
    mouse_buttons: EventReader<'w, 's, MouseButtonInput>,
    wheel: EventReader<'w, 's, MouseWheel>,
    touches: EventReader<'w, 's, TouchInput>,
    keyboard: EventReader<'w, 's, KeyboardInput>,
    drag_and_drop: EventReader<'w, 's, FileDragAndDrop>,
    xr: EventReader<'w, 's, XrControllerInput>,
    windows: Query<'w, 's, &'static Window>,
    keys: Option<Res<'w, ButtonInput<KeyCode>>>,
    time: Option<Res<'w, Time<Real>>>,
    mouse: Local<'s, MouseState>,
}

impl InputReaders<'_, '_> {
    /// Drain this frame's input.
    ///
    /// Events of different kinds are not ordered relative to each other, so they are read in the
    /// order keyboard, cursor, buttons, touch, wheel, drag and drop, XR.
    pub fn read(&mut self) -> Vec<InputEvent> {
        let timestamp = self.time.as_ref().map(|time| time.elapsed()).unwrap_or_default();
        let modifiers = self.modifiers();
        let mut events = Vec::new();

        for input in self.keyboard.read() {
            let key = KeyInput {
                code: input.key_code,
                repeat: input.repeat,
                timestamp,
            };
            events.push(match input.state {
                ButtonState::Pressed => InputEvent::KeyDown(key),
                ButtonState::Released => InputEvent::KeyUp(key),
            });
        }

        for moved in self.cursor.read() {
            self.mouse.cursor = Some((moved.window, moved.position));
            events.push(InputEvent::PointerMove(
                mouse_input(moved.window, moved.position, self.mouse.buttons)
                    .with_modifiers(modifiers)
                    .at(timestamp),
            ));
        }

        for input in self.mouse_buttons.read() {
            let button = PointerButtons::from_mouse_button(input.button);
            if button.is_empty() {
                continue;
            }
            let Some(position) = cursor_position(&self.windows, &self.mouse, input.window) else {
                continue;
            };
            let held = self.mouse.buttons;
            let buttons = match input.state {
                ButtonState::Pressed => held.with(button),
                ButtonState::Released => held.without(button),
            };
            if buttons == held {
                continue;
            }
            self.mouse.buttons = buttons;
            let pointer = mouse_input(input.window, position, buttons)
                .with_modifiers(modifiers)
                .at(timestamp);
            if input.state == ButtonState::Pressed && button == PointerButtons::SECONDARY {
                events.push(InputEvent::ContextMenu(pointer));
            }
            // Only the first press and the last release start and end the gesture.
            events.push(if held.is_empty() {
                InputEvent::PointerDown(pointer)
            } else if buttons.is_empty() {
                InputEvent::PointerUp(pointer)
            } else {
                InputEvent::PointerMove(pointer)
            });
        }

        for touch in self.touches.read() {
            let Some(pointer_id) = touch_pointer_id(touch.id) else {
                warn_once!("Touch id {} does not fit in a pointer id, ignoring it.", touch.id);
                continue;
            };
            let buttons = match touch.phase {
                TouchPhase::Started | TouchPhase::Moved => PointerButtons::PRIMARY,
                TouchPhase::Ended | TouchPhase::Canceled => PointerButtons::NONE,
            };
            let pointer = PointerInput::new(pointer_id, PointerKind::Touch, touch.window, touch.position)
                .with_buttons(buttons)
                .with_modifiers(modifiers)
                .at(timestamp);
            events.push(match touch.phase {
                TouchPhase::Started => InputEvent::PointerDown(pointer),
                TouchPhase::Moved => InputEvent::PointerMove(pointer),
                TouchPhase::Ended => InputEvent::PointerUp(pointer),
                TouchPhase::Canceled => InputEvent::PointerCancel(pointer),
            });
        }

        for wheel in self.wheel.read() {
            let Some(position) = cursor_position(&self.windows, &self.mouse, wheel.window) else {
                continue;
            };
            events.push(InputEvent::Wheel(WheelInput {
                element: wheel.window,
                position,
                delta: Vec2::new(wheel.x, wheel.y),
                unit: wheel.unit,
                modifiers,
                timestamp,
            }));
        }

        for drag in self.drag_and_drop.read() {
            let (window, dropped) = match drag {
                FileDragAndDrop::HoveredFile { window, .. } => (*window, false),
                FileDragAndDrop::DroppedFile { window, .. } => (*window, true),
                FileDragAndDrop::HoveredFileCanceled { .. } => continue,
            };
            let Some(position) = cursor_position(&self.windows, &self.mouse, window) else {
                continue;
            };
            let pointer = mouse_input(window, position, PointerButtons::NONE)
                .with_modifiers(modifiers)
                .at(timestamp);
            events.push(if dropped {
                InputEvent::Drop(pointer)
            } else {
                InputEvent::DragOver(pointer)
            });
        }

        events.extend(self.xr.read().map(|input| InputEvent::Xr(*input)));
        events
    }

    fn modifiers(&self) -> Modifiers {
        let Some(keys) = self.keys.as_ref() else {
            return Modifiers::default();
        };
        Modifiers {
            alt: keys.any_pressed([KeyCode::AltLeft, KeyCode::AltRight]),
            ctrl: keys.any_pressed([KeyCode::ControlLeft, KeyCode::ControlRight]),
            meta: keys.any_pressed([KeyCode::SuperLeft, KeyCode::SuperRight]),
            shift: keys.any_pressed([KeyCode::ShiftLeft, KeyCode::ShiftRight]),
        }
    }
}

fn mouse_input(window: Entity, position: Vec2, buttons: PointerButtons) -> PointerInput {
    PointerInput::new(MOUSE_POINTER_ID, PointerKind::Mouse, window, position).with_buttons(buttons)
}

/// The pointer id of a touch contact, if it fits without colliding with other pointers.
fn touch_pointer_id(id: u64) -> Option<i32> {
    i32::try_from(id).ok()?.checked_add(TOUCH_POINTER_ID_OFFSET)
}

fn cursor_position(
    windows: &Query<&Window>,
    mouse: &MouseState,
    window: Entity,
) -> Option<Vec2> {
    windows
        .get(window)
        .ok()
        .and_then(Window::cursor_position)
        .or_else(|| {
            mouse
                .cursor
                .filter(|(cursor_window, _)| *cursor_window == window)
                .map(|(_, position)| position)
        })
}

impl<S: PointerSink> InteractiveControls<S> {
    /// Copy the camera's target window, logical viewport, projection, and transform into the
    /// primary viewport.
    pub fn sync_viewports(
        mut cameras: Query<(&mut Self, &Camera, &Projection, &GlobalTransform)>,
        primary_window: Query<Entity, With<PrimaryWindow>>,
    ) {
        for (mut controls, camera, projection, transform) in cameras.iter_mut() {
            let RenderTarget::Window(window) = camera.target else {
                continue;
            };
            let element = match window {
                WindowRef::Primary => match primary_window.single() {
                    Ok(window) => window,
                    Err(_) => continue,
                },
                WindowRef::Entity(window) => window,
            };
            let Some(rect) = camera.logical_viewport_rect() else {
                continue;
            };
            let viewport = Viewport::new(
                element,
                rect,
                PointerCamera::from_projection(projection, transform),
            );
            if controls.viewport(ViewportId::PRIMARY) != Some(&viewport) {
                controls.set_viewport(ViewportId::PRIMARY, viewport);
            }
        }
    }

    /// Route this frame's window input to every control.
    pub fn forward_input(mut input: InputReaders, mut controls: Query<&mut Self>) {
        let events = input.read();
        if events.is_empty() {
            return;
        }
        for mut controls in controls.iter_mut() {
            for event in &events {
                controls.handle(event);
            }
        }
    }

    /// Step the animations of every control that are due in the current frame.
    pub fn animate(
        frame: Res<CurrentAnimationFrame>,
        scheduler: Res<AnimationScheduler>,
        mut controls: Query<&mut Self>,
    ) {
        let Some(frame) = frame.0.as_ref() else {
            return;
        };
        for mut controls in controls.iter_mut() {
            if frame.is_due(controls.animation_owner()) {
                frame.run(&scheduler, &mut *controls);
            }
        }
    }
}
