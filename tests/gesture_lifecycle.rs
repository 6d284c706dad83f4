//! End to end gestures through the public API, without an app.

use std::time::Duration;

use bevy_ecs::entity::Entity;
use bevy_math::prelude::*;
use bevy_platform::time::Instant;
use bevy_pointer_controls::{animation::Animatable, prelude::*};
use bevy_render::camera::PerspectiveProjection;
use bevy_transform::prelude::*;

const WINDOW: Entity = Entity::PLACEHOLDER;
const GROUND: PointerPlane = PointerPlane {
    origin: Vec3::ZERO,
    normal: Dir3::Z,
};

/// Drags a point on the ground like a translate gizmo, and scales it with pinches.
#[derive(Default)]
struct GroundDrag {
    translation: Vec3,
    scale: f32,
    pinch_center: Option<Vec3>,
    gestures: u32,
}

impl PointerSink for GroundDrag {
    fn on_tracked_pointer_down(&mut self, _: &PointerTracker, pointers: &[PointerTracker]) {
        if pointers.len() == 1 {
            self.gestures += 1;
        }
    }

    fn on_tracked_pointer_move(
        &mut self,
        pointer: &PointerTracker,
        pointers: &[PointerTracker],
        center: &CenterPointerTracker,
    ) {
        if pointers.len() == 1 {
            if let Some(projected) = pointer.project_on_plane(&GROUND, DEFAULT_MIN_GRAZING_ANGLE) {
                self.translation += projected.movement();
            }
            return;
        }
        let Some(center_projection) = center.project_on_plane(&GROUND, DEFAULT_MIN_GRAZING_ANGLE)
        else {
            return;
        };
        self.pinch_center = Some(center_projection.current());
        let spread = |sample: fn(&Pointer3D) -> Vec3| -> f32 {
            pointers
                .iter()
                .filter_map(|pointer| pointer.project_on_plane(&GROUND, 0.0))
                .map(|projected| sample(&projected).distance(center_projection.current()))
                .sum()
        };
        let previous = spread(Pointer3D::previous);
        if previous > 0.0 {
            self.scale *= spread(Pointer3D::current) / previous;
        }
    }
}

fn camera() -> PointerCamera {
    PointerCamera::perspective(
        &PerspectiveProjection::default(),
        &GlobalTransform::from_xyz(0.0, 0.0, 5.0),
    )
}

fn controls(scheduler: &AnimationScheduler) -> InteractiveControls<GroundDrag> {
    InteractiveControls::new(
        GroundDrag {
            scale: 1.0,
            ..Default::default()
        },
        scheduler.clone(),
        Viewport::new(WINDOW, Rect::new(0.0, 0.0, 200.0, 200.0), camera()),
    )
}

fn touch(id: i32, x: f32, y: f32, millis: u64) -> PointerInput {
    PointerInput::new(id, PointerKind::Touch, WINDOW, Vec2::new(x, y))
        .with_buttons(PointerButtons::PRIMARY)
        .at(Duration::from_millis(millis))
}

#[test]
fn drag_follows_the_pointer_on_the_ground() {
    let scheduler = AnimationScheduler::default();
    let mut controls = controls(&scheduler);
    let start = touch(2, 100.0, 100.0, 0);
    controls.handle(&InputEvent::PointerDown(start));
    for (step, x) in [110.0, 130.0, 160.0].into_iter().enumerate() {
        controls.handle(&InputEvent::PointerMove(touch(2, x, 100.0, 10 * step as u64)));
    }

    // The ground point under the pointer moved by exactly the accumulated translation.
    let pointer = &controls.pointers()[0];
    let under_pointer = pointer.intersect_plane(&GROUND).unwrap();
    let translation = controls.sink().translation;
    assert!(translation.x > 0.0);
    assert!(translation.abs_diff_eq(under_pointer, 1e-4), "{translation} != {under_pointer}");

    controls.handle(&InputEvent::PointerUp(touch(2, 160.0, 100.0, 500)));
    assert_eq!(controls.sink().gestures, 1);
    assert!(!scheduler.is_running());
}

#[test]
fn pinch_pivots_around_the_center() {
    let scheduler = AnimationScheduler::default();
    let mut controls = controls(&scheduler);
    controls.handle(&InputEvent::PointerDown(touch(2, 80.0, 100.0, 0)));
    controls.handle(&InputEvent::PointerDown(touch(3, 120.0, 100.0, 0)));
    controls.handle(&InputEvent::PointerMove(touch(2, 60.0, 100.0, 10)));
    controls.handle(&InputEvent::PointerMove(touch(3, 140.0, 100.0, 10)));

    let sink = controls.sink();
    assert_eq!(sink.gestures, 1);
    assert!(sink.scale > 1.2, "fingers spread apart, got {}", sink.scale);
    let pivot = sink.pinch_center.unwrap();
    assert!(pivot.abs_diff_eq(Vec3::ZERO, 1e-4), "{pivot}");
    assert_eq!(sink.translation, Vec3::ZERO);
}

#[test]
fn one_scheduler_drives_many_controls() {
    let scheduler = AnimationScheduler::default();
    let mut first = controls(&scheduler).with_damping(0.2);
    let mut second = controls(&scheduler).with_damping(0.2);

    for (controls, direction) in [(&mut first, 1.0), (&mut second, -1.0)] {
        controls.handle(&InputEvent::PointerDown(touch(2, 100.0, 100.0, 0)));
        controls.handle(&InputEvent::PointerMove(touch(2, 100.0 + 20.0 * direction, 100.0, 10)));
        controls.handle(&InputEvent::PointerUp(touch(2, 100.0 + 20.0 * direction, 100.0, 20)));
        assert!(controls.simulated().is_some());
    }
    let released = (first.sink().translation, second.sink().translation);

    let start = Instant::now();
    let mut frame = 0;
    while scheduler.tick(
        start + Duration::from_millis(16) * frame,
        &mut [&mut first as &mut dyn Animatable, &mut second],
    ) {
        frame += 1;
        assert!(frame < 1000);
    }

    assert!(first.simulated().is_none() && second.simulated().is_none());
    // Both kept gliding in the direction they were thrown.
    assert!(first.sink().translation.x > released.0.x);
    assert!(second.sink().translation.x < released.1.x);
    assert_eq!(first.sink().gestures, 1);
}

#[test]
fn grazing_views_stay_finite() {
    let scheduler = AnimationScheduler::default();
    // Looking along the ground, so the horizon is in the middle of the viewport.
    let camera = PointerCamera::perspective(
        &PerspectiveProjection::default(),
        &GlobalTransform::from(Transform::from_xyz(0.0, -10.0, 0.5).looking_to(Vec3::Y, Vec3::Z)),
    );
    let mut controls = InteractiveControls::new(
        GroundDrag::default(),
        scheduler,
        Viewport::new(WINDOW, Rect::new(0.0, 0.0, 200.0, 200.0), camera),
    );
    // Drag from below the horizon up toward it. Unclamped, the last ray would meet the ground
    // more than a hundred units away.
    controls.handle(&InputEvent::PointerDown(touch(2, 100.0, 130.0, 0)));
    for y in [115.0, 105.0, 101.0] {
        controls.handle(&InputEvent::PointerMove(touch(2, 100.0, y, 5)));
    }
    let translation = controls.sink().translation;
    assert!(translation.is_finite());
    assert!(translation.y > 0.0, "{translation}");
    assert!(translation.length() < 5.0, "{translation}");
}
