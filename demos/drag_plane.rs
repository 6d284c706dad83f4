//! Drag cubes across the ground with the mouse or touch. Released cubes glide to a stop, and
//! holding shift drags vertically.

use bevy::{input::keyboard::KeyCode, math::bounding::Aabb3d, prelude::*};
use bevy_pointer_controls::{pointer::tracker::PickVolume, prelude::*};
use rand::Rng;

fn main() {
    App::new()
        .add_plugins((
            DefaultPlugins,
            DefaultPointerControlsPlugins::<CubeDragger>::default(), // Step 1: Add the plugins for your sink
        ))
        .add_systems(Startup, (setup_camera, setup_scene))
        .add_systems(Update, move_cubes)
        .run();
}

fn setup_camera(mut commands: Commands, scheduler: Res<AnimationScheduler>) {
    commands.spawn((
        Camera3d::default(),
        Transform::from_xyz(0.0, 8.0, 12.0).looking_at(Vec3::ZERO, Vec3::Y),
        // Step 2: Add controls to the camera, built with the app's scheduler
        InteractiveControls::new(CubeDragger::default(), scheduler.clone(), Viewport::default())
            .with_damping(0.1),
    ));
}

/// Marks the cubes that can be dragged.
#[derive(Component)]
struct Draggable;

const HALF_SIZE: f32 = 0.5;

/// Picks the cube under the pointer when a gesture starts, and collects the world space movement
/// for it until the gesture ends.
#[derive(Default)]
struct CubeDragger {
    cubes: Vec<(Entity, Vec3)>,
    grabbed: Option<(Entity, PointerPlane)>,
    vertical: bool,
    movement: Vec3,
}

impl PointerSink for CubeDragger {
    fn on_tracked_pointer_down(&mut self, pointer: &PointerTracker, pointers: &[PointerTracker]) {
        if pointers.len() > 1 {
            self.grabbed = None;
            return;
        }
        let volumes = self.cubes.iter().map(|(entity, position)| {
            let aabb = Aabb3d::new(*position, Vec3::splat(HALF_SIZE));
            (*entity, PickVolume::Aabb(aabb))
        });
        self.grabbed = pointer.intersect_objects(volumes).first().map(|hit| {
            let normal = if self.vertical {
                // Face the camera, but stay upright.
                let toward = -pointer.ray().current().direction.with_y(0.0);
                Dir3::new(toward).unwrap_or(Dir3::Z)
            } else {
                Dir3::Y
            };
            (hit.target, PointerPlane::new(hit.point, normal))
        });
    }

    fn on_tracked_pointer_move(
        &mut self,
        pointer: &PointerTracker,
        _: &[PointerTracker],
        _: &CenterPointerTracker,
    ) {
        let Some((_, plane)) = self.grabbed.as_ref() else {
            return;
        };
        if let Some(projected) = pointer.project_on_plane(plane, DEFAULT_MIN_GRAZING_ANGLE) {
            self.movement += projected.movement();
        }
    }

    fn on_tracked_pointer_up(&mut self, _: &PointerTracker, pointers: &[PointerTracker]) {
        if pointers.is_empty() {
            self.grabbed = None;
        }
    }

    fn on_tracked_key_change(&mut self, _: KeyCode, codes: &[KeyCode]) {
        self.vertical = codes
            .iter()
            .any(|code| matches!(code, KeyCode::ShiftLeft | KeyCode::ShiftRight));
    }
}

/// Apply the collected movement to the grabbed cube, and tell the sink where the cubes are.
fn move_cubes(
    mut cameras: Query<&mut InteractiveControls<CubeDragger>>,
    mut cubes: Query<(Entity, &mut Transform), With<Draggable>>,
) {
    for mut controls in cameras.iter_mut() {
        let dragger = controls.sink_mut();
        let movement = std::mem::take(&mut dragger.movement);
        if let Some((grabbed, _)) = dragger.grabbed {
            if let Ok((_, mut transform)) = cubes.get_mut(grabbed) {
                transform.translation += movement;
                transform.translation.y = transform.translation.y.max(HALF_SIZE);
            }
        }
        dragger.cubes = cubes
            .iter()
            .map(|(entity, transform)| (entity, transform.translation))
            .collect();
    }
}

//
// --- The below code is not important for the example ---
//

fn setup_scene(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    commands.spawn((
        Mesh3d(meshes.add(Plane3d::default().mesh().size(20.0, 20.0))),
        MeshMaterial3d(materials.add(Color::srgb(0.3, 0.5, 0.3))),
    ));

    let cube = meshes.add(Cuboid::from_length(HALF_SIZE * 2.0));
    let mut rng = rand::thread_rng();
    for _ in 0..8 {
        let color = Color::hsl(rng.gen_range(0.0..360.0), 0.7, 0.6);
        commands.spawn((
            Draggable,
            Mesh3d(cube.clone()),
            MeshMaterial3d(materials.add(color)),
            Transform::from_xyz(
                rng.gen_range(-6.0..6.0),
                HALF_SIZE,
                rng.gen_range(-6.0..6.0),
            ),
        ));
    }

    commands.spawn((
        DirectionalLight {
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(4.0, 8.0, 4.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
}
