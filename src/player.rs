// First-person camera controller with mouse look, keyboard movement, and
// footstep audio.
use bevy::audio::Volume;
use bevy::input::mouse::MouseMotion;
use bevy::prelude::*;
use bevy::window::{CursorGrabMode, CursorOptions};
use bevy::{camera::Exposure, post_process::bloom::Bloom};

use crate::environment::{GroundNoise, LEVEL_EXTENT, ground_height};
use crate::levels::{CurrentLevelId, Screen};
use crate::pause::unpaused;

pub struct PlayerPlugin;

impl Plugin for PlayerPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, (spawn_player, load_footstep_clips))
            .insert_resource(ClearColor(Color::BLACK))
            .insert_resource(GlobalAmbientLight::NONE)
            .init_resource::<StepTimer>()
            .add_systems(
                Update,
                (mouse_look, player_movement, footsteps)
                    .chain()
                    .run_if(in_state(Screen::Exploring).and(unpaused)),
            );
    }
}

#[derive(Component)]
pub struct Player;

/// Tracks the player's yaw and pitch for composed camera rotation.
#[derive(Component)]
pub struct PlayerLook {
    pub yaw: f32,
    pub pitch: f32,
}

pub const EYE_HEIGHT: f32 = 1.6;
const MOUSE_SENSITIVITY: f32 = 0.003;
const MOVE_SPEED: f32 = 5.0;
const RUN_MULTIPLIER: f32 = 1.8;
const MAX_PITCH: f32 = 1.3;
/// Keep the player inside the dressed part of the level.
const ROAM_MARGIN: f32 = 2.0;

const WALK_CLIP: &str = "audio/step_walk.ogg";
const RUN_CLIP: &str = "audio/step_run.ogg";
const FOOTSTEP_VOLUME: f32 = 0.5;
const WALK_STEP_INTERVAL: f32 = 0.5;
const RUN_STEP_INTERVAL: f32 = 0.3;

pub fn spawn_player(mut commands: Commands) {
    commands.spawn((
        Player,
        PlayerLook {
            yaw: 0.0,
            pitch: 0.0,
        },
        Camera3d::default(),
        Projection::from(PerspectiveProjection {
            fov: std::f32::consts::FRAC_PI_2 * 0.8,
            near: 0.01,
            ..default()
        }),
        Exposure { ev100: 10.0 },
        Bloom::NATURAL,
        Transform::from_xyz(0.0, EYE_HEIGHT, 0.0),
    ));
}

fn mouse_look(
    mut motion: MessageReader<MouseMotion>,
    mut query: Query<(&mut Transform, &mut PlayerLook), With<Player>>,
    cursor: Query<&CursorOptions>,
) {
    let Ok(cursor) = cursor.single() else {
        return;
    };
    if cursor.grab_mode != CursorGrabMode::Locked {
        return;
    }

    let mut delta = Vec2::ZERO;
    for ev in motion.read() {
        delta += ev.delta;
    }
    if delta == Vec2::ZERO {
        return;
    }

    let Ok((mut transform, mut look)) = query.single_mut() else {
        return;
    };
    look.yaw -= delta.x * MOUSE_SENSITIVITY;
    look.pitch = (look.pitch - delta.y * MOUSE_SENSITIVITY).clamp(-MAX_PITCH, MAX_PITCH);
    transform.rotation = Quat::from_rotation_y(look.yaw) * Quat::from_rotation_x(look.pitch);
}

fn player_movement(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut query: Query<&mut Transform, With<Player>>,
    time: Res<Time>,
    noise: Res<GroundNoise>,
    current: Res<CurrentLevelId>,
) {
    let Ok(mut transform) = query.single_mut() else {
        return;
    };

    let forward = *transform.forward();
    let forward_xz = Vec3::new(forward.x, 0.0, forward.z).normalize_or_zero();
    let right = *transform.right();
    let right_xz = Vec3::new(right.x, 0.0, right.z).normalize_or_zero();

    let mut movement = Vec3::ZERO;
    if keyboard.pressed(KeyCode::KeyW) {
        movement += forward_xz;
    }
    if keyboard.pressed(KeyCode::KeyS) {
        movement -= forward_xz;
    }
    if keyboard.pressed(KeyCode::KeyD) {
        movement += right_xz;
    }
    if keyboard.pressed(KeyCode::KeyA) {
        movement -= right_xz;
    }

    let mut speed = MOVE_SPEED;
    if keyboard.pressed(KeyCode::ShiftLeft) {
        speed *= RUN_MULTIPLIER;
    }

    transform.translation += movement.normalize_or_zero() * speed * time.delta_secs();

    let bound = LEVEL_EXTENT - ROAM_MARGIN;
    transform.translation.x = transform.translation.x.clamp(-bound, bound);
    transform.translation.z = transform.translation.z.clamp(-bound, bound);

    // Follow the ground.
    let floor = ground_height(
        current.0,
        transform.translation.x,
        transform.translation.z,
        &noise,
    );
    transform.translation.y = floor + EYE_HEIGHT;
}

#[derive(Resource)]
struct FootstepClips {
    walk: Handle<AudioSource>,
    run: Handle<AudioSource>,
}

#[derive(Resource, Default)]
struct StepTimer(f32);

fn load_footstep_clips(mut commands: Commands, asset_server: Res<AssetServer>) {
    commands.insert_resource(FootstepClips {
        walk: asset_server.load(WALK_CLIP),
        run: asset_server.load(RUN_CLIP),
    });
}

/// Play a walk or run step on a cadence while the player is moving.
fn footsteps(
    mut commands: Commands,
    keyboard: Res<ButtonInput<KeyCode>>,
    clips: Res<FootstepClips>,
    mut timer: ResMut<StepTimer>,
    time: Res<Time>,
) {
    let moving = [KeyCode::KeyW, KeyCode::KeyS, KeyCode::KeyA, KeyCode::KeyD]
        .iter()
        .any(|key| keyboard.pressed(*key));
    if !moving {
        timer.0 = 0.0;
        return;
    }

    let running = keyboard.pressed(KeyCode::ShiftLeft);
    timer.0 -= time.delta_secs();
    if timer.0 > 0.0 {
        return;
    }

    let clip = if running {
        clips.run.clone()
    } else {
        clips.walk.clone()
    };
    commands.spawn((
        AudioPlayer::new(clip),
        PlaybackSettings::DESPAWN.with_volume(Volume::Linear(FOOTSTEP_VOLUME)),
    ));
    timer.0 = if running {
        RUN_STEP_INTERVAL
    } else {
        WALK_STEP_INTERVAL
    };
}
