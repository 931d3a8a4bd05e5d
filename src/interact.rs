// Player interaction: pressing E on an aimed prop fires a progression event.
use bevy::prelude::*;
use strum::Display;

use crate::levels::Screen;
use crate::pause::unpaused;
use crate::player::Player;

pub struct InteractPlugin;

impl Plugin for InteractPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<Interacted>().add_systems(
            Update,
            player_interact.run_if(in_state(Screen::Exploring).and(unpaused)),
        );
    }
}

/// Everything a prop can do when the player interacts with it. Closed set:
/// aiming at nothing is the only way an E press does nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum InteractionKind {
    /// Move on to a random unvisited level.
    Advance,
    /// Restart the run at the first level.
    Reset,
    /// Leave the finale for the title screen.
    FinaleReturn,
}

#[derive(Component)]
pub struct Interactable(pub InteractionKind);

#[derive(Message, Debug, Clone, Copy)]
pub struct Interacted {
    pub kind: InteractionKind,
}

/// Reach of an interaction, matching the flashlight's throw on nearby props.
const INTERACT_RANGE: f32 = 5.0;
/// Minimum view alignment (cosine) for a prop to count as aimed at.
const AIM_COS: f32 = 0.92;

/// View alignment of `target` from the camera, or `None` when it is out of
/// reach or outside the aim cone. In view space the camera looks down -Z.
fn aim_score(camera: &GlobalTransform, target: Vec3) -> Option<f32> {
    let in_view = camera.affine().inverse().transform_point3(target);
    let dist = in_view.length();
    if dist > INTERACT_RANGE || dist <= f32::EPSILON {
        return None;
    }
    let alignment = -in_view.z / dist;
    (alignment >= AIM_COS).then_some(alignment)
}

fn player_interact(
    keyboard: Res<ButtonInput<KeyCode>>,
    camera: Query<&GlobalTransform, With<Player>>,
    props: Query<(&GlobalTransform, &Interactable)>,
    mut interactions: MessageWriter<Interacted>,
) {
    if !keyboard.just_pressed(KeyCode::KeyE) {
        return;
    }
    let Ok(camera) = camera.single() else {
        return;
    };

    // Several props can sit inside the cone; take the best-aligned one.
    let mut best: Option<(f32, InteractionKind)> = None;
    for (prop, interactable) in &props {
        if let Some(score) = aim_score(camera, prop.translation()) {
            if best.is_none_or(|(top, _)| score > top) {
                best = Some((score, interactable.0));
            }
        }
    }

    if let Some((_, kind)) = best {
        info!("player interacted with {kind}");
        interactions.write(Interacted { kind });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera_at_origin() -> GlobalTransform {
        // Default orientation: looking down -Z from eye height.
        GlobalTransform::from(Transform::from_xyz(0.0, 1.5, 0.0))
    }

    #[test]
    fn prop_straight_ahead_is_aimed_at() {
        let camera = camera_at_origin();
        assert!(aim_score(&camera, Vec3::new(0.0, 1.5, -3.0)).is_some());
    }

    #[test]
    fn prop_beyond_reach_is_ignored() {
        let camera = camera_at_origin();
        assert!(aim_score(&camera, Vec3::new(0.0, 1.5, -8.0)).is_none());
    }

    #[test]
    fn prop_behind_the_camera_is_ignored() {
        let camera = camera_at_origin();
        assert!(aim_score(&camera, Vec3::new(0.0, 1.5, 3.0)).is_none());
    }

    #[test]
    fn prop_far_off_axis_is_ignored() {
        let camera = camera_at_origin();
        assert!(aim_score(&camera, Vec3::new(3.0, 1.5, -3.0)).is_none());
    }

    #[test]
    fn centered_prop_outscores_a_grazing_one() {
        let camera = camera_at_origin();
        let centered = aim_score(&camera, Vec3::new(0.0, 1.5, -4.0)).unwrap();
        let grazing = aim_score(&camera, Vec3::new(0.9, 1.5, -3.0)).unwrap();
        assert!(centered > grazing);
    }

    #[test]
    fn aim_rotates_with_the_camera() {
        // Facing +X after a -90 degree yaw.
        let camera = GlobalTransform::from(
            Transform::from_xyz(0.0, 1.5, 0.0)
                .with_rotation(Quat::from_rotation_y(-std::f32::consts::FRAC_PI_2)),
        );
        assert!(aim_score(&camera, Vec3::new(3.0, 1.5, 0.0)).is_some());
        assert!(aim_score(&camera, Vec3::new(0.0, 1.5, -3.0)).is_none());
    }
}
