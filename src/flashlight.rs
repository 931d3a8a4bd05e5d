// Flashlight and battery: a head-mounted beam that eats charge while lit,
// refilled from pickups scattered around the levels.
use bevy::prelude::*;

use crate::hud::BatteryFill;
use crate::levels::{LevelLoaded, Screen};
use crate::pause::unpaused;
use crate::player::Player;

pub struct FlashlightPlugin;

impl Plugin for FlashlightPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<Battery>()
            .add_systems(Startup, spawn_beam.after(crate::player::spawn_player))
            .add_systems(
                Update,
                (toggle_beam, drain_battery, collect_batteries)
                    .run_if(in_state(Screen::Exploring).and(unpaused)),
            )
            .add_systems(
                Update,
                (douse_on_transition, sync_beam, refresh_battery_bar).chain(),
            );
    }
}

pub const MAX_CHARGE: f32 = 100.0;
/// Seconds of light per unit of charge.
const DRAIN_SECS: f32 = 1.0;
const REFILL: f32 = 25.0;
const PICKUP_RANGE: f32 = 2.0;

/// Flashlight charge. Survives level transitions; a new run resets it.
#[derive(Resource, Debug)]
pub struct Battery {
    charge: f32,
    lit: bool,
    drain_timer: f32,
}

impl Default for Battery {
    fn default() -> Self {
        Self {
            charge: MAX_CHARGE,
            lit: false,
            drain_timer: 0.0,
        }
    }
}

impl Battery {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn charge(&self) -> f32 {
        self.charge
    }

    pub fn is_lit(&self) -> bool {
        self.lit
    }

    /// Toggle the beam. An empty battery cannot light it.
    fn toggle(&mut self) {
        self.lit = !self.lit && self.charge > 0.0;
    }

    /// Advance the drain clock: one unit of charge per DRAIN_SECS while lit.
    /// The beam dies with the charge.
    fn tick(&mut self, dt: f32) {
        if !self.lit {
            return;
        }
        self.drain_timer += dt;
        if self.drain_timer < DRAIN_SECS {
            return;
        }
        self.drain_timer = 0.0;
        self.charge = (self.charge - 1.0).max(0.0);
        if self.charge <= 0.0 {
            self.lit = false;
        }
    }

    fn refill(&mut self) {
        self.charge = (self.charge + REFILL).min(MAX_CHARGE);
    }
}

/// A consumable battery sitting in the world.
#[derive(Component)]
pub struct BatteryPickup;

#[derive(Component)]
struct Beam;

fn spawn_beam(mut commands: Commands, player: Query<Entity, With<Player>>) {
    let Ok(player) = player.single() else {
        return;
    };
    commands.entity(player).with_children(|parent| {
        parent.spawn((
            Beam,
            SpotLight {
                color: Color::srgb(1.0, 0.95, 0.8),
                intensity: 600_000.0,
                range: 45.0,
                inner_angle: 0.35,
                outer_angle: 0.55,
                shadows_enabled: true,
                ..default()
            },
            Transform::from_xyz(0.0, -0.15, 0.0),
            Visibility::Hidden,
        ));
    });
}

fn toggle_beam(keyboard: Res<ButtonInput<KeyCode>>, mut battery: ResMut<Battery>) {
    if keyboard.just_pressed(KeyCode::KeyF) {
        battery.toggle();
    }
}

fn drain_battery(time: Res<Time>, mut battery: ResMut<Battery>) {
    if battery.is_lit() {
        battery.tick(time.delta_secs());
    }
}

/// Keep the light entity in step with the battery state.
fn sync_beam(battery: Res<Battery>, mut beam: Query<&mut Visibility, With<Beam>>) {
    if !battery.is_changed() {
        return;
    }
    let Ok(mut visibility) = beam.single_mut() else {
        return;
    };
    *visibility = if battery.is_lit() {
        Visibility::Inherited
    } else {
        Visibility::Hidden
    };
}

/// Every level starts with the beam off; charge carries over, lit state
/// does not.
fn douse_on_transition(mut loaded: MessageReader<LevelLoaded>, mut battery: ResMut<Battery>) {
    if loaded.read().last().is_none() {
        return;
    }
    if battery.is_lit() {
        battery.lit = false;
    }
}

/// E next to a battery pickup consumes it. One per press.
fn collect_batteries(
    mut commands: Commands,
    keyboard: Res<ButtonInput<KeyCode>>,
    mut battery: ResMut<Battery>,
    player: Query<&GlobalTransform, With<Player>>,
    pickups: Query<(Entity, &GlobalTransform), With<BatteryPickup>>,
) {
    if !keyboard.just_pressed(KeyCode::KeyE) {
        return;
    }
    let Ok(player) = player.single() else {
        return;
    };
    let at = player.translation();

    for (entity, pickup) in &pickups {
        if pickup.translation().distance(at) <= PICKUP_RANGE {
            battery.refill();
            commands.entity(entity).despawn();
            break;
        }
    }
}

/// Mirror the charge into whichever battery bar the current level owns.
/// The bar is rebuilt with the HUD each transition; none at all is fine.
fn refresh_battery_bar(
    battery: Res<Battery>,
    spawned: Query<(), Added<BatteryFill>>,
    mut bars: Query<&mut Node, With<BatteryFill>>,
) {
    if !battery.is_changed() && spawned.is_empty() {
        return;
    }
    for mut node in &mut bars {
        node.width = Val::Percent(battery.charge() / MAX_CHARGE * 100.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_one_unit_per_interval_while_lit() {
        let mut battery = Battery::default();
        battery.toggle();

        battery.tick(0.5);
        assert_eq!(battery.charge(), MAX_CHARGE);
        battery.tick(0.5);
        assert_eq!(battery.charge(), MAX_CHARGE - 1.0);
    }

    #[test]
    fn unlit_battery_does_not_drain() {
        let mut battery = Battery::default();
        battery.tick(10.0);
        assert_eq!(battery.charge(), MAX_CHARGE);
    }

    #[test]
    fn beam_dies_when_the_charge_runs_out() {
        let mut battery = Battery {
            charge: 1.0,
            lit: true,
            drain_timer: 0.0,
        };
        battery.tick(DRAIN_SECS);
        assert_eq!(battery.charge(), 0.0);
        assert!(!battery.is_lit());
    }

    #[test]
    fn empty_battery_cannot_light_the_beam() {
        let mut battery = Battery {
            charge: 0.0,
            lit: false,
            drain_timer: 0.0,
        };
        battery.toggle();
        assert!(!battery.is_lit());
    }

    #[test]
    fn refill_is_clamped_to_capacity() {
        let mut battery = Battery {
            charge: MAX_CHARGE - 10.0,
            lit: false,
            drain_timer: 0.0,
        };
        battery.refill();
        assert_eq!(battery.charge(), MAX_CHARGE);
    }

    #[test]
    fn reset_restores_a_fresh_battery() {
        let mut battery = Battery {
            charge: 3.0,
            lit: true,
            drain_timer: 0.7,
        };
        battery.reset();
        assert_eq!(battery.charge(), MAX_CHARGE);
        assert!(!battery.is_lit());
    }
}
