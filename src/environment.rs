// Per-level world dressing: ground mesh, scattered props, trigger objects,
// and battery pickups.
use bevy::asset::RenderAssetUsages;
use bevy::mesh::{Indices, PrimitiveTopology};
use bevy::prelude::*;
use fast_poisson::Poisson2D;
use noiz::prelude::{common_noise::*, *};
use strum::{EnumIter, IntoEnumIterator};

use crate::flashlight::BatteryPickup;
use crate::interact::{Interactable, InteractionKind};
use crate::levels::{LevelCatalog, LevelId, LevelLoaded, LevelScoped};
use crate::player::{EYE_HEIGHT, Player, PlayerLook};

pub struct EnvironmentPlugin;

impl Plugin for EnvironmentPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<GroundNoise>()
            .add_systems(Startup, setup_scatter_points)
            .add_systems(Update, populate_level);
    }
}

/// Half-size of the walkable square.
pub const LEVEL_EXTENT: f32 = 60.0;
const GROUND_AMPLITUDE: f32 = 1.2;
const GROUND_NOISE_SCALE: f32 = 0.04;
const MESH_STEP: f32 = 1.0;
/// Offset into noise space per level so each level gets its own ground.
const LEVEL_NOISE_STRIDE: f32 = 97.0;

/// Keep scenery out of the player spawn and the trigger props.
const PROP_CLEARANCE: f32 = 4.0;

const TRIGGER_RADIUS: f32 = 20.0;
const SHRINE_RADIUS: f32 = 26.0;
const BATTERY_RADIUS: f32 = 14.0;
const BATTERY_COUNT: usize = 3;

#[derive(Resource)]
pub struct GroundNoise(pub Noise<Fbm<Perlin>>);

impl Default for GroundNoise {
    fn default() -> GroundNoise {
        let mut noise: Noise<Fbm<Perlin>> = Noise::<Fbm<Perlin>>::default();
        noise.set_seed(42);
        noise.set_frequency(2.0);
        GroundNoise(noise)
    }
}

/// Pre-generated blue noise point set for prop placement, shared by every
/// level and re-skinned per level with a positional hash.
#[derive(Resource)]
struct ScatterPoints(Vec<[f32; 2]>);

fn setup_scatter_points(mut commands: Commands) {
    let points: Vec<[f32; 2]> = Poisson2D::new()
        .with_dimensions([1.0, 1.0], 0.06)
        .with_seed(42)
        .generate();
    commands.insert_resource(ScatterPoints(points));
}

/// Ground height at a world position for the given level.
pub fn ground_height(level: LevelId, wx: f32, wz: f32, noise: &GroundNoise) -> f32 {
    let offset = level.0 as f32 * LEVEL_NOISE_STRIDE;
    let p = Vec3::new(
        (wx + offset) * GROUND_NOISE_SCALE,
        0.0,
        (wz + offset) * GROUND_NOISE_SCALE,
    );
    noise.0.sample_for::<f32>(p) * GROUND_AMPLITUDE
}

fn generate_ground_mesh(level: LevelId, noise: &GroundNoise) -> Mesh {
    let size = LEVEL_EXTENT * 2.0;
    let res = (size / MESH_STEP) as usize + 1;

    let mut positions = Vec::with_capacity(res * res);
    let mut normals = Vec::with_capacity(res * res);
    let mut indices = Vec::new();

    for zi in 0..res {
        for xi in 0..res {
            let wx = xi as f32 * MESH_STEP - LEVEL_EXTENT;
            let wz = zi as f32 * MESH_STEP - LEVEL_EXTENT;
            positions.push([wx, ground_height(level, wx, wz, noise), wz]);

            // Central-difference normals.
            let eps = MESH_STEP * 0.5;
            let normal = Vec3::new(
                ground_height(level, wx - eps, wz, noise)
                    - ground_height(level, wx + eps, wz, noise),
                2.0 * eps,
                ground_height(level, wx, wz - eps, noise)
                    - ground_height(level, wx, wz + eps, noise),
            )
            .normalize();
            normals.push(normal.to_array());
        }
    }

    for zi in 0..(res - 1) {
        for xi in 0..(res - 1) {
            let i = (zi * res + xi) as u32;
            let w = res as u32;
            indices.push(i);
            indices.push(i + 1);
            indices.push(i + w);
            indices.push(i + 1);
            indices.push(i + w + 1);
            indices.push(i + w);
        }
    }

    let mut mesh = Mesh::new(
        PrimitiveTopology::TriangleList,
        RenderAssetUsages::default(),
    );
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
    mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals);
    mesh.insert_indices(Indices::U32(indices));
    mesh
}

/// Ground and sky tones, cycled by level index; the finale is always lit in
/// crimson no matter where the cycle lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
enum LevelPalette {
    Moss,
    Ash,
    Clay,
    Slate,
    Crimson,
}

impl LevelPalette {
    fn for_level(level: LevelId, catalog: &LevelCatalog) -> Self {
        if level == catalog.finale {
            return LevelPalette::Crimson;
        }
        // Cycle the non-finale palettes.
        let cycle: Vec<LevelPalette> = LevelPalette::iter()
            .filter(|palette| *palette != LevelPalette::Crimson)
            .collect();
        cycle[level.0 % cycle.len()]
    }

    fn ground(self) -> Color {
        match self {
            LevelPalette::Moss => Color::srgb(0.16, 0.22, 0.14),
            LevelPalette::Ash => Color::srgb(0.2, 0.2, 0.21),
            LevelPalette::Clay => Color::srgb(0.24, 0.18, 0.13),
            LevelPalette::Slate => Color::srgb(0.14, 0.16, 0.2),
            LevelPalette::Crimson => Color::srgb(0.2, 0.08, 0.07),
        }
    }

    fn ambient(self) -> Color {
        match self {
            LevelPalette::Moss => Color::srgb(0.35, 0.45, 0.4),
            LevelPalette::Ash => Color::srgb(0.4, 0.4, 0.45),
            LevelPalette::Clay => Color::srgb(0.45, 0.38, 0.3),
            LevelPalette::Slate => Color::srgb(0.3, 0.35, 0.5),
            LevelPalette::Crimson => Color::srgb(0.55, 0.2, 0.15),
        }
    }
}

/// Deterministic position on a ring around the level center.
fn ring_pos(level: LevelId, salt: f32, radius: f32) -> Vec2 {
    let t = hash_vec3(Vec3::new(level.0 as f32, salt, 17.0));
    let angle = t * std::f32::consts::TAU;
    Vec2::new(angle.cos(), angle.sin()) * radius
}

/// GPU-style hash producing a uniform value in [0, 1) from a 3D point.
fn hash_vec3(p: Vec3) -> f32 {
    p.dot(Vec3::new(127.1, 311.7, 74.7))
        .sin()
        .mul_add(43758.545, 0.0)
        .fract()
        .abs()
}

/// Build the world for a freshly loaded gameplay level and move the player to
/// its spawn point. The title screen has no world; the menu covers it.
fn populate_level(
    mut commands: Commands,
    mut loaded: MessageReader<LevelLoaded>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    catalog: Res<LevelCatalog>,
    noise: Res<GroundNoise>,
    scatter: Res<ScatterPoints>,
    mut player: Query<(&mut Transform, &mut PlayerLook), With<Player>>,
) {
    let Some(&LevelLoaded(level)) = loaded.read().last() else {
        return;
    };
    if level == catalog.title {
        return;
    }

    let palette = LevelPalette::for_level(level, &catalog);
    commands.insert_resource(GlobalAmbientLight {
        color: palette.ambient(),
        brightness: 2.5,
        affects_lightmapped_meshes: false,
    });

    // Dim moonlight; the flashlight does the real work.
    commands.spawn((
        DirectionalLight {
            illuminance: 400.0,
            color: Color::srgb(0.7, 0.75, 0.9),
            ..default()
        },
        Transform::from_rotation(Quat::from_euler(EulerRot::XYZ, -1.0, 0.5, 0.0)),
        LevelScoped,
    ));

    // Ground.
    commands.spawn((
        Mesh3d(meshes.add(generate_ground_mesh(level, &noise))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: palette.ground(),
            perceptual_roughness: 0.95,
            ..default()
        })),
        LevelScoped,
    ));

    // Spawn the player at the near edge, facing the level center.
    let spawn_z = LEVEL_EXTENT * 0.5;
    if let Ok((mut transform, mut look)) = player.single_mut() {
        look.yaw = 0.0;
        look.pitch = 0.0;
        let floor = ground_height(level, 0.0, spawn_z, &noise);
        transform.translation = Vec3::new(0.0, floor + EYE_HEIGHT, spawn_z);
        transform.rotation = Quat::IDENTITY;
    }

    let mut reserved = vec![Vec2::new(0.0, spawn_z)];

    if level == catalog.finale {
        spawn_finale_gate(
            &mut commands,
            &mut meshes,
            &mut materials,
            level,
            &noise,
            &mut reserved,
        );
    } else {
        spawn_advance_trigger(
            &mut commands,
            &mut meshes,
            &mut materials,
            level,
            &noise,
            &mut reserved,
        );
        spawn_batteries(
            &mut commands,
            &mut meshes,
            &mut materials,
            level,
            &noise,
            &mut reserved,
        );
    }
    spawn_reset_shrine(
        &mut commands,
        &mut meshes,
        &mut materials,
        level,
        &noise,
        &mut reserved,
    );

    spawn_props(
        &mut commands,
        &mut meshes,
        &mut materials,
        level,
        &noise,
        &scatter,
        &reserved,
    );
}

fn spawn_advance_trigger(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    level: LevelId,
    noise: &GroundNoise,
    reserved: &mut Vec<Vec2>,
) {
    let pos = ring_pos(level, 3.0, TRIGGER_RADIUS);
    reserved.push(pos);
    let floor = ground_height(level, pos.x, pos.y, noise);

    commands
        .spawn((
            Interactable(InteractionKind::Advance),
            Mesh3d(meshes.add(Cuboid::new(0.6, 2.2, 0.6))),
            MeshMaterial3d(materials.add(StandardMaterial {
                base_color: Color::srgb(0.9, 0.8, 0.5),
                emissive: LinearRgba::new(2.0, 1.5, 0.6, 1.0),
                ..default()
            })),
            Transform::from_xyz(pos.x, floor + 1.1, pos.y),
            LevelScoped,
        ))
        .with_children(|parent| {
            parent.spawn((
                PointLight {
                    color: Color::srgb(1.0, 0.85, 0.5),
                    intensity: 40_000.0,
                    range: 25.0,
                    ..default()
                },
                Transform::from_xyz(0.0, 1.6, 0.0),
            ));
        });
}

fn spawn_reset_shrine(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    level: LevelId,
    noise: &GroundNoise,
    reserved: &mut Vec<Vec2>,
) {
    let pos = ring_pos(level, 7.0, SHRINE_RADIUS);
    reserved.push(pos);
    let floor = ground_height(level, pos.x, pos.y, noise);

    commands.spawn((
        Interactable(InteractionKind::Reset),
        Mesh3d(meshes.add(Cuboid::new(1.2, 0.8, 1.2))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb(0.5, 0.7, 0.9),
            emissive: LinearRgba::new(0.4, 0.9, 1.6, 1.0),
            ..default()
        })),
        Transform::from_xyz(pos.x, floor + 0.4, pos.y),
        LevelScoped,
    ));
}

fn spawn_finale_gate(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    level: LevelId,
    noise: &GroundNoise,
    reserved: &mut Vec<Vec2>,
) {
    let pos = Vec2::new(0.0, -LEVEL_EXTENT * 0.25);
    reserved.push(pos);
    let floor = ground_height(level, pos.x, pos.y, noise);

    commands
        .spawn((
            Interactable(InteractionKind::FinaleReturn),
            Mesh3d(meshes.add(Cuboid::new(3.0, 4.0, 0.5))),
            MeshMaterial3d(materials.add(StandardMaterial {
                base_color: Color::srgb(0.3, 0.05, 0.05),
                emissive: LinearRgba::new(2.5, 0.3, 0.2, 1.0),
                ..default()
            })),
            Transform::from_xyz(pos.x, floor + 2.0, pos.y),
            LevelScoped,
        ))
        .with_children(|parent| {
            parent.spawn((
                PointLight {
                    color: Color::srgb(1.0, 0.3, 0.2),
                    intensity: 80_000.0,
                    range: 40.0,
                    ..default()
                },
                Transform::from_xyz(0.0, 2.5, 0.0),
            ));
        });
}

fn spawn_batteries(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    level: LevelId,
    noise: &GroundNoise,
    reserved: &mut Vec<Vec2>,
) {
    let mesh = meshes.add(Cuboid::new(0.25, 0.4, 0.25));
    let material = materials.add(StandardMaterial {
        base_color: Color::srgb(0.4, 0.9, 0.4),
        emissive: LinearRgba::new(0.3, 1.4, 0.3, 1.0),
        ..default()
    });

    for slot in 0..BATTERY_COUNT {
        let radius = BATTERY_RADIUS + slot as f32 * 9.0;
        let pos = ring_pos(level, 11.0 + slot as f32, radius);
        reserved.push(pos);
        let floor = ground_height(level, pos.x, pos.y, noise);

        commands.spawn((
            BatteryPickup,
            Mesh3d(mesh.clone()),
            MeshMaterial3d(material.clone()),
            Transform::from_xyz(pos.x, floor + 0.2, pos.y),
            LevelScoped,
        ));
    }
}

fn spawn_props(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    level: LevelId,
    noise: &GroundNoise,
    scatter: &ScatterPoints,
    reserved: &[Vec2],
) {
    let trunk = meshes.add(Cuboid::new(0.5, 6.0, 0.5));
    let rock = meshes.add(Cuboid::new(1.0, 0.7, 1.0));
    let trunk_material = materials.add(StandardMaterial {
        base_color: Color::srgb(0.1, 0.09, 0.08),
        perceptual_roughness: 1.0,
        ..default()
    });
    let rock_material = materials.add(StandardMaterial {
        base_color: Color::srgb(0.25, 0.25, 0.27),
        perceptual_roughness: 0.95,
        ..default()
    });

    let size = LEVEL_EXTENT * 2.0;
    for point in &scatter.0 {
        let wx = point[0] * size - LEVEL_EXTENT;
        let wz = point[1] * size - LEVEL_EXTENT;
        let at = Vec2::new(wx, wz);
        if reserved
            .iter()
            .any(|spot| spot.distance(at) < PROP_CLEARANCE)
        {
            continue;
        }

        // Re-skin the shared point set per level.
        let t = hash_vec3(Vec3::new(wx, level.0 as f32 * 31.7, wz));
        let (mesh, material, half_height) = if t > 0.88 {
            (trunk.clone(), trunk_material.clone(), 3.0)
        } else if t > 0.82 {
            (rock.clone(), rock_material.clone(), 0.35)
        } else {
            continue;
        };

        let floor = ground_height(level, wx, wz, noise);
        let spin = hash_vec3(Vec3::new(wz, wx, level.0 as f32)) * std::f32::consts::TAU;
        commands.spawn((
            Mesh3d(mesh),
            MeshMaterial3d(material),
            Transform::from_xyz(wx, floor + half_height, wz)
                .with_rotation(Quat::from_rotation_y(spin)),
            LevelScoped,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ground_height_is_deterministic_per_level() {
        let noise = GroundNoise::default();
        let a = ground_height(LevelId(3), 10.0, -4.0, &noise);
        let b = ground_height(LevelId(3), 10.0, -4.0, &noise);
        assert_eq!(a, b);
    }

    #[test]
    fn each_level_gets_its_own_ground() {
        let noise = GroundNoise::default();
        let here = ground_height(LevelId(2), 10.0, -4.0, &noise);
        let there = ground_height(LevelId(5), 10.0, -4.0, &noise);
        assert_ne!(here, there);
    }

    #[test]
    fn ring_positions_sit_on_their_ring() {
        let pos = ring_pos(LevelId(4), 3.0, TRIGGER_RADIUS);
        assert!((pos.length() - TRIGGER_RADIUS).abs() < 1e-3);
    }

    #[test]
    fn finale_is_always_crimson() {
        let catalog = LevelCatalog::default();
        assert_eq!(
            LevelPalette::for_level(catalog.finale, &catalog),
            LevelPalette::Crimson
        );
    }
}
