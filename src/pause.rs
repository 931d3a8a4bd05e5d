// Pause menu: Escape freezes virtual time and frees the cursor during
// gameplay.
use bevy::prelude::*;
use bevy::window::{CursorGrabMode, CursorOptions};

use crate::levels::{LevelCatalog, LoadLevel, Screen};

pub struct PausePlugin;

impl Plugin for PausePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<Paused>()
            .add_systems(
                Update,
                (toggle_pause, pause_button_visuals, pause_button_actions)
                    .run_if(in_state(Screen::Exploring)),
            )
            .add_systems(OnExit(Screen::Exploring), force_unpause);
    }
}

#[derive(Resource, Default)]
pub struct Paused(pub bool);

/// Run condition for everything that should stand still while paused.
pub fn unpaused(paused: Res<Paused>) -> bool {
    !paused.0
}

const NORMAL_BUTTON: Color = Color::srgb(0.15, 0.15, 0.15);
const HOVERED_BUTTON: Color = Color::srgb(0.25, 0.25, 0.25);
const PRESSED_BUTTON: Color = Color::srgb(0.35, 0.35, 0.35);

#[derive(Component)]
struct PauseOverlay;

#[derive(Component)]
enum PauseButton {
    Resume,
    Home,
    #[cfg(not(target_arch = "wasm32"))]
    Quit,
}

fn toggle_pause(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut commands: Commands,
    mut paused: ResMut<Paused>,
    mut time: ResMut<Time<Virtual>>,
    overlay: Query<Entity, With<PauseOverlay>>,
    mut cursor: Query<&mut CursorOptions>,
) {
    if !keyboard.just_pressed(KeyCode::Escape) {
        return;
    }

    if paused.0 {
        resume(
            &mut commands,
            &mut paused,
            &mut time,
            &overlay,
            &mut cursor,
        );
    } else {
        paused.0 = true;
        time.pause();
        spawn_pause_overlay(&mut commands);
        if let Ok(mut cursor) = cursor.single_mut() {
            cursor.grab_mode = CursorGrabMode::None;
            cursor.visible = true;
        }
    }
}

fn resume(
    commands: &mut Commands,
    paused: &mut Paused,
    time: &mut Time<Virtual>,
    overlay: &Query<Entity, With<PauseOverlay>>,
    cursor: &mut Query<&mut CursorOptions>,
) {
    paused.0 = false;
    time.unpause();
    for entity in overlay {
        commands.entity(entity).despawn();
    }
    if let Ok(mut cursor) = cursor.single_mut() {
        cursor.grab_mode = CursorGrabMode::Locked;
        cursor.visible = false;
    }
}

/// Leaving gameplay for any reason clears the pause state; the title screen
/// sets its own cursor policy.
fn force_unpause(
    mut commands: Commands,
    mut paused: ResMut<Paused>,
    mut time: ResMut<Time<Virtual>>,
    overlay: Query<Entity, With<PauseOverlay>>,
) {
    paused.0 = false;
    time.unpause();
    for entity in &overlay {
        commands.entity(entity).despawn();
    }
}

fn spawn_pause_overlay(commands: &mut Commands) {
    commands
        .spawn((
            PauseOverlay,
            Node {
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                flex_direction: FlexDirection::Column,
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                row_gap: Val::Px(24.0),
                position_type: PositionType::Absolute,
                ..default()
            },
            BackgroundColor(Color::srgba(0.0, 0.0, 0.0, 0.7)),
            GlobalZIndex(100),
        ))
        .with_children(|parent| {
            parent.spawn((
                Text::new("Paused"),
                TextFont {
                    font_size: 48.0,
                    ..default()
                },
                TextColor(Color::WHITE),
            ));

            spawn_pause_button(parent, "Resume", PauseButton::Resume);

            spawn_pause_button(parent, "Home", PauseButton::Home);

            #[cfg(not(target_arch = "wasm32"))]
            spawn_pause_button(parent, "Quit", PauseButton::Quit);
        });
}

fn spawn_pause_button(parent: &mut ChildSpawnerCommands, label: &str, marker: PauseButton) {
    parent
        .spawn((
            marker,
            Button,
            Node {
                width: Val::Px(200.0),
                height: Val::Px(50.0),
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                border: UiRect::all(Val::Px(2.0)),
                ..default()
            },
            BorderColor::all(Color::srgba(1.0, 1.0, 1.0, 0.3)),
            BackgroundColor(NORMAL_BUTTON),
        ))
        .with_children(|btn| {
            btn.spawn((
                Text::new(label),
                TextFont {
                    font_size: 24.0,
                    ..default()
                },
                TextColor(Color::WHITE),
            ));
        });
}

fn pause_button_visuals(
    mut query: Query<
        (&Interaction, &mut BackgroundColor, &mut BorderColor),
        (Changed<Interaction>, With<PauseButton>),
    >,
) {
    for (interaction, mut bg, mut border) in &mut query {
        match *interaction {
            Interaction::Pressed => {
                *bg = PRESSED_BUTTON.into();
                *border = BorderColor::all(Color::WHITE);
            }
            Interaction::Hovered => {
                *bg = HOVERED_BUTTON.into();
                *border = BorderColor::all(Color::WHITE);
            }
            Interaction::None => {
                *bg = NORMAL_BUTTON.into();
                *border = BorderColor::all(Color::srgba(1.0, 1.0, 1.0, 0.3));
            }
        }
    }
}

fn pause_button_actions(
    query: Query<(&Interaction, &PauseButton), Changed<Interaction>>,
    mut commands: Commands,
    mut paused: ResMut<Paused>,
    mut time: ResMut<Time<Virtual>>,
    overlay: Query<Entity, With<PauseOverlay>>,
    mut cursor: Query<&mut CursorOptions>,
    catalog: Res<LevelCatalog>,
    mut requests: MessageWriter<LoadLevel>,
    #[cfg(not(target_arch = "wasm32"))] mut exit: MessageWriter<AppExit>,
) {
    for (interaction, button) in &query {
        if *interaction != Interaction::Pressed {
            continue;
        }
        match button {
            PauseButton::Resume => {
                resume(
                    &mut commands,
                    &mut paused,
                    &mut time,
                    &overlay,
                    &mut cursor,
                );
            }
            PauseButton::Home => {
                // The OnExit cleanup handles the rest of the unpause.
                requests.write(LoadLevel(catalog.title));
            }
            #[cfg(not(target_arch = "wasm32"))]
            PauseButton::Quit => {
                exit.write(AppExit::Success);
            }
        }
    }
}
