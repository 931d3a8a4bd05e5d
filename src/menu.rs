// Title screen
use bevy::prelude::*;

use crate::flashlight::Battery;
use crate::levels::{LevelCatalog, LoadLevel, Screen};

pub struct MenuPlugin;

impl Plugin for MenuPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(OnEnter(Screen::Title), setup_menu).add_systems(
            Update,
            (button_visuals, button_actions, start_shortcut, info_back)
                .run_if(in_state(Screen::Title)),
        );
    }
}

const NORMAL_BUTTON: Color = Color::srgb(0.15, 0.15, 0.15);
const HOVERED_BUTTON: Color = Color::srgb(0.25, 0.25, 0.25);
const PRESSED_BUTTON: Color = Color::srgb(0.35, 0.35, 0.35);

#[derive(Component)]
enum MenuButton {
    Play,
    Info,
    #[cfg(not(target_arch = "wasm32"))]
    Exit,
}

/// The main button column, hidden while the info panel is open.
#[derive(Component)]
struct MenuRoot;

#[derive(Component)]
struct InfoPanel;

#[derive(Component)]
struct InfoBackButton;

fn setup_menu(mut commands: Commands) {
    // Root container.
    commands
        .spawn((
            MenuRoot,
            Node {
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                flex_direction: FlexDirection::Column,
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                row_gap: Val::Px(24.0),
                ..default()
            },
            DespawnOnExit(Screen::Title),
        ))
        .with_children(|parent| {
            parent.spawn((
                Text::new("NIGHTWALK"),
                TextFont {
                    font_size: 64.0,
                    ..default()
                },
                TextColor(Color::WHITE),
                Node {
                    margin: UiRect::bottom(Val::Px(32.0)),
                    ..default()
                },
            ));

            spawn_button(parent, "Play", MenuButton::Play);

            spawn_button(parent, "Info", MenuButton::Info);

            // Exit button (native only).
            #[cfg(not(target_arch = "wasm32"))]
            spawn_button(parent, "Exit", MenuButton::Exit);
        });
}

fn spawn_button(parent: &mut ChildSpawnerCommands, label: &str, marker: MenuButton) {
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

fn button_visuals(
    mut query: Query<
        (&Interaction, &mut BackgroundColor, &mut BorderColor),
        (Changed<Interaction>, With<Button>),
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

fn button_actions(
    query: Query<(&Interaction, &MenuButton), Changed<Interaction>>,
    mut commands: Commands,
    mut battery: ResMut<Battery>,
    catalog: Res<LevelCatalog>,
    mut requests: MessageWriter<LoadLevel>,
    mut menu_root: Query<&mut Visibility, With<MenuRoot>>,
    #[cfg(not(target_arch = "wasm32"))] mut exit: MessageWriter<AppExit>,
) {
    for (interaction, button) in &query {
        if *interaction != Interaction::Pressed {
            continue;
        }
        match button {
            MenuButton::Play => {
                start_run(&mut battery, &catalog, &mut requests);
            }
            MenuButton::Info => {
                spawn_info_panel(&mut commands);
                if let Ok(mut visibility) = menu_root.single_mut() {
                    *visibility = Visibility::Hidden;
                }
            }
            #[cfg(not(target_arch = "wasm32"))]
            MenuButton::Exit => {
                exit.write(AppExit::Success);
            }
        }
    }
}

/// Enter starts the run as well, for keyboard-only navigation.
fn start_shortcut(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut battery: ResMut<Battery>,
    catalog: Res<LevelCatalog>,
    mut requests: MessageWriter<LoadLevel>,
) {
    if keyboard.just_pressed(KeyCode::Enter) {
        start_run(&mut battery, &catalog, &mut requests);
    }
}

/// A fresh run: full battery, first level.
fn start_run(battery: &mut Battery, catalog: &LevelCatalog, requests: &mut MessageWriter<LoadLevel>) {
    battery.reset();
    requests.write(LoadLevel(catalog.first));
}

fn spawn_info_panel(commands: &mut Commands) {
    commands
        .spawn((
            InfoPanel,
            DespawnOnExit(Screen::Title),
            Node {
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                flex_direction: FlexDirection::Column,
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                row_gap: Val::Px(16.0),
                position_type: PositionType::Absolute,
                ..default()
            },
            BackgroundColor(Color::srgba(0.0, 0.0, 0.0, 99.)),
            GlobalZIndex(200),
        ))
        .with_children(|parent| {
            parent.spawn((
                Text::new("How to play"),
                TextFont {
                    font_size: 36.0,
                    ..default()
                },
                TextColor(Color::WHITE),
            ));

            let lines = [
                "Walk the night with WASD, Shift to run",
                "",
                "F toggles the flashlight; it eats batteries",
                "E interacts: waymarkers move you on, shrines start over",
                "",
                "Every level is drawn once per run",
                "When none are left, the red gate is waiting",
            ];
            for line in lines {
                parent.spawn((
                    Text::new(line),
                    TextFont {
                        font_size: 20.0,
                        ..default()
                    },
                    TextColor(Color::srgba(0.8, 0.8, 0.8, 1.0)),
                ));
            }

            // Back button.
            parent
                .spawn((
                    InfoBackButton,
                    Button,
                    Node {
                        width: Val::Px(120.0),
                        height: Val::Px(40.0),
                        justify_content: JustifyContent::Center,
                        align_items: AlignItems::Center,
                        border: UiRect::all(Val::Px(2.0)),
                        margin: UiRect::top(Val::Px(24.0)),
                        ..default()
                    },
                    BorderColor::all(Color::srgba(1.0, 1.0, 1.0, 0.3)),
                    BackgroundColor(NORMAL_BUTTON),
                ))
                .with_children(|btn| {
                    btn.spawn((
                        Text::new("Back"),
                        TextFont {
                            font_size: 20.0,
                            ..default()
                        },
                        TextColor(Color::WHITE),
                    ));
                });
        });
}

fn info_back(
    mut commands: Commands,
    panel: Query<Entity, With<InfoPanel>>,
    buttons: Query<&Interaction, (Changed<Interaction>, With<InfoBackButton>)>,
    mut menu_root: Query<&mut Visibility, With<MenuRoot>>,
) {
    for interaction in &buttons {
        if *interaction == Interaction::Pressed {
            for entity in &panel {
                commands.entity(entity).despawn();
            }
            if let Ok(mut visibility) = menu_root.single_mut() {
                *visibility = Visibility::Inherited;
            }
        }
    }
}
