// In-level HUD. Rebuilt from scratch on every transition, so each level owns
// fresh widget instances; other modules render into them by marker.
use bevy::prelude::*;

use crate::levels::{LevelCatalog, LevelLoaded, LevelScoped};

pub struct HudPlugin;

impl Plugin for HudPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, spawn_hud);
    }
}

/// Label showing the progress counter; written by the progression controller.
#[derive(Component)]
pub struct LevelLabel;

/// Fill strip of the battery bar; written by the flashlight module.
#[derive(Component)]
pub struct BatteryFill;

const BAR_WIDTH: f32 = 220.0;
const BAR_HEIGHT: f32 = 14.0;

fn spawn_hud(
    mut commands: Commands,
    mut loaded: MessageReader<LevelLoaded>,
    catalog: Res<LevelCatalog>,
) {
    let Some(&LevelLoaded(level)) = loaded.read().last() else {
        return;
    };
    if level == catalog.title {
        return;
    }

    commands
        .spawn((
            LevelScoped,
            Node {
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                flex_direction: FlexDirection::Column,
                justify_content: JustifyContent::SpaceBetween,
                padding: UiRect::all(Val::Px(16.0)),
                position_type: PositionType::Absolute,
                ..default()
            },
        ))
        .with_children(|parent| {
            parent.spawn((
                LevelLabel,
                Text::new(""),
                TextFont {
                    font_size: 24.0,
                    ..default()
                },
                TextColor(Color::srgba(1.0, 1.0, 1.0, 0.9)),
            ));

            // Battery bar: dim housing with a bright fill strip.
            parent
                .spawn((
                    Node {
                        width: Val::Px(BAR_WIDTH),
                        height: Val::Px(BAR_HEIGHT),
                        border: UiRect::all(Val::Px(2.0)),
                        ..default()
                    },
                    BorderColor::all(Color::srgba(1.0, 1.0, 1.0, 0.4)),
                    BackgroundColor(Color::srgba(0.0, 0.0, 0.0, 0.6)),
                ))
                .with_children(|bar| {
                    bar.spawn((
                        BatteryFill,
                        Node {
                            width: Val::Percent(100.0),
                            height: Val::Percent(100.0),
                            ..default()
                        },
                        BackgroundColor(Color::srgb(0.95, 0.9, 0.5)),
                    ));
                });
        });
}
