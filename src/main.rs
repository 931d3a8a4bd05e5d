// Main
mod environment;
mod flashlight;
mod hud;
mod interact;
mod levels;
mod menu;
mod music;
mod pause;
mod player;
mod progression;

use bevy::prelude::*;
use environment::EnvironmentPlugin;
use flashlight::FlashlightPlugin;
use hud::HudPlugin;
use interact::InteractPlugin;
use levels::{LevelsPlugin, Screen};
use menu::MenuPlugin;
use music::MusicPlugin;
use pause::PausePlugin;
use player::PlayerPlugin;
use progression::ProgressionPlugin;

fn main() {
    App::new()
        .add_plugins(DefaultPlugins)
        .init_state::<Screen>()
        .add_plugins((
            LevelsPlugin,
            ProgressionPlugin,
            InteractPlugin,
            EnvironmentPlugin,
            PlayerPlugin,
            FlashlightPlugin,
            MusicPlugin,
            MenuPlugin,
            PausePlugin,
            HudPlugin,
        ))
        .run();
}
