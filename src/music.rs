// Background music: one looping track for the title screen, another for
// every gameplay level.
use bevy::audio::Volume;
use bevy::prelude::*;

use crate::levels::{CurrentLevelId, LevelCatalog};

pub struct MusicPlugin;

impl Plugin for MusicPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_music)
            .add_systems(Update, switch_track);
    }
}

const TITLE_CLIP: &str = "audio/title_theme.ogg";
const GAMEPLAY_CLIP: &str = "audio/night_ambience.ogg";
const TITLE_VOLUME: f32 = 0.5;
const GAMEPLAY_VOLUME: f32 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Track {
    Title,
    Gameplay,
}

#[derive(Resource)]
struct MusicDirector {
    title: Handle<AudioSource>,
    gameplay: Handle<AudioSource>,
    playing: Option<Track>,
}

#[derive(Component)]
struct Music;

fn setup_music(
    mut commands: Commands,
    existing: Option<Res<MusicDirector>>,
    asset_server: Res<AssetServer>,
) {
    // First director stays authoritative.
    if existing.is_some() {
        return;
    }
    commands.insert_resource(MusicDirector {
        title: asset_server.load(TITLE_CLIP),
        gameplay: asset_server.load(GAMEPLAY_CLIP),
        playing: None,
    });
}

/// Start or swap the looping track when the kind of level changes. Moving
/// between gameplay levels keeps the current track running.
fn switch_track(
    mut commands: Commands,
    catalog: Res<LevelCatalog>,
    current: Res<CurrentLevelId>,
    mut director: ResMut<MusicDirector>,
    playing: Query<Entity, With<Music>>,
) {
    let desired = if current.0 == catalog.title {
        Track::Title
    } else {
        Track::Gameplay
    };
    if director.playing == Some(desired) {
        return;
    }

    for entity in &playing {
        commands.entity(entity).despawn();
    }

    let (clip, volume) = match desired {
        Track::Title => (director.title.clone(), TITLE_VOLUME),
        Track::Gameplay => (director.gameplay.clone(), GAMEPLAY_VOLUME),
    };
    commands.spawn((
        Music,
        AudioPlayer::new(clip),
        PlaybackSettings::LOOP.with_volume(Volume::Linear(volume)),
    ));
    director.playing = Some(desired);
}
