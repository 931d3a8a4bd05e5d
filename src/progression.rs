/// Session progression: tracks which levels this playthrough has visited,
/// picks the next unvisited one at random, and routes to the finale once the
/// pool runs dry.
use std::collections::HashSet;

use bevy::prelude::*;
use bevy::window::{CursorGrabMode, CursorOptions};
use rand::Rng;

use crate::hud::LevelLabel;
use crate::interact::{Interacted, InteractionKind};
use crate::levels::{LevelCatalog, LevelId, LevelLoaded, LoadLevel};

pub struct ProgressionPlugin;

impl Plugin for ProgressionPlugin {
    fn build(&self, app: &mut App) {
        // The session outlives every level transition. If one is already
        // present it stays authoritative and is not touched here.
        if !app.world().contains_resource::<Session>() {
            app.init_resource::<Session>();
        }
        app.add_systems(
            Update,
            (handle_interactions, apply_cursor_policy, refresh_level_label),
        );
    }
}

/// Process-wide playthrough state. Created once, torn down at exit; resets
/// clear it in place rather than replacing the resource.
#[derive(Resource, Debug)]
pub struct Session {
    visited: HashSet<LevelId>,
    current_level: u32,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            visited: HashSet::new(),
            current_level: 1,
        }
    }
}

impl Session {
    pub fn current_level(&self) -> u32 {
        self.current_level
    }

    pub fn visited(&self) -> &HashSet<LevelId> {
        &self.visited
    }

    /// Pick the next destination: an unvisited pool level chosen uniformly at
    /// random, or the finale once every pool level has been seen. The finale
    /// never enters the visited set, so it is returned again on every
    /// subsequent call until a reset.
    pub fn advance(&mut self, catalog: &LevelCatalog, rng: &mut impl Rng) -> LevelId {
        let pool: Vec<LevelId> = (catalog.pool_min.0..=catalog.pool_max.0)
            .map(LevelId)
            .filter(|level| !self.visited.contains(level))
            .collect();

        if pool.is_empty() {
            // The finale always displays the top of the counter.
            self.current_level = catalog.max_display;
            return catalog.finale;
        }

        let next = pool[rng.random_range(0..pool.len())];
        self.visited.insert(next);
        self.current_level = (self.current_level + 1).min(catalog.max_display);
        next
    }

    /// Restart the playthrough and jump straight to the first level,
    /// bypassing the random pool.
    pub fn reset(&mut self, catalog: &LevelCatalog) -> LevelId {
        self.visited.clear();
        self.current_level = 1;
        catalog.first
    }

    /// Leave the finale for the title screen. The whole session restarts,
    /// counter included.
    pub fn finale_return(&mut self, catalog: &LevelCatalog) -> LevelId {
        self.visited.clear();
        self.current_level = 1;
        catalog.title
    }
}

/// Map player interactions onto session operations and request the resulting
/// transition.
fn handle_interactions(
    mut interactions: MessageReader<Interacted>,
    mut session: ResMut<Session>,
    catalog: Res<LevelCatalog>,
    mut requests: MessageWriter<LoadLevel>,
) {
    for interacted in interactions.read() {
        let target = match interacted.kind {
            InteractionKind::Advance => session.advance(&catalog, &mut rand::rng()),
            InteractionKind::Reset => session.reset(&catalog),
            InteractionKind::FinaleReturn => session.finale_return(&catalog),
        };
        requests.write(LoadLevel(target));
    }
}

/// On every completed transition, point the cursor policy at the new level:
/// free on the title screen, grabbed everywhere else.
fn apply_cursor_policy(
    mut completed: MessageReader<LevelLoaded>,
    catalog: Res<LevelCatalog>,
    mut cursor: Query<&mut CursorOptions>,
) {
    let Some(&LevelLoaded(level)) = completed.read().last() else {
        return;
    };
    let Ok(mut cursor) = cursor.single_mut() else {
        return;
    };

    if level == catalog.title {
        cursor.grab_mode = CursorGrabMode::None;
        cursor.visible = true;
    } else {
        cursor.grab_mode = CursorGrabMode::Locked;
        cursor.visible = false;
    }
}

/// Render the progress counter into whichever label the current level owns.
/// Labels are rebuilt with the rest of the HUD on every transition, so the
/// query is re-resolved each time; no label at all is fine.
fn refresh_level_label(
    session: Res<Session>,
    spawned: Query<(), Added<LevelLabel>>,
    mut labels: Query<&mut Text, With<LevelLabel>>,
) {
    if !session.is_changed() && spawned.is_empty() {
        return;
    }
    for mut text in &mut labels {
        text.0 = format!("Level {}", session.current_level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn catalog() -> LevelCatalog {
        LevelCatalog::default()
    }

    #[test]
    fn advance_never_repeats_a_level_before_reset() {
        let catalog = catalog();
        let mut session = Session::default();
        let mut rng = StdRng::seed_from_u64(7);
        let mut seen = HashSet::new();

        for _ in 0..catalog.pool_len() {
            let picked = session.advance(&catalog, &mut rng);
            assert!(picked >= catalog.pool_min && picked <= catalog.pool_max);
            assert!(seen.insert(picked), "level {} offered twice", picked.0);
        }
    }

    #[test]
    fn exhausted_pool_always_yields_the_finale() {
        let catalog = catalog();
        let mut session = Session::default();
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..catalog.pool_len() {
            session.advance(&catalog, &mut rng);
        }
        let visited_at_exhaustion = session.visited().clone();

        for _ in 0..5 {
            assert_eq!(session.advance(&catalog, &mut rng), catalog.finale);
        }
        assert_eq!(*session.visited(), visited_at_exhaustion);
    }

    #[test]
    fn counter_never_exceeds_the_display_cap() {
        let catalog = catalog();
        let mut session = Session::default();
        let mut rng = StdRng::seed_from_u64(13);

        for _ in 0..(catalog.pool_len() + 6) {
            session.advance(&catalog, &mut rng);
            assert!(session.current_level() <= catalog.max_display);
        }
        assert_eq!(session.current_level(), catalog.max_display);
    }

    #[test]
    fn reset_on_a_fresh_session_changes_nothing_but_still_targets_level_one() {
        let catalog = catalog();
        let mut session = Session::default();

        let target = session.reset(&catalog);

        assert_eq!(target, catalog.first);
        assert!(session.visited().is_empty());
        assert_eq!(session.current_level(), 1);
    }

    #[test]
    fn finale_return_restarts_the_session_at_the_title() {
        let catalog = catalog();
        let mut session = Session::default();
        let mut rng = StdRng::seed_from_u64(17);

        for _ in 0..3 {
            session.advance(&catalog, &mut rng);
        }
        let target = session.finale_return(&catalog);

        assert_eq!(target, catalog.title);
        assert!(session.visited().is_empty());
        assert_eq!(session.current_level(), 1);
    }

    #[test]
    fn seeded_playthrough_covers_the_pool_then_parks_on_the_finale() {
        // Pool 2..=9: eight advances must visit each pool level exactly once
        // while the counter runs 2..=9; the ninth lands on the finale with
        // the counter pinned at the cap.
        let catalog = catalog();
        let mut session = Session::default();
        let mut rng = StdRng::seed_from_u64(42);
        let mut order = Vec::new();

        for step in 1..=8 {
            let picked = session.advance(&catalog, &mut rng);
            order.push(picked);
            assert_eq!(session.current_level(), 1 + step);
        }

        let mut sorted = order.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted, (2..=9).map(LevelId).collect::<Vec<_>>());

        assert_eq!(session.advance(&catalog, &mut rng), catalog.finale);
        assert_eq!(session.current_level(), 10);
    }

    #[test]
    fn an_existing_session_survives_plugin_install() {
        let mut app = App::new();

        let mut session = Session::default();
        session.visited.insert(LevelId(4));
        session.current_level = 3;
        app.insert_resource(session);

        app.add_plugins(ProgressionPlugin);

        let session = app.world().resource::<Session>();
        assert_eq!(session.current_level(), 3);
        assert!(session.visited().contains(&LevelId(4)));
    }

    #[derive(Resource, Default)]
    struct RequestLog(Vec<LevelId>);

    fn record_requests(mut reader: MessageReader<LoadLevel>, mut log: ResMut<RequestLog>) {
        for &LoadLevel(level) in reader.read() {
            log.0.push(level);
        }
    }

    fn dispatch_app() -> App {
        let mut app = App::new();
        app.add_message::<Interacted>();
        app.add_message::<LoadLevel>();
        app.init_resource::<LevelCatalog>();
        app.init_resource::<Session>();
        app.init_resource::<RequestLog>();
        app.add_systems(Update, (handle_interactions, record_requests).chain());
        app
    }

    fn interact(app: &mut App, kind: InteractionKind) {
        app.world_mut()
            .resource_mut::<Messages<Interacted>>()
            .write(Interacted { kind });
    }

    #[test]
    fn advance_interaction_requests_a_pool_level() {
        let mut app = dispatch_app();
        interact(&mut app, InteractionKind::Advance);
        app.update();

        let catalog = LevelCatalog::default();
        let log = app.world().resource::<RequestLog>();
        assert_eq!(log.0.len(), 1);
        assert!(log.0[0] >= catalog.pool_min && log.0[0] <= catalog.pool_max);

        let session = app.world().resource::<Session>();
        assert_eq!(session.visited().len(), 1);
        assert_eq!(session.current_level(), 2);
    }

    #[test]
    fn reset_interaction_requests_the_first_level_unconditionally() {
        let mut app = dispatch_app();
        interact(&mut app, InteractionKind::Advance);
        app.update();
        interact(&mut app, InteractionKind::Reset);
        app.update();

        let catalog = LevelCatalog::default();
        let log = app.world().resource::<RequestLog>();
        assert_eq!(log.0.last(), Some(&catalog.first));

        let session = app.world().resource::<Session>();
        assert!(session.visited().is_empty());
        assert_eq!(session.current_level(), 1);
    }

    #[test]
    fn finale_return_interaction_requests_the_title() {
        let mut app = dispatch_app();
        interact(&mut app, InteractionKind::FinaleReturn);
        app.update();

        let catalog = LevelCatalog::default();
        let log = app.world().resource::<RequestLog>();
        assert_eq!(log.0.last(), Some(&catalog.title));
    }
}
