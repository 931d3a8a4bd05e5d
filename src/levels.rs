/// Level identity, catalog bounds, and the level-loading pipeline.
use bevy::prelude::*;

pub struct LevelsPlugin;

impl Plugin for LevelsPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<LoadLevel>()
            .add_message::<LevelLoaded>()
            .init_resource::<LevelCatalog>()
            .init_resource::<CurrentLevelId>()
            .add_systems(Update, apply_level_loads);
    }
}

/// Integer level index. Level 0 is the title screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LevelId(pub usize);

/// Title screen vs. gameplay. Level-to-level transitions stay inside
/// `Exploring`, so per-level content is scoped with [`LevelScoped`] rather
/// than state scoping.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash, States)]
pub enum Screen {
    #[default]
    Title,
    Exploring,
}

/// Marker for entities that live only until the next level load.
#[derive(Component)]
pub struct LevelScoped;

/// Request a transition. The loader answers with [`LevelLoaded`] once the
/// world has been torn down and the new level is the active one.
#[derive(Message, Debug, Clone, Copy)]
pub struct LoadLevel(pub LevelId);

/// A transition completed; the world for the new level is being rebuilt.
#[derive(Message, Debug, Clone, Copy)]
pub struct LevelLoaded(pub LevelId);

/// The level currently hosting the player.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentLevelId(pub LevelId);

impl Default for CurrentLevelId {
    fn default() -> Self {
        Self(LevelId(0))
    }
}

/// Index layout of the playable levels. The random pool sits strictly
/// between the fixed first level and the finale.
#[derive(Resource, Debug, Clone, Copy)]
pub struct LevelCatalog {
    pub title: LevelId,
    pub first: LevelId,
    pub pool_min: LevelId,
    pub pool_max: LevelId,
    pub finale: LevelId,
    pub level_count: usize,
    /// Cap for the on-screen progress counter.
    pub max_display: u32,
}

impl LevelCatalog {
    /// Builds a catalog over `level_count` levels (index 0 is the title, the
    /// last index is the finale) with the random pool `pool_min..=pool_max`.
    /// Bounds are clamped here so selection never observes an inverted or
    /// out-of-range pool.
    pub fn new(pool_min: usize, pool_max: usize, level_count: usize) -> Self {
        let last = level_count.saturating_sub(1);
        let pool_max = pool_max.min(last).max(pool_min.min(last));
        let pool_min = pool_min.min(pool_max);

        Self {
            title: LevelId(0),
            first: LevelId(1),
            pool_min: LevelId(pool_min),
            pool_max: LevelId(pool_max),
            finale: LevelId(last),
            level_count,
            max_display: last as u32,
        }
    }

    pub fn contains(&self, level: LevelId) -> bool {
        level.0 < self.level_count
    }

    pub fn pool_len(&self) -> usize {
        self.pool_max.0 - self.pool_min.0 + 1
    }
}

impl Default for LevelCatalog {
    fn default() -> Self {
        // Levels 0..=10: title, first, pool of eight, finale.
        Self::new(2, 9, 11)
    }
}

/// Consume transition requests: tear down the outgoing level, record the new
/// one, flip the screen state, and announce completion. Out-of-range targets
/// are rejected here rather than handed to the renderer, which has no defined
/// behavior for them.
fn apply_level_loads(
    mut commands: Commands,
    mut requests: MessageReader<LoadLevel>,
    mut completed: MessageWriter<LevelLoaded>,
    catalog: Res<LevelCatalog>,
    mut current: ResMut<CurrentLevelId>,
    mut next_screen: ResMut<NextState<Screen>>,
    scoped: Query<Entity, With<LevelScoped>>,
) {
    // A burst of requests within one frame collapses to the most recent.
    let Some(&LoadLevel(target)) = requests.read().last() else {
        return;
    };
    if !catalog.contains(target) {
        warn!("rejected transition to out-of-range level {}", target.0);
        return;
    }

    for entity in &scoped {
        commands.entity(entity).despawn();
    }

    current.0 = target;
    next_screen.set(if target == catalog.title {
        Screen::Title
    } else {
        Screen::Exploring
    });
    completed.write(LevelLoaded(target));
    info!("entered level {}", target.0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::state::app::StatesPlugin;

    #[derive(Resource, Default)]
    struct CompletedLog(Vec<LevelId>);

    fn record_completed(mut reader: MessageReader<LevelLoaded>, mut log: ResMut<CompletedLog>) {
        for &LevelLoaded(level) in reader.read() {
            log.0.push(level);
        }
    }

    fn loader_app() -> App {
        let mut app = App::new();
        app.add_plugins(StatesPlugin);
        app.init_state::<Screen>();
        app.add_message::<LoadLevel>();
        app.add_message::<LevelLoaded>();
        app.init_resource::<LevelCatalog>();
        app.init_resource::<CurrentLevelId>();
        app.init_resource::<CompletedLog>();
        app.add_systems(Update, (apply_level_loads, record_completed).chain());
        app
    }

    fn request(app: &mut App, level: LevelId) {
        app.world_mut()
            .resource_mut::<Messages<LoadLevel>>()
            .write(LoadLevel(level));
    }

    #[test]
    fn catalog_clamps_an_inverted_pool() {
        let catalog = LevelCatalog::new(9, 2, 11);
        assert!(catalog.pool_min <= catalog.pool_max);
        assert!(catalog.pool_max.0 < catalog.level_count);
    }

    #[test]
    fn catalog_clamps_a_pool_past_the_last_level() {
        let catalog = LevelCatalog::new(2, 40, 11);
        assert_eq!(catalog.pool_max, LevelId(10));
        assert_eq!(catalog.pool_min, LevelId(2));
    }

    #[test]
    fn loader_completes_a_valid_request() {
        let mut app = loader_app();
        request(&mut app, LevelId(3));
        app.update();

        assert_eq!(app.world().resource::<CompletedLog>().0, vec![LevelId(3)]);
        assert_eq!(app.world().resource::<CurrentLevelId>().0, LevelId(3));
    }

    #[test]
    fn loader_rejects_an_out_of_range_request_locally() {
        let mut app = loader_app();
        request(&mut app, LevelId(99));
        app.update();

        assert!(app.world().resource::<CompletedLog>().0.is_empty());
        assert_eq!(app.world().resource::<CurrentLevelId>().0, LevelId(0));
    }

    #[test]
    fn loader_tears_down_scoped_entities() {
        let mut app = loader_app();
        let stale = app.world_mut().spawn(LevelScoped).id();
        request(&mut app, LevelId(5));
        app.update();

        assert!(app.world().get_entity(stale).is_err());
    }

    #[test]
    fn a_burst_of_requests_collapses_to_the_last() {
        let mut app = loader_app();
        request(&mut app, LevelId(4));
        request(&mut app, LevelId(7));
        app.update();

        assert_eq!(app.world().resource::<CompletedLog>().0, vec![LevelId(7)]);
    }
}
