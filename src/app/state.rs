//! Application state shared across routes

use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::Config;
use crate::game::constants::Battlefield;
use crate::game::service::ServiceTiming;
use crate::game::{GameService, GameSession, RoundCoordinator};
use crate::store::{ScoreLedger, ScoreRecord, SnapshotWriter};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub game: Arc<GameService>,
}

impl AppState {
    /// Build the game from a ledger already loaded from the store
    pub fn new(config: Config, records: Vec<ScoreRecord>, writer: SnapshotWriter) -> Self {
        let config = Arc::new(config);

        let rng = match config.game_seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let rounds = RoundCoordinator::new(Battlefield::default(), rng);
        let ledger = ScoreLedger::new(records, writer);
        let session = GameSession::new(rounds, ledger, config.round_advance_ms());

        let game = Arc::new(GameService::new(
            session,
            ServiceTiming {
                round_advance_delay: config.round_advance_delay,
                heartbeat_interval: config.heartbeat_interval,
            },
        ));

        Self { config, game }
    }
}
