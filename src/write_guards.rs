use std::{collections::HashMap, hash::Hash, sync::Arc};

use tokio::sync::{Mutex, OwnedMutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::models::GameId;

/// In-process serialization of writes on top of database transactions.
///
/// Game-scoped writes (pick submission, grading, game edits) hold the season gate shared
/// and the game's own lock exclusively. Archiving holds the season gate exclusively.
#[derive(Debug, Default)]
pub struct WriteGuards {
    season_gate: RwLock<()>,
    games: KeyedLocks<GameId>,
}

pub struct GameWriteGuard<'a> {
    _season: RwLockReadGuard<'a, ()>,
    _game: OwnedMutexGuard<()>,
}

impl WriteGuards {
    pub async fn lock_game(&self, game: GameId) -> GameWriteGuard<'_> {
        let season = self.season_gate.read().await;
        let game = self.games.lock(game).await;

        GameWriteGuard {
            _season: season,
            _game: game,
        }
    }

    /// Shared access for writes that add games without touching existing ones.
    pub async fn lock_season_shared(&self) -> RwLockReadGuard<'_, ()> {
        self.season_gate.read().await
    }

    pub async fn lock_season(&self) -> RwLockWriteGuard<'_, ()> {
        self.season_gate.write().await
    }
}

#[derive(Debug)]
pub struct KeyedLocks<K> {
    locks: parking_lot::Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        KeyedLocks {
            locks: parking_lot::Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub async fn lock(&self, key: K) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock();
            // Drop entries nobody is holding or waiting on.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(key).or_default().clone()
        };

        lock.lock_owned().await
    }
}
