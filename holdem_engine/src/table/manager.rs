//! Table manager for spawning and managing multiple table actors.

use super::{
    TableId,
    actor::{SeatAssignment, TableActor, TableHandle},
    config::TableConfig,
    errors::{TableError, TableResult},
    messages::{TableEvent, TableStateResponse},
};
use crate::game::entities::{PlayerStatus, Usd};
use serde::Serialize;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{RwLock, mpsc};

/// Table metadata for discovery
#[derive(Debug, Clone, Serialize)]
pub struct TableMetadata {
    pub id: TableId,
    pub name: String,
    /// Seats that still have chips
    pub player_count: usize,
    pub max_players: usize,
    pub small_blind: Usd,
    pub big_blind: Usd,
    pub speed: String,
    pub hands_played: u64,
    pub is_active: bool,
}

/// Registry of running tables, keyed by table id. Each table is driven by
/// its own actor task, so requests to different tables never wait on each
/// other; the lock only guards the map of handles.
#[derive(Clone, Default)]
pub struct TableManager {
    /// Active table handles
    tables: Arc<RwLock<HashMap<TableId, TableHandle>>>,

    /// Next table ID
    next_table_id: Arc<RwLock<TableId>>,
}

impl TableManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a table actor and register its handle
    pub async fn create_table(
        &self,
        config: TableConfig,
        seats: Vec<SeatAssignment>,
    ) -> TableResult<TableId> {
        let (table_id, _) = self.spawn_table(config, seats, None).await?;
        Ok(table_id)
    }

    /// Like [`create_table`](Self::create_table), but subscribes before the
    /// table starts so no event is missed.
    pub async fn create_table_with_events(
        &self,
        config: TableConfig,
        seats: Vec<SeatAssignment>,
        subscriber_id: impl Into<String>,
        buffer: usize,
    ) -> TableResult<(TableId, mpsc::Receiver<TableEvent>)> {
        let (table_id, events) = self
            .spawn_table(config, seats, Some((subscriber_id.into(), buffer)))
            .await?;
        let events = events.ok_or(TableError::Closed)?;
        Ok((table_id, events))
    }

    async fn spawn_table(
        &self,
        config: TableConfig,
        seats: Vec<SeatAssignment>,
        subscriber: Option<(String, usize)>,
    ) -> TableResult<(TableId, Option<mpsc::Receiver<TableEvent>>)> {
        let table_id = {
            let mut next = self.next_table_id.write().await;
            *next += 1;
            *next
        };

        let name = config.name.clone();
        let (mut actor, handle) = TableActor::new(table_id, config, seats)?;
        let events = subscriber
            .map(|(subscriber_id, buffer)| actor.subscribe(subscriber_id, buffer));
        tokio::spawn(actor.run());

        self.tables.write().await.insert(table_id, handle);
        log::info!("Created table {} '{}'", table_id, name);

        Ok((table_id, events))
    }

    /// Get a table handle by ID
    pub async fn get_table(&self, table_id: TableId) -> Option<TableHandle> {
        self.tables.read().await.get(&table_id).cloned()
    }

    /// Close a table and drop it from the registry
    pub async fn close_table(&self, table_id: TableId) -> TableResult<()> {
        let handle = self
            .tables
            .write()
            .await
            .remove(&table_id)
            .ok_or(TableError::NotFound(table_id))?;

        match handle.close().await {
            // Already stopped on its own
            Ok(_) | Err(TableError::Closed) => {
                log::info!("Closed table {}", table_id);
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Close every registered table
    pub async fn close_all(&self) {
        let ids: Vec<TableId> = self.tables.read().await.keys().copied().collect();
        for table_id in ids {
            if let Err(err) = self.close_table(table_id).await {
                log::warn!("Failed to close table {}: {}", table_id, err);
            }
        }
    }

    /// Snapshots of every table, ordered by id. Tables whose actor has
    /// stopped are dropped from the registry.
    async fn snapshots(&self) -> Vec<TableStateResponse> {
        let mut handles: Vec<TableHandle> = self.tables.read().await.values().cloned().collect();
        handles.sort_by_key(TableHandle::table_id);

        let mut states = Vec::with_capacity(handles.len());
        let mut stopped = Vec::new();
        for handle in handles {
            match handle.state().await {
                Ok(state) => states.push(state),
                Err(_) => stopped.push(handle.table_id()),
            }
        }

        if !stopped.is_empty() {
            let mut tables = self.tables.write().await;
            for table_id in stopped {
                log::debug!("Removing stopped table {}", table_id);
                tables.remove(&table_id);
            }
        }

        states
    }

    /// List tables ordered by id, including finished ones that haven't
    /// been closed yet (`is_active == false`).
    pub async fn list_tables(&self) -> Vec<TableMetadata> {
        self.snapshots()
            .await
            .into_iter()
            .map(|state| TableMetadata {
                id: state.table_id,
                name: state.table_name,
                player_count: state
                    .players
                    .iter()
                    .filter(|p| p.status != PlayerStatus::Eliminated)
                    .count(),
                max_players: state.max_players,
                small_blind: state.small_blind,
                big_blind: state.big_blind,
                speed: state.speed,
                hands_played: state.hands_played,
                is_active: state.is_active,
            })
            .collect()
    }

    /// Number of tables still dealing hands
    pub async fn active_table_count(&self) -> usize {
        self.snapshots()
            .await
            .iter()
            .filter(|state| state.is_active)
            .count()
    }

    /// A finished table keeps answering state queries until it is closed.
    /// Closes every table whose game is over and returns how many.
    pub async fn close_finished(&self) -> usize {
        let finished: Vec<TableId> = self
            .snapshots()
            .await
            .into_iter()
            .filter(|state| !state.is_active)
            .map(|state| state.table_id)
            .collect();

        let mut closed = 0;
        for table_id in finished {
            match self.close_table(table_id).await {
                Ok(()) => closed += 1,
                Err(err) => log::warn!("Failed to close table {}: {}", table_id, err),
            }
        }
        closed
    }
}
