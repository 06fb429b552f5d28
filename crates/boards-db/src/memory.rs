//! In-memory store
//!
//! Holds blocks per workspace and records every lookup it serves, so callers
//! can check how often (and with what ids) persistence was reached.

use boards_core::models::{Block, Container, License, Team};
use boards_core::AppError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::store::BoardsStore;

/// Serializable seed for a [`MemoryStore`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryFixture {
    #[serde(default)]
    pub license: Option<License>,
    #[serde(default)]
    pub card_limit_timestamp: i64,
    /// Blocks are stored under their own `workspaceId`.
    #[serde(default)]
    pub blocks: Vec<Block>,
    /// Teams keyed by workspace id.
    #[serde(default)]
    pub teams: HashMap<String, Team>,
}

/// A message handed to `send_message`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SentMessage {
    pub message: String,
    pub post_type: String,
    pub recipients: Vec<String>,
}

#[derive(Default)]
struct MemoryState {
    license: Option<License>,
    card_limit_timestamp: i64,
    blocks: HashMap<String, HashMap<String, Block>>,
    teams: HashMap<String, Team>,
    sent_messages: Vec<SentMessage>,
    block_fetches: Vec<Vec<String>>,
    timestamp_updates: Vec<i32>,
    license_reads: usize,
    fail_block_fetches: Option<String>,
    fail_messages: Option<String>,
}

/// Store kept entirely in process memory
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixture(fixture: MemoryFixture) -> Self {
        let store = Self::new();
        {
            let mut state = store.state.lock().unwrap_or_else(|e| e.into_inner());
            state.license = fixture.license;
            state.card_limit_timestamp = fixture.card_limit_timestamp;
            state.teams = fixture.teams;
            for block in fixture.blocks {
                state
                    .blocks
                    .entry(block.workspace_id.clone())
                    .or_default()
                    .insert(block.id.clone(), block);
            }
        }
        store
    }

    fn state(&self) -> Result<MutexGuard<'_, MemoryState>, AppError> {
        self.state
            .lock()
            .map_err(|_| AppError::Internal("memory store lock poisoned".to_string()))
    }

    fn state_or_recover(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_license(&self, license: Option<License>) {
        self.state_or_recover().license = license;
    }

    pub fn set_card_limit_timestamp(&self, timestamp: i64) {
        self.state_or_recover().card_limit_timestamp = timestamp;
    }

    /// Insert (or replace) blocks under the container's workspace.
    pub fn insert_blocks(&self, container: &Container, blocks: impl IntoIterator<Item = Block>) {
        let mut state = self.state_or_recover();
        let workspace = state
            .blocks
            .entry(container.workspace_id.clone())
            .or_default();
        for mut block in blocks {
            block.workspace_id = container.workspace_id.clone();
            workspace.insert(block.id.clone(), block);
        }
    }

    pub fn insert_team(&self, workspace_id: impl Into<String>, team: Team) {
        self.state_or_recover()
            .teams
            .insert(workspace_id.into(), team);
    }

    /// Make every following block fetch fail with `message`.
    pub fn fail_block_fetches(&self, message: impl Into<String>) {
        self.state_or_recover().fail_block_fetches = Some(message.into());
    }

    /// Make every following `send_message` fail with `message`.
    pub fn fail_messages(&self, message: impl Into<String>) {
        self.state_or_recover().fail_messages = Some(message.into());
    }

    /// Ids requested by each `get_blocks_by_ids` call, in call order.
    pub fn block_fetches(&self) -> Vec<Vec<String>> {
        self.state_or_recover().block_fetches.clone()
    }

    /// Card limits passed to `update_card_limit_timestamp`, in call order.
    pub fn timestamp_updates(&self) -> Vec<i32> {
        self.state_or_recover().timestamp_updates.clone()
    }

    /// Number of `get_license` calls served.
    pub fn license_reads(&self) -> usize {
        self.state_or_recover().license_reads
    }

    pub fn sent_messages(&self) -> Vec<SentMessage> {
        self.state_or_recover().sent_messages.clone()
    }

    /// Live cards outside template boards, newest first.
    fn counted_cards(state: &MemoryState) -> Vec<&Block> {
        let mut cards: Vec<&Block> = state
            .blocks
            .values()
            .flat_map(|workspace| {
                workspace.values().filter(move |block| {
                    block.is_card()
                        && block.delete_at == 0
                        && !workspace
                            .get(&block.root_id)
                            .is_some_and(|board| board.is_template())
                })
            })
            .collect();
        cards.sort_by(|a, b| b.update_at.cmp(&a.update_at));
        cards
    }
}

#[async_trait::async_trait]
impl BoardsStore for MemoryStore {
    async fn get_license(&self) -> Option<License> {
        let mut state = self.state_or_recover();
        state.license_reads += 1;
        state.license.clone()
    }

    async fn get_card_limit_timestamp(&self) -> Result<i64, AppError> {
        Ok(self.state()?.card_limit_timestamp)
    }

    async fn update_card_limit_timestamp(&self, card_limit: i32) -> Result<i64, AppError> {
        let mut state = self.state()?;
        state.timestamp_updates.push(card_limit);

        let timestamp = match usize::try_from(card_limit) {
            Ok(limit) if limit > 0 => Self::counted_cards(&state)
                .get(limit - 1)
                .map(|card| card.update_at)
                .unwrap_or(0),
            _ => 0,
        };
        state.card_limit_timestamp = timestamp;
        Ok(timestamp)
    }

    async fn get_used_cards_count(&self) -> Result<i64, AppError> {
        let state = self.state()?;
        Ok(Self::counted_cards(&state).len() as i64)
    }

    async fn get_blocks_by_ids(
        &self,
        container: &Container,
        ids: &[String],
    ) -> Result<Vec<Block>, AppError> {
        let mut state = self.state()?;
        state.block_fetches.push(ids.to_vec());
        if let Some(message) = &state.fail_block_fetches {
            return Err(AppError::Internal(message.clone()));
        }

        let Some(workspace) = state.blocks.get(&container.workspace_id) else {
            return Ok(Vec::new());
        };
        Ok(ids
            .iter()
            .filter_map(|id| workspace.get(id))
            .cloned()
            .collect())
    }

    async fn get_workspace_team(&self, workspace_id: &str) -> Result<Option<Team>, AppError> {
        Ok(self.state()?.teams.get(workspace_id).cloned())
    }

    async fn send_message(
        &self,
        message: &str,
        post_type: &str,
        recipients: &[String],
    ) -> Result<(), AppError> {
        let mut state = self.state()?;
        if let Some(error) = &state.fail_messages {
            return Err(AppError::Internal(error.clone()));
        }
        state.sent_messages.push(SentMessage {
            message: message.to_string(),
            post_type: post_type.to_string(),
            recipients: recipients.to_vec(),
        });
        Ok(())
    }
}
