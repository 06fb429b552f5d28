//! Cloud limits
//!
//! Cloud workspaces receive product limits from the portal. The card limit is
//! turned into a card limit timestamp by the store: cards updated at or before
//! it are outside the active window and are served limited, unless they live
//! on a template board. Boards and card content are never limited themselves.

use boards_core::constants::UPGRADE_NUDGE_POST_TYPE;
use boards_core::models::{
    Block, BlockType, BoardsCloudLimits, Container, ProductLimits, UserGetOptions,
};
use boards_core::AppError;
use boards_db::BoardsStore;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use crate::host::HostApi;

/// Evaluates the cloud card limit against blocks
pub struct CloudLimitsService {
    store: Arc<dyn BoardsStore>,
    host_api: Option<Arc<dyn HostApi>>,
    card_limit: AtomicI32,
    view_limit: AtomicI32,
    admin_page_size: usize,
}

impl CloudLimitsService {
    pub fn new(store: Arc<dyn BoardsStore>) -> Self {
        Self {
            store,
            host_api: None,
            card_limit: AtomicI32::new(0),
            view_limit: AtomicI32::new(0),
            admin_page_size: boards_core::constants::ADMIN_PAGE_SIZE,
        }
    }

    /// Attach the host plugin API; only needed to notify administrators.
    pub fn with_host_api(mut self, host_api: Arc<dyn HostApi>) -> Self {
        self.host_api = Some(host_api);
        self
    }

    pub fn with_admin_page_size(mut self, admin_page_size: usize) -> Self {
        self.admin_page_size = admin_page_size;
        self
    }

    pub fn card_limit(&self) -> i32 {
        self.card_limit.load(Ordering::SeqCst)
    }

    /// Overwrite the card limit without recomputing the timestamp.
    pub fn set_card_limit(&self, card_limit: i32) {
        self.card_limit.store(card_limit, Ordering::SeqCst);
    }

    pub fn view_limit(&self) -> i32 {
        self.view_limit.load(Ordering::SeqCst)
    }

    /// True only if a license is installed with the cloud feature enabled.
    pub async fn is_cloud(&self) -> bool {
        self.store
            .get_license()
            .await
            .is_some_and(|license| license.is_cloud())
    }

    /// A card limit is set and the server is a cloud instance.
    ///
    /// The license is only read once a limit is known.
    pub async fn is_cloud_limited(&self) -> bool {
        self.card_limit() != 0 && self.is_cloud().await
    }

    /// Store the limits pushed by the portal.
    ///
    /// The card limit timestamp is recomputed only when the card limit
    /// actually changes; clearing the limits stores a zero timestamp.
    #[tracing::instrument(skip(self, limits))]
    pub async fn set_cloud_limits(&self, limits: Option<&ProductLimits>) -> Result<(), AppError> {
        let new_card_limit = limits.map(ProductLimits::card_limit).unwrap_or(0);
        let new_view_limit = limits.map(ProductLimits::view_limit).unwrap_or(0);
        self.view_limit.store(new_view_limit, Ordering::SeqCst);

        let old_card_limit = self.card_limit.swap(new_card_limit, Ordering::SeqCst);
        if old_card_limit == new_card_limit {
            tracing::debug!(card_limit = new_card_limit, "Card limit unchanged");
            return Ok(());
        }

        tracing::info!(
            old_card_limit,
            new_card_limit,
            "Card limit changed, updating card limit timestamp"
        );
        let timestamp = self
            .store
            .update_card_limit_timestamp(new_card_limit)
            .await?;
        tracing::info!(card_limit_timestamp = timestamp, "Card limit timestamp updated");
        Ok(())
    }

    /// Recompute the card limit timestamp if the server is cloud limited.
    #[tracing::instrument(skip(self))]
    pub async fn update_card_limit_timestamp(&self) -> Result<(), AppError> {
        if !self.is_cloud_limited().await {
            return Ok(());
        }

        let timestamp = self
            .store
            .update_card_limit_timestamp(self.card_limit())
            .await?;
        tracing::debug!(card_limit_timestamp = timestamp, "Card limit timestamp refreshed");
        Ok(())
    }

    /// Current limits and usage as shown to clients.
    pub async fn get_boards_cloud_limits(&self) -> Result<BoardsCloudLimits, AppError> {
        let used_cards = self.store.get_used_cards_count().await?;
        let card_limit_timestamp = self.store.get_card_limit_timestamp().await?;

        Ok(BoardsCloudLimits {
            cards: self.card_limit(),
            used_cards,
            card_limit_timestamp,
            views: self.view_limit(),
        })
    }

    /// Map of board id to whether that board is a template, for every board
    /// the blocks belong to.
    ///
    /// Boards not present in `blocks` are fetched in a single store call.
    pub async fn get_template_map_for_blocks(
        &self,
        container: &Container,
        blocks: &[Block],
    ) -> Result<HashMap<String, bool>, AppError> {
        let refs: Vec<&Block> = blocks.iter().collect();
        self.template_map(container, &refs).await
    }

    async fn template_map(
        &self,
        container: &Container,
        blocks: &[&Block],
    ) -> Result<HashMap<String, bool>, AppError> {
        let mut template_map: HashMap<String, bool> = blocks
            .iter()
            .filter(|block| block.is_board())
            .map(|board| (board.id.clone(), board.is_template()))
            .collect();

        let missing = missing_ids(
            blocks
                .iter()
                .filter(|block| !block.is_board())
                .map(|block| block.root_id.as_str()),
            |id| template_map.contains_key(id),
        );

        if !missing.is_empty() {
            tracing::debug!(count = missing.len(), "Fetching boards for template map");
            let boards = self.store.get_blocks_by_ids(container, &missing).await?;
            for board in boards {
                template_map.insert(board.id.clone(), board.is_template());
            }
        }

        Ok(template_map)
    }

    /// Map of card id to card for the cards in `blocks` and the parent card of
    /// every content block. Missing cards are fetched in a single store call.
    async fn card_map(
        &self,
        container: &Container,
        blocks: &[Block],
        board_ids: &HashSet<&str>,
    ) -> Result<HashMap<String, Block>, AppError> {
        let mut card_map: HashMap<String, Block> = blocks
            .iter()
            .filter(|block| block.is_card())
            .map(|card| (card.id.clone(), card.clone()))
            .collect();

        let missing = missing_ids(
            blocks
                .iter()
                .filter(|block| !block.is_card())
                .filter_map(|block| parent_card_id(block, board_ids)),
            |id| card_map.contains_key(id),
        );

        if !missing.is_empty() {
            tracing::debug!(count = missing.len(), "Fetching cards for content blocks");
            let cards = self.store.get_blocks_by_ids(container, &missing).await?;
            for card in cards.into_iter().filter(Block::is_card) {
                card_map.insert(card.id.clone(), card);
            }
        }

        Ok(card_map)
    }

    /// Mark the cards outside the active window as limited.
    ///
    /// Blocks come back in the same order. When the server is not cloud
    /// limited they are returned untouched.
    #[tracing::instrument(skip(self, blocks), fields(workspace_id = %container.workspace_id, count = blocks.len()))]
    pub async fn apply_cloud_limits(
        &self,
        container: &Container,
        blocks: Vec<Block>,
    ) -> Result<Vec<Block>, AppError> {
        if !self.is_cloud_limited().await {
            return Ok(blocks);
        }

        let card_limit_timestamp = self.store.get_card_limit_timestamp().await?;
        let template_map = self.get_template_map_for_blocks(container, &blocks).await?;

        let mut limited = 0usize;
        let blocks: Vec<Block> = blocks
            .into_iter()
            .map(|block| {
                let is_template = template_map.get(&block.root_id).copied().unwrap_or(false);
                if !is_template && block.should_be_limited(card_limit_timestamp) {
                    limited += 1;
                    block.limited_view()
                } else {
                    block
                }
            })
            .collect();

        tracing::debug!(limited, card_limit_timestamp, "Cloud limits applied");
        Ok(blocks)
    }

    /// Whether any block is, or belongs to, a limited card.
    ///
    /// Returns false without touching blocks when no card limit timestamp is set.
    #[tracing::instrument(skip(self, blocks), fields(workspace_id = %container.workspace_id, count = blocks.len()))]
    pub async fn contains_limited_blocks(
        &self,
        container: &Container,
        blocks: &[Block],
    ) -> Result<bool, AppError> {
        let card_limit_timestamp = self.store.get_card_limit_timestamp().await?;
        if card_limit_timestamp == 0 {
            return Ok(false);
        }

        let board_ids: HashSet<&str> = blocks
            .iter()
            .filter(|block| block.is_board())
            .map(|board| board.id.as_str())
            .collect();
        let card_map = self.card_map(container, blocks, &board_ids).await?;

        let template_inputs: Vec<&Block> = blocks
            .iter()
            .filter(|block| block.is_board())
            .chain(card_map.values())
            .collect();
        let template_map = self.template_map(container, &template_inputs).await?;

        for block in blocks {
            let card_id = if block.is_card() {
                block.id.as_str()
            } else {
                match parent_card_id(block, &board_ids) {
                    Some(card_id) => card_id,
                    None => continue,
                }
            };
            // deleted or never stored; nothing to limit
            let Some(card) = card_map.get(card_id) else {
                tracing::debug!(block_id = %block.id, card_id, "Parent card not found, skipping");
                continue;
            };

            let is_template = template_map.get(&card.root_id).copied().unwrap_or(false);
            if is_template {
                continue;
            }

            if card.should_be_limited(card_limit_timestamp) {
                tracing::debug!(block_id = %block.id, card_id = %card.id, "Block belongs to a limited card");
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Ask every active system administrator to upgrade the workspace.
    ///
    /// One message goes out per page of administrators, addressed to all of
    /// them.
    #[tracing::instrument(skip(self))]
    pub async fn notify_portal_admins_upgrade_request(
        &self,
        workspace_id: &str,
    ) -> Result<(), AppError> {
        let host_api = self.host_api.as_ref().ok_or(AppError::NoHostApi)?;

        let team = self.store.get_workspace_team(workspace_id).await?;
        let of_what = team
            .map(|team| team.display_name)
            .unwrap_or_else(|| "your organization".to_string());
        let message = format!(
            "A member of {} has notified you to upgrade this workspace before the trial ends.",
            of_what
        );

        let mut options = UserGetOptions::system_admins(self.admin_page_size);
        let mut notified = 0usize;
        loop {
            let admins = host_api.get_users(&options).await?;
            if admins.is_empty() {
                break;
            }

            let recipients: Vec<String> = admins.into_iter().map(|admin| admin.id).collect();
            self.store
                .send_message(&message, UPGRADE_NUDGE_POST_TYPE, &recipients)
                .await?;
            notified += recipients.len();
            options.page += 1;
        }

        if notified == 0 {
            tracing::warn!(workspace_id, "No system administrators found to notify");
        } else {
            tracing::info!(workspace_id, notified, "Upgrade request sent to system administrators");
        }
        Ok(())
    }
}

/// Id of the card a non-card block hangs off, if its parent is a card at all.
///
/// Views and other board-level blocks have the board as parent.
fn parent_card_id<'a>(block: &'a Block, board_ids: &HashSet<&str>) -> Option<&'a str> {
    if block.is_board() || block.block_type == BlockType::View {
        return None;
    }
    let parent_id = block.parent_id.as_str();
    if parent_id.is_empty() || parent_id == block.root_id || board_ids.contains(parent_id) {
        return None;
    }
    Some(parent_id)
}

/// Ids not yet resolved, deduplicated, in first-seen order.
fn missing_ids<'a>(
    ids: impl Iterator<Item = &'a str>,
    is_known: impl Fn(&str) -> bool,
) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.filter(|id| !id.is_empty() && !is_known(*id))
        .filter(|id| seen.insert(*id))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_ids_are_deduplicated_in_order() {
        let known = ["board1"];
        let ids = ["board2", "board1", "board3", "board2", ""];
        let missing = missing_ids(ids.into_iter(), |id| known.contains(&id));
        assert_eq!(missing, vec!["board2".to_string(), "board3".to_string()]);
    }

    #[test]
    fn only_content_blocks_have_a_parent_card() {
        let boards: HashSet<&str> = ["board1"].into_iter().collect();

        let text = Block::new("text1", BlockType::Text, "card1", "board1");
        assert_eq!(parent_card_id(&text, &boards), Some("card1"));

        let view = Block::new("view1", BlockType::View, "board1", "board1");
        assert_eq!(parent_card_id(&view, &boards), None);

        // parent is a board of the set even though the root differs
        let comment = Block::new("comment1", BlockType::Comment, "board1", "other");
        assert_eq!(parent_card_id(&comment, &boards), None);

        let board = Block::new("board2", BlockType::Board, "board2", "board2");
        assert_eq!(parent_card_id(&board, &boards), None);
    }
}
