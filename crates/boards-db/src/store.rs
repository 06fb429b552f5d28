use boards_core::models::{Block, Container, License, Team};
use boards_core::AppError;

/// Persistence operations needed by the cloud limits logic
#[async_trait::async_trait]
pub trait BoardsStore: Send + Sync {
    /// License installed on the host, if any.
    async fn get_license(&self) -> Option<License>;

    /// Current card limit timestamp; 0 when it was never computed.
    async fn get_card_limit_timestamp(&self) -> Result<i64, AppError>;

    /// Recompute and persist the card limit timestamp for `card_limit`.
    ///
    /// The timestamp is the update time of the `card_limit`-th most recently
    /// updated card outside template boards, or 0 when the limit is 0 or
    /// there are fewer cards than the limit.
    async fn update_card_limit_timestamp(&self, card_limit: i32) -> Result<i64, AppError>;

    /// Number of live cards that count against the limit.
    async fn get_used_cards_count(&self) -> Result<i64, AppError>;

    async fn get_blocks_by_ids(
        &self,
        container: &Container,
        ids: &[String],
    ) -> Result<Vec<Block>, AppError>;

    async fn get_workspace_team(&self, workspace_id: &str) -> Result<Option<Team>, AppError>;

    /// Queue a direct message of `post_type` for each recipient.
    async fn send_message(
        &self,
        message: &str,
        post_type: &str,
        recipients: &[String],
    ) -> Result<(), AppError>;
}
