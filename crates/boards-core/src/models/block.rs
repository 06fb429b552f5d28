use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::{ICON_FIELD, IS_TEMPLATE_FIELD};

/// Kind of a block in the board tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    Board,
    Card,
    View,
    Text,
    Image,
    Checkbox,
    Divider,
    Comment,
    #[serde(other)]
    Unknown,
}

impl BlockType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockType::Board => "board",
            BlockType::Card => "card",
            BlockType::View => "view",
            BlockType::Text => "text",
            BlockType::Image => "image",
            BlockType::Checkbox => "checkbox",
            BlockType::Divider => "divider",
            BlockType::Comment => "comment",
            BlockType::Unknown => "unknown",
        }
    }

    /// Parse the stored representation. Unrecognised kinds map to `Unknown`.
    pub fn parse(s: &str) -> Self {
        match s {
            "board" => BlockType::Board,
            "card" => BlockType::Card,
            "view" => BlockType::View,
            "text" => BlockType::Text,
            "image" => BlockType::Image,
            "checkbox" => BlockType::Checkbox,
            "divider" => BlockType::Divider,
            "comment" => BlockType::Comment,
            _ => BlockType::Unknown,
        }
    }
}

/// A node of the board tree: boards, the cards on them and card content.
///
/// Boards are their own parent and root. Cards hang off a board; content
/// blocks (text, image, ...) hang off a card and carry the board as root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub id: String,
    #[serde(default)]
    pub parent_id: String,
    #[serde(default)]
    pub root_id: String,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub modified_by: String,
    #[serde(default)]
    pub schema: i64,
    #[serde(rename = "type")]
    pub block_type: BlockType,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Map<String, Value>>,
    #[serde(default)]
    pub create_at: i64,
    #[serde(default)]
    pub update_at: i64,
    #[serde(default)]
    pub delete_at: i64,
    #[serde(default)]
    pub workspace_id: String,
    /// Set when the block is served outside the active card window. Never stored.
    #[serde(default)]
    pub limited: bool,
}

impl Block {
    /// Create a block with the given identity and tree links; everything else is empty.
    pub fn new(
        id: impl Into<String>,
        block_type: BlockType,
        parent_id: impl Into<String>,
        root_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            parent_id: parent_id.into(),
            root_id: root_id.into(),
            created_by: String::new(),
            modified_by: String::new(),
            schema: 1,
            block_type,
            title: String::new(),
            fields: None,
            create_at: 0,
            update_at: 0,
            delete_at: 0,
            workspace_id: String::new(),
            limited: false,
        }
    }

    pub fn with_update_at(mut self, update_at: i64) -> Self {
        self.update_at = update_at;
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields
            .get_or_insert_with(Map::new)
            .insert(key.into(), value);
        self
    }

    pub fn is_board(&self) -> bool {
        self.block_type == BlockType::Board
    }

    pub fn is_card(&self) -> bool {
        self.block_type == BlockType::Card
    }

    /// True only when `isTemplate` is present and a JSON `true`.
    pub fn is_template(&self) -> bool {
        self.fields
            .as_ref()
            .and_then(|fields| fields.get(IS_TEMPLATE_FIELD))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Cards updated at or before a non-zero cutoff fall outside the active window.
    pub fn should_be_limited(&self, card_limit_timestamp: i64) -> bool {
        self.is_card() && card_limit_timestamp > 0 && self.update_at <= card_limit_timestamp
    }

    /// The block as served to a workspace over its card limit.
    ///
    /// Content fields are dropped; only the icon survives so the card can
    /// still be rendered as a placeholder.
    pub fn limited_view(&self) -> Block {
        let fields = self
            .fields
            .as_ref()
            .and_then(|fields| fields.get(ICON_FIELD))
            .filter(|icon| icon.as_str().is_some_and(|s| !s.is_empty()))
            .map(|icon| {
                let mut map = Map::new();
                map.insert(ICON_FIELD.to_string(), icon.clone());
                map
            });

        Block {
            id: self.id.clone(),
            parent_id: self.parent_id.clone(),
            root_id: self.root_id.clone(),
            created_by: self.created_by.clone(),
            modified_by: self.modified_by.clone(),
            schema: self.schema,
            block_type: self.block_type,
            title: self.title.clone(),
            fields,
            create_at: self.create_at,
            update_at: self.update_at,
            delete_at: self.delete_at,
            workspace_id: self.workspace_id.clone(),
            limited: true,
        }
    }
}

/// Scope of a block lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub workspace_id: String,
}

impl Container {
    pub fn new(workspace_id: impl Into<String>) -> Self {
        Self {
            workspace_id: workspace_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn template_flag_requires_boolean_true() {
        let board = Block::new("b", BlockType::Board, "b", "b");
        assert!(!board.is_template());

        let board = board.with_field(IS_TEMPLATE_FIELD, json!(false));
        assert!(!board.is_template());

        let board = Block::new("b", BlockType::Board, "b", "b")
            .with_field(IS_TEMPLATE_FIELD, json!("true"));
        assert!(!board.is_template());

        let board = Block::new("b", BlockType::Board, "b", "b")
            .with_field(IS_TEMPLATE_FIELD, json!(true));
        assert!(board.is_template());
    }

    #[test]
    fn only_cards_at_or_before_cutoff_are_limited() {
        let card = Block::new("c", BlockType::Card, "b", "b").with_update_at(150);
        assert!(card.should_be_limited(150));
        assert!(card.should_be_limited(200));
        assert!(!card.should_be_limited(149));
        assert!(!card.should_be_limited(0));

        let text = Block::new("t", BlockType::Text, "c", "b").with_update_at(100);
        assert!(!text.should_be_limited(150));
        let board = Block::new("b", BlockType::Board, "b", "b").with_update_at(100);
        assert!(!board.should_be_limited(150));
    }

    #[test]
    fn limited_view_keeps_icon_only() {
        let mut card = Block::new("card1", BlockType::Card, "board1", "board1")
            .with_update_at(100)
            .with_field("icon", json!("🎉"))
            .with_field("properties", json!({"status": "done"}));
        card.title = "Launch".to_string();

        let limited = card.limited_view();
        assert!(limited.limited);
        assert_eq!(limited.title, "Launch");
        assert_eq!(limited.update_at, 100);
        let fields = limited.fields.expect("icon field kept");
        assert_eq!(fields.len(), 1);
        assert_eq!(fields["icon"], json!("🎉"));
    }

    #[test]
    fn limited_view_without_icon_has_no_fields() {
        let card = Block::new("card1", BlockType::Card, "board1", "board1")
            .with_field("properties", json!({}));
        assert!(card.limited_view().fields.is_none());
    }

    #[test]
    fn deserializes_unknown_block_types() {
        let block: Block = serde_json::from_value(json!({
            "id": "x",
            "parentId": "card1",
            "rootId": "board1",
            "type": "attachment",
            "updateAt": 5
        }))
        .unwrap();
        assert_eq!(block.block_type, BlockType::Unknown);
        assert_eq!(block.update_at, 5);
        assert!(!block.limited);
        assert_eq!(BlockType::parse("card"), BlockType::Card);
        assert_eq!(BlockType::Card.as_str(), "card");
    }
}
