/// Role id the host assigns to system (portal) administrators.
pub const SYSTEM_ADMIN_ROLE_ID: &str = "system_admin";

/// Post type of the direct message asking administrators to upgrade.
pub const UPGRADE_NUDGE_POST_TYPE: &str = "custom_cloud_upgrade_nudge";

/// Page size used when listing administrators from the host.
pub const ADMIN_PAGE_SIZE: usize = 50;

/// System setting key holding the card limit timestamp.
pub const CARD_LIMIT_TIMESTAMP_SETTING: &str = "CardLimitTimestamp";

/// Block field marking a board as a template.
pub const IS_TEMPLATE_FIELD: &str = "isTemplate";

/// The only block field kept when a card is served limited.
pub const ICON_FIELD: &str = "icon";
