use serde::{Deserialize, Serialize};

/// Feature flags carried by the host license
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Features {
    #[serde(default)]
    pub cloud: Option<bool>,
}

/// License installed on the host. Absent on self-hosted, unlicensed servers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct License {
    #[serde(default)]
    pub features: Option<Features>,
}

impl License {
    pub fn cloud() -> Self {
        Self {
            features: Some(Features { cloud: Some(true) }),
        }
    }

    /// True only when the cloud feature is explicitly enabled.
    pub fn is_cloud(&self) -> bool {
        self.features
            .as_ref()
            .and_then(|features| features.cloud)
            .unwrap_or(false)
    }
}

/// Boards part of the cloud product limits
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardsLimits {
    #[serde(default)]
    pub cards: Option<i32>,
    #[serde(default)]
    pub views: Option<i32>,
}

/// Product limits pushed by the cloud portal
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductLimits {
    #[serde(default)]
    pub boards: Option<BoardsLimits>,
}

impl ProductLimits {
    pub fn with_cards(cards: i32) -> Self {
        Self {
            boards: Some(BoardsLimits {
                cards: Some(cards),
                views: None,
            }),
        }
    }

    /// Card ceiling, 0 when any level is missing.
    pub fn card_limit(&self) -> i32 {
        self.boards
            .as_ref()
            .and_then(|boards| boards.cards)
            .unwrap_or(0)
    }

    /// Views-per-board ceiling, 0 when any level is missing.
    pub fn view_limit(&self) -> i32 {
        self.boards
            .as_ref()
            .and_then(|boards| boards.views)
            .unwrap_or(0)
    }
}

/// Limits summary returned to clients
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardsCloudLimits {
    pub cards: i32,
    pub used_cards: i64,
    pub card_limit_timestamp: i64,
    pub views: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incomplete_licenses_are_not_cloud() {
        assert!(!License::default().is_cloud());
        assert!(!License {
            features: Some(Features::default())
        }
        .is_cloud());
        assert!(!License {
            features: Some(Features { cloud: Some(false) })
        }
        .is_cloud());
        assert!(License::cloud().is_cloud());
    }

    #[test]
    fn missing_limits_mean_zero() {
        assert_eq!(ProductLimits::default().card_limit(), 0);
        assert_eq!(
            ProductLimits {
                boards: Some(BoardsLimits::default())
            }
            .card_limit(),
            0
        );
        assert_eq!(ProductLimits::with_cards(5).card_limit(), 5);
        assert_eq!(ProductLimits::with_cards(5).view_limit(), 0);
    }
}
