//! Contextual action strip shown for the current selection.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{KeyParseError, TowerLevel, TowerSelector, TowerType};

/// Selection context that decides which actions the strip offers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StripState {
    /// Nothing selected.
    None,
    /// An empty placing slot is selected.
    Placing,
    /// A slot holding a tower is selected.
    Tower(TowerSelector),
    /// Maps are being placed and the last one can be undone.
    Undo,
    /// Every map is placed and the defence can start.
    Ready,
}

impl StripState {
    /// Actions offered in this context, priced from the catalogue.
    #[must_use]
    pub fn options(self) -> Vec<StripOption> {
        match self {
            Self::None => Vec::new(),
            Self::Placing => TowerType::ALL
                .into_iter()
                .map(|kind| StripOption::Tower {
                    kind,
                    cost: kind.cost(TowerLevel::Lvl1),
                })
                .collect(),
            Self::Tower(selector) => {
                let upgrade_cost = if selector.level.is_max() {
                    None
                } else {
                    Some(selector.kind.cost(selector.level.next()))
                };
                vec![
                    StripOption::Upgrade { cost: upgrade_cost },
                    StripOption::Sell {
                        refund: selector.kind.refund(selector.level),
                    },
                    StripOption::RotateLeft,
                    StripOption::RotateRight,
                ]
            }
            Self::Undo => vec![StripOption::Undo],
            Self::Ready => vec![StripOption::Undo, StripOption::Start],
        }
    }
}

impl fmt::Display for StripState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::Placing => f.write_str("placing"),
            Self::Tower(selector) => selector.fmt(f),
            Self::Undo => f.write_str("undo"),
            Self::Ready => f.write_str("ready"),
        }
    }
}

impl FromStr for StripState {
    type Err = KeyParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "none" => Ok(Self::None),
            "placing" => Ok(Self::Placing),
            "undo" => Ok(Self::Undo),
            "ready" => Ok(Self::Ready),
            other => other.parse().map(Self::Tower),
        }
    }
}

/// Single action button on the strip.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StripOption {
    /// Build a tower on the selected slot.
    Tower {
        /// Tower type to build.
        kind: TowerType,
        /// Coins required.
        cost: u32,
    },
    /// Upgrade the selected tower; `None` once the tower is at its maximum level.
    Upgrade {
        /// Coins required for the next level.
        cost: Option<u32>,
    },
    /// Sell the selected tower.
    Sell {
        /// Coins returned.
        refund: u32,
    },
    /// Rotate the selected tower counter-clockwise.
    RotateLeft,
    /// Rotate the selected tower clockwise.
    RotateRight,
    /// Remove the last placed map.
    Undo,
    /// Begin the defence.
    Start,
}

impl StripOption {
    /// Caption displayed on the button.
    #[must_use]
    pub fn title(&self) -> String {
        match self {
            Self::Tower { kind, cost } => format!("{} ({cost})", kind.key()),
            Self::Upgrade { cost: Some(cost) } => format!("upgrade ({cost})"),
            Self::Upgrade { cost: None } => "MAX".to_owned(),
            Self::Sell { refund } => format!("sell (+{refund})"),
            Self::RotateLeft => "rotate left".to_owned(),
            Self::RotateRight => "rotate right".to_owned(),
            Self::Undo => "undo".to_owned(),
            Self::Start => "start".to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_level_upgrade_reads_max() {
        let state = StripState::Tower(TowerSelector::new(TowerType::Turret, TowerLevel::Lvl3));
        let options = state.options();
        assert_eq!(options[0], StripOption::Upgrade { cost: None });
        assert_eq!(options[0].title(), "MAX");
        assert_eq!(options[1], StripOption::Sell { refund: 40 });
    }

    #[test]
    fn placing_offers_every_tower_type() {
        let options = StripState::Placing.options();
        assert_eq!(options.len(), TowerType::ALL.len());
        assert_eq!(
            options[0],
            StripOption::Tower {
                kind: TowerType::Turret,
                cost: 30
            }
        );
    }

    #[test]
    fn selectors_parse_back_into_states() {
        for state in [
            StripState::None,
            StripState::Placing,
            StripState::Ready,
            StripState::Tower(TowerSelector::new(TowerType::Barracks, TowerLevel::Lvl2)),
        ] {
            assert_eq!(state.to_string().parse::<StripState>(), Ok(state));
        }
        assert!("bogus".parse::<StripState>().is_err());
    }
}
