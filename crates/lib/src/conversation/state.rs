//! Conversation states of the support menu.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where a customer is in the menu tree. Absence of a stored state means "never talked to us".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    Menu,
    /// Equipment checklist shown; the menu stays active. Option 1 currently keeps `Menu`.
    AwaitingEquipmentDone,
    /// Waiting for one of the three system topics.
    SystemTopic,
    /// Choosing between well and river calibration.
    CalibrationMenu,
    CalibrationWell,
    CalibrationRiver,
    /// Human support owns the chat; the bot only answers the menu hotkey.
    Paused,
    Closed,
}

impl ConversationState {
    pub const ALL: [ConversationState; 8] = [
        ConversationState::Menu,
        ConversationState::AwaitingEquipmentDone,
        ConversationState::SystemTopic,
        ConversationState::CalibrationMenu,
        ConversationState::CalibrationWell,
        ConversationState::CalibrationRiver,
        ConversationState::Paused,
        ConversationState::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationState::Menu => "menu",
            ConversationState::AwaitingEquipmentDone => "awaiting_equipment_done",
            ConversationState::SystemTopic => "system_topic",
            ConversationState::CalibrationMenu => "calibration_menu",
            ConversationState::CalibrationWell => "calibration_well",
            ConversationState::CalibrationRiver => "calibration_river",
            ConversationState::Paused => "paused",
            ConversationState::Closed => "closed",
        }
    }

    /// Parse a value read back from a store. Unknown values are treated as "no session"
    /// so the customer gets a fresh welcome instead of a stuck conversation.
    pub fn from_stored(value: &str) -> Option<Self> {
        match value.parse() {
            Ok(s) => Some(s),
            Err(e) => {
                log::warn!("ignoring stored session state: {}", e);
                None
            }
        }
    }
}

impl fmt::Display for ConversationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown conversation state: {0}")]
pub struct UnknownState(pub String);

impl FromStr for ConversationState {
    type Err = UnknownState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        ConversationState::ALL
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownState(s.to_string()))
    }
}
