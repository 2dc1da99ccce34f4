//! Peer message envelope exchanged between session participants.
//!
//! Every message travels as a JSON envelope `{"key": ..., "parameters": ...}`
//! where the optional parameters are the base64 encoding of a JSON payload.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use ar_defense_core::{EntityId, KeyParseError, SoundKey, StripState, TowerSelector, TowerType};

/// Messages understood by every participant of a shared session.
#[derive(Clone, Debug, PartialEq)]
pub enum PeerMessage {
    /// A joining peer asks the host which mission is loaded.
    RequestMission,
    /// The host announces the loaded mission.
    ReceiveMission(usize),
    /// The co-op peer tapped the listed entities.
    RequestPlacingStatus(Vec<EntityId>),
    /// The host reports the co-op peer's strip after an action.
    ReceivePlacingStatus(StripState),
    /// The co-op peer builds a tower on its selected slot.
    InsertTower(TowerType),
    /// The co-op peer upgrades the tower it sees selected.
    UpgradeTower(TowerSelector),
    /// The co-op peer sells the tower it sees selected.
    SellTower(TowerSelector),
    /// The co-op peer rotates its selected tower.
    RotateTower {
        /// Rotation direction.
        clockwise: bool,
    },
    /// Coin counter broadcast by the host.
    UpdateCoins(String),
    /// Hit point counter broadcast by the host.
    UpdateHp(String),
    /// Wave indicator broadcast by the host.
    UpdateWaves(String),
    /// Mission summary broadcast by the host.
    FinishMission {
        /// Summary title.
        title: String,
        /// Summary message.
        message: String,
    },
    /// Sound cue broadcast by the host.
    Sound(SoundKey),
}

/// Errors raised while decoding peer messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The envelope is not valid JSON.
    #[error("malformed message envelope")]
    Envelope(#[source] serde_json::Error),
    /// The envelope carries an unknown key.
    #[error("unknown message key `{0}`")]
    UnknownKey(String),
    /// The message requires parameters but none were sent.
    #[error("message `{0}` is missing its parameters")]
    MissingParameters(&'static str),
    /// The parameters are not valid base64.
    #[error("message `{key}` carries undecodable parameters")]
    Encoding {
        /// Message key.
        key: &'static str,
        /// Decoder failure.
        #[source]
        source: base64::DecodeError,
    },
    /// The decoded parameters do not match the expected payload.
    #[error("message `{key}` carries a malformed payload")]
    Payload {
        /// Message key.
        key: &'static str,
        /// Parser failure.
        #[source]
        source: serde_json::Error,
    },
    /// A tower, strip or sound key inside the payload is unknown.
    #[error(transparent)]
    Key(#[from] KeyParseError),
    /// The summary does not contain a `title-message` separator.
    #[error("mission summary `{0}` has no title separator")]
    MalformedSummary(String),
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parameters: Option<String>,
}

const REQUEST_MISSION: &str = "requestMission";
const RECEIVE_MISSION: &str = "receiveMission";
const REQUEST_PLACING_STATUS: &str = "requestPlacingStatus";
const RECEIVE_PLACING_STATUS: &str = "receivePlacingStatus";
const INSERT_TOWER: &str = "insertTower";
const UPGRADE_TOWER: &str = "upgradeTower";
const SELL_TOWER: &str = "sellTower";
const ROTATE_TOWER: &str = "rotateTower";
const UPDATE_COINS: &str = "updateCoins";
const UPDATE_HP: &str = "updateHP";
const UPDATE_WAVES: &str = "updateWaves";
const FINISH_MISSION: &str = "finishMission";
const SOUND: &str = "sound";

impl PeerMessage {
    /// Wire key of the message.
    #[must_use]
    pub fn key(&self) -> &'static str {
        match self {
            Self::RequestMission => REQUEST_MISSION,
            Self::ReceiveMission(_) => RECEIVE_MISSION,
            Self::RequestPlacingStatus(_) => REQUEST_PLACING_STATUS,
            Self::ReceivePlacingStatus(_) => RECEIVE_PLACING_STATUS,
            Self::InsertTower(_) => INSERT_TOWER,
            Self::UpgradeTower(_) => UPGRADE_TOWER,
            Self::SellTower(_) => SELL_TOWER,
            Self::RotateTower { .. } => ROTATE_TOWER,
            Self::UpdateCoins(_) => UPDATE_COINS,
            Self::UpdateHp(_) => UPDATE_HP,
            Self::UpdateWaves(_) => UPDATE_WAVES,
            Self::FinishMission { .. } => FINISH_MISSION,
            Self::Sound(_) => SOUND,
        }
    }

    /// Encodes the message into its JSON envelope.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let payload = match self {
            Self::RequestMission => None,
            Self::ReceiveMission(index) => Some(serde_json::json!(index)),
            Self::RequestPlacingStatus(entities) => Some(serde_json::json!(entities
                .iter()
                .map(|entity| entity.get().to_string())
                .collect::<Vec<_>>())),
            Self::ReceivePlacingStatus(state) => Some(serde_json::json!(state.to_string())),
            Self::InsertTower(kind) => Some(serde_json::json!(kind.key())),
            Self::UpgradeTower(selector) | Self::SellTower(selector) => {
                Some(serde_json::json!(selector.to_string()))
            }
            Self::RotateTower { clockwise } => Some(serde_json::json!(clockwise)),
            Self::UpdateCoins(value) | Self::UpdateHp(value) | Self::UpdateWaves(value) => {
                Some(serde_json::json!(value))
            }
            Self::FinishMission { title, message } => Some(serde_json::json!({
                "title": title,
                "message": message,
            })),
            Self::Sound(sound) => Some(serde_json::json!(sound.key())),
        };
        let envelope = Envelope {
            key: self.key().to_owned(),
            parameters: payload.map(|value| STANDARD.encode(value.to_string())),
        };
        // An envelope of two strings always serialises.
        serde_json::to_vec(&envelope).unwrap_or_default()
    }

    /// Decodes a message from its JSON envelope.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] when the envelope, key or payload is malformed.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let envelope: Envelope = serde_json::from_slice(bytes).map_err(ProtocolError::Envelope)?;
        let parameters = envelope.parameters.as_deref();

        let message = match envelope.key.as_str() {
            REQUEST_MISSION => Self::RequestMission,
            RECEIVE_MISSION => Self::ReceiveMission(payload(RECEIVE_MISSION, parameters)?),
            REQUEST_PLACING_STATUS => {
                let ids: Vec<String> = payload(REQUEST_PLACING_STATUS, parameters)?;
                Self::RequestPlacingStatus(
                    ids.iter()
                        .filter_map(|id| id.parse().ok())
                        .map(EntityId::new)
                        .collect(),
                )
            }
            RECEIVE_PLACING_STATUS => {
                let state: String = payload(RECEIVE_PLACING_STATUS, parameters)?;
                Self::ReceivePlacingStatus(state.parse()?)
            }
            INSERT_TOWER => {
                let kind: String = payload(INSERT_TOWER, parameters)?;
                Self::InsertTower(kind.parse()?)
            }
            UPGRADE_TOWER => {
                let selector: String = payload(UPGRADE_TOWER, parameters)?;
                Self::UpgradeTower(selector.parse()?)
            }
            SELL_TOWER => {
                let selector: String = payload(SELL_TOWER, parameters)?;
                Self::SellTower(selector.parse()?)
            }
            ROTATE_TOWER => Self::RotateTower {
                clockwise: payload(ROTATE_TOWER, parameters)?,
            },
            UPDATE_COINS => Self::UpdateCoins(payload(UPDATE_COINS, parameters)?),
            UPDATE_HP => Self::UpdateHp(payload(UPDATE_HP, parameters)?),
            UPDATE_WAVES => Self::UpdateWaves(payload(UPDATE_WAVES, parameters)?),
            FINISH_MISSION => {
                let (title, message) = match payload(FINISH_MISSION, parameters)? {
                    Summary::Fields { title, message } => (title, message),
                    Summary::Joined(summary) => {
                        let Some((title, message)) = summary.split_once('-') else {
                            return Err(ProtocolError::MalformedSummary(summary));
                        };
                        (title.to_owned(), message.to_owned())
                    }
                };
                Self::FinishMission { title, message }
            }
            SOUND => {
                let sound: String = payload(SOUND, parameters)?;
                Self::Sound(sound.parse()?)
            }
            _ => return Err(ProtocolError::UnknownKey(envelope.key)),
        };
        Ok(message)
    }
}

/// Summary payload; peers that join both halves with a dash are still understood.
#[derive(Deserialize)]
#[serde(untagged)]
enum Summary {
    Fields { title: String, message: String },
    Joined(String),
}

fn payload<T: DeserializeOwned>(
    key: &'static str,
    parameters: Option<&str>,
) -> Result<T, ProtocolError> {
    let encoded = parameters.ok_or(ProtocolError::MissingParameters(key))?;
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|source| ProtocolError::Encoding { key, source })?;
    serde_json::from_slice(&bytes).map_err(|source| ProtocolError::Payload { key, source })
}
