use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::block::BlockType;
use crate::persistence::{coordinate, parse_seed, PersistenceError, SaveData};
use crate::world::{ChunkLoadReport, World};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockAction {
    Set,
    Remove,
}

/// A single block edit relayed between peers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockChangeEvent {
    pub action: BlockAction,
    pub x: i32,
    pub y: i32,
    pub z: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_id: Option<String>,
    /// Peer that made the edit; relays skip sending it back there.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

impl BlockChangeEvent {
    pub fn set(x: i32, y: i32, z: i32, block: BlockType) -> Self {
        Self {
            action: BlockAction::Set,
            x,
            y,
            z,
            type_id: Some(block.id().to_string()),
            origin: None,
        }
    }

    pub fn remove(x: i32, y: i32, z: i32) -> Self {
        Self {
            action: BlockAction::Remove,
            x,
            y,
            z,
            type_id: None,
            origin: None,
        }
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Decodes a relayed payload. Returns `None` for anything that is not a
    /// recognisable edit: bad JSON, unknown actions, non-integral coordinates.
    pub fn parse(text: &str) -> Option<Self> {
        let value: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(err) => {
                warn!("invalid block event payload: {err}");
                return None;
            }
        };
        Self::from_json_value(&value)
    }

    pub fn from_json_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let action = match object.get("action").and_then(Value::as_str)? {
            "set" => BlockAction::Set,
            "remove" => BlockAction::Remove,
            other => {
                debug!("ignoring block event with action {other:?}");
                return None;
            }
        };
        Some(Self {
            action,
            x: coordinate(object.get("x"))?,
            y: coordinate(object.get("y"))?,
            z: coordinate(object.get("z"))?,
            type_id: object
                .get("typeId")
                .and_then(Value::as_str)
                .map(str::to_string),
            origin: object
                .get("origin")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }

    pub fn to_json_string(&self) -> Result<String, PersistenceError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PeerRole {
    Host,
    Client,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlockChangeOutcome {
    pub changed: bool,
    /// The host should forward the event to every other peer.
    pub rebroadcast: bool,
    /// The host should write the world to storage.
    pub persist: bool,
}

/// Applies a remote edit. Only a host that actually changed a cell relays and
/// persists it.
pub fn apply_block_change(
    world: &mut World,
    event: &BlockChangeEvent,
    role: PeerRole,
) -> BlockChangeOutcome {
    let changed = match event.action {
        BlockAction::Set => match event.type_id.as_deref() {
            Some(id) => world.set_block(event.x, event.y, event.z, BlockType::resolve(id)),
            None => {
                warn!(
                    "set event at ({}, {}, {}) has no typeId, ignoring it",
                    event.x, event.y, event.z
                );
                false
            }
        },
        BlockAction::Remove => world.remove_block(event.x, event.y, event.z),
    };

    let relay = changed && role == PeerRole::Host;
    BlockChangeOutcome {
        changed,
        rebroadcast: relay,
        persist: relay,
    }
}

/// The world state a host hands to a joining client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshotMessage {
    pub seed: Option<u32>,
    #[serde(default)]
    pub data: Value,
}

impl WorldSnapshotMessage {
    pub fn from_world(world: &World) -> Result<Self, PersistenceError> {
        Ok(Self {
            seed: Some(world.seed()),
            data: serde_json::to_value(world.serialize())?,
        })
    }

    pub fn parse(text: &str) -> Result<Self, PersistenceError> {
        let value: Value = serde_json::from_str(text)?;
        Ok(Self {
            seed: parse_seed(value.get("seed")),
            data: value.get("data").cloned().unwrap_or(Value::Null),
        })
    }

    /// Reseeds, then replaces the client's world with the host's edits. A
    /// snapshot without data keeps the local edits but still regenerates.
    pub fn apply(&self, world: &mut World) -> ChunkLoadReport {
        if let Some(seed) = self.seed {
            world.set_seed(seed);
        }
        let data = if self.data.is_null() {
            world.serialize()
        } else {
            SaveData::from_json_value(&self.data)
        };
        world.load(&data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldConfig;

    fn test_world(seed: u32) -> World {
        World::with_seed(seed, WorldConfig::default().with_render_distance(1))
    }

    #[test]
    fn parse_accepts_whole_float_coordinates() {
        let text = r#"{"t":"block","action":"set","x":3.0,"y":40,"z":-2,
            "typeId":"glass","origin":"peer-a"}"#;
        let event = BlockChangeEvent::parse(text).expect("valid event");
        assert_eq!(event.action, BlockAction::Set);
        assert_eq!((event.x, event.y, event.z), (3, 40, -2));
        assert_eq!(event.type_id.as_deref(), Some("glass"));
        assert_eq!(event.origin.as_deref(), Some("peer-a"));
    }

    #[test]
    fn parse_rejects_malformed_events() {
        assert!(BlockChangeEvent::parse("not json").is_none());
        assert!(BlockChangeEvent::parse(r#"{"action":"explode","x":1,"y":2,"z":3}"#).is_none());
        assert!(BlockChangeEvent::parse(r#"{"action":"set","x":1.5,"y":2,"z":3}"#).is_none());
        assert!(BlockChangeEvent::parse(r#"{"action":"remove","x":1,"z":3}"#).is_none());
        assert!(BlockChangeEvent::parse("[]").is_none());
    }

    #[test]
    fn host_relays_only_real_changes() {
        let mut world = test_world(9);
        let event = BlockChangeEvent::set(4, 62, 4, BlockType::Cobblestone);

        let first = apply_block_change(&mut world, &event, PeerRole::Host);
        assert!(first.changed && first.rebroadcast && first.persist);

        let repeat = apply_block_change(&mut world, &event, PeerRole::Host);
        assert_eq!(repeat, BlockChangeOutcome::default());
    }

    #[test]
    fn client_applies_without_relaying() {
        let mut world = test_world(9);
        let outcome = apply_block_change(
            &mut world,
            &BlockChangeEvent::set(4, 62, 4, BlockType::Glass),
            PeerRole::Client,
        );
        assert!(outcome.changed);
        assert!(!outcome.rebroadcast && !outcome.persist);
        assert_eq!(world.peek_block(4, 62, 4), Some(BlockType::Glass));
    }

    #[test]
    fn set_without_type_is_ignored() {
        let mut world = test_world(9);
        let mut event = BlockChangeEvent::set(4, 62, 4, BlockType::Glass);
        event.type_id = None;
        let outcome = apply_block_change(&mut world, &event, PeerRole::Host);
        assert_eq!(outcome, BlockChangeOutcome::default());
        assert_eq!(world.modification_count(), 0);
    }

    #[test]
    fn snapshot_brings_client_to_host_state() {
        let mut host = test_world(1234);
        host.set_block(2, 62, 2, BlockType::OakPlanks);
        host.remove_block(0, 0, 0);
        let snapshot = WorldSnapshotMessage::from_world(&host).expect("snapshot");
        let text = serde_json::to_string(&snapshot).expect("encode");

        let mut client = test_world(77);
        client.set_block(9, 62, 9, BlockType::Glass);
        WorldSnapshotMessage::parse(&text)
            .expect("decode")
            .apply(&mut client);

        assert_eq!(client.seed(), 1234);
        assert_eq!(client.peek_block(2, 62, 2), Some(BlockType::OakPlanks));
        assert_eq!(client.peek_block(0, 0, 0), None);
        assert_eq!(client.peek_block(9, 62, 9), None);
        assert_eq!(client.serialize(), host.serialize());
    }
}
