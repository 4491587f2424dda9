//! Full fleet state
//!
//! A [`Snapshot`] is what gets serialized for `GET /config`, pushed over
//! `/ws/config` and written to the cache file. Routing edges live on the
//! entities themselves (`Relay::radio_id`, `Receiver::relay`); [`Routes`]
//! is the derived map view.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::entity::{Radio, Receiver, Relay};
use super::id::{RadioId, ReceiverId, RelayId, Route, OFF};

/// State of the whole fleet at one instant
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub radios: BTreeMap<RadioId, Radio>,
    #[serde(default)]
    pub relays: BTreeMap<RelayId, Relay>,
    #[serde(default)]
    pub receivers: BTreeMap<ReceiverId, Receiver>,
}

/// Routing maps derived from a snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Routes {
    pub relays: BTreeMap<RelayId, RadioId>,
    pub receivers: BTreeMap<ReceiverId, Route>,
}

/// A route whose target is not in the snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DanglingRoute {
    Relay { relay: RelayId, radio: RadioId },
    Receiver { receiver: ReceiverId, relay: RelayId },
}

impl Snapshot {
    /// Empty state holding only the bootstrap `off` radio
    pub fn bootstrap() -> Self {
        let mut snapshot = Self::default();
        let off = Radio::new(OFF, OFF);
        snapshot.radios.insert(off.id(), off);
        snapshot
    }

    pub fn radio(&self, id: &RadioId) -> Option<&Radio> {
        self.radios.get(id)
    }

    pub fn relay(&self, id: &RelayId) -> Option<&Relay> {
        self.relays.get(id)
    }

    pub fn receiver(&self, id: &ReceiverId) -> Option<&Receiver> {
        self.receivers.get(id)
    }

    /// Number of receivers routed to `relay`
    pub fn listeners(&self, relay: &RelayId) -> usize {
        self.receivers
            .values()
            .filter(|r| r.relay.targets(relay))
            .count()
    }

    /// First relay already serving `radio`
    pub fn relay_serving(&self, radio: &RadioId) -> Option<RelayId> {
        self.relays
            .iter()
            .find(|(_, relay)| relay.serves(radio))
            .map(|(id, _)| id.clone())
    }

    pub fn routes(&self) -> Routes {
        Routes {
            relays: self
                .relays
                .iter()
                .filter_map(|(id, r)| r.radio_id.clone().map(|radio| (id.clone(), radio)))
                .collect(),
            receivers: self
                .receivers
                .iter()
                .map(|(id, r)| (id.clone(), r.relay.clone()))
                .collect(),
        }
    }

    /// Routes pointing at entities that do not exist in this snapshot
    pub fn dangling_routes(&self) -> Vec<DanglingRoute> {
        let routes = self.routes();
        let mut dangling = Vec::new();

        for (relay, radio) in routes.relays {
            if !self.radios.contains_key(&radio) {
                dangling.push(DanglingRoute::Relay { relay, radio });
            }
        }
        for (receiver, route) in routes.receivers {
            if let Route::Relay(relay) = route {
                if !self.relays.contains_key(&relay) {
                    dangling.push(DanglingRoute::Receiver { receiver, relay });
                }
            }
        }

        dangling
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn test_bootstrap_has_off_radio() {
        let snapshot = Snapshot::bootstrap();
        assert_eq!(snapshot.radios.len(), 1);
        assert!(snapshot.radios.values().all(Radio::is_off));
        assert!(snapshot.relays.is_empty());
        assert!(snapshot.receivers.is_empty());
    }

    #[test]
    fn test_dangling_routes_detected() {
        let mut snapshot = Snapshot::bootstrap();
        let receiver = Receiver {
            name: "kitchen".into(),
            host: "pi".into(),
            last_heartbeat: Utc::now(),
            volume: 1000,
            relay: Route::Relay(RelayId::new("gone", 1)),
        };
        snapshot.receivers.insert(receiver.id(), receiver);

        let dangling = snapshot.dangling_routes();
        assert_eq!(dangling.len(), 1);
        assert!(matches!(dangling[0], DanglingRoute::Receiver { .. }));
    }

    #[test]
    fn test_wire_format_field_names() {
        let snapshot = Snapshot::bootstrap();
        let json: serde_json::Value = serde_json::to_value(&snapshot).unwrap();

        assert!(json.get("radios").is_some());
        assert!(json.get("relays").is_some());
        assert!(json.get("receivers").is_some());
    }

    #[test]
    fn test_missing_sections_default_to_empty() {
        let snapshot: Snapshot = serde_json::from_str("{}").unwrap();
        assert_eq!(snapshot, Snapshot::default());
    }
}
