//! State transitions
//!
//! Every mutation of the fleet state is one of these methods, run by
//! [`StateStore::mutate`](super::StateStore::mutate) on a private copy of the
//! snapshot. A transition either fails before changing anything visible or
//! leaves the snapshot with no dangling routes.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::model::{
    EntityKind, Radio, RadioId, Receiver, ReceiverId, ReceiverRegistration, Registration, Relay,
    RelayId, RelayRegistration, Route, Snapshot, DEFAULT_VOLUME, MAX_VOLUME, OFF,
};

use super::error::StoreError;

/// Outcome of asking for a relay that streams a radio
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reservation {
    /// The radio is the `off` placeholder, nothing to stream
    Off,
    /// A relay already serves the radio
    Existing(RelayId),
    /// A transient relay record was created and its process must be started
    Reserved(Relay),
}

impl Reservation {
    pub fn relay_id(&self) -> Option<RelayId> {
        match self {
            Reservation::Off => None,
            Reservation::Existing(id) => Some(id.clone()),
            Reservation::Reserved(relay) => Some(relay.id()),
        }
    }
}

/// Entities removed by a sweep and the receivers it reset to `off`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub relays: Vec<RelayId>,
    pub receivers: Vec<ReceiverId>,
    pub reset: Vec<ReceiverId>,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.relays.is_empty() && self.receivers.is_empty() && self.reset.is_empty()
    }
}

fn validate_volume(volume: i64) -> Result<u16, StoreError> {
    if (0..=MAX_VOLUME as i64).contains(&volume) {
        Ok(volume as u16)
    } else {
        Err(StoreError::validation(format!(
            "invalid volume '{}', expected 0..={}",
            volume, MAX_VOLUME
        )))
    }
}

impl Snapshot {
    /// Register an entity or refresh its heartbeat
    ///
    /// Returns the entity id. For a known entity only the heartbeat changes.
    pub fn ping(
        &mut self,
        registration: &Registration,
        now: DateTime<Utc>,
    ) -> Result<String, StoreError> {
        match registration {
            Registration::Relay(reg) => self.ping_relay(reg, now).map(|id| id.to_string()),
            Registration::Receiver(reg) => self.ping_receiver(reg, now).map(|id| id.to_string()),
        }
    }

    /// Heartbeat from an externally operated relay
    pub fn ping_relay(
        &mut self,
        reg: &RelayRegistration,
        now: DateTime<Utc>,
    ) -> Result<RelayId, StoreError> {
        let id = reg.id();
        if let Some(relay) = self.relays.get_mut(&id) {
            relay.ping(now);
            return Ok(id);
        }

        if reg.host.is_empty() {
            return Err(StoreError::validation("relay host is required"));
        }
        if reg.port == 0 {
            return Err(StoreError::validation("relay port is required"));
        }

        let radio_id = reg
            .radio_uri
            .as_deref()
            .map(RadioId::from_uri)
            .filter(|radio| self.radios.contains_key(radio));

        self.relays.insert(
            id.clone(),
            Relay {
                name: reg.name.clone(),
                host: reg.host.clone(),
                port: reg.port,
                transient: false,
                last_heartbeat: now,
                radio_id,
                radio_uri: reg.radio_uri.clone(),
            },
        );

        tracing::info!(relay = %id, "Static relay registered");
        Ok(id)
    }

    /// Heartbeat from a receiver
    pub fn ping_receiver(
        &mut self,
        reg: &ReceiverRegistration,
        now: DateTime<Utc>,
    ) -> Result<ReceiverId, StoreError> {
        let id = reg.id();
        if let Some(receiver) = self.receivers.get_mut(&id) {
            receiver.ping(now);
            return Ok(id);
        }

        if reg.name.is_empty() {
            return Err(StoreError::validation("receiver name is required"));
        }
        let volume = match reg.volume {
            Some(volume) => validate_volume(volume as i64)?,
            None => DEFAULT_VOLUME,
        };

        self.receivers.insert(
            id.clone(),
            Receiver {
                name: reg.name.clone(),
                host: reg.host.clone(),
                last_heartbeat: now,
                volume,
                relay: Route::Off,
            },
        );

        tracing::info!(receiver = %id, "Receiver registered");
        Ok(id)
    }

    /// Add a radio, replacing any radio with the same URI
    pub fn add_radio(&mut self, radio: Radio) -> Result<RadioId, StoreError> {
        if radio.uri.trim().is_empty() {
            return Err(StoreError::validation("radio uri is required"));
        }

        let id = radio.id();
        self.radios.insert(id.clone(), radio);
        Ok(id)
    }

    /// Remove a radio
    ///
    /// Transient relays serving it are removed (their receivers go `off`),
    /// static relays only lose the assignment. Returns the removed relays.
    pub fn remove_radio(&mut self, id: &RadioId) -> Result<Vec<RelayId>, StoreError> {
        if self.radios.remove(id).is_none() {
            return Err(StoreError::not_found(EntityKind::Radio, id));
        }

        let transient: Vec<RelayId> = self
            .relays
            .iter()
            .filter(|(_, relay)| relay.transient && relay.serves(id))
            .map(|(relay_id, _)| relay_id.clone())
            .collect();

        self.remove_relays(&transient);
        self.clear_orphaned_radio_routes();
        Ok(transient)
    }

    /// Route a receiver to a relay, or `off`
    pub fn assign_relay(&mut self, receiver: &ReceiverId, route: Route) -> Result<(), StoreError> {
        if !self.receivers.contains_key(receiver) {
            return Err(StoreError::not_found(EntityKind::Receiver, receiver));
        }
        if let Route::Relay(relay) = &route {
            if !self.relays.contains_key(relay) {
                return Err(StoreError::not_found(EntityKind::Relay, relay));
            }
        }

        if let Some(entry) = self.receivers.get_mut(receiver) {
            entry.relay = route;
        }
        Ok(())
    }

    /// Set a receiver's volume, which must be within `0..=1000`
    pub fn set_volume(&mut self, receiver: &ReceiverId, volume: i64) -> Result<(), StoreError> {
        let volume = validate_volume(volume)?;
        let entry = self
            .receivers
            .get_mut(receiver)
            .ok_or_else(|| StoreError::not_found(EntityKind::Receiver, receiver))?;

        entry.volume = volume;
        Ok(())
    }

    /// Remove relays and reset every receiver routed to them
    ///
    /// Returns the receivers whose route was reset.
    pub fn remove_relays(&mut self, ids: &[RelayId]) -> Vec<ReceiverId> {
        for id in ids {
            self.relays.remove(id);
        }
        self.reset_orphaned_receivers()
    }

    fn reset_orphaned_receivers(&mut self) -> Vec<ReceiverId> {
        let relays = &self.relays;
        let mut reset = Vec::new();

        for (id, receiver) in self.receivers.iter_mut() {
            let orphaned = receiver
                .relay
                .relay()
                .is_some_and(|relay| !relays.contains_key(relay));
            if orphaned {
                receiver.relay = Route::Off;
                reset.push(id.clone());
            }
        }

        reset
    }

    fn clear_orphaned_radio_routes(&mut self) {
        let radios = &self.radios;
        for relay in self.relays.values_mut() {
            if relay
                .radio_id
                .as_ref()
                .is_some_and(|radio| !radios.contains_key(radio))
            {
                relay.radio_id = None;
            }
        }
    }

    /// Evict relays and receivers whose heartbeat is older than `timeout`
    ///
    /// Static relays are never evicted. Routes to evicted relays are reset
    /// within the same transition.
    pub fn sweep(&mut self, now: DateTime<Utc>, timeout: Duration) -> SweepReport {
        let timeout = chrono::Duration::from_std(timeout).unwrap_or(chrono::Duration::MAX);
        let is_stale = |last: DateTime<Utc>| now.signed_duration_since(last) > timeout;

        let mut relays = Vec::new();
        for (id, relay) in &self.relays {
            if !is_stale(relay.last_heartbeat) {
                continue;
            }
            if relay.is_static() {
                tracing::debug!(relay = %id, "Static relay heartbeat is stale, keeping it");
            } else {
                relays.push(id.clone());
            }
        }

        let receivers: Vec<ReceiverId> = self
            .receivers
            .iter()
            .filter(|(_, receiver)| is_stale(receiver.last_heartbeat))
            .map(|(id, _)| id.clone())
            .collect();

        for id in &receivers {
            self.receivers.remove(id);
        }
        let reset = self.remove_relays(&relays);
        self.clear_orphaned_radio_routes();

        SweepReport {
            relays,
            receivers,
            reset,
        }
    }

    /// Find the relay serving `radio`, or reserve a new transient one
    ///
    /// When `receiver` is given its route is set to the resulting relay in the
    /// same transition, so the relay is never observed without listeners.
    /// Ports of `held` relays are not handed out even when their record is
    /// gone, since their process may still be bound.
    pub fn reserve_relay(
        &mut self,
        radio: &RadioId,
        receiver: Option<&ReceiverId>,
        host: &str,
        base_port: u16,
        held: &HashSet<RelayId>,
        now: DateTime<Utc>,
    ) -> Result<Reservation, StoreError> {
        if let Some(receiver) = receiver {
            if !self.receivers.contains_key(receiver) {
                return Err(StoreError::not_found(EntityKind::Receiver, receiver));
            }
        }

        let reservation = if radio.as_str() == OFF {
            Reservation::Off
        } else {
            let entry = self
                .radios
                .get(radio)
                .ok_or_else(|| StoreError::not_found(EntityKind::Radio, radio))?;
            let (is_off, uri) = (entry.is_off(), entry.uri.clone());

            if is_off {
                Reservation::Off
            } else if let Some(existing) = self.relay_serving(radio) {
                Reservation::Existing(existing)
            } else {
                let port = self.free_port(host, base_port, held)?;
                let relay = Relay {
                    name: host.to_string(),
                    host: host.to_string(),
                    port,
                    transient: true,
                    last_heartbeat: now,
                    radio_id: Some(radio.clone()),
                    radio_uri: Some(uri),
                };
                self.relays.insert(relay.id(), relay.clone());
                Reservation::Reserved(relay)
            }
        };

        if let Some(receiver) = receiver.and_then(|id| self.receivers.get_mut(id)) {
            receiver.relay = reservation.relay_id().map(Route::Relay).unwrap_or_default();
        }

        Ok(reservation)
    }

    /// Lowest port at or above `base` not used by a relay on `host`
    fn free_port(&self, host: &str, base: u16, held: &HashSet<RelayId>) -> Result<u16, StoreError> {
        let used: HashSet<u16> = self
            .relays
            .values()
            .filter(|relay| relay.host == host)
            .map(|relay| relay.port)
            .collect();

        (base..=u16::MAX)
            .find(|port| !used.contains(port) && !held.contains(&RelayId::new(host, *port)))
            .ok_or_else(|| StoreError::PortsExhausted {
                host: host.to_string(),
            })
    }

    /// Maintenance pass over transient relays
    ///
    /// Refreshes the heartbeat of relays whose process is `alive` and removes
    /// relays nobody listens to, except those still being `pending` spawn.
    /// Returns the removed relays.
    pub fn maintain_transient(
        &mut self,
        alive: &HashSet<RelayId>,
        pending: &HashSet<RelayId>,
        now: DateTime<Utc>,
    ) -> Vec<RelayId> {
        for (id, relay) in self.relays.iter_mut() {
            if relay.transient && alive.contains(id) {
                relay.ping(now);
            }
        }

        let idle: Vec<RelayId> = self
            .relays
            .iter()
            .filter(|(id, relay)| {
                relay.transient && !pending.contains(*id) && self.listeners(id) == 0
            })
            .map(|(id, _)| id.clone())
            .collect();

        self.remove_relays(&idle);
        idle
    }

    /// Repair a snapshot loaded from disk
    ///
    /// Transient relays belonged to the previous process and are dropped;
    /// receivers routed to relays that are gone are reset.
    pub fn reconcile_after_restart(&mut self) -> SweepReport {
        let relays: Vec<RelayId> = self
            .relays
            .iter()
            .filter(|(_, relay)| relay.transient)
            .map(|(id, _)| id.clone())
            .collect();

        let reset = self.remove_relays(&relays);
        self.clear_orphaned_radio_routes();

        SweepReport {
            relays,
            receivers: Vec::new(),
            reset,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    const HOST: &str = "mesh";
    const BASE: u16 = 48110;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn secs(n: i64) -> chrono::Duration {
        chrono::Duration::seconds(n)
    }

    fn receiver_reg(name: &str) -> ReceiverRegistration {
        ReceiverRegistration {
            name: name.into(),
            host: format!("pi-{}", name),
            volume: None,
        }
    }

    fn static_relay_reg(host: &str, port: u16) -> RelayRegistration {
        RelayRegistration {
            name: host.into(),
            host: host.into(),
            port,
            radio_uri: None,
        }
    }

    fn untracked() -> HashSet<RelayId> {
        HashSet::new()
    }

    fn with_test_radio() -> (Snapshot, RadioId) {
        let mut state = Snapshot::bootstrap();
        let id = state.add_radio(Radio::new("Test", "test")).unwrap();
        (state, id)
    }

    #[test]
    fn test_ping_registers_then_refreshes() {
        let mut state = Snapshot::bootstrap();
        let id = state.ping_receiver(&receiver_reg("kitchen"), t0()).unwrap();
        let registered = state.receiver(&id).unwrap().clone();
        assert_eq!(registered.relay, Route::Off);
        assert_eq!(registered.volume, DEFAULT_VOLUME);

        // Second ping with different fields only moves the heartbeat
        let mut reg = receiver_reg("kitchen");
        reg.host = "elsewhere".into();
        reg.volume = Some(3);
        let again = state.ping_receiver(&reg, t0() + secs(5)).unwrap();

        assert_eq!(again, id);
        let refreshed = state.receiver(&id).unwrap();
        assert_eq!(refreshed.host, registered.host);
        assert_eq!(refreshed.volume, registered.volume);
        assert_eq!(refreshed.last_heartbeat, t0() + secs(5));
    }

    #[test]
    fn test_ping_relay_registers_static() {
        let mut state = Snapshot::bootstrap();
        let id = state.ping_relay(&static_relay_reg("studio", 48100), t0()).unwrap();

        let relay = state.relay(&id).unwrap();
        assert!(relay.is_static());
        assert_eq!(relay.radio_id, None);
    }

    #[test]
    fn test_ping_rejects_invalid_registration() {
        let mut state = Snapshot::bootstrap();

        let result = state.ping_relay(&static_relay_reg("studio", 0), t0());
        assert!(matches!(result, Err(StoreError::Validation(_))));

        let mut reg = receiver_reg("loud");
        reg.volume = Some(1001);
        let result = state.ping_receiver(&reg, t0());
        assert!(matches!(result, Err(StoreError::Validation(_))));
        assert!(state.receivers.is_empty());
    }

    #[test]
    fn test_volume_bounds() {
        let mut state = Snapshot::bootstrap();
        let id = state.ping_receiver(&receiver_reg("kitchen"), t0()).unwrap();

        assert!(matches!(
            state.set_volume(&id, -1),
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            state.set_volume(&id, 1001),
            Err(StoreError::Validation(_))
        ));

        state.set_volume(&id, 0).unwrap();
        assert_eq!(state.receiver(&id).unwrap().volume, 0);
        state.set_volume(&id, 1000).unwrap();
        assert_eq!(state.receiver(&id).unwrap().volume, 1000);
    }

    #[test]
    fn test_set_volume_unknown_receiver() {
        let mut state = Snapshot::bootstrap();
        let result = state.set_volume(&ReceiverId::from_name("ghost"), 10);
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn test_assign_relay_validates_target() {
        let mut state = Snapshot::bootstrap();
        let receiver = state.ping_receiver(&receiver_reg("kitchen"), t0()).unwrap();

        let result = state.assign_relay(&receiver, Route::Relay(RelayId::new("nowhere", 1)));
        assert!(matches!(
            result,
            Err(StoreError::NotFound {
                kind: EntityKind::Relay,
                ..
            })
        ));

        let relay = state.ping_relay(&static_relay_reg("studio", 48100), t0()).unwrap();
        state.assign_relay(&receiver, Route::Relay(relay.clone())).unwrap();
        assert!(state.receiver(&receiver).unwrap().relay.targets(&relay));

        // "off" is always valid
        state.assign_relay(&receiver, Route::Off).unwrap();
        assert!(state.receiver(&receiver).unwrap().relay.is_off());
    }

    #[test]
    fn test_reserve_relay_dedups_by_radio() {
        let (mut state, radio) = with_test_radio();
        let r1 = state.ping_receiver(&receiver_reg("r1"), t0()).unwrap();
        let r2 = state.ping_receiver(&receiver_reg("r2"), t0()).unwrap();

        let first = state.reserve_relay(&radio, Some(&r1), HOST, BASE, &untracked(), t0()).unwrap();
        let relay = match first {
            Reservation::Reserved(relay) => relay,
            other => panic!("expected a new relay, got {:?}", other),
        };
        assert!(relay.transient);
        assert_eq!(relay.port, BASE);

        let second = state.reserve_relay(&radio, Some(&r2), HOST, BASE, &untracked(), t0()).unwrap();
        assert_eq!(second, Reservation::Existing(relay.id()));

        assert_eq!(state.relays.len(), 1);
        assert_eq!(state.listeners(&relay.id()), 2);
        assert!(state.dangling_routes().is_empty());
    }

    #[test]
    fn test_reserve_relay_allocates_lowest_free_port() {
        let mut state = Snapshot::bootstrap();
        let a = state.add_radio(Radio::new("A", "http://a")).unwrap();
        let b = state.add_radio(Radio::new("B", "http://b")).unwrap();
        let c = state.add_radio(Radio::new("C", "http://c")).unwrap();

        let port_of = |r: Reservation| match r {
            Reservation::Reserved(relay) => relay.port,
            other => panic!("expected a new relay, got {:?}", other),
        };

        let pa = port_of(state.reserve_relay(&a, None, HOST, BASE, &untracked(), t0()).unwrap());
        let pb = port_of(state.reserve_relay(&b, None, HOST, BASE, &untracked(), t0()).unwrap());
        assert_eq!((pa, pb), (BASE, BASE + 1));

        // Freeing the lowest port makes it available again
        state.remove_relays(&[RelayId::new(HOST, BASE)]);
        let pc = port_of(state.reserve_relay(&c, None, HOST, BASE, &untracked(), t0()).unwrap());
        assert_eq!(pc, BASE);
    }

    #[test]
    fn test_reserve_relay_skips_static_relay_port() {
        let (mut state, radio) = with_test_radio();
        state.ping_relay(&static_relay_reg(HOST, BASE), t0()).unwrap();

        let reservation = state.reserve_relay(&radio, None, HOST, BASE, &untracked(), t0()).unwrap();
        assert_eq!(
            reservation.relay_id(),
            Some(RelayId::new(HOST, BASE + 1))
        );
        assert_eq!(state.relays.len(), 2);
    }

    #[test]
    fn test_reserve_relay_skips_held_ports() {
        let (mut state, radio) = with_test_radio();
        let held = HashSet::from([RelayId::new(HOST, BASE), RelayId::new("elsewhere", BASE + 1)]);

        let reservation = state.reserve_relay(&radio, None, HOST, BASE, &held, t0()).unwrap();

        assert_eq!(reservation.relay_id(), Some(RelayId::new(HOST, BASE + 1)));
    }

    #[test]
    fn test_reserve_relay_off_radio() {
        let mut state = Snapshot::bootstrap();
        let receiver = state.ping_receiver(&receiver_reg("kitchen"), t0()).unwrap();
        let off = Radio::new(OFF, OFF).id();

        let reservation = state
            .reserve_relay(&off, Some(&receiver), HOST, BASE, &untracked(), t0())
            .unwrap();
        assert_eq!(reservation, Reservation::Off);

        let literal = state
            .reserve_relay(
                &RadioId::parse(OFF),
                Some(&receiver),
                HOST,
                BASE,
                &HashSet::new(),
                t0(),
            )
            .unwrap();
        assert_eq!(literal, Reservation::Off);
        assert!(state.relays.is_empty());
    }

    #[test]
    fn test_reserve_relay_unknown_radio_changes_nothing() {
        let mut state = Snapshot::bootstrap();
        let before = state.clone();
        let unknown = RadioId::from_uri("nope");
        let result = state.reserve_relay(&unknown, None, HOST, BASE, &untracked(), t0());

        assert!(matches!(
            result,
            Err(StoreError::NotFound {
                kind: EntityKind::Radio,
                ..
            })
        ));
        assert_eq!(state, before);
    }

    #[test]
    fn test_sweep_evicts_stale_and_cascades() {
        let (mut state, radio) = with_test_radio();
        let r1 = state.ping_receiver(&receiver_reg("r1"), t0()).unwrap();
        let r2 = state.ping_receiver(&receiver_reg("r2"), t0()).unwrap();
        let reservation = state
            .reserve_relay(&radio, Some(&r1), HOST, BASE, &untracked(), t0())
            .unwrap();
        let relay = reservation.relay_id().unwrap();
        state.assign_relay(&r2, Route::Relay(relay.clone())).unwrap();

        // Receivers keep pinging, the relay does not
        let later = t0() + secs(61);
        state.ping_receiver(&receiver_reg("r1"), later).unwrap();
        state.ping_receiver(&receiver_reg("r2"), later).unwrap();

        let report = state.sweep(later, Duration::from_secs(60));

        assert_eq!(report.relays, vec![relay.clone()]);
        assert!(report.receivers.is_empty());
        assert_eq!(report.reset.len(), 2);
        assert!(state.relay(&relay).is_none());
        assert!(state.receiver(&r1).unwrap().relay.is_off());
        assert!(state.receiver(&r2).unwrap().relay.is_off());
        assert!(state.dangling_routes().is_empty());
    }

    #[test]
    fn test_sweep_keeps_static_relays() {
        let mut state = Snapshot::bootstrap();
        let relay = state.ping_relay(&static_relay_reg("studio", 48100), t0()).unwrap();
        let receiver = state.ping_receiver(&receiver_reg("kitchen"), t0()).unwrap();
        state.assign_relay(&receiver, Route::Relay(relay.clone())).unwrap();

        let later = t0() + secs(600);
        state.ping_receiver(&receiver_reg("kitchen"), later).unwrap();
        let report = state.sweep(later, Duration::from_secs(60));

        assert!(report.is_empty());
        assert!(state.relay(&relay).is_some());
        assert!(state.receiver(&receiver).unwrap().relay.targets(&relay));
    }

    #[test]
    fn test_sweep_respects_timeout_window() {
        let mut state = Snapshot::bootstrap();
        let receiver = state.ping_receiver(&receiver_reg("kitchen"), t0()).unwrap();

        let report = state.sweep(t0() + secs(60), Duration::from_secs(60));
        assert!(report.is_empty());

        let report = state.sweep(t0() + secs(61), Duration::from_secs(60));
        assert_eq!(report.receivers, vec![receiver]);
        assert!(state.receivers.is_empty());
    }

    #[test]
    fn test_remove_radio_cascades() {
        let (mut state, radio) = with_test_radio();
        let receiver = state.ping_receiver(&receiver_reg("kitchen"), t0()).unwrap();
        let reservation = state
            .reserve_relay(&radio, Some(&receiver), HOST, BASE, &untracked(), t0())
            .unwrap();
        let transient = reservation.relay_id().unwrap();

        let mut reg = static_relay_reg("studio", 48100);
        reg.radio_uri = Some("test".into());
        let fixed = state.ping_relay(&reg, t0()).unwrap();
        assert!(state.relay(&fixed).unwrap().serves(&radio));

        let removed = state.remove_radio(&radio).unwrap();

        assert_eq!(removed, vec![transient.clone()]);
        assert!(state.relay(&transient).is_none());
        assert_eq!(state.relay(&fixed).unwrap().radio_id, None);
        assert!(state.receiver(&receiver).unwrap().relay.is_off());
        assert!(state.dangling_routes().is_empty());

        let again = state.remove_radio(&radio);
        assert!(matches!(again, Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn test_maintain_transient_reclaims_idle() {
        let (mut state, radio) = with_test_radio();
        let receiver = state.ping_receiver(&receiver_reg("kitchen"), t0()).unwrap();
        let relay = state
            .reserve_relay(&radio, Some(&receiver), HOST, BASE, &untracked(), t0())
            .unwrap()
            .relay_id()
            .unwrap();
        let alive: HashSet<RelayId> = [relay.clone()].into();
        let none = HashSet::new();

        // Listened to: kept and heartbeat refreshed
        let later = t0() + secs(30);
        assert!(state.maintain_transient(&alive, &none, later).is_empty());
        assert_eq!(state.relay(&relay).unwrap().last_heartbeat, later);

        // Pending spawns are never reclaimed
        state.assign_relay(&receiver, Route::Off).unwrap();
        let pending: HashSet<RelayId> = [relay.clone()].into();
        assert!(state.maintain_transient(&alive, &pending, later).is_empty());

        let removed = state.maintain_transient(&alive, &none, later);
        assert_eq!(removed, vec![relay.clone()]);
        assert!(state.relays.is_empty());
        assert!(state.radio(&radio).is_some());
    }

    #[test]
    fn test_reconcile_after_restart() {
        let (mut state, radio) = with_test_radio();
        let receiver = state.ping_receiver(&receiver_reg("kitchen"), t0()).unwrap();
        state
            .reserve_relay(&radio, Some(&receiver), HOST, BASE, &untracked(), t0())
            .unwrap();
        let fixed = state.ping_relay(&static_relay_reg("studio", 48100), t0()).unwrap();

        let report = state.reconcile_after_restart();

        assert_eq!(report.relays.len(), 1);
        assert_eq!(report.reset, vec![receiver.clone()]);
        assert!(state.relay(&fixed).is_some());
        assert!(state.receiver(&receiver).unwrap().relay.is_off());
    }
}
