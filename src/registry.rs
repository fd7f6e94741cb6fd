//! Device registry
//!
//! Owns the set of paired devices and the listeners that receive their readings.
//! The registry is a plain value: whoever holds it serializes access, so there is
//! no global state and no locking.

use crate::error::TelemetryError;
use crate::types::{ConnectionState, Device, Reading};
use std::collections::HashMap;
use std::sync::mpsc::Sender;
use tracing::{debug, info};

/// Receiver of decoded readings
pub trait ReadingListener: Send {
    fn on_reading(&mut self, reading: &Reading);
}

impl<F> ReadingListener for F
where
    F: FnMut(&Reading) + Send,
{
    fn on_reading(&mut self, reading: &Reading) {
        self(reading)
    }
}

/// Listener that forwards readings into an mpsc channel
pub struct ChannelListener {
    sender: Sender<Reading>,
}

impl ChannelListener {
    pub fn new(sender: Sender<Reading>) -> Self {
        Self { sender }
    }
}

impl ReadingListener for ChannelListener {
    fn on_reading(&mut self, reading: &Reading) {
        if self.sender.send(reading.clone()).is_err() {
            debug!("reading channel closed, dropping reading");
        }
    }
}

/// Handle returned by [`DeviceRegistry::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Registry of paired devices and reading listeners
#[derive(Default)]
pub struct DeviceRegistry {
    devices: HashMap<String, Device>,
    listeners: Vec<(ListenerId, Box<dyn ReadingListener>)>,
    next_listener_id: u64,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a device, replacing any previous entry with the same id
    pub fn register(&mut self, device: Device) -> Option<Device> {
        info!(device_id = %device.id, name = %device.name, "device registered");
        self.devices.insert(device.id.clone(), device)
    }

    pub fn unregister(&mut self, device_id: &str) -> Option<Device> {
        let removed = self.devices.remove(device_id);
        if removed.is_some() {
            info!(device_id, "device unregistered");
        }
        removed
    }

    pub fn get(&self, device_id: &str) -> Option<&Device> {
        self.devices.get(device_id)
    }

    pub fn contains(&self, device_id: &str) -> bool {
        self.devices.contains_key(device_id)
    }

    /// Registered devices sorted by id
    pub fn devices(&self) -> Vec<&Device> {
        let mut devices: Vec<&Device> = self.devices.values().collect();
        devices.sort_by(|a, b| a.id.cmp(&b.id));
        devices
    }

    /// Devices owned by a user, sorted by id
    pub fn devices_for_user(&self, user_id: &str) -> Vec<&Device> {
        self.devices()
            .into_iter()
            .filter(|d| d.user_id.as_deref() == Some(user_id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn set_state(
        &mut self,
        device_id: &str,
        state: ConnectionState,
    ) -> Result<(), TelemetryError> {
        let device = self
            .devices
            .get_mut(device_id)
            .ok_or_else(|| TelemetryError::UnknownDevice(device_id.to_string()))?;
        if device.state != state {
            info!(device_id, ?state, "device connection state changed");
            device.state = state;
        }
        Ok(())
    }

    /// Apply side effects of a reading to its device (battery level, capabilities)
    pub fn observe(&mut self, reading: &Reading) -> Result<(), TelemetryError> {
        let device = self
            .devices
            .get_mut(reading.device_id())
            .ok_or_else(|| TelemetryError::UnknownDevice(reading.device_id().to_string()))?;

        let capability = reading.capability();
        if !device.supports(capability) {
            device.capabilities.push(capability);
        }
        if let Reading::Battery(battery) = reading {
            device.battery_level = Some(battery.level_percent);
        }
        Ok(())
    }

    pub fn subscribe(&mut self, listener: impl ReadingListener + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener, returning whether it was registered
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Deliver a reading to every listener in subscription order
    pub fn dispatch(&mut self, reading: &Reading) {
        for (_, listener) in self.listeners.iter_mut() {
            listener.on_reading(reading);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BatteryReading, Capability};
    use chrono::Utc;
    use std::sync::mpsc;
    use std::sync::{Arc, Mutex};

    fn battery(device_id: &str, level: u8) -> Reading {
        Reading::Battery(BatteryReading {
            device_id: device_id.to_string(),
            timestamp: Utc::now(),
            level_percent: level,
        })
    }

    #[test]
    fn test_register_and_unregister() {
        let mut registry = DeviceRegistry::new();
        assert!(registry.register(Device::new("b", "Strap")).is_none());
        assert!(registry.register(Device::new("a", "Pod")).is_none());
        assert!(registry.register(Device::new("a", "Pod v2")).is_some());

        let ids: Vec<&str> = registry.devices().iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(registry.get("a").unwrap().name, "Pod v2");

        assert!(registry.unregister("a").is_some());
        assert!(registry.unregister("a").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_devices_for_user() {
        let mut registry = DeviceRegistry::new();
        registry.register(Device::new("a", "Strap").with_user_id("u1"));
        registry.register(Device::new("b", "Pod").with_user_id("u2"));
        registry.register(Device::new("c", "Watch"));

        let owned = registry.devices_for_user("u1");
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].id, "a");
    }

    #[test]
    fn test_observe_updates_battery_and_capabilities() {
        let mut registry = DeviceRegistry::new();
        registry.register(Device::new("strap", "Strap"));

        registry.observe(&battery("strap", 42)).unwrap();

        let device = registry.get("strap").unwrap();
        assert_eq!(device.battery_level, Some(42));
        assert!(device.supports(Capability::BatteryLevel));
    }

    #[test]
    fn test_observe_unknown_device() {
        let mut registry = DeviceRegistry::new();
        let err = registry.observe(&battery("ghost", 10)).unwrap_err();
        assert!(matches!(err, TelemetryError::UnknownDevice(id) if id == "ghost"));
    }

    #[test]
    fn test_set_state() {
        let mut registry = DeviceRegistry::new();
        registry.register(Device::new("strap", "Strap"));
        registry
            .set_state("strap", ConnectionState::Disconnected)
            .unwrap();
        assert_eq!(
            registry.get("strap").unwrap().state,
            ConnectionState::Disconnected
        );
        assert!(registry
            .set_state("missing", ConnectionState::Connected)
            .is_err());
    }

    #[test]
    fn test_channel_listener_receives_readings() {
        let mut registry = DeviceRegistry::new();
        let (tx, rx) = mpsc::channel();
        registry.subscribe(ChannelListener::new(tx));

        registry.dispatch(&battery("strap", 77));

        let received = rx.try_recv().unwrap();
        assert_eq!(received.device_id(), "strap");
    }

    #[test]
    fn test_closure_listener_and_unsubscribe() {
        let mut registry = DeviceRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let id = registry.subscribe(move |reading: &Reading| {
            sink.lock().unwrap().push(reading.device_id().to_string());
        });

        registry.dispatch(&battery("a", 1));
        assert!(registry.unsubscribe(id));
        assert!(!registry.unsubscribe(id));
        registry.dispatch(&battery("b", 2));

        assert_eq!(*seen.lock().unwrap(), vec!["a".to_string()]);
        assert_eq!(registry.listener_count(), 0);
    }

    #[test]
    fn test_dropped_channel_does_not_panic() {
        let mut registry = DeviceRegistry::new();
        let (tx, rx) = mpsc::channel();
        registry.subscribe(ChannelListener::new(tx));
        drop(rx);

        registry.dispatch(&battery("strap", 5));
    }
}
