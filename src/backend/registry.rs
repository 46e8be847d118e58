//! Runtime driver probing for the hardware slots

use std::collections::HashMap;

use crate::error::{EngineError, Result};

use super::accelerated::AccelDriver;
use super::macroquad_driver::MacroquadDriver;
use super::BackendKind;

/// Opens a driver; fails when the device is not present
pub type DriverFactory = Box<dyn Fn() -> Result<Box<dyn AccelDriver>>>;

/// Drivers the host knows how to open, one per hardware slot
#[derive(Default)]
pub struct DriverRegistry {
    factories: HashMap<BackendKind, DriverFactory>,
}

impl DriverRegistry {
    /// No drivers: only the software backend is available
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the macroquad driver in slot A. Only usable inside a
    /// macroquad window.
    pub fn with_macroquad() -> Self {
        let mut registry = Self::new();
        registry.register(
            BackendKind::HardwareA,
            Box::new(|| Ok(Box::new(MacroquadDriver::new()) as Box<dyn AccelDriver>)),
        );
        registry
    }

    /// Install a driver for a hardware slot, replacing any previous one.
    /// The software slot cannot be overridden.
    pub fn register(&mut self, kind: BackendKind, factory: DriverFactory) {
        if !kind.is_hardware() {
            log::warn!("ignoring driver registration for the software slot");
            return;
        }
        self.factories.insert(kind, factory);
    }

    pub fn is_available(&self, kind: BackendKind) -> bool {
        !kind.is_hardware() || self.factories.contains_key(&kind)
    }

    /// Open the driver for `kind`
    pub fn probe(&self, kind: BackendKind) -> Result<Box<dyn AccelDriver>> {
        let factory = self
            .factories
            .get(&kind)
            .ok_or_else(|| EngineError::BackendUnavailable(format!("{}: no driver registered", kind)))?;
        factory().map_err(|e| match e {
            EngineError::BackendUnavailable(_) => e,
            other => EngineError::BackendUnavailable(format!("{}: {}", kind, other)),
        })
    }
}
