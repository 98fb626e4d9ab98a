//! Per-net simulation state and multi-driver resolution.

use netsim_circuit::PinRef;
use netsim_common::Value;
use std::collections::BTreeMap;

/// Resolves every driver contribution on a net into the value readers see.
///
/// Contributions are first adapted to the net width, then combined with
/// [`Value::combine`]. With no drivers the net floats at all-`Unknown`.
pub fn resolve_drivers<'a>(width: u32, drivers: impl IntoIterator<Item = &'a Value>) -> Value {
    drivers
        .into_iter()
        .fold(Value::unknown(width), |acc, driver| {
            acc.combine(&driver.resize_to(width))
                .unwrap_or_else(|_| Value::error(width))
        })
}

/// Runtime state of one net in one circuit state.
#[derive(Clone, Debug, PartialEq)]
pub struct NetState {
    value: Value,
    previous: Value,
    drivers: BTreeMap<PinRef, Value>,
}

impl NetState {
    /// An undriven net of `width` bits.
    pub fn new(width: u32) -> Self {
        Self {
            value: Value::unknown(width),
            previous: Value::unknown(width),
            drivers: BTreeMap::new(),
        }
    }

    /// Net width in bits.
    pub fn width(&self) -> u32 {
        self.value.width()
    }

    /// The resolved value readers observe.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// The value before the most recent change.
    pub fn previous(&self) -> &Value {
        &self.previous
    }

    /// The last value `pin` asserted, if it has driven this net.
    pub fn contribution(&self, pin: PinRef) -> Option<&Value> {
        self.drivers.get(&pin)
    }

    /// Every recorded contribution, in pin order.
    pub fn drivers(&self) -> impl Iterator<Item = (PinRef, &Value)> {
        self.drivers.iter().map(|(pin, v)| (*pin, v))
    }

    /// Records what `pin` now drives, adapted to the net width.
    pub fn drive(&mut self, pin: PinRef, value: &Value) {
        let width = self.width();
        self.drivers.insert(pin, value.resize_to(width));
    }

    /// Combines the recorded contributions.
    pub fn resolve(&self) -> Value {
        resolve_drivers(self.width(), self.drivers.values())
    }

    /// Commits a newly computed value. Returns `true` if it differs from the
    /// current one.
    pub fn update(&mut self, value: Value) -> bool {
        if value == self.value {
            return false;
        }
        self.previous = std::mem::replace(&mut self.value, value);
        true
    }
}
