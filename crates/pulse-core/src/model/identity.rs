// ── Device identity ──

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::property::{SYSTEM_MODELNAME, SYSTEM_SERIALNUMBER};

pub const VENDOR: &str = "Barco";

/// Who the projector is, read once during the handshake probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub vendor: String,
    pub model: Option<String>,
    pub serial: String,
}

impl DeviceIdentity {
    /// Build from the `property.get` result for model and serial number.
    ///
    /// Returns `None` when the serial is missing or blank.
    pub fn from_probe(result: &Value) -> Option<Self> {
        let serial = scalar_text(result.get(SYSTEM_SERIALNUMBER)?)?;
        if serial.is_empty() {
            return None;
        }
        let model = result.get(SYSTEM_MODELNAME).and_then(scalar_text);

        Some(Self {
            vendor: VENDOR.into(),
            model,
            serial,
        })
    }

    /// Stable identifier, `"{vendor}:{serial}"`.
    pub fn device_id(&self) -> String {
        format!("{}:{}", self.vendor, self.serial)
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.model {
            Some(model) => write!(f, "{} {model} ({})", self.vendor, self.serial),
            None => write!(f, "{} ({})", self.vendor, self.serial),
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_owned()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
