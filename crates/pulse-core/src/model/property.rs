// ── Property keys ──
//
// Dotted paths from the projector's property namespace, plus the
// synthetic keys the cache derives from composite values.

// ── Device properties ───────────────────────────────────────────────

pub const SYSTEM_STATE: &str = "system.state";
pub const SYSTEM_TARGETSTATE: &str = "system.targetstate";
pub const SYSTEM_MODELNAME: &str = "system.modelname";
pub const SYSTEM_SERIALNUMBER: &str = "system.serialnumber";

pub const INLET_TEMPERATURE: &str = "environment.temperature.inlet.value";
pub const OUTLET_TEMPERATURE: &str = "environment.temperature.outlet.value";
pub const MAINBOARD_TEMPERATURE: &str = "environment.temperature.mainboard.value";

pub const LASER_STATUS: &str = "illumination.sources.laser.status";
pub const ILLUMINATION_STATE: &str = "illumination.state";

/// `{"active": bool, "name": string}`; stored only as its derived keys.
pub const HDMI_SIGNAL: &str = "image.connector.hdmi.detectedsignal";
/// `{"pixels": n, "lines": n}`; stored only as its derived keys.
pub const OUTPUT_SIZE: &str = "image.resolution.processing.size";

pub const MAIN_SOURCE: &str = "image.window.main.source";
/// Cache key for the `image.source.list` result.
pub const SOURCE_LIST: &str = "image.source.list";

// ── Derived keys ────────────────────────────────────────────────────

pub const INPUT_ACTIVE: &str = "input_active";
pub const INPUT_SIGNAL: &str = "input_signal";
pub const OUTPUT_HRES: &str = "output_hres";
pub const OUTPUT_VRES: &str = "output_vres";
pub const OUTPUT_RES: &str = "output_res";
pub const ILLUMINATION: &str = "illumination";
pub const LASER: &str = "laser";

// ── Property sets ───────────────────────────────────────────────────

/// Subscribed at handshake and fetched in bulk right after.
pub const SUBSCRIBED: &[&str] = &[
    SYSTEM_STATE,
    SYSTEM_TARGETSTATE,
    INLET_TEMPERATURE,
    OUTLET_TEMPERATURE,
    MAINBOARD_TEMPERATURE,
    LASER_STATUS,
    HDMI_SIGNAL,
    OUTPUT_SIZE,
    ILLUMINATION_STATE,
    MAIN_SOURCE,
];

/// Fetched on every poll.
pub const POLLED: &[&str] = &[SYSTEM_STATE, SYSTEM_TARGETSTATE];

/// Read during the handshake probe.
pub const IDENTITY: &[&str] = &[SYSTEM_MODELNAME, SYSTEM_SERIALNUMBER];

/// Keys the entity layer can bind sensors to.
pub const SENSORS: &[&str] = &[
    SYSTEM_STATE,
    SYSTEM_TARGETSTATE,
    INLET_TEMPERATURE,
    OUTLET_TEMPERATURE,
    MAINBOARD_TEMPERATURE,
    LASER_STATUS,
    LASER,
    ILLUMINATION_STATE,
    ILLUMINATION,
    INPUT_ACTIVE,
    INPUT_SIGNAL,
    OUTPUT_HRES,
    OUTPUT_VRES,
    OUTPUT_RES,
    MAIN_SOURCE,
];

pub fn is_temperature(property: &str) -> bool {
    matches!(
        property,
        INLET_TEMPERATURE | OUTLET_TEMPERATURE | MAINBOARD_TEMPERATURE
    )
}
