// Shared tuning defaults used by the engine core and the native demo host.

// Echo propagation
pub const SPEED_OF_SOUND: f32 = 343.0; // distance units per second
pub const MAX_ECHO_DISTANCE: f32 = 20.0; // directional probe range
pub const ECHO_CAST_RADIUS: f32 = 0.2; // thickness of the directional probe
pub const ECHO_LIFETIME_SEC: f32 = 5.0; // spawned echo voices auto-release after this
pub const ECHO_CLIP_DURATION_SEC: f32 = 1.2; // length of the echo clip, part of the busy window

// Local-area detection
pub const DETECT_RADIUS: f32 = 0.1; // overlap radius around the ping origin

// Emission feedback
pub const FLASH_INTENSITY: f32 = 2.0;
pub const FLASH_RANGE: f32 = 8.0;
pub const FLASH_DURATION_SEC: f32 = 0.25;

// Pulse animation
pub const PULSE_SPEED: f32 = 5.0; // radius units per second while expanding
pub const PULSE_MAX_RADIUS: f32 = 20.0;
pub const PULSE_WIDTH: f32 = 0.5; // ring thickness forwarded to surfaces
pub const PULSE_FADE_SEC: f32 = 0.75; // fade-out duration after full expansion

// Microphone trigger
pub const MIC_SENSITIVITY: f32 = 0.1; // peak amplitude threshold
pub const MIC_CHECK_INTERVAL_SEC: f32 = 0.1;
pub const MIC_SAMPLE_WINDOW: usize = 128; // samples per peak measurement

// Probes accept a layer mask; all bits set matches everything.
pub const LAYER_ALL: u32 = u32::MAX;
