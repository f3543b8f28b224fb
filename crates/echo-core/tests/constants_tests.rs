// Sanity checks on tuning constants and the default parameter sets built
// from them.

use echo_core::constants::*;
use echo_core::echo::EchoParams;
use echo_core::emitter::PingParams;
use echo_core::mic::MicParams;
use echo_core::pulse::PulseParams;

#[test]
#[allow(clippy::assertions_on_constants)]
fn constants_are_within_reasonable_bounds() {
    // Propagation constants must be positive.
    assert!(SPEED_OF_SOUND > 0.0);
    assert!(MAX_ECHO_DISTANCE > 0.0);
    assert!(ECHO_CAST_RADIUS >= 0.0);
    assert!(ECHO_LIFETIME_SEC > 0.0);
    assert!(ECHO_CLIP_DURATION_SEC > 0.0);

    // The probe should not out-range the pulse visualization by much;
    // the ring is what communicates the probe's reach.
    assert!(PULSE_MAX_RADIUS >= MAX_ECHO_DISTANCE);

    // Pulse timing.
    assert!(PULSE_SPEED > 0.0);
    assert!(PULSE_WIDTH > 0.0);
    assert!(PULSE_FADE_SEC > 0.0);

    // Mic polling.
    assert!(MIC_SENSITIVITY > 0.0 && MIC_SENSITIVITY < 1.0);
    assert!(MIC_CHECK_INTERVAL_SEC > 0.0);
    assert!(MIC_SAMPLE_WINDOW > 0);
}

#[test]
fn worst_case_echo_delay_fits_inside_the_default_busy_window() {
    // Even a hit at max range must leave the gate closed until after the
    // echo clip has finished.
    let worst_delay = MAX_ECHO_DISTANCE / SPEED_OF_SOUND;
    assert!(worst_delay < 1.0, "default probe range implies sub-second delays");
    assert!(ECHO_CLIP_DURATION_SEC > worst_delay * 2.0);
}

#[test]
fn default_param_sets_validate() {
    assert!(EchoParams::default().validate().is_ok());
    assert!(PingParams::default().validate().is_ok());
    assert!(PulseParams::default().validate().is_ok());
    assert!(MicParams::default().validate().is_ok());
}

#[test]
fn default_expansion_time_matches_probe_delay_scale() {
    // Full expansion takes max_radius / speed seconds; with the defaults
    // that is a few seconds, far longer than any echo delay, so the ring
    // always outlives the audio reply.
    let expansion = PULSE_MAX_RADIUS / PULSE_SPEED;
    let worst_delay = MAX_ECHO_DISTANCE / SPEED_OF_SOUND;
    assert!(expansion > worst_delay);
}
