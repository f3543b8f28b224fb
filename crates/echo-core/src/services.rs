//! Collaborator contracts the engine depends on.
//!
//! The core never talks to a physics scene, an audio device, or a renderer
//! directly. Hosts inject implementations of these traits at construction,
//! which keeps the temporal logic testable against recording fakes and keeps
//! platform concerns out of this crate.

use glam::Vec3;
use smallvec::SmallVec;

/// Identity of a scene actor reported by an overlap query.
pub type ActorId = u32;

/// Bitmask restricting which scene layers a probe may hit.
pub type LayerMask = u32;

/// Opaque identity of one render target receiving pulse parameters.
pub type SurfaceId = u32;

/// Result of a directional probe against the scene.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProbeHit {
    pub distance: f32,
    pub point: Vec3,
    pub normal: Vec3,
}

/// Spatial queries against the host scene.
pub trait SpatialProbe {
    /// All actors within `radius` of `point`, filtered by `mask`.
    fn overlap(&self, point: Vec3, radius: f32, mask: LayerMask) -> SmallVec<[ActorId; 8]>;

    /// Nearest obstruction along `direction` from `origin`, probing with a
    /// sphere of `cast_radius` up to `max_distance`. `direction` is unit
    /// length. Returns `None` when nothing is hit.
    fn cast(
        &self,
        origin: Vec3,
        direction: Vec3,
        cast_radius: f32,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<ProbeHit>;
}

/// Handle to one spatialized echo playback, valid until released.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EchoVoice(pub u32);

/// Audio side effects. Implementations with no clip configured log a
/// diagnostic and skip playback instead of failing.
pub trait AudioPlayback {
    /// Play the emission ping at the listener, immediately.
    fn play_ping(&self);

    /// Start a spatialized echo at `point`. `None` when playback could not
    /// start (missing clip, no device).
    fn play_echo_at(&self, point: Vec3) -> Option<EchoVoice>;

    /// Stop and free a voice previously returned by [`Self::play_echo_at`].
    fn release(&self, voice: EchoVoice);
}

/// Non-audio emission feedback.
pub trait VisualFeedback {
    fn flash(&self, intensity: f32, range: f32, duration: f32);

    /// Spawn a particle burst at `position`, oriented along `orientation`.
    fn spawn_particle(&self, position: Vec3, orientation: Vec3);
}

/// Parameter block broadcast to every pulse surface each animation frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PulseParamsBlock {
    pub origin: Vec3,
    pub width: f32,
    pub radius: f32,
}

/// Renderer broadcast target. `resolve` is called once at startup; `write`
/// once per surface per animation frame.
pub trait PulseSurfaces {
    fn resolve(&self, shader_tag: &str) -> Vec<SurfaceId>;
    fn write(&self, surface: SurfaceId, params: &PulseParamsBlock);
}

/// Polled amplitude monitor feeding the microphone trigger.
///
/// `peak` reports the peak level of the most recent capture window, or
/// `Some(0.0)` while the window is not yet filled. `None` means the device
/// is gone and the trigger should disable itself.
pub trait AmplitudeSource {
    fn peak(&mut self) -> Option<f32>;
}
