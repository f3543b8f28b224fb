//! Directional echo simulation.
//!
//! A sphere probe is cast along the ping direction; a hit at distance `d`
//! schedules the echo reply `d / speed_of_sound` seconds later, simulating
//! sound travel time to the obstruction and back to the listener's ear.

use std::cell::Cell;
use std::rc::Rc;

use glam::Vec3;

use crate::constants::{
    ECHO_CAST_RADIUS, ECHO_LIFETIME_SEC, LAYER_ALL, MAX_ECHO_DISTANCE, SPEED_OF_SOUND,
};
use crate::error::{require_non_negative, require_positive, EchoError};
use crate::scheduler::EffectScheduler;
use crate::services::{AudioPlayback, LayerMask, ProbeHit, SpatialProbe, VisualFeedback};

#[derive(Clone, Debug)]
pub struct EchoParams {
    /// Distance units per second; the delay divisor. Configurable, not
    /// domain law.
    pub speed_of_sound: f32,
    pub max_distance: f32,
    pub cast_radius: f32,
    pub mask: LayerMask,
    /// Seconds a spawned echo voice lives before it is released.
    pub echo_lifetime: f32,
}

impl Default for EchoParams {
    fn default() -> Self {
        Self {
            speed_of_sound: SPEED_OF_SOUND,
            max_distance: MAX_ECHO_DISTANCE,
            cast_radius: ECHO_CAST_RADIUS,
            mask: LAYER_ALL,
            echo_lifetime: ECHO_LIFETIME_SEC,
        }
    }
}

impl EchoParams {
    pub fn validate(&self) -> Result<(), EchoError> {
        require_positive("speed_of_sound", self.speed_of_sound)?;
        require_positive("max_distance", self.max_distance)?;
        require_non_negative("cast_radius", self.cast_radius)?;
        require_non_negative("echo_lifetime", self.echo_lifetime)
    }
}

/// What one simulation produced. `hit` is `None` when the probe found
/// nothing, which is a valid outcome, not an error.
#[derive(Clone, Copy, Debug)]
pub struct EchoOutcome {
    pub delay_seconds: f64,
    pub hit: Option<ProbeHit>,
}

impl EchoOutcome {
    pub fn found(&self) -> bool {
        self.hit.is_some()
    }
}

/// Issues the directional probe and schedules the delayed echo reply.
pub struct EchoSimulator {
    probe: Rc<dyn SpatialProbe>,
    audio: Rc<dyn AudioPlayback>,
    visual: Rc<dyn VisualFeedback>,
    params: EchoParams,
}

impl EchoSimulator {
    pub fn new(
        probe: Rc<dyn SpatialProbe>,
        audio: Rc<dyn AudioPlayback>,
        visual: Rc<dyn VisualFeedback>,
        params: EchoParams,
    ) -> Result<Self, EchoError> {
        params.validate()?;
        Ok(Self {
            probe,
            audio,
            visual,
            params,
        })
    }

    pub fn params(&self) -> &EchoParams {
        &self.params
    }

    pub(crate) fn probe(&self) -> &dyn SpatialProbe {
        self.probe.as_ref()
    }

    pub(crate) fn audio(&self) -> &dyn AudioPlayback {
        self.audio.as_ref()
    }

    pub(crate) fn visual(&self) -> &dyn VisualFeedback {
        self.visual.as_ref()
    }

    /// Probe along `direction` from `origin`. On a hit, schedule three
    /// independent fire-and-forget effects: echo playback at the hit point,
    /// a particle burst against the surface, and the voice release once the
    /// echo clip's lifetime is over. Collaborator failures are logged and
    /// swallowed here, never propagated.
    pub fn simulate(
        &self,
        scheduler: &mut EffectScheduler,
        now: f64,
        origin: Vec3,
        direction: Vec3,
    ) -> EchoOutcome {
        let direction = direction.normalize_or_zero();
        if direction == Vec3::ZERO {
            log::warn!("echo probe skipped: zero-length direction");
            return EchoOutcome {
                delay_seconds: 0.0,
                hit: None,
            };
        }

        let Some(hit) = self.probe.cast(
            origin,
            direction,
            self.params.cast_radius,
            self.params.max_distance,
            self.params.mask,
        ) else {
            log::debug!(
                "echo probe found nothing within {:.1}",
                self.params.max_distance
            );
            return EchoOutcome {
                delay_seconds: 0.0,
                hit: None,
            };
        };

        let delay = (hit.distance / self.params.speed_of_sound) as f64;
        log::debug!(
            "echo hit at {:.2} (delay {:.3}s)",
            hit.distance,
            delay
        );

        // The voice handle only exists once the playback effect has fired;
        // the release effect picks it up through this shared slot and
        // no-ops if playback never happened.
        let voice_slot = Rc::new(Cell::new(None));

        {
            let audio = Rc::clone(&self.audio);
            let slot = Rc::clone(&voice_slot);
            let point = hit.point;
            scheduler.schedule(now, delay, move || match audio.play_echo_at(point) {
                Some(voice) => slot.set(Some(voice)),
                None => log::warn!("echo playback skipped: no clip available"),
            });
        }
        {
            let visual = Rc::clone(&self.visual);
            let (point, normal) = (hit.point, hit.normal);
            scheduler.schedule(now, delay, move || visual.spawn_particle(point, normal));
        }
        {
            let audio = Rc::clone(&self.audio);
            let slot = Rc::clone(&voice_slot);
            scheduler.schedule(now, delay + self.params.echo_lifetime as f64, move || {
                if let Some(voice) = slot.take() {
                    audio.release(voice);
                }
            });
        }

        EchoOutcome {
            delay_seconds: delay,
            hit: Some(hit),
        }
    }
}
