//! Ping emission pipeline.
//!
//! One `emit` call runs the whole sequence atomically with respect to other
//! emissions: cooldown check, local-area detection, directional echo,
//! immediate feedback, cooldown commit. Subscribers observe pings through
//! an explicit registry with an add/remove lifecycle rather than a global
//! delegate, so notification order is deterministic and callbacks cannot
//! dangle past their owner.

use glam::Vec3;

use crate::constants::{
    DETECT_RADIUS, ECHO_CLIP_DURATION_SEC, FLASH_DURATION_SEC, FLASH_INTENSITY, FLASH_RANGE,
    LAYER_ALL,
};
use crate::cooldown::CooldownGate;
use crate::echo::EchoSimulator;
use crate::error::{require_non_negative, EchoError};
use crate::scheduler::EffectScheduler;
use crate::services::LayerMask;

/// Identity of one registered ping observer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ObserverId(u64);

/// Registry of ping-observed callbacks. Notification order is subscription
/// order.
#[derive(Default)]
pub struct PingObservers {
    next_id: u64,
    entries: Vec<(u64, Box<dyn FnMut(Vec3)>)>,
}

impl PingObservers {
    pub fn subscribe(&mut self, callback: Box<dyn FnMut(Vec3)>) -> ObserverId {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push((id, callback));
        ObserverId(id)
    }

    /// Remove a subscription. No-op for ids already removed.
    pub fn unsubscribe(&mut self, id: ObserverId) {
        self.entries.retain(|(entry_id, _)| *entry_id != id.0);
    }

    pub fn notify(&mut self, origin: Vec3) {
        for (_, callback) in &mut self.entries {
            callback(origin);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct PingParams {
    /// Overlap radius for local-area detection around the ping origin.
    pub detect_radius: f32,
    pub mask: LayerMask,
    /// Length of the echo clip; together with the echo delay this forms the
    /// busy window committed to the cooldown gate.
    pub echo_clip_duration: f32,
    pub flash_intensity: f32,
    pub flash_range: f32,
    pub flash_duration: f32,
}

impl Default for PingParams {
    fn default() -> Self {
        Self {
            detect_radius: DETECT_RADIUS,
            mask: LAYER_ALL,
            echo_clip_duration: ECHO_CLIP_DURATION_SEC,
            flash_intensity: FLASH_INTENSITY,
            flash_range: FLASH_RANGE,
            flash_duration: FLASH_DURATION_SEC,
        }
    }
}

impl PingParams {
    pub fn validate(&self) -> Result<(), EchoError> {
        require_non_negative("detect_radius", self.detect_radius)?;
        require_non_negative("echo_clip_duration", self.echo_clip_duration)?;
        require_non_negative("flash_intensity", self.flash_intensity)?;
        require_non_negative("flash_range", self.flash_range)?;
        require_non_negative("flash_duration", self.flash_duration)
    }
}

/// Orchestrates one emitter's ping pipeline. Cooldown is a condition
/// tracked by the gate, not a controller state: a busy emitter can still be
/// queried, it just refuses to emit.
pub struct PingEmitter {
    gate: CooldownGate,
    simulator: EchoSimulator,
    observers: PingObservers,
    params: PingParams,
    origin: Vec3,
    direction: Vec3,
}

impl PingEmitter {
    pub fn new(simulator: EchoSimulator, params: PingParams) -> Result<Self, EchoError> {
        params.validate()?;
        Ok(Self {
            gate: CooldownGate::new(),
            simulator,
            observers: PingObservers::default(),
            params,
            origin: Vec3::ZERO,
            direction: Vec3::NEG_Z,
        })
    }

    /// Update the emitter pose used by [`Self::request_external`]. Hosts
    /// call this once per frame from their actor transform.
    pub fn set_pose(&mut self, origin: Vec3, direction: Vec3) {
        self.origin = origin;
        self.direction = direction;
    }

    pub fn subscribe(&mut self, callback: Box<dyn FnMut(Vec3)>) -> ObserverId {
        self.observers.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: ObserverId) {
        self.observers.unsubscribe(id);
    }

    pub fn gate(&self) -> &CooldownGate {
        &self.gate
    }

    pub fn reset_cooldown(&mut self) {
        self.gate.reset();
    }

    /// Emit a ping from `origin` along `direction`.
    ///
    /// Returns `0.0` when fully handled, or the remaining cooldown wait
    /// when rejected, in which case nothing else happens. This is the
    /// contract external triggers rely on to back off.
    pub fn emit(
        &mut self,
        scheduler: &mut EffectScheduler,
        now: f64,
        origin: Vec3,
        direction: Vec3,
    ) -> f64 {
        let (granted, wait) = self.gate.try_consume(now);
        if !granted {
            log::debug!("ping rejected: {wait:.2}s of cooldown remaining");
            return wait;
        }
        self.origin = origin;
        self.direction = direction;

        // Local-area detection happens regardless of what the directional
        // probe finds: every nearby actor yields one ping-observed event.
        let nearby = self
            .simulator
            .probe()
            .overlap(origin, self.params.detect_radius, self.params.mask);
        for actor in &nearby {
            log::debug!("ping detected actor {actor}");
            self.observers.notify(origin);
        }

        let outcome = self.simulator.simulate(scheduler, now, origin, direction);

        // Immediate feedback is the emission itself, not the echo; it is
        // never delayed.
        self.simulator.audio().play_ping();
        self.simulator.visual().flash(
            self.params.flash_intensity,
            self.params.flash_range,
            self.params.flash_duration,
        );
        self.simulator.visual().spawn_particle(origin, direction);

        // Busy until the echo clip has physically finished playing; this is
        // what keeps echoes from the same emitter from overlapping.
        self.gate.set_next_eligible(
            now,
            outcome.delay_seconds + self.params.echo_clip_duration as f64,
        );
        0.0
    }

    /// Emission entry point for non-input triggers (a polling sensor, for
    /// example), using the last committed pose.
    ///
    /// Returns the number of seconds the caller should suspend itself: on
    /// success the full busy window just committed, on rejection the
    /// remaining cooldown wait.
    pub fn request_external(&mut self, scheduler: &mut EffectScheduler, now: f64) -> f64 {
        let (granted, wait) = self.gate.try_consume(now);
        if !granted {
            return wait;
        }
        let (origin, direction) = (self.origin, self.direction);
        self.emit(scheduler, now, origin, direction);
        self.gate.wait_remaining(now)
    }
}
