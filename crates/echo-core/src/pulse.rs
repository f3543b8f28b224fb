//! Pulse animation controller.
//!
//! After a ping, an expanding-then-fading radius value is broadcast to
//! every render surface in lock-step, once per frame. Surfaces are resolved
//! exactly once at construction; each frame reuses the cached handle list
//! and a transient parameter block, so steady-state animation does not
//! allocate.

use std::rc::Rc;

use glam::Vec3;

use crate::constants::{PULSE_FADE_SEC, PULSE_MAX_RADIUS, PULSE_SPEED, PULSE_WIDTH};
use crate::error::{require_positive, EchoError};
use crate::services::{PulseParamsBlock, PulseSurfaces, SurfaceId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PulsePhase {
    Idle,
    Expanding,
    FadingOut,
}

#[derive(Clone, Debug)]
pub struct PulseParams {
    /// Radius growth in units per second while expanding.
    pub speed: f32,
    pub max_radius: f32,
    /// Ring thickness forwarded unchanged to every surface.
    pub width: f32,
    pub fade_duration: f32,
}

impl Default for PulseParams {
    fn default() -> Self {
        Self {
            speed: PULSE_SPEED,
            max_radius: PULSE_MAX_RADIUS,
            width: PULSE_WIDTH,
            fade_duration: PULSE_FADE_SEC,
        }
    }
}

impl PulseParams {
    pub fn validate(&self) -> Result<(), EchoError> {
        require_positive("speed", self.speed)?;
        require_positive("max_radius", self.max_radius)?;
        require_positive("width", self.width)?;
        require_positive("fade_duration", self.fade_duration)
    }
}

struct SurfaceSlot {
    id: SurfaceId,
    last_applied: PulseParamsBlock,
}

/// Drives at most one pulse session at a time. Starting a new session
/// cancels the previous one unconditionally; its remaining steps never
/// write to the surfaces again.
pub struct PulseController {
    surfaces: Rc<dyn PulseSurfaces>,
    cached: Vec<SurfaceSlot>,
    params: PulseParams,
    phase: PulsePhase,
    origin: Vec3,
    radius: f32,
    fade_elapsed: f32,
    session: u64,
}

impl PulseController {
    /// Resolve and cache the surface set for `shader_tag`. An empty match
    /// is a misconfiguration diagnostic, not a failure; the controller
    /// still animates, it just has nobody to write to.
    pub fn new(
        surfaces: Rc<dyn PulseSurfaces>,
        shader_tag: &str,
        params: PulseParams,
    ) -> Result<Self, EchoError> {
        params.validate()?;
        let cached: Vec<SurfaceSlot> = surfaces
            .resolve(shader_tag)
            .into_iter()
            .map(|id| SurfaceSlot {
                id,
                last_applied: PulseParamsBlock::default(),
            })
            .collect();
        if cached.is_empty() {
            log::warn!("no pulse surfaces matched shader tag {shader_tag:?}");
        } else {
            log::debug!("cached {} pulse surfaces for {shader_tag:?}", cached.len());
        }
        Ok(Self {
            surfaces,
            cached,
            params,
            phase: PulsePhase::Idle,
            origin: Vec3::ZERO,
            radius: 0.0,
            fade_elapsed: 0.0,
            session: 0,
        })
    }

    /// Start a new session from `origin`, cancelling any in-flight one.
    pub fn trigger(&mut self, origin: Vec3) {
        if self.phase != PulsePhase::Idle {
            log::debug!("pulse session {} cancelled by new ping", self.session);
        }
        self.session += 1;
        self.phase = PulsePhase::Expanding;
        self.origin = origin;
        self.radius = 0.0;
        self.fade_elapsed = 0.0;
    }

    /// Abandon the current session and clear every surface.
    pub fn cancel(&mut self) {
        if self.phase == PulsePhase::Idle {
            return;
        }
        self.session += 1;
        self.phase = PulsePhase::Idle;
        self.radius = 0.0;
        self.broadcast();
    }

    /// Advance the animation by one frame of `dt` seconds and broadcast the
    /// current radius to every cached surface.
    pub fn tick(&mut self, dt: f32) {
        match self.phase {
            PulsePhase::Idle => {}
            PulsePhase::Expanding => {
                self.radius += self.params.speed * dt;
                if self.radius >= self.params.max_radius {
                    // Land exactly on max_radius before fading begins.
                    self.radius = self.params.max_radius;
                    self.phase = PulsePhase::FadingOut;
                    self.fade_elapsed = 0.0;
                }
                self.broadcast();
            }
            PulsePhase::FadingOut => {
                self.fade_elapsed += dt;
                if self.fade_elapsed >= self.params.fade_duration {
                    self.radius = 0.0;
                    self.broadcast();
                    self.phase = PulsePhase::Idle;
                } else {
                    let t = self.fade_elapsed / self.params.fade_duration;
                    self.radius = lerp(self.params.max_radius, 0.0, t);
                    self.broadcast();
                }
            }
        }
    }

    fn broadcast(&mut self) {
        let block = PulseParamsBlock {
            origin: self.origin,
            width: self.params.width,
            radius: self.radius,
        };
        for slot in &mut self.cached {
            self.surfaces.write(slot.id, &block);
            slot.last_applied = block;
        }
    }

    pub fn phase(&self) -> PulsePhase {
        self.phase
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn session(&self) -> u64 {
        self.session
    }

    pub fn surface_count(&self) -> usize {
        self.cached.len()
    }

    /// Last parameter block applied to the surface at `index`.
    pub fn last_applied(&self, index: usize) -> Option<PulseParamsBlock> {
        self.cached.get(index).map(|slot| slot.last_applied)
    }

    pub fn params(&self) -> &PulseParams {
        &self.params
    }
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t.clamp(0.0, 1.0)
}
