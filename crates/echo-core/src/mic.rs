//! Microphone-amplitude ping trigger.
//!
//! A polled sensor that requests a ping whenever the capture peak exceeds
//! the sensitivity threshold, then suspends its own listening for whatever
//! backoff the emitter reports. Polling cadence is expressed in frame time,
//! not a blocking wait.

use crate::constants::{MIC_CHECK_INTERVAL_SEC, MIC_SENSITIVITY};
use crate::emitter::PingEmitter;
use crate::error::{require_non_negative, require_positive, EchoError};
use crate::scheduler::EffectScheduler;
use crate::services::AmplitudeSource;

#[derive(Clone, Debug)]
pub struct MicParams {
    /// Peak amplitude above which a ping is requested.
    pub sensitivity: f32,
    pub check_interval: f32,
}

impl Default for MicParams {
    fn default() -> Self {
        Self {
            sensitivity: MIC_SENSITIVITY,
            check_interval: MIC_CHECK_INTERVAL_SEC,
        }
    }
}

impl MicParams {
    pub fn validate(&self) -> Result<(), EchoError> {
        require_non_negative("sensitivity", self.sensitivity)?;
        require_positive("check_interval", self.check_interval)
    }
}

/// Peak absolute level over one sample window. Exposed for amplitude
/// sources that read raw capture buffers.
pub fn peak_amplitude(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0_f32, |max, s| max.max(s.abs()))
}

pub struct MicTrigger {
    source: Box<dyn AmplitudeSource>,
    params: MicParams,
    accum: f32,
    suspended_until: f64,
    enabled: bool,
}

impl MicTrigger {
    pub fn new(source: Box<dyn AmplitudeSource>, params: MicParams) -> Result<Self, EchoError> {
        params.validate()?;
        Ok(Self {
            source,
            params,
            accum: 0.0,
            suspended_until: 0.0,
            enabled: true,
        })
    }

    /// Whether the trigger is currently polling (not disabled, not inside
    /// a backoff window).
    pub fn is_listening(&self, now: f64) -> bool {
        self.enabled && now >= self.suspended_until
    }

    /// Accumulate frame time and run any due amplitude checks. A check that
    /// crosses the threshold requests a ping through the emitter; any
    /// positive backoff in response suspends listening for that long.
    pub fn tick(
        &mut self,
        emitter: &mut PingEmitter,
        scheduler: &mut EffectScheduler,
        now: f64,
        dt: f32,
    ) {
        if !self.enabled {
            return;
        }
        self.accum += dt;
        while self.accum >= self.params.check_interval {
            self.accum -= self.params.check_interval;
            if now < self.suspended_until {
                continue;
            }
            let Some(peak) = self.source.peak() else {
                log::warn!("amplitude source gone; mic trigger disabled");
                self.enabled = false;
                return;
            };
            if peak > self.params.sensitivity {
                log::debug!(
                    "mic peak {peak:.3} exceeded threshold {:.3}",
                    self.params.sensitivity
                );
                let backoff = emitter.request_external(scheduler, now);
                if backoff > 0.0 {
                    log::debug!("pausing mic listening for {backoff:.2}s");
                    self.suspended_until = now + backoff;
                }
            }
        }
    }
}
