//! Engine facade wiring the components into one host-driven unit.
//!
//! The host owns the clock: it calls [`EchoEngine::tick`] once per rendered
//! frame with the current engine time and frame delta. All waiting inside
//! the engine is scheduled continuations or multi-frame state machines;
//! nothing blocks the tick.

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use glam::Vec3;

use crate::emitter::{ObserverId, PingEmitter};
use crate::mic::MicTrigger;
use crate::pulse::PulseController;
use crate::scheduler::EffectScheduler;

pub struct EchoEngine {
    scheduler: EffectScheduler,
    emitter: PingEmitter,
    pulse: Rc<RefCell<PulseController>>,
    mic: Option<MicTrigger>,
}

impl EchoEngine {
    /// Wire the pulse controller to the emitter's ping-observed event. The
    /// subscription holds a weak handle, so a controller torn down early
    /// degrades to a silent no-op instead of a dangling callback.
    pub fn new(
        mut emitter: PingEmitter,
        pulse: PulseController,
        mic: Option<MicTrigger>,
    ) -> Self {
        let pulse = Rc::new(RefCell::new(pulse));
        let weak = Rc::downgrade(&pulse);
        emitter.subscribe(Box::new(move |origin| {
            if let Some(controller) = weak.upgrade() {
                controller.borrow_mut().trigger(origin);
            }
        }));
        Self {
            scheduler: EffectScheduler::new(),
            emitter,
            pulse,
            mic,
        }
    }

    /// Advance one frame: fire due scheduled effects, run mic polling, then
    /// step the pulse animation.
    pub fn tick(&mut self, now: f64, dt: f32) {
        self.scheduler.tick(now);
        if let Some(mic) = self.mic.as_mut() {
            mic.tick(&mut self.emitter, &mut self.scheduler, now, dt);
        }
        self.pulse.borrow_mut().tick(dt);
    }

    /// Primary emission entry point, invoked by an input-binding shim.
    pub fn emit(&mut self, now: f64, origin: Vec3, direction: Vec3) -> f64 {
        self.emitter.emit(&mut self.scheduler, now, origin, direction)
    }

    /// Cooldown-gated emission from the last committed pose; see
    /// [`PingEmitter::request_external`].
    pub fn request_external(&mut self, now: f64) -> f64 {
        self.emitter.request_external(&mut self.scheduler, now)
    }

    pub fn set_pose(&mut self, origin: Vec3, direction: Vec3) {
        self.emitter.set_pose(origin, direction);
    }

    pub fn subscribe(&mut self, callback: Box<dyn FnMut(Vec3)>) -> ObserverId {
        self.emitter.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: ObserverId) {
        self.emitter.unsubscribe(id);
    }

    pub fn emitter(&self) -> &PingEmitter {
        &self.emitter
    }

    pub fn pulse(&self) -> Ref<'_, PulseController> {
        self.pulse.borrow()
    }

    pub fn scheduler(&self) -> &EffectScheduler {
        &self.scheduler
    }
}
