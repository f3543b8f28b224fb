//! Delayed effect scheduler.
//!
//! "Wait N seconds, then run this" is expressed as an owned entry in this
//! scheduler rather than a blocking sleep, so the host tick drives all
//! resumption and a fake clock can drive tests. Time is engine seconds as
//! `f64`, injected by the caller.

use std::cmp::Ordering;

use fnv::FnvHashMap;
use smallvec::SmallVec;

/// Cancellation token for one scheduled effect. Stale tokens (already fired
/// or already cancelled) are accepted and ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EffectToken(u64);

struct Entry {
    fire_at: f64,
    effect: Box<dyn FnOnce()>,
}

/// Owns every pending effect from creation until it fires or is cancelled.
///
/// Effects fire no earlier than their delay has elapsed, at most once each.
/// Two effects due on the same tick fire ordered by `(fire_time,
/// scheduling order)`.
#[derive(Default)]
pub struct EffectScheduler {
    entries: FnvHashMap<u64, Entry>,
    next_id: u64,
}

impl EffectScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `effect` to run once `delay` seconds after `now`. A zero
    /// delay fires on the next tick, never synchronously, so it cannot jump
    /// ahead of work already queued this frame.
    pub fn schedule(
        &mut self,
        now: f64,
        delay: f64,
        effect: impl FnOnce() + 'static,
    ) -> EffectToken {
        let delay = if delay < 0.0 {
            log::debug!("negative delay {delay:.3} clamped to 0");
            0.0
        } else {
            delay
        };
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert(
            id,
            Entry {
                fire_at: now + delay,
                effect: Box::new(effect),
            },
        );
        EffectToken(id)
    }

    /// Drop a pending effect. No-op for tokens that already fired or were
    /// already cancelled.
    pub fn cancel(&mut self, token: EffectToken) {
        self.entries.remove(&token.0);
    }

    /// Fire every effect whose time has come.
    pub fn tick(&mut self, now: f64) {
        let mut due: SmallVec<[(u64, f64); 8]> = self
            .entries
            .iter()
            .filter(|(_, e)| e.fire_at <= now)
            .map(|(id, e)| (*id, e.fire_at))
            .collect();
        // Entry ids are handed out monotonically, so they double as the
        // scheduling-order tie break.
        due.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        for (id, _) in due {
            if let Some(entry) = self.entries.remove(&id) {
                (entry.effect)();
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
