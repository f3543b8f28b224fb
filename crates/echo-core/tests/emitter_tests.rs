// Tests for the ping emission pipeline: cooldown gating, observer
// notifications, immediate feedback, and the busy-window commit.

use std::cell::RefCell;
use std::rc::Rc;

use echo_core::echo::{EchoParams, EchoSimulator};
use echo_core::emitter::{PingEmitter, PingParams};
use echo_core::scheduler::EffectScheduler;
use echo_core::services::{
    ActorId, AudioPlayback, EchoVoice, LayerMask, ProbeHit, SpatialProbe, VisualFeedback,
};
use glam::Vec3;
use smallvec::SmallVec;

struct FixedProbe {
    hit: Option<ProbeHit>,
    actors: Vec<ActorId>,
}

impl SpatialProbe for FixedProbe {
    fn overlap(&self, _point: Vec3, _radius: f32, _mask: LayerMask) -> SmallVec<[ActorId; 8]> {
        self.actors.iter().copied().collect()
    }

    fn cast(
        &self,
        _origin: Vec3,
        _direction: Vec3,
        _cast_radius: f32,
        _max_distance: f32,
        _mask: LayerMask,
    ) -> Option<ProbeHit> {
        self.hit
    }
}

#[derive(Default)]
struct AudioLog {
    pings: usize,
    echo_points: Vec<Vec3>,
}

struct RecordingAudio(Rc<RefCell<AudioLog>>);

impl AudioPlayback for RecordingAudio {
    fn play_ping(&self) {
        self.0.borrow_mut().pings += 1;
    }

    fn play_echo_at(&self, point: Vec3) -> Option<EchoVoice> {
        self.0.borrow_mut().echo_points.push(point);
        Some(EchoVoice(0))
    }

    fn release(&self, _voice: EchoVoice) {}
}

#[derive(Default)]
struct VisualLog {
    flashes: Vec<(f32, f32, f32)>,
    particles: Vec<(Vec3, Vec3)>,
}

struct RecordingVisual(Rc<RefCell<VisualLog>>);

impl VisualFeedback for RecordingVisual {
    fn flash(&self, intensity: f32, range: f32, duration: f32) {
        self.0.borrow_mut().flashes.push((intensity, range, duration));
    }

    fn spawn_particle(&self, position: Vec3, orientation: Vec3) {
        self.0.borrow_mut().particles.push((position, orientation));
    }
}

struct Rig {
    emitter: PingEmitter,
    sched: EffectScheduler,
    audio: Rc<RefCell<AudioLog>>,
    visual: Rc<RefCell<VisualLog>>,
}

fn make_rig(hit: Option<ProbeHit>, actors: Vec<ActorId>, ping_params: PingParams) -> Rig {
    let audio = Rc::new(RefCell::new(AudioLog::default()));
    let visual = Rc::new(RefCell::new(VisualLog::default()));
    let sim = EchoSimulator::new(
        Rc::new(FixedProbe { hit, actors }),
        Rc::new(RecordingAudio(Rc::clone(&audio))),
        Rc::new(RecordingVisual(Rc::clone(&visual))),
        EchoParams {
            max_distance: 50.0,
            ..EchoParams::default()
        },
    )
    .expect("echo params");
    let emitter = PingEmitter::new(sim, ping_params).expect("ping params");
    Rig {
        emitter,
        sched: EffectScheduler::new(),
        audio,
        visual,
    }
}

fn hit_at(distance: f32) -> ProbeHit {
    ProbeHit {
        distance,
        point: Vec3::new(0.0, 1.0, -distance),
        normal: Vec3::Z,
    }
}

#[test]
fn emit_plays_immediate_feedback_without_any_tick() {
    let mut rig = make_rig(Some(hit_at(34.3)), vec![], PingParams::default());
    let handled = rig
        .emitter
        .emit(&mut rig.sched, 0.0, Vec3::ZERO, Vec3::NEG_Z);

    assert_eq!(handled, 0.0, "a granted emit reports fully handled");
    let audio = rig.audio.borrow();
    let visual = rig.visual.borrow();
    assert_eq!(audio.pings, 1, "ping sound is the emission, never delayed");
    assert_eq!(visual.flashes.len(), 1);
    assert_eq!(
        visual.particles.len(),
        1,
        "emission ripple spawns immediately at the origin"
    );
    assert_eq!(visual.particles[0], (Vec3::ZERO, Vec3::NEG_Z));
    assert!(
        audio.echo_points.is_empty(),
        "the echo reply must wait for its delay"
    );
}

#[test]
fn second_emit_inside_busy_window_is_rejected_with_no_side_effects() {
    // First ping: echo delay 0.1s plus a 1.9s clip => 2.0s busy window.
    let params = PingParams {
        echo_clip_duration: 1.9,
        ..PingParams::default()
    };
    let mut rig = make_rig(Some(hit_at(34.3)), vec![], params);

    assert_eq!(
        rig.emitter.emit(&mut rig.sched, 0.0, Vec3::ZERO, Vec3::NEG_Z),
        0.0
    );
    let scheduled_after_first = rig.sched.len();

    let wait = rig
        .emitter
        .emit(&mut rig.sched, 0.05, Vec3::ZERO, Vec3::NEG_Z);
    assert!(
        (wait - 1.95).abs() < 1e-6,
        "expected ~1.95s of wait, got {wait}"
    );
    assert_eq!(rig.audio.borrow().pings, 1, "rejected emit made a sound");
    assert_eq!(rig.visual.borrow().flashes.len(), 1);
    assert_eq!(
        rig.sched.len(),
        scheduled_after_first,
        "rejected emit scheduled new effects"
    );
}

#[test]
fn busy_window_is_echo_delay_plus_clip_duration() {
    let params = PingParams {
        echo_clip_duration: 1.0,
        ..PingParams::default()
    };
    let mut rig = make_rig(Some(hit_at(34.3)), vec![], params);
    rig.emitter.emit(&mut rig.sched, 0.0, Vec3::ZERO, Vec3::NEG_Z);

    // delay = 34.3 / 343 = 0.1, busy until 1.1.
    assert!(!rig.emitter.gate().is_eligible(1.09));
    assert!(rig.emitter.gate().is_eligible(1.11));
}

#[test]
fn miss_commits_only_the_clip_duration() {
    let params = PingParams {
        echo_clip_duration: 0.5,
        ..PingParams::default()
    };
    let mut rig = make_rig(None, vec![], params);
    rig.emitter.emit(&mut rig.sched, 0.0, Vec3::ZERO, Vec3::NEG_Z);

    assert!(!rig.emitter.gate().is_eligible(0.49));
    assert!(rig.emitter.gate().is_eligible(0.5));
    assert!(rig.sched.is_empty(), "a miss schedules no delayed effects");
}

#[test]
fn observers_fire_once_per_detected_actor_even_when_probe_misses() {
    let mut rig = make_rig(None, vec![11, 12, 13], PingParams::default());
    let seen: Rc<RefCell<Vec<Vec3>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    rig.emitter
        .subscribe(Box::new(move |origin| sink.borrow_mut().push(origin)));

    let origin = Vec3::new(1.0, 2.0, 3.0);
    rig.emitter.emit(&mut rig.sched, 0.0, origin, Vec3::NEG_Z);

    assert_eq!(seen.borrow().len(), 3, "one notification per nearby actor");
    assert!(seen.borrow().iter().all(|o| *o == origin));
}

#[test]
fn no_nearby_actors_means_no_notifications() {
    let mut rig = make_rig(Some(hit_at(5.0)), vec![], PingParams::default());
    let seen: Rc<RefCell<Vec<Vec3>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    rig.emitter
        .subscribe(Box::new(move |origin| sink.borrow_mut().push(origin)));

    rig.emitter.emit(&mut rig.sched, 0.0, Vec3::ZERO, Vec3::NEG_Z);
    assert!(seen.borrow().is_empty());
}

#[test]
fn notification_order_matches_subscription_order() {
    let mut rig = make_rig(None, vec![1], PingParams::default());
    let order: Rc<RefCell<Vec<u32>>> = Rc::new(RefCell::new(Vec::new()));
    for tag in 0..4 {
        let sink = Rc::clone(&order);
        rig.emitter
            .subscribe(Box::new(move |_| sink.borrow_mut().push(tag)));
    }
    rig.emitter.emit(&mut rig.sched, 0.0, Vec3::ZERO, Vec3::NEG_Z);
    assert_eq!(*order.borrow(), vec![0, 1, 2, 3]);
}

#[test]
fn unsubscribed_observer_receives_nothing_further() {
    let mut rig = make_rig(None, vec![1], PingParams::default());
    let count: Rc<RefCell<usize>> = Rc::new(RefCell::new(0));
    let sink = Rc::clone(&count);
    let id = rig
        .emitter
        .subscribe(Box::new(move |_| *sink.borrow_mut() += 1));

    rig.emitter.emit(&mut rig.sched, 0.0, Vec3::ZERO, Vec3::NEG_Z);
    assert_eq!(*count.borrow(), 1);

    rig.emitter.unsubscribe(id);
    rig.emitter.reset_cooldown();
    rig.emitter.emit(&mut rig.sched, 10.0, Vec3::ZERO, Vec3::NEG_Z);
    assert_eq!(*count.borrow(), 1, "unsubscribed observer was notified");
}

#[test]
fn request_external_returns_the_busy_window_on_success() {
    let params = PingParams {
        echo_clip_duration: 1.9,
        ..PingParams::default()
    };
    let mut rig = make_rig(Some(hit_at(34.3)), vec![], params);
    rig.emitter.set_pose(Vec3::new(0.0, 1.5, 0.0), Vec3::NEG_Z);

    let backoff = rig.emitter.request_external(&mut rig.sched, 0.0);
    assert!(
        (backoff - 2.0).abs() < 1e-6,
        "expected the 2.0s busy window, got {backoff}"
    );
    assert_eq!(rig.audio.borrow().pings, 1);
}

#[test]
fn request_external_returns_remaining_wait_on_rejection() {
    let params = PingParams {
        echo_clip_duration: 1.9,
        ..PingParams::default()
    };
    let mut rig = make_rig(Some(hit_at(34.3)), vec![], params);

    rig.emitter.request_external(&mut rig.sched, 0.0);
    let wait = rig.emitter.request_external(&mut rig.sched, 0.5);
    assert!((wait - 1.5).abs() < 1e-6);
    assert_eq!(rig.audio.borrow().pings, 1, "rejected request still pinged");
}

#[test]
fn echoes_from_successive_pings_may_overlap() {
    // A new ping never cancels a previous ping's in-flight echo.
    let params = PingParams {
        echo_clip_duration: 0.0,
        ..PingParams::default()
    };
    let mut rig = make_rig(Some(hit_at(34.3)), vec![], params);

    rig.emitter.emit(&mut rig.sched, 0.0, Vec3::ZERO, Vec3::NEG_Z);
    // Busy window = 0.1s; second ping just after it opens.
    rig.emitter.emit(&mut rig.sched, 0.11, Vec3::ZERO, Vec3::NEG_Z);

    rig.sched.tick(0.5);
    assert_eq!(
        rig.audio.borrow().echo_points.len(),
        2,
        "both echoes must fire; later pings do not cancel earlier ones"
    );
}
