use std::cell::RefCell;
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use fnv::FnvHashMap;
use glam::Vec3;
use rand::prelude::*;

use echo_core::{
    ActorId, AmplitudeSource, AudioPlayback, EchoEngine, EchoParams, EchoSimulator, EchoVoice,
    LayerMask, MicParams, MicTrigger, PingEmitter, PingParams, ProbeHit, PulseController,
    PulseParams, PulseParamsBlock, PulsePhase, PulseSurfaces, SpatialProbe, SurfaceId,
    VisualFeedback,
};
use smallvec::SmallVec;

const LISTENER_POS: Vec3 = Vec3::new(0.0, 1.2, 0.0);
const ROOM_HALF_EXTENT: f32 = 12.0;

// ---------------- Demo scene ----------------

#[derive(Clone, Copy)]
enum Shape {
    Sphere { center: Vec3, radius: f32 },
    Wall { point: Vec3, normal: Vec3 },
}

struct Obstacle {
    shape: Shape,
    layers: LayerMask,
}

struct DemoScene {
    obstacles: FnvHashMap<ActorId, Obstacle>,
}

fn build_scene() -> DemoScene {
    let mut obstacles = FnvHashMap::default();
    let mut insert = |id: ActorId, shape: Shape| {
        obstacles.insert(
            id,
            Obstacle {
                shape,
                layers: echo_core::LAYER_ALL,
            },
        );
    };
    // A square room around the listener plus a couple of pillars.
    insert(
        1,
        Shape::Wall {
            point: Vec3::new(ROOM_HALF_EXTENT, 0.0, 0.0),
            normal: Vec3::NEG_X,
        },
    );
    insert(
        2,
        Shape::Wall {
            point: Vec3::new(-ROOM_HALF_EXTENT, 0.0, 0.0),
            normal: Vec3::X,
        },
    );
    insert(
        3,
        Shape::Wall {
            point: Vec3::new(0.0, 0.0, ROOM_HALF_EXTENT),
            normal: Vec3::NEG_Z,
        },
    );
    insert(
        4,
        Shape::Wall {
            point: Vec3::new(0.0, 0.0, -ROOM_HALF_EXTENT),
            normal: Vec3::Z,
        },
    );
    insert(
        5,
        Shape::Sphere {
            center: Vec3::new(4.0, 1.2, -5.0),
            radius: 1.0,
        },
    );
    insert(
        6,
        Shape::Sphere {
            center: Vec3::new(-6.0, 1.2, 3.0),
            radius: 1.5,
        },
    );
    DemoScene { obstacles }
}

fn ray_sphere(ray_origin: Vec3, ray_dir: Vec3, center: Vec3, radius: f32) -> Option<f32> {
    let oc = ray_origin - center;
    let b = oc.dot(ray_dir);
    let c = oc.dot(oc) - radius * radius;
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let t = -b - disc.sqrt();
    (t >= 0.0).then_some(t)
}

fn ray_plane(ray_origin: Vec3, ray_dir: Vec3, point: Vec3, normal: Vec3) -> Option<f32> {
    let denom = normal.dot(ray_dir);
    if denom.abs() < 1e-6 {
        return None;
    }
    let t = (point - ray_origin).dot(normal) / denom;
    (t >= 0.0).then_some(t)
}

impl SpatialProbe for DemoScene {
    fn overlap(&self, point: Vec3, radius: f32, mask: LayerMask) -> SmallVec<[ActorId; 8]> {
        let mut hits = SmallVec::new();
        for (id, obstacle) in &self.obstacles {
            if obstacle.layers & mask == 0 {
                continue;
            }
            let within = match obstacle.shape {
                Shape::Sphere {
                    center,
                    radius: sphere_radius,
                } => point.distance(center) <= radius + sphere_radius,
                Shape::Wall {
                    point: wall_point,
                    normal,
                } => (point - wall_point).dot(normal).abs() <= radius,
            };
            if within {
                hits.push(*id);
            }
        }
        hits
    }

    fn cast(
        &self,
        origin: Vec3,
        direction: Vec3,
        cast_radius: f32,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<ProbeHit> {
        let mut nearest: Option<ProbeHit> = None;
        for obstacle in self.obstacles.values() {
            if obstacle.layers & mask == 0 {
                continue;
            }
            let candidate = match obstacle.shape {
                Shape::Sphere { center, radius } => {
                    // Inflate the sphere by the probe thickness.
                    ray_sphere(origin, direction, center, radius + cast_radius).map(|t| {
                        let point = origin + direction * t;
                        ProbeHit {
                            distance: t,
                            point,
                            normal: (point - center).normalize_or_zero(),
                        }
                    })
                }
                Shape::Wall { point, normal } => {
                    ray_plane(origin, direction, point, normal).map(|t| ProbeHit {
                        distance: t,
                        point: origin + direction * t,
                        normal,
                    })
                }
            };
            if let Some(hit) = candidate {
                if hit.distance <= max_distance
                    && nearest.map_or(true, |n| hit.distance < n.distance)
                {
                    nearest = Some(hit);
                }
            }
        }
        nearest
    }
}

// ---------------- Native audio (cpal) ----------------

#[derive(Clone, Copy)]
enum VoiceKind {
    Blip,
    Noise,
}

struct ActiveVoice {
    /// Set for echo voices so the engine can release them early.
    id: Option<u32>,
    kind: VoiceKind,
    amplitude: f32,
    phase: f32,
    phase_inc: f32,
    noise_state: u32,
    total_samples: u32,
    samples_emitted: u32,
    attack_samples: u32,
    release_samples: u32,
    left_gain: f32,
    right_gain: f32,
}

struct MixerState {
    sample_rate: f32,
    voices: Vec<ActiveVoice>,
    next_voice: u32,
}

fn next_noise(state: &mut u32) -> f32 {
    let mut x = *state;
    x ^= x << 13;
    x ^= x >> 17;
    x ^= x << 5;
    *state = x;
    (x as f32 / u32::MAX as f32) * 2.0 - 1.0
}

fn equal_power_pan(pan: f32) -> (f32, f32) {
    let angle = (pan.clamp(-1.0, 1.0) + 1.0) * std::f32::consts::FRAC_PI_4;
    (angle.cos(), angle.sin())
}

fn mix_sample_stereo(voices: &mut Vec<ActiveVoice>) -> (f32, f32) {
    let mut left = 0.0_f32;
    let mut right = 0.0_f32;
    let mut i = 0_usize;
    while i < voices.len() {
        let voice = &mut voices[i];
        let n = voice.samples_emitted;
        let envelope = if n < voice.attack_samples {
            n as f32 / voice.attack_samples.max(1) as f32
        } else if n > voice.total_samples.saturating_sub(voice.release_samples) {
            let rel_n = n.saturating_sub(voice.total_samples - voice.release_samples);
            1.0 - (rel_n as f32 / voice.release_samples.max(1) as f32)
        } else {
            1.0
        };
        let raw = match voice.kind {
            VoiceKind::Blip => voice.phase.sin(),
            VoiceKind::Noise => next_noise(&mut voice.noise_state),
        } * voice.amplitude
            * envelope;
        left += raw * voice.left_gain;
        right += raw * voice.right_gain;
        voice.phase += voice.phase_inc;
        if voice.phase > 2.0 * std::f32::consts::PI {
            voice.phase -= 2.0 * std::f32::consts::PI;
        }
        voice.samples_emitted += 1;
        if voice.samples_emitted >= voice.total_samples {
            voices.swap_remove(i);
            continue;
        }
        i += 1;
    }
    (left.tanh(), right.tanh())
}

fn start_audio_output() -> Option<(cpal::Stream, Arc<Mutex<MixerState>>)> {
    let host = cpal::default_host();
    let device = host.default_output_device()?;
    let config = device.default_output_config().ok()?;
    if config.sample_format() != cpal::SampleFormat::F32 {
        log::warn!(
            "unsupported sample format {:?}; running silent",
            config.sample_format()
        );
        return None;
    }
    let sample_rate = config.sample_rate().0 as f32;
    let channels = config.channels() as usize;
    let state = Arc::new(Mutex::new(MixerState {
        sample_rate,
        voices: Vec::new(),
        next_voice: 0,
    }));

    let state_for_stream = Arc::clone(&state);
    let err_fn = |err| log::error!("audio stream error: {err}");
    let stream = device
        .build_output_stream(
            &config.into(),
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let mut guard = state_for_stream.lock().unwrap();
                let voices = &mut guard.voices;
                let mut frame = 0_usize;
                while frame < data.len() {
                    let (l, r) = mix_sample_stereo(voices);
                    if channels >= 2 {
                        data[frame] = l;
                        if frame + 1 < data.len() {
                            data[frame + 1] = r;
                        }
                    } else {
                        data[frame] = 0.5 * (l + r);
                    }
                    frame += channels;
                }
            },
            err_fn,
            None,
        )
        .ok()?;
    stream.play().ok()?;
    Some((stream, state))
}

/// Engine-facing audio service backed by the cpal mixer. With no output
/// device the demo stays functional, it just logs the playbacks it skips.
struct DemoAudio {
    mixer: Option<Arc<Mutex<MixerState>>>,
}

impl AudioPlayback for DemoAudio {
    fn play_ping(&self) {
        let Some(mixer) = &self.mixer else {
            log::debug!("ping (no audio device)");
            return;
        };
        let mut guard = mixer.lock().unwrap();
        let sr = guard.sample_rate;
        let total = (0.08 * sr) as u32;
        let edge = (0.01 * sr) as u32;
        guard.voices.push(ActiveVoice {
            id: None,
            kind: VoiceKind::Blip,
            amplitude: 0.5,
            phase: 0.0,
            phase_inc: 2.0 * std::f32::consts::PI * 880.0 / sr,
            noise_state: 0,
            total_samples: total.max(1),
            samples_emitted: 0,
            attack_samples: edge.min(total),
            release_samples: edge.min(total),
            left_gain: std::f32::consts::FRAC_1_SQRT_2,
            right_gain: std::f32::consts::FRAC_1_SQRT_2,
        });
    }

    fn play_echo_at(&self, point: Vec3) -> Option<EchoVoice> {
        let mixer = self.mixer.as_ref()?;
        let mut guard = mixer.lock().unwrap();
        let sr = guard.sample_rate;
        let distance = point.distance(LISTENER_POS);
        let amplitude = (0.6 / (1.0 + distance * 0.25)).min(0.6);
        let (left_gain, right_gain) = equal_power_pan(point.x / ROOM_HALF_EXTENT);
        let total = (0.35 * sr) as u32;
        let edge = (0.02 * sr) as u32;
        let id = guard.next_voice;
        guard.next_voice += 1;
        guard.voices.push(ActiveVoice {
            id: Some(id),
            kind: VoiceKind::Noise,
            amplitude,
            phase: 0.0,
            phase_inc: 0.0,
            noise_state: 0x9E37_79B9 ^ id,
            total_samples: total.max(1),
            samples_emitted: 0,
            attack_samples: edge.min(total),
            release_samples: edge.min(total),
            left_gain,
            right_gain,
        });
        Some(EchoVoice(id))
    }

    fn release(&self, voice: EchoVoice) {
        let Some(mixer) = &self.mixer else {
            return;
        };
        let mut guard = mixer.lock().unwrap();
        for v in guard.voices.iter_mut().filter(|v| v.id == Some(voice.0)) {
            // Ramp out instead of cutting hard.
            v.total_samples = (v.samples_emitted + v.release_samples).min(v.total_samples);
        }
    }
}

// ---------------- Visual + surface stand-ins ----------------

struct DemoVisual;

impl VisualFeedback for DemoVisual {
    fn flash(&self, intensity: f32, range: f32, duration: f32) {
        log::debug!("flash intensity={intensity:.1} range={range:.1} for {duration:.2}s");
    }

    fn spawn_particle(&self, position: Vec3, orientation: Vec3) {
        log::debug!(
            "particle burst at ({:.1},{:.1},{:.1}) facing ({:.1},{:.1},{:.1})",
            position.x,
            position.y,
            position.z,
            orientation.x,
            orientation.y,
            orientation.z
        );
    }
}

/// Stand-in for the renderer broadcast: four fake surfaces sharing one
/// latest-block slot the main loop reports from.
#[derive(Default)]
struct ConsoleSurfaces {
    latest: RefCell<PulseParamsBlock>,
}

impl ConsoleSurfaces {
    fn latest(&self) -> PulseParamsBlock {
        *self.latest.borrow()
    }
}

impl PulseSurfaces for ConsoleSurfaces {
    fn resolve(&self, shader_tag: &str) -> Vec<SurfaceId> {
        log::info!("resolved 4 demo surfaces for shader tag {shader_tag:?}");
        vec![0, 1, 2, 3]
    }

    fn write(&self, _surface: SurfaceId, params: &PulseParamsBlock) {
        *self.latest.borrow_mut() = *params;
    }
}

/// Synthetic amplitude source: a quiet noise floor with occasional loud
/// transients, standing in for a real capture device.
struct SyntheticMic {
    rng: StdRng,
}

impl AmplitudeSource for SyntheticMic {
    fn peak(&mut self) -> Option<f32> {
        if self.rng.gen::<f32>() < 0.02 {
            Some(0.6)
        } else {
            Some(self.rng.gen::<f32>() * 0.05)
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .init();

    let scene = Rc::new(build_scene());
    let audio_parts = start_audio_output();
    if audio_parts.is_none() {
        log::warn!("no audio output available; running silent");
    }
    let (_stream, mixer) = match audio_parts {
        Some((stream, mixer)) => (Some(stream), Some(mixer)),
        None => (None, None),
    };

    let audio = Rc::new(DemoAudio { mixer });
    let surfaces = Rc::new(ConsoleSurfaces::default());

    let simulator = EchoSimulator::new(
        scene,
        audio,
        Rc::new(DemoVisual),
        EchoParams::default(),
    )?;
    let emitter = PingEmitter::new(simulator, PingParams::default())?;
    let pulse = PulseController::new(
        Rc::clone(&surfaces) as Rc<dyn PulseSurfaces>,
        "echo_pulse",
        PulseParams::default(),
    )?;
    let mic = MicTrigger::new(
        Box::new(SyntheticMic {
            rng: StdRng::seed_from_u64(7),
        }),
        MicParams::default(),
    )?;
    let mut engine = EchoEngine::new(emitter, pulse, Some(mic));

    log::info!("echoroom demo running; pings every few seconds plus synthetic mic triggers");

    let start = Instant::now();
    let mut last = start;
    let mut rng = StdRng::seed_from_u64(42);
    let mut next_ping_at = 1.0_f64;
    let mut next_report_at = 0.0_f64;

    loop {
        let frame = Instant::now();
        let dt = (frame - last).as_secs_f32();
        last = frame;
        let now = start.elapsed().as_secs_f64();

        // Slowly orbit the facing direction and keep the pose committed for
        // mic-triggered pings.
        let yaw = (now * 0.4) as f32;
        let direction = Vec3::new(yaw.sin(), 0.0, -yaw.cos());
        engine.set_pose(LISTENER_POS, direction);

        if now >= next_ping_at {
            let jitter =
                Vec3::new(rng.gen::<f32>() - 0.5, 0.0, rng.gen::<f32>() - 0.5) * 0.2;
            let wait = engine.emit(now, LISTENER_POS, direction + jitter);
            next_ping_at = if wait > 0.0 {
                now + wait
            } else {
                now + 2.5 + rng.gen::<f32>() as f64
            };
        }

        engine.tick(now, dt);

        if now >= next_report_at {
            if engine.pulse().phase() != PulsePhase::Idle {
                let block = surfaces.latest();
                log::info!(
                    "pulse radius {:.1} from ({:.1},{:.1},{:.1})",
                    block.radius,
                    block.origin.x,
                    block.origin.y,
                    block.origin.z
                );
            }
            next_report_at = now + 0.5;
        }

        thread::sleep(Duration::from_millis(15));
    }
}
