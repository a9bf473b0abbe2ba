//! Ground truth oracle for simulation.
//!
//! The Oracle owns the "true" flights of the simulated world and produces
//! the sampled tracks the engine gets to see:
//! - straight constant-velocity flights with an analytic position at any time
//! - irregular sample spacing (exponential inter-arrival times)
//! - Gaussian altitude noise, duplicate timestamps and broken tracks on demand

use nalgebra::Vector3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Exp, Normal};
use serde::{Deserialize, Serialize};
use skytrail_core::interpolation::bearing;
use skytrail_core::{RawTrack, Sample};
use skytrail_env::EntityId;

/// Virtual time 0 maps to this Unix time (2024-01-01 00:00:00 UTC).
pub const SIM_EPOCH: f64 = 1_704_067_200.0;

/// A ground truth flight: straight line at constant velocity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundTruthFlight {
    pub id: EntityId,

    /// Position at `start`, metres
    pub origin: Vector3<f64>,

    /// Velocity in m/s
    pub velocity: Vector3<f64>,

    /// First and last sample time (Unix seconds)
    pub start: f64,
    pub end: f64,
}

impl GroundTruthFlight {
    /// True position at `t`, held at the endpoints outside the flight.
    pub fn position_at(&self, t: f64) -> Vector3<f64> {
        let elapsed = t.clamp(self.start, self.end) - self.start;
        self.origin + self.velocity * elapsed
    }

    /// True compass heading, `None` for a purely vertical flight.
    pub fn heading(&self) -> Option<f64> {
        bearing(&Vector3::zeros(), &self.velocity)
    }
}

/// The Oracle - owns ground truth and generates sampled tracks.
pub struct Oracle {
    /// Seed for everything the oracle draws
    physics_seed: u64,

    rng: ChaCha8Rng,

    flights: Vec<GroundTruthFlight>,

    next_id: u64,

    /// Mean seconds between two samples
    mean_interval: f64,

    /// Altitude noise standard deviation (metres)
    altitude_noise_std: f64,

    /// Chance that a sample is recorded twice with the same timestamp
    duplicate_probability: f64,
}

impl Oracle {
    pub fn new(physics_seed: u64) -> Self {
        Self {
            physics_seed,
            rng: ChaCha8Rng::seed_from_u64(physics_seed),
            flights: Vec::new(),
            next_id: 0,
            mean_interval: 60.0,
            altitude_noise_std: 0.0,
            duplicate_probability: 0.0,
        }
    }

    pub fn seed(&self) -> u64 {
        self.physics_seed
    }

    pub fn set_mean_interval(&mut self, seconds: f64) {
        self.mean_interval = seconds;
    }

    pub fn set_altitude_noise(&mut self, std_dev: f64) {
        self.altitude_noise_std = std_dev;
    }

    pub fn set_duplicate_probability(&mut self, p: f64) {
        self.duplicate_probability = p.clamp(0.0, 1.0);
    }

    /// Spawns a flight starting `start_offset` seconds after the epoch.
    pub fn spawn_flight(
        &mut self,
        origin: Vector3<f64>,
        velocity: Vector3<f64>,
        start_offset: f64,
        duration: f64,
    ) -> EntityId {
        let id = EntityId::new(format!("flight-{}", self.next_id));
        self.next_id += 1;

        let start = SIM_EPOCH + start_offset;
        self.flights.push(GroundTruthFlight {
            id: id.clone(),
            origin,
            velocity,
            start,
            end: start + duration,
        });
        id
    }

    /// Spawns `count` flights with random origin, bearing, speed and climb.
    pub fn spawn_random_flights(&mut self, count: usize, duration: f64) -> Vec<EntityId> {
        (0..count)
            .map(|_| {
                let origin = Vector3::new(
                    self.rng.gen_range(-5_000.0..5_000.0),
                    self.rng.gen_range(-5_000.0..5_000.0),
                    self.rng.gen_range(50.0..800.0),
                );
                let heading: f64 = self.rng.gen_range(0.0..360.0);
                let speed = self.rng.gen_range(5.0..25.0);
                let climb = self.rng.gen_range(-0.5..0.5);
                let velocity = Vector3::new(
                    speed * heading.to_radians().sin(),
                    speed * heading.to_radians().cos(),
                    climb,
                );
                let offset = if duration > 0.0 {
                    self.rng.gen_range(0.0..duration * 0.2)
                } else {
                    0.0
                };
                self.spawn_flight(origin, velocity, offset, duration)
            })
            .collect()
    }

    pub fn flights(&self) -> &[GroundTruthFlight] {
        &self.flights
    }

    pub fn flight(&self, id: &EntityId) -> Option<&GroundTruthFlight> {
        self.flights.iter().find(|f| &f.id == id)
    }

    fn next_interval(&mut self) -> f64 {
        match Exp::new(1.0 / self.mean_interval) {
            // Strictly increasing; duplicates are injected separately
            Ok(exp) => exp.sample(&mut self.rng).max(1e-3),
            Err(_) => self.mean_interval,
        }
    }

    fn altitude_noise(&mut self) -> f64 {
        match Normal::new(0.0, self.altitude_noise_std) {
            Ok(normal) if self.altitude_noise_std > 0.0 => normal.sample(&mut self.rng),
            _ => 0.0,
        }
    }

    /// Samples one flight: both endpoints exactly, irregular spacing between.
    ///
    /// Horizontal coordinates are exact; only altitude carries noise.
    pub fn sample_flight(&mut self, index: usize) -> Option<RawTrack> {
        let flight = self.flights.get(index)?.clone();

        let mut times = vec![flight.start];
        let mut t = flight.start + self.next_interval();
        while t < flight.end {
            times.push(t);
            t += self.next_interval();
        }
        times.push(flight.end);

        let mut samples = Vec::with_capacity(times.len());
        for t in times {
            let mut position = flight.position_at(t);
            position.z += self.altitude_noise();
            let sample = Sample { t, position };
            samples.push(sample);
            if self.rng.gen_bool(self.duplicate_probability) {
                samples.push(sample);
            }
        }
        Some(RawTrack::new(flight.id, samples))
    }

    /// Samples every flight, in spawn order.
    pub fn sample_all(&mut self) -> Vec<RawTrack> {
        (0..self.flights.len())
            .filter_map(|i| self.sample_flight(i))
            .collect()
    }

    /// A track the engine must reject: a single sample.
    pub fn single_sample_track(&mut self, id: &str) -> RawTrack {
        let at = Vector3::new(
            self.rng.gen_range(-1_000.0..1_000.0),
            self.rng.gen_range(-1_000.0..1_000.0),
            0.0,
        );
        RawTrack::new(id, vec![Sample { t: SIM_EPOCH, position: at }])
    }

    /// A track that turns and perches: legs at a fixed 30 s spacing, broken
    /// by stops where consecutive fixes share a position. It has no
    /// analytic ground truth.
    pub fn dogleg_track(&mut self, id: &str, duration: f64) -> RawTrack {
        // (turn relative to the first leg, segments); `None` perches
        const PATTERN: [(Option<f64>, usize); 5] = [
            (Some(0.0), 3),
            (Some(90.0), 2),
            (None, 5),
            (Some(225.0), 2),
            (None, 3),
        ];
        const SPACING: f64 = 30.0;
        const SPEED: f64 = 10.0;

        let rotation: f64 = self.rng.gen_range(0.0..360.0);
        let mut position = Vector3::new(
            self.rng.gen_range(-2_000.0..2_000.0),
            self.rng.gen_range(-2_000.0..2_000.0),
            120.0,
        );
        let mut t = SIM_EPOCH;
        let mut samples = vec![Sample { t, position }];

        'flight: loop {
            for (turn, segments) in PATTERN {
                for _ in 0..segments {
                    if t - SIM_EPOCH >= duration.max(SPACING) {
                        break 'flight;
                    }
                    t += SPACING;
                    if let Some(turn) = turn {
                        let h = (rotation + turn).to_radians();
                        position += Vector3::new(h.sin(), h.cos(), 0.0) * SPEED * SPACING;
                    }
                    samples.push(Sample { t, position });
                }
            }
        }
        RawTrack::new(id, samples)
    }

    /// A track the engine must reject: timestamps out of order.
    pub fn unordered_track(&self, id: &str) -> RawTrack {
        let samples = (0..5)
            .map(|k| {
                let t = SIM_EPOCH + 600.0 - k as f64 * 120.0;
                Sample::new(t, k as f64 * 10.0, 0.0, 0.0)
            })
            .collect();
        RawTrack::new(id, samples)
    }
}
