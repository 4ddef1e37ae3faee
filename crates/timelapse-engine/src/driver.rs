//! The frame loop and the scripted-event schedule.
//!
//! [`Simulation`] owns the PRNG stream, the star field, the terrain and the
//! compositor. Each call to [`Simulation::step`] produces one frame:
//!
//! 1. Scripted events due on this frame are applied, in a fixed order:
//!    swing-by, explosion, collision growth, erosion.
//! 2. The compositor samples and paints every star, the ambient blend and the
//!    terrain.
//! 3. Every star advances exactly once.
//! 4. The frame goes to the sink. A failed write is logged and counted; the
//!    loop carries on.
//!
//! Events run before the frame they are scheduled on is rendered, so an event
//! at frame `n` is visible on frame `n`. In particular, collision growth set at
//! frame `c` compounds on frames `c..frames`, exactly `frames - c` times, and
//! the colliding star reaches its target radius when the loop completes.
//!
//! Nothing here is concurrent: frame `n + 1` depends on every draw made while
//! producing frame `n`.
//!
//! # Example
//!
//! ```
//! use timelapse_engine::prelude::*;
//!
//! let mut config = SimulationConfig::default();
//! config.canvas = CanvasConfig { width: 64, height: 36 };
//! config.stars.field_count = 20;
//! config.stars.cluster_count = 20;
//! config.frames = 30;
//! config.events.collision_frame = 20;
//!
//! let mut sim = Simulation::new(config).unwrap();
//! let mut sink = MemorySink::new();
//! let summary = sim.run(&mut sink);
//!
//! assert_eq!(summary.frames, 30);
//! assert_eq!(sink.digests().len(), 30);
//! ```

use std::time::{Duration, Instant};

use timelapse_scene::prelude::*;
use timelapse_scene::star::growth_factor;
use tracing::{debug, info, warn};

use crate::compositor::Compositor;
use crate::config::{ConfigError, SimulationConfig};
use crate::sink::FrameSink;

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Which scripted events fired on a frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FiredEvents {
    /// Index of the star that was swung by.
    pub swing_by: Option<usize>,
    /// Index of the star that exploded.
    pub explosion: Option<usize>,
    /// Growth factor given to the colliding star.
    pub growth_factor: Option<f64>,
    /// Whether the terrain eroded.
    pub eroded: bool,
}

/// Wall-clock timing of the last frame.
#[derive(Debug, Clone, Default)]
pub struct FrameDiagnostics {
    /// Time spent applying scripted events.
    pub events_time: Duration,
    /// Time spent sampling and painting the frame.
    pub render_time: Duration,
    /// Time spent stepping every star.
    pub advance_time: Duration,
    /// Time spent handing the frame to the sink.
    pub emit_time: Duration,
    /// Wall-clock time of the whole frame.
    pub total_time: Duration,
}

/// Outcome of one [`Simulation::step`].
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    /// Index of the frame just produced.
    pub frame: u64,
    /// Scripted events applied before the frame was painted.
    pub events: FiredEvents,
    /// Colliding-star radius after this frame's advance.
    pub colliding_radius: Option<f64>,
    /// Whether the sink accepted the frame. Always `false` when headless.
    pub written: bool,
}

/// Outcome of [`Simulation::run`].
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Frames produced by this call.
    pub frames: u64,
    /// Total frames the sink rejected so far.
    pub failed_writes: u64,
    /// Wall-clock time of this call.
    pub elapsed: Duration,
    /// BLAKE3 digest of the final scene state.
    pub state_hash: String,
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

/// The deterministic frame loop over one generated scene.
pub struct Simulation {
    config: SimulationConfig,
    rng: Prng,
    stars: StarField,
    terrain: Terrain,
    compositor: Compositor,
    frame: u64,
    failed_writes: u64,
    last_diagnostics: FrameDiagnostics,
}

impl Simulation {
    /// Validate `config` and generate the scene: terrain first, then stars,
    /// both from the one stream seeded with `config.seed`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration is rejected; no frame is
    /// produced in that case.
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut rng = Prng::seed_from_u64(config.seed);
        let terrain = Terrain::generate(&config.terrain_params(), &mut rng);
        let stars = StarField::generate(&config.star_field_params(), &mut rng);
        let compositor = Compositor::new(
            &config.canvas,
            config.ambient.clone(),
            config.render.clone(),
            &config.terrain,
            config.headless,
        );

        info!(
            width = config.canvas.width,
            height = config.canvas.height,
            stars = stars.stars.len(),
            special = stars.special.len(),
            terrain_samples = terrain.samples().len(),
            frames = config.frames,
            seed = config.seed,
            headless = config.headless,
            "simulation ready"
        );

        Ok(Self {
            config,
            rng,
            stars,
            terrain,
            compositor,
            frame: 0,
            failed_writes: 0,
            last_diagnostics: FrameDiagnostics::default(),
        })
    }

    /// Produce the next frame, or `None` once all frames have been produced.
    pub fn step(&mut self, sink: &mut dyn FrameSink) -> Option<FrameReport> {
        if self.is_finished() {
            return None;
        }
        let frame = self.frame;
        let frame_start = Instant::now();

        let events_start = Instant::now();
        let events = self.apply_events(frame);
        let events_time = events_start.elapsed();

        let render_start = Instant::now();
        self.compositor.render(&self.stars, &self.terrain, &mut self.rng);
        let render_time = render_start.elapsed();

        let advance_start = Instant::now();
        Compositor::advance(&mut self.stars);
        let advance_time = advance_start.elapsed();

        let emit_start = Instant::now();
        let written = if self.compositor.is_headless() {
            false
        } else {
            match sink.emit(frame, self.compositor.frame()) {
                Ok(()) => true,
                Err(e) => {
                    warn!(frame, error = %e, "frame write failed; continuing");
                    self.failed_writes += 1;
                    false
                }
            }
        };
        let emit_time = emit_start.elapsed();

        self.frame += 1;
        let colliding_radius = self.stars.colliding_star().map(|s| s.radius);
        self.last_diagnostics = FrameDiagnostics {
            events_time,
            render_time,
            advance_time,
            emit_time,
            total_time: frame_start.elapsed(),
        };

        debug!(
            frame,
            radius = colliding_radius,
            written,
            ms = self.last_diagnostics.total_time.as_secs_f64() * 1000.0,
            "frame done"
        );

        Some(FrameReport {
            frame,
            events,
            colliding_radius,
            written,
        })
    }

    /// Run every remaining frame.
    pub fn run(&mut self, sink: &mut dyn FrameSink) -> RunSummary {
        let start = Instant::now();
        let first = self.frame;
        while self.step(sink).is_some() {}

        let summary = RunSummary {
            frames: self.frame - first,
            failed_writes: self.failed_writes,
            elapsed: start.elapsed(),
            state_hash: self.state_hash(),
        };
        info!(
            frames = summary.frames,
            failed_writes = summary.failed_writes,
            elapsed_s = summary.elapsed.as_secs_f64(),
            "run complete"
        );
        summary
    }

    fn apply_events(&mut self, frame: u64) -> FiredEvents {
        let events = &self.config.events;
        let mut fired = FiredEvents::default();

        if events.swing_by.fires_at(frame) && !self.stars.stars.is_empty() {
            let index = self.rng.uniform_int(self.stars.stars.len());
            let speed = events.swing_by_speed;
            let vx = self.rng.uniform_range(-speed, speed);
            let vy = self.rng.uniform_range(-speed, speed);
            self.stars.stars[index].set_velocity(vx, vy);
            debug!(frame, star = index, vx, vy, "swing-by");
            fired.swing_by = Some(index);
        }

        if events.explosion.fires_at(frame) && !self.stars.stars.is_empty() {
            let index = self.rng.uniform_int(self.stars.stars.len());
            self.stars.stars[index].flash(events.explosion_radius, events.explosion_decay);
            debug!(frame, star = index, "explosion");
            fired.explosion = Some(index);
        }

        if frame == events.collision_frame {
            let remaining = self.config.collision_remaining_frames();
            let target = self.config.collision_target_radius();
            if let Some(star) = self.stars.colliding_star_mut() {
                match growth_factor(star.radius, target, remaining) {
                    Some(factor) => {
                        star.set_decay(factor);
                        debug!(frame, factor, target, remaining, "collision growth started");
                        fired.growth_factor = Some(factor);
                    }
                    None => warn!(
                        frame,
                        radius = star.radius,
                        target,
                        remaining,
                        "colliding star cannot grow; skipping"
                    ),
                }
            }
        }

        if frame >= events.erosion_start {
            if frame == events.erosion_start {
                debug!(frame, "erosion started");
            }
            self.terrain.erode(&self.config.terrain.erosion, &mut self.rng);
            fired.eroded = true;
        }

        fired
    }

    // -- accessors ----------------------------------------------------------

    /// Index of the next frame to produce (equals frames produced so far).
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Whether every configured frame has been produced.
    pub fn is_finished(&self) -> bool {
        self.frame >= self.config.frames
    }

    /// The validated configuration this run was built from.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Current star state, after the last advance.
    pub fn stars(&self) -> &StarField {
        &self.stars
    }

    /// Current silhouette, after any erosion so far.
    pub fn terrain(&self) -> &Terrain {
        &self.terrain
    }

    /// Values drawn from the stream so far.
    pub fn rng_draws(&self) -> u64 {
        self.rng.draws()
    }

    /// Frames the sink rejected so far.
    pub fn failed_writes(&self) -> u64 {
        self.failed_writes
    }

    /// Timing of the most recent frame.
    pub fn last_diagnostics(&self) -> &FrameDiagnostics {
        &self.last_diagnostics
    }

    pub(crate) fn scene_state(&self) -> (&Prng, &StarField, &Terrain) {
        (&self.rng, &self.stars, &self.terrain)
    }

    pub(crate) fn restore_scene(&mut self, frame: u64, rng: Prng, stars: StarField, terrain: Terrain) {
        self.frame = frame;
        self.rng = rng;
        self.stars = stars;
        self.terrain = terrain;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CanvasConfig, PeriodicEvent};
    use crate::raster::Raster;
    use crate::sink::{MemorySink, NullSink, SinkError};

    fn small_config() -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.canvas = CanvasConfig {
            width: 48,
            height: 27,
        };
        config.stars.field_count = 30;
        config.stars.cluster_count = 30;
        config.frames = 60;
        config.events.swing_by = PeriodicEvent { start: 10, every: 5 };
        config.events.explosion = PeriodicEvent { start: 12, every: 10 };
        config.events.collision_frame = 40;
        config.events.erosion_start = 50;
        config
    }

    /// Fails every other frame.
    struct FlakySink {
        calls: u64,
    }

    impl FrameSink for FlakySink {
        fn emit(&mut self, frame: u64, _raster: &Raster) -> Result<(), SinkError> {
            self.calls += 1;
            if frame % 2 == 0 {
                Err(SinkError::CreateDir {
                    path: "unwritable".into(),
                    source: std::io::Error::other("disk full"),
                })
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn invalid_config_is_rejected_before_any_frame() {
        let mut config = small_config();
        config.events.collision_frame = config.frames;
        assert!(matches!(
            Simulation::new(config),
            Err(ConfigError::NoFramesAfterCollision { .. })
        ));
    }

    #[test]
    fn step_reports_sequential_frames_then_stops() {
        let mut sim = Simulation::new(small_config()).unwrap();
        let mut sink = NullSink;
        for expected in 0..60 {
            let report = sim.step(&mut sink).unwrap();
            assert_eq!(report.frame, expected);
            assert!(report.written);
        }
        assert!(sim.is_finished());
        assert!(sim.step(&mut sink).is_none());
    }

    #[test]
    fn events_fire_on_schedule() {
        let mut sim = Simulation::new(small_config()).unwrap();
        let mut sink = NullSink;
        let reports: Vec<FrameReport> = std::iter::from_fn(|| sim.step(&mut sink)).collect();

        let swing: Vec<u64> = reports
            .iter()
            .filter(|r| r.events.swing_by.is_some())
            .map(|r| r.frame)
            .collect();
        assert_eq!(swing, (10..60).step_by(5).collect::<Vec<_>>());

        let explosions: Vec<u64> = reports
            .iter()
            .filter(|r| r.events.explosion.is_some())
            .map(|r| r.frame)
            .collect();
        assert_eq!(explosions, vec![20, 30, 40, 50]);

        let growth: Vec<u64> = reports
            .iter()
            .filter(|r| r.events.growth_factor.is_some())
            .map(|r| r.frame)
            .collect();
        assert_eq!(growth, vec![40]);

        assert!(reports.iter().all(|r| r.events.eroded == (r.frame >= 50)));
    }

    #[test]
    fn misaligned_start_waits_for_the_next_multiple() {
        let mut config = small_config();
        config.events.swing_by = PeriodicEvent { start: 11, every: 5 };
        config.events.explosion = PeriodicEvent { start: 13, every: 10 };
        let mut sim = Simulation::new(config).unwrap();
        let mut sink = NullSink;
        let reports: Vec<FrameReport> = std::iter::from_fn(|| sim.step(&mut sink)).collect();

        let swing: Vec<u64> = reports
            .iter()
            .filter(|r| r.events.swing_by.is_some())
            .map(|r| r.frame)
            .collect();
        assert_eq!(swing, (15..60).step_by(5).collect::<Vec<_>>());

        let explosions: Vec<u64> = reports
            .iter()
            .filter(|r| r.events.explosion.is_some())
            .map(|r| r.frame)
            .collect();
        assert_eq!(explosions, vec![20, 30, 40, 50]);
    }

    #[test]
    fn explosion_flashes_a_star() {
        let mut config = small_config();
        config.events.swing_by.start = 1000;
        let mut sim = Simulation::new(config).unwrap();
        let mut sink = NullSink;
        let mut report = sim.step(&mut sink).unwrap();
        while report.events.explosion.is_none() {
            report = sim.step(&mut sink).unwrap();
        }
        let star = &sim.stars().stars[report.events.explosion.unwrap()];
        assert_eq!((star.vx, star.vy), (0.0, 0.0));
        assert_eq!(star.color, Hsva::WHITE);
        assert_eq!(star.decay, 0.95);
        // Flashed to 4.0, then advanced once on the explosion frame.
        assert!((star.radius - 4.0 * 0.95).abs() < 1e-12);
    }

    #[test]
    fn colliding_star_reaches_target_on_last_frame() {
        let mut sim = Simulation::new(small_config()).unwrap();
        sim.run(&mut NullSink);
        let radius = sim.stars().colliding_star().unwrap().radius;
        let target = 48.0 * 2.0;
        assert!((radius - target).abs() / target < 1e-9, "radius {radius}");
    }

    #[test]
    fn colliding_star_is_quiescent_before_collision() {
        let mut sim = Simulation::new(small_config()).unwrap();
        let mut sink = NullSink;
        for _ in 0..40 {
            let report = sim.step(&mut sink).unwrap();
            assert_eq!(report.colliding_radius, Some(0.5));
        }
        let report = sim.step(&mut sink).unwrap();
        assert!(report.colliding_radius.unwrap() > 0.5);
    }

    #[test]
    fn erosion_only_shrinks() {
        let mut sim = Simulation::new(small_config()).unwrap();
        let mut sink = NullSink;
        let mut previous: Vec<f64> = sim.terrain().heights().collect();
        while let Some(report) = sim.step(&mut sink) {
            let current: Vec<f64> = sim.terrain().heights().collect();
            for (old, new) in previous.iter().zip(&current) {
                if report.events.eroded && *old > 0.0 {
                    assert!(new < old);
                } else {
                    assert_eq!(new, old);
                }
            }
            previous = current;
        }
    }

    #[test]
    fn failed_writes_are_counted_and_not_fatal() {
        let mut sim = Simulation::new(small_config()).unwrap();
        let mut reference = Simulation::new(small_config()).unwrap();
        let mut flaky = FlakySink { calls: 0 };
        let summary = sim.run(&mut flaky);
        let expected = reference.run(&mut NullSink);

        assert_eq!(flaky.calls, 60);
        assert_eq!(summary.frames, 60);
        assert_eq!(summary.failed_writes, 30);
        assert_eq!(summary.state_hash, expected.state_hash);
    }

    #[test]
    fn headless_run_writes_nothing() {
        let mut config = small_config();
        config.headless = true;
        let mut sim = Simulation::new(config).unwrap();
        let mut sink = MemorySink::new();
        let summary = sim.run(&mut sink);
        assert_eq!(summary.frames, 60);
        assert!(sink.digests().is_empty());
    }

    #[test]
    fn empty_populations_still_run() {
        let mut config = small_config();
        config.stars.field_count = 0;
        config.stars.cluster_count = 0;
        let mut sim = Simulation::new(config).unwrap();
        let mut sink = MemorySink::new();
        let reports: Vec<FrameReport> = std::iter::from_fn(|| sim.step(&mut sink)).collect();
        assert_eq!(reports.len(), 60);
        assert!(reports
            .iter()
            .all(|r| r.events.swing_by.is_none() && r.events.explosion.is_none()));
        assert_eq!(sink.digests().len(), 60);
    }

    #[test]
    fn diagnostics_cover_the_frame() {
        let mut sim = Simulation::new(small_config()).unwrap();
        sim.step(&mut NullSink);
        let d = sim.last_diagnostics();
        assert!(d.total_time >= d.render_time);
    }
}
