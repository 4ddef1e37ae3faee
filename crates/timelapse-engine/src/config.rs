//! The single configuration structure for a timelapse run.
//!
//! Every stylistic constant lives here with the value the reference sequence
//! was rendered with. Canvas-relative quantities (the cluster origin, terrain
//! heights, the special star's position, the collision target radius) are
//! stored as multiples of the canvas size, so changing only the canvas in a
//! partial JSON file rescales the whole scene.
//!
//! # Example
//!
//! ```
//! use timelapse_engine::config::SimulationConfig;
//!
//! let config = SimulationConfig::from_json_str(r#"{ "frames": 300, "events": { "collision_frame": 200 } }"#).unwrap();
//! assert_eq!(config.frames, 300);
//! assert_eq!(config.canvas.width, 1280);
//! config.validate().unwrap();
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use timelapse_scene::prelude::*;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Configuration rejected before the frame loop starts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid scene parameters: {0}")]
    Scene(#[from] SceneError),

    #[error("canvas must be at least 1x1 pixels, got {width}x{height}")]
    EmptyCanvas { width: u32, height: u32 },

    /// The growth factor `(target / radius)^(1 / remaining)` needs
    /// `remaining > 0`.
    #[error("collision frame {collision_frame} leaves no frames to grow in (total {frames})")]
    NoFramesAfterCollision { collision_frame: u64, frames: u64 },

    #[error("event '{event}' must repeat every 1 or more frames")]
    ZeroPeriod { event: &'static str },

    #[error("parameter '{name}' is out of range: {value} ({expected})")]
    OutOfRange {
        name: &'static str,
        value: f64,
        expected: &'static str,
    },

    #[error("ambient breakpoints must increase, got {start} / {mid} / {end}")]
    AmbientOrder { start: f64, mid: f64, end: f64 },

    #[error("failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

fn check(
    name: &'static str,
    value: f64,
    expected: &'static str,
    accept: impl Fn(f64) -> bool,
) -> Result<(), ConfigError> {
    if value.is_finite() && accept(value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            name,
            value,
            expected,
        })
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Output raster size in pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

impl CanvasConfig {
    /// `(width, height)` as floating-point canvas units.
    pub fn size(&self) -> (f64, f64) {
        (f64::from(self.width), f64::from(self.height))
    }
}

/// A special star, placed by canvas fraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecialStarConfig {
    /// Horizontal position as a fraction of the canvas width.
    pub x_fraction: f64,
    /// Vertical position as a fraction of the canvas height.
    pub y_fraction: f64,
    /// Starting radius in pixels.
    pub radius: f64,
}

impl Default for SpecialStarConfig {
    fn default() -> Self {
        Self {
            x_fraction: 0.5,
            y_fraction: 0.5,
            radius: 0.5,
        }
    }
}

/// The two star populations and the special stars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StarFieldConfig {
    /// Stars scattered uniformly over the canvas.
    pub field_count: usize,
    /// Stars in the drifting cluster.
    pub cluster_count: usize,
    /// Cluster corner as multiples of `(width, height)`.
    pub cluster_origin: [f64; 2],
    /// Gaussian spread of the cluster; `None` means `min(width, height)`.
    pub cluster_spread: Option<f64>,
    /// Approach direction in radians.
    pub approach_angle: f64,
    /// Lower bound of the cluster speed draw.
    pub speed_min: f64,
    /// Upper bound (exclusive) of the cluster speed draw.
    pub speed_max: f64,
    /// `distance = distance_scale / speed`; `None` disables dimming.
    pub distance_scale: Option<f64>,
    /// Smallest radius any generated star gets.
    pub radius_floor: f64,
    /// Radius per unit of brightness.
    pub radius_scale: f64,
    /// The first entry is the colliding star.
    pub special: Vec<SpecialStarConfig>,
}

impl Default for StarFieldConfig {
    fn default() -> Self {
        Self {
            field_count: 5000,
            cluster_count: 5000,
            cluster_origin: [2.5, -1.5],
            cluster_spread: None,
            approach_angle: -0.758,
            speed_min: 1.2,
            speed_max: 2.5,
            distance_scale: Some(1.5),
            radius_floor: 0.1,
            radius_scale: 1.1,
            special: vec![SpecialStarConfig::default()],
        }
    }
}

/// The mountain silhouette.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Endpoint height as a fraction of the canvas height.
    pub min_height_fraction: f64,
    /// Apex height as a fraction of the canvas height.
    pub max_height_fraction: f64,
    /// Subdivision rounds, counting the initial apex; yields `2^rounds + 1`
    /// samples.
    pub rounds: u32,
    /// Subtracted from every midpoint, so the ridge sags as it subdivides.
    pub bias: f64,
    /// Per-frame shrink factor band once erosion has started.
    pub erosion: ErosionBand,
    /// Fill colour of the silhouette.
    pub color: Rgba,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            min_height_fraction: 1.0 / 40.0,
            max_height_fraction: 1.0 / 5.0,
            rounds: 8,
            bias: 0.5,
            erosion: ErosionBand::default(),
            color: Rgba::BLACK,
        }
    }
}

/// Fires on every multiple of `every` from frame `start` onwards.
///
/// The period is aligned to frame 0, not to `start`: with `start: 605` and
/// `every: 20` the first firing is frame 620.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodicEvent {
    /// First frame on which the event may fire.
    pub start: u64,
    /// Period in frames; must be at least 1.
    pub every: u64,
}

impl PeriodicEvent {
    /// Whether the event is due on `frame`.
    pub fn fires_at(&self, frame: u64) -> bool {
        self.every > 0 && frame >= self.start && frame % self.every == 0
    }
}

/// The scripted-event schedule, applied in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventSchedule {
    /// A random ordinary star gets a new random velocity.
    pub swing_by: PeriodicEvent,
    /// New velocity components are uniform in `[-speed, speed)`.
    pub swing_by_speed: f64,
    /// A random ordinary star stops, flashes white and fades.
    pub explosion: PeriodicEvent,
    /// Radius of the flash.
    pub explosion_radius: f64,
    /// Per-frame fade factor after the flash, in `(0, 1)`.
    pub explosion_decay: f64,
    /// Frame on which the colliding star starts to grow.
    pub collision_frame: u64,
    /// Target radius of the colliding star as a multiple of the canvas width.
    pub collision_target_factor: f64,
    /// First frame on which the terrain erodes; it erodes every frame after.
    pub erosion_start: u64,
}

impl Default for EventSchedule {
    fn default() -> Self {
        Self {
            swing_by: PeriodicEvent {
                start: 600,
                every: 20,
            },
            swing_by_speed: 1.5,
            explosion: PeriodicEvent {
                start: 700,
                every: 50,
            },
            explosion_radius: 4.0,
            explosion_decay: 0.95,
            collision_frame: 1500,
            collision_target_factor: 2.0,
            erosion_start: 1861,
        }
    }
}

/// Breakpoints of the canvas-wide sky blend driven by the colliding star.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmbientConfig {
    /// Below this radius there is no overpaint.
    pub start_radius: f64,
    /// Radius at which `mid_color` is reached.
    pub mid_radius: f64,
    /// Radius at which `end_color` is reached and held.
    pub end_radius: f64,
    pub start_color: Rgba,
    pub mid_color: Rgba,
    pub end_color: Rgba,
}

impl Default for AmbientConfig {
    fn default() -> Self {
        Self {
            start_radius: 6.0,
            mid_radius: 40.0,
            end_radius: 200.0,
            start_color: Rgba::LIGHT_SKY_BLUE.with_alpha(0.0),
            mid_color: Rgba::LIGHT_SKY_BLUE.with_alpha(0.9),
            end_color: Rgba::ORANGE_RED,
        }
    }
}

/// Per-star drawing parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Stars larger than this are drawn as a soft glow instead of a disc.
    pub glow_threshold: f64,
    /// Standard deviation of the per-frame position and radius jitter.
    pub jitter_sd: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            glow_threshold: 6.0,
            jitter_sd: 0.1,
        }
    }
}

// ---------------------------------------------------------------------------
// SimulationConfig
// ---------------------------------------------------------------------------

/// Everything a run needs. `Default` reproduces the reference sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seed of the single PRNG stream.
    pub seed: u64,
    /// Number of frames to produce.
    pub frames: u64,
    /// Skip rasterization and sink output. Random draws and star state are
    /// identical to a rendered run.
    pub headless: bool,
    /// Output raster size.
    pub canvas: CanvasConfig,
    /// Star populations and the special stars.
    pub stars: StarFieldConfig,
    /// Mountain silhouette and its erosion band.
    pub terrain: TerrainConfig,
    /// Scripted-event timings.
    pub events: EventSchedule,
    /// Sky tint driven by the colliding star.
    pub ambient: AmbientConfig,
    /// Per-star drawing.
    pub render: RenderConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 1,
            frames: 2100,
            headless: false,
            canvas: CanvasConfig::default(),
            stars: StarFieldConfig::default(),
            terrain: TerrainConfig::default(),
            events: EventSchedule::default(),
            ambient: AmbientConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Parse a (possibly partial) JSON document; missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// The full configuration, defaults included, as pretty JSON.
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).expect("SimulationConfig is always JSON-serializable")
    }

    /// Star-field generation parameters in absolute canvas units.
    pub fn star_field_params(&self) -> StarFieldParams {
        let (width, height) = self.canvas.size();
        let s = &self.stars;
        let brightness = BrightnessParams {
            radius_floor: s.radius_floor,
            radius_scale: s.radius_scale,
        };
        StarFieldParams {
            field_count: s.field_count,
            field: FieldParams {
                width,
                height,
                brightness: brightness.clone(),
            },
            cluster_count: s.cluster_count,
            cluster: ClusterParams {
                width,
                height,
                origin_x: s.cluster_origin[0] * width,
                origin_y: s.cluster_origin[1] * height,
                spread: s.cluster_spread.unwrap_or(width.min(height)),
                angle: s.approach_angle,
                speed_min: s.speed_min,
                speed_max: s.speed_max,
                distance_scale: s.distance_scale,
                brightness,
            },
            special: s
                .special
                .iter()
                .map(|sp| SpecialStarParams {
                    x: sp.x_fraction * width,
                    y: sp.y_fraction * height,
                    radius: sp.radius,
                })
                .collect(),
        }
    }

    /// Terrain generation parameters in absolute canvas units.
    pub fn terrain_params(&self) -> TerrainParams {
        let (width, height) = self.canvas.size();
        TerrainParams {
            width,
            height,
            min_height: self.terrain.min_height_fraction * height,
            max_height: self.terrain.max_height_fraction * height,
            rounds: self.terrain.rounds,
            bias: self.terrain.bias,
        }
    }

    /// Radius the colliding star reaches on the final frame.
    pub fn collision_target_radius(&self) -> f64 {
        f64::from(self.canvas.width) * self.events.collision_target_factor
    }

    /// Frames left for the colliding star to grow in, counting the collision
    /// frame itself.
    pub fn collision_remaining_frames(&self) -> u64 {
        self.frames.saturating_sub(self.events.collision_frame)
    }

    /// Reject anything that would make the frame loop misbehave.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(ConfigError::EmptyCanvas {
                width: self.canvas.width,
                height: self.canvas.height,
            });
        }

        self.star_field_params().validate()?;
        self.terrain_params().validate()?;
        self.terrain.erosion.validate()?;

        let e = &self.events;
        if e.swing_by.every == 0 {
            return Err(ConfigError::ZeroPeriod { event: "swing_by" });
        }
        if e.explosion.every == 0 {
            return Err(ConfigError::ZeroPeriod { event: "explosion" });
        }
        check("swing_by_speed", e.swing_by_speed, ">= 0", |v| v >= 0.0)?;
        check("explosion_radius", e.explosion_radius, ">= 0", |v| v >= 0.0)?;
        check("explosion_decay", e.explosion_decay, "in (0, 1)", |v| {
            v > 0.0 && v < 1.0
        })?;
        check(
            "collision_target_factor",
            e.collision_target_factor,
            "> 0",
            |v| v > 0.0,
        )?;
        if self.collision_remaining_frames() == 0 {
            return Err(ConfigError::NoFramesAfterCollision {
                collision_frame: e.collision_frame,
                frames: self.frames,
            });
        }

        let a = &self.ambient;
        for (name, radius) in [
            ("ambient.start_radius", a.start_radius),
            ("ambient.mid_radius", a.mid_radius),
            ("ambient.end_radius", a.end_radius),
        ] {
            check(name, radius, ">= 0", |v| v >= 0.0)?;
        }
        if !(a.start_radius < a.mid_radius && a.mid_radius < a.end_radius) {
            return Err(ConfigError::AmbientOrder {
                start: a.start_radius,
                mid: a.mid_radius,
                end: a.end_radius,
            });
        }

        check("glow_threshold", self.render.glow_threshold, ">= 0", |v| v >= 0.0)?;
        check("jitter_sd", self.render.jitter_sd, ">= 0", |v| v >= 0.0)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        SimulationConfig::default().validate().unwrap();
    }

    #[test]
    fn defaults_match_reference_layout() {
        let config = SimulationConfig::default();
        let stars = config.star_field_params();
        assert_eq!(stars.cluster.origin_x, 3200.0);
        assert_eq!(stars.cluster.origin_y, -1080.0);
        assert_eq!(stars.cluster.spread, 720.0);
        assert_eq!(stars.special[0].x, 640.0);
        assert_eq!(stars.special[0].y, 360.0);

        let terrain = config.terrain_params();
        assert!((terrain.min_height - 18.0).abs() < 1e-9);
        assert!((terrain.max_height - 144.0).abs() < 1e-9);
        assert_eq!(terrain.sample_count(), 257);

        assert_eq!(config.collision_target_radius(), 2560.0);
        assert_eq!(config.collision_remaining_frames(), 600);
    }

    #[test]
    fn collision_on_last_frame_is_rejected() {
        let mut config = SimulationConfig::default();
        config.events.collision_frame = config.frames;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NoFramesAfterCollision {
                collision_frame: 2100,
                frames: 2100
            })
        ));
        config.events.collision_frame = config.frames - 1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_period_is_rejected() {
        let mut config = SimulationConfig::default();
        config.events.explosion.every = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroPeriod { event: "explosion" })
        ));
    }

    #[test]
    fn empty_canvas_is_rejected() {
        let mut config = SimulationConfig::default();
        config.canvas.height = 0;
        assert!(matches!(config.validate(), Err(ConfigError::EmptyCanvas { .. })));
    }

    #[test]
    fn scene_errors_are_wrapped() {
        let mut config = SimulationConfig::default();
        config.terrain.rounds = 40;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Scene(SceneError::TooManyRounds { .. }))
        ));
    }

    #[test]
    fn ambient_breakpoints_must_increase() {
        let mut config = SimulationConfig::default();
        config.ambient.mid_radius = 300.0;
        assert!(matches!(config.validate(), Err(ConfigError::AmbientOrder { .. })));
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let config = SimulationConfig::from_json_str(
            r#"{ "canvas": { "width": 640 }, "stars": { "field_count": 12 } }"#,
        )
        .unwrap();
        assert_eq!(config.canvas.width, 640);
        assert_eq!(config.canvas.height, 720);
        assert_eq!(config.stars.field_count, 12);
        assert_eq!(config.stars.cluster_count, 5000);
        assert_eq!(config.events, EventSchedule::default());
        assert_eq!(config.collision_target_radius(), 1280.0);
    }

    #[test]
    fn json_round_trip_preserves_config() {
        let mut config = SimulationConfig::default();
        config.seed = 99;
        config.stars.cluster_spread = Some(300.0);
        let back = SimulationConfig::from_json_str(&config.to_json_pretty()).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            SimulationConfig::from_json_str("{ frames: }"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = SimulationConfig::from_json_file(Path::new("/nonexistent/timelapse.json"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn periodic_event_schedule() {
        let e = PeriodicEvent { start: 600, every: 20 };
        assert!(!e.fires_at(580));
        assert!(e.fires_at(600));
        assert!(!e.fires_at(601));
        assert!(e.fires_at(620));
        assert!(!PeriodicEvent { start: 0, every: 0 }.fires_at(0));
    }

    #[test]
    fn periodic_event_is_aligned_to_frame_zero() {
        let e = PeriodicEvent { start: 605, every: 20 };
        let fired: Vec<u64> = (0..700).filter(|&f| e.fires_at(f)).collect();
        assert_eq!(fired, vec![620, 640, 660, 680]);
    }

    #[test]
    fn explosion_decay_must_fade() {
        for decay in [0.0, 1.0, 1.05, f64::NAN] {
            let mut config = SimulationConfig::default();
            config.events.explosion_decay = decay;
            assert!(
                matches!(
                    config.validate(),
                    Err(ConfigError::OutOfRange {
                        name: "explosion_decay",
                        ..
                    })
                ),
                "decay {decay} accepted"
            );
        }
    }
}
