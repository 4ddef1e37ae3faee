//! Star-field generation: the uniform field population, the drifting cluster
//! population, and the special (colliding) stars.
//!
//! Each star is produced by a pure factory that takes its population
//! parameters and the shared [`Prng`]. The factories draw in a fixed order
//! (location first, then brightness, hue, saturation), which is what makes a
//! seed reproduce the same sky.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::color::{clamp, Hsva};
use crate::rng::Prng;
use crate::star::Star;
use crate::{check, check_canvas, SceneError};

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Shared brightness-to-size rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrightnessParams {
    /// Smallest radius a star may be created with.
    pub radius_floor: f64,
    /// Radius per unit of brightness.
    pub radius_scale: f64,
}

impl Default for BrightnessParams {
    fn default() -> Self {
        Self {
            radius_floor: 0.1,
            radius_scale: 1.1,
        }
    }
}

impl BrightnessParams {
    /// Both values must be finite and non-negative.
    pub fn validate(&self) -> Result<(), SceneError> {
        check("radius_floor", self.radius_floor, ">= 0", |v| v >= 0.0)?;
        check("radius_scale", self.radius_scale, ">= 0", |v| v >= 0.0)
    }
}

/// Uniformly scattered background stars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldParams {
    /// Canvas width; x is uniform in `[0, width)`.
    pub width: f64,
    /// Canvas height; y is uniform in `[0, height)`.
    pub height: f64,
    pub brightness: BrightnessParams,
}

impl FieldParams {
    /// The whole canvas with the default brightness rule.
    pub fn for_canvas(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            brightness: BrightnessParams::default(),
        }
    }

    /// Rejects an empty or non-finite canvas.
    pub fn validate(&self) -> Result<(), SceneError> {
        check_canvas(self.width, self.height)?;
        self.brightness.validate()
    }
}

/// The second galaxy: a gaussian blob centred off-canvas, drifting in along a
/// fixed approach angle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterParams {
    /// Canvas size; also the rejection bound (`x >= -width`, `y >= -height`).
    pub width: f64,
    pub height: f64,
    /// Offset added to every gaussian sample (the cluster's corner).
    pub origin_x: f64,
    pub origin_y: f64,
    /// Standard deviation of the gaussian blob.
    pub spread: f64,
    /// Approach direction in radians; velocity is `(sin, cos) * speed`.
    pub angle: f64,
    /// Per-star speed, uniform in `[speed_min, speed_max)`; equal bounds give a
    /// fixed speed.
    pub speed_min: f64,
    pub speed_max: f64,
    /// If set, `distance = distance_scale / speed`, dimming faster stars.
    pub distance_scale: Option<f64>,
    pub brightness: BrightnessParams,
}

impl ClusterParams {
    /// The default layout: blob around `(2.5w, -1.5h)`, spread `min(w, h)`.
    pub fn for_canvas(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            origin_x: 2.5 * width,
            origin_y: -1.5 * height,
            spread: width.min(height),
            angle: -0.758,
            speed_min: 1.2,
            speed_max: 2.5,
            distance_scale: Some(1.5),
            brightness: BrightnessParams::default(),
        }
    }

    /// Rejects inverted speed bounds, and a non-positive minimum speed when
    /// distance dimming is on.
    pub fn validate(&self) -> Result<(), SceneError> {
        check_canvas(self.width, self.height)?;
        check("origin_x", self.origin_x, "finite", |_| true)?;
        check("origin_y", self.origin_y, "finite", |_| true)?;
        check("spread", self.spread, ">= 0", |v| v >= 0.0)?;
        check("angle", self.angle, "finite", |_| true)?;
        check("speed_min", self.speed_min, "finite", |_| true)?;
        check("speed_max", self.speed_max, "finite", |_| true)?;
        if self.speed_min > self.speed_max {
            return Err(SceneError::InvertedRange {
                name: "speed",
                min: self.speed_min,
                max: self.speed_max,
            });
        }
        if let Some(scale) = self.distance_scale {
            check("distance_scale", scale, "> 0", |v| v > 0.0)?;
            // distance = scale / speed must stay positive and finite
            check("speed_min", self.speed_min, "> 0 when distance_scale is set", |v| {
                v > 0.0
            })?;
        }
        self.brightness.validate()
    }
}

/// A special star: starts quiescent, grows later under scripted control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialStarParams {
    /// Horizontal position in pixels.
    pub x: f64,
    /// Vertical position in pixels.
    pub y: f64,
    /// Starting radius; must be positive so it can grow.
    pub radius: f64,
}

impl SpecialStarParams {
    /// The colliding star: canvas centre, radius 0.5.
    pub fn centered(width: f64, height: f64) -> Self {
        Self {
            x: width / 2.0,
            y: height / 2.0,
            radius: 0.5,
        }
    }

    /// Position must be finite and the radius positive.
    pub fn validate(&self) -> Result<(), SceneError> {
        check("special.x", self.x, "finite", |_| true)?;
        check("special.y", self.y, "finite", |_| true)?;
        check("special.radius", self.radius, "> 0", |v| v > 0.0)
    }
}

/// Everything needed to build a [`StarField`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarFieldParams {
    /// Number of field stars, generated first.
    pub field_count: usize,
    pub field: FieldParams,
    /// Number of cluster stars, generated after the field.
    pub cluster_count: usize,
    pub cluster: ClusterParams,
    /// Special stars; the first is the colliding star.
    pub special: Vec<SpecialStarParams>,
}

impl StarFieldParams {
    /// 5000 field stars, 5000 cluster stars, one colliding star.
    pub fn for_canvas(width: f64, height: f64) -> Self {
        Self {
            field_count: 5000,
            field: FieldParams::for_canvas(width, height),
            cluster_count: 5000,
            cluster: ClusterParams::for_canvas(width, height),
            special: vec![SpecialStarParams::centered(width, height)],
        }
    }

    /// Validates every population and special star.
    pub fn validate(&self) -> Result<(), SceneError> {
        self.field.validate()?;
        self.cluster.validate()?;
        self.special.iter().try_for_each(SpecialStarParams::validate)
    }
}

// ---------------------------------------------------------------------------
// Factories
// ---------------------------------------------------------------------------

/// Apply the shared brightness/color rule to a placed star.
///
/// Brightness is uniform in `[0.1, 0.6)` 80% of the time, otherwise
/// `N(0.4, 0.3)`; it is divided by the star's distance, sizes the radius, and
/// (clamped) becomes the color value.
fn shade(star: &mut Star, params: &BrightnessParams, rng: &mut Prng) {
    let mut brightness = if rng.uniform() < 0.8 {
        rng.uniform() * 0.5 + 0.1
    } else {
        rng.normal(0.4, 0.3)
    };
    brightness /= star.distance;

    star.radius = params.radius_floor.max(brightness * params.radius_scale);
    let hue = rng.uniform() * 360.0;
    let saturation = rng.uniform() * 0.2;
    star.color = Hsva::new(hue, saturation, clamp(brightness, 0.0, 1.0), 1.0);
}

/// A field star, uniformly placed on the canvas, motionless.
pub fn field_star(params: &FieldParams, rng: &mut Prng) -> Star {
    let x = rng.uniform() * params.width;
    let y = rng.uniform() * params.height;
    let mut star = Star::at(x, y, 0.0, Hsva::WHITE);
    shade(&mut star, &params.brightness, rng);
    star
}

/// A cluster star, gaussian around the cluster origin, drifting along the
/// approach angle.
///
/// Each axis is redrawn until the raw gaussian offset is not below the negated
/// canvas dimension, bounding how far off-canvas a star can spawn. Redraws
/// consume the stream like any other draw.
pub fn cluster_star(params: &ClusterParams, rng: &mut Prng) -> Star {
    let mut x = rng.gaussian() * params.spread;
    while x < -params.width {
        x = rng.gaussian() * params.spread;
    }
    let mut y = rng.gaussian() * params.spread;
    while y < -params.height {
        y = rng.gaussian() * params.spread;
    }

    let speed = rng.uniform_range(params.speed_min, params.speed_max);
    let mut star = Star::at(x + params.origin_x, y + params.origin_y, 0.0, Hsva::WHITE);
    star.set_velocity(params.angle.sin() * speed, params.angle.cos() * speed);
    if let Some(scale) = params.distance_scale {
        star.distance = scale / speed;
    }
    shade(&mut star, &params.brightness, rng);
    star
}

/// A special star: white, motionless, fixed radius. Draws nothing.
pub fn special_star(params: &SpecialStarParams) -> Star {
    Star::at(params.x, params.y, params.radius, Hsva::WHITE)
}

// ---------------------------------------------------------------------------
// StarField
// ---------------------------------------------------------------------------

/// The ordinary stars (field population followed by cluster population) and
/// the special stars, in the order they are rendered and advanced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarField {
    /// Ordinary stars: field population, then cluster population.
    pub stars: Vec<Star>,
    /// Special stars, drawn after the ambient overpaint.
    pub special: Vec<Star>,
}

impl StarField {
    /// Build both populations and the special stars. Field stars are drawn
    /// first, then cluster stars.
    pub fn generate(params: &StarFieldParams, rng: &mut Prng) -> Self {
        let mut stars = Vec::with_capacity(params.field_count + params.cluster_count);
        stars.extend((0..params.field_count).map(|_| field_star(&params.field, rng)));
        stars.extend((0..params.cluster_count).map(|_| cluster_star(&params.cluster, rng)));
        let special: Vec<Star> = params.special.iter().map(special_star).collect();

        debug!(
            field = params.field_count,
            cluster = params.cluster_count,
            special = special.len(),
            draws = rng.draws(),
            "star field generated"
        );

        Self { stars, special }
    }

    /// The colliding star (the first special star), if any.
    pub fn colliding_star(&self) -> Option<&Star> {
        self.special.first()
    }

    pub fn colliding_star_mut(&mut self) -> Option<&mut Star> {
        self.special.first_mut()
    }

    /// Largest special-star radius; drives the ambient sky blend.
    pub fn max_special_radius(&self) -> Option<f64> {
        self.special.iter().map(|s| s.radius).reduce(f64::max)
    }

    /// Advance every star once: ordinary stars in list order, then specials.
    pub fn advance(&mut self) {
        self.stars.iter_mut().for_each(Star::advance);
        self.special.iter_mut().for_each(Star::advance);
    }

    /// Total number of stars including specials.
    pub fn len(&self) -> usize {
        self.stars.len() + self.special.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
