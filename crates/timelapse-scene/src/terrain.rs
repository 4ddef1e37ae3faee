//! Midpoint-displacement mountain silhouette and its erosion.
//!
//! Generation starts from three heights (`min`, `max`, `min`); placing the apex
//! counts as the first round. Every further round inserts one perturbed
//! midpoint between every adjacent pair, with the displacement magnitude
//! halving from round to round. Pairs are visited right to left; the draw for
//! the rightmost pair comes first. After `R` rounds there are `2^R + 1`
//! samples, spread evenly across the canvas width.
//!
//! Heights are stored above the baseline (the bottom canvas edge). The
//! rasterizer gets a closed polygon in top-down canvas coordinates from
//! [`Terrain::polygon`].

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::rng::Prng;
use crate::{check, check_canvas, SceneError};

/// Upper bound on subdivision rounds (65537 samples).
pub const MAX_ROUNDS: u32 = 16;

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Midpoint-displacement parameters for one canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainParams {
    /// Samples are spread evenly over `[0, width]`.
    pub width: f64,
    /// Canvas height; the baseline sits here.
    pub height: f64,
    /// Height of both endpoints; also the floor of the displacement scale.
    pub min_height: f64,
    /// Height of the initial apex.
    pub max_height: f64,
    /// Subdivision rounds including the apex round; at least 1.
    pub rounds: u32,
    /// Constant subtracted from every new midpoint.
    pub bias: f64,
}

impl TerrainParams {
    /// Endpoints at `height / 40`, apex at `height / 5`, 8 rounds (257 samples).
    pub fn for_canvas(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            min_height: height / 40.0,
            max_height: height / 5.0,
            rounds: 8,
            bias: 0.5,
        }
    }

    /// Rejects negative heights, `min_height > max_height`, and round counts
    /// outside `1..=MAX_ROUNDS`.
    pub fn validate(&self) -> Result<(), SceneError> {
        check_canvas(self.width, self.height)?;
        check("min_height", self.min_height, ">= 0", |v| v >= 0.0)?;
        check("max_height", self.max_height, ">= 0", |v| v >= 0.0)?;
        check("bias", self.bias, ">= 0", |v| v >= 0.0)?;
        if self.min_height > self.max_height {
            return Err(SceneError::InvertedRange {
                name: "terrain height",
                min: self.min_height,
                max: self.max_height,
            });
        }
        if self.rounds == 0 {
            return Err(SceneError::OutOfRange {
                name: "rounds",
                value: 0.0,
                expected: ">= 1",
            });
        }
        if self.rounds > MAX_ROUNDS {
            return Err(SceneError::TooManyRounds {
                rounds: self.rounds,
                max: MAX_ROUNDS,
            });
        }
        Ok(())
    }

    /// Number of samples `generate` produces: `2^rounds + 1`.
    pub fn sample_count(&self) -> usize {
        (1usize << self.rounds) + 1
    }
}

/// Per-sample erosion factor band, `[min, max)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErosionBand {
    /// Smallest factor (strongest shrink).
    pub min: f64,
    /// Largest factor, exclusive.
    pub max: f64,
}

impl Default for ErosionBand {
    fn default() -> Self {
        Self {
            min: 0.985,
            max: 0.990,
        }
    }
}

impl ErosionBand {
    /// Factors must shrink: `0 < min <= max <= 1` and `min < 1`.
    pub fn validate(&self) -> Result<(), SceneError> {
        check("erosion.min", self.min, "in (0, 1)", |v| v > 0.0 && v < 1.0)?;
        check("erosion.max", self.max, "in (0, 1]", |v| v > 0.0 && v <= 1.0)?;
        if self.min > self.max {
            return Err(SceneError::InvertedRange {
                name: "erosion",
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Terrain
// ---------------------------------------------------------------------------

/// One silhouette sample: canvas x and height above the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerrainSample {
    /// Horizontal position in pixels.
    pub x: f64,
    /// Height above the baseline; never negative.
    pub height: f64,
}

/// The mountain silhouette. Sample x-coordinates are fixed after generation;
/// only heights change, and only downwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Terrain {
    samples: Vec<TerrainSample>,
    width: f64,
    baseline: f64,
}

impl Terrain {
    /// Generate the silhouette for a canvas.
    pub fn generate(params: &TerrainParams, rng: &mut Prng) -> Self {
        let heights = midpoint_heights(params, rng);
        let step = params.width / (heights.len() - 1) as f64;
        let samples = heights
            .into_iter()
            .enumerate()
            .map(|(i, height)| TerrainSample {
                x: step * i as f64,
                height,
            })
            .collect::<Vec<_>>();

        debug!(samples = samples.len(), rounds = params.rounds, "terrain generated");

        Self {
            samples,
            width: params.width,
            baseline: params.height,
        }
    }

    /// Shrink every sample height by an independent factor from `band`.
    pub fn erode(&mut self, band: &ErosionBand, rng: &mut Prng) {
        for sample in &mut self.samples {
            sample.height *= rng.uniform_range(band.min, band.max);
        }
    }

    pub fn samples(&self) -> &[TerrainSample] {
        &self.samples
    }

    pub fn heights(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|s| s.height)
    }

    /// The y-coordinate of the bottom canvas edge.
    pub fn baseline(&self) -> f64 {
        self.baseline
    }

    /// Closed silhouette polygon in canvas coordinates (y grows downwards):
    /// every sample at `y = baseline - height`, then the bottom-right and
    /// bottom-left corners.
    pub fn polygon(&self) -> Vec<[f64; 2]> {
        let mut points = Vec::with_capacity(self.samples.len() + 2);
        points.extend(
            self.samples
                .iter()
                .map(|s| [s.x, self.baseline - s.height]),
        );
        points.push([self.width, self.baseline]);
        points.push([0.0, self.baseline]);
        points
    }
}

/// Run the subdivision rounds and return the raw heights, left to right.
pub fn midpoint_heights(params: &TerrainParams, rng: &mut Prng) -> Vec<f64> {
    let min_height = params.min_height;
    let mut heights = vec![min_height, params.max_height, min_height];
    let mut magnitude = 1.0;

    for _ in 1..params.rounds {
        // Right to left, as if each midpoint were inserted in place.
        let mids: Vec<f64> = (1..heights.len())
            .rev()
            .map(|j| {
                let mean = (heights[j] + heights[j - 1]) / 2.0;
                let displacement = rng.uniform_range(-magnitude, magnitude);
                let mid = mean + min_height.max(mean - min_height) * displacement - params.bias;
                mid.max(0.0)
            })
            .collect();

        let mut next = Vec::with_capacity(heights.len() * 2 - 1);
        next.push(heights[0]);
        for (&height, &mid) in heights[1..].iter().zip(mids.iter().rev()) {
            next.push(mid);
            next.push(height);
        }
        heights = next;
        magnitude /= 2.0;
    }

    heights
}
