//! Timelapse Scene -- procedural star fields and fractal terrain for the
//! galaxy-collision timelapse.
//!
//! This crate owns the scene model: the [`Star`](star::Star) record, the two
//! star populations plus the colliding star (see [`starfield`]), and the
//! midpoint-displacement mountain silhouette (see [`terrain`]). Every random
//! decision is drawn from a single explicitly-passed [`Prng`](rng::Prng), so
//! one seed reproduces the whole scene.
//!
//! # Quick Start
//!
//! ```
//! use timelapse_scene::prelude::*;
//!
//! let mut rng = Prng::seed_from_u64(1);
//!
//! let params = TerrainParams::for_canvas(1280.0, 720.0);
//! let terrain = Terrain::generate(&params, &mut rng);
//! assert_eq!(terrain.samples().len(), (1 << params.rounds) + 1);
//!
//! let field = FieldParams::for_canvas(1280.0, 720.0);
//! let star = field_star(&field, &mut rng);
//! assert!(star.radius >= field.brightness.radius_floor);
//! ```

#![deny(unsafe_code)]

pub mod color;
pub mod rng;
pub mod star;
pub mod starfield;
pub mod terrain;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced when validating scene generation parameters.
///
/// Generation itself is infallible; parameters are checked up front so that
/// nothing is generated from a configuration that could loop forever, divide
/// by zero, or break the non-negative radius and height invariants.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SceneError {
    /// A canvas dimension was zero, negative, or not finite.
    #[error("canvas dimensions must be positive and finite, got {width}x{height}")]
    InvalidCanvas { width: f64, height: f64 },

    /// A numeric parameter was outside its permitted range.
    #[error("parameter '{name}' is out of range: {value} ({expected})")]
    OutOfRange {
        name: &'static str,
        value: f64,
        expected: &'static str,
    },

    /// A `[min, max)` range had `min > max`.
    #[error("range '{name}' is inverted: min {min} > max {max}")]
    InvertedRange {
        name: &'static str,
        min: f64,
        max: f64,
    },

    /// Too many subdivision rounds were requested for the terrain.
    #[error("terrain rounds {rounds} exceeds the maximum of {max}")]
    TooManyRounds { rounds: u32, max: u32 },
}

/// Check that `value` is finite and satisfies `accept`, naming the parameter
/// in the error otherwise.
pub(crate) fn check(
    name: &'static str,
    value: f64,
    expected: &'static str,
    accept: impl Fn(f64) -> bool,
) -> Result<(), SceneError> {
    if value.is_finite() && accept(value) {
        Ok(())
    } else {
        Err(SceneError::OutOfRange {
            name,
            value,
            expected,
        })
    }
}

/// Check that a canvas has positive, finite dimensions.
pub(crate) fn check_canvas(width: f64, height: f64) -> Result<(), SceneError> {
    let valid = |v: f64| v.is_finite() && v > 0.0;
    if valid(width) && valid(height) {
        Ok(())
    } else {
        Err(SceneError::InvalidCanvas { width, height })
    }
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::color::{clamp, smoothstep, Hsva, Rgba};
    pub use crate::rng::Prng;
    pub use crate::star::Star;
    pub use crate::starfield::{
        cluster_star, field_star, special_star, BrightnessParams, ClusterParams, FieldParams,
        SpecialStarParams, StarField, StarFieldParams,
    };
    pub use crate::terrain::{ErosionBand, Terrain, TerrainParams, TerrainSample};
    pub use crate::SceneError;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_rejects_nan() {
        let err = check("speed", f64::NAN, "> 0", |v| v > 0.0).unwrap_err();
        assert!(matches!(err, SceneError::OutOfRange { name: "speed", .. }));
    }

    #[test]
    fn check_canvas_rejects_zero_width() {
        assert!(check_canvas(0.0, 10.0).is_err());
        assert!(check_canvas(10.0, f64::INFINITY).is_err());
        assert!(check_canvas(1280.0, 720.0).is_ok());
    }

    #[test]
    fn error_messages_name_the_parameter() {
        let err = SceneError::InvertedRange {
            name: "speed",
            min: 2.0,
            max: 1.0,
        };
        assert_eq!(err.to_string(), "range 'speed' is inverted: min 2 > max 1");
    }
}
