//! Colors and the scalar helpers used to blend them.
//!
//! Stars carry an [`Hsva`] color (the star-field rules are expressed in
//! hue/saturation/value); the rasterizer works in [`Rgba`]. All channels are
//! `f64` in `[0, 1]`, hue is in degrees.

use serde::{Deserialize, Serialize};

/// Clamp `value` into `[min, max]`.
pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}

/// Hermite S-curve: 0 at `edge0`, 1 at `edge1`, smooth in between.
pub fn smoothstep(value: f64, edge0: f64, edge1: f64) -> f64 {
    let t = clamp((value - edge0) / (edge1 - edge0), 0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

// ---------------------------------------------------------------------------
// Rgba
// ---------------------------------------------------------------------------

/// Straight (non-premultiplied) RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::opaque(0.0, 0.0, 0.0);
    pub const WHITE: Rgba = Rgba::opaque(1.0, 1.0, 1.0);
    /// CSS `turquoise` (#40E0D0).
    pub const TURQUOISE: Rgba = Rgba::opaque(0.250_980_392_156_862_74, 0.878_431_372_549_019_6, 0.815_686_274_509_803_9);
    /// CSS `lightskyblue` (#87CEFA).
    pub const LIGHT_SKY_BLUE: Rgba = Rgba::opaque(0.529_411_764_705_882_4, 0.807_843_137_254_902, 0.980_392_156_862_745_1);
    /// CSS `orangered` (#FF4500).
    pub const ORANGE_RED: Rgba = Rgba::opaque(1.0, 0.270_588_235_294_117_63, 0.0);

    pub const fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: f64, g: f64, b: f64) -> Self {
        Self::new(r, g, b, 1.0)
    }

    /// Build a color from 8-bit channels and a float alpha.
    pub fn from_rgb8(r: u8, g: u8, b: u8, a: f64) -> Self {
        Self::new(f64::from(r) / 255.0, f64::from(g) / 255.0, f64::from(b) / 255.0, a)
    }

    /// Same color with a different alpha.
    pub const fn with_alpha(self, a: f64) -> Self {
        Self::new(self.r, self.g, self.b, a)
    }

    /// Linear interpolation of all four channels; `t` is clamped to `[0, 1]`.
    pub fn lerp(self, other: Rgba, t: f64) -> Rgba {
        let t = clamp(t, 0.0, 1.0);
        let mix = |a: f64, b: f64| a + (b - a) * t;
        Rgba::new(
            mix(self.r, other.r),
            mix(self.g, other.g),
            mix(self.b, other.b),
            mix(self.a, other.a),
        )
    }

    /// Quantize to 8-bit RGBA.
    pub fn to_rgba8(self) -> [u8; 4] {
        let q = |v: f64| (clamp(v, 0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }
}

// ---------------------------------------------------------------------------
// Hsva
// ---------------------------------------------------------------------------

/// Hue/saturation/value color with alpha.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hsva {
    /// Hue in degrees, any value; wrapped into `[0, 360)` on conversion.
    pub hue: f64,
    pub saturation: f64,
    pub value: f64,
    pub alpha: f64,
}

impl Hsva {
    pub const WHITE: Hsva = Hsva::new(0.0, 0.0, 1.0, 1.0);

    pub const fn new(hue: f64, saturation: f64, value: f64, alpha: f64) -> Self {
        Self {
            hue,
            saturation,
            value,
            alpha,
        }
    }

    /// Convert to RGBA. Saturation and value are clamped to `[0, 1]`.
    pub fn to_rgba(self) -> Rgba {
        let s = clamp(self.saturation, 0.0, 1.0);
        let v = clamp(self.value, 0.0, 1.0);
        let h = self.hue.rem_euclid(360.0) / 60.0;
        let sector = h.floor();
        let f = h - sector;

        let p = v * (1.0 - s);
        let q = v * (1.0 - s * f);
        let t = v * (1.0 - s * (1.0 - f));

        let (r, g, b) = match sector as u8 {
            0 => (v, t, p),
            1 => (q, v, p),
            2 => (p, v, t),
            3 => (p, q, v),
            4 => (t, p, v),
            _ => (v, p, q),
        };
        Rgba::new(r, g, b, self.alpha)
    }
}
