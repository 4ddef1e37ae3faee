//! The star record and its per-frame advance step.

use serde::{Deserialize, Serialize};

use crate::color::Hsva;

/// A single star on the plane.
///
/// Stars are created once by the [`starfield`](crate::starfield) factories and
/// never destroyed. Each rendered frame advances every star exactly once with
/// [`advance`](Self::advance); scripted events mutate individual stars through
/// the setters below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Star {
    /// Horizontal position in pixels.
    pub x: f64,
    /// Vertical position in pixels, growing downwards.
    pub y: f64,
    /// Horizontal displacement per step.
    pub vx: f64,
    /// Vertical displacement per step.
    pub vy: f64,
    /// Apparent size in pixels. Never negative.
    pub radius: f64,
    /// Multiplicative per-step radius scalar. Never negative.
    pub decay: f64,
    /// Drawn colour; events may replace it.
    pub color: Hsva,
    /// Brightness attenuation; nearer (faster) stars get a smaller distance.
    pub distance: f64,
}

impl Star {
    /// A motionless star with unit decay and unit distance.
    pub fn at(x: f64, y: f64, radius: f64, color: Hsva) -> Self {
        Self {
            x,
            y,
            vx: 0.0,
            vy: 0.0,
            radius,
            decay: 1.0,
            color,
            distance: 1.0,
        }
    }

    /// One simulation step: move by the velocity, scale the radius.
    pub fn advance(&mut self) {
        self.x += self.vx;
        self.y += self.vy;
        self.radius *= self.decay;
    }

    /// Replace the per-step displacement.
    pub fn set_velocity(&mut self, vx: f64, vy: f64) {
        self.vx = vx;
        self.vy = vy;
    }

    /// Set the per-step radius factor.
    ///
    /// # Panics
    ///
    /// Panics if `decay` is negative or NaN; a negative factor would flip the
    /// sign of the radius.
    pub fn set_decay(&mut self, decay: f64) {
        assert!(decay >= 0.0, "decay factor must be non-negative, got {decay}");
        self.decay = decay;
    }

    /// Explosion: stop the star, flash it white at `radius`, then fade by
    /// `decay` per step.
    pub fn flash(&mut self, radius: f64, decay: f64) {
        self.set_velocity(0.0, 0.0);
        self.radius = radius.max(0.0);
        self.set_decay(decay);
        self.color = Hsva::WHITE;
    }
}

/// The per-step factor that compounds `from` into `to` over `steps` steps.
///
/// Returns `None` when `steps == 0` or when the ratio is not positive and
/// finite (a zero starting radius can never grow).
pub fn growth_factor(from: f64, to: f64, steps: u64) -> Option<f64> {
    if steps == 0 {
        return None;
    }
    let ratio = to / from;
    if !(ratio.is_finite() && ratio > 0.0) {
        return None;
    }
    Some(ratio.powf(1.0 / steps as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn star() -> Star {
        Star::at(10.0, 20.0, 2.0, Hsva::WHITE)
    }

    #[test]
    fn advance_moves_and_scales() {
        let mut s = star();
        s.set_velocity(1.5, -0.5);
        s.set_decay(0.5);
        s.advance();
        assert_eq!((s.x, s.y, s.radius), (11.5, 19.5, 1.0));
        s.advance();
        assert_eq!((s.x, s.y, s.radius), (13.0, 19.0, 0.5));
    }

    #[test]
    fn unit_decay_keeps_radius() {
        let mut s = star();
        for _ in 0..1000 {
            s.advance();
        }
        assert_eq!(s.radius, 2.0);
    }

    #[test]
    fn flash_resets_motion_and_color() {
        let mut s = star();
        s.set_velocity(3.0, 3.0);
        s.color = Hsva::new(200.0, 0.1, 0.3, 1.0);
        s.flash(4.0, 0.95);
        assert_eq!((s.vx, s.vy), (0.0, 0.0));
        assert_eq!(s.radius, 4.0);
        assert_eq!(s.decay, 0.95);
        assert_eq!(s.color, Hsva::WHITE);
        s.advance();
        assert!((s.radius - 3.8).abs() < 1e-12);
    }

    #[test]
    #[should_panic(expected = "decay factor must be non-negative")]
    fn negative_decay_panics() {
        star().set_decay(-0.1);
    }

    #[test]
    fn growth_factor_closes_the_gap() {
        let f = growth_factor(0.5, 2560.0, 600).unwrap();
        let mut r = 0.5;
        for _ in 0..600 {
            r *= f;
        }
        assert!((r - 2560.0).abs() / 2560.0 < 1e-9, "r = {r}");
    }

    #[test]
    fn growth_factor_rejects_degenerate_inputs() {
        assert_eq!(growth_factor(0.5, 2560.0, 0), None);
        assert_eq!(growth_factor(0.0, 2560.0, 10), None);
        assert_eq!(growth_factor(1.0, -1.0, 10), None);
    }
}
