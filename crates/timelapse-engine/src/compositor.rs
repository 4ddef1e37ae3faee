//! Per-frame compositing: sky, stars, ambient blend, special stars, terrain.
//!
//! A frame is produced in two explicit phases:
//!
//! 1. [`Compositor::render`] samples every star (drawing per-frame jitter from
//!    the shared stream) and paints the layers bottom to top. Jitter only
//!    affects the drawn sample; stars are read, never written.
//! 2. [`Compositor::advance`] steps every star exactly once, in list order.
//!
//! [`Compositor::composite`] runs both. In headless mode the sampling phase
//! still consumes exactly the same draws, so a headless run and a rendered run
//! reach identical star state.

use timelapse_scene::prelude::*;

use crate::config::{AmbientConfig, CanvasConfig, RenderConfig, TerrainConfig};
use crate::raster::{GradientStop, Raster};

/// Horizon-glow colors of the background sky.
const HORIZON_START: Rgba = Rgba::TURQUOISE;
const HORIZON_MID: Rgba = Rgba::opaque(0.0, 0.0, 0.15);
const HORIZON_END: Rgba = Rgba::opaque(0.0, 0.0, 0.1);

/// Background stops, centred at `(w / 2, 2h)` with radius `2h`.
pub fn sky_gradient() -> [GradientStop; 3] {
    [
        GradientStop::new(0.0, HORIZON_START),
        GradientStop::new(0.8, HORIZON_MID),
        GradientStop::new(1.0, HORIZON_END),
    ]
}

/// The ambient overpaint for a colliding-star radius, or `None` below the
/// first breakpoint.
///
/// Between breakpoints the color is an S-curve blend, so the sky changes
/// continuously with the radius.
pub fn ambient_color(radius: f64, ambient: &AmbientConfig) -> Option<Rgba> {
    let a = ambient;
    if radius > a.start_radius && radius <= a.mid_radius {
        let t = smoothstep((radius - a.start_radius) / (a.mid_radius - a.start_radius), 0.0, 1.0);
        Some(a.start_color.lerp(a.mid_color, t))
    } else if radius > a.mid_radius {
        let t = smoothstep((radius - a.mid_radius) / (a.end_radius - a.mid_radius), 0.0, 1.0);
        Some(a.mid_color.lerp(a.end_color, t))
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// StarSample
// ---------------------------------------------------------------------------

/// What gets drawn for one star on one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StarSample {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub color: Rgba,
}

impl StarSample {
    /// Jittered sample of `star`: three gaussian draws (x, y, radius).
    pub fn jittered(star: &Star, jitter_sd: f64, rng: &mut Prng) -> Self {
        let dx = rng.gaussian() * jitter_sd;
        let dy = rng.gaussian() * jitter_sd;
        let dr = rng.gaussian() * jitter_sd;
        Self {
            x: star.x + dx,
            y: star.y + dy,
            radius: star.radius + dr,
            color: star.color.to_rgba(),
        }
    }

    /// Paint as a disc, or as a soft glow above `glow_threshold`.
    ///
    /// Glows are drawn larger than the radius (`0.01 r^2 + 2r`): solid to half
    /// the glow radius, then a quick drop to 20% alpha and a fade to nothing.
    pub fn draw(&self, raster: &mut Raster, glow_threshold: f64) {
        if self.radius > glow_threshold {
            let r = 0.01 * self.radius * self.radius + self.radius * 2.0;
            let c = self.color;
            let stops = [
                GradientStop::new(0.0, c),
                GradientStop::new(0.5, c),
                GradientStop::new(0.55, c.with_alpha(c.a * 0.2)),
                GradientStop::new(1.0, c.with_alpha(0.0)),
            ];
            raster.fill_radial_glow(self.x, self.y, r, &stops);
        } else {
            raster.fill_disc(self.x, self.y, self.radius, self.color);
        }
    }
}

// ---------------------------------------------------------------------------
// Compositor
// ---------------------------------------------------------------------------

/// Renders frames for one canvas. The static sky is painted once and copied
/// into the frame buffer at the start of every frame.
pub struct Compositor {
    background: Raster,
    frame: Raster,
    ambient: AmbientConfig,
    render: RenderConfig,
    terrain_color: Rgba,
    headless: bool,
}

impl Compositor {
    pub fn new(
        canvas: &CanvasConfig,
        ambient: AmbientConfig,
        render: RenderConfig,
        terrain: &TerrainConfig,
        headless: bool,
    ) -> Self {
        // A headless compositor never touches pixels; keep the buffers empty.
        let (w, h) = if headless {
            (0, 0)
        } else {
            (canvas.width, canvas.height)
        };
        let mut background = Raster::new(w, h);
        let (width, height) = canvas.size();
        background.fill_radial_gradient(width / 2.0, height * 2.0, height * 2.0, &sky_gradient());

        Self {
            frame: background.clone(),
            background,
            ambient,
            render,
            terrain_color: terrain.color,
            headless,
        }
    }

    pub fn is_headless(&self) -> bool {
        self.headless
    }

    /// The most recently rendered frame.
    pub fn frame(&self) -> &Raster {
        &self.frame
    }

    /// Sampling phase. Consumes three draws per star (ordinary stars first,
    /// then special stars) and paints the frame unless headless.
    pub fn render(&mut self, stars: &StarField, terrain: &Terrain, rng: &mut Prng) {
        let sd = self.render.jitter_sd;
        let glow = self.render.glow_threshold;

        if self.headless {
            for star in stars.stars.iter().chain(&stars.special) {
                StarSample::jittered(star, sd, rng);
            }
            return;
        }

        self.frame.copy_from(&self.background);

        for star in &stars.stars {
            StarSample::jittered(star, sd, rng).draw(&mut self.frame, glow);
        }

        if let Some(color) = stars
            .max_special_radius()
            .and_then(|r| ambient_color(r, &self.ambient))
        {
            self.frame.fill(color);
        }

        for star in &stars.special {
            StarSample::jittered(star, sd, rng).draw(&mut self.frame, glow);
        }

        self.frame.fill_polygon(&terrain.polygon(), self.terrain_color);
    }

    /// Stepping phase: every star advances exactly once.
    pub fn advance(stars: &mut StarField) {
        stars.advance();
    }

    /// Render, then advance.
    pub fn composite(&mut self, stars: &mut StarField, terrain: &Terrain, rng: &mut Prng) {
        self.render(stars, terrain, rng);
        Self::advance(stars);
    }
}
