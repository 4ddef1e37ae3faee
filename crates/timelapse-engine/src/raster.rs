//! Software framebuffer and the handful of fill primitives the compositor
//! needs: radial gradients, anti-aliased discs, radial glows, full-canvas
//! overpaint and polygon fill.
//!
//! The buffer is always opaque RGB; every primitive blends a straight-alpha
//! [`Rgba`] source over it. Pixel `(x, y)` covers `[x, x+1) x [y, y+1)` and is
//! sampled at its centre.

use image::RgbaImage;
use timelapse_scene::color::Rgba;

/// Below this radius a disc is splatted onto the single pixel containing its
/// centre, weighted by its area.
const POINT_RADIUS: f64 = 0.5;

// ---------------------------------------------------------------------------
// Gradients
// ---------------------------------------------------------------------------

/// A color stop at `offset` in `[0, 1]` along a gradient.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    pub offset: f64,
    pub color: Rgba,
}

impl GradientStop {
    pub const fn new(offset: f64, color: Rgba) -> Self {
        Self { offset, color }
    }
}

/// Color at `t` along `stops` (sorted by offset). Outside the first/last stop
/// the end colors are held.
pub fn gradient_at(stops: &[GradientStop], t: f64) -> Rgba {
    let Some(first) = stops.first() else {
        return Rgba::new(0.0, 0.0, 0.0, 0.0);
    };
    if t <= first.offset {
        return first.color;
    }
    for pair in stops.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if t <= b.offset {
            let span = b.offset - a.offset;
            if span <= 0.0 {
                return b.color;
            }
            return a.color.lerp(b.color, (t - a.offset) / span);
        }
    }
    stops[stops.len() - 1].color
}

// ---------------------------------------------------------------------------
// Raster
// ---------------------------------------------------------------------------

/// An opaque RGB framebuffer with `f32` channels in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    width: u32,
    height: u32,
    pixels: Vec<[f32; 3]>,
}

impl Raster {
    /// A black raster.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![[0.0; 3]; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Overwrite this raster with `other`, reusing the allocation.
    ///
    /// # Panics
    ///
    /// Panics if the sizes differ.
    pub fn copy_from(&mut self, other: &Raster) {
        assert_eq!(
            (self.width, self.height),
            (other.width, other.height),
            "raster sizes differ"
        );
        self.pixels.copy_from_slice(&other.pixels);
    }

    /// The pixel at `(x, y)` as an opaque color.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is outside the raster.
    pub fn pixel(&self, x: u32, y: u32) -> Rgba {
        assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of bounds");
        let [r, g, b] = self.pixels[self.index(x, y)];
        Rgba::opaque(f64::from(r), f64::from(g), f64::from(b))
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Source-over blend of `color` scaled by `coverage` onto one pixel.
    fn blend(&mut self, x: u32, y: u32, color: Rgba, coverage: f64) {
        let alpha = (color.a * coverage).clamp(0.0, 1.0) as f32;
        if alpha <= 0.0 {
            return;
        }
        let idx = self.index(x, y);
        let dst = &mut self.pixels[idx];
        let src = [color.r as f32, color.g as f32, color.b as f32];
        for (d, s) in dst.iter_mut().zip(src) {
            *d = s * alpha + *d * (1.0 - alpha);
        }
    }

    /// Clip the square `[cx - r, cx + r]` (padded by one pixel) to the raster.
    /// Returns `None` when nothing of it is visible.
    fn clip_box(&self, cx: f64, cy: f64, r: f64) -> Option<(u32, u32, u32, u32)> {
        let x0 = (cx - r - 1.0).floor().max(0.0);
        let y0 = (cy - r - 1.0).floor().max(0.0);
        let x1 = (cx + r + 1.0).ceil().min(f64::from(self.width) - 1.0);
        let y1 = (cy + r + 1.0).ceil().min(f64::from(self.height) - 1.0);
        if !(x0 <= x1 && y0 <= y1) {
            return None;
        }
        Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
    }

    /// Blend `color` over every pixel.
    pub fn fill(&mut self, color: Rgba) {
        for y in 0..self.height {
            for x in 0..self.width {
                self.blend(x, y, color, 1.0);
            }
        }
    }

    /// Fill the whole raster with a radial gradient centred on `(cx, cy)`.
    pub fn fill_radial_gradient(&mut self, cx: f64, cy: f64, radius: f64, stops: &[GradientStop]) {
        for y in 0..self.height {
            for x in 0..self.width {
                let dx = f64::from(x) + 0.5 - cx;
                let dy = f64::from(y) + 0.5 - cy;
                let t = (dx * dx + dy * dy).sqrt() / radius;
                let color = gradient_at(stops, t);
                self.blend(x, y, color, 1.0);
            }
        }
    }

    /// Anti-aliased filled disc. Non-positive radii draw nothing.
    pub fn fill_disc(&mut self, cx: f64, cy: f64, radius: f64, color: Rgba) {
        if !(radius > 0.0) {
            return;
        }
        if radius < POINT_RADIUS {
            let (px, py) = (cx.floor(), cy.floor());
            if px >= 0.0 && py >= 0.0 && px < f64::from(self.width) && py < f64::from(self.height) {
                let area = std::f64::consts::PI * radius * radius;
                self.blend(px as u32, py as u32, color, area);
            }
            return;
        }
        let Some((x0, y0, x1, y1)) = self.clip_box(cx, cy, radius) else {
            return;
        };
        for y in y0..=y1 {
            for x in x0..=x1 {
                let dx = f64::from(x) + 0.5 - cx;
                let dy = f64::from(y) + 0.5 - cy;
                let d = (dx * dx + dy * dy).sqrt();
                let coverage = (radius + 0.5 - d).clamp(0.0, 1.0);
                if coverage > 0.0 {
                    self.blend(x, y, color, coverage);
                }
            }
        }
    }

    /// Radial glow: `stops` evaluated at `distance / radius`, nothing beyond
    /// `radius`.
    pub fn fill_radial_glow(&mut self, cx: f64, cy: f64, radius: f64, stops: &[GradientStop]) {
        if !(radius > 0.0) {
            return;
        }
        let Some((x0, y0, x1, y1)) = self.clip_box(cx, cy, radius) else {
            return;
        };
        for y in y0..=y1 {
            for x in x0..=x1 {
                let dx = f64::from(x) + 0.5 - cx;
                let dy = f64::from(y) + 0.5 - cy;
                let t = (dx * dx + dy * dy).sqrt() / radius;
                if t < 1.0 {
                    self.blend(x, y, gradient_at(stops, t), 1.0);
                }
            }
        }
    }

    /// Even-odd scanline fill of a closed polygon.
    pub fn fill_polygon(&mut self, points: &[[f64; 2]], color: Rgba) {
        if points.len() < 3 {
            return;
        }
        let (min_y, max_y) = points
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                (lo.min(p[1]), hi.max(p[1]))
            });
        let row0 = (min_y - 0.5).ceil().max(0.0);
        let row1 = (max_y - 0.5).floor().min(f64::from(self.height) - 1.0);
        if !(row0 <= row1) {
            return;
        }

        let mut crossings: Vec<f64> = Vec::with_capacity(points.len());
        for row in row0 as u32..=row1 as u32 {
            let yc = f64::from(row) + 0.5;
            crossings.clear();
            for (i, a) in points.iter().enumerate() {
                let b = points[(i + 1) % points.len()];
                if (a[1] <= yc) != (b[1] <= yc) {
                    crossings.push(a[0] + (yc - a[1]) * (b[0] - a[0]) / (b[1] - a[1]));
                }
            }
            crossings.sort_by(f64::total_cmp);

            for span in crossings.chunks_exact(2) {
                let start = (span[0] - 0.5).ceil().max(0.0);
                let end = (span[1] - 0.5).ceil().min(f64::from(self.width));
                if start >= end {
                    continue;
                }
                for x in start as u32..end as u32 {
                    self.blend(x, row, color, 1.0);
                }
            }
        }
    }

    /// Quantize to an 8-bit RGBA image for encoding.
    pub fn to_image(&self) -> RgbaImage {
        let mut bytes = Vec::with_capacity(self.pixels.len() * 4);
        for &[r, g, b] in &self.pixels {
            let px = Rgba::opaque(f64::from(r), f64::from(g), f64::from(b)).to_rgba8();
            bytes.extend_from_slice(&px);
        }
        RgbaImage::from_raw(self.width, self.height, bytes)
            .expect("buffer length always matches width * height * 4")
    }

    /// Raw RGBA8 bytes, row-major.
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.to_image().into_raw()
    }
}
