//! Timelapse Engine -- frame compositing and the deterministic frame loop for
//! the galaxy-collision timelapse.
//!
//! This crate builds on [`timelapse_scene`]: it turns a [`SimulationConfig`]
//! into a scene, drives it frame by frame through the scripted events, paints
//! each frame and hands it to a [`FrameSink`].
//!
//! - [`config`] -- every constant of the sequence, JSON-loadable.
//! - [`raster`] -- the RGB frame buffer and its drawing primitives.
//! - [`compositor`] -- sky, stars, ambient blend and terrain, per frame.
//! - [`driver`] -- the [`Simulation`] frame loop and event schedule.
//! - [`sink`] -- PNG, in-memory and null frame outputs.
//! - [`snapshot`] -- BLAKE3-hashed scene state for determinism checks.
//!
//! # Quick Start
//!
//! ```
//! use timelapse_engine::prelude::*;
//!
//! let mut config = SimulationConfig::default();
//! config.canvas = CanvasConfig { width: 80, height: 45 };
//! config.stars.field_count = 50;
//! config.stars.cluster_count = 50;
//! config.frames = 12;
//! config.events.collision_frame = 6;
//!
//! let mut sim = Simulation::new(config).unwrap();
//! let mut sink = MemorySink::new();
//! while let Some(report) = sim.step(&mut sink) {
//!     assert!(report.written);
//! }
//! assert_eq!(sim.frame(), 12);
//! ```
//!
//! [`SimulationConfig`]: config::SimulationConfig
//! [`FrameSink`]: sink::FrameSink
//! [`Simulation`]: driver::Simulation

#![deny(unsafe_code)]

pub mod compositor;
pub mod config;
pub mod driver;
pub mod raster;
pub mod sink;
pub mod snapshot;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

/// Re-export the scene crate for convenience.
pub use timelapse_scene;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    pub use timelapse_scene::prelude::*;

    pub use crate::compositor::{ambient_color, sky_gradient, Compositor, StarSample};
    pub use crate::config::{
        AmbientConfig, CanvasConfig, ConfigError, EventSchedule, PeriodicEvent, RenderConfig,
        SimulationConfig, SpecialStarConfig, StarFieldConfig, TerrainConfig,
    };
    pub use crate::driver::{FiredEvents, FrameDiagnostics, FrameReport, RunSummary, Simulation};
    pub use crate::raster::{GradientStop, Raster};
    pub use crate::sink::{FrameSink, MemorySink, NullSink, PngSink, SinkError};
    pub use crate::snapshot::{SceneSnapshot, SnapshotError};
}
