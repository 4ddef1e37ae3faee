//! Scene snapshots with BLAKE3 hashing.
//!
//! A [`SceneSnapshot`] holds everything that decides future frames: the frame
//! counter, the PRNG stream, every star and the terrain. Its `hash` is a BLAKE3
//! digest of that state serialized as JSON, so two runs can be compared frame
//! for frame without keeping pixels around.
//!
//! ```
//! use timelapse_engine::prelude::*;
//!
//! let mut config = SimulationConfig::default();
//! config.canvas = CanvasConfig { width: 32, height: 18 };
//! config.stars.field_count = 10;
//! config.stars.cluster_count = 10;
//! config.frames = 40;
//! config.events.collision_frame = 30;
//! config.headless = true;
//!
//! let mut sim = Simulation::new(config).unwrap();
//! for _ in 0..20 {
//!     sim.step(&mut NullSink);
//! }
//! let branch = sim.capture_snapshot();
//! assert_eq!(branch.frame, 20);
//! assert_eq!(branch.hash.len(), 64);
//!
//! sim.run(&mut NullSink);
//! let first = sim.state_hash();
//!
//! sim.restore_from_snapshot(&branch).unwrap();
//! sim.run(&mut NullSink);
//! assert_eq!(sim.state_hash(), first);
//! ```
//!
//! The compositor's buffers, the write-failure counter and diagnostics are not
//! part of a snapshot; they carry no state from one frame to the next.

use serde::{Deserialize, Serialize};
use timelapse_scene::prelude::*;

use crate::driver::Simulation;

/// Restore rejected; the simulation is left untouched.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot hash mismatch: recorded {recorded} but recomputed {computed}")]
    HashMismatch { recorded: String, computed: String },

    #[error("snapshot frame {frame} is past the configured run length {frames}")]
    FrameOutOfRange { frame: u64, frames: u64 },

    #[error("snapshot has {found} terrain samples, this run expects {expected}")]
    TerrainMismatch { found: usize, expected: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneSnapshot {
    /// Index of the next frame to produce.
    pub frame: u64,
    pub rng: Prng,
    pub stars: StarField,
    pub terrain: Terrain,
    /// BLAKE3 hex digest (64 lowercase hex chars) of the fields above.
    pub hash: String,
}

impl SceneSnapshot {
    /// Whether `hash` still matches the captured state.
    pub fn verify(&self) -> bool {
        compute_hash(self.frame, &self.rng, &self.stars, &self.terrain) == self.hash
    }
}

// ---------------------------------------------------------------------------
// Hashing helpers
// ---------------------------------------------------------------------------

pub(crate) fn compute_hash(frame: u64, rng: &Prng, stars: &StarField, terrain: &Terrain) -> String {
    #[derive(Serialize)]
    struct HashableState<'a> {
        frame: u64,
        rng: &'a Prng,
        stars: &'a StarField,
        terrain: &'a Terrain,
    }

    let hashable = HashableState {
        frame,
        rng,
        stars,
        terrain,
    };
    let json_bytes =
        serde_json::to_vec(&hashable).expect("scene state should always be JSON-serializable");

    blake3::hash(&json_bytes).to_hex().to_string()
}

// ---------------------------------------------------------------------------
// Simulation snapshot/restore methods
// ---------------------------------------------------------------------------

impl Simulation {
    pub fn capture_snapshot(&self) -> SceneSnapshot {
        let (rng, stars, terrain) = self.scene_state();
        SceneSnapshot {
            frame: self.frame(),
            rng: rng.clone(),
            stars: stars.clone(),
            terrain: terrain.clone(),
            hash: self.state_hash(),
        }
    }

    /// BLAKE3 digest of the current scene state.
    pub fn state_hash(&self) -> String {
        let (rng, stars, terrain) = self.scene_state();
        compute_hash(self.frame(), rng, stars, terrain)
    }

    /// Rewind (or fast-forward) to `snapshot`.
    ///
    /// # Errors
    ///
    /// Fails without modifying anything if the hash does not verify, if the
    /// snapshot lies beyond this run's last frame, or if its terrain was built
    /// with a different subdivision depth.
    pub fn restore_from_snapshot(&mut self, snapshot: &SceneSnapshot) -> Result<(), SnapshotError> {
        let computed = compute_hash(snapshot.frame, &snapshot.rng, &snapshot.stars, &snapshot.terrain);
        if computed != snapshot.hash {
            return Err(SnapshotError::HashMismatch {
                recorded: snapshot.hash.clone(),
                computed,
            });
        }
        let frames = self.config().frames;
        if snapshot.frame > frames {
            return Err(SnapshotError::FrameOutOfRange {
                frame: snapshot.frame,
                frames,
            });
        }
        let expected = self.terrain().samples().len();
        let found = snapshot.terrain.samples().len();
        if found != expected {
            return Err(SnapshotError::TerrainMismatch { found, expected });
        }

        self.restore_scene(
            snapshot.frame,
            snapshot.rng.clone(),
            snapshot.stars.clone(),
            snapshot.terrain.clone(),
        );
        tracing::debug!(frame = snapshot.frame, "restored snapshot");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CanvasConfig, SimulationConfig};
    use crate::sink::NullSink;

    fn sim() -> Simulation {
        let mut config = SimulationConfig::default();
        config.canvas = CanvasConfig {
            width: 40,
            height: 24,
        };
        config.stars.field_count = 25;
        config.stars.cluster_count = 25;
        config.frames = 50;
        config.events.swing_by.start = 5;
        config.events.swing_by.every = 3;
        config.events.explosion.start = 7;
        config.events.explosion.every = 4;
        config.events.collision_frame = 30;
        config.events.erosion_start = 40;
        config.headless = true;
        Simulation::new(config).unwrap()
    }

    #[test]
    fn hash_is_hex_and_verifies() {
        let snapshot = sim().capture_snapshot();
        assert_eq!(snapshot.hash.len(), 64);
        assert!(snapshot.hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(snapshot.verify());
    }

    #[test]
    fn hash_changes_every_frame() {
        let mut sim = sim();
        let mut seen = std::collections::HashSet::new();
        seen.insert(sim.state_hash());
        while sim.step(&mut NullSink).is_some() {
            assert!(seen.insert(sim.state_hash()));
        }
    }

    #[test]
    fn restore_replays_identically() {
        let mut sim = sim();
        for _ in 0..20 {
            sim.step(&mut NullSink);
        }
        let branch = sim.capture_snapshot();
        let first = sim.run(&mut NullSink).state_hash;

        sim.restore_from_snapshot(&branch).unwrap();
        assert_eq!(sim.frame(), 20);
        assert_eq!(sim.state_hash(), branch.hash);
        let second = sim.run(&mut NullSink).state_hash;
        assert_eq!(first, second);
    }

    #[test]
    fn snapshot_survives_json() {
        let mut sim = sim();
        for _ in 0..10 {
            sim.step(&mut NullSink);
        }
        let snapshot = sim.capture_snapshot();
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: SceneSnapshot = serde_json::from_str(&json).unwrap();
        assert!(back.verify());
        assert_eq!(back, snapshot);
    }

    #[test]
    fn tampered_snapshot_is_rejected() {
        let mut sim = sim();
        let mut snapshot = sim.capture_snapshot();
        snapshot.stars.stars[0].radius += 1.0;
        let before = sim.state_hash();

        let err = sim.restore_from_snapshot(&snapshot).unwrap_err();
        assert!(matches!(err, SnapshotError::HashMismatch { .. }));
        assert_eq!(sim.state_hash(), before);
    }

    #[test]
    fn snapshot_from_a_longer_run_is_rejected() {
        let mut long = sim();
        let mut short = {
            let mut config = long.config().clone();
            config.frames = 35;
            Simulation::new(config).unwrap()
        };
        for _ in 0..40 {
            long.step(&mut NullSink);
        }
        let err = short
            .restore_from_snapshot(&long.capture_snapshot())
            .unwrap_err();
        assert_eq!(
            err,
            SnapshotError::FrameOutOfRange {
                frame: 40,
                frames: 35
            }
        );
    }
}
