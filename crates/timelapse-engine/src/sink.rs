//! Frame sinks: where finished rasters go.
//!
//! The driver hands every rendered frame to a [`FrameSink`]. A failed write is
//! reported back as a [`SinkError`]; the driver logs it and keeps going, so a
//! sink can never corrupt simulation state.

use std::path::{Path, PathBuf};

use image::ImageFormat;

use crate::raster::Raster;

/// Errors a sink can report for a single frame.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("failed to create output directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write frame {frame} to {}: {source}", path.display())]
    Encode {
        frame: u64,
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Accepts finished frames, tagged with their sequential index.
pub trait FrameSink {
    fn emit(&mut self, frame: u64, raster: &Raster) -> Result<(), SinkError>;
}

// ---------------------------------------------------------------------------
// PngSink
// ---------------------------------------------------------------------------

/// Writes `image000000.png`, `image000001.png`, ... into a directory.
#[derive(Debug, Clone)]
pub struct PngSink {
    dir: PathBuf,
}

impl PngSink {
    /// Use `dir` as the output location, creating it if needed.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| SinkError::CreateDir {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name for a frame: six-digit zero-padded index.
    pub fn file_name(frame: u64) -> String {
        format!("image{frame:06}.png")
    }

    pub fn frame_path(&self, frame: u64) -> PathBuf {
        self.dir.join(Self::file_name(frame))
    }
}

impl FrameSink for PngSink {
    fn emit(&mut self, frame: u64, raster: &Raster) -> Result<(), SinkError> {
        let path = self.frame_path(frame);
        raster
            .to_image()
            .save_with_format(&path, ImageFormat::Png)
            .map_err(|source| SinkError::Encode {
                frame,
                path,
                source,
            })
    }
}

// ---------------------------------------------------------------------------
// MemorySink / NullSink
// ---------------------------------------------------------------------------

/// Keeps a BLAKE3 digest of every frame's RGBA8 bytes instead of writing
/// files. Two runs that emit identical pixels produce identical digests.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    digests: Vec<(u64, String)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(frame index, hex digest)` in emission order.
    pub fn digests(&self) -> &[(u64, String)] {
        &self.digests
    }
}

impl FrameSink for MemorySink {
    fn emit(&mut self, frame: u64, raster: &Raster) -> Result<(), SinkError> {
        let digest = blake3::hash(&raster.to_rgba8()).to_hex().to_string();
        self.digests.push((frame, digest));
        Ok(())
    }
}

/// Discards every frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl FrameSink for NullSink {
    fn emit(&mut self, _frame: u64, _raster: &Raster) -> Result<(), SinkError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use timelapse_scene::color::Rgba;

    #[test]
    fn file_names_are_zero_padded() {
        assert_eq!(PngSink::file_name(0), "image000000.png");
        assert_eq!(PngSink::file_name(42), "image000042.png");
        assert_eq!(PngSink::file_name(2099), "image002099.png");
    }

    #[test]
    fn png_sink_writes_readable_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = PngSink::create(dir.path().join("sky")).unwrap();
        let mut raster = Raster::new(8, 4);
        raster.fill(Rgba::TURQUOISE);
        sink.emit(7, &raster).unwrap();

        let path = dir.path().join("sky").join("image000007.png");
        let img = image::open(&path).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (8, 4));
        assert_eq!(img.get_pixel(3, 2).0, [64, 224, 208, 255]);
    }

    #[test]
    fn png_sink_reports_write_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = PngSink::create(dir.path()).unwrap();
        // A directory where the file should go makes the write fail.
        std::fs::create_dir(sink.frame_path(3)).unwrap();
        let err = sink.emit(3, &Raster::new(2, 2)).unwrap_err();
        assert!(matches!(err, SinkError::Encode { frame: 3, .. }));
    }

    #[test]
    fn memory_sink_digests_pixels() {
        let mut sink = MemorySink::new();
        let black = Raster::new(4, 4);
        let mut white = Raster::new(4, 4);
        white.fill(Rgba::WHITE);
        sink.emit(0, &black).unwrap();
        sink.emit(1, &black).unwrap();
        sink.emit(2, &white).unwrap();
        let d = sink.digests();
        assert_eq!(d.len(), 3);
        assert_eq!(d[0].1, d[1].1);
        assert_ne!(d[1].1, d[2].1);
        assert_eq!(d[2].0, 2);
        assert_eq!(d[0].1.len(), 64);
    }
}
