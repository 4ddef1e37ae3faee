//! Galaxy Collision Timelapse CLI
//!
//! Renders the night-sky sequence to numbered PNG files.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use timelapse_engine::prelude::*;
use tracing::info;

#[derive(Parser)]
#[command(name = "galaxy-collision")]
#[command(about = "Render a procedural galaxy-collision timelapse as PNG frames")]
#[command(version)]
struct Cli {
    /// JSON configuration file; missing fields take the built-in defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory the frames are written to
    #[arg(short, long, default_value = "sky")]
    output: PathBuf,

    /// Override the number of frames
    #[arg(long)]
    frames: Option<u64>,

    /// Override the frame on which the colliding star starts to grow
    #[arg(long)]
    collision_frame: Option<u64>,

    /// Override the PRNG seed
    #[arg(long)]
    seed: Option<u64>,

    /// Run the simulation without rendering or writing frames
    #[arg(long)]
    headless: bool,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    dump_config: bool,
}

impl Cli {
    fn load_config(&self) -> anyhow::Result<SimulationConfig> {
        let mut config = match &self.config {
            Some(path) => SimulationConfig::from_json_file(path)?,
            None => SimulationConfig::default(),
        };
        if let Some(frames) = self.frames {
            config.frames = frames;
        }
        if let Some(frame) = self.collision_frame {
            config.events.collision_frame = frame;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        config.headless |= self.headless;
        Ok(config)
    }
}

fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.load_config()?;

    if cli.dump_config {
        println!("{}", config.to_json_pretty());
        return Ok(());
    }

    let mut simulation = Simulation::new(config).context("invalid configuration")?;

    let summary = if simulation.config().headless {
        simulation.run(&mut NullSink)
    } else {
        let mut sink = PngSink::create(cli.output.clone())
            .with_context(|| format!("cannot prepare output directory {}", cli.output.display()))?;
        info!(dir = %sink.dir().display(), "writing frames");
        simulation.run(&mut sink)
    };

    info!(
        frames = summary.frames,
        failed_writes = summary.failed_writes,
        elapsed_s = summary.elapsed.as_secs_f64(),
        state_hash = %summary.state_hash,
        "done"
    );
    Ok(())
}
