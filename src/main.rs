//! Thermosense - hear where the heat is
//!
//! Reads thermal frames, shows them in false color and plays a left-to-right
//! stereo sweep per frame: hot bands as brass, cold bands as reed, pitch by
//! height, pan by horizontal position.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use thermosense::audio::{AudioOutput, NullOutput};
use thermosense::cli::{Args, FrameSource};
use thermosense::persistence::{FilePersistence, SaveFlags};
use thermosense::render::ConsoleRenderer;
use thermosense::sensor::{ImageSequenceSensor, SceneParams, Sensor, SimulatedSensor};
use thermosense::{logging, FrameCycleController, Worker};

fn build_sensor(source: &FrameSource) -> Result<Box<dyn Sensor + Send>> {
    let sensor: Box<dyn Sensor + Send> = match source {
        FrameSource::Simulated => {
            info!("Source: simulated scene");
            Box::new(SimulatedSensor::new(SceneParams::default()))
        }
        FrameSource::Directory(dir) => {
            info!(dir = %dir.display(), "Source: image sequence");
            Box::new(
                ImageSequenceSensor::new(dir)
                    .with_context(|| format!("Failed to open frame directory {}", dir.display()))?,
            )
        }
    };
    Ok(sensor)
}

#[cfg(feature = "playback")]
fn build_audio_output(enabled: bool) -> Box<dyn AudioOutput + Send> {
    if !enabled {
        return Box::new(NullOutput);
    }
    match thermosense::audio::CpalOutput::new() {
        Ok(output) => Box::new(output),
        Err(e) => {
            warn!(error = %e, "Audio output unavailable, continuing silently");
            Box::new(NullOutput)
        }
    }
}

#[cfg(not(feature = "playback"))]
fn build_audio_output(enabled: bool) -> Box<dyn AudioOutput + Send> {
    if enabled {
        warn!("Built without playback support, continuing silently");
    }
    Box::new(NullOutput)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(logging::level_for(args.verbose, args.quiet))?;

    let config = args.run_config().context("Invalid configuration")?;
    let sensor = build_sensor(&args.frame_source())?;

    let mut controller = FrameCycleController::new(config.clone(), sensor)
        .context("Failed to build frame loop")?
        .with_audio_output(build_audio_output(!args.no_playback));
    if config.display_enabled {
        controller = controller.with_renderer(Box::new(ConsoleRenderer::stdout()));
    }
    if config.persists_anything() {
        let persistence = FilePersistence::create(&config.output_dir, SaveFlags::from_config(&config))
            .context("Failed to create run directory")?;
        controller = controller.with_persistence(Box::new(persistence));
    }

    let mut worker = Worker::new(controller);
    worker.start().context("Failed to start frame loop")?;

    // Wait for Ctrl-C or for the loop to finish on its own (frame limit)
    let completion = worker.completion();
    let finished = tokio::task::spawn_blocking(move || completion.recv());

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for Ctrl-C")?;
            info!("Interrupt received, stopping");
        }
        _ = finished => {}
    }

    worker.stop().context("Frame loop did not stop cleanly")?;
    let mut controller = worker.into_controller()?;
    controller.close()?;

    info!("Done");
    Ok(())
}
