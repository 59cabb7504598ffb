//! Per-frame control loop.
//!
//! One iteration: sensor read (with retries) → raw-frame callback → clean →
//! thresholds (once per run) → column scan + region detection → soundscape →
//! colorize → render → persist → blocking playback. Stop requests are
//! honoured at the top of the loop, after each blocking call and during the
//! inter-frame delay.

use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::{debug, error, info, warn};

use crate::audio::{wav, AudioOutput, NullOutput, Soundscape, SoundscapeComposer};
use crate::detect::{derive_thresholds, detect_regions, scan_columns, Region, Thresholds};
use crate::error::{Result, ThermalError};
use crate::frame::{colorize, heat_range_label, CleanedFrame, FrameCleaner, FrameInput};
use crate::params::{RangeTable, RunConfig};
use crate::persistence::{FrameArtifacts, Persistence};
use crate::render::Renderer;
use crate::sensor::Sensor;
use crate::signal::{CycleState, RunSignal};

/// Per-frame telemetry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleCounters {
    pub hot_columns: usize,
    pub cold_columns: usize,
    pub frame_index: u64,
}

impl CycleCounters {
    pub fn total(&self) -> usize {
        self.hot_columns + self.cold_columns
    }
}

/// Result of one processed frame
#[derive(Debug, Clone)]
pub struct FrameReport {
    pub counters: CycleCounters,
    /// Raw-frame mean (°C), or the cleaned mean level for image inputs
    pub mean_temperature: f32,
    pub thresholds: Thresholds,
    pub regions: Vec<Region>,
    pub cleaned: CleanedFrame,
    /// None when the composed buffer was rejected
    pub soundscape: Option<Soundscape>,
}

/// Live hook on each raw frame; errors and panics are logged and ignored
pub type FrameCallback = Box<dyn FnMut(&FrameInput) -> Result<()> + Send>;

/// Sequences the pipeline stages once per frame
pub struct FrameCycleController {
    config: RunConfig,
    table: RangeTable,
    cleaner: FrameCleaner,
    composer: SoundscapeComposer,
    thresholds: Option<Thresholds>,
    frame_index: u64,
    skipped_frames: u64,
    signal: RunSignal,

    sensor: Box<dyn Sensor + Send>,
    renderer: Option<Box<dyn Renderer + Send>>,
    persistence: Option<Box<dyn Persistence + Send>>,
    audio_output: Box<dyn AudioOutput + Send>,
    frame_callback: Option<FrameCallback>,
}

impl FrameCycleController {
    /// Build a controller; the band table is resolved (and validated) here
    pub fn new(config: RunConfig, sensor: Box<dyn Sensor + Send>) -> Result<Self> {
        config.validate()?;
        let table = config.active_ranges()?;
        let cleaner = FrameCleaner::new(config.cleaning.clone());
        let composer = SoundscapeComposer::new(config.audio.clone());

        Ok(Self {
            config,
            table,
            cleaner,
            composer,
            thresholds: None,
            frame_index: 0,
            skipped_frames: 0,
            signal: RunSignal::new(),
            sensor,
            renderer: None,
            persistence: None,
            audio_output: Box::new(NullOutput),
            frame_callback: None,
        })
    }

    pub fn with_renderer(mut self, renderer: Box<dyn Renderer + Send>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn with_persistence(mut self, persistence: Box<dyn Persistence + Send>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    pub fn with_audio_output(mut self, output: Box<dyn AudioOutput + Send>) -> Self {
        self.audio_output = output;
        self
    }

    pub fn with_frame_callback(mut self, callback: FrameCallback) -> Self {
        self.frame_callback = Some(callback);
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn table(&self) -> &RangeTable {
        &self.table
    }

    /// Thresholds in effect, once the first frame of the run has derived them
    pub fn thresholds(&self) -> Option<Thresholds> {
        self.thresholds
    }

    /// Index the next processed frame will get
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Frames abandoned by the loop since construction
    pub fn skipped_frames(&self) -> u64 {
        self.skipped_frames
    }

    /// Handle for stopping the loop from another thread
    pub fn signal(&self) -> RunSignal {
        self.signal.clone()
    }

    pub fn state(&self) -> CycleState {
        self.signal.state()
    }

    /// Request the loop to stop at its next safe point
    pub fn stop(&self) {
        if !self.signal.request_stop() {
            debug!("Stop requested while not running");
        }
    }

    fn stop_requested(&self) -> bool {
        self.signal.state() == CycleState::Stopping
    }

    /// Run until stopped (or `max_frames` is reached). A second start while
    /// running is ignored with a warning.
    pub fn run(&mut self) {
        if !self.signal.try_start() {
            warn!("Frame loop already running, start ignored");
            return;
        }
        self.run_loop();
    }

    /// Loop body; the caller has already moved the signal to Running
    fn run_loop(&mut self) {
        info!("Frame loop started");
        let started = Instant::now();
        let mut processed: u64 = 0;

        while self.signal.is_running() {
            match self.step() {
                Ok(Some(_)) => {
                    processed += 1;
                    let elapsed = started.elapsed().as_secs_f32();
                    if elapsed > 0.0 {
                        debug!(fps = processed as f32 / elapsed, "Frame rate");
                    }
                }
                Ok(None) => break,
                Err(e) if e.aborts_frame() => {
                    self.skipped_frames += 1;
                    warn!(frame = self.frame_index, error = %e, "Frame skipped");
                }
                Err(e) => warn!(frame = self.frame_index, error = %e, "Frame stage failed"),
            }

            if let Some(max) = self.config.max_frames {
                if processed >= max {
                    info!(frames = processed, "Frame limit reached");
                    break;
                }
            }

            if self.signal.sleep(self.config.frame_delay()) {
                break;
            }
        }

        self.release();
        self.signal.finish();
        info!(frames = processed, skipped = self.skipped_frames, "Frame loop stopped");
    }

    /// Drop per-run state; collaborators are left open
    fn release(&mut self) {
        self.thresholds = None;
    }

    /// Close collaborators that hold resources (the CSV log)
    pub fn close(&mut self) -> Result<()> {
        if let Some(persistence) = self.persistence.as_mut() {
            persistence.close()?;
        }
        Ok(())
    }

    /// Read a frame, retrying transient sensor failures
    fn read_sensor(&mut self) -> Result<Option<FrameInput>> {
        let attempts = self.config.sensor_retries.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            match self.sensor.get_frame() {
                Ok(input) => return Ok(Some(input)),
                Err(e) => {
                    warn!(attempt, attempts, error = %e, "Sensor read failed");
                    last_error = Some(e);
                }
            }
            if self.stop_requested() {
                return Ok(None);
            }
        }

        Err(ThermalError::Sensor(format!(
            "no frame after {} attempts: {}",
            attempts,
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )))
    }

    fn run_callback(&mut self, input: &FrameInput) {
        let Some(callback) = self.frame_callback.as_mut() else {
            return;
        };
        match panic::catch_unwind(AssertUnwindSafe(|| callback(input))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Frame callback failed"),
            Err(_) => error!("Frame callback panicked"),
        }
    }

    /// Process one frame.
    ///
    /// Returns `Ok(None)` when a stop request cut the frame short, and an
    /// error when the frame had to be abandoned (sensor exhausted or input
    /// unreadable). Neither consumes a frame index.
    pub fn step(&mut self) -> Result<Option<FrameReport>> {
        if self.stop_requested() {
            return Ok(None);
        }

        let Some(input) = self.read_sensor()? else {
            return Ok(None);
        };
        self.run_callback(&input);
        if self.stop_requested() {
            return Ok(None);
        }

        let cleaned = self.cleaner.clean(&input)?;
        let mean_temperature = input
            .mean_temperature()
            .unwrap_or_else(|| cleaned.mean_level());

        let thresholds = match self.thresholds {
            Some(t) => t,
            None => {
                let t = derive_thresholds(&self.table);
                info!(hot = t.hot, cold = t.cold, "Thresholds derived");
                self.thresholds = Some(t);
                t
            }
        };

        let (hot_columns, cold_columns) = scan_columns(&cleaned, thresholds);
        let regions = detect_regions(&cleaned, thresholds);
        let counters = CycleCounters {
            hot_columns,
            cold_columns,
            frame_index: self.frame_index,
        };

        let buffer = self.composer.compose(&cleaned, &self.table, &regions);
        let soundscape = match self.composer.finalize(buffer) {
            Ok(s) => Some(s),
            Err(e) => {
                warn!(frame = self.frame_index, error = %e, "Audio suppressed for frame");
                None
            }
        };
        let colors = colorize(&cleaned, &self.table);

        info!(
            frame = self.frame_index,
            mean_temperature,
            heat_range = heat_range_label(mean_temperature),
            hot = hot_columns,
            cold = cold_columns,
            "Frame processed"
        );

        if self.config.display_enabled {
            if let Some(renderer) = self.renderer.as_mut() {
                if let Err(e) = renderer.render(&cleaned, &colors, &counters) {
                    warn!(error = %e, "Render failed");
                }
            }
        }

        let wav_bytes = match soundscape.as_ref().map(wav::encode).transpose() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "WAV encoding failed");
                None
            }
        };

        if let Some(persistence) = self.persistence.as_mut() {
            let artifacts = FrameArtifacts {
                frame_index: self.frame_index,
                mean_temperature,
                cleaned: &cleaned,
                colors: &colors,
                wav: wav_bytes.as_deref(),
                hot_count: hot_columns,
                cold_count: cold_columns,
            };
            if let Err(e) = persistence.record(&artifacts) {
                warn!(error = %e, "Persistence failed");
            }
        }

        if let Some(bytes) = wav_bytes.as_deref() {
            if let Err(e) = self.audio_output.play(bytes, &self.signal) {
                warn!(error = %e, "Playback failed");
            }
        }

        self.frame_index += 1;

        Ok(Some(FrameReport {
            counters,
            mean_temperature,
            thresholds,
            regions,
            cleaned,
            soundscape,
        }))
    }
}

/// Runs a controller on a dedicated thread
pub struct Worker {
    signal: RunSignal,
    controller: Option<FrameCycleController>,
    handle: Option<JoinHandle<FrameCycleController>>,
    done_tx: Sender<()>,
    done_rx: Receiver<()>,
}

impl Worker {
    pub fn new(controller: FrameCycleController) -> Self {
        let (done_tx, done_rx) = bounded(1);
        Self {
            signal: controller.signal(),
            controller: Some(controller),
            handle: None,
            done_tx,
            done_rx,
        }
    }

    /// Receives one message each time a started loop exits
    pub fn completion(&self) -> Receiver<()> {
        self.done_rx.clone()
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Spawn the loop. Returns false (with a warning) if it is already running.
    pub fn start(&mut self) -> Result<bool> {
        if self.is_running() {
            warn!("Worker already running, start ignored");
            return Ok(false);
        }
        // Reclaim the controller from a loop that ended on its own
        self.join()?;

        let Some(mut controller) = self.controller.take() else {
            return Err(ThermalError::collaborator("worker", "controller unavailable"));
        };
        // Enter Running before spawning so an immediate stop is not lost
        if !self.signal.try_start() {
            warn!("Frame loop already running, start ignored");
            self.controller = Some(controller);
            return Ok(false);
        }
        // Drop a completion left over from the previous run
        let _ = self.done_rx.try_recv();

        let done_tx = self.done_tx.clone();
        let handle = thread::Builder::new()
            .name("frame-cycle".to_string())
            .spawn(move || {
                controller.run_loop();
                let _ = done_tx.try_send(());
                controller
            });
        match handle {
            Ok(handle) => {
                self.handle = Some(handle);
                Ok(true)
            }
            Err(e) => {
                self.signal.finish();
                Err(e.into())
            }
        }
    }

    /// Request a stop and wait for the loop to exit
    pub fn stop(&mut self) -> Result<()> {
        self.signal.request_stop();
        self.join()
    }

    /// Wait for the loop to exit on its own
    pub fn join(&mut self) -> Result<()> {
        if let Some(handle) = self.handle.take() {
            let controller = handle
                .join()
                .map_err(|_| ThermalError::collaborator("worker", "frame loop panicked"))?;
            self.controller = Some(controller);
        }
        Ok(())
    }

    pub fn signal(&self) -> RunSignal {
        self.signal.clone()
    }

    /// Stop (if needed) and hand back the controller
    pub fn into_controller(mut self) -> Result<FrameCycleController> {
        self.stop()?;
        self.controller
            .take()
            .ok_or_else(|| ThermalError::collaborator("worker", "controller unavailable"))
    }
}
