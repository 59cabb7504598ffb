//! Controller loop behaviour with mock collaborators.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use image::RgbImage;

use thermosense::audio::{wav, AudioOutput};
use thermosense::frame::{CleanedFrame, FrameInput, RawFrame};
use thermosense::persistence::{FilePersistence, FrameArtifacts, Persistence, SaveFlags};
use thermosense::render::Renderer;
use thermosense::sensor::Sensor;
use thermosense::signal::{CycleState, RunSignal};
use thermosense::{CycleCounters, FrameCycleController, Result, ThermalError, Worker};

struct WarmSensor;

impl Sensor for WarmSensor {
    fn get_frame(&mut self) -> Result<FrameInput> {
        let mut frame = RawFrame::filled(32, 24, 25.0).unwrap();
        for y in 0..24 {
            frame.set(3, y, 40.0);
        }
        Ok(frame.into())
    }
}

/// Alternates an unreadable file with a good frame
struct AlternatingSensor {
    bad_path: std::path::PathBuf,
    calls: usize,
}

impl Sensor for AlternatingSensor {
    fn get_frame(&mut self) -> Result<FrameInput> {
        self.calls += 1;
        if self.calls % 2 == 1 {
            Ok(FrameInput::Path(self.bad_path.clone()))
        } else {
            Ok(RawFrame::filled(32, 24, 25.0).unwrap().into())
        }
    }
}

#[derive(Clone, Default)]
struct RecordingRenderer {
    seen: Arc<Mutex<Vec<CycleCounters>>>,
}

impl Renderer for RecordingRenderer {
    fn render(
        &mut self,
        frame: &CleanedFrame,
        colors: &RgbImage,
        counters: &CycleCounters,
    ) -> Result<()> {
        assert_eq!(colors.width() as usize, frame.width());
        self.seen.lock().unwrap().push(*counters);
        Ok(())
    }
}

struct FailingRenderer;

impl Renderer for FailingRenderer {
    fn render(&mut self, _: &CleanedFrame, _: &RgbImage, _: &CycleCounters) -> Result<()> {
        Err(ThermalError::collaborator("renderer", "window closed"))
    }
}

struct FailingPersistence {
    attempts: Arc<AtomicUsize>,
}

impl Persistence for FailingPersistence {
    fn record(&mut self, _: &FrameArtifacts<'_>) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(ThermalError::collaborator("persistence", "disk full"))
    }
}

/// Records the sample count of every clip it is asked to play
#[derive(Clone, Default)]
struct RecordingOutput {
    clips: Arc<Mutex<Vec<usize>>>,
}

impl AudioOutput for RecordingOutput {
    fn play(&mut self, bytes: &[u8], _signal: &RunSignal) -> Result<()> {
        let (samples, channels, _) = wav::decode(bytes)?;
        self.clips.lock().unwrap().push(samples.len() / channels as usize);
        Ok(())
    }
}

/// Blocks until a stop is requested
struct BlockingOutput;

impl AudioOutput for BlockingOutput {
    fn play(&mut self, _bytes: &[u8], signal: &RunSignal) -> Result<()> {
        let _ = signal.wake_receiver().recv_timeout(Duration::from_secs(30));
        Ok(())
    }
}

fn quick_config() -> thermosense::params::RunConfig {
    let mut config = thermosense::params::RunConfig::default();
    config.audio.sample_rate_hz = 8000;
    config.audio.sweep_duration_s = 0.25;
    config.frame_delay_ms = 0;
    config
}

#[test]
fn test_frame_indices_increase_and_reach_renderer() {
    let renderer = RecordingRenderer::default();
    let mut config = quick_config();
    config.max_frames = Some(3);

    let mut controller = FrameCycleController::new(config, Box::new(WarmSensor))
        .unwrap()
        .with_renderer(Box::new(renderer.clone()));
    controller.run();

    let seen = renderer.seen.lock().unwrap();
    let indices: Vec<u64> = seen.iter().map(|c| c.frame_index).collect();
    assert_eq!(indices, vec![0, 1, 2]);
    assert!(seen.iter().all(|c| c.hot_columns > 0 && c.cold_columns == 0));
}

#[test]
fn test_display_disabled_skips_renderer() {
    let renderer = RecordingRenderer::default();
    let mut config = quick_config();
    config.display_enabled = false;

    let mut controller = FrameCycleController::new(config, Box::new(WarmSensor))
        .unwrap()
        .with_renderer(Box::new(renderer.clone()));
    assert!(controller.step().unwrap().is_some());
    assert!(renderer.seen.lock().unwrap().is_empty());
}

#[test]
fn test_collaborator_failures_do_not_stop_loop() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let mut config = quick_config();
    config.max_frames = Some(2);

    let mut controller = FrameCycleController::new(config, Box::new(WarmSensor))
        .unwrap()
        .with_renderer(Box::new(FailingRenderer))
        .with_persistence(Box::new(FailingPersistence {
            attempts: Arc::clone(&attempts),
        }));
    controller.run();

    assert_eq!(controller.frame_index(), 2);
    assert_eq!(controller.skipped_frames(), 0);
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert_eq!(controller.state(), CycleState::Idle);
}

#[test]
fn test_invalid_source_skips_frame_without_index() {
    let dir = tempfile::tempdir().unwrap();
    let bad_path = dir.path().join("garbage.png");
    std::fs::write(&bad_path, b"not an image").unwrap();

    let mut controller = FrameCycleController::new(
        quick_config(),
        Box::new(AlternatingSensor { bad_path, calls: 0 }),
    )
    .unwrap();

    let err = controller.step().unwrap_err();
    assert!(matches!(err, ThermalError::InvalidSource(_)));
    assert!(err.aborts_frame());
    assert_eq!(controller.frame_index(), 0);

    let report = controller.step().unwrap().unwrap();
    assert_eq!(report.counters.frame_index, 0);
    assert_eq!(controller.frame_index(), 1);
}

#[test]
fn test_loop_skips_unreadable_frames_and_continues() {
    let dir = tempfile::tempdir().unwrap();
    let bad_path = dir.path().join("garbage.png");
    std::fs::write(&bad_path, b"not an image").unwrap();

    let renderer = RecordingRenderer::default();
    let mut config = quick_config();
    config.max_frames = Some(2);

    let mut controller = FrameCycleController::new(
        config,
        Box::new(AlternatingSensor { bad_path, calls: 0 }),
    )
    .unwrap()
    .with_renderer(Box::new(renderer.clone()));
    controller.run();

    // Four reads: two abandoned, two processed
    assert_eq!(controller.skipped_frames(), 2);
    assert_eq!(controller.frame_index(), 2);
    assert_eq!(controller.state(), CycleState::Idle);
    let indices: Vec<u64> = renderer.seen.lock().unwrap().iter().map(|c| c.frame_index).collect();
    assert_eq!(indices, vec![0, 1]);
}

#[test]
fn test_playback_gets_full_length_clip_each_frame() {
    let output = RecordingOutput::default();
    let mut config = quick_config();
    config.max_frames = Some(2);

    let mut controller = FrameCycleController::new(config, Box::new(WarmSensor))
        .unwrap()
        .with_audio_output(Box::new(output.clone()));
    controller.run();

    assert_eq!(*output.clips.lock().unwrap(), vec![2000, 2000]);
}

#[test]
fn test_stop_interrupts_blocking_playback() {
    let controller = FrameCycleController::new(quick_config(), Box::new(WarmSensor))
        .unwrap()
        .with_audio_output(Box::new(BlockingOutput));
    let mut worker = Worker::new(controller);
    assert!(worker.start().unwrap());

    thread::sleep(Duration::from_millis(100));
    let started = Instant::now();
    worker.stop().unwrap();
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(!worker.is_running());
}

#[test]
fn test_worker_restart_continues_frame_indices() {
    let mut config = quick_config();
    config.max_frames = Some(1);
    let controller = FrameCycleController::new(config, Box::new(WarmSensor)).unwrap();
    let mut worker = Worker::new(controller);

    worker.start().unwrap();
    worker.join().unwrap();
    worker.start().unwrap();
    worker.join().unwrap();

    let controller = worker.into_controller().unwrap();
    assert_eq!(controller.frame_index(), 2);
}

#[test]
fn test_file_persistence_through_loop() {
    let out = tempfile::tempdir().unwrap();
    let mut config = quick_config();
    config.max_frames = Some(2);

    let persistence = FilePersistence::create_named(
        out.path(),
        "run",
        SaveFlags::from_config(&config),
    )
    .unwrap();
    let mut controller = FrameCycleController::new(config, Box::new(WarmSensor))
        .unwrap()
        .with_persistence(Box::new(persistence));
    controller.run();
    controller.close().unwrap();

    let dir = out.path().join("run");
    for name in ["frame_000.wav", "frame_001.wav", "cleaned/frame_001.png", "thermal/frame_000.png"] {
        assert!(dir.join(name).is_file(), "missing {}", name);
    }
    let csv = std::fs::read_to_string(dir.join("run.csv")).unwrap();
    assert_eq!(csv.lines().count(), 3);
}
