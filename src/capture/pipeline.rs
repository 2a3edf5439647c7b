//! Capture loop
//!
//! Drives source -> recognizer -> annotator -> broadcaster on a fixed cadence,
//! whether or not anyone is watching. Runs on its own OS thread because every
//! collaborator it calls is blocking.

use std::io;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use super::config::CaptureConfig;
use super::frame::RawFrame;
use super::source::{CaptureError, FrameSource, SourceGuard};
use crate::annotate::Annotator;
use crate::broadcast::{AnnotatedFrame, FrameBroadcaster};
use crate::error::{Error, Result};
use crate::recognition::{Detection, Gallery, RecognitionError, Recognizer};
use crate::stats::CaptureStats;

/// Longest single sleep, so a stop request is noticed promptly at low frame rates
const SHUTDOWN_POLL: Duration = Duration::from_millis(50);

/// Lifecycle of the capture loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Built but not started
    Idle,
    /// Producing frames
    Running,
    /// Stopped on request
    Stopped,
    /// Terminated by a fatal capture error
    Fatal,
}

impl LoopState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => LoopState::Running,
            2 => LoopState::Stopped,
            3 => LoopState::Fatal,
            _ => LoopState::Idle,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            LoopState::Idle => 0,
            LoopState::Running => 1,
            LoopState::Stopped => 2,
            LoopState::Fatal => 3,
        }
    }
}

/// Shared, observable loop state
#[derive(Debug, Clone, Default)]
pub struct LoopStateCell(Arc<AtomicU8>);

impl LoopStateCell {
    pub fn get(&self) -> LoopState {
        LoopState::from_u8(self.0.load(Ordering::SeqCst))
    }

    fn set(&self, state: LoopState) {
        self.0.store(state.as_u8(), Ordering::SeqCst);
    }
}

/// The frame pipeline producer
pub struct CaptureLoop<S: FrameSource, R: Recognizer + ?Sized> {
    config: CaptureConfig,
    source: SourceGuard<S>,
    recognizer: Arc<R>,
    gallery: Gallery,
    annotator: Annotator,
    broadcaster: Arc<FrameBroadcaster>,
    state: LoopStateCell,
    stats: CaptureStats,
}

impl<S: FrameSource, R: Recognizer + ?Sized> CaptureLoop<S, R> {
    /// Create a capture loop publishing into `broadcaster`
    pub fn new(
        config: CaptureConfig,
        source: S,
        recognizer: Arc<R>,
        gallery: Gallery,
        broadcaster: Arc<FrameBroadcaster>,
    ) -> Self {
        Self {
            annotator: Annotator::new(config.jpeg_quality),
            config,
            source: SourceGuard::new(source),
            recognizer,
            gallery,
            broadcaster,
            state: LoopStateCell::default(),
            stats: CaptureStats::new(),
        }
    }

    /// Handle for observing the loop state from another thread
    pub fn state(&self) -> LoopStateCell {
        self.state.clone()
    }

    /// Run on the current thread until `shutdown` is set or capture fails
    ///
    /// On every exit path the source is released and the broadcaster closed.
    pub fn run(mut self, shutdown: &AtomicBool) -> std::result::Result<CaptureStats, CaptureError> {
        self.state.set(LoopState::Running);
        self.stats = CaptureStats::new();

        tracing::info!(
            source = self.source.name(),
            fps = self.config.target_fps,
            downscale = self.config.downscale,
            gallery = self.gallery.len(),
            "Capture loop started"
        );

        let result = self.tick_until(shutdown);

        self.source.release();
        self.broadcaster.close();

        match &result {
            Ok(()) => {
                self.state.set(LoopState::Stopped);
                tracing::info!(
                    captured = self.stats.frames_captured,
                    published = self.stats.frames_published,
                    fps = self.stats.published_fps(),
                    "Capture loop stopped"
                );
            }
            Err(e) => {
                self.state.set(LoopState::Fatal);
                tracing::error!(
                    error = %e,
                    captured = self.stats.frames_captured,
                    failures = self.stats.capture_failures,
                    "Capture loop terminated"
                );
            }
        }

        let stats = self.stats.clone();
        result.map(|()| stats)
    }

    fn tick_until(&mut self, shutdown: &AtomicBool) -> std::result::Result<(), CaptureError> {
        let interval = self.config.frame_interval();
        let mut next_tick = Instant::now();
        let mut consecutive_failures = 0u32;

        while !shutdown.load(Ordering::SeqCst) {
            let now = Instant::now();
            if now < next_tick {
                thread::sleep((next_tick - now).min(SHUTDOWN_POLL));
                continue;
            }
            next_tick = now + interval;

            match self.source.next_frame() {
                Ok(frame) => {
                    consecutive_failures = 0;
                    self.process(frame);
                }
                Err(e) => {
                    self.stats.capture_failures += 1;
                    if e.is_fatal() {
                        return Err(e);
                    }

                    consecutive_failures += 1;
                    tracing::warn!(
                        error = %e,
                        consecutive_failures = consecutive_failures,
                        "Frame capture failed"
                    );
                    if consecutive_failures >= self.config.max_consecutive_failures {
                        return Err(CaptureError::TooManyFailures(consecutive_failures));
                    }
                }
            }
        }

        Ok(())
    }

    /// Annotate and publish one frame
    fn process(&mut self, frame: RawFrame) {
        self.stats.frames_captured += 1;

        let detections = match self.recognize(&frame) {
            Ok(detections) => detections,
            Err(e) => {
                self.stats.detection_failures += 1;
                tracing::warn!(error = %e, "Recognition failed, publishing frame unannotated");
                Vec::new()
            }
        };
        self.stats.faces_detected += detections.len() as u64;
        self.stats.faces_recognized += detections.iter().filter(|d| d.is_known()).count() as u64;

        let captured_at = frame.captured_at;
        let payload = match self.annotator.render(frame, &detections) {
            Ok(payload) => payload,
            Err(e) => {
                self.stats.encode_failures += 1;
                tracing::warn!(error = %e, "Frame encode failed, frame dropped");
                return;
            }
        };

        let annotated = AnnotatedFrame::new(payload, captured_at, detections.len());
        if let Ok(generation) = self.broadcaster.publish(annotated) {
            self.stats.frames_published += 1;
            tracing::trace!(
                generation = generation,
                faces = detections.len(),
                "Frame published"
            );
        }
    }

    /// Detect on a downscaled copy, label against the gallery, and map boxes
    /// back to full resolution
    fn recognize(&self, frame: &RawFrame) -> std::result::Result<Vec<Detection>, RecognitionError> {
        let factor = self.config.downscale;
        let small = frame.downscale(factor);
        let faces = self.recognizer.detect_faces(&small)?;

        faces
            .into_iter()
            .map(|face| -> std::result::Result<Detection, RecognitionError> {
                let embedding = self.recognizer.embed(&small, &face)?;
                let identity = self.gallery.identify(self.recognizer.as_ref(), &embedding);
                Ok(Detection {
                    bbox: face.scale(factor),
                    label: identity.label,
                    distance: identity.distance,
                })
            })
            .collect()
    }
}

impl<S, R> CaptureLoop<S, R>
where
    S: FrameSource + 'static,
    R: Recognizer + ?Sized + 'static,
{
    /// Run the loop on a dedicated thread
    pub fn spawn(self) -> io::Result<CaptureHandle> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let state = self.state.clone();
        let exit_guard = ExitGuard {
            broadcaster: Arc::clone(&self.broadcaster),
            state: state.clone(),
        };

        let flag = Arc::clone(&shutdown);
        let thread = thread::Builder::new()
            .name("facewatch-capture".into())
            .spawn(move || {
                let _exit_guard = exit_guard;
                self.run(&flag)
            })?;

        Ok(CaptureHandle {
            shutdown,
            state,
            thread,
        })
    }
}

/// Closes the broadcaster even if the capture thread unwinds
struct ExitGuard {
    broadcaster: Arc<FrameBroadcaster>,
    state: LoopStateCell,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        if thread::panicking() {
            self.state.set(LoopState::Fatal);
        }
        self.broadcaster.close();
    }
}

/// Control handle for a capture loop running on its own thread
pub struct CaptureHandle {
    shutdown: Arc<AtomicBool>,
    state: LoopStateCell,
    thread: thread::JoinHandle<std::result::Result<CaptureStats, CaptureError>>,
}

impl CaptureHandle {
    /// Ask the loop to stop after the current tick
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Current loop state
    pub fn state(&self) -> LoopState {
        self.state.get()
    }

    /// Whether the capture thread has exited
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the capture thread to exit
    pub fn join(self) -> Result<CaptureStats> {
        match self.thread.join() {
            Ok(result) => result.map_err(Error::from),
            Err(_) => Err(Error::CaptureThreadPanicked),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;

    use image::RgbImage;

    use super::*;
    use crate::recognition::{BoundingBox, Embedding, GalleryEntry, NullRecognizer};

    enum Step {
        Frame,
        Fail,
        Lost,
    }

    /// Plays a fixed script, then asks the loop to stop
    struct ScriptedSource {
        script: VecDeque<Step>,
        shutdown: Arc<AtomicBool>,
        releases: Arc<AtomicUsize>,
    }

    impl ScriptedSource {
        fn new(script: Vec<Step>) -> (Self, Arc<AtomicBool>, Arc<AtomicUsize>) {
            let shutdown = Arc::new(AtomicBool::new(false));
            let releases = Arc::new(AtomicUsize::new(0));
            let source = Self {
                script: script.into(),
                shutdown: Arc::clone(&shutdown),
                releases: Arc::clone(&releases),
            };
            (source, shutdown, releases)
        }
    }

    impl FrameSource for ScriptedSource {
        fn name(&self) -> &str {
            "scripted"
        }

        fn next_frame(&mut self) -> std::result::Result<RawFrame, CaptureError> {
            match self.script.pop_front() {
                Some(Step::Frame) => Ok(RawFrame::from_rgb(RgbImage::new(64, 64), Instant::now())),
                Some(Step::Fail) => Err(CaptureError::Transient("read timeout".into())),
                Some(Step::Lost) => Err(CaptureError::HardwareLost("unplugged".into())),
                None => {
                    self.shutdown.store(true, Ordering::SeqCst);
                    Err(CaptureError::Transient("script finished".into()))
                }
            }
        }

        fn release(&mut self) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// One face per frame, always embedding to the same point
    struct OneFace {
        embedding: Vec<f32>,
        fail: bool,
    }

    impl Recognizer for OneFace {
        fn detect_faces(&self, frame: &RawFrame) -> std::result::Result<Vec<BoundingBox>, RecognitionError> {
            if self.fail {
                return Err(RecognitionError::Detection("model crashed".into()));
            }
            // Detector sees the 1/4 frame
            assert_eq!(frame.width(), 16);
            Ok(vec![BoundingBox::new(2, 10, 10, 2)])
        }

        fn embed(&self, _frame: &RawFrame, _face: &BoundingBox) -> std::result::Result<Embedding, RecognitionError> {
            Ok(Embedding::new(self.embedding.clone()))
        }
    }

    fn fast_config() -> CaptureConfig {
        CaptureConfig::default().target_fps(200.0)
    }

    fn gallery() -> Gallery {
        Gallery::new(vec![GalleryEntry::new("Ada", Embedding::new(vec![0.0, 0.0]))])
    }

    #[test]
    fn test_three_failures_are_fatal() {
        let (source, shutdown, releases) = ScriptedSource::new(vec![Step::Fail, Step::Fail, Step::Fail]);
        let broadcaster = Arc::new(FrameBroadcaster::new());
        let capture = CaptureLoop::new(
            fast_config(),
            source,
            Arc::new(NullRecognizer),
            Gallery::empty(),
            Arc::clone(&broadcaster),
        );
        let state = capture.state();

        let result = capture.run(&shutdown);

        assert!(matches!(result, Err(CaptureError::TooManyFailures(3))));
        assert_eq!(state.get(), LoopState::Fatal);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
        assert!(broadcaster.is_closed());
    }

    #[test]
    fn test_hardware_lost_is_fatal_immediately() {
        let (source, shutdown, releases) = ScriptedSource::new(vec![Step::Frame, Step::Lost, Step::Frame]);
        let broadcaster = Arc::new(FrameBroadcaster::new());
        let capture = CaptureLoop::new(
            fast_config(),
            source,
            Arc::new(NullRecognizer),
            Gallery::empty(),
            Arc::clone(&broadcaster),
        );

        let result = capture.run(&shutdown);

        assert!(matches!(result, Err(CaptureError::HardwareLost(_))));
        assert_eq!(broadcaster.generation(), 1);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_interleaved_failures_recover() {
        let (source, shutdown, releases) = ScriptedSource::new(vec![
            Step::Fail,
            Step::Fail,
            Step::Frame,
            Step::Fail,
            Step::Fail,
            Step::Frame,
        ]);
        let broadcaster = Arc::new(FrameBroadcaster::new());
        let capture = CaptureLoop::new(
            fast_config(),
            source,
            Arc::new(NullRecognizer),
            Gallery::empty(),
            Arc::clone(&broadcaster),
        );
        let state = capture.state();

        let stats = capture.run(&shutdown).unwrap();

        assert_eq!(stats.frames_published, 2);
        assert_eq!(stats.capture_failures, 5);
        assert_eq!(state.get(), LoopState::Stopped);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
        assert_eq!(broadcaster.generation(), 2);
    }

    #[test]
    fn test_recognized_face_is_labelled() {
        let (source, shutdown, _) = ScriptedSource::new(vec![Step::Frame]);
        let broadcaster = Arc::new(FrameBroadcaster::new());
        let recognizer = OneFace {
            embedding: vec![0.0, 0.0],
            fail: false,
        };
        let capture = CaptureLoop::new(
            fast_config(),
            source,
            Arc::new(recognizer),
            gallery(),
            Arc::clone(&broadcaster),
        );

        let stats = capture.run(&shutdown).unwrap();

        assert_eq!(stats.faces_detected, 1);
        assert_eq!(stats.faces_recognized, 1);
        let (frame, generation) = broadcaster.latest().unwrap();
        assert_eq!(generation, 1);
        assert_eq!(frame.face_count, 1);
        assert_eq!(&frame.data[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_stranger_is_unknown() {
        let (source, shutdown, _) = ScriptedSource::new(vec![Step::Frame]);
        let broadcaster = Arc::new(FrameBroadcaster::new());
        let recognizer = OneFace {
            embedding: vec![5.0, 5.0],
            fail: false,
        };
        let capture = CaptureLoop::new(
            fast_config(),
            source,
            Arc::new(recognizer),
            gallery(),
            Arc::clone(&broadcaster),
        );

        let stats = capture.run(&shutdown).unwrap();

        assert_eq!(stats.faces_detected, 1);
        assert_eq!(stats.faces_recognized, 0);
    }

    #[test]
    fn test_recognition_error_publishes_unannotated() {
        let (source, shutdown, _) = ScriptedSource::new(vec![Step::Frame, Step::Frame]);
        let broadcaster = Arc::new(FrameBroadcaster::new());
        let recognizer = OneFace {
            embedding: vec![0.0, 0.0],
            fail: true,
        };
        let capture = CaptureLoop::new(
            fast_config(),
            source,
            Arc::new(recognizer),
            gallery(),
            Arc::clone(&broadcaster),
        );

        let stats = capture.run(&shutdown).unwrap();

        assert_eq!(stats.detection_failures, 2);
        assert_eq!(stats.frames_published, 2);
        assert_eq!(broadcaster.latest().unwrap().0.face_count, 0);
    }

    #[test]
    fn test_cadence_caps_frame_rate() {
        let (source, shutdown, _) = ScriptedSource::new(vec![Step::Frame, Step::Frame, Step::Frame]);
        let config = CaptureConfig::default().target_fps(20.0);
        let capture = CaptureLoop::new(
            config,
            source,
            Arc::new(NullRecognizer),
            Gallery::empty(),
            Arc::new(FrameBroadcaster::new()),
        );

        let started = Instant::now();
        capture.run(&shutdown).unwrap();

        // Three frames plus the stopping tick: at least three full intervals
        assert!(started.elapsed() >= Duration::from_millis(150));
    }

    #[test]
    fn test_spawned_loop_stops_on_request() {
        let releases = Arc::new(AtomicUsize::new(0));

        struct Endless(Arc<AtomicUsize>);

        impl FrameSource for Endless {
            fn name(&self) -> &str {
                "endless"
            }

            fn next_frame(&mut self) -> std::result::Result<RawFrame, CaptureError> {
                Ok(RawFrame::from_rgb(RgbImage::new(8, 8), Instant::now()))
            }

            fn release(&mut self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let broadcaster = Arc::new(FrameBroadcaster::new());
        let handle = CaptureLoop::new(
            fast_config(),
            Endless(Arc::clone(&releases)),
            Arc::new(NullRecognizer) as Arc<dyn Recognizer>,
            Gallery::empty(),
            Arc::clone(&broadcaster),
        )
        .spawn()
        .unwrap();

        while broadcaster.generation() < 3 {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(handle.state(), LoopState::Running);

        handle.stop();
        let stats = handle.join().unwrap();

        assert!(stats.frames_published >= 3);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
        assert!(broadcaster.is_closed());
    }
}
