//! Capture loop and application wiring, driven by fake sources

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use image::{Rgb, RgbImage};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::time::timeout;

use facewatch::app::{self, AppConfig};
use facewatch::broadcast::FrameBroadcaster;
use facewatch::capture::{CaptureConfig, CaptureError, CaptureLoop, FrameSource, LoopState, RawFrame};
use facewatch::recognition::{
    BoundingBox, Embedding, Gallery, GalleryEntry, NullRecognizer, RecognitionError, Recognizer,
};
use facewatch::Error;

const STEP: Duration = Duration::from_secs(5);

/// Produces gray frames until told to fail, then fails every read
struct SwitchableSource {
    width: u32,
    height: u32,
    fail: Arc<AtomicBool>,
    releases: Arc<AtomicUsize>,
}

impl SwitchableSource {
    fn new(width: u32, height: u32) -> (Self, Arc<AtomicBool>, Arc<AtomicUsize>) {
        let fail = Arc::new(AtomicBool::new(false));
        let releases = Arc::new(AtomicUsize::new(0));
        let source = Self {
            width,
            height,
            fail: Arc::clone(&fail),
            releases: Arc::clone(&releases),
        };
        (source, fail, releases)
    }
}

impl FrameSource for SwitchableSource {
    fn name(&self) -> &str {
        "switchable"
    }

    fn next_frame(&mut self) -> Result<RawFrame, CaptureError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(CaptureError::Transient("device busy".into()));
        }
        let image = RgbImage::from_pixel(self.width, self.height, Rgb([40, 40, 40]));
        Ok(RawFrame::from_rgb(image, Instant::now()))
    }

    fn release(&mut self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// Finds one face in the middle of every frame
struct CenterFace;

impl Recognizer for CenterFace {
    fn detect_faces(&self, frame: &RawFrame) -> Result<Vec<BoundingBox>, RecognitionError> {
        let (w, h) = (frame.width(), frame.height());
        Ok(vec![BoundingBox::new(h / 8, w * 7 / 8, h * 7 / 8, w / 8)])
    }

    fn embed(&self, _frame: &RawFrame, _face: &BoundingBox) -> Result<Embedding, RecognitionError> {
        Ok(Embedding::new(vec![0.1, 0.2, 0.3]))
    }
}

fn config() -> CaptureConfig {
    CaptureConfig::default().target_fps(50.0)
}

#[test]
fn published_frames_carry_annotations() {
    let (source, _fail, releases) = SwitchableSource::new(256, 256);
    let broadcaster = Arc::new(FrameBroadcaster::new());
    let gallery = Gallery::new(vec![GalleryEntry::new("Ada", Embedding::new(vec![0.1, 0.2, 0.3]))]);

    let handle = CaptureLoop::new(
        config(),
        source,
        Arc::new(CenterFace),
        gallery,
        Arc::clone(&broadcaster),
    )
    .spawn()
    .unwrap();

    let started = Instant::now();
    while broadcaster.generation() == 0 {
        assert!(started.elapsed() < STEP, "no frame published");
        std::thread::sleep(Duration::from_millis(5));
    }

    handle.stop();
    let stats = handle.join().unwrap();

    let (frame, _) = broadcaster.latest().unwrap();
    assert_eq!(frame.face_count, 1);
    assert!(stats.faces_recognized >= 1);
    assert_eq!(releases.load(Ordering::SeqCst), 1);

    // Box spans 32..224; its label bar fills the bottom 35 rows
    let decoded = image::load_from_memory(&frame.data).unwrap().to_rgb8();
    assert_eq!(decoded.dimensions(), (256, 256));
    let Rgb([r, g, b]) = *decoded.get_pixel(200, 205);
    assert!(r > 180 && g < 80 && b < 80, "expected red label bar, got {:?}", (r, g, b));

    // Outside the box the frame is untouched gray
    let Rgb([r, g, b]) = *decoded.get_pixel(8, 8);
    assert!(r.abs_diff(40) < 16 && g.abs_diff(40) < 16 && b.abs_diff(40) < 16);
}

#[test]
fn lost_camera_stops_the_loop() {
    let (source, fail, releases) = SwitchableSource::new(32, 32);
    let broadcaster = Arc::new(FrameBroadcaster::new());

    let handle = CaptureLoop::new(
        config(),
        source,
        Arc::new(NullRecognizer),
        Gallery::empty(),
        Arc::clone(&broadcaster),
    )
    .spawn()
    .unwrap();

    fail.store(true, Ordering::SeqCst);

    let started = Instant::now();
    while !handle.is_finished() {
        assert!(started.elapsed() < STEP, "capture loop did not give up");
        std::thread::sleep(Duration::from_millis(5));
    }

    assert_eq!(handle.state(), LoopState::Fatal);
    assert!(matches!(
        handle.join(),
        Err(Error::Capture(CaptureError::TooManyFailures(3)))
    ));
    assert_eq!(releases.load(Ordering::SeqCst), 1);
    assert!(broadcaster.is_closed());
}

async fn open_stream(addr: std::net::SocketAddr) -> BufReader<TcpStream> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /stream.mjpg HTTP/1.0\r\n\r\n")
        .await
        .unwrap();
    let mut reader = BufReader::new(stream);

    // Skip the response head; an HTTP/1.0 body is the raw multipart stream
    loop {
        let mut line = String::new();
        timeout(STEP, reader.read_line(&mut line)).await.unwrap().unwrap();
        if line == "\r\n" {
            break;
        }
    }
    reader
}

async fn read_boundary(reader: &mut BufReader<TcpStream>) {
    let mut line = String::new();
    timeout(STEP, reader.read_line(&mut line)).await.unwrap().unwrap();
    assert_eq!(line, "--FRAME\r\n");
}

#[tokio::test]
async fn app_ends_streams_when_camera_is_lost() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (source, fail, releases) = SwitchableSource::new(32, 32);

    let app = tokio::spawn(app::serve(
        listener,
        AppConfig {
            capture: config(),
            ..AppConfig::default()
        },
        source,
        Arc::new(NullRecognizer),
        Gallery::empty(),
        std::future::pending::<()>(),
    ));

    let mut reader = open_stream(addr).await;
    read_boundary(&mut reader).await;

    fail.store(true, Ordering::SeqCst);

    // The viewer sees the response end rather than hanging
    let mut rest = Vec::new();
    timeout(STEP, reader.read_to_end(&mut rest)).await.unwrap().unwrap();

    let result = timeout(STEP, app).await.unwrap().unwrap();
    assert!(matches!(
        result,
        Err(Error::Capture(CaptureError::TooManyFailures(3)))
    ));
    assert_eq!(releases.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn app_stops_cleanly_on_shutdown() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (source, _fail, releases) = SwitchableSource::new(32, 32);
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let app = tokio::spawn(app::serve(
        listener,
        AppConfig {
            capture: config(),
            ..AppConfig::default()
        },
        source,
        Arc::new(NullRecognizer),
        Gallery::empty(),
        async {
            let _ = stop_rx.await;
        },
    ));

    let mut reader = open_stream(addr).await;
    read_boundary(&mut reader).await;

    stop_tx.send(()).unwrap();

    let stats = timeout(STEP, app).await.unwrap().unwrap().unwrap();
    assert!(stats.frames_published >= 1);
    assert_eq!(stats.capture_failures, 0);
    assert_eq!(releases.load(Ordering::SeqCst), 1);

    // Shutdown closes the broadcaster, which ends the open stream
    let mut rest = Vec::new();
    timeout(STEP, reader.read_to_end(&mut rest)).await.unwrap().unwrap();
}
