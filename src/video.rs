//! Video frame source
//!
//! A decoder thread publishes RGBA frames into a shared [`VideoFrame`]; the
//! render thread uploads whatever is there whenever the version moved on.
//! Both eye planes sample that single frame, so it is never copied on the
//! render side.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{error, info};

/// Where frames come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoSource {
    /// Generated top/bottom packed stereo pattern
    TestPattern,
    /// Top/bottom packed stereo video file
    File(PathBuf),
}

/// Latest decoded frame, RGBA8 rows top to bottom
#[derive(Debug, Clone, Default)]
pub struct VideoFrame {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub timestamp_us: i64,
    /// Bumped on every publish; 0 means nothing decoded yet
    pub version: u64,
}

impl VideoFrame {
    /// Replace the contents and bump the version
    pub fn publish(&mut self, pixels: Vec<u8>, width: u32, height: u32, timestamp_us: i64) {
        self.pixels = pixels;
        self.width = width;
        self.height = height;
        self.timestamp_us = timestamp_us;
        self.version += 1;
    }
}

pub type SharedFrame = Arc<Mutex<VideoFrame>>;

/// Playback handle: owns the decoder thread and the shared frame
pub struct VideoFeed {
    source: VideoSource,
    frame: SharedFrame,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl VideoFeed {
    pub fn new(source: VideoSource) -> Self {
        Self {
            source,
            frame: Arc::new(Mutex::new(VideoFrame::default())),
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Start decoding. Playing an already playing feed does nothing; returns
    /// whether a decoder thread was started.
    pub fn play(&mut self) -> bool {
        if self.worker.is_some() {
            return false;
        }

        info!("VideoFeed: starting playback of {:?}", self.source);
        self.running.store(true, Ordering::SeqCst);

        let source = self.source.clone();
        let frame = Arc::clone(&self.frame);
        let running = Arc::clone(&self.running);
        let spawned = thread::Builder::new()
            .name("video-decoder".into())
            .spawn(move || run_decoder(source, frame, running));

        match spawned {
            Ok(handle) => {
                self.worker = Some(handle);
                true
            }
            Err(e) => {
                error!("VideoFeed: failed to spawn decoder thread: {}", e);
                self.running.store(false, Ordering::SeqCst);
                false
            }
        }
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
            info!("VideoFeed: stopped");
        }
    }

    /// Run `read` on the current frame when it is newer than `seen_version`.
    /// Returns the version that was read. The frame stays locked for the
    /// duration of `read`.
    pub fn read_if_newer(&self, seen_version: u64, read: impl FnOnce(&VideoFrame)) -> Option<u64> {
        let frame = self.frame.lock().ok()?;
        if frame.version <= seen_version || frame.pixels.is_empty() {
            return None;
        }
        read(&frame);
        Some(frame.version)
    }

    /// Handle for producers (decoder threads, tests)
    pub fn shared_frame(&self) -> SharedFrame {
        Arc::clone(&self.frame)
    }
}

impl Drop for VideoFeed {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_decoder(source: VideoSource, frame: SharedFrame, running: Arc<AtomicBool>) {
    match source {
        VideoSource::TestPattern => run_test_pattern(&frame, &running),
        VideoSource::File(path) => {
            if let Err(e) = decode_file(&path, &frame, &running) {
                error!("VideoFeed: decoding {} failed: {}", path.display(), e);
                // Keep something on screen
                run_test_pattern(&frame, &running);
            }
        }
    }
}

#[cfg(target_os = "android")]
fn decode_file(path: &std::path::Path, frame: &SharedFrame, running: &AtomicBool) -> Result<(), crate::error::VideoError> {
    crate::video_ndk::decode_file(path, frame, running)
}

#[cfg(not(target_os = "android"))]
fn decode_file(path: &std::path::Path, _frame: &SharedFrame, _running: &AtomicBool) -> Result<(), crate::error::VideoError> {
    log::warn!("VideoFeed: no hardware decoder on this platform for {}", path.display());
    Err(crate::error::VideoError::Unsupported)
}

const PATTERN_WIDTH: u32 = 1280;
const PATTERN_HEIGHT: u32 = 720;
// ~60 FPS
const PATTERN_FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Test pattern generator: animated top/bottom packed frames
fn run_test_pattern(frame: &SharedFrame, running: &AtomicBool) {
    info!("VideoFeed: generating {}x{} test pattern", PATTERN_WIDTH, PATTERN_HEIGHT);
    let start = Instant::now();
    let mut frame_index: u64 = 0;

    while running.load(Ordering::SeqCst) {
        let pixels = test_pattern_frame(PATTERN_WIDTH, PATTERN_HEIGHT, frame_index);
        let elapsed_us = start.elapsed().as_micros() as i64;
        if let Ok(mut shared) = frame.lock() {
            shared.publish(pixels, PATTERN_WIDTH, PATTERN_HEIGHT, elapsed_us);
        }
        frame_index += 1;
        thread::sleep(PATTERN_FRAME_INTERVAL);
    }
}

/// One RGBA test frame. The upper half of the rows (right eye) is tinted red,
/// the lower half (left eye) cyan; a diagonal gradient scrolls with
/// `frame_index` so motion is visible.
pub fn test_pattern_frame(width: u32, height: u32, frame_index: u64) -> Vec<u8> {
    let mut pixels = vec![0u8; width as usize * height as usize * 4];
    let time_offset = ((frame_index * 4) % 256) as u8;
    let half = height / 2;

    for y in 0..height {
        for x in 0..width {
            let idx = ((y * width + x) * 4) as usize;
            let luma = (x as u8).wrapping_add(y as u8).wrapping_add(time_offset) / 2 + 64;
            let (r, g, b) = if y < half { (luma + 63, luma / 2, luma / 2) } else { (luma / 2, luma, luma + 63) };
            pixels[idx..idx + 4].copy_from_slice(&[r, g, b, 255]);
        }
    }
    pixels
}

/// Convert semi-planar YUV 4:2:0 (NV12) to RGBA.
///
/// `stride` is the byte distance between rows and `slice_height` the number
/// of rows before the interleaved UV plane starts. Short input yields mid-grey.
pub fn nv12_to_rgba(yuv: &[u8], width: u32, height: u32, stride: u32, slice_height: u32) -> Vec<u8> {
    let (w, h) = (width as usize, height as usize);
    let stride = (stride as usize).max(w);
    let slice_height = (slice_height as usize).max(h);
    let uv_start = stride * slice_height;

    if yuv.len() < uv_start + stride * h.div_ceil(2) - (stride - w) {
        return vec![128u8; w * h * 4];
    }

    let mut rgba = vec![0u8; w * h * 4];
    for y in 0..h {
        for x in 0..w {
            let y_val = yuv[y * stride + x] as i32;
            let uv_idx = uv_start + (y / 2) * stride + (x / 2) * 2;
            let u_val = yuv.get(uv_idx).copied().unwrap_or(128) as i32;
            let v_val = yuv.get(uv_idx + 1).copied().unwrap_or(128) as i32;

            let r = (y_val + ((351 * (v_val - 128)) >> 8)).clamp(0, 255) as u8;
            let g = (y_val - ((86 * (u_val - 128) + 179 * (v_val - 128)) >> 8)).clamp(0, 255) as u8;
            let b = (y_val + ((443 * (u_val - 128)) >> 8)).clamp(0, 255) as u8;

            let idx = (y * w + x) * 4;
            rgba[idx..idx + 4].copy_from_slice(&[r, g, b, 255]);
        }
    }
    rgba
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_halves_are_distinct() {
        let pixels = test_pattern_frame(64, 32, 0);
        assert_eq!(pixels.len(), 64 * 32 * 4);
        let at = |x: usize, y: usize| &pixels[(y * 64 + x) * 4..(y * 64 + x) * 4 + 4];
        for x in [0, 17, 63] {
            let top = at(x, 3);
            let bottom = at(x, 28);
            assert!(top[0] > top[2], "top half should lean red: {:?}", top);
            assert!(bottom[2] > bottom[0], "bottom half should lean cyan: {:?}", bottom);
            assert_eq!(top[3], 255);
        }
    }

    #[test]
    fn test_pattern_moves() {
        assert_ne!(test_pattern_frame(16, 16, 0), test_pattern_frame(16, 16, 1));
    }

    #[test]
    fn nv12_grey_and_short_input() {
        // 2x2 luma 100, neutral chroma
        let yuv = [100, 100, 100, 100, 128, 128];
        let rgba = nv12_to_rgba(&yuv, 2, 2, 2, 2);
        assert_eq!(rgba, [100, 100, 100, 255].repeat(4));

        assert_eq!(nv12_to_rgba(&[0; 3], 2, 2, 2, 2), vec![128; 16]);
    }

    #[test]
    fn nv12_honours_stride_and_slice_height() {
        // 2x2 image in 4-byte rows with one padding row before chroma
        let yuv = [
            50, 60, 0, 0, //
            70, 80, 0, 0, //
            0, 0, 0, 0, //
            128, 128, 0, 0,
        ];
        let rgba = nv12_to_rgba(&yuv, 2, 2, 4, 3);
        let lumas: Vec<u8> = rgba.chunks_exact(4).map(|p| p[0]).collect();
        assert_eq!(lumas, vec![50, 60, 70, 80]);
    }

    #[test]
    fn read_if_newer_tracks_versions() {
        let feed = VideoFeed::new(VideoSource::TestPattern);
        assert_eq!(feed.read_if_newer(0, |_| panic!("nothing decoded yet")), None);

        feed.shared_frame().lock().unwrap().publish(vec![1, 2, 3, 4], 1, 1, 0);
        let mut seen = Vec::new();
        let version = feed.read_if_newer(0, |f| seen = f.pixels.clone());
        assert_eq!(version, Some(1));
        assert_eq!(seen, vec![1, 2, 3, 4]);
        assert_eq!(feed.read_if_newer(1, |_| panic!("already seen")), None);
    }

    #[test]
    fn play_is_one_shot_and_publishes() {
        let mut feed = VideoFeed::new(VideoSource::TestPattern);
        assert!(feed.play());
        assert!(!feed.play());
        assert!(feed.is_playing());

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut version = None;
        while version.is_none() && Instant::now() < deadline {
            version = feed.read_if_newer(0, |f| {
                assert_eq!((f.width, f.height), (PATTERN_WIDTH, PATTERN_HEIGHT));
            });
            thread::sleep(Duration::from_millis(5));
        }
        assert!(version.is_some());

        feed.stop();
        assert!(!feed.is_playing());
    }

    #[cfg(not(target_os = "android"))]
    #[test]
    fn file_source_falls_back_to_test_pattern() {
        let mut feed = VideoFeed::new(VideoSource::File(PathBuf::from("/nonexistent/bbb_3d.mp4")));
        feed.play();
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut version = None;
        while version.is_none() && Instant::now() < deadline {
            version = feed.read_if_newer(0, |_| {});
            thread::sleep(Duration::from_millis(5));
        }
        assert!(version.is_some());
    }
}
