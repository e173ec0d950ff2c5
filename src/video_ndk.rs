//! NDK video decoding
//!
//! AMediaExtractor demuxes the file, AMediaCodec decodes to NV12 in CPU
//! memory, and each frame is converted to RGBA and published into the shared
//! frame. The file loops at end of stream.

use std::ffi::CStr;
use std::fs::File;
use std::os::raw::c_char;
use std::os::unix::io::AsRawFd;
use std::path::Path;
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use log::{info, warn};
use ndk_sys::*;

use crate::error::VideoError;
use crate::video::{nv12_to_rgba, SharedFrame};

const DEQUEUE_TIMEOUT_US: i64 = 5000;
const INFO_OUTPUT_FORMAT_CHANGED: isize = -2;

struct Extractor(*mut AMediaExtractor);

impl Extractor {
    fn new() -> Option<Self> {
        let raw = unsafe { AMediaExtractor_new() };
        (!raw.is_null()).then_some(Self(raw))
    }
}

impl Drop for Extractor {
    fn drop(&mut self) {
        unsafe {
            AMediaExtractor_delete(self.0);
        }
    }
}

struct Format(*mut AMediaFormat);

impl Format {
    /// Takes ownership of a format returned by the NDK; null yields `None`
    fn from_raw(raw: *mut AMediaFormat) -> Option<Self> {
        (!raw.is_null()).then_some(Self(raw))
    }

    fn int(&self, key: &CStr) -> Option<i32> {
        let mut value = 0;
        unsafe { AMediaFormat_getInt32(self.0, key.as_ptr(), &mut value) }.then_some(value)
    }

    fn mime(&self) -> Option<String> {
        let mut mime_ptr: *const c_char = ptr::null();
        unsafe {
            if AMediaFormat_getString(self.0, c"mime".as_ptr(), &mut mime_ptr) && !mime_ptr.is_null() {
                Some(CStr::from_ptr(mime_ptr).to_string_lossy().into_owned())
            } else {
                None
            }
        }
    }
}

impl Drop for Format {
    fn drop(&mut self) {
        unsafe {
            AMediaFormat_delete(self.0);
        }
    }
}

struct Codec {
    raw: *mut AMediaCodec,
    started: bool,
}

impl Codec {
    fn decoder_for(mime: &CStr) -> Option<Self> {
        let raw = unsafe { AMediaCodec_createDecoderByType(mime.as_ptr()) };
        (!raw.is_null()).then_some(Self { raw, started: false })
    }

    fn start(&mut self) -> Result<(), VideoError> {
        let status = unsafe { AMediaCodec_start(self.raw) };
        if status.0 != 0 {
            return Err(VideoError::Codec(format!("failed to start codec: {}", status.0)));
        }
        self.started = true;
        Ok(())
    }
}

impl Drop for Codec {
    fn drop(&mut self) {
        unsafe {
            if self.started {
                AMediaCodec_stop(self.raw);
            }
            AMediaCodec_delete(self.raw);
        }
    }
}

/// Layout of decoder output buffers
#[derive(Debug, Clone, Copy)]
struct OutputLayout {
    width: u32,
    height: u32,
    stride: u32,
    slice_height: u32,
}

impl OutputLayout {
    fn read(format: &Format, fallback: OutputLayout) -> Self {
        let width = format.int(c"width").map_or(fallback.width, |v| v as u32);
        let height = format.int(c"height").map_or(fallback.height, |v| v as u32);
        Self {
            width,
            height,
            stride: format.int(c"stride").map_or(width, |v| v as u32),
            slice_height: format.int(c"slice-height").map_or(height, |v| v as u32),
        }
    }
}

/// Decode `path` into `frame` until `running` clears
pub fn decode_file(path: &Path, frame: &SharedFrame, running: &AtomicBool) -> Result<(), VideoError> {
    info!("MediaCodec: Opening {}", path.display());

    let file = File::open(path).map_err(VideoError::Open)?;
    let fd = file.as_raw_fd();
    let file_len = file.metadata().map(|m| m.len() as i64).unwrap_or(i64::MAX);

    unsafe {
        let extractor = Extractor::new().ok_or_else(|| VideoError::Codec("failed to create AMediaExtractor".into()))?;

        let status = AMediaExtractor_setDataSourceFd(extractor.0, fd, 0, file_len);
        if status.0 != 0 {
            return Err(VideoError::Codec(format!("failed to set data source: {}", status.0)));
        }

        let track_count = AMediaExtractor_getTrackCount(extractor.0);
        info!("MediaCodec: Found {} tracks", track_count);

        let mut video_track = None;
        for i in 0..track_count as usize {
            let Some(format) = Format::from_raw(AMediaExtractor_getTrackFormat(extractor.0, i)) else {
                continue;
            };
            if let Some(mime) = format.mime() {
                info!("Track {}: {}", i, mime);
                if mime.starts_with("video/") {
                    video_track = Some((i, format, mime));
                    break;
                }
            }
        }
        let (track_idx, format, mime) = video_track.ok_or_else(|| VideoError::Codec("no video track".into()))?;

        let mut layout = OutputLayout::read(
            &format,
            OutputLayout {
                width: 0,
                height: 0,
                stride: 0,
                slice_height: 0,
            },
        );
        info!("MediaCodec: {} {}x{}", mime, layout.width, layout.height);

        let status = AMediaExtractor_selectTrack(extractor.0, track_idx);
        if status.0 != 0 {
            return Err(VideoError::Codec(format!("failed to select track: {}", status.0)));
        }

        let mime_c = std::ffi::CString::new(mime).map_err(|e| VideoError::Codec(e.to_string()))?;
        let mut codec = Codec::decoder_for(&mime_c)
            .ok_or_else(|| VideoError::Codec(format!("no decoder for {}", mime_c.to_string_lossy())))?;

        let status = AMediaCodec_configure(codec.raw, format.0, ptr::null_mut(), ptr::null_mut(), 0);
        if status.0 != 0 {
            return Err(VideoError::Codec(format!("failed to configure codec: {}", status.0)));
        }
        codec.start()?;
        info!("MediaCodec: Decoder started");

        let mut clock = Instant::now();
        let mut first_pts: Option<i64> = None;
        let mut last_pts = i64::MIN;
        let mut frame_count: u64 = 0;

        while running.load(Ordering::SeqCst) {
            let input_idx = AMediaCodec_dequeueInputBuffer(codec.raw, DEQUEUE_TIMEOUT_US);
            if input_idx >= 0 {
                let mut buf_size: usize = 0;
                let input_buf = AMediaCodec_getInputBuffer(codec.raw, input_idx as usize, &mut buf_size);
                if !input_buf.is_null() && buf_size > 0 {
                    let sample_size = AMediaExtractor_readSampleData(extractor.0, input_buf, buf_size);
                    if sample_size >= 0 {
                        let pts = AMediaExtractor_getSampleTime(extractor.0);
                        let flags = AMediaExtractor_getSampleFlags(extractor.0);
                        AMediaCodec_queueInputBuffer(codec.raw, input_idx as usize, 0, sample_size as usize, pts as u64, flags as u32);
                        AMediaExtractor_advance(extractor.0);
                    } else {
                        // End of stream, loop
                        AMediaCodec_queueInputBuffer(codec.raw, input_idx as usize, 0, 0, 0, 0);
                        AMediaExtractor_seekTo(extractor.0, 0, SeekMode::AMEDIAEXTRACTOR_SEEK_PREVIOUS_SYNC);
                    }
                }
            }

            let mut buffer_info = AMediaCodecBufferInfo {
                offset: 0,
                size: 0,
                presentationTimeUs: 0,
                flags: 0,
            };
            let output_idx = AMediaCodec_dequeueOutputBuffer(codec.raw, &mut buffer_info, DEQUEUE_TIMEOUT_US);

            if output_idx == INFO_OUTPUT_FORMAT_CHANGED {
                if let Some(output_format) = Format::from_raw(AMediaCodec_getOutputFormat(codec.raw)) {
                    layout = OutputLayout::read(&output_format, layout);
                    info!("MediaCodec: Output format {:?}", layout);
                }
                continue;
            }
            if output_idx < 0 {
                continue;
            }

            let pts = buffer_info.presentationTimeUs;
            let mut out_size: usize = 0;
            let out_buf = AMediaCodec_getOutputBuffer(codec.raw, output_idx as usize, &mut out_size);
            let offset = buffer_info.offset.max(0) as usize;
            let size = buffer_info.size.max(0) as usize;

            if !out_buf.is_null() && size > 0 && offset + size <= out_size {
                let yuv = std::slice::from_raw_parts(out_buf.add(offset), size);
                let rgba = nv12_to_rgba(yuv, layout.width, layout.height, layout.stride, layout.slice_height);
                if let Ok(mut shared) = frame.lock() {
                    shared.publish(rgba, layout.width, layout.height, pts);
                }
            }
            AMediaCodec_releaseOutputBuffer(codec.raw, output_idx as usize, false);

            // Pace to presentation time, restarting the clock when the file loops
            if pts < last_pts {
                first_pts = None;
            }
            last_pts = pts;
            let base = *first_pts.get_or_insert_with(|| {
                clock = Instant::now();
                pts
            });
            let due = Duration::from_micros((pts - base).max(0) as u64);
            if let Some(wait) = due.checked_sub(clock.elapsed()) {
                thread::sleep(wait);
            }

            frame_count += 1;
            if frame_count % 100 == 0 {
                info!("MediaCodec: Decoded {} frames", frame_count);
            }
        }

        if frame_count == 0 {
            warn!("MediaCodec: Stopped before any frame was decoded");
        }
        info!("MediaCodec: Stopped after {} frames", frame_count);
    }

    Ok(())
}
