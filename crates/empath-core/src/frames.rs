//! Frame sampling and payload encoding.
//!
//! Frames are taken evenly across the whole ordered sequence, never from
//! the head only, and each one is optionally downscaled and recompressed to
//! keep request bodies small. A frame that fails to re-encode is sent as
//! its original bytes.

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::imageops::FilterType;
use tracing::{debug, warn};

use crate::config::FrameSettings;
use crate::error::{GenerationError, GenerationResult};

/// Source indices for an even `k`-of-`len` sample.
///
/// Stride is `max(1, len / k)`; the result has exactly `min(len, k)`
/// strictly increasing entries.
pub fn sample_indices(len: usize, k: usize) -> Vec<usize> {
    if k == 0 {
        return Vec::new();
    }
    if len <= k {
        return (0..len).collect();
    }
    let stride = (len / k).max(1);
    (0..len).step_by(stride).take(k).collect()
}

/// Pick `min(seq.len(), k)` evenly spaced items.
pub fn evenly_sample<T: Clone>(seq: &[T], k: usize) -> Vec<T> {
    sample_indices(seq.len(), k)
        .into_iter()
        .map(|i| seq[i].clone())
        .collect()
}

/// One frame ready for the request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    pub file_name: String,
    pub mime: &'static str,
    pub base64: String,
}

impl EncodedFrame {
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, self.base64)
    }
}

/// Ordered frames for one request.
#[derive(Debug, Clone, Default)]
pub struct FramePayload {
    pub frames: Vec<EncodedFrame>,
}

impl FramePayload {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Builds bounded frame payloads from a directory of images.
#[derive(Debug, Clone, Default)]
pub struct FrameSampler {
    settings: FrameSettings,
}

impl FrameSampler {
    pub fn new(settings: FrameSettings) -> Self {
        Self { settings }
    }

    /// Files in `dir` sorted by name. A missing or non-directory path has
    /// no frames.
    pub fn list_frames(dir: &Path) -> Vec<PathBuf> {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return Vec::new();
        };
        let mut files: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .collect();
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        files
    }

    /// Sample at most `max_frames` frames from `dir` and encode them.
    pub fn build(&self, dir: &Path, max_frames: usize) -> GenerationResult<FramePayload> {
        let files = Self::list_frames(dir);
        if files.is_empty() {
            debug!(dir = %dir.display(), "0 frames read");
            return Ok(FramePayload::default());
        }

        let mut frames = Vec::with_capacity(max_frames.min(files.len()));
        for path in evenly_sample(&files, max_frames) {
            let raw = std::fs::read(&path).map_err(|e| GenerationError::MissingAsset {
                path: format!("{} ({})", path.display(), e),
            })?;
            frames.push(self.encode_frame(&path, raw));
        }

        debug!(dir = %dir.display(), frames = frames.len(), "frames read");
        Ok(FramePayload { frames })
    }

    fn encode_frame(&self, path: &Path, raw: Vec<u8>) -> EncodedFrame {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let (bytes, mime) = if self.settings.reencode {
            match reencode_jpeg(&raw, self.settings.target_width, self.settings.jpeg_quality) {
                Ok(jpeg) => (jpeg, "image/jpeg"),
                Err(e) => {
                    warn!(frame = %file_name, error = %e, "re-encode failed, sending original bytes");
                    (raw, mime_for(path))
                }
            }
        } else {
            (raw, mime_for(path))
        };

        EncodedFrame {
            file_name,
            mime,
            base64: STANDARD.encode(bytes),
        }
    }
}

fn reencode_jpeg(raw: &[u8], target_width: u32, quality: u8) -> image::ImageResult<Vec<u8>> {
    let mut rgb = image::load_from_memory(raw)?.to_rgb8();
    if target_width > 0 && rgb.width() > target_width {
        let scale = f64::from(target_width) / f64::from(rgb.width());
        let new_height = ((f64::from(rgb.height()) * scale) as u32).max(1);
        rgb = image::imageops::resize(&rgb, target_width, new_height, FilterType::Triangle);
    }

    let mut buf = Vec::new();
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality);
    rgb.write_with_encoder(encoder)?;
    Ok(buf)
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/png",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_count_is_min_of_len_and_k() {
        for len in 0..40 {
            for k in 0..15 {
                let idx = sample_indices(len, k);
                assert_eq!(idx.len(), len.min(k), "len={} k={}", len, k);
                assert!(idx.windows(2).all(|w| w[0] < w[1]));
                assert!(idx.iter().all(|&i| i < len));
            }
        }
    }

    #[test]
    fn sample_spreads_across_sequence() {
        // 30 frames, 12 wanted: stride 2
        assert_eq!(
            sample_indices(30, 12),
            vec![0, 2, 4, 6, 8, 10, 12, 14, 16, 18, 20, 22]
        );
        // 100 frames, 4 wanted: stride 25
        assert_eq!(sample_indices(100, 4), vec![0, 25, 50, 75]);
    }

    #[test]
    fn sample_is_deterministic() {
        let names: Vec<String> = (0..57).map(|i| format!("{:03}.png", i)).collect();
        assert_eq!(evenly_sample(&names, 8), evenly_sample(&names, 8));
    }

    #[test]
    fn missing_dir_yields_empty_payload() {
        let sampler = FrameSampler::default();
        let payload = sampler
            .build(Path::new("/definitely/not/here"), 12)
            .unwrap();
        assert!(payload.is_empty());
    }

    #[test]
    fn undecodable_frame_falls_back_to_original_bytes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("000.png"), b"not an image").unwrap();

        let payload = FrameSampler::default().build(dir.path(), 12).unwrap();
        assert_eq!(payload.len(), 1);
        assert_eq!(payload.frames[0].mime, "image/png");
        assert_eq!(payload.frames[0].base64, STANDARD.encode(b"not an image"));
    }

    #[test]
    fn wide_frame_is_downscaled_to_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let img = image::RgbImage::from_pixel(1024, 256, image::Rgb([200, 10, 10]));
        img.save(dir.path().join("000.png")).unwrap();

        let payload = FrameSampler::default().build(dir.path(), 12).unwrap();
        assert_eq!(payload.frames[0].mime, "image/jpeg");

        let bytes = STANDARD.decode(&payload.frames[0].base64).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.width(), 512);
        assert_eq!(decoded.height(), 128);
    }

    #[test]
    fn frames_are_read_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.png", "a.png", "c.png"] {
            std::fs::write(dir.path().join(name), name.as_bytes()).unwrap();
        }
        let sampler = FrameSampler::new(FrameSettings {
            reencode: false,
            ..FrameSettings::default()
        });
        let payload = sampler.build(dir.path(), 12).unwrap();
        let names: Vec<_> = payload.frames.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(names, vec!["a.png", "b.png", "c.png"]);
    }
}
