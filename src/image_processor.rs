//! # Image Processing Module
//!
//! Questo modulo ricodifica le immagini nel loro stesso formato usando il crate
//! `image`, senza tool esterni.
//!
//! ## Rilevamento formato
//!
//! Il formato autorevole è quello dichiarato dal contenuto (magic bytes).
//! L'estensione è usata solo come fallback quando il contenuto non è
//! riconosciuto: un `.png` corrotto viene quindi trattato come PNG e fallisce
//! in decode (errore), mentre un `.png` che contiene una BMP viene saltato.
//! Un `.jpg` che contiene un PNG viene ricodificato come PNG: nome ed
//! estensione non cambiano mai.
//!
//! ## Impostazioni per formato
//!
//! | Formato | Encoder | Impostazioni |
//! |---------|---------|--------------|
//! | JPEG    | `JpegEncoder` | qualità `config.jpeg_quality` (default 85), RGB o grigi 8 bit |
//! | PNG     | `PngEncoder`  | `CompressionType::Best`, filtro adattivo (lossless) |
//! | WebP    | `webp::Encoder` | lossy a `config.webp_quality` (default 85); `WebPEncoder` lossless se `webp_lossless` |
//! | GIF     | `GifEncoder`  | tutti i frame con delay originali, repeat infinito, `config.gif_speed` |
//! | Altri   | -             | saltato, file intatto |
//!
//! ## Pipeline per file
//!
//! 1. **Lettura**: i byte vengono letti una sola volta (`tokio::fs`)
//! 2. **Ricodifica**: decode + encode in `spawn_blocking`
//! 3. **Soglia**: sostituisce solo se `nuovo < originale * size_threshold`,
//!    altrimenti l'originale resta e il report mostra after == before
//! 4. **Sostituzione atomica**: file temporaneo fratello + rename
//!
//! Qualsiasi errore lascia l'originale byte per byte intatto.

use crate::config::Config;
use crate::error::OptimizeError;
use crate::file_manager::FileManager;
use crate::report::FileOutcome;
use image::codecs::gif::{GifDecoder, GifEncoder, Repeat};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::{AnimationDecoder, DynamicImage, ImageFormat};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Encoders this processor can re-encode with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Jpeg,
    Png,
    WebP,
    Gif,
}

impl Codec {
    pub fn from_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Jpeg => Some(Self::Jpeg),
            ImageFormat::Png => Some(Self::Png),
            ImageFormat::WebP => Some(Self::WebP),
            ImageFormat::Gif => Some(Self::Gif),
            _ => None,
        }
    }
}

/// Determine the real encoded format: content first, extension as fallback
pub fn detect_format(path: &Path, bytes: &[u8]) -> Option<ImageFormat> {
    image::guess_format(bytes)
        .ok()
        .or_else(|| ImageFormat::from_path(path).ok())
}

/// Extended WebP files carry an animation flag in the `VP8X` header
pub fn is_animated_webp(bytes: &[u8]) -> bool {
    bytes.len() > 20 && &bytes[12..16] == b"VP8X" && bytes[20] & 0x02 != 0
}

/// Lossless PNG at the strongest compression setting
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, OptimizeError> {
    let mut out = Vec::new();
    let encoder = PngEncoder::new_with_quality(&mut out, CompressionType::Best, PngFilterType::Adaptive);
    img.write_with_encoder(encoder)?;
    Ok(out)
}

/// How WebP output is encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebpMode {
    /// libwebp lossy encoding at the given quality (1-100)
    Lossy(u8),
    Lossless,
}

/// Encode as WebP; alpha is kept when the source has it
pub fn encode_webp(img: &DynamicImage, mode: WebpMode) -> Result<Vec<u8>, OptimizeError> {
    let has_alpha = img.color().has_alpha();

    match mode {
        WebpMode::Lossless => {
            let img = if has_alpha {
                DynamicImage::ImageRgba8(img.to_rgba8())
            } else {
                DynamicImage::ImageRgb8(img.to_rgb8())
            };

            let mut out = Vec::new();
            img.write_with_encoder(WebPEncoder::new_lossless(&mut out))?;
            Ok(out)
        }
        WebpMode::Lossy(quality) => {
            let (width, height) = (img.width(), img.height());
            let encoded = if has_alpha {
                let rgba = img.to_rgba8();
                webp::Encoder::from_rgba(rgba.as_raw(), width, height).encode_simple(false, f32::from(quality))
            } else {
                let rgb = img.to_rgb8();
                webp::Encoder::from_rgb(rgb.as_raw(), width, height).encode_simple(false, f32::from(quality))
            };

            encoded
                .map(|memory| memory.to_vec())
                .map_err(|e| OptimizeError::Encode(format!("WebP encoding failed: {:?}", e)))
        }
    }
}

/// Re-encodes raster files in place
#[derive(Debug, Clone)]
pub struct ImageProcessor {
    config: Config,
}

impl ImageProcessor {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Optimize a single file in place.
    ///
    /// Returns `Optimized` or `Skipped`; every failure comes back as `Err`
    /// with the file left untouched.
    pub async fn optimize(&self, path: &Path) -> Result<FileOutcome, OptimizeError> {
        let bytes = tokio::fs::read(path).await?;

        let processor = self.clone();
        let owned_path: PathBuf = path.to_path_buf();
        tokio::task::spawn_blocking(move || processor.optimize_bytes(&owned_path, bytes))
            .await
            .map_err(|e| OptimizeError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?
    }

    /// Blocking core of [`optimize`](Self::optimize) for bytes already read from `path`
    pub fn optimize_bytes(&self, path: &Path, bytes: Vec<u8>) -> Result<FileOutcome, OptimizeError> {
        let before = bytes.len() as u64;

        let encoded = match self.reencode(path, &bytes) {
            Ok((codec, encoded)) => {
                debug!("Re-encoded {} as {:?}: {} -> {} bytes", path.display(), codec, before, encoded.len());
                encoded
            }
            Err(OptimizeError::UnsupportedFormat(reason)) => {
                debug!("Skipping {}: {}", path.display(), reason);
                return Ok(FileOutcome::Skipped { size: before, reason });
            }
            Err(e) => return Err(e),
        };

        let after = encoded.len() as u64;
        if !self.should_replace(before, after) {
            debug!(
                "Keeping original {} (re-encoded {} bytes, original {}, threshold {})",
                path.display(),
                after,
                before,
                self.config.size_threshold
            );
            return Ok(FileOutcome::Optimized { before, after: before });
        }

        if self.config.dry_run {
            debug!("Dry run: would replace {}", path.display());
        } else {
            FileManager::write_atomically(path, &encoded)?;
        }

        Ok(FileOutcome::Optimized { before, after })
    }

    fn webp_mode(&self) -> WebpMode {
        if self.config.webp_lossless {
            WebpMode::Lossless
        } else {
            WebpMode::Lossy(self.config.webp_quality)
        }
    }

    fn should_replace(&self, original_size: u64, new_size: u64) -> bool {
        (new_size as f64) < (original_size as f64 * self.config.size_threshold)
    }

    /// Decode `bytes` and encode them again in their own format.
    ///
    /// Formats this processor cannot re-encode come back as
    /// `OptimizeError::UnsupportedFormat`.
    pub fn reencode(&self, path: &Path, bytes: &[u8]) -> Result<(Codec, Vec<u8>), OptimizeError> {
        let format = detect_format(path, bytes)
            .ok_or_else(|| OptimizeError::UnsupportedFormat("unrecognized format".to_string()))?;

        let codec = Codec::from_format(format)
            .ok_or_else(|| OptimizeError::UnsupportedFormat(format!("unsupported format {:?}", format)))?;

        let encoded = match codec {
            Codec::Gif => self.encode_gif(bytes)?,
            Codec::WebP => {
                if is_animated_webp(bytes) {
                    return Err(OptimizeError::UnsupportedFormat("animated WebP".to_string()));
                }
                encode_webp(&image::load_from_memory_with_format(bytes, format)?, self.webp_mode())?
            }
            Codec::Png => encode_png(&image::load_from_memory_with_format(bytes, format)?)?,
            Codec::Jpeg => self.encode_jpeg(image::load_from_memory_with_format(bytes, format)?)?,
        };

        Ok((codec, encoded))
    }

    fn encode_jpeg(&self, img: DynamicImage) -> Result<Vec<u8>, OptimizeError> {
        let img = match img {
            DynamicImage::ImageLuma8(_) => img,
            other => DynamicImage::ImageRgb8(other.to_rgb8()),
        };

        let mut out = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut out, self.config.jpeg_quality);
        img.write_with_encoder(encoder)?;
        Ok(out)
    }

    /// Re-encode every frame, keeping delays; the encoder writes the trailer on drop
    fn encode_gif(&self, bytes: &[u8]) -> Result<Vec<u8>, OptimizeError> {
        let decoder = GifDecoder::new(Cursor::new(bytes))?;
        let frames = decoder.into_frames().collect_frames()?;

        let mut out = Vec::new();
        {
            let mut encoder = GifEncoder::new_with_speed(&mut out, self.config.gif_speed);
            encoder.set_repeat(Repeat::Infinite)?;
            encoder.encode_frames(frames)?;
        }
        Ok(out)
    }
}
