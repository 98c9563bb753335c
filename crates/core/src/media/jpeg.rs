use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageFormat};

use super::BlockCodec;
use crate::config::DEFAULT_JPEG_QUALITY;
use crate::error::{Result, StreamError};
use crate::frame::Frame;

/// JPEG block codec backed by the `image` crate.
///
/// Supports 3-channel RGB and 1-channel grayscale blocks. JPEG is lossy:
/// a decoded block equals the original only approximately, which is
/// acceptable for live video and keeps datagram counts low.
#[derive(Debug, Clone, Copy)]
pub struct JpegCodec {
    quality: u8,
}

impl JpegCodec {
    /// Create a codec with an explicit quality (1–100, clamped).
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }
}

impl Default for JpegCodec {
    fn default() -> Self {
        Self::new(DEFAULT_JPEG_QUALITY)
    }
}

impl BlockCodec for JpegCodec {
    fn encode(&self, block: &Frame) -> Result<Vec<u8>> {
        let (h, w, c) = block.shape();
        let color = match c {
            1 => ExtendedColorType::L8,
            3 => ExtendedColorType::Rgb8,
            n => return Err(StreamError::UnsupportedChannels(n)),
        };
        let mut out = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut out, self.quality);
        encoder.encode(block.data(), w as u32, h as u32, color)?;
        Ok(out)
    }

    fn decode(&self, bytes: &[u8], channels: usize) -> Result<Frame> {
        let img = image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)?;
        match channels {
            1 => {
                let gray = img.to_luma8();
                let (w, h) = gray.dimensions();
                Frame::new(gray.into_raw(), (h as usize, w as usize, 1))
            }
            3 => {
                let rgb = img.to_rgb8();
                let (w, h) = rgb.dimensions();
                Frame::new(rgb.into_raw(), (h as usize, w as usize, 3))
            }
            n => Err(StreamError::UnsupportedChannels(n)),
        }
    }

    fn name(&self) -> &'static str {
        "JPEG"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mean_abs_diff(a: &Frame, b: &Frame) -> f64 {
        let total: u64 = a
            .data()
            .iter()
            .zip(b.data())
            .map(|(&x, &y)| u64::from(x.abs_diff(y)))
            .sum();
        total as f64 / a.data().len() as f64
    }

    fn gradient(shape: (usize, usize, usize)) -> Frame {
        let (h, w, c) = shape;
        let data = (0..h * w * c)
            .map(|i| {
                let pixel = i / c;
                (((pixel / w) + (pixel % w)) % 256) as u8
            })
            .collect();
        Frame::new(data, shape).unwrap()
    }

    #[test]
    fn zero_block_round_trips() {
        let codec = JpegCodec::default();
        let block = Frame::zeros((48, 64, 3));
        let bytes = codec.encode(&block).expect("encode zero block");
        assert!(!bytes.is_empty());
        let decoded = codec.decode(&bytes, 3).expect("decode zero block");
        assert_eq!(decoded.shape(), block.shape());
        // black compresses losslessly in practice
        assert!(mean_abs_diff(&block, &decoded) < 1.0);
    }

    #[test]
    fn gradient_within_lossy_tolerance() {
        let codec = JpegCodec::new(85);
        let block = gradient((48, 64, 3));
        let bytes = codec.encode(&block).unwrap();
        let decoded = codec.decode(&bytes, 3).unwrap();
        assert_eq!(decoded.shape(), block.shape());
        assert!(
            mean_abs_diff(&block, &decoded) < 8.0,
            "JPEG error too large for a smooth gradient"
        );
    }

    #[test]
    fn grayscale_round_trip() {
        let codec = JpegCodec::default();
        let block = gradient((32, 32, 1));
        let bytes = codec.encode(&block).unwrap();
        let decoded = codec.decode(&bytes, 1).unwrap();
        assert_eq!(decoded.shape(), (32, 32, 1));
    }

    #[test]
    fn garbage_input_is_a_decode_error() {
        let codec = JpegCodec::default();
        let err = codec.decode(&[0xAB; 64], 3).unwrap_err();
        assert!(matches!(err, StreamError::Decode(_)));
    }

    #[test]
    fn truncated_jpeg_is_a_decode_error() {
        let codec = JpegCodec::default();
        let bytes = codec.encode(&gradient((16, 16, 3))).unwrap();
        assert!(codec.decode(&bytes[..bytes.len() / 2], 3).is_err());
    }

    #[test]
    fn unsupported_channels_rejected() {
        let codec = JpegCodec::default();
        let block = Frame::zeros((8, 8, 3));
        let bytes = codec.encode(&block).unwrap();
        assert!(matches!(
            codec.decode(&bytes, 4),
            Err(StreamError::UnsupportedChannels(4))
        ));
    }

    #[test]
    fn quality_is_clamped() {
        assert_eq!(JpegCodec::new(0).quality(), 1);
        assert_eq!(JpegCodec::new(200).quality(), 100);
    }
}
