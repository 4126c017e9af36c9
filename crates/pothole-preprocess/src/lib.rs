//! pothole-preprocess – decode + resize + normalise photos for the model.
//!
//! Produces the `(1, 3, H, W)` channel-first f32 tensor in `[0, 1]` that the
//! segmentation model expects.

use image::DynamicImage;
use log::debug;
use ndarray::Array4;
use resize::{new, Pixel, Type};
use rgb::FromSlice;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("could not decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("resize failed: {0}")]
    Resize(#[from] resize::Error),
    #[error("image has no pixels ({0}x{1})")]
    EmptyImage(u32, u32),
}

pub type Result<T> = std::result::Result<T, PreprocessError>;

/// Channel order of the produced tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelOrder {
    Rgb,
    /// What the deployed model was fed: the decoder-native BGR order.
    #[default]
    Bgr,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    pub width: u32,
    pub height: u32,
    pub channel_order: ChannelOrder,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 640,
            channel_order: ChannelOrder::default(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Preprocessor {
    config: PreprocessConfig,
}

impl Preprocessor {
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    /// Output size as `(height, width)`, i.e. the mask canvas size.
    pub fn output_shape(&self) -> (usize, usize) {
        (self.config.height as usize, self.config.width as usize)
    }

    /// Decode an encoded image (JPEG, PNG, ...) and convert it.
    pub fn run_bytes(&self, bytes: &[u8]) -> Result<Array4<f32>> {
        let img = image::load_from_memory(bytes)?;
        self.run(&img)
    }

    /// Resize an already-decoded image and pack it as `(1, 3, H, W)`.
    pub fn run(&self, img: &DynamicImage) -> Result<Array4<f32>> {
        let rgb = img.to_rgb8();
        let (w, h) = rgb.dimensions();
        if w == 0 || h == 0 {
            return Err(PreprocessError::EmptyImage(w, h));
        }
        let (dst_w, dst_h) = (self.config.width as usize, self.config.height as usize);
        debug!("preprocess {w}x{h} → {dst_w}x{dst_h}");

        // 1. Resize with a triangle (bilinear) filter
        let mut dst = vec![0u8; dst_w * dst_h * 3];
        let mut resizer = new(w as usize, h as usize, dst_w, dst_h, Pixel::RGB8, Type::Triangle)?;
        resizer.resize(rgb.as_raw().as_rgb(), dst.as_rgb_mut())?;

        // 2. Normalise to 0‑1 and scatter HWC → NCHW
        let channels: [usize; 3] = match self.config.channel_order {
            ChannelOrder::Rgb => [0, 1, 2],
            ChannelOrder::Bgr => [2, 1, 0],
        };
        let tensor = Array4::from_shape_fn((1, 3, dst_h, dst_w), |(_, c, y, x)| {
            dst[(y * dst_w + x) * 3 + channels[c]] as f32 / 255.0
        });
        Ok(tensor)
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(PreprocessConfig::default())
    }
}
