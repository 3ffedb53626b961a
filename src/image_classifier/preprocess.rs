use crate::error::{Error, Result};
use image::error::{ParameterError, ParameterErrorKind};
use image::{imageops, DynamicImage, RgbImage};
use serde::Deserialize;
use std::path::Path;
use tract_onnx::prelude::*;

const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResizeMode {
    /// Stretch to the target size, ignoring aspect ratio.
    Exact,
    /// Fit inside the target size and pad the rest with black.
    Letterbox,
    /// Scale so the shorter side equals `shortest_edge`, then cut the center.
    ShortestEdgeCenterCrop { shortest_edge: u32 },
}

/// How images are turned into model input. Shipped next to the model because
/// every exported model expects its own size and normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct Preprocessing {
    pub width: u32,
    pub height: u32,
    pub resize: ResizeMode,
    pub rescale_factor: f32,
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

impl Default for Preprocessing {
    /// Matches the `google/mobilenet_v2_1.0_224` image processor.
    fn default() -> Self {
        Self {
            width: 224,
            height: 224,
            resize: ResizeMode::ShortestEdgeCenterCrop { shortest_edge: 256 },
            rescale_factor: 1.0 / 255.0,
            mean: [0.5; 3],
            std: [0.5; 3],
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SizeSpec {
    HeightWidth { height: u32, width: u32 },
    ShortestEdge { shortest_edge: u32 },
    Square(u32),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChannelSpec {
    One(f32),
    Three([f32; 3]),
}

impl ChannelSpec {
    fn channels(&self) -> [f32; 3] {
        match self {
            ChannelSpec::One(value) => [*value; 3],
            ChannelSpec::Three(values) => *values,
        }
    }
}

fn yes() -> bool {
    true
}

/// Subset of a Hugging Face `preprocessor_config.json`.
#[derive(Debug, Deserialize)]
struct ProcessorConfig {
    #[serde(default = "yes")]
    do_resize: bool,
    size: Option<SizeSpec>,
    #[serde(default)]
    do_center_crop: bool,
    crop_size: Option<SizeSpec>,
    #[serde(default = "yes")]
    do_rescale: bool,
    rescale_factor: Option<f32>,
    #[serde(default = "yes")]
    do_normalize: bool,
    image_mean: Option<ChannelSpec>,
    image_std: Option<ChannelSpec>,
}

impl Preprocessing {
    /// Plain `[0, 1]` scaling with no mean/std shift.
    pub fn unit_scale(width: u32, height: u32, resize: ResizeMode) -> Self {
        Self {
            width,
            height,
            resize,
            rescale_factor: 1.0 / 255.0,
            mean: [0.0; 3],
            std: [1.0; 3],
        }
    }

    /// NCHW shape of the tensor produced by [`normalize_image`].
    pub fn input_shape(&self) -> [usize; 4] {
        [1, 3, self.height as usize, self.width as usize]
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_processor_config_json(&text)
    }

    pub fn from_processor_config_json(text: &str) -> Result<Self> {
        let config: ProcessorConfig =
            serde_json::from_str(text).map_err(|e| Error::Config(e.to_string()))?;

        let crop = match (config.do_center_crop, &config.crop_size) {
            (true, Some(SizeSpec::HeightWidth { height, width })) => Some((*width, *height)),
            (true, Some(SizeSpec::Square(side))) => Some((*side, *side)),
            (true, Some(SizeSpec::ShortestEdge { shortest_edge })) => {
                Some((*shortest_edge, *shortest_edge))
            }
            _ => None,
        };

        let (width, height, resize) = match (&config.size, crop) {
            (Some(SizeSpec::ShortestEdge { shortest_edge }), Some((width, height))) => (
                width,
                height,
                ResizeMode::ShortestEdgeCenterCrop {
                    shortest_edge: *shortest_edge,
                },
            ),
            (Some(SizeSpec::ShortestEdge { shortest_edge }), None) => (
                *shortest_edge,
                *shortest_edge,
                ResizeMode::ShortestEdgeCenterCrop {
                    shortest_edge: *shortest_edge,
                },
            ),
            (_, Some((width, height))) => (width, height, ResizeMode::Exact),
            (Some(SizeSpec::HeightWidth { height, width }), None) => {
                (*width, *height, ResizeMode::Exact)
            }
            (Some(SizeSpec::Square(side)), None) => (*side, *side, ResizeMode::Exact),
            (None, None) => {
                return Err(Error::Config(
                    "preprocessor config names neither size nor crop_size".to_string(),
                ))
            }
        };

        let resize = if config.do_resize {
            resize
        } else {
            ResizeMode::Exact
        };

        let rescale_factor = if config.do_rescale {
            config.rescale_factor.unwrap_or(1.0 / 255.0)
        } else {
            1.0
        };

        let (mean, std) = if config.do_normalize {
            (
                config
                    .image_mean
                    .as_ref()
                    .map_or(IMAGENET_MEAN, ChannelSpec::channels),
                config
                    .image_std
                    .as_ref()
                    .map_or(IMAGENET_STD, ChannelSpec::channels),
            )
        } else {
            ([0.0; 3], [1.0; 3])
        };

        let preprocessing = Self {
            width,
            height,
            resize,
            rescale_factor,
            mean,
            std,
        };
        preprocessing.validate()?;
        Ok(preprocessing)
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::Config(format!(
                "model input size must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if let ResizeMode::ShortestEdgeCenterCrop { shortest_edge: 0 } = self.resize {
            return Err(Error::Config("shortest_edge must be positive".to_string()));
        }
        if self.std.iter().any(|s| *s == 0.0 || !s.is_finite()) {
            return Err(Error::Config(format!("invalid image_std {:?}", self.std)));
        }
        Ok(())
    }
}

pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    let image = image::load_from_memory(bytes)?;
    ensure_not_empty(&image)?;
    Ok(image)
}

fn ensure_not_empty(image: &DynamicImage) -> Result<()> {
    if image.width() == 0 || image.height() == 0 {
        return Err(Error::InvalidImage(image::ImageError::Parameter(
            ParameterError::from_kind(ParameterErrorKind::DimensionMismatch),
        )));
    }
    Ok(())
}

fn letterbox(image: &RgbImage, width: u32, height: u32) -> RgbImage {
    let (w, h) = (image.width() as f32, image.height() as f32);
    let scale = (width as f32 / w).min(height as f32 / h);
    let new_w = ((w * scale).round() as u32).clamp(1, width);
    let new_h = ((h * scale).round() as u32).clamp(1, height);

    let scaled = imageops::resize(image, new_w, new_h, imageops::FilterType::Triangle);

    let mut padded = RgbImage::new(width, height);
    let x_offset = (width - new_w) / 2;
    let y_offset = (height - new_h) / 2;
    imageops::replace(&mut padded, &scaled, x_offset as i64, y_offset as i64);
    padded
}

/// Crops the window that would survive a shortest-edge resize followed by a
/// center crop, then resizes only that window. The full-size intermediate is
/// never built, so extreme aspect ratios stay cheap.
fn shortest_edge_center_crop(
    image: &RgbImage,
    shortest_edge: u32,
    width: u32,
    height: u32,
) -> RgbImage {
    let (w, h) = (image.width(), image.height());
    let source_per_target = w.min(h) as f64 / shortest_edge as f64;
    let crop_w = ((width as f64 * source_per_target).round() as u32).clamp(1, w);
    let crop_h = ((height as f64 * source_per_target).round() as u32).clamp(1, h);

    let x = (w - crop_w) / 2;
    let y = (h - crop_h) / 2;
    let window = imageops::crop_imm(image, x, y, crop_w, crop_h).to_image();
    imageops::resize(&window, width, height, imageops::FilterType::Triangle)
}

/// Resizes to the model's spatial size in RGB. Alpha is dropped and
/// grayscale is replicated across the three channels.
pub fn resize_image(image: &DynamicImage, preprocessing: &Preprocessing) -> RgbImage {
    let (width, height) = (preprocessing.width, preprocessing.height);
    let rgb = image.to_rgb8();

    if rgb.width() == width && rgb.height() == height {
        return rgb;
    }

    match preprocessing.resize {
        ResizeMode::Exact => imageops::resize(&rgb, width, height, imageops::FilterType::Triangle),
        ResizeMode::Letterbox => letterbox(&rgb, width, height),
        ResizeMode::ShortestEdgeCenterCrop { shortest_edge } => {
            shortest_edge_center_crop(&rgb, shortest_edge, width, height)
        }
    }
}

fn image_to_tensor(rgb: &RgbImage, preprocessing: &Preprocessing) -> Tensor {
    let (height, width) = (rgb.height() as usize, rgb.width() as usize);
    tract_ndarray::Array4::from_shape_fn((1, 3, height, width), |(_, c, y, x)| {
        let pixel = rgb.get_pixel(x as u32, y as u32);
        (pixel[c] as f32 * preprocessing.rescale_factor - preprocessing.mean[c])
            / preprocessing.std[c]
    })
    .into_tensor()
}

pub fn normalize_image(image: &DynamicImage, preprocessing: &Preprocessing) -> Result<Tensor> {
    ensure_not_empty(image)?;
    let resized = resize_image(image, preprocessing);
    Ok(image_to_tensor(&resized, preprocessing))
}
