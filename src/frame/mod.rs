//! Thermal frame types, artifact cleaning and false-color mapping.

mod cleaner;
mod colorize;

use std::path::PathBuf;

use image::{DynamicImage, GrayImage};

use crate::error::{Result, ThermalError};

pub use cleaner::{FrameCleaner, ThermalImage};
pub use colorize::{colorize, heat_range_label, snapshot};

/// Sensor frame of temperatures (°C), row-major
#[derive(Debug, Clone, PartialEq)]
pub struct RawFrame {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl RawFrame {
    /// Create a frame from row-major samples
    pub fn new(width: usize, height: usize, data: Vec<f32>) -> Result<Self> {
        if width == 0 || height == 0 || data.len() != width * height {
            return Err(ThermalError::InvalidSource(format!(
                "expected {}x{} = {} samples, got {}",
                width,
                height,
                width * height,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Frame with every sample at `value`
    pub fn filled(width: usize, height: usize, value: f32) -> Result<Self> {
        Self::new(width, height, vec![value; width * height])
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    pub fn set(&mut self, x: usize, y: usize, value: f32) {
        self.data[y * self.width + x] = value;
    }

    /// Mean temperature over all samples (°C)
    pub fn mean_temperature(&self) -> f32 {
        self.data.iter().sum::<f32>() / self.data.len() as f32
    }
}

/// Anything the cleaner can acquire a frame from
#[derive(Debug, Clone)]
pub enum FrameInput {
    /// Temperature grid from a sensor
    Grid(RawFrame),

    /// Already-decoded image (intensity treated as temperature-like level)
    Image(DynamicImage),

    /// Image file on disk
    Path(PathBuf),
}

impl FrameInput {
    /// Mean sensor temperature, when the input carries real temperatures
    pub fn mean_temperature(&self) -> Option<f32> {
        match self {
            FrameInput::Grid(frame) => Some(frame.mean_temperature()),
            _ => None,
        }
    }
}

impl From<RawFrame> for FrameInput {
    fn from(frame: RawFrame) -> Self {
        FrameInput::Grid(frame)
    }
}

/// 8-bit cleaned frame at the working resolution
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedFrame {
    image: GrayImage,
}

impl CleanedFrame {
    pub fn new(image: GrayImage) -> Self {
        Self { image }
    }

    /// Build from row-major 8-bit levels
    pub fn from_levels(width: u32, height: u32, levels: Vec<u8>) -> Result<Self> {
        GrayImage::from_raw(width, height, levels)
            .map(Self::new)
            .ok_or_else(|| {
                ThermalError::InvalidSource(format!("level buffer does not fit {}x{}", width, height))
            })
    }

    pub fn width(&self) -> usize {
        self.image.width() as usize
    }

    pub fn height(&self) -> usize {
        self.image.height() as usize
    }

    /// Level at a pixel, read as a temperature (°C)
    pub fn value(&self, x: usize, y: usize) -> f32 {
        self.image.get_pixel(x as u32, y as u32)[0] as f32
    }

    /// Values of one column, top to bottom
    pub fn column(&self, x: usize) -> impl Iterator<Item = f32> + '_ {
        (0..self.height()).map(move |y| self.value(x, y))
    }

    /// Mean level over all pixels
    pub fn mean_level(&self) -> f32 {
        let sum: u64 = self.image.as_raw().iter().map(|&v| v as u64).sum();
        sum as f32 / self.image.as_raw().len().max(1) as f32
    }

    pub fn as_image(&self) -> &GrayImage {
        &self.image
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_frame_shape_checked() {
        assert!(RawFrame::new(2, 2, vec![0.0; 4]).is_ok());
        assert!(matches!(
            RawFrame::new(2, 2, vec![0.0; 3]),
            Err(ThermalError::InvalidSource(_))
        ));
        assert!(RawFrame::new(0, 2, vec![]).is_err());
    }

    #[test]
    fn test_filled_rejects_empty_shape() {
        assert!(matches!(
            RawFrame::filled(0, 4, 1.0),
            Err(ThermalError::InvalidSource(_))
        ));
        assert!(RawFrame::filled(4, 0, 1.0).is_err());
        assert_eq!(RawFrame::filled(3, 2, 1.5).unwrap().data(), &[1.5; 6]);
    }

    #[test]
    fn test_raw_frame_mean() {
        let mut frame = RawFrame::filled(4, 2, 20.0).unwrap();
        frame.set(0, 0, 28.0);
        assert!((frame.mean_temperature() - 21.0).abs() < 1e-6);
        assert_eq!(frame.get(0, 0), 28.0);
    }

    #[test]
    fn test_cleaned_frame_column() {
        let frame = CleanedFrame::from_levels(2, 3, vec![1, 2, 3, 4, 5, 6]).unwrap();
        let column: Vec<f32> = frame.column(1).collect();
        assert_eq!(column, vec![2.0, 4.0, 6.0]);
        assert!((frame.mean_level() - 3.5).abs() < 1e-6);
    }
}
