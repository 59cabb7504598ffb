//! Frame acquisition and artifact removal.
//!
//! Reflections and hot glints show up as pixels far above any plausible scene
//! temperature. They are masked, the mask is grown by one pixel so partial
//! edges are caught, and the hole is repainted from the surrounding pixels,
//! nearest ring first.

use std::collections::VecDeque;

use image::imageops::{self, FilterType};
use image::{GrayImage, ImageBuffer, Luma};

use super::{CleanedFrame, FrameInput};
use crate::error::{Result, ThermalError};
use crate::params::CleaningConfig;

/// Single-channel float image in temperature-like units (0..=255 nominal)
pub type ThermalImage = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Largest level representable in a cleaned frame
const LEVEL_MAX: f32 = 255.0;

/// Resizes frames to the working resolution and removes non-thermal artifacts
#[derive(Debug, Clone, Default)]
pub struct FrameCleaner {
    config: CleaningConfig,
}

impl FrameCleaner {
    pub fn new(config: CleaningConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CleaningConfig {
        &self.config
    }

    /// Acquire and clean in one step
    pub fn clean(&self, input: &FrameInput) -> Result<CleanedFrame> {
        let acquired = self.acquire(input)?;
        Ok(self.remove_artifacts(&acquired))
    }

    /// Decode the input and resample it to the working resolution
    pub fn acquire(&self, input: &FrameInput) -> Result<ThermalImage> {
        let (width, height) = (self.config.width, self.config.height);

        match input {
            FrameInput::Grid(frame) => {
                let levels = frame.data().to_vec();
                let grid = ThermalImage::from_raw(frame.width() as u32, frame.height() as u32, levels)
                    .ok_or_else(|| {
                        ThermalError::InvalidSource("grid does not match its dimensions".to_string())
                    })?;
                Ok(resample(&grid, width, height))
            }
            FrameInput::Image(image) => Ok(resample_unit(&image.to_luma32f(), width, height)),
            FrameInput::Path(path) => {
                let image = image::open(path).map_err(|e| {
                    ThermalError::InvalidSource(format!("{}: {}", path.display(), e))
                })?;
                Ok(resample_unit(&image.to_luma32f(), width, height))
            }
        }
    }

    /// Quantize to 8 bits, mask bright artifacts, dilate the mask once and
    /// repaint the masked pixels from their neighborhood
    pub fn remove_artifacts(&self, frame: &ThermalImage) -> CleanedFrame {
        let mut levels = GrayImage::from_fn(frame.width(), frame.height(), |x, y| {
            Luma([quantize(frame.get_pixel(x, y)[0])])
        });

        let threshold = self.config.artifact_threshold;
        let mask: Vec<bool> = levels.as_raw().iter().map(|&v| v > threshold).collect();

        if mask.iter().any(|&m| m) {
            let (w, h) = (levels.width() as usize, levels.height() as usize);
            let mask = dilate(&mask, w, h);
            inpaint(&mut levels, &mask, self.config.inpaint_radius);
        }

        if self.config.mirror_horizontal {
            imageops::flip_horizontal_in_place(&mut levels);
        }

        CleanedFrame::new(levels)
    }
}

/// Clamp to the 8-bit range and round to the nearest level
fn quantize(value: f32) -> u8 {
    value.clamp(0.0, LEVEL_MAX).round() as u8
}

/// Resample a temperature-scale grid. Values are carried through the image
/// filters in unit range, so anything outside 0..=255 is clipped first.
fn resample(grid: &ThermalImage, width: u32, height: u32) -> ThermalImage {
    if grid.dimensions() == (width, height) {
        return grid.clone();
    }
    let unit = ThermalImage::from_fn(grid.width(), grid.height(), |x, y| {
        Luma([grid.get_pixel(x, y)[0].clamp(0.0, LEVEL_MAX) / LEVEL_MAX])
    });
    resample_unit(&unit, width, height)
}

/// Resample a unit-range image and scale it back to 0..=255
fn resample_unit(unit: &ThermalImage, width: u32, height: u32) -> ThermalImage {
    let resized = if unit.dimensions() == (width, height) {
        unit.clone()
    } else {
        imageops::resize(unit, width, height, FilterType::Triangle)
    };
    ThermalImage::from_fn(width, height, |x, y| {
        Luma([resized.get_pixel(x, y)[0] * LEVEL_MAX])
    })
}

/// One dilation pass with a 3x3 structuring element
fn dilate(mask: &[bool], width: usize, height: usize) -> Vec<bool> {
    let mut grown = vec![false; mask.len()];
    for y in 0..height {
        for x in 0..width {
            let y0 = y.saturating_sub(1);
            let y1 = (y + 1).min(height - 1);
            let x0 = x.saturating_sub(1);
            let x1 = (x + 1).min(width - 1);
            grown[y * width + x] =
                (y0..=y1).any(|ny| (x0..=x1).any(|nx| mask[ny * width + nx]));
        }
    }
    grown
}

/// Repaint masked pixels from known pixels within `radius`.
///
/// Pixels are filled in order of their distance to the unmasked region, so
/// each one only draws from pixels that are original or already repainted.
/// Weights follow Telea's scheme: inverse squared distance, agreement of the
/// distance field (level term) and alignment with the fill direction.
fn inpaint(image: &mut GrayImage, mask: &[bool], radius: usize) {
    let (w, h) = (image.width() as usize, image.height() as usize);
    let radius = radius.max(1) as isize;

    // Chessboard distance to the nearest known pixel, and the fill order
    let mut distance = vec![u32::MAX; w * h];
    let mut queue = VecDeque::new();
    for (idx, &masked) in mask.iter().enumerate() {
        if !masked {
            distance[idx] = 0;
            queue.push_back(idx);
        }
    }
    if queue.is_empty() {
        // Nothing to draw from
        return;
    }

    let mut order = Vec::new();
    while let Some(idx) = queue.pop_front() {
        if mask[idx] {
            order.push(idx);
        }
        let (x, y) = ((idx % w) as isize, (idx / w) as isize);
        for (nx, ny) in neighbors8(x, y, w, h) {
            let nidx = ny * w + nx;
            if distance[nidx] == u32::MAX {
                distance[nidx] = distance[idx] + 1;
                queue.push_back(nidx);
            }
        }
    }

    let mut values: Vec<f32> = image.as_raw().iter().map(|&v| v as f32).collect();
    let mut known: Vec<bool> = mask.iter().map(|&m| !m).collect();
    let t = |x: isize, y: isize| distance[y as usize * w + x as usize] as f32;

    for idx in order {
        let (px, py) = ((idx % w) as isize, (idx / w) as isize);

        // Fill direction: gradient of the distance field
        let gx = t((px + 1).min(w as isize - 1), py) - t((px - 1).max(0), py);
        let gy = t(px, (py + 1).min(h as isize - 1)) - t(px, (py - 1).max(0));
        let gnorm = (gx * gx + gy * gy).sqrt();

        let mut weight_sum = 0.0f32;
        let mut value_sum = 0.0f32;

        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let (qx, qy) = (px + dx, py + dy);
                if (dx == 0 && dy == 0)
                    || qx < 0
                    || qy < 0
                    || qx >= w as isize
                    || qy >= h as isize
                {
                    continue;
                }
                let d2 = (dx * dx + dy * dy) as f32;
                if d2 > (radius * radius) as f32 {
                    continue;
                }
                let qidx = qy as usize * w + qx as usize;
                if !known[qidx] {
                    continue;
                }

                // Vector from neighbor to target
                let (rx, ry) = (-dx as f32, -dy as f32);
                let dist = d2.sqrt();
                let dir = if gnorm > 0.0 {
                    ((rx * gx + ry * gy) / (dist * gnorm)).abs().max(1e-6)
                } else {
                    1.0
                };
                let dst = 1.0 / d2;
                let lev = 1.0 / (1.0 + (t(px, py) - t(qx, qy)).abs());

                let weight = dir * dst * lev;
                weight_sum += weight;
                value_sum += weight * values[qidx];
            }
        }

        if weight_sum > 0.0 {
            values[idx] = value_sum / weight_sum;
        }
        known[idx] = true;
    }

    for (dst, value) in image.iter_mut().zip(values) {
        *dst = quantize(value);
    }
}

/// In-bounds 8-connected neighbors
fn neighbors8(x: isize, y: isize, w: usize, h: usize) -> impl Iterator<Item = (usize, usize)> {
    (-1..=1isize)
        .flat_map(|dy| (-1..=1isize).map(move |dx| (dx, dy)))
        .filter(|&(dx, dy)| dx != 0 || dy != 0)
        .map(move |(dx, dy)| (x + dx, y + dy))
        .filter(move |&(nx, ny)| nx >= 0 && ny >= 0 && (nx as usize) < w && (ny as usize) < h)
        .map(|(nx, ny)| (nx as usize, ny as usize))
}
