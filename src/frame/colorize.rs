//! False-color mapping of cleaned frames through the band table.

use image::imageops::{self, FilterType};
use image::RgbImage;

use super::CleanedFrame;
use crate::params::{Color, RangeTable};

/// Paint each pixel with the color of the first band containing it;
/// pixels owned by no band stay neutral
pub fn colorize(frame: &CleanedFrame, table: &RangeTable) -> RgbImage {
    RgbImage::from_fn(frame.width() as u32, frame.height() as u32, |x, y| {
        table
            .band_for(frame.value(x as usize, y as usize))
            .map(|band| band.color)
            .unwrap_or(Color::NEUTRAL)
            .to_rgb()
    })
}

/// Enlarged copy of a color grid for on-disk snapshots (nearest neighbor)
pub fn snapshot(colors: &RgbImage, scale: u32) -> RgbImage {
    let scale = scale.max(1);
    imageops::resize(
        colors,
        colors.width() * scale,
        colors.height() * scale,
        FilterType::Nearest,
    )
}

/// Coarse label for a mean temperature (°C)
pub fn heat_range_label(temperature: f32) -> &'static str {
    match temperature {
        t if t < 10.0 => "very cold",
        t if t < 20.0 => "cold",
        t if t < 30.0 => "neutral",
        t if t < 40.0 => "warm",
        t if t < 70.0 => "hot",
        _ => "out of range",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{RangeEntry, Timbre};
    use image::Rgb;

    #[test]
    fn test_colorize_default_table() {
        let frame = CleanedFrame::from_levels(4, 1, vec![5, 25, 35, 90]).unwrap();
        let colors = colorize(&frame, &RangeTable::default());

        assert_eq!(colors.dimensions(), (4, 1));
        assert_eq!(*colors.get_pixel(0, 0), Rgb([0, 0, 255]));
        assert_eq!(*colors.get_pixel(1, 0), Rgb([0, 0, 0]));
        assert_eq!(*colors.get_pixel(2, 0), Rgb([255, 0, 0]));
        // Above every band: neutral background
        assert_eq!(*colors.get_pixel(3, 0), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_colorize_overlap_first_wins() {
        let mut first = RangeEntry::new("first", 0.0, 50.0, Color([0, 255, 0]), 100.0);
        first.timbre = Timbre::Reed;
        let second = RangeEntry::new("second", 40.0, 60.0, Color([255, 255, 0]), 100.0);
        let table = RangeTable::from_entries(vec![first, second]);

        let frame = CleanedFrame::from_levels(2, 1, vec![45, 55]).unwrap();
        let colors = colorize(&frame, &table);
        assert_eq!(*colors.get_pixel(0, 0), Rgb([0, 255, 0]));
        assert_eq!(*colors.get_pixel(1, 0), Rgb([255, 255, 0]));
    }

    #[test]
    fn test_snapshot_scale() {
        let frame = CleanedFrame::from_levels(3, 2, vec![5; 6]).unwrap();
        let colors = colorize(&frame, &RangeTable::default());
        let big = snapshot(&colors, 10);
        assert_eq!(big.dimensions(), (30, 20));
        assert_eq!(*big.get_pixel(29, 19), Rgb([0, 0, 255]));
    }

    #[test]
    fn test_heat_range_label() {
        assert_eq!(heat_range_label(5.0), "very cold");
        assert_eq!(heat_range_label(15.0), "cold");
        assert_eq!(heat_range_label(25.0), "neutral");
        assert_eq!(heat_range_label(35.0), "warm");
        assert_eq!(heat_range_label(50.0), "hot");
        assert_eq!(heat_range_label(70.0), "out of range");
    }
}
