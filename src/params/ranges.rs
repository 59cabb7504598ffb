//! Temperature band table: named intervals with display color and base tone.
//!
//! Bands are matched in definition order and the first band whose closed
//! interval contains a value owns it. Overlapping user tables therefore
//! resolve deterministically toward the earlier entry.

use std::collections::HashSet;
use std::str::FromStr;

use image::Rgb;
use serde::Deserialize;

use crate::error::{Result, ThermalError};

/// Display color of a band (8-bit RGB)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub [u8; 3]);

impl Color {
    /// Background for pixels owned by no band
    pub const NEUTRAL: Color = Color([0, 0, 0]);

    pub fn to_rgb(self) -> Rgb<u8> {
        Rgb(self.0)
    }
}

impl FromStr for Color {
    type Err = ThermalError;

    /// Parse a CSS color name or `#rgb` / `#rrggbb` hex string
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix('#') {
            let invalid = || ThermalError::InvalidConfig(format!("Invalid color '{}'", s));
            let channel = |range: std::ops::Range<usize>| {
                u8::from_str_radix(hex.get(range).ok_or_else(invalid)?, 16).map_err(|_| invalid())
            };
            return match hex.len() {
                6 => Ok(Color([channel(0..2)?, channel(2..4)?, channel(4..6)?])),
                3 => {
                    let expand = |v: u8| v * 17;
                    Ok(Color([
                        expand(channel(0..1)?),
                        expand(channel(1..2)?),
                        expand(channel(2..3)?),
                    ]))
                }
                _ => Err(invalid()),
            };
        }

        palette::named::from_str(&s.to_ascii_lowercase())
            .map(|named| {
                let (r, g, b) = named.into_components();
                Color([r, g, b])
            })
            .ok_or_else(|| ThermalError::InvalidConfig(format!("Unknown color '{}'", s)))
    }
}

/// Timbre class used to voice a band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timbre {
    /// Bright additive tone for hot/warm bands
    Brass,

    /// Soft vibrato sine for cold and other voiced bands
    Reed,
}

impl Timbre {
    /// Timbre implied by a band name when none is configured
    pub fn infer_from_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        if lower.contains("hot") || lower.contains("warm") {
            Timbre::Brass
        } else {
            Timbre::Reed
        }
    }
}

/// One named temperature band
#[derive(Debug, Clone, PartialEq)]
pub struct RangeEntry {
    pub name: String,

    /// Lower bound (°C, inclusive)
    pub low: f32,

    /// Upper bound (°C, inclusive)
    pub high: f32,

    pub color: Color,

    /// Base tone (Hz), 0 = silent
    pub tone_freq_hz: f32,

    pub timbre: Timbre,
}

impl RangeEntry {
    pub fn new(name: &str, low: f32, high: f32, color: Color, tone_freq_hz: f32) -> Self {
        Self {
            name: name.to_string(),
            low,
            high,
            color,
            tone_freq_hz,
            timbre: Timbre::infer_from_name(name),
        }
    }

    /// Closed-interval membership
    pub fn contains(&self, value: f32) -> bool {
        self.low <= value && value <= self.high
    }

    /// A band with zero base frequency produces no sound
    pub fn is_silent(&self) -> bool {
        self.tone_freq_hz == 0.0
    }
}

/// Band definition as written in a configuration file
#[derive(Debug, Clone, Deserialize)]
pub struct RangeSpec {
    pub name: String,
    pub low: f32,
    pub high: f32,
    pub color: String,
    pub freq: u32,
    #[serde(default)]
    pub timbre: Option<Timbre>,
}

impl RangeSpec {
    fn into_entry(self) -> Result<RangeEntry> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ThermalError::InvalidConfig(
                "Range name is required".to_string(),
            ));
        }
        if !(self.low.is_finite() && self.high.is_finite()) {
            return Err(ThermalError::InvalidConfig(format!(
                "Range '{}': bounds must be numbers",
                name
            )));
        }
        if self.low >= self.high {
            return Err(ThermalError::InvalidConfig(format!(
                "Range '{}': high ({}) must be > low ({})",
                name, self.high, self.low
            )));
        }
        let color = self.color.parse::<Color>().map_err(|e| {
            let reason = match e {
                ThermalError::InvalidConfig(reason) => reason,
                other => other.to_string(),
            };
            ThermalError::InvalidConfig(format!("Range '{}': {}", name, reason))
        })?;
        let timbre = self.timbre.unwrap_or_else(|| Timbre::infer_from_name(&name));

        Ok(RangeEntry {
            name,
            low: self.low,
            high: self.high,
            color,
            tone_freq_hz: self.freq as f32,
            timbre,
        })
    }
}

/// Ordered, immutable band table
#[derive(Debug, Clone, PartialEq)]
pub struct RangeTable {
    entries: Vec<RangeEntry>,
}

impl Default for RangeTable {
    /// Built-in table: Cold [0,20] blue 200 Hz, Neutral [21,29] silent, Hot [30,70] red 500 Hz
    fn default() -> Self {
        Self {
            entries: vec![
                RangeEntry::new("Cold", 0.0, 20.0, Color([0, 0, 255]), 200.0),
                RangeEntry::new("Neutral", 21.0, 29.0, Color::NEUTRAL, 0.0),
                RangeEntry::new("Hot", 30.0, 70.0, Color([255, 0, 0]), 500.0),
            ],
        }
    }
}

impl RangeTable {
    /// Build a user-defined table, validating every row
    pub fn custom(specs: Vec<RangeSpec>) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(specs.len());

        for spec in specs {
            let entry = spec.into_entry()?;
            if !seen.insert(entry.name.clone()) {
                return Err(ThermalError::InvalidConfig(format!(
                    "Duplicate range name '{}'",
                    entry.name
                )));
            }
            entries.push(entry);
        }

        Ok(Self { entries })
    }

    /// Build a table from already-validated entries
    pub fn from_entries(entries: Vec<RangeEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[RangeEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First band (in table order) whose interval contains `value`
    pub fn band_for(&self, value: f32) -> Option<&RangeEntry> {
        self.entries.iter().find(|entry| entry.contains(value))
    }
}
