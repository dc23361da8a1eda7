//! Sequential color scale for the choropleth fill
//!
//! Maps metric values linearly onto the ColorBrewer YlGn ramp. Stops are
//! interpolated in Oklab so intermediate colors stay perceptually even.
//! A scale built from no finite values has no domain and colors nothing;
//! the renderer falls back to the missing-data fill.

use palette::{FromColor, IntoColor, LinSrgb, Mix, Oklab, Srgb};

use crate::{HousemapError, Result};

/// ColorBrewer YlGn, 9 classes, light to dark.
pub const YLGN: &[&str] = &[
    "#ffffe5", "#f7fcb9", "#d9f0a3", "#addd8e", "#78c679",
    "#41ab5d", "#238443", "#006837", "#004529",
];

/// A linear value-to-color mapping over a fixed ramp.
#[derive(Debug, Clone)]
pub struct SequentialScale {
    stops: Vec<Oklab<f32>>,
    domain: Option<(f64, f64)>,
}

impl SequentialScale {
    /// Build a YlGn scale whose domain spans the finite values observed.
    /// Non-finite values are ignored; an empty slice yields a domainless
    /// scale.
    pub fn ylgn(values: &[f64]) -> Result<Self> {
        Self::from_stops(YLGN, values)
    }

    /// Build a scale from CSS color stops and observed values.
    pub fn from_stops(colors: &[&str], values: &[f64]) -> Result<Self> {
        if colors.len() < 2 {
            return Err(HousemapError::WriterError(
                "A sequential scale needs at least two color stops".to_string(),
            ));
        }
        let stops = colors
            .iter()
            .map(|c| parse_to_oklab(c))
            .collect::<Result<Vec<_>>>()?;

        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        let domain = if finite.is_empty() {
            None
        } else {
            let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
            let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            Some((min, max))
        };

        Ok(Self { stops, domain })
    }

    /// The observed (min, max), if any finite value was seen.
    pub fn domain(&self) -> Option<(f64, f64)> {
        self.domain
    }

    /// Hex fill color for a value. `None` when the scale has no domain or
    /// the value is not finite. Values outside the domain clamp to the
    /// ramp ends.
    pub fn color_for(&self, value: f64) -> Option<String> {
        let (min, max) = self.domain?;
        if !value.is_finite() {
            return None;
        }
        let t = if (max - min).abs() < f64::EPSILON {
            // Degenerate one-value domain: mid-ramp.
            0.5
        } else {
            ((value - min) / (max - min)).clamp(0.0, 1.0)
        };
        Some(self.sample(t as f32))
    }

    /// Evenly spaced ramp samples, used for the legend's CSS gradient.
    pub fn legend_stops(&self, count: usize) -> Vec<String> {
        if count == 0 {
            return vec![];
        }
        if count == 1 {
            return vec![self.sample(0.0)];
        }
        (0..count)
            .map(|i| self.sample(i as f32 / (count - 1) as f32))
            .collect()
    }

    fn sample(&self, t: f32) -> String {
        let num_segments = self.stops.len() - 1;
        let segment_float = t.clamp(0.0, 1.0) * num_segments as f32;
        let segment = (segment_float.floor() as usize).min(num_segments - 1);
        let segment_t = segment_float - segment as f32;

        let interpolated = self.stops[segment].mix(self.stops[segment + 1], segment_t);
        let lin: LinSrgb<f32> = interpolated.into_color();
        srgb_to_hex(&Srgb::from(lin))
    }
}

fn parse_to_oklab(color: &str) -> Result<Oklab<f32>> {
    let parsed = csscolorparser::parse(color)
        .map_err(|e| HousemapError::WriterError(format!("Invalid color '{}': {}", color, e)))?;
    let srgb = Srgb::new(parsed.r as f32, parsed.g as f32, parsed.b as f32);
    Ok(Oklab::from_color(LinSrgb::from(srgb)))
}

fn srgb_to_hex(color: &Srgb<f32>) -> String {
    let r = (color.red.clamp(0.0, 1.0) * 255.0).round() as u8;
    let g = (color.green.clamp(0.0, 1.0) * 255.0).round() as u8;
    let b = (color.blue.clamp(0.0, 1.0) * 255.0).round() as u8;
    format!("#{:02x}{:02x}{:02x}", r, g, b)
}
