//! Continuous color scales shared by the preview, PNG and figure renderers.

pub type Rgb = [u8; 3];

/// Gold scale of the point map, cheap to expensive.
pub const PRICE_SCALE: [Rgb; 12] = [
    [0xfa, 0xdc, 0x8f],
    [0xf9, 0xd6, 0x7a],
    [0xf8, 0xd0, 0x66],
    [0xf8, 0xc9, 0x52],
    [0xf7, 0xc3, 0x3d],
    [0xf6, 0xbd, 0x29],
    [0xf5, 0xb6, 0x14],
    [0xf4, 0xb0, 0x00],
    [0xea, 0xa9, 0x00],
    [0xe0, 0xa2, 0x00],
    [0xdc, 0x9e, 0x00],
    [0xff, 0xa0, 0x7a],
];

/// Cyclical "IceFire" scale of the hexbin map.
pub const ICEFIRE_SCALE: [Rgb; 17] = [
    [0x00, 0x00, 0x00],
    [0x00, 0x1f, 0x4d],
    [0x00, 0x37, 0x86],
    [0x0e, 0x58, 0xa8],
    [0x21, 0x7e, 0xb8],
    [0x30, 0xa4, 0xca],
    [0x54, 0xc8, 0xdf],
    [0x9b, 0xe4, 0xef],
    [0xe1, 0xe9, 0xd1],
    [0xf3, 0xd5, 0x73],
    [0xe7, 0xb0, 0x00],
    [0xda, 0x82, 0x00],
    [0xc6, 0x54, 0x00],
    [0xac, 0x23, 0x01],
    [0x82, 0x00, 0x00],
    [0x4c, 0x00, 0x00],
    [0x00, 0x00, 0x00],
];

/// Marker color of the raw transactions drawn over the hexbin map ("deeppink").
pub const OVERLAY_POINT: Rgb = [0xff, 0x14, 0x93];

/// Position of `value` inside `[min, max]`, clamped to `[0, 1]`.
/// A degenerate range maps everything to the middle of the scale.
pub fn normalize(value: f64, min: f64, max: f64) -> f64 {
    if !(max > min) {
        return 0.5;
    }
    ((value - min) / (max - min)).clamp(0.0, 1.0)
}

/// Linear interpolation between evenly spaced stops.
pub fn interpolate(scale: &[Rgb], t: f64) -> Rgb {
    match scale {
        [] => [0, 0, 0],
        [only] => *only,
        _ => {
            let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
            let pos = t * (scale.len() - 1) as f64;
            let lower = (pos.floor() as usize).min(scale.len() - 2);
            let frac = pos - lower as f64;
            let (a, b) = (scale[lower], scale[lower + 1]);
            let mix = |i: usize| (a[i] as f64 + (b[i] as f64 - a[i] as f64) * frac).round() as u8;
            [mix(0), mix(1), mix(2)]
        }
    }
}

pub fn to_hex(rgb: Rgb) -> String {
    format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2])
}

/// Scale in Plotly's `[[position, color], ...]` form.
pub fn plotly_scale(scale: &[Rgb]) -> Vec<(f64, String)> {
    let last = scale.len().saturating_sub(1).max(1) as f64;
    scale
        .iter()
        .enumerate()
        .map(|(i, rgb)| (i as f64 / last, to_hex(*rgb)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolate_hits_stops() {
        assert_eq!(interpolate(&PRICE_SCALE, 0.0), PRICE_SCALE[0]);
        assert_eq!(interpolate(&PRICE_SCALE, 1.0), PRICE_SCALE[11]);
        assert_eq!(interpolate(&[[0, 0, 0], [200, 100, 50]], 0.5), [100, 50, 25]);
        assert_eq!(interpolate(&PRICE_SCALE, 7.0), PRICE_SCALE[11]);
    }

    #[test]
    fn normalize_handles_flat_ranges() {
        assert_eq!(normalize(5.0, 5.0, 5.0), 0.5);
        assert_eq!(normalize(15.0, 10.0, 20.0), 0.5);
        assert_eq!(normalize(30.0, 10.0, 20.0), 1.0);
    }

    #[test]
    fn plotly_scale_spans_unit_interval() {
        let scale = plotly_scale(&PRICE_SCALE);
        assert_eq!(scale.first(), Some(&(0.0, "#fadc8f".to_string())));
        assert_eq!(scale.last(), Some(&(1.0, "#ffa07a".to_string())));
    }
}
