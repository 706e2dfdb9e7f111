//! RGB to CMYK conversion tuned to the print house's reference proofs
//!
//! This is not a colorimetric conversion. The K curve and the green band
//! were fitted against printed proofs, so the thresholds and multipliers
//! below must stay exactly as they are.

use super::{Cmyk, Rgb};
use crate::types::Result;

/// Above this K the shadows are boosted
const K_SHADOW_THRESHOLD: f64 = 0.5;
/// Above this K (and up to the shadow threshold) K is reduced
const K_MIDTONE_THRESHOLD: f64 = 0.2;

const K_SHADOW_GAIN: f64 = 1.1;
const K_MIDTONE_GAIN: f64 = 0.8;
const K_HIGHLIGHT_GAIN: f64 = 0.3;
const K_MAX: f64 = 0.95;

const GREEN_CYAN_GAIN: f64 = 1.15;
const GREEN_MAGENTA_OFFSET: f64 = 0.20;
const GREEN_YELLOW_GAIN: f64 = 1.02;
const YELLOW_GREEN_RATIO: f64 = 1.3;
const YELLOW_GREEN_MAX_BLUE: f64 = 0.2;
const YELLOW_GREEN_MAGENTA_GAIN: f64 = 0.5;
const YELLOW_GREEN_YELLOW_GAIN: f64 = 1.1;

/// Convert an RGB color to integer-percent CMYK.
pub fn rgb_to_cmyk(rgb: Rgb) -> Cmyk {
    match (rgb.r, rgb.g, rgb.b) {
        (0, 0, 0) => return Cmyk::new(0, 0, 0, 100),
        (255, 255, 255) => return Cmyk::new(0, 0, 0, 0),
        _ => {}
    }

    let r = rgb.r as f64 / 255.0;
    let g = rgb.g as f64 / 255.0;
    let b = rgb.b as f64 / 255.0;

    let mut c = 1.0 - r;
    let mut m = 1.0 - g;
    let mut y = 1.0 - b;

    let mut k = c.min(m).min(y);
    k *= if k > K_SHADOW_THRESHOLD {
        K_SHADOW_GAIN
    } else if k > K_MIDTONE_THRESHOLD {
        K_MIDTONE_GAIN
    } else {
        K_HIGHLIGHT_GAIN
    };
    k = k.min(K_MAX);

    // Under-color removal
    if k > 0.0 {
        c = (c - k) / (1.0 - k);
        m = (m - k) / (1.0 - k);
        y = (y - k) / (1.0 - k);
    }

    if g > r && g > b {
        c *= GREEN_CYAN_GAIN;
        m += GREEN_MAGENTA_OFFSET;
        y *= GREEN_YELLOW_GAIN;

        // r == 0 makes the ratio infinite
        let green_over_red = if r > 0.0 { g / r } else { f64::INFINITY };
        if green_over_red > YELLOW_GREEN_RATIO && b < YELLOW_GREEN_MAX_BLUE {
            m *= YELLOW_GREEN_MAGENTA_GAIN;
            y = (y * YELLOW_GREEN_YELLOW_GAIN).min(1.0);
        }
    }

    Cmyk::new(percent(c), percent(m), percent(y), percent(k))
}

/// Parse a hex color and convert it.
pub fn hex_to_cmyk(hex: &str) -> Result<Cmyk> {
    Ok(rgb_to_cmyk(Rgb::from_hex(hex)?))
}

fn percent(value: f64) -> u8 {
    (value.clamp(0.0, 1.0) * 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert(r: u8, g: u8, b: u8) -> Cmyk {
        rgb_to_cmyk(Rgb::new(r, g, b))
    }

    #[test]
    fn test_black_and_white_short_circuit() {
        assert_eq!(convert(0, 0, 0), Cmyk::new(0, 0, 0, 100));
        assert_eq!(convert(255, 255, 255), Cmyk::new(0, 0, 0, 0));
    }

    #[test]
    fn test_mid_gray_uses_midtone_band() {
        // k = 0.498 falls in the 0.2..0.5 band: 0.498 * 0.8 = 0.398
        assert_eq!(convert(128, 128, 128), Cmyk::new(17, 17, 17, 40));
    }

    #[test]
    fn test_light_gray_bands() {
        // k = 0.216 sits just above the highlight band
        assert_eq!(convert(200, 200, 200), Cmyk::new(5, 5, 5, 17));
        // k = 0.098 is suppressed to 0.029
        assert_eq!(convert(230, 230, 230), Cmyk::new(7, 7, 7, 3));
    }

    #[test]
    fn test_near_black_clamps_k() {
        assert_eq!(convert(30, 30, 30), Cmyk::new(0, 0, 0, 95));
        assert_eq!(convert(10, 10, 10), Cmyk::new(22, 22, 22, 95));
    }

    #[test]
    fn test_pure_red_has_no_k() {
        assert_eq!(convert(255, 0, 0), Cmyk::new(0, 100, 100, 0));
    }

    #[test]
    fn test_green_band() {
        assert_eq!(convert(0, 255, 0), Cmyk::new(100, 10, 100, 0));
        assert_eq!(convert(34, 139, 34), Cmyk::new(91, 17, 89, 36));
        // Green dominant but too much blue for the yellow-green band
        assert_eq!(convert(100, 200, 150), Cmyk::new(60, 25, 29, 17));
    }

    #[test]
    fn test_blue_outside_green_band() {
        assert_eq!(convert(0, 71, 171), Cmyk::new(100, 62, 9, 26));
    }

    #[test]
    fn test_hex_to_cmyk() {
        assert_eq!(hex_to_cmyk("#808080").unwrap(), Cmyk::new(17, 17, 17, 40));
        assert!(hex_to_cmyk("#zzzzzz").is_err());
    }
}
