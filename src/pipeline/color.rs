//! Color space conversions used by the analysis strategies.
//!
//! All math runs in `f64` so the same input bytes always produce the same
//! signature.

/// D65 reference white in XYZ (Y normalized to 100)
const D65_WHITE: [f64; 3] = [95.047, 100.0, 108.883];

/// CIE linear/cube-root switch point
const LAB_EPSILON: f64 = 0.008856;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsv {
    pub h: f64,
    pub s: f64,
    pub v: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lab {
    pub l: f64,
    pub a: f64,
    pub b: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lch {
    pub l: f64,
    pub c: f64,
    pub h: f64,
}

impl Lab {
    pub fn to_lch(self) -> Lch {
        lab_to_lch(self)
    }
}

impl Lch {
    pub fn to_lab(self) -> Lab {
        lch_to_lab(self)
    }
}

pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> Hsv {
    let r = r as f64 / 255.0;
    let g = g as f64 / 255.0;
    let b = b as f64 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let s = if max == 0.0 { 0.0 } else { delta / max };
    let mut h = 0.0;
    if delta != 0.0 {
        h = if max == r {
            (g - b) / delta + if g < b { 6.0 } else { 0.0 }
        } else if max == g {
            (b - r) / delta + 2.0
        } else {
            (r - g) / delta + 4.0
        };
        h *= 60.0;
    }

    Hsv { h, s, v: max }
}

fn srgb_to_linear(channel: u8) -> f64 {
    let c = channel as f64 / 255.0;
    if c > 0.04045 {
        ((c + 0.055) / 1.055).powf(2.4)
    } else {
        c / 12.92
    }
}

fn lab_f(t: f64) -> f64 {
    if t > LAB_EPSILON {
        t.cbrt()
    } else {
        7.787 * t + 16.0 / 116.0
    }
}

fn lab_f_inverse(t: f64) -> f64 {
    let cubed = t * t * t;
    if cubed > LAB_EPSILON {
        cubed
    } else {
        (t - 16.0 / 116.0) / 7.787
    }
}

pub fn rgb_to_lab(r: u8, g: u8, b: u8) -> Lab {
    let r = srgb_to_linear(r);
    let g = srgb_to_linear(g);
    let b = srgb_to_linear(b);

    // sRGB primaries, D65
    let x = (r * 0.4124 + g * 0.3576 + b * 0.1805) * 100.0;
    let y = (r * 0.2126 + g * 0.7152 + b * 0.0722) * 100.0;
    let z = (r * 0.0193 + g * 0.1192 + b * 0.9505) * 100.0;

    let fx = lab_f(x / D65_WHITE[0]);
    let fy = lab_f(y / D65_WHITE[1]);
    let fz = lab_f(z / D65_WHITE[2]);

    Lab {
        l: 116.0 * fy - 16.0,
        a: 500.0 * (fx - fy),
        b: 200.0 * (fy - fz),
    }
}

pub fn lab_to_lch(lab: Lab) -> Lch {
    let c = (lab.a * lab.a + lab.b * lab.b).sqrt();
    let mut h = lab.b.atan2(lab.a).to_degrees();
    if h < 0.0 {
        h += 360.0;
    }
    if h >= 360.0 {
        h -= 360.0;
    }
    Lch { l: lab.l, c, h }
}

pub fn lch_to_lab(lch: Lch) -> Lab {
    let radians = lch.h.to_radians();
    Lab {
        l: lch.l,
        a: lch.c * radians.cos(),
        b: lch.c * radians.sin(),
    }
}

/// Back-conversion used for diagnostics and swatch rendering.
pub fn lab_to_rgb(lab: Lab) -> [u8; 3] {
    let fy = (lab.l + 16.0) / 116.0;
    let fx = fy + lab.a / 500.0;
    let fz = fy - lab.b / 200.0;

    let x = lab_f_inverse(fx) * D65_WHITE[0] / 100.0;
    let y = lab_f_inverse(fy) * D65_WHITE[1] / 100.0;
    let z = lab_f_inverse(fz) * D65_WHITE[2] / 100.0;

    let r = x * 3.2406 + y * -1.5372 + z * -0.4986;
    let g = x * -0.9689 + y * 1.8758 + z * 0.0415;
    let b = x * 0.0557 + y * -0.2040 + z * 1.0570;

    let encode = |c: f64| {
        let c = if c > 0.0031308 {
            1.055 * c.powf(1.0 / 2.4) - 0.055
        } else {
            12.92 * c
        };
        (c.clamp(0.0, 1.0) * 255.0).round() as u8
    };

    [encode(r), encode(g), encode(b)]
}

pub fn rgb_to_lch(r: u8, g: u8, b: u8) -> Lch {
    lab_to_lch(rgb_to_lab(r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64, tolerance: f64) -> bool {
        (a - b).abs() < tolerance
    }

    #[test]
    fn hsv_of_primaries() {
        let red = rgb_to_hsv(255, 0, 0);
        assert_eq!((red.h, red.s, red.v), (0.0, 1.0, 1.0));

        let green = rgb_to_hsv(0, 255, 0);
        assert!(approx(green.h, 120.0, 1e-9));

        let blue = rgb_to_hsv(0, 0, 255);
        assert!(approx(blue.h, 240.0, 1e-9));

        let magenta = rgb_to_hsv(255, 0, 255);
        assert!(approx(magenta.h, 300.0, 1e-9));
    }

    #[test]
    fn hsv_of_gray_has_zero_hue_and_saturation() {
        let gray = rgb_to_hsv(128, 128, 128);
        assert_eq!(gray.h, 0.0);
        assert_eq!(gray.s, 0.0);
        assert!(approx(gray.v, 128.0 / 255.0, 1e-12));

        let black = rgb_to_hsv(0, 0, 0);
        assert_eq!((black.h, black.s, black.v), (0.0, 0.0, 0.0));
    }

    #[test]
    fn lab_of_white_and_black() {
        let white = rgb_to_lab(255, 255, 255);
        assert!(approx(white.l, 100.0, 0.01));
        assert!(white.a.abs() < 0.05 && white.b.abs() < 0.05);

        let black = rgb_to_lab(0, 0, 0);
        assert!(approx(black.l, 0.0, 1e-9));
    }

    #[test]
    fn lch_of_pure_red() {
        let lch = rgb_to_lch(255, 0, 0);
        assert!(approx(lch.l, 53.23, 0.01));
        assert!(approx(lch.c, 104.58, 0.01));
        assert!(approx(lch.h, 40.0, 0.01));
    }

    #[test]
    fn lch_hue_is_normalized_into_range() {
        // b is negative here, so atan2 lands below zero before normalization
        let lch = rgb_to_lch(255, 0, 160);
        assert!(lch.h >= 0.0 && lch.h < 360.0);
        assert!(approx(lch.h, 351.19, 0.01));
    }

    #[test]
    fn lch_to_lab_inverts_lab_to_lch() {
        let lab = rgb_to_lab(30, 160, 40);
        let back = lab.to_lch().to_lab();
        assert!(approx(lab.l, back.l, 1e-9));
        assert!(approx(lab.a, back.a, 1e-9));
        assert!(approx(lab.b, back.b, 1e-9));
    }

    #[test]
    fn lab_to_rgb_recovers_source_color() {
        for rgb in [[255u8, 0, 0], [12, 200, 99], [128, 128, 128], [0, 0, 255]] {
            let lab = rgb_to_lab(rgb[0], rgb[1], rgb[2]);
            let back = lab_to_rgb(lab);
            for channel in 0..3 {
                assert!((back[channel] as i16 - rgb[channel] as i16).abs() <= 1);
            }
        }
    }

    #[test]
    fn conversions_are_deterministic() {
        assert_eq!(rgb_to_lch(17, 99, 201), rgb_to_lch(17, 99, 201));
    }
}
