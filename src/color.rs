//! Color primitives: RGB storage, CIE Lab conversion, distance metrics.
//!
//! Internal storage is RGB in program order; the (B, G, R) byte order used
//! by some of the on-disk formats is applied only at the serialization
//! boundary (see `serialize::to_bgr_bytes`).

/// An 8-bit RGB color, components in `r, g, b` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }

    /// Sum of the three channels, used for palette light/dark ordering.
    pub fn component_sum(&self) -> u32 {
        self.r as u32 + self.g as u32 + self.b as u32
    }

    pub fn to_bgr_bytes(&self) -> [u8; 3] {
        [self.b, self.g, self.r]
    }

    /// Squared Euclidean distance in RGB space (avoids a sqrt for sorting).
    pub fn distance_sq(&self, other: &Rgb) -> u32 {
        let dr = self.r as i32 - other.r as i32;
        let dg = self.g as i32 - other.g as i32;
        let db = self.b as i32 - other.b as i32;
        (dr * dr + dg * dg + db * db) as u32
    }

    /// Euclidean distance in RGB space, in linear byte units.
    pub fn distance(&self, other: &Rgb) -> f32 {
        (self.distance_sq(other) as f32).sqrt()
    }
}

/// A CIE Lab color, byte-packed: L in [0,100] scaled to a byte, a/b in
/// [-128,127] offset by 128.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Lab {
    pub l: u8,
    pub a: u8,
    pub b: u8,
}

impl Lab {
    pub fn distance(&self, other: &Lab) -> f32 {
        let dl = self.l as i32 - other.l as i32;
        let da = self.a as i32 - other.a as i32;
        let db = self.b as i32 - other.b as i32;
        ((dl * dl + da * da + db * db) as f32).sqrt()
    }
}

// D65 reference white and the standard sRGB <-> XYZ matrices.
const XN: f32 = 95.0489;
const YN: f32 = 100.0;
const ZN: f32 = 108.8840;

fn linearize(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn delinearize(c: f32) -> f32 {
    if c <= 0.0031308 {
        12.92 * c
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

fn f_fwd(t: f32) -> f32 {
    if t > 0.008856 {
        t.cbrt()
    } else {
        7.787 * t + 16.0 / 116.0
    }
}

fn f_inv(t: f32) -> f32 {
    let t3 = t * t * t;
    if t3 > 0.008856 {
        t3
    } else {
        (t - 16.0 / 116.0) / 7.787
    }
}

fn round_clamp(v: f32) -> u8 {
    (v + 0.5).floor().clamp(0.0, 255.0) as u8
}

/// Converts a single sRGB color to the byte-packed Lab representation.
pub fn to_lab(rgb: Rgb) -> Lab {
    let r = linearize(rgb.r as f32 / 255.0);
    let g = linearize(rgb.g as f32 / 255.0);
    let b = linearize(rgb.b as f32 / 255.0);

    let x = 0.4124564 * r + 0.3575761 * g + 0.1804375 * b;
    let y = 0.2126729 * r + 0.7151522 * g + 0.0721750 * b;
    let z = 0.0193339 * r + 0.1191920 * g + 0.9503041 * b;

    let fx = f_fwd(x * 100.0 / XN);
    let fy = f_fwd(y * 100.0 / YN);
    let fz = f_fwd(z * 100.0 / ZN);

    let l = 116.0 * fy - 16.0;
    let a = 500.0 * (fx - fy);
    let bb = 200.0 * (fy - fz);

    Lab {
        l: round_clamp(l * 2.55),
        a: round_clamp(a + 128.0),
        b: round_clamp(bb + 128.0),
    }
}

/// Converts a byte-packed Lab color back to sRGB, clamping out-of-gamut
/// results to [0,255].
pub fn from_lab(lab: Lab) -> Rgb {
    let l = lab.l as f32 / 2.55;
    let a = lab.a as f32 - 128.0;
    let b = lab.b as f32 - 128.0;

    let fy = (l + 16.0) / 116.0;
    let fx = fy + a / 500.0;
    let fz = fy - b / 200.0;

    let x = XN * f_inv(fx) / 100.0;
    let y = YN * f_inv(fy) / 100.0;
    let z = ZN * f_inv(fz) / 100.0;

    let r = 3.2404542 * x - 1.5371385 * y - 0.4985314 * z;
    let g = -0.9692660 * x + 1.8760108 * y + 0.0415560 * z;
    let bl = 0.0556434 * x - 0.2040259 * y + 1.0572252 * z;

    Rgb {
        r: round_clamp(delinearize(r) * 255.0),
        g: round_clamp(delinearize(g) * 255.0),
        b: round_clamp(delinearize(bl) * 255.0),
    }
}

/// Converts a whole image into its Lab representation in one pass.
pub fn to_lab_image(image: &crate::mat::Mat<Rgb>) -> crate::mat::Mat<Lab> {
    crate::mat::Mat::from_vec(
        image.width(),
        image.height(),
        image.data().iter().map(|&p| to_lab(p)).collect(),
    )
}

/// Converts a Lab palette back to RGB.
pub fn lab_palette_to_rgb(palette: &[Lab]) -> Vec<Rgb> {
    palette.iter().map(|&c| from_lab(c)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn black_and_white_roundtrip() {
        let black = to_lab(Rgb::new(0, 0, 0));
        assert_eq!(black.l, 0);
        let white = to_lab(Rgb::new(255, 255, 255));
        assert_eq!(white.l, 255);
    }

    #[test]
    fn lab_roundtrip_is_close() {
        let orig = Rgb::new(120, 60, 200);
        let lab = to_lab(orig);
        let back = from_lab(lab);
        assert!(orig.distance(&back) < 4.0);
    }

    #[test]
    fn component_sum_orders_lightest_first() {
        let dark = Rgb::new(0, 0, 0);
        let light = Rgb::new(255, 255, 255);
        assert!(light.component_sum() > dark.component_sum());
    }
}
