/*!
 * Color conversion from packed RGB to ASS colour notation.
 *
 * ASS stores colours as `&HAABBGGRR`: channels are reversed relative to the
 * usual RGB order and alpha counts transparency (0 opaque, 255 invisible).
 */

use std::fmt;

/// A colour in ASS channel order with its alpha
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssColor {
    pub alpha: u8,
    pub blue: u8,
    pub green: u8,
    pub red: u8,
}

impl AssColor {
    pub const WHITE: AssColor = AssColor::opaque(0xFF, 0xFF, 0xFF);
    pub const BLACK: AssColor = AssColor::opaque(0x00, 0x00, 0x00);
    pub const RED: AssColor = AssColor::opaque(0xFF, 0x00, 0x00);

    pub const fn opaque(red: u8, green: u8, blue: u8) -> Self {
        Self { alpha: 0, blue, green, red }
    }

    pub const fn with_alpha(self, alpha: u8) -> Self {
        Self { alpha, ..self }
    }

    /// The 32-bit `AABBGGRR` word
    pub fn word(&self) -> u32 {
        (u32::from(self.alpha) << 24) | (u32::from(self.blue) << 16) | (u32::from(self.green) << 8) | u32::from(self.red)
    }

    /// Style-table notation, e.g. `&H33FFFFFF`
    pub fn style_value(&self) -> String {
        format!("&H{:08X}", self.word())
    }

    /// Override-tag colour notation without alpha, e.g. `&H4080FF&`
    pub fn tag_value(&self) -> String {
        format!("&H{:02X}{:02X}{:02X}&", self.blue, self.green, self.red)
    }

    /// Override-tag alpha notation, e.g. `&H33&`
    pub fn alpha_value(&self) -> String {
        format!("&H{:02X}&", self.alpha)
    }
}

impl fmt::Display for AssColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.style_value())
    }
}

/// ASS alpha for an opacity in [0, 1]
pub fn alpha_from_opacity(opacity: f64) -> u8 {
    let opacity = if opacity.is_nan() { 1.0 } else { opacity };
    ((1.0 - opacity) * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Convert a packed `0xRRGGBB` colour and an opacity into ASS notation
///
/// Bits above the low 24 are ignored.
pub fn convert_color(color_packed: u32, opacity: f64) -> AssColor {
    let rgb = color_packed & 0x00FF_FFFF;
    AssColor {
        alpha: alpha_from_opacity(opacity),
        blue: (rgb & 0xFF) as u8,
        green: ((rgb >> 8) & 0xFF) as u8,
        red: ((rgb >> 16) & 0xFF) as u8,
    }
}
