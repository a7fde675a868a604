use serde::Serialize;

/// Terminal color representation supporting 16-color, 256-color, and truecolor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Color {
    #[default]
    Default,
    Indexed(u8),
    Rgb(u8, u8, u8),
}

impl Color {
    /// SGR parameter fragment used after a 38 (fg) or 48 (bg) introducer:
    /// `""` for default, `"5;N"` for indexed, `"2;R;G;B"` for RGB.
    pub fn sgr_params(&self) -> String {
        match *self {
            Color::Default => String::new(),
            Color::Indexed(n) => format!("5;{}", n),
            Color::Rgb(r, g, b) => format!("2;{};{};{}", r, g, b),
        }
    }

    /// X11-style `rgb:RRRR/GGGG/BBBB` form used in OSC color replies.
    /// 8-bit channels are widened to 16 bits by replication.
    pub fn to_x11_rgb(self, fallback: (u8, u8, u8)) -> String {
        let (r, g, b) = match self {
            Color::Default => fallback,
            Color::Indexed(n) => indexed_to_rgb(n),
            Color::Rgb(r, g, b) => (r, g, b),
        };
        format!(
            "rgb:{:04x}/{:04x}/{:04x}",
            r as u16 * 0x0101,
            g as u16 * 0x0101,
            b as u16 * 0x0101
        )
    }

    /// Parse an OSC color specification: `rgb:RR/GG/BB` (1-4 hex digits per
    /// channel) or `#RRGGBB`. Unrecognized forms yield None.
    pub fn parse_spec(spec: &str) -> Option<Color> {
        if let Some(rest) = spec.strip_prefix("rgb:") {
            let mut channels = rest.split('/');
            let r = parse_x11_channel(channels.next()?)?;
            let g = parse_x11_channel(channels.next()?)?;
            let b = parse_x11_channel(channels.next()?)?;
            if channels.next().is_some() {
                return None;
            }
            return Some(Color::Rgb(r, g, b));
        }
        if let Some(hex) = spec.strip_prefix('#') {
            if hex.len() == 6 {
                let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
                let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
                let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
                return Some(Color::Rgb(r, g, b));
            }
        }
        None
    }
}

/// Scale a 1-4 digit hex channel down to 8 bits.
fn parse_x11_channel(s: &str) -> Option<u8> {
    if s.is_empty() || s.len() > 4 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let value = u16::from_str_radix(s, 16).ok()?;
    let max = (1u32 << (4 * s.len() as u32)) - 1;
    Some(((value as u32 * 255 + max / 2) / max) as u8)
}

/// Serializable color for structured render output.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum SerializableColor {
    Default,
    Indexed { index: u8 },
    Rgb { r: u8, g: u8, b: u8 },
}

impl From<Color> for SerializableColor {
    fn from(c: Color) -> Self {
        match c {
            Color::Default => SerializableColor::Default,
            Color::Indexed(i) => SerializableColor::Indexed { index: i },
            Color::Rgb(r, g, b) => SerializableColor::Rgb { r, g, b },
        }
    }
}

/// Convert a 256-color index to an RGB tuple.
/// The first 16 are the standard ANSI colors (xterm defaults),
/// 16-231 are a 6x6x6 color cube, 232-255 are a grayscale ramp.
pub fn indexed_to_rgb(index: u8) -> (u8, u8, u8) {
    match index {
        0 => (0x00, 0x00, 0x00),   // black
        1 => (0xcd, 0x00, 0x00),   // red
        2 => (0x00, 0xcd, 0x00),   // green
        3 => (0xcd, 0xcd, 0x00),   // yellow
        4 => (0x00, 0x00, 0xee),   // blue
        5 => (0xcd, 0x00, 0xcd),   // magenta
        6 => (0x00, 0xcd, 0xcd),   // cyan
        7 => (0xe5, 0xe5, 0xe5),   // white
        8 => (0x7f, 0x7f, 0x7f),   // bright black
        9 => (0xff, 0x00, 0x00),   // bright red
        10 => (0x00, 0xff, 0x00),  // bright green
        11 => (0xff, 0xff, 0x00),  // bright yellow
        12 => (0x5c, 0x5c, 0xff),  // bright blue
        13 => (0xff, 0x00, 0xff),  // bright magenta
        14 => (0x00, 0xff, 0xff),  // bright cyan
        15 => (0xff, 0xff, 0xff),  // bright white
        // 6x6x6 color cube
        16..=231 => {
            let idx = index - 16;
            let r = idx / 36;
            let g = (idx % 36) / 6;
            let b = idx % 6;
            let to_val = |v: u8| if v == 0 { 0 } else { 55 + 40 * v };
            (to_val(r), to_val(g), to_val(b))
        }
        // Grayscale ramp
        232..=255 => {
            let v = 8 + 10 * (index - 232);
            (v, v, v)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sgr_params_per_variant() {
        assert_eq!(Color::Default.sgr_params(), "");
        assert_eq!(Color::Indexed(196).sgr_params(), "5;196");
        assert_eq!(Color::Rgb(88, 88, 121).sgr_params(), "2;88;88;121");
    }

    #[test]
    fn color_cube_math() {
        assert_eq!(indexed_to_rgb(16), (0, 0, 0));
        assert_eq!(indexed_to_rgb(231), (255, 255, 255));
        assert_eq!(indexed_to_rgb(232), (8, 8, 8));
        assert_eq!(indexed_to_rgb(255), (238, 238, 238));
    }

    #[test]
    fn x11_form_widens_channels() {
        assert_eq!(
            Color::Rgb(0xff, 0x00, 0x80).to_x11_rgb((0, 0, 0)),
            "rgb:ffff/0000/8080"
        );
        assert_eq!(
            Color::Default.to_x11_rgb((0xff, 0xff, 0xff)),
            "rgb:ffff/ffff/ffff"
        );
    }

    #[test]
    fn parse_spec_forms() {
        assert_eq!(Color::parse_spec("#ff0080"), Some(Color::Rgb(255, 0, 128)));
        assert_eq!(
            Color::parse_spec("rgb:ffff/0000/8080"),
            Some(Color::Rgb(255, 0, 128))
        );
        assert_eq!(Color::parse_spec("rgb:f/0/8"), Some(Color::Rgb(255, 0, 136)));
        assert_eq!(Color::parse_spec("teal"), None);
    }
}
