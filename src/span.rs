use serde::Serialize;

use crate::color::{Color, SerializableColor};
use crate::style::{Attrs, Style};

/// A contiguous run of text sharing one resolved style. This is the
/// structured line form for hosts that render without ANSI sequences.
#[derive(Debug, Clone, Serialize)]
pub struct StyledSpan {
    pub text: String,
    pub fg: SerializableColor,
    pub bg: SerializableColor,
    pub bold: bool,
    pub dim: bool,
    pub italic: bool,
    pub underline: bool,
    pub blink: bool,
    pub strikethrough: bool,
}

impl StyledSpan {
    /// Build a span, resolving REVERSE and CONCEAL into plain colors so
    /// renderers don't need to understand those attributes.
    pub fn new(text: &str, style: &Style) -> Self {
        let (mut fg, mut bg) = (style.foreground(), style.background());
        if style.attr(Attrs::REVERSE) {
            std::mem::swap(&mut fg, &mut bg);
        }
        if style.attr(Attrs::CONCEAL) {
            fg = bg;
        }
        Self {
            text: text.to_string(),
            fg: fg.into(),
            bg: bg.into(),
            bold: style.attr(Attrs::BOLD),
            dim: style.attr(Attrs::DIM),
            italic: style.attr(Attrs::ITALIC),
            underline: style.attr(Attrs::UNDERLINE),
            blink: style.attr(Attrs::BLINK),
            strikethrough: style.attr(Attrs::STRIKE),
        }
    }

    pub fn foreground(&self) -> Color {
        match self.fg {
            SerializableColor::Default => Color::Default,
            SerializableColor::Indexed { index } => Color::Indexed(index),
            SerializableColor::Rgb { r, g, b } => Color::Rgb(r, g, b),
        }
    }
}
