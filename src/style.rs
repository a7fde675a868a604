use std::collections::HashMap;
use std::fmt::Write as _;
use std::hash::{Hash, Hasher};

use bitflags::bitflags;

use crate::color::Color;
use crate::parser::CsiParam;

bitflags! {
    /// Text attributes as a compact bitflag set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Attrs: u16 {
        const BOLD      = 1 << 0;
        const DIM       = 1 << 1;
        const ITALIC    = 1 << 2;
        const UNDERLINE = 1 << 3;
        const BLINK     = 1 << 4;
        const REVERSE   = 1 << 5;
        const CONCEAL   = 1 << 6;
        const STRIKE    = 1 << 7;
    }
}

/// A cell style: colors plus tri-state attributes.
///
/// `None` colors and attributes in neither `on` nor `off` are *unspecified*:
/// they inherit from the base style on merge. `Some(Color::Default)` and
/// bits in `off` are explicit resets that override the base. Equality and
/// hashing compare the resolved appearance, so a style that explicitly
/// resets every field equals `Style::default()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Style {
    pub fg: Option<Color>,
    pub bg: Option<Color>,
    pub on: Attrs,
    pub off: Attrs,
}

impl PartialEq for Style {
    fn eq(&self, other: &Self) -> bool {
        self.resolved() == other.resolved()
    }
}

impl Eq for Style {}

impl Hash for Style {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.resolved().hash(state);
    }
}

impl Style {
    /// The style produced by SGR 0: every field explicitly reset.
    pub fn reset() -> Self {
        Self {
            fg: Some(Color::Default),
            bg: Some(Color::Default),
            on: Attrs::empty(),
            off: Attrs::all(),
        }
    }

    /// Resolved appearance relative to a default base.
    fn resolved(&self) -> (Color, Color, Attrs) {
        (
            self.fg.unwrap_or(Color::Default),
            self.bg.unwrap_or(Color::Default),
            self.on,
        )
    }

    pub fn is_default(&self) -> bool {
        *self == Style::default()
    }

    pub fn attr(&self, attr: Attrs) -> bool {
        self.on.contains(attr)
    }

    /// Foreground as stored in a cell (cells always hold resolved styles).
    pub fn foreground(&self) -> Color {
        self.fg.unwrap_or(Color::Default)
    }

    pub fn background(&self) -> Color {
        self.bg.unwrap_or(Color::Default)
    }

    /// A style carrying only this style's background, used for erase fills.
    pub fn background_only(&self) -> Style {
        Style {
            bg: self.bg.filter(|c| *c != Color::Default),
            ..Style::default()
        }
    }

    /// Toggle REVERSE, used for the screen-wide DECSCNM rendering hint
    /// and the cursor marker in ANSI line output.
    pub fn reversed(&self) -> Style {
        let mut out = *self;
        out.on.toggle(Attrs::REVERSE);
        out.off = Attrs::empty();
        out
    }

    /// Field-wise merge: explicit values in `new` override `self`,
    /// unspecified fields inherit. The result is fully resolved and
    /// suitable as the next current style.
    pub fn merge(&self, new: &Style) -> Style {
        Style {
            fg: new.fg.or(self.fg),
            bg: new.bg.or(self.bg),
            on: (self.on - new.off) | new.on,
            off: Attrs::empty(),
        }
    }

    /// Parse SGR parameters into a Style, starting from an all-unspecified
    /// style. SGR 0 (or an empty parameter list) resets every field
    /// explicitly; unknown codes are skipped.
    pub fn parse_sgr(params: &[CsiParam]) -> Style {
        let mut style = Style::default();
        if params.is_empty() {
            return Style::reset();
        }

        let mut i = 0;
        while i < params.len() {
            let param = &params[i];
            let code = param.value().unwrap_or(0);
            match code {
                0 => style = Style::reset(),
                1 => style.set_attr(Attrs::BOLD, true),
                2 => style.set_attr(Attrs::DIM, true),
                3 => style.set_attr(Attrs::ITALIC, true),
                4 => style.set_attr(Attrs::UNDERLINE, true),
                5 => style.set_attr(Attrs::BLINK, true),
                7 => style.set_attr(Attrs::REVERSE, true),
                8 => style.set_attr(Attrs::CONCEAL, true),
                9 => style.set_attr(Attrs::STRIKE, true),
                22 => {
                    style.set_attr(Attrs::BOLD, false);
                    style.set_attr(Attrs::DIM, false);
                }
                23 => style.set_attr(Attrs::ITALIC, false),
                24 => style.set_attr(Attrs::UNDERLINE, false),
                25 => style.set_attr(Attrs::BLINK, false),
                27 => style.set_attr(Attrs::REVERSE, false),
                28 => style.set_attr(Attrs::CONCEAL, false),
                29 => style.set_attr(Attrs::STRIKE, false),
                30..=37 => style.fg = Some(Color::Indexed(code as u8 - 30)),
                38 => {
                    style.fg = parse_extended_color(params, &mut i).or(style.fg);
                }
                39 => style.fg = Some(Color::Default),
                40..=47 => style.bg = Some(Color::Indexed(code as u8 - 40)),
                48 => {
                    style.bg = parse_extended_color(params, &mut i).or(style.bg);
                }
                49 => style.bg = Some(Color::Default),
                90..=97 => style.fg = Some(Color::Indexed(code as u8 - 90 + 8)),
                100..=107 => style.bg = Some(Color::Indexed(code as u8 - 100 + 8)),
                _ => {}
            }
            i += 1;
        }
        style
    }

    fn set_attr(&mut self, attr: Attrs, value: bool) {
        if value {
            self.on.insert(attr);
            self.off.remove(attr);
        } else {
            self.off.insert(attr);
            self.on.remove(attr);
        }
    }

    /// Emit a complete SGR sequence producing this style from a default
    /// cursor. The default style emits the empty string.
    pub fn to_ansi(&self) -> String {
        if self.is_default() {
            return String::new();
        }
        let mut out = String::from("\x1b[");
        let mut first = true;
        let mut push = |out: &mut String, frag: &str| {
            if !first {
                out.push(';');
            }
            out.push_str(frag);
            first = false;
        };

        match self.foreground() {
            Color::Default => {}
            Color::Indexed(n @ 0..=7) => push(&mut out, &format!("{}", 30 + n)),
            Color::Indexed(n @ 8..=15) => push(&mut out, &format!("{}", 90 + n - 8)),
            c => push(&mut out, &format!("38;{}", c.sgr_params())),
        }
        match self.background() {
            Color::Default => {}
            Color::Indexed(n @ 0..=7) => push(&mut out, &format!("{}", 40 + n)),
            Color::Indexed(n @ 8..=15) => push(&mut out, &format!("{}", 100 + n - 8)),
            c => push(&mut out, &format!("48;{}", c.sgr_params())),
        }
        for (attr, code) in [
            (Attrs::BOLD, 1),
            (Attrs::DIM, 2),
            (Attrs::ITALIC, 3),
            (Attrs::UNDERLINE, 4),
            (Attrs::BLINK, 5),
            (Attrs::REVERSE, 7),
            (Attrs::CONCEAL, 8),
            (Attrs::STRIKE, 9),
        ] {
            if self.on.contains(attr) {
                push(&mut out, &format!("{}", code));
            }
        }
        out.push('m');
        out
    }

    /// Shortest SGR transition from `self` to `to`: empty when equal,
    /// a bare reset when `to` is default, reset-then-restyle otherwise.
    pub fn diff(&self, to: &Style) -> String {
        if self == to {
            return String::new();
        }
        if to.is_default() {
            return String::from("\x1b[0m");
        }
        let mut out = String::from("\x1b[0m");
        let _ = write!(out, "{}", to.to_ansi());
        out
    }
}

/// Consume a `38`/`48` extended-color introducer at `params[*i]`.
///
/// Both the semicolon form (`38;5;n`, `38;2;r;g;b`) and the colon
/// sub-parameter form (`38:5:n`, `38:2:r:g:b`, `38:2::r:g:b` with a
/// colorspace id) are accepted. The introducer always owns its
/// sub-sequence: on missing components the consumed parameters yield no
/// color instead of being reinterpreted as independent codes.
fn parse_extended_color(params: &[CsiParam], i: &mut usize) -> Option<Color> {
    let param = &params[*i];
    let sub = param.subparams();
    if sub.len() > 1 {
        // Colon form: everything lives inside this one parameter.
        let mode = sub[1].unwrap_or(0);
        return match mode {
            5 => sub.get(2).copied().flatten().map(|n| Color::Indexed(n as u8)),
            2 => {
                // ITU T.416 allows an optional colorspace id: 38:2:cs:r:g:b.
                let rgb = if sub.len() >= 6 { &sub[3..] } else { &sub[2..] };
                match rgb {
                    [r, g, b, ..] => Some(Color::Rgb(
                        r.unwrap_or(0) as u8,
                        g.unwrap_or(0) as u8,
                        b.unwrap_or(0) as u8,
                    )),
                    _ => None,
                }
            }
            _ => None,
        };
    }

    // Semicolon form: consume following parameters.
    let mode = params.get(*i + 1).and_then(|p| p.value());
    match mode {
        Some(5) => {
            let n = params.get(*i + 2).and_then(|p| p.value());
            *i = (*i + 2).min(params.len() - 1);
            n.map(|n| Color::Indexed(n as u8))
        }
        Some(2) => {
            let r = params.get(*i + 2).and_then(|p| p.value());
            let g = params.get(*i + 3).and_then(|p| p.value());
            let b = params.get(*i + 4).and_then(|p| p.value());
            *i = (*i + 4).min(params.len() - 1);
            match (r, g, b) {
                (Some(r), Some(g), Some(b)) => {
                    Some(Color::Rgb(r as u8, g as u8, b as u8))
                }
                _ => None,
            }
        }
        Some(_) => {
            *i += 1;
            None
        }
        None => {
            *i = params.len();
            None
        }
    }
}

/// Bounded memo for SGR strings. Repeated transitions dominate line
/// rendering, so `diff`/`to_ansi` results are cached; the cache is
/// cleared when full rather than evicting piecemeal.
#[derive(Debug, Default)]
pub struct StyleCache {
    diffs: HashMap<(Style, Style), String>,
    ansi: HashMap<Style, String>,
}

const STYLE_CACHE_CAP: usize = 4096;

impl StyleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diff(&mut self, from: &Style, to: &Style) -> &str {
        if self.diffs.len() >= STYLE_CACHE_CAP {
            self.diffs.clear();
        }
        self.diffs
            .entry((*from, *to))
            .or_insert_with(|| from.diff(to))
    }

    pub fn to_ansi(&mut self, style: &Style) -> &str {
        if self.ansi.len() >= STYLE_CACHE_CAP {
            self.ansi.clear();
        }
        self.ansi.entry(*style).or_insert_with(|| style.to_ansi())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sgr(raw: &str) -> Style {
        Style::parse_sgr(&CsiParam::parse(raw))
    }

    #[test]
    fn parse_basic_attributes() {
        let style = sgr("1;4;31");
        assert!(style.attr(Attrs::BOLD));
        assert!(style.attr(Attrs::UNDERLINE));
        assert_eq!(style.foreground(), Color::Indexed(1));
    }

    #[test]
    fn parse_bright_and_extended_colors() {
        assert_eq!(sgr("91").foreground(), Color::Indexed(9));
        assert_eq!(sgr("103").background(), Color::Indexed(11));
        assert_eq!(sgr("38;5;196").foreground(), Color::Indexed(196));
        assert_eq!(sgr("48;2;5;6;7").background(), Color::Rgb(5, 6, 7));
    }

    #[test]
    fn parse_colon_subparameter_forms() {
        assert_eq!(sgr("38:5:196").foreground(), Color::Indexed(196));
        assert_eq!(sgr("38:2:88:88:121").foreground(), Color::Rgb(88, 88, 121));
        // Colorspace-id variant
        assert_eq!(sgr("38:2::10:20:30").foreground(), Color::Rgb(10, 20, 30));
    }

    #[test]
    fn extended_color_consumes_its_components() {
        // The 2;R;G;B bytes belong to the 38 introducer and must not be
        // read as blink/dim/etc.
        let style = sgr("38;2;88;88;121;48;2;5;6;7");
        assert_eq!(style.foreground(), Color::Rgb(88, 88, 121));
        assert_eq!(style.background(), Color::Rgb(5, 6, 7));
        assert!(!style.attr(Attrs::DIM));
        assert!(!style.attr(Attrs::BLINK));
    }

    #[test]
    fn malformed_rgb_changes_nothing() {
        let style = sgr("38;2;100");
        assert_eq!(style.foreground(), Color::Default);
        assert!(!style.attr(Attrs::DIM));
        assert_eq!(style.background(), Color::Default);
    }

    #[test]
    fn reset_mid_sequence_clears_prior_codes() {
        let style = sgr("1;31;0;4");
        assert!(!style.attr(Attrs::BOLD));
        assert!(style.attr(Attrs::UNDERLINE));
        assert_eq!(style.foreground(), Color::Default);
    }

    #[test]
    fn merge_identities() {
        let a = sgr("1;31");
        assert_eq!(a.merge(&Style::default()), a, "merge with default keeps a");
        assert_eq!(Style::default().merge(&a), a, "merge onto default yields b");
        assert_eq!(
            a.merge(&Style::reset()),
            Style::default(),
            "merging a reset yields the default style"
        );
    }

    #[test]
    fn merge_overrides_fieldwise() {
        let base = sgr("1;31;44");
        let update = sgr("22;32");
        let merged = base.merge(&update);
        assert!(!merged.attr(Attrs::BOLD), "22 clears bold from base");
        assert_eq!(merged.foreground(), Color::Indexed(2));
        assert_eq!(merged.background(), Color::Indexed(4), "bg inherited");
    }

    #[test]
    fn to_ansi_round_trips_through_parse() {
        let style = sgr("1;3;38;2;10;20;30;48;5;100");
        let replayed = Style::parse_sgr(&CsiParam::parse(
            style.to_ansi().trim_start_matches("\x1b[").trim_end_matches('m'),
        ));
        assert_eq!(Style::default().merge(&replayed), style);
        assert_eq!(Style::default().to_ansi(), "");
    }

    #[test]
    fn diff_contract() {
        let plain = Style::default();
        let red_bold = sgr("1;31");
        assert_eq!(red_bold.diff(&red_bold), "");
        assert_eq!(plain.diff(&plain), "");
        assert_eq!(red_bold.diff(&plain), "\x1b[0m");
        let transition = plain.diff(&red_bold);
        assert!(transition.starts_with("\x1b[0m"));
        assert!(transition.contains("31"));
        assert!(transition.contains('1'));
    }

    #[test]
    fn cache_is_transparent() {
        let mut cache = StyleCache::new();
        let a = sgr("38;5;10");
        let b = sgr("48;5;20;1");
        let cold = a.diff(&b);
        assert_eq!(cache.diff(&a, &b), cold);
        assert_eq!(cache.diff(&a, &b), cold, "warm lookup matches");
        assert_eq!(cache.to_ansi(&b), b.to_ansi());
    }
}
