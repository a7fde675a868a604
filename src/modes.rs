/// Mouse tracking models selectable via DEC private modes ?9/?1000/?1002/?1003.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MouseTracking {
    #[default]
    Off,
    /// ?9 — X10 compatibility: presses only, no modifiers.
    X10,
    /// ?1000 — VT200: presses and releases.
    Normal,
    /// ?1002 — presses, releases, and drag motion.
    ButtonEvent,
    /// ?1003 — all motion.
    AnyEvent,
}

/// Terminal mode flags tracking the DEC and ANSI modes the engine stores.
#[derive(Debug, Clone)]
pub struct Modes {
    /// IRM (4): insert instead of overwrite when printing
    pub insert: bool,
    /// LNM (20): LF/VT/FF also perform CR
    pub linefeed_newline: bool,
    /// DECCKM (?1): arrows emit SS3 instead of CSI
    pub cursor_keys_application: bool,
    /// DECSCLM (?4): stored only, no visual effect
    pub smooth_scroll: bool,
    /// DECSCNM (?5): reverse-video rendering hint
    pub reverse_screen: bool,
    /// DECOM (?6): cursor addressing relative to the scroll region
    pub origin: bool,
    /// DECAWM (?7): wrap at the right margin
    pub autowrap: bool,
    /// DECARM (?8): stored only
    pub auto_repeat: bool,
    /// ?12: cursor blink, stored only
    pub cursor_blink: bool,
    /// DECTCEM (?25): cursor visibility
    pub cursor_visible: bool,
    /// DECNKM (?66) / ESC = / ESC >: keypad application mode
    pub application_keypad: bool,
    /// DECBKM (?67): backspace key sends BS instead of DEL
    pub backarrow_sends_bs: bool,
    /// DECKBUM (?69): stored only
    pub keyboard_usage: bool,
    /// Mouse tracking model (?9/?1000/?1002/?1003)
    pub mouse: MouseTracking,
    /// ?1006: SGR-format mouse reports
    pub sgr_mouse: bool,
    /// ?2004: bracketed paste framing
    pub bracketed_paste: bool,
    /// DECARSM (?2028): stored only
    pub auto_resize: bool,
}

impl Default for Modes {
    fn default() -> Self {
        Self {
            insert: false,
            linefeed_newline: false,
            cursor_keys_application: false,
            smooth_scroll: false,
            reverse_screen: false,
            origin: false,
            autowrap: true,
            auto_repeat: true,
            cursor_blink: false,
            cursor_visible: true,
            application_keypad: false,
            backarrow_sends_bs: false,
            keyboard_usage: false,
            mouse: MouseTracking::Off,
            sgr_mouse: false,
            bracketed_paste: false,
            auto_resize: false,
        }
    }
}
