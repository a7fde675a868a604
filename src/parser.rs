//! Escape-sequence state machine.
//!
//! The parser consumes decoded characters and emits [`Command`]s for the
//! terminal to execute. It recognizes C0/C1 controls (both ESC-prefixed
//! and 8-bit forms), CSI, OSC, DCS, APC, PM, SOS, SCS designators, and
//! the simple ESC sequences; everything else is printable text. Partial
//! sequences survive arbitrary chunk boundaries: the state machine simply
//! stays in its current state until the terminator (or a CAN/SUB cancel)
//! arrives in a later feed.

const ESC: char = '\x1b';
const BEL: char = '\x07';
const CAN: char = '\x18';
const SUB: char = '\x1a';
const ST: char = '\u{9c}';

/// Cap on buffered string-sequence payloads. Overflowing sequences are
/// consumed to their terminator but dispatch nothing.
const PAYLOAD_CAP: usize = 64 * 1024;

/// Cap on collected CSI parameter text.
const CSI_PARAMS_CAP: usize = 256;

/// Maximum number of `;`-separated CSI parameters retained.
const MAX_PARAMS: usize = 32;

/// The paired string sequences sharing buffering/termination behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringKind {
    Osc,
    Dcs,
    Apc,
    Pm,
    Sos,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum State {
    #[default]
    Ground,
    /// ESC seen, selector pending (also the held trailing-ESC state).
    Escape,
    /// ESC ( ) * + seen, designator character pending.
    Designate(usize),
    Csi,
    Str(StringKind),
}

/// One `;`-separated CSI parameter with its `:`-separated sub-parameters.
/// Missing positions are `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsiParam {
    parts: Vec<Option<u16>>,
}

impl CsiParam {
    /// Parse a raw parameter string (`"1;2:3;;4"`) into parameters.
    pub fn parse(raw: &str) -> Vec<CsiParam> {
        if raw.is_empty() {
            return Vec::new();
        }
        raw.split(';')
            .take(MAX_PARAMS)
            .map(|p| CsiParam {
                parts: p
                    .split(':')
                    .map(|s| {
                        if s.is_empty() {
                            None
                        } else {
                            s.parse::<u32>().ok().map(|v| v.min(u16::MAX as u32) as u16)
                        }
                    })
                    .collect(),
            })
            .collect()
    }

    /// The main value (text before the first colon).
    pub fn value(&self) -> Option<u16> {
        self.parts.first().copied().flatten()
    }

    /// All `:`-separated positions including the main value.
    pub fn subparams(&self) -> &[Option<u16>] {
        &self.parts
    }
}

/// A parsed CSI sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsiCommand {
    /// Leading private marker (`?`, `<`, `=`, `>`), if any.
    pub private: Option<char>,
    /// Intermediate bytes in 0x20-0x2F (e.g. `$` for DECRQM, space for DECSCUSR).
    pub intermediates: Vec<char>,
    /// Final byte in 0x40-0x7E.
    pub final_byte: char,
    /// Raw parameter text, kept for parse caching.
    pub raw_params: String,
    pub params: Vec<CsiParam>,
}

impl CsiCommand {
    /// Parameter at `index`, with missing and zero values mapped to
    /// `default` (the CSI convention for counts and positions).
    pub fn param(&self, index: usize, default: u16) -> u16 {
        self.params
            .get(index)
            .and_then(|p| p.value())
            .filter(|&v| v != 0)
            .unwrap_or(default)
    }

    /// Parameter at `index` with only missing values defaulted (zero kept).
    pub fn param_raw(&self, index: usize, default: u16) -> u16 {
        self.params
            .get(index)
            .and_then(|p| p.value())
            .unwrap_or(default)
    }
}

/// Commands emitted by the parser for the terminal to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// A run of printable text (pre-charset-translation).
    Print(String),
    /// A C0 control (or DEL).
    Control(char),
    /// A simple ESC sequence, identified by its final character.
    Esc(char),
    /// SCS designation: slot G0..G3 and the designator character.
    Designate(usize, char),
    /// SS2 / SS3: shift into G2/G3 for exactly one character.
    SingleShift(usize),
    Csi(CsiCommand),
    Osc(String),
    Dcs(String),
    Apc(String),
    Pm(String),
    Sos(String),
}

/// The state machine. Owns only transient parse state; dispatch targets
/// receive owned [`Command`]s.
#[derive(Debug, Default)]
pub struct Parser {
    state: State,
    print_run: String,
    csi_private: Option<char>,
    csi_intermediates: Vec<char>,
    csi_params: String,
    csi_malformed: bool,
    payload: String,
    payload_overflow: bool,
    /// ESC seen inside a string sequence; resolved by the next character
    /// (`\` completes ST, anything else keeps the ESC as payload).
    str_esc: bool,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop any in-progress sequence and return to ground.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// True when no paired sequence is in progress.
    pub fn is_ground(&self) -> bool {
        self.state == State::Ground
    }

    /// Feed decoded characters, appending resulting commands to `out`.
    pub fn feed(&mut self, input: &str, out: &mut Vec<Command>) {
        for c in input.chars() {
            self.step(c, out);
        }
        self.flush_print(out);
    }

    fn step(&mut self, c: char, out: &mut Vec<Command>) {
        match self.state {
            State::Ground => self.ground(c, out),
            State::Escape => self.escape(c, out),
            State::Designate(slot) => {
                self.state = State::Ground;
                match c {
                    CAN | SUB => {}
                    ESC => self.state = State::Escape,
                    _ => out.push(Command::Designate(slot, c)),
                }
            }
            State::Csi => self.csi(c, out),
            State::Str(kind) => self.string(kind, c, out),
        }
    }

    fn ground(&mut self, c: char, out: &mut Vec<Command>) {
        match c {
            ESC => {
                self.flush_print(out);
                self.state = State::Escape;
            }
            CAN | SUB => self.flush_print(out),
            '\0'..='\x1f' | '\x7f' => {
                self.flush_print(out);
                out.push(Command::Control(c));
            }
            // 8-bit C1 controls
            '\u{80}'..='\u{9f}' => {
                self.flush_print(out);
                match c {
                    '\u{84}' => out.push(Command::Esc('D')), // IND
                    '\u{85}' => out.push(Command::Esc('E')), // NEL
                    '\u{88}' => out.push(Command::Esc('H')), // HTS
                    '\u{8d}' => out.push(Command::Esc('M')), // RI
                    '\u{8e}' => out.push(Command::SingleShift(2)),
                    '\u{8f}' => out.push(Command::SingleShift(3)),
                    '\u{90}' => self.enter_string(StringKind::Dcs),
                    '\u{98}' => self.enter_string(StringKind::Sos),
                    '\u{9b}' => self.enter_csi(),
                    '\u{9d}' => self.enter_string(StringKind::Osc),
                    '\u{9e}' => self.enter_string(StringKind::Pm),
                    '\u{9f}' => self.enter_string(StringKind::Apc),
                    // Stray ST or unhandled C1: consumed without effect.
                    _ => tracing::debug!(c1 = c as u32, "ignoring C1 control"),
                }
            }
            _ => self.print_run.push(c),
        }
    }

    fn escape(&mut self, c: char, out: &mut Vec<Command>) {
        self.state = State::Ground;
        match c {
            '[' => self.enter_csi(),
            ']' => self.enter_string(StringKind::Osc),
            'P' => self.enter_string(StringKind::Dcs),
            '_' => self.enter_string(StringKind::Apc),
            '^' => self.enter_string(StringKind::Pm),
            'X' => self.enter_string(StringKind::Sos),
            'N' => out.push(Command::SingleShift(2)),
            'O' => out.push(Command::SingleShift(3)),
            '(' => self.state = State::Designate(0),
            ')' => self.state = State::Designate(1),
            '*' => self.state = State::Designate(2),
            '+' => self.state = State::Designate(3),
            // Stray string terminator
            '\\' => {}
            CAN | SUB => {}
            ESC => self.state = State::Escape,
            _ => out.push(Command::Esc(c)),
        }
    }

    fn enter_csi(&mut self) {
        self.state = State::Csi;
        self.csi_private = None;
        self.csi_intermediates.clear();
        self.csi_params.clear();
        self.csi_malformed = false;
    }

    fn enter_string(&mut self, kind: StringKind) {
        self.state = State::Str(kind);
        self.payload.clear();
        self.payload_overflow = false;
        self.str_esc = false;
    }

    fn csi(&mut self, c: char, out: &mut Vec<Command>) {
        match c {
            '0'..='9' | ';' | ':' => {
                if self.csi_params.len() < CSI_PARAMS_CAP {
                    self.csi_params.push(c);
                } else {
                    self.csi_malformed = true;
                }
            }
            '?' | '<' | '=' | '>' => {
                // Only legal as the very first byte of the sequence.
                if self.csi_private.is_none()
                    && self.csi_params.is_empty()
                    && self.csi_intermediates.is_empty()
                {
                    self.csi_private = Some(c);
                } else {
                    self.csi_malformed = true;
                }
            }
            ' '..='/' => self.csi_intermediates.push(c),
            '@'..='~' => {
                self.state = State::Ground;
                if self.csi_malformed {
                    tracing::debug!(final_byte = %c, "discarding malformed CSI");
                    return;
                }
                out.push(Command::Csi(CsiCommand {
                    private: self.csi_private,
                    intermediates: std::mem::take(&mut self.csi_intermediates),
                    final_byte: c,
                    params: CsiParam::parse(&self.csi_params),
                    raw_params: std::mem::take(&mut self.csi_params),
                }));
            }
            CAN | SUB => self.state = State::Ground,
            ESC => {
                // Abort and start a fresh sequence.
                self.state = State::Escape;
            }
            _ => {
                // Control or non-ASCII byte inside a CSI sequence: abort.
                tracing::debug!(byte = c as u32, "aborting CSI on unexpected byte");
                self.state = State::Ground;
            }
        }
    }

    fn string(&mut self, kind: StringKind, c: char, out: &mut Vec<Command>) {
        if self.str_esc {
            self.str_esc = false;
            if c == '\\' {
                self.finish_string(kind, out);
                return;
            }
            // The ESC was ordinary payload after all.
            self.push_payload(ESC);
            // Fall through to process `c` itself.
        }
        match c {
            ESC => self.str_esc = true,
            ST => self.finish_string(kind, out),
            BEL if matches!(kind, StringKind::Osc | StringKind::Dcs) => {
                self.finish_string(kind, out)
            }
            CAN | SUB => {
                self.state = State::Ground;
                self.payload.clear();
            }
            _ => self.push_payload(c),
        }
    }

    fn push_payload(&mut self, c: char) {
        if self.payload.len() >= PAYLOAD_CAP {
            self.payload_overflow = true;
        } else {
            self.payload.push(c);
        }
    }

    fn finish_string(&mut self, kind: StringKind, out: &mut Vec<Command>) {
        self.state = State::Ground;
        let payload = std::mem::take(&mut self.payload);
        if self.payload_overflow {
            tracing::debug!(?kind, "discarding oversized string sequence");
            self.payload_overflow = false;
            return;
        }
        out.push(match kind {
            StringKind::Osc => Command::Osc(payload),
            StringKind::Dcs => Command::Dcs(payload),
            StringKind::Apc => Command::Apc(payload),
            StringKind::Pm => Command::Pm(payload),
            StringKind::Sos => Command::Sos(payload),
        });
    }

    fn flush_print(&mut self, out: &mut Vec<Command>) {
        if !self.print_run.is_empty() {
            out.push(Command::Print(std::mem::take(&mut self.print_run)));
        }
    }
}
