use std::collections::HashMap;

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use unicode_width::UnicodeWidthChar;

use crate::buffer::{Buffer, Cell, CellFlags};
use crate::charset::CharsetState;
use crate::color::{indexed_to_rgb, Color};
use crate::cursor::{Cursor, SavedCursor};
use crate::input::{
    encode_fkey, encode_key, encode_mouse, encode_numpad, Key, Modifiers, MouseButton,
    MouseEventKind, NumpadKey,
};
use crate::modes::{Modes, MouseTracking};
use crate::parser::{Command, CsiCommand, Parser};
use crate::span::StyledSpan;
use crate::style::{Style, StyleCache};
use crate::utf8::Utf8Decoder;

const SGR_CACHE_CAP: usize = 1024;
const REP_CAP: usize = 2048;

/// Full terminal state: both screen buffers, cursor, modes, scroll region,
/// charsets, current style, and the parse/decode machinery. The host
/// drives it with [`Terminal::feed`] and the `input_*` calls, reads back
/// through [`Terminal::capture_pane`] and the line accessors, and forwards
/// [`Terminal::drain_responses`] to the child process.
pub struct Terminal {
    primary: Buffer,
    alt: Buffer,
    using_alt: bool,
    cursor: Cursor,
    saved_primary: Option<SavedCursor>,
    saved_alt: Option<SavedCursor>,
    modes: Modes,
    scroll_top: usize,
    scroll_bottom: usize,
    tab_stops: Vec<bool>,
    charsets: CharsetState,
    style: Style,
    width: usize,
    height: usize,
    title: String,
    icon_title: String,
    /// OSC 4 palette overrides, reset by OSC 104.
    palette: [Option<(u8, u8, u8)>; 256],
    default_fg: Option<Color>,
    default_bg: Option<Color>,
    cursor_color: Option<Color>,
    /// OSC 52 clipboard slot. The engine never touches host clipboards.
    clipboard: String,
    /// Bytes owed to the child: query replies and encoded input.
    output: Vec<u8>,
    /// Last character printed, for CSI REP.
    last_printed: Option<char>,
    parser: Parser,
    decoder: Utf8Decoder,
    commands: Vec<Command>,
    sgr_cache: HashMap<String, Style>,
    style_cache: StyleCache,
}

impl Terminal {
    pub fn new(width: usize, height: usize) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            primary: Buffer::new(width, height),
            alt: Buffer::new(width, height),
            using_alt: false,
            cursor: Cursor::default(),
            saved_primary: None,
            saved_alt: None,
            modes: Modes::default(),
            scroll_top: 0,
            scroll_bottom: height - 1,
            tab_stops: default_tab_stops(width),
            charsets: CharsetState::default(),
            style: Style::default(),
            width,
            height,
            title: String::new(),
            icon_title: String::new(),
            palette: [None; 256],
            default_fg: None,
            default_bg: None,
            cursor_color: None,
            clipboard: String::new(),
            output: Vec::new(),
            last_printed: None,
            parser: Parser::new(),
            decoder: Utf8Decoder::new(),
            commands: Vec::new(),
            sgr_cache: HashMap::new(),
            style_cache: StyleCache::new(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn modes(&self) -> &Modes {
        &self.modes
    }

    pub fn scroll_region(&self) -> (usize, usize) {
        (self.scroll_top, self.scroll_bottom)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn icon_title(&self) -> &str {
        &self.icon_title
    }

    pub fn is_alt_screen(&self) -> bool {
        self.using_alt
    }

    pub fn clipboard(&self) -> &str {
        &self.clipboard
    }

    /// Cell at `(x, y)`; out-of-bounds positions read as the default cell.
    pub fn cell(&self, x: usize, y: usize) -> Cell {
        self.active().cell(x, y)
    }

    // ------------------------------------------------------------------
    // Feeding

    /// Feed raw bytes from the child process. Invalid UTF-8 is replaced;
    /// partial trailing sequences are buffered for the next call.
    pub fn feed(&mut self, bytes: &[u8]) {
        let mut text = String::with_capacity(bytes.len());
        self.decoder.decode(bytes, &mut text);
        self.feed_str(&text);
    }

    /// Feed already-decoded text.
    pub fn feed_str(&mut self, text: &str) {
        let mut parser = std::mem::take(&mut self.parser);
        let mut commands = std::mem::take(&mut self.commands);
        parser.feed(text, &mut commands);
        for command in commands.drain(..) {
            self.execute(command);
        }
        self.parser = parser;
        self.commands = commands;
    }

    /// RIS semantics: clear screens, modes, styles, saved cursors, parser
    /// and decoder state. Dimensions are kept.
    pub fn reset(&mut self) {
        *self = Terminal::new(self.width, self.height);
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        let width = width.max(1);
        let height = height.max(1);
        self.primary.resize(width, height);
        self.alt.resize(width, height);
        self.width = width;
        self.height = height;
        self.tab_stops = default_tab_stops(width);
        self.cursor.x = self.cursor.x.min(width.saturating_sub(1));
        self.cursor.y = self.cursor.y.min(height - 1);
        if self.scroll_bottom >= height {
            self.scroll_bottom = height - 1;
        }
        if self.scroll_top >= self.scroll_bottom {
            self.scroll_top = 0;
            self.scroll_bottom = height - 1;
        }
    }

    // ------------------------------------------------------------------
    // Host reads

    /// Plain-text snapshot of the visible screen. Does not mutate state.
    pub fn capture_pane(&self) -> String {
        self.active().capture()
    }

    /// Render one row as ANSI, including style transitions and an optional
    /// cursor marker (reverse video at the cursor cell).
    pub fn get_line(&mut self, y: usize, cursor: Option<(usize, usize)>) -> String {
        let reverse_screen = self.modes.reverse_screen;
        let show_cursor = self.modes.cursor_visible && self.cursor.visible;
        let Some(row) = self.active().row(y) else {
            return String::new();
        };
        let cells: Vec<(usize, Cell)> = row
            .cells
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.flags.contains(CellFlags::WIDE_SPACER))
            .map(|(x, c)| (x, c.clone()))
            .collect();

        let mut out = String::new();
        let mut current = Style::default();
        for (x, cell) in cells {
            let mut style = cell.style;
            if reverse_screen {
                style = style.reversed();
            }
            if show_cursor && cursor == Some((x, y)) {
                style = style.reversed();
            }
            out.push_str(self.style_cache.diff(&current, &style));
            current = style;
            out.push(cell.ch);
        }
        if !current.is_default() {
            out.push_str("\x1b[0m");
        }
        out
    }

    /// Structured row form for hosts that render without ANSI: adjacent
    /// cells sharing a style are coalesced into spans.
    pub fn get_line_spans(&self, y: usize) -> Vec<StyledSpan> {
        let reverse_screen = self.modes.reverse_screen;
        let Some(row) = self.active().row(y) else {
            return Vec::new();
        };
        let mut spans = Vec::new();
        let mut text = String::new();
        let mut current: Option<Style> = None;
        for cell in &row.cells {
            if cell.flags.contains(CellFlags::WIDE_SPACER) {
                continue;
            }
            let style = if reverse_screen {
                cell.style.reversed()
            } else {
                cell.style
            };
            match current {
                Some(prev) if prev == style => {}
                Some(prev) => {
                    spans.push(StyledSpan::new(&text, &prev));
                    text.clear();
                    current = Some(style);
                }
                None => current = Some(style),
            }
            text.push(cell.ch);
        }
        if let Some(style) = current {
            if !text.is_empty() {
                spans.push(StyledSpan::new(&text, &style));
            }
        }
        spans
    }

    /// Take the bytes owed to the child process (query replies, encoded
    /// input).
    pub fn drain_responses(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.output)
    }

    // ------------------------------------------------------------------
    // Host input

    /// Forward literal text to the child.
    pub fn input(&mut self, text: &str) {
        self.output.extend_from_slice(text.as_bytes());
    }

    /// Forward pasted text, framed per bracketed-paste mode.
    pub fn input_paste(&mut self, text: &str) {
        if self.modes.bracketed_paste {
            self.output.extend_from_slice(b"\x1b[200~");
            self.output.extend_from_slice(text.as_bytes());
            self.output.extend_from_slice(b"\x1b[201~");
        } else {
            self.output.extend_from_slice(text.as_bytes());
        }
    }

    pub fn input_key(&mut self, key: Key, mods: Modifiers) {
        let bytes = encode_key(key, mods, &self.modes);
        self.output.extend_from_slice(&bytes);
    }

    pub fn input_numpad_key(&mut self, key: NumpadKey) {
        let bytes = encode_numpad(key, self.modes.application_keypad);
        self.output.extend_from_slice(&bytes);
    }

    pub fn input_fkey(&mut self, n: u8, mods: Modifiers) {
        let bytes = encode_fkey(n, mods);
        self.output.extend_from_slice(&bytes);
    }

    pub fn input_mouse(
        &mut self,
        x: usize,
        y: usize,
        button: MouseButton,
        kind: MouseEventKind,
        mods: Modifiers,
    ) {
        let bytes = encode_mouse(x, y, button, kind, mods, &self.modes);
        self.output.extend_from_slice(&bytes);
    }

    // ------------------------------------------------------------------
    // Command execution

    fn execute(&mut self, command: Command) {
        match command {
            Command::Print(text) => self.print_text(&text),
            Command::Control(c) => self.control(c),
            Command::Esc(c) => self.simple_escape(c),
            Command::Designate(slot, d) => self.charsets.designate(slot, d),
            Command::SingleShift(n) => self.charsets.single_shift = Some(n),
            Command::Csi(csi) => self.dispatch_csi(csi),
            Command::Osc(payload) => self.dispatch_osc(&payload),
            Command::Dcs(payload) => {
                tracing::debug!(len = payload.len(), "ignoring DCS");
            }
            Command::Apc(payload) => {
                tracing::debug!(len = payload.len(), "ignoring APC");
            }
            Command::Pm(payload) => {
                tracing::debug!(len = payload.len(), "ignoring PM");
            }
            Command::Sos(payload) => {
                tracing::debug!(len = payload.len(), "ignoring SOS");
            }
        }
    }

    fn control(&mut self, c: char) {
        match c {
            '\x08' => self.backspace(),
            '\t' => self.tab(),
            '\n' | '\x0b' | '\x0c' => {
                self.line_feed();
                if self.modes.linefeed_newline {
                    self.carriage_return();
                }
            }
            '\r' => self.carriage_return(),
            // SO / SI switch the active charset
            '\x0e' => self.charsets.active = 1,
            '\x0f' => self.charsets.active = 0,
            // BEL is a host-side effect; DEL and the rest are no-ops here
            _ => {}
        }
    }

    fn simple_escape(&mut self, c: char) {
        match c {
            '7' => self.save_cursor(),
            '8' => self.restore_cursor(),
            '=' => self.modes.application_keypad = true,
            '>' => self.modes.application_keypad = false,
            'D' => self.index(),
            'E' => {
                self.carriage_return();
                self.index();
            }
            'H' => {
                if self.cursor.x < self.width {
                    self.tab_stops[self.cursor.x] = true;
                }
            }
            'M' => self.reverse_index(),
            'c' => {
                let pending_output = std::mem::take(&mut self.output);
                *self = Terminal::new(self.width, self.height);
                self.output = pending_output;
            }
            _ => tracing::debug!(esc = %c, "ignoring unknown ESC sequence"),
        }
    }

    // ------------------------------------------------------------------
    // Printing

    fn print_text(&mut self, text: &str) {
        for c in text.chars() {
            let translated = self.charsets.translate(c);
            self.print_char(translated);
        }
    }

    fn print_char(&mut self, c: char) {
        let cell_width = match UnicodeWidthChar::width(c) {
            Some(w) if w > 0 => w,
            // Combining marks and zero-width characters are dropped.
            _ => return,
        };
        self.last_printed = Some(c);
        self.put_char(c, cell_width);
    }

    fn put_char(&mut self, c: char, cell_width: usize) {
        if self.cursor.x >= self.width {
            // Pending wrap: resolve it now.
            if self.modes.autowrap {
                self.carriage_return();
                self.index();
            } else {
                self.cursor.x = self.width - 1;
            }
        }

        let (x, y) = (self.cursor.x, self.cursor.y);
        let style = self.style;
        let width = self.width;
        if self.modes.insert {
            self.active_mut().insert_cells(y, x, cell_width, &style);
        }

        let mut cell = Cell::new(c, style);
        if cell_width == 2 {
            cell.flags = CellFlags::WIDE;
        }
        let buffer = self.active_mut();
        buffer.set_cell(x, y, cell);
        if cell_width == 2 && x + 1 < width {
            buffer.set_cell(x + 1, y, Cell::wide_spacer(style));
        }
        self.cursor.x = (x + cell_width).min(width);
    }

    // ------------------------------------------------------------------
    // Cursor and scrolling primitives

    fn active(&self) -> &Buffer {
        if self.using_alt {
            &self.alt
        } else {
            &self.primary
        }
    }

    fn active_mut(&mut self) -> &mut Buffer {
        if self.using_alt {
            &mut self.alt
        } else {
            &mut self.primary
        }
    }

    fn carriage_return(&mut self) {
        self.cursor.x = 0;
    }

    fn backspace(&mut self) {
        if self.cursor.x > 0 {
            self.cursor.x -= 1;
        }
    }

    fn tab(&mut self) {
        for x in self.cursor.x + 1..self.width {
            if self.tab_stops.get(x).copied().unwrap_or(false) {
                self.cursor.x = x;
                return;
            }
        }
        self.cursor.x = self.width - 1;
    }

    /// LF/IND: scroll when on the region's bottom row, move otherwise.
    fn index(&mut self) {
        if self.cursor.y == self.scroll_bottom {
            let (top, bottom) = (self.scroll_top, self.scroll_bottom);
            self.active_mut().scroll_up(top, bottom, 1, &Style::default());
        } else if self.cursor.y + 1 < self.height {
            self.cursor.y += 1;
        }
    }

    fn line_feed(&mut self) {
        self.index();
    }

    fn reverse_index(&mut self) {
        if self.cursor.y == self.scroll_top {
            let (top, bottom) = (self.scroll_top, self.scroll_bottom);
            self.active_mut()
                .scroll_down(top, bottom, 1, &Style::default());
        } else if self.cursor.y > 0 {
            self.cursor.y -= 1;
        }
    }

    fn cursor_up(&mut self, n: usize) {
        let floor = if self.cursor.y >= self.scroll_top && self.cursor.y <= self.scroll_bottom {
            self.scroll_top
        } else {
            0
        };
        self.cursor.y = self.cursor.y.saturating_sub(n).max(floor);
    }

    fn cursor_down(&mut self, n: usize) {
        let ceiling = if self.cursor.y >= self.scroll_top && self.cursor.y <= self.scroll_bottom {
            self.scroll_bottom
        } else {
            self.height - 1
        };
        self.cursor.y = (self.cursor.y + n).min(ceiling);
    }

    /// Absolute vertical addressing, honoring origin mode.
    fn set_row(&mut self, row: usize) {
        if self.modes.origin {
            self.cursor.y = (self.scroll_top + row).min(self.scroll_bottom);
        } else {
            self.cursor.y = row.min(self.height - 1);
        }
    }

    fn save_cursor(&mut self) {
        let snapshot = SavedCursor::capture(&self.cursor, &self.style, &self.charsets);
        *self.saved_slot() = Some(snapshot);
    }

    fn restore_cursor(&mut self) {
        if let Some(saved) = *self.saved_slot() {
            self.cursor.x = saved.x.min(self.width);
            self.cursor.y = saved.y.min(self.height - 1);
            self.style = saved.style;
            self.charsets = saved.charsets;
        }
    }

    fn saved_slot(&mut self) -> &mut Option<SavedCursor> {
        if self.using_alt {
            &mut self.saved_alt
        } else {
            &mut self.saved_primary
        }
    }

    fn enter_alt_screen(&mut self, clear: bool) {
        if !self.using_alt {
            self.using_alt = true;
            if clear {
                self.alt = Buffer::new(self.width, self.height);
                self.cursor.x = 0;
                self.cursor.y = 0;
            }
        }
    }

    fn exit_alt_screen(&mut self) {
        self.using_alt = false;
    }

    // ------------------------------------------------------------------
    // CSI dispatch

    fn dispatch_csi(&mut self, csi: CsiCommand) {
        // DECRQM: CSI [?] Ps $ p
        if csi.final_byte == 'p' && csi.intermediates.contains(&'$') {
            self.report_modes(&csi);
            return;
        }
        // DECSCUSR and other intermediate forms are consumed silently.
        if !csi.intermediates.is_empty() {
            tracing::debug!(final_byte = %csi.final_byte, "ignoring CSI with intermediates");
            return;
        }

        match (csi.final_byte, csi.private) {
            ('A', None) => self.cursor_up(csi.param(0, 1) as usize),
            ('B', None) => self.cursor_down(csi.param(0, 1) as usize),
            ('C', None) => {
                self.cursor.x = (self.cursor.x + csi.param(0, 1) as usize).min(self.width - 1);
            }
            ('D', None) => {
                self.cursor.x = self.cursor.x.min(self.width - 1);
                self.cursor.x = self.cursor.x.saturating_sub(csi.param(0, 1) as usize);
            }
            ('E', None) => {
                self.cursor.x = 0;
                self.cursor_down(csi.param(0, 1) as usize);
            }
            ('F', None) => {
                self.cursor.x = 0;
                self.cursor_up(csi.param(0, 1) as usize);
            }
            ('G', None) => {
                self.cursor.x = (csi.param(0, 1) as usize - 1).min(self.width - 1);
            }
            ('H' | 'f', None) => {
                self.set_row(csi.param(0, 1) as usize - 1);
                self.cursor.x = (csi.param(1, 1) as usize - 1).min(self.width - 1);
            }
            ('d', None) => self.set_row(csi.param(0, 1) as usize - 1),
            ('J', None) => self.erase_display(csi.param_raw(0, 0)),
            ('K', None) => self.erase_line(csi.param_raw(0, 0)),
            ('L', None) => self.insert_lines(csi.param(0, 1) as usize),
            ('M', None) => self.delete_lines(csi.param(0, 1) as usize),
            ('@', None) => {
                let (x, y, style) = (self.cursor.x, self.cursor.y, self.style);
                let n = csi.param(0, 1) as usize;
                self.active_mut().insert_cells(y, x, n, &style);
            }
            ('P', None) => {
                let (x, y, style) = (self.cursor.x, self.cursor.y, self.style);
                let n = csi.param(0, 1) as usize;
                self.active_mut().delete_cells(y, x, n, &style);
            }
            ('X', None) => {
                let (x, y, style) = (self.cursor.x, self.cursor.y, self.style);
                let end = (x + csi.param(0, 1) as usize).min(self.width);
                self.active_mut().erase_cells(y, x, end, &style);
            }
            ('S', None) => {
                let (top, bottom) = (self.scroll_top, self.scroll_bottom);
                let n = csi.param(0, 1) as usize;
                self.active_mut().scroll_up(top, bottom, n, &Style::default());
            }
            ('T', None) => {
                let (top, bottom) = (self.scroll_top, self.scroll_bottom);
                let n = csi.param(0, 1) as usize;
                self.active_mut()
                    .scroll_down(top, bottom, n, &Style::default());
            }
            ('r', None) => self.set_scroll_region(&csi),
            ('m', None) => {
                let new = self.sgr_style(&csi);
                self.style = self.style.merge(&new);
            }
            ('m', Some(_)) => {
                // xterm modifyOtherKeys and friends: consumed.
            }
            ('h', Some('?')) => self.set_dec_modes(&csi, true),
            ('l', Some('?')) => self.set_dec_modes(&csi, false),
            ('h', None) => self.set_ansi_modes(&csi, true),
            ('l', None) => self.set_ansi_modes(&csi, false),
            ('n', None) => match csi.param_raw(0, 0) {
                5 => self.respond("\x1b[0n"),
                6 => {
                    let row = self.cursor.y + 1;
                    let col = self.cursor.x.min(self.width - 1) + 1;
                    self.respond(&format!("\x1b[{};{}R", row, col));
                }
                _ => {}
            },
            ('c', None) => {
                if csi.param_raw(0, 0) == 0 {
                    self.respond("\x1b[?62;1;2;6;8;9;15;18;21;22c");
                }
            }
            ('c', Some('>')) => {
                if csi.param_raw(0, 0) == 0 {
                    self.respond("\x1b[>1;10;0c");
                }
            }
            ('s', None) => self.save_cursor(),
            ('u', None) => self.restore_cursor(),
            ('b', None) => self.repeat_last(csi.param(0, 1) as usize),
            ('g', None) => match csi.param_raw(0, 0) {
                0 => {
                    if self.cursor.x < self.width {
                        self.tab_stops[self.cursor.x] = false;
                    }
                }
                3 => self.tab_stops.fill(false),
                _ => {}
            },
            ('t', None) => {
                // Window operations: consumed without effect.
            }
            (final_byte, private) => {
                tracing::debug!(?private, %final_byte, "ignoring unknown CSI");
            }
        }
    }

    fn sgr_style(&mut self, csi: &CsiCommand) -> Style {
        if let Some(style) = self.sgr_cache.get(&csi.raw_params) {
            return *style;
        }
        let style = Style::parse_sgr(&csi.params);
        if self.sgr_cache.len() >= SGR_CACHE_CAP {
            self.sgr_cache.clear();
        }
        self.sgr_cache.insert(csi.raw_params.clone(), style);
        style
    }

    fn repeat_last(&mut self, count: usize) {
        let Some(c) = self.last_printed else {
            return;
        };
        let cell_width = UnicodeWidthChar::width(c).unwrap_or(1).max(1);
        for _ in 0..count.min(REP_CAP) {
            self.put_char(c, cell_width);
        }
    }

    fn set_scroll_region(&mut self, csi: &CsiCommand) {
        let top = csi.param(0, 1) as usize - 1;
        let bottom = (csi.param(1, self.height as u16) as usize - 1).min(self.height - 1);
        if top < bottom {
            self.scroll_top = top;
            self.scroll_bottom = bottom;
            self.cursor.y = if self.modes.origin { self.scroll_top } else { 0 };
            self.cursor.x = 0;
        }
    }

    // ------------------------------------------------------------------
    // Erase / edit operations

    fn erase_display(&mut self, mode: u16) {
        let (x, y) = (self.cursor.x, self.cursor.y);
        let (width, height) = (self.width, self.height);
        let style = self.style;
        let buffer = self.active_mut();
        match mode {
            0 => {
                buffer.erase_cells(y, x, width, &style);
                for row in y + 1..height {
                    buffer.erase_row(row, &style);
                }
            }
            1 => {
                for row in 0..y {
                    buffer.erase_row(row, &style);
                }
                buffer.erase_cells(y, 0, (x + 1).min(width), &style);
            }
            // ED 2 clears the screen; ED 3 additionally covers scrollback,
            // which this core does not keep.
            2 | 3 => {
                for row in 0..height {
                    buffer.erase_row(row, &style);
                }
            }
            _ => {}
        }
    }

    fn erase_line(&mut self, mode: u16) {
        let (x, y) = (self.cursor.x, self.cursor.y);
        let width = self.width;
        let style = self.style;
        let buffer = self.active_mut();
        match mode {
            0 => buffer.erase_cells(y, x, width, &style),
            1 => buffer.erase_cells(y, 0, (x + 1).min(width), &style),
            2 => buffer.erase_row(y, &style),
            _ => {}
        }
    }

    fn insert_lines(&mut self, n: usize) {
        if self.cursor.y >= self.scroll_top && self.cursor.y <= self.scroll_bottom {
            let (y, bottom) = (self.cursor.y, self.scroll_bottom);
            self.active_mut().scroll_down(y, bottom, n, &Style::default());
            self.cursor.x = 0;
        }
    }

    fn delete_lines(&mut self, n: usize) {
        if self.cursor.y >= self.scroll_top && self.cursor.y <= self.scroll_bottom {
            let (y, bottom) = (self.cursor.y, self.scroll_bottom);
            self.active_mut().scroll_up(y, bottom, n, &Style::default());
            self.cursor.x = 0;
        }
    }

    // ------------------------------------------------------------------
    // Modes

    fn set_ansi_modes(&mut self, csi: &CsiCommand, enable: bool) {
        for param in &csi.params {
            match param.value() {
                Some(4) => self.modes.insert = enable,
                Some(20) => self.modes.linefeed_newline = enable,
                Some(other) => {
                    tracing::debug!(mode = other, enable, "ignoring unknown ANSI mode")
                }
                None => {}
            }
        }
    }

    fn set_dec_modes(&mut self, csi: &CsiCommand, enable: bool) {
        for param in &csi.params {
            let Some(mode) = param.value() else { continue };
            match mode {
                1 => self.modes.cursor_keys_application = enable,
                3 => {
                    // DECCOLM: 132/80 columns, clear screen, home cursor.
                    let width = if enable { 132 } else { 80 };
                    self.resize(width, self.height);
                    self.scroll_top = 0;
                    self.scroll_bottom = self.height - 1;
                    self.erase_display(2);
                    self.cursor.x = 0;
                    self.cursor.y = 0;
                }
                4 => self.modes.smooth_scroll = enable,
                5 => self.modes.reverse_screen = enable,
                6 => {
                    self.modes.origin = enable;
                    self.cursor.y = if enable { self.scroll_top } else { 0 };
                    self.cursor.x = 0;
                }
                7 => self.modes.autowrap = enable,
                8 => self.modes.auto_repeat = enable,
                9 => {
                    self.modes.mouse = if enable {
                        MouseTracking::X10
                    } else {
                        MouseTracking::Off
                    };
                }
                12 => self.modes.cursor_blink = enable,
                25 => {
                    self.modes.cursor_visible = enable;
                    self.cursor.visible = enable;
                }
                47 => {
                    if enable {
                        self.enter_alt_screen(false);
                    } else {
                        self.exit_alt_screen();
                    }
                }
                66 => self.modes.application_keypad = enable,
                67 => self.modes.backarrow_sends_bs = enable,
                69 => self.modes.keyboard_usage = enable,
                1000 => {
                    self.modes.mouse = if enable {
                        MouseTracking::Normal
                    } else {
                        MouseTracking::Off
                    };
                }
                1002 => {
                    self.modes.mouse = if enable {
                        MouseTracking::ButtonEvent
                    } else {
                        MouseTracking::Off
                    };
                }
                1003 => {
                    self.modes.mouse = if enable {
                        MouseTracking::AnyEvent
                    } else {
                        MouseTracking::Off
                    };
                }
                1006 => self.modes.sgr_mouse = enable,
                1047 => {
                    if enable {
                        self.enter_alt_screen(true);
                    } else {
                        self.exit_alt_screen();
                    }
                }
                1048 => {
                    if enable {
                        self.save_cursor();
                    } else {
                        self.restore_cursor();
                    }
                }
                1049 => {
                    if enable {
                        self.save_cursor();
                        self.enter_alt_screen(true);
                    } else {
                        self.exit_alt_screen();
                        self.restore_cursor();
                    }
                }
                2004 => self.modes.bracketed_paste = enable,
                2028 => self.modes.auto_resize = enable,
                other => {
                    tracing::debug!(mode = other, enable, "ignoring unknown DEC mode")
                }
            }
        }
    }

    fn report_modes(&mut self, csi: &CsiCommand) {
        let private = csi.private == Some('?');
        if csi.params.is_empty() {
            self.respond_mode_state(0, None, private);
            return;
        }
        let params = csi.params.clone();
        for param in params {
            let Some(mode) = param.value() else { continue };
            let state = if private {
                self.dec_mode_state(mode)
            } else {
                self.ansi_mode_state(mode)
            };
            self.respond_mode_state(mode, state, private);
        }
    }

    fn respond_mode_state(&mut self, mode: u16, state: Option<bool>, private: bool) {
        let value = match state {
            Some(true) => 1,
            Some(false) => 2,
            None => 0,
        };
        let prefix = if private { "?" } else { "" };
        self.respond(&format!("\x1b[{}{};{}$y", prefix, mode, value));
    }

    fn ansi_mode_state(&self, mode: u16) -> Option<bool> {
        match mode {
            4 => Some(self.modes.insert),
            20 => Some(self.modes.linefeed_newline),
            _ => None,
        }
    }

    fn dec_mode_state(&self, mode: u16) -> Option<bool> {
        match mode {
            1 => Some(self.modes.cursor_keys_application),
            3 => Some(self.width == 132),
            4 => Some(self.modes.smooth_scroll),
            5 => Some(self.modes.reverse_screen),
            6 => Some(self.modes.origin),
            7 => Some(self.modes.autowrap),
            8 => Some(self.modes.auto_repeat),
            9 => Some(self.modes.mouse == MouseTracking::X10),
            12 => Some(self.modes.cursor_blink),
            25 => Some(self.modes.cursor_visible),
            47 | 1047 | 1049 => Some(self.using_alt),
            66 => Some(self.modes.application_keypad),
            67 => Some(self.modes.backarrow_sends_bs),
            69 => Some(self.modes.keyboard_usage),
            1000 => Some(self.modes.mouse == MouseTracking::Normal),
            1002 => Some(self.modes.mouse == MouseTracking::ButtonEvent),
            1003 => Some(self.modes.mouse == MouseTracking::AnyEvent),
            1006 => Some(self.modes.sgr_mouse),
            2004 => Some(self.modes.bracketed_paste),
            2028 => Some(self.modes.auto_resize),
            _ => None,
        }
    }

    fn respond(&mut self, s: &str) {
        self.output.extend_from_slice(s.as_bytes());
    }

    // ------------------------------------------------------------------
    // OSC dispatch

    fn dispatch_osc(&mut self, payload: &str) {
        let (number, data) = match payload.split_once(';') {
            Some((n, d)) => (n, d),
            None => (payload, ""),
        };
        let Ok(number) = number.parse::<u32>() else {
            tracing::debug!(payload, "ignoring OSC with invalid number");
            return;
        };
        match number {
            0 => {
                self.title = data.to_string();
                self.icon_title = data.to_string();
            }
            1 => self.icon_title = data.to_string(),
            2 => self.title = data.to_string(),
            4 => self.osc_palette(data),
            10 => self.osc_dynamic_color(10, data),
            11 => self.osc_dynamic_color(11, data),
            12 => self.osc_dynamic_color(12, data),
            52 => self.osc_clipboard(data),
            104 => {
                if data.is_empty() {
                    self.palette = [None; 256];
                } else {
                    for index in data.split(';').filter_map(|s| s.parse::<usize>().ok()) {
                        if let Some(slot) = self.palette.get_mut(index) {
                            *slot = None;
                        }
                    }
                }
            }
            110 => self.default_fg = None,
            111 => self.default_bg = None,
            112 => self.cursor_color = None,
            _ => tracing::debug!(number, "ignoring unknown OSC"),
        }
    }

    /// OSC 4: `index;spec` pairs; a spec of `?` queries the entry.
    fn osc_palette(&mut self, data: &str) {
        let parts: Vec<&str> = data.split(';').collect();
        for pair in parts.chunks(2) {
            let [index, spec] = pair else { continue };
            let Ok(index) = index.parse::<usize>() else {
                continue;
            };
            if index >= 256 {
                continue;
            }
            if *spec == "?" {
                let (r, g, b) = self.palette[index].unwrap_or_else(|| indexed_to_rgb(index as u8));
                let reply = format!(
                    "\x1b]4;{};{}\x07",
                    index,
                    Color::Rgb(r, g, b).to_x11_rgb((0, 0, 0))
                );
                self.respond(&reply);
            } else if let Some(Color::Rgb(r, g, b)) = Color::parse_spec(spec) {
                self.palette[index] = Some((r, g, b));
            }
        }
    }

    /// OSC 10/11/12: set or query the default foreground, background, and
    /// cursor colors.
    fn osc_dynamic_color(&mut self, number: u32, data: &str) {
        let (slot, fallback) = match number {
            10 => (&mut self.default_fg, (0xff, 0xff, 0xff)),
            11 => (&mut self.default_bg, (0x00, 0x00, 0x00)),
            _ => (&mut self.cursor_color, (0xff, 0xff, 0xff)),
        };
        if data == "?" {
            let color = slot.unwrap_or(Color::Default);
            let reply = format!("\x1b]{};{}\x07", number, color.to_x11_rgb(fallback));
            self.respond(&reply);
        } else if let Some(color) = Color::parse_spec(data) {
            *slot = Some(color);
        }
    }

    /// OSC 52: `target;payload` where the payload is base64 text, `?` to
    /// query, or empty to clear. Only the internal slot is touched.
    fn osc_clipboard(&mut self, data: &str) {
        let (target, payload) = match data.split_once(';') {
            Some((t, p)) => (t, p),
            None => return,
        };
        if payload == "?" {
            let encoded = BASE64_STANDARD.encode(self.clipboard.as_bytes());
            let reply = format!("\x1b]52;{};{}\x1b\\", target, encoded);
            self.respond(&reply);
            return;
        }
        if payload.is_empty() {
            self.clipboard.clear();
            return;
        }
        if let Ok(decoded) = BASE64_STANDARD.decode(payload.as_bytes()) {
            self.clipboard = String::from_utf8_lossy(&decoded).to_string();
        }
    }
}

fn default_tab_stops(width: usize) -> Vec<bool> {
    (0..width).map(|x| x % 8 == 0).collect()
}
