//! VT-compatible terminal emulation engine.
//!
//! The crate consumes the byte stream a child process writes and keeps an
//! in-memory model of what a VT-family terminal would display: two cell
//! buffers, a cursor, scroll region, modes, charset state, and a style
//! engine. It performs no I/O of its own — the host owns the PTY, feeds
//! bytes in with [`Terminal::feed`], drains query replies and encoded
//! input with [`Terminal::drain_responses`], and reads renderable state
//! back out through [`Terminal::capture_pane`] and the line accessors.
//!
//! ```
//! use rainvt::Terminal;
//!
//! let mut term = Terminal::new(80, 24);
//! term.feed(b"\x1b[1;31mhello\x1b[0m");
//! assert!(term.capture_pane().starts_with("hello"));
//! ```

mod buffer;
mod charset;
mod color;
mod cursor;
mod input;
mod modes;
mod parser;
mod span;
mod style;
mod terminal;
mod utf8;

pub use buffer::{Buffer, Cell, CellFlags, Row};
pub use charset::{Charset, CharsetState};
pub use color::{indexed_to_rgb, Color, SerializableColor};
pub use cursor::{Cursor, SavedCursor};
pub use input::{Key, Modifiers, MouseButton, MouseEventKind, NumpadKey};
pub use modes::{Modes, MouseTracking};
pub use parser::{Command, CsiCommand, CsiParam, Parser};
pub use span::StyledSpan;
pub use style::{Attrs, Style, StyleCache};
pub use terminal::Terminal;
pub use utf8::Utf8Decoder;
