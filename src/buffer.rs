use bitflags::bitflags;

use crate::style::Style;

bitflags! {
    /// Per-cell flags for wide character tracking.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct CellFlags: u8 {
        /// This cell holds a wide (2-column) character
        const WIDE        = 1 << 0;
        /// This cell is the trailing spacer of a wide character
        const WIDE_SPACER = 1 << 1;
    }
}

/// A single terminal cell: one display character plus its style.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub ch: char,
    pub style: Style,
    pub flags: CellFlags,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            style: Style::default(),
            flags: CellFlags::empty(),
        }
    }
}

impl Cell {
    pub fn new(ch: char, style: Style) -> Self {
        Self {
            ch,
            style,
            flags: CellFlags::empty(),
        }
    }

    /// The trailing half of a wide character: no character, same style.
    pub fn wide_spacer(style: Style) -> Self {
        Self {
            ch: ' ',
            style,
            flags: CellFlags::WIDE_SPACER,
        }
    }

    /// Erase keeps only the background of the erasing style (ECMA-48).
    pub fn erased(style: &Style) -> Self {
        Self {
            ch: ' ',
            style: style.background_only(),
            flags: CellFlags::empty(),
        }
    }
}

/// A single row of cells.
#[derive(Debug, Clone)]
pub struct Row {
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn new(width: usize) -> Self {
        Self {
            cells: vec![Cell::default(); width],
        }
    }

    pub fn erase(&mut self, style: &Style) {
        let erased = Cell::erased(style);
        self.cells.fill(erased);
    }

    fn resize(&mut self, width: usize) {
        self.cells.resize(width, Cell::default());
    }

    /// Row text with wide spacers skipped and trailing blanks stripped.
    pub fn text(&self) -> String {
        let mut out: String = self
            .cells
            .iter()
            .filter(|c| !c.flags.contains(CellFlags::WIDE_SPACER))
            .map(|c| c.ch)
            .collect();
        while out.ends_with(' ') {
            out.pop();
        }
        out
    }
}

/// A `width x height` grid of cells. Out-of-bounds reads yield the default
/// cell; out-of-bounds writes are dropped.
#[derive(Debug, Clone)]
pub struct Buffer {
    rows: Vec<Row>,
    width: usize,
    height: usize,
}

impl Buffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            rows: (0..height).map(|_| Row::new(width)).collect(),
            width,
            height,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn row(&self, y: usize) -> Option<&Row> {
        self.rows.get(y)
    }

    pub fn cell(&self, x: usize, y: usize) -> Cell {
        self.rows
            .get(y)
            .and_then(|row| row.cells.get(x))
            .cloned()
            .unwrap_or_default()
    }

    pub fn set_cell(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width {
            if let Some(row) = self.rows.get_mut(y) {
                row.cells[x] = cell;
            }
        }
    }

    /// Erase cells in `[start_x, end_x)` of a row with the given style.
    pub fn erase_cells(&mut self, y: usize, start_x: usize, end_x: usize, style: &Style) {
        let width = self.width;
        if let Some(row) = self.rows.get_mut(y) {
            let erased = Cell::erased(style);
            for x in start_x..end_x.min(width) {
                row.cells[x] = erased.clone();
            }
        }
    }

    pub fn erase_row(&mut self, y: usize, style: &Style) {
        if let Some(row) = self.rows.get_mut(y) {
            row.erase(style);
        }
    }

    /// Insert blank cells at a position, shifting the rest of the line
    /// right; cells pushed past the margin are lost.
    pub fn insert_cells(&mut self, y: usize, x: usize, count: usize, style: &Style) {
        if x >= self.width {
            return;
        }
        if let Some(row) = self.rows.get_mut(y) {
            let count = count.min(row.cells.len() - x);
            for _ in 0..count {
                row.cells.pop();
                row.cells.insert(x, Cell::erased(style));
            }
        }
    }

    /// Delete cells at a position, shifting the rest left and filling the
    /// freed tail with blanks.
    pub fn delete_cells(&mut self, y: usize, x: usize, count: usize, style: &Style) {
        if x >= self.width {
            return;
        }
        if let Some(row) = self.rows.get_mut(y) {
            let count = count.min(row.cells.len() - x);
            for _ in 0..count {
                row.cells.remove(x);
                row.cells.push(Cell::erased(style));
            }
        }
    }

    /// Scroll rows `[top, bottom]` up by `n`; freed rows at the bottom are
    /// blanked with the given style.
    pub fn scroll_up(&mut self, top: usize, bottom: usize, n: usize, style: &Style) {
        if top > bottom || bottom >= self.height {
            return;
        }
        let n = n.min(bottom - top + 1);
        for _ in 0..n {
            let mut row = self.rows.remove(top);
            row.erase(style);
            self.rows.insert(bottom, row);
        }
    }

    /// Scroll rows `[top, bottom]` down by `n`; freed rows at the top are
    /// blanked with the given style.
    pub fn scroll_down(&mut self, top: usize, bottom: usize, n: usize, style: &Style) {
        if top > bottom || bottom >= self.height {
            return;
        }
        let n = n.min(bottom - top + 1);
        for _ in 0..n {
            let mut row = self.rows.remove(bottom);
            row.erase(style);
            self.rows.insert(top, row);
        }
    }

    /// Resize preserving top-left content: width growth pads rows, width
    /// shrink truncates, height growth appends blank rows, height shrink
    /// drops trailing rows.
    pub fn resize(&mut self, width: usize, height: usize) {
        for row in &mut self.rows {
            row.resize(width);
        }
        if height > self.height {
            self.rows
                .extend((self.height..height).map(|_| Row::new(width)));
        } else {
            self.rows.truncate(height);
        }
        self.width = width;
        self.height = height;
    }

    /// Plain-text snapshot: rows joined with LF, trailing spaces stripped
    /// per row, trailing empty rows dropped.
    pub fn capture(&self) -> String {
        let mut lines: Vec<String> = self.rows.iter().map(Row::text).collect();
        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
        lines.join("\n")
    }
}
