//! Display rendering
//!
//! Lays segments out the way a browser would flow inline text: block elements
//! start new rows, whitespace runs collapse to one cell and words wrap at the
//! screen width. Every cell remembers which segment it shows so pointer
//! positions can be turned back into segment indices.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::error::Result;
use crate::highlight::Highlight;
use crate::markup::{Fragment, NodeId, NodeKind, MARKER_TAG};
use crate::segment::{self, SegmentKind};
use crate::selection::PointerTarget;
use crate::style::Style;
use crate::terminal::Terminal;

const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "figcaption", "figure",
    "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav",
    "ol", "p", "pre", "section", "table", "tr", "ul",
];

fn is_block_element(name: &str) -> bool {
    BLOCK_ELEMENTS.contains(&name)
}

/// One painted character
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Glyph {
    pub ch: char,
    /// First screen column
    pub col: usize,
    /// Columns occupied
    pub width: usize,
    /// Segment this character belongs to
    pub segment: usize,
    /// Inside the replacement marker
    pub in_marker: bool,
}

/// Segments flowed into screen rows
#[derive(Debug, Clone, Default)]
pub struct Layout {
    rows: Vec<Vec<Glyph>>,
}

struct LayoutBuilder {
    width: usize,
    rows: Vec<Vec<Glyph>>,
    current: Vec<Glyph>,
    col: usize,
}

impl LayoutBuilder {
    /// End the current row if it has anything in it
    fn break_row(&mut self) {
        if !self.current.is_empty() {
            self.force_break();
        }
    }

    fn force_break(&mut self) {
        self.rows.push(std::mem::take(&mut self.current));
        self.col = 0;
    }

    fn push_glyph(&mut self, ch: char, width: usize, segment: usize, in_marker: bool) {
        self.current.push(Glyph {
            ch,
            col: self.col,
            width,
            segment,
            in_marker,
        });
        self.col += width;
    }

    fn push_word(&mut self, text: &str, segment: usize, in_marker: bool) {
        if self.col > 0 && self.col + text.width() > self.width {
            self.break_row();
        }
        for ch in text.chars().filter(|c| !c.is_control()) {
            let width = ch.width().unwrap_or(0);
            if self.col > 0 && self.col + width > self.width {
                self.break_row();
            }
            self.push_glyph(ch, width, segment, in_marker);
        }
    }

    /// Whitespace collapses to one cell and never starts a row
    fn push_space(&mut self, segment: usize, in_marker: bool) {
        if self.col == 0 || self.current.last().is_some_and(|g| g.ch == ' ') {
            return;
        }
        if self.col + 1 > self.width {
            self.break_row();
            return;
        }
        self.push_glyph(' ', 1, segment, in_marker);
    }

    fn walk(&mut self, fragment: &Fragment, id: NodeId, in_marker: bool) {
        let NodeKind::Element(element) = &fragment.node(id).kind else {
            return;
        };

        if let Some((index, kind)) = segment::recognize(element) {
            match kind {
                SegmentKind::Word => {
                    let text = segment::wrapper_text(fragment, id);
                    self.push_word(&text, index, in_marker);
                }
                SegmentKind::Space => self.push_space(index, in_marker),
            }
            return;
        }

        if element.name == "br" {
            self.force_break();
            return;
        }

        let block = is_block_element(&element.name);
        if block {
            self.break_row();
        }
        let in_marker = in_marker || element.name == MARKER_TAG;
        for &child in fragment.children_of(Some(id)) {
            self.walk(fragment, child, in_marker);
        }
        if block {
            self.break_row();
        }
    }
}

impl Layout {
    /// Flow the segments of annotated markup into rows `width` columns wide
    pub fn build(annotated: &str, width: usize) -> Result<Self> {
        let fragment = Fragment::parse(annotated)?;
        let mut builder = LayoutBuilder {
            width: width.max(1),
            rows: Vec::new(),
            current: Vec::new(),
            col: 0,
        };
        for &root in fragment.roots() {
            builder.walk(&fragment, root, false);
        }
        builder.break_row();
        Ok(Self { rows: builder.rows })
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, row: usize) -> Option<&[Glyph]> {
        self.rows.get(row).map(Vec::as_slice)
    }

    /// Text shown on a row
    pub fn row_text(&self, row: usize) -> String {
        self.row(row)
            .map(|glyphs| glyphs.iter().map(|g| g.ch).collect())
            .unwrap_or_default()
    }

    /// Segment shown at a layout cell
    pub fn segment_at(&self, row: usize, col: usize) -> Option<usize> {
        self.row(row)?
            .iter()
            .find(|g| g.width > 0 && col >= g.col && col < g.col + g.width)
            .map(|g| g.segment)
    }
}

/// Everything the display needs for one frame
#[derive(Debug, Clone)]
pub struct Frame<'a> {
    pub annotated: &'a str,
    pub highlight: Highlight,
    /// Mode line text
    pub status: String,
    /// Replacement prompt text when the dialog is open
    pub prompt: Option<String>,
}

/// Display state
pub struct Display {
    /// Whether a full redraw is needed
    needs_redraw: bool,
    /// Message to show in the minibuffer (bottom line)
    message: Option<String>,
    layout: Layout,
    /// First layout row on screen
    scroll: usize,
    /// Screen rows used for content
    content_rows: usize,
    /// Whether the prompt occupied the minibuffer on the last render
    prompt_visible: bool,
}

impl Display {
    pub fn new() -> Self {
        Self {
            needs_redraw: true,
            message: None,
            layout: Layout::default(),
            scroll: 0,
            content_rows: 0,
            prompt_visible: false,
        }
    }

    /// Mark that a full redraw is needed
    pub fn force_redraw(&mut self) {
        self.needs_redraw = true;
    }

    /// Set a message to display
    pub fn set_message(&mut self, msg: impl Into<String>) {
        self.message = Some(msg.into());
    }

    /// Clear the message
    pub fn clear_message(&mut self) {
        self.message = None;
    }

    /// Scroll the content by `delta` rows
    pub fn scroll_by(&mut self, delta: isize) {
        self.scroll = self.scroll.saturating_add_signed(delta);
        self.clamp_scroll();
        self.needs_redraw = true;
    }

    /// Rows to move for a page scroll
    pub fn page_rows(&self) -> usize {
        self.content_rows.saturating_sub(1).max(1)
    }

    fn clamp_scroll(&mut self) {
        let max = self.layout.row_count().saturating_sub(self.content_rows.max(1));
        self.scroll = self.scroll.min(max);
    }

    /// Turn a screen cell into a pointer target
    ///
    /// Content rows map to segments (or the bare surface), the minibuffer row
    /// is the dialog while the prompt shows, anything else is outside.
    pub fn target_at(&self, row: u16, col: u16) -> PointerTarget {
        let row = row as usize;
        if row < self.content_rows {
            return match self.layout.segment_at(self.scroll + row, col as usize) {
                Some(index) => PointerTarget::Segment(index),
                None => PointerTarget::Surface,
            };
        }
        if self.prompt_visible && row == self.content_rows + 1 {
            PointerTarget::Dialog
        } else {
            PointerTarget::Outside
        }
    }

    /// Render a frame
    pub fn render(&mut self, terminal: &mut Terminal, frame: &Frame<'_>) -> Result<()> {
        let cols = terminal.cols() as usize;
        let rows = terminal.rows() as usize;
        // one row for the mode line, one for the minibuffer
        self.content_rows = rows.saturating_sub(2);

        match Layout::build(frame.annotated, cols) {
            Ok(layout) => self.layout = layout,
            Err(e) => tracing::warn!(error = %e, "layout failed, keeping previous frame"),
        }
        self.clamp_scroll();

        if self.needs_redraw {
            terminal.clear_screen()?;
        }

        for screen_row in 0..self.content_rows {
            terminal.move_cursor(screen_row as u16, 0)?;
            if let Some(glyphs) = self.layout.row(self.scroll + screen_row) {
                paint_row(terminal, glyphs, &frame.highlight)?;
            }
            terminal.clear_to_eol()?;
        }

        self.render_mode_line(terminal, &frame.status, self.content_rows as u16, cols)?;
        self.render_minibuffer(terminal, frame.prompt.as_deref(), rows.saturating_sub(1) as u16, cols)?;

        terminal.flush()?;
        self.needs_redraw = false;
        Ok(())
    }

    fn render_mode_line(&self, terminal: &mut Terminal, status: &str, row: u16, cols: usize) -> Result<()> {
        terminal.move_cursor(row, 0)?;
        terminal.set_reverse(true)?;

        let line = truncate_to_width(status, cols);
        let pad = cols.saturating_sub(line.width());
        terminal.write_str(&line)?;
        terminal.write_str(&"-".repeat(pad))?;

        terminal.set_reverse(false)?;
        Ok(())
    }

    /// Render the minibuffer: the prompt if open, otherwise the message
    fn render_minibuffer(&mut self, terminal: &mut Terminal, prompt: Option<&str>, row: u16, cols: usize) -> Result<()> {
        terminal.move_cursor(row, 0)?;
        self.prompt_visible = prompt.is_some();

        match prompt {
            Some(prompt) => {
                let shown = truncate_to_width(prompt, cols.saturating_sub(1));
                terminal.write_str(&shown)?;
                terminal.clear_to_eol()?;
                terminal.move_cursor(row, shown.width() as u16)?;
                terminal.set_cursor_visible(true)?;
            }
            None => {
                if let Some(ref msg) = self.message {
                    terminal.write_str(&truncate_to_width(msg, cols))?;
                }
                terminal.clear_to_eol()?;
                terminal.set_cursor_visible(false)?;
            }
        }
        Ok(())
    }
}

impl Default for Display {
    fn default() -> Self {
        Self::new()
    }
}

/// Paint a row, batching runs of equal style
fn paint_row(terminal: &mut Terminal, glyphs: &[Glyph], highlight: &Highlight) -> Result<()> {
    let mut run = String::new();
    let mut run_style = Style::default();

    for glyph in glyphs {
        let style = highlight.style_for(glyph.segment, glyph.in_marker);
        if style != run_style && !run.is_empty() {
            write_run(terminal, &run, &run_style)?;
            run.clear();
        }
        run_style = style;
        run.push(glyph.ch);
    }
    if !run.is_empty() {
        write_run(terminal, &run, &run_style)?;
    }
    Ok(())
}

fn write_run(terminal: &mut Terminal, text: &str, style: &Style) -> Result<()> {
    if style.is_default() {
        return terminal.write_str(text);
    }
    terminal.apply_style(style)?;
    terminal.write_str(text)?;
    terminal.reset_attributes()
}

/// Truncate a string to fit within a display width
fn truncate_to_width(s: &str, max_width: usize) -> String {
    let mut result = String::new();
    let mut width = 0;

    for ch in s.chars() {
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(1);
        if width + ch_width > max_width {
            break;
        }
        result.push(ch);
        width += ch_width;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;

    fn layout(markup: &str, width: usize) -> Layout {
        Layout::build(&tokenize(markup).unwrap(), width).unwrap()
    }

    fn rows(layout: &Layout) -> Vec<String> {
        (0..layout.row_count()).map(|r| layout.row_text(r)).collect()
    }

    #[test]
    fn test_block_elements_start_rows() {
        let layout = layout("<h2>Title</h2><p>Static Typing helps</p>", 80);
        assert_eq!(rows(&layout), vec!["Title", "Static Typing helps"]);
    }

    #[test]
    fn test_whitespace_collapses() {
        let layout = layout("\n  <div>\n <p>a  \n b</p>  </div>\n", 80);
        assert_eq!(rows(&layout), vec!["a b"]);
    }

    #[test]
    fn test_inline_elements_flow() {
        let layout = layout("<p>These are <em>fundamental</em> to</p>", 80);
        assert_eq!(rows(&layout), vec!["These are fundamental to"]);
    }

    #[test]
    fn test_words_wrap() {
        let layout = layout("<p>Static Typing helps</p>", 10);
        let text: Vec<String> = rows(&layout).iter().map(|r| r.trim_end().to_string()).collect();
        assert_eq!(text, vec!["Static", "Typing", "helps"]);
    }

    #[test]
    fn test_long_word_breaks() {
        let layout = layout("<p>abcdefgh</p>", 3);
        assert_eq!(rows(&layout), vec!["abc", "def", "gh"]);
    }

    #[test]
    fn test_line_breaks() {
        let layout = layout("<p>a<br>b<br><br>c</p>", 80);
        assert_eq!(rows(&layout), vec!["a", "b", "", "c"]);
    }

    #[test]
    fn test_wide_chars() {
        let layout = layout("<p>日本 x</p>", 80);
        assert_eq!(layout.segment_at(0, 0), Some(0));
        assert_eq!(layout.segment_at(0, 3), Some(0));
        assert_eq!(layout.segment_at(0, 4), Some(1));
        assert_eq!(layout.segment_at(0, 5), Some(2));
    }

    #[test]
    fn test_hit_testing() {
        let layout = layout("<h2>Title</h2><p>Static Typing helps</p>", 80);
        // "Title" is segment 0; "Static" 1, " " 2, "Typing" 3
        assert_eq!(layout.segment_at(0, 0), Some(0));
        assert_eq!(layout.segment_at(0, 4), Some(0));
        assert_eq!(layout.segment_at(0, 5), None);
        assert_eq!(layout.segment_at(1, 0), Some(1));
        assert_eq!(layout.segment_at(1, 6), Some(2));
        assert_eq!(layout.segment_at(1, 7), Some(3));
        assert_eq!(layout.segment_at(1, 40), None);
        assert_eq!(layout.segment_at(9, 0), None);
    }

    #[test]
    fn test_marker_content_flagged() {
        let layout = layout("<p><replace>x</replace> y</p>", 80);
        let row = layout.row(0).unwrap();
        assert_eq!(row.len(), 3);
        assert!(row[0].in_marker);
        assert!(!row[2].in_marker);
    }

    #[test]
    fn test_target_at() {
        let mut display = Display::new();
        display.layout = layout("<p>one two</p>", 80);
        display.content_rows = 5;
        display.prompt_visible = true;
        assert_eq!(display.target_at(0, 1), PointerTarget::Segment(0));
        assert_eq!(display.target_at(0, 30), PointerTarget::Surface);
        assert_eq!(display.target_at(4, 0), PointerTarget::Surface);
        assert_eq!(display.target_at(5, 0), PointerTarget::Outside);
        assert_eq!(display.target_at(6, 0), PointerTarget::Dialog);

        display.prompt_visible = false;
        assert_eq!(display.target_at(6, 0), PointerTarget::Outside);
    }

    #[test]
    fn test_truncate_to_width() {
        assert_eq!(truncate_to_width("hello", 3), "hel");
        assert_eq!(truncate_to_width("日本語", 5), "日本");
        assert_eq!(truncate_to_width("hi", 10), "hi");
    }
}
