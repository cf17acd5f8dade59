//! App state and main loop

use std::time::{Duration, Instant};

use crate::display::{Display, Frame};
use crate::error::Result;
use crate::input::{self, special, AppEvent, Key, PointerAction};
use crate::session::{CommitMode, Session};
use crate::selection::PointerEvent;
use crate::terminal::Terminal;

/// How long to wait for input when no reveal tick is pending
const IDLE_POLL: Duration = Duration::from_millis(250);

/// Longest stretch of selected text echoed in the prompt
const PROMPT_EXCERPT: usize = 32;

/// What the minibuffer prompt is collecting text for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PromptAction {
    /// Replacement for the finalized selection
    Replace,
    /// Text to stream into a marker already in the document
    Reveal,
}

/// Interactive session on a terminal
pub struct App {
    session: Session,
    terminal: Terminal,
    display: Display,
    /// Name shown in the mode line
    name: String,
    mode: CommitMode,
    /// Replacement text typed so far
    input: String,
    /// Set while the reveal prompt is open
    reveal_prompt: bool,
    running: bool,
}

impl App {
    pub fn new(terminal: Terminal, session: Session, name: impl Into<String>, mode: CommitMode) -> Self {
        Self {
            session,
            terminal,
            display: Display::new(),
            name: name.into(),
            mode,
            input: String::new(),
            reveal_prompt: false,
            running: true,
        }
    }

    /// Run until the user quits, returning the final document
    ///
    /// The terminal is restored before this returns.
    pub fn run(mut self) -> Result<String> {
        self.display.force_redraw();
        self.display
            .set_message("Drag across text to select it; m cycles mode; q quits");

        while self.running {
            let frame = Frame {
                annotated: self.session.annotated(),
                highlight: self.session.highlight(),
                status: status_text(&self.name, &self.session, self.mode),
                prompt: self.prompt_text(),
            };
            self.display.render(&mut self.terminal, &frame)?;

            let timeout = self
                .session
                .next_deadline()
                .map_or(IDLE_POLL, |due| due.saturating_duration_since(Instant::now()));
            if self.terminal.poll_event(timeout)? {
                let event = self.terminal.read_event()?;
                if let Some(event) = input::translate_event(event) {
                    self.handle_event(event)?;
                }
            }

            if self.session.poll(Instant::now()) && !self.session.is_revealing() {
                self.display.set_message("Replacement done");
            }
        }

        Ok(self.session.document().to_string())
    }

    fn handle_event(&mut self, event: AppEvent) -> Result<()> {
        match event {
            AppEvent::Resize => {
                self.terminal.update_size()?;
                self.display.force_redraw();
            }
            AppEvent::Pointer { action, row, col } => {
                let target = self.display.target_at(row, col);
                let event = match action {
                    PointerAction::Press => PointerEvent::Press(target),
                    PointerAction::Drag => PointerEvent::Move(target),
                    PointerAction::Release => PointerEvent::Release(target),
                };
                if self.session.handle_pointer(event).is_some() {
                    self.reveal_prompt = false;
                    self.display.clear_message();
                }
                if self.active_prompt().is_none() {
                    self.input.clear();
                }
            }
            AppEvent::Key(key) => match self.active_prompt() {
                Some(action) => self.handle_prompt_key(action, key)?,
                None => self.handle_key(key)?,
            },
        }
        Ok(())
    }

    /// Handle a key while no prompt is open
    fn handle_key(&mut self, key: Key) -> Result<()> {
        if key == Key::char('q') || key == Key::ctrl('c') {
            self.running = false;
        } else if key == Key::escape() || key == Key::ctrl('g') {
            let message = cancel_or_dismiss(&mut self.session);
            self.display.set_message(message);
        } else if key == Key::char('s') {
            self.open_reveal_prompt();
        } else if key == Key::char('m') {
            self.mode = self.mode.next();
            self.display.set_message(format!("Commit mode: {}", self.mode));
        } else if key == Key::ctrl('l') {
            self.display.force_redraw();
        } else if key == Key::special(special::UP) {
            self.display.scroll_by(-1);
        } else if key == Key::special(special::DOWN) {
            self.display.scroll_by(1);
        } else if key == Key::special(special::PAGE_UP) {
            self.display.scroll_by(-(self.display.page_rows() as isize));
        } else if key == Key::special(special::PAGE_DOWN) {
            self.display.scroll_by(self.display.page_rows() as isize);
        }
        Ok(())
    }

    /// Which prompt, if any, owns the keyboard
    fn active_prompt(&self) -> Option<PromptAction> {
        if self.reveal_prompt {
            Some(PromptAction::Reveal)
        } else if self.session.tracker().is_awaiting_input() {
            Some(PromptAction::Replace)
        } else {
            None
        }
    }

    /// Ask for text to stream into a marker left by a marker-only commit or
    /// a cancelled reveal
    fn open_reveal_prompt(&mut self) {
        if self.session.is_revealing() {
            self.display.set_message("A reveal is already running");
        } else if self.session.has_marker() {
            self.session.dismiss();
            self.input.clear();
            self.reveal_prompt = true;
        } else {
            self.display.set_message("No marker to stream into");
        }
    }

    /// Handle a key while a prompt is open
    fn handle_prompt_key(&mut self, action: PromptAction, key: Key) -> Result<()> {
        // C-g and Esc abort
        if key == Key::ctrl('g') || key == Key::escape() {
            self.session.dismiss();
            self.reveal_prompt = false;
            self.input.clear();
            self.display.set_message("Cancelled");
            return Ok(());
        }

        if key == Key::enter() {
            let text = std::mem::take(&mut self.input);
            let result = match action {
                PromptAction::Replace => self.commit(&text),
                PromptAction::Reveal => self.start_reveal(&text),
            };
            if let Err(e) = result {
                self.input = text;
                self.display.set_message(e.to_string());
                let _ = self.terminal.beep();
            }
            return Ok(());
        }

        if key == Key::backspace() || key == Key::ctrl('h') {
            self.input.pop();
            return Ok(());
        }

        if key.is_self_insert() {
            if let Some(ch) = key.base_char() {
                self.input.push(ch);
            }
            return Ok(());
        }

        // Unknown key - beep
        self.display
            .set_message(format!("{} does nothing here", key.display_name()));
        let _ = self.terminal.beep();
        Ok(())
    }

    fn commit(&mut self, replacement: &str) -> Result<()> {
        match self.session.commit(replacement, self.mode, Instant::now())? {
            Some(commit) => self.display.set_message(format!(
                "Replacing \"{}\" ({})",
                excerpt(&commit.original),
                commit.mode
            )),
            None => self.display.set_message("No selection"),
        }
        Ok(())
    }

    fn start_reveal(&mut self, text: &str) -> Result<()> {
        self.session.reveal(text, Instant::now())?;
        self.reveal_prompt = false;
        self.display.set_message("Streaming into marker");
        Ok(())
    }

    fn prompt_text(&self) -> Option<String> {
        match self.active_prompt()? {
            PromptAction::Replace => {
                let selected = self.session.selected_text().unwrap_or_default();
                Some(format!(
                    "Replace \"{}\" ({}): {}",
                    excerpt(&selected),
                    self.mode,
                    self.input
                ))
            }
            PromptAction::Reveal => Some(format!("Stream into marker: {}", self.input)),
        }
    }
}

/// Stop a running reveal, or else drop the selection
fn cancel_or_dismiss(session: &mut Session) -> &'static str {
    if session.is_revealing() {
        session.cancel_reveal();
        "Reveal cancelled; s streams into the marker"
    } else {
        session.dismiss();
        "Selection cleared"
    }
}

/// Selected text squeezed onto one line and shortened
fn excerpt(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= PROMPT_EXCERPT {
        flat
    } else {
        let head: String = flat.chars().take(PROMPT_EXCERPT - 3).collect();
        format!("{}...", head)
    }
}

/// Mode line text
pub fn status_text(name: &str, session: &Session, mode: CommitMode) -> String {
    let selection = match session.tracker().interval() {
        Some(interval) => format!("selected {}-{}", interval.start, interval.end),
        None => "no selection".to_string(),
    };
    let mut status = format!(
        "-- markswap: {} | {} segments | {} | {} ",
        name,
        session.segments().len(),
        selection,
        mode
    );
    if session.is_revealing() {
        status.push_str("| streaming ");
    } else if session.has_marker() {
        status.push_str("| marker ");
    }
    if session.is_stale() {
        status.push_str("| malformed ");
    }
    status
}
