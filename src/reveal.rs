//! Streaming reveal of replacement content
//!
//! A reveal grows the content of the replacement marker one character per
//! tick, then drops the marker tags. `RevealTask` is the pure stepper;
//! `Revealer` adds the timer, driven by deadlines the host loop polls, and
//! cooperative cancellation.

use std::cell::Cell;
use std::ops::Range;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{MarkswapError, Result};
use crate::markup::{Lexer, MARKER_CLOSE, MARKER_TAG};

/// Default delay between ticks
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(10);

/// Byte spans of the marker tags in a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerBounds {
    /// Span of the open tag
    pub open: Range<usize>,
    /// Span of the close tag
    pub close: Range<usize>,
}

impl MarkerBounds {
    /// Span between the two tags
    pub fn content(&self) -> Range<usize> {
        self.open.end..self.close.start
    }
}

fn close_tag_at(doc: &str, at: usize) -> bool {
    doc.as_bytes()
        .get(at..at + MARKER_CLOSE.len())
        .is_some_and(|b| b.eq_ignore_ascii_case(MARKER_CLOSE.as_bytes()))
}

/// Find the replacement marker in a document
///
/// The open tag is found by lexing. When `written` is the byte length of the
/// content a reveal put there on its previous tick, the close tag is expected
/// right after it, which keeps half-written markup from hiding it. Otherwise
/// the close tag is the next marker end tag the lexer sees, falling back to a
/// literal search if the content does not lex.
///
/// Returns `Ok(None)` when there is no marker and `Err` when the markup before
/// the open tag is malformed.
pub fn locate_marker(doc: &str, written: Option<usize>) -> Result<Option<MarkerBounds>> {
    let mut lexer = Lexer::new(doc);
    let open = loop {
        match lexer.next() {
            None => return Ok(None),
            Some(Err(e)) => return Err(e),
            Some(Ok(token)) if token.is_start_tag(MARKER_TAG) => break token.span,
            Some(Ok(_)) => {}
        }
    };

    if let Some(len) = written {
        let at = open.end + len;
        if close_tag_at(doc, at) {
            return Ok(Some(MarkerBounds {
                open,
                close: at..at + MARKER_CLOSE.len(),
            }));
        }
        tracing::warn!(at, "marker close not where the last tick left it");
    }

    let lexed = lexer.find_map(|token| match token {
        Ok(token) if token.is_end_tag(MARKER_TAG) => Some(Some(token.span)),
        Ok(_) => None,
        Err(_) => Some(None),
    });
    let close = match lexed.flatten() {
        Some(span) => Some(span),
        None => doc[open.end..].find(MARKER_CLOSE).map(|rel| {
            let at = open.end + rel;
            at..at + MARKER_CLOSE.len()
        }),
    };

    match close {
        Some(close) => Ok(Some(MarkerBounds { open, close })),
        None => {
            tracing::warn!(offset = open.start, "replacement marker has no close tag");
            Ok(None)
        }
    }
}

/// Replace the marker and everything in it with `text`
pub fn replace_marker(doc: &str, text: &str) -> Result<String> {
    let bounds = locate_marker(doc, None)?.ok_or(MarkswapError::MarkerMissing)?;
    let mut out = String::with_capacity(doc.len() + text.len());
    out.push_str(&doc[..bounds.open.start]);
    out.push_str(text);
    out.push_str(&doc[bounds.close.end..]);
    Ok(out)
}

/// Outcome of one reveal step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// No usable marker in the document; nothing changed
    Waiting,
    /// The marker now shows this many characters of the target
    Progress(usize),
    /// The marker tags were removed
    Finished,
    /// The reveal already finished
    Done,
}

/// Pure reveal stepper
#[derive(Debug, Clone)]
pub struct RevealTask {
    target: String,
    total: usize,
    shown: usize,
    /// Bytes written inside the marker on the last tick
    written: Option<usize>,
    finished: bool,
}

impl RevealTask {
    pub fn new(target: impl Into<String>) -> Self {
        let target = target.into();
        let total = target.chars().count();
        Self {
            target,
            total,
            shown: 0,
            written: None,
            finished: false,
        }
    }

    /// The full replacement text
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Characters shown so far
    pub fn shown(&self) -> usize {
        self.shown
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Apply one tick to `doc`
    ///
    /// The next document is built in full before it replaces `doc`.
    pub fn tick(&mut self, doc: &mut String) -> Tick {
        if self.finished {
            return Tick::Done;
        }

        let bounds = match locate_marker(doc, self.written) {
            Ok(Some(bounds)) => bounds,
            Ok(None) => return Tick::Waiting,
            Err(e) => {
                tracing::warn!(error = %e, "cannot locate marker, skipping tick");
                return Tick::Waiting;
            }
        };

        if self.written.is_none() || self.shown < self.total {
            self.shown = (self.shown + 1).min(self.total);
            let end = self
                .target
                .char_indices()
                .nth(self.shown)
                .map_or(self.target.len(), |(i, _)| i);
            let prefix = &self.target[..end];

            let mut next = String::with_capacity(doc.len() + prefix.len());
            next.push_str(&doc[..bounds.open.end]);
            next.push_str(prefix);
            next.push_str(&doc[bounds.close.start..]);
            *doc = next;

            self.written = Some(prefix.len());
            tracing::trace!(shown = self.shown, total = self.total, "reveal tick");
            return Tick::Progress(self.shown);
        }

        let mut next = String::with_capacity(doc.len());
        next.push_str(&doc[..bounds.open.start]);
        next.push_str(&doc[bounds.content()]);
        next.push_str(&doc[bounds.close.end..]);
        *doc = next;

        self.finished = true;
        tracing::debug!(chars = self.total, "reveal finished");
        Tick::Finished
    }
}

/// Stops a running reveal
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    cancelled: Rc<Cell<bool>>,
}

impl CancelHandle {
    /// Stop further ticks; content already written stays
    pub fn cancel(&self) {
        self.cancelled.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}

struct ActiveReveal {
    task: RevealTask,
    on_tick: Box<dyn FnMut(&str)>,
    cancel: CancelHandle,
    next_due: Instant,
}

/// Timer around a `RevealTask`
///
/// At most one reveal runs at a time. The host calls `poll` whenever the
/// deadline from `next_deadline` passes (or earlier; early polls do nothing).
pub struct Revealer {
    interval: Duration,
    active: Option<ActiveReveal>,
}

impl Default for Revealer {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_INTERVAL)
    }
}

impl Revealer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            active: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Check if a reveal is running
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// When the next tick is due
    pub fn next_deadline(&self) -> Option<Instant> {
        self.active.as_ref().map(|a| a.next_due)
    }

    /// Start revealing `target` into the document's marker
    ///
    /// The first tick is due one interval after `now`. `on_tick` sees the
    /// document after every tick that changed it.
    pub fn start<F>(&mut self, target: impl Into<String>, on_tick: F, now: Instant) -> Result<CancelHandle>
    where
        F: FnMut(&str) + 'static,
    {
        if self.is_active() {
            return Err(MarkswapError::RevealAlreadyActive);
        }

        let task = RevealTask::new(target);
        tracing::debug!(chars = task.total, "reveal started");
        let cancel = CancelHandle::default();
        self.active = Some(ActiveReveal {
            task,
            on_tick: Box::new(on_tick),
            cancel: cancel.clone(),
            next_due: now + self.interval,
        });
        Ok(cancel)
    }

    /// Apply every tick due at `now`, returning how many changed the document
    pub fn poll(&mut self, doc: &mut String, now: Instant) -> usize {
        let mut applied = 0;
        while let Some(active) = self.active.as_mut() {
            if active.cancel.is_cancelled() {
                tracing::debug!(shown = active.task.shown(), "reveal cancelled");
                self.active = None;
                break;
            }
            if now < active.next_due {
                break;
            }

            match active.task.tick(doc) {
                Tick::Waiting => {
                    active.next_due = now + self.interval;
                    break;
                }
                Tick::Progress(_) => {
                    (active.on_tick)(doc);
                    active.next_due += self.interval;
                    applied += 1;
                }
                Tick::Finished => {
                    (active.on_tick)(doc);
                    applied += 1;
                    self.active = None;
                }
                Tick::Done => self.active = None,
            }
        }
        applied
    }

    /// Stop the running reveal, if any
    pub fn cancel(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel.cancel();
        }
    }

    /// Reveal `target` into `doc`, sleeping between ticks
    ///
    /// For non-interactive use. Fails with `MarkerMissing` if the document
    /// has no marker when a tick comes due.
    pub fn run_to_completion<F>(&self, target: &str, doc: &mut String, mut on_tick: F) -> Result<()>
    where
        F: FnMut(&str),
    {
        if self.is_active() {
            return Err(MarkswapError::RevealAlreadyActive);
        }

        let mut task = RevealTask::new(target);
        loop {
            thread::sleep(self.interval);
            match task.tick(doc) {
                Tick::Waiting => return Err(MarkswapError::MarkerMissing),
                Tick::Progress(_) => on_tick(doc),
                Tick::Finished => {
                    on_tick(doc);
                    return Ok(());
                }
                Tick::Done => return Ok(()),
            }
        }
    }
}
