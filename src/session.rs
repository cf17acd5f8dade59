//! Session: one document, its selection and its reveal
//!
//! The session keeps the clean document (no addressing wrappers) as the
//! source of truth and re-derives the annotated form whenever the document
//! changes.

use std::fmt;
use std::time::{Duration, Instant};

use crate::error::{MarkswapError, Result};
use crate::highlight::Highlight;
use crate::marker;
use crate::reveal::{self, CancelHandle, Revealer};
use crate::segment::Segment;
use crate::selection::{PointerEvent, RangeTracker, SelectionInterval};
use crate::tokenizer;

/// What a commit does once the marker is in place
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommitMode {
    /// Reveal the replacement one character per tick
    #[default]
    Stream,
    /// Swap the replacement in at once
    Immediate,
    /// Leave the marker around the original text
    MarkerOnly,
}

impl CommitMode {
    /// Parse a mode name as written in config files and on the command line
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stream" => Some(CommitMode::Stream),
            "immediate" => Some(CommitMode::Immediate),
            "marker-only" | "marker" => Some(CommitMode::MarkerOnly),
            _ => None,
        }
    }

    /// The following mode, wrapping around
    pub fn next(self) -> Self {
        match self {
            CommitMode::Stream => CommitMode::Immediate,
            CommitMode::Immediate => CommitMode::MarkerOnly,
            CommitMode::MarkerOnly => CommitMode::Stream,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CommitMode::Stream => "stream",
            CommitMode::Immediate => "immediate",
            CommitMode::MarkerOnly => "marker-only",
        }
    }
}

impl fmt::Display for CommitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record of an accepted commit
#[derive(Debug, Clone)]
pub struct Commit {
    pub interval: SelectionInterval,
    /// Literal text that was selected
    pub original: String,
    pub replacement: String,
    pub mode: CommitMode,
    /// Set when the commit started a reveal
    pub reveal: Option<CancelHandle>,
}

/// Document state shared by the core and a host surface
pub struct Session {
    document: String,
    annotated: String,
    segments: Vec<Segment>,
    /// Set while `document` does not tokenize and `annotated` is from an
    /// earlier document
    stale: bool,
    tracker: RangeTracker,
    revealer: Revealer,
}

/// Annotated form of a document and its segments
fn annotate(document: &str) -> Result<(String, Vec<Segment>)> {
    let annotated = tokenizer::tokenize(document)?;
    let segments = tokenizer::segments_of(&annotated)?;
    Ok((annotated, segments))
}

impl Session {
    /// Start a session over `markup`
    pub fn new(markup: &str, tick_interval: Duration) -> Result<Self> {
        let (annotated, segments) = annotate(markup)?;
        Ok(Self {
            document: markup.to_string(),
            annotated,
            segments,
            stale: false,
            tracker: RangeTracker::new(),
            revealer: Revealer::new(tick_interval),
        })
    }

    /// The clean document
    pub fn document(&self) -> &str {
        &self.document
    }

    /// The annotated document
    pub fn annotated(&self) -> &str {
        &self.annotated
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn tracker(&self) -> &RangeTracker {
        &self.tracker
    }

    /// Current highlight
    pub fn highlight(&self) -> Highlight {
        Highlight::from_tracker(&self.tracker)
    }

    /// Feed a pointer event to the range tracker
    pub fn handle_pointer(&mut self, event: PointerEvent) -> Option<SelectionInterval> {
        self.tracker.handle(event)
    }

    /// Dismiss the selection and the input affordance
    pub fn dismiss(&mut self) {
        self.tracker.on_outside_interaction();
    }

    /// Text of the current selection
    pub fn selected_text(&self) -> Option<String> {
        let interval = self.tracker.interval()?;
        marker::selected_text(&self.annotated, interval).ok()
    }

    pub fn is_revealing(&self) -> bool {
        self.revealer.is_active()
    }

    /// When the host must poll next
    pub fn next_deadline(&self) -> Option<Instant> {
        self.revealer.next_deadline()
    }

    /// Check if the annotation lags behind a document that does not tokenize
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Check if the document holds a replacement marker
    pub fn has_marker(&self) -> bool {
        marker::has_marker(&self.document).unwrap_or(false)
    }

    /// Replace the document wholesale
    ///
    /// If the new document cannot be tokenized the previous annotation stays
    /// for display and the session is marked stale, which happens while a
    /// reveal is halfway through writing a tag.
    fn set_document(&mut self, document: String) {
        let annotation = annotate(&document);
        self.publish(document, annotation);
    }

    fn publish(&mut self, document: String, annotation: Result<(String, Vec<Segment>)>) {
        match annotation {
            Ok((annotated, segments)) => {
                self.annotated = annotated;
                self.segments = segments;
                self.stale = false;
            }
            Err(e) => {
                tracing::debug!(error = %e, "keeping previous annotation");
                self.stale = true;
            }
        }
        self.document = document;
    }

    /// Commit the tracked selection
    ///
    /// Returns `Ok(None)` when nothing is selected.
    pub fn commit(&mut self, replacement: &str, mode: CommitMode, now: Instant) -> Result<Option<Commit>> {
        match self.tracker.interval() {
            Some(interval) => self
                .commit_range(interval.start, interval.end, replacement, mode, now)
                .map(Some),
            None => {
                tracing::debug!("commit with empty selection ignored");
                Ok(None)
            }
        }
    }

    /// Commit an explicit range
    ///
    /// Indices address the current document, so a stale session refuses with
    /// `MalformedMarkup`, as does an immediate replacement whose result would
    /// not tokenize. On error the document is unchanged.
    pub fn commit_range(
        &mut self,
        start: usize,
        end: usize,
        replacement: &str,
        mode: CommitMode,
        now: Instant,
    ) -> Result<Commit> {
        if self.revealer.is_active() {
            return Err(MarkswapError::RevealAlreadyActive);
        }
        if self.stale {
            // fails with the position where the document stops tokenizing
            let (annotated, segments) = annotate(&self.document)?;
            self.annotated = annotated;
            self.segments = segments;
            self.stale = false;
        }

        let interval = SelectionInterval { start, end };
        let marked = marker::insert_marker(&self.annotated, start, end)?;
        let original = marker::selected_text(&self.annotated, interval)?;
        let clean = marker::strip_addressing(&marked)?;
        let next = match mode {
            CommitMode::Immediate => reveal::replace_marker(&clean, replacement)?,
            CommitMode::Stream | CommitMode::MarkerOnly => clean,
        };
        // a marker around existing text always tokenizes; a new replacement may not
        let annotation = match mode {
            CommitMode::Immediate => Some(annotate(&next)?),
            CommitMode::Stream | CommitMode::MarkerOnly => None,
        };

        let handle = match mode {
            CommitMode::Stream => Some(self.revealer.start(replacement, |_: &str| {}, now)?),
            _ => None,
        };

        tracing::info!(start, end, %mode, "committed selection");
        match annotation {
            Some(annotation) => self.publish(next, Ok(annotation)),
            None => self.set_document(next),
        }
        self.tracker.on_outside_interaction();

        Ok(Commit {
            interval,
            original,
            replacement: replacement.to_string(),
            mode,
            reveal: handle,
        })
    }

    /// Stream `target` into a marker already in the document
    pub fn reveal(&mut self, target: &str, now: Instant) -> Result<CancelHandle> {
        if !marker::has_marker(&self.document)? {
            return Err(MarkswapError::MarkerMissing);
        }
        self.revealer.start(target, |_: &str| {}, now)
    }

    /// Stop the running reveal, leaving what it wrote
    pub fn cancel_reveal(&mut self) {
        self.revealer.cancel();
    }

    /// Advance the reveal; returns true if the document changed
    pub fn poll(&mut self, now: Instant) -> bool {
        let mut document = self.document.clone();
        if self.revealer.poll(&mut document, now) == 0 {
            return false;
        }
        self.set_document(document);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::PointerTarget;

    const DOC: &str = "<p>Static Typing helps</p>";

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn select(session: &mut Session, from: usize, to: usize) {
        session.handle_pointer(PointerEvent::Press(PointerTarget::Segment(from)));
        session.handle_pointer(PointerEvent::Move(PointerTarget::Segment(to)));
        session.handle_pointer(PointerEvent::Release(PointerTarget::Segment(to)));
    }

    #[test]
    fn test_commit_mode_parse() {
        assert_eq!(CommitMode::parse("stream"), Some(CommitMode::Stream));
        assert_eq!(CommitMode::parse(" Immediate "), Some(CommitMode::Immediate));
        assert_eq!(CommitMode::parse("marker-only"), Some(CommitMode::MarkerOnly));
        assert_eq!(CommitMode::parse("later"), None);
        assert_eq!(CommitMode::MarkerOnly.to_string(), "marker-only");
    }

    #[test]
    fn test_marker_only_commit() {
        let mut session = Session::new(DOC, ms(10)).unwrap();
        select(&mut session, 2, 0);
        assert_eq!(session.selected_text().as_deref(), Some("Static Typing"));

        let commit = session
            .commit("ignored", CommitMode::MarkerOnly, Instant::now())
            .unwrap()
            .unwrap();
        assert_eq!(commit.original, "Static Typing");
        assert_eq!(session.document(), "<p><replace>Static Typing</replace> helps</p>");
        assert_eq!(session.tracker().interval(), None);
        assert!(!session.is_revealing());
    }

    #[test]
    fn test_immediate_commit() {
        let mut session = Session::new(DOC, ms(10)).unwrap();
        session
            .commit_range(0, 2, "Dynamic Binding", CommitMode::Immediate, Instant::now())
            .unwrap();
        assert_eq!(session.document(), "<p>Dynamic Binding helps</p>");
        assert_eq!(session.segments().len(), 5);
    }

    #[test]
    fn test_stream_commit() {
        let t0 = Instant::now();
        let mut session = Session::new(DOC, ms(10)).unwrap();
        let commit = session.commit_range(4, 4, "aids", CommitMode::Stream, t0).unwrap();
        assert!(commit.reveal.is_some());
        assert_eq!(session.document(), "<p>Static Typing <replace>helps</replace></p>");
        assert_eq!(session.next_deadline(), Some(t0 + ms(10)));

        assert!(session.poll(t0 + ms(10)));
        assert_eq!(session.document(), "<p>Static Typing <replace>a</replace></p>");
        assert!(!session.poll(t0 + ms(15)));
        assert!(session.poll(t0 + ms(50)));
        assert_eq!(session.document(), "<p>Static Typing aids</p>");
        assert!(!session.is_revealing());
        assert_eq!(session.segments().last().map(|s| s.text.as_str()), Some("aids"));
    }

    #[test]
    fn test_commit_while_revealing_rejected() {
        let t0 = Instant::now();
        let mut session = Session::new(DOC, ms(10)).unwrap();
        session.commit_range(0, 0, "x", CommitMode::Stream, t0).unwrap();
        let before = session.document().to_string();
        assert!(matches!(
            session.commit_range(4, 4, "y", CommitMode::Immediate, t0),
            Err(MarkswapError::RevealAlreadyActive)
        ));
        assert_eq!(session.document(), before);
    }

    #[test]
    fn test_empty_selection_is_noop() {
        let mut session = Session::new(DOC, ms(10)).unwrap();
        let result = session.commit("x", CommitMode::Immediate, Instant::now()).unwrap();
        assert!(result.is_none());
        assert_eq!(session.document(), DOC);
    }

    #[test]
    fn test_failed_commit_keeps_document() {
        let mut session = Session::new(DOC, ms(10)).unwrap();
        assert!(matches!(
            session.commit_range(3, 5, "x", CommitMode::Immediate, Instant::now()),
            Err(MarkswapError::RangeNotFound { .. })
        ));
        assert_eq!(session.document(), DOC);
        assert!(!session.is_revealing());
    }

    #[test]
    fn test_reveal_into_existing_marker() {
        let t0 = Instant::now();
        let mut session = Session::new(DOC, ms(10)).unwrap();
        assert!(matches!(session.reveal("x", t0), Err(MarkswapError::MarkerMissing)));

        session.commit_range(0, 0, "", CommitMode::MarkerOnly, t0).unwrap();
        session.reveal("Strict", t0).unwrap();
        session.poll(t0 + ms(1000));
        assert_eq!(session.document(), "<p>Strict Typing helps</p>");
    }

    #[test]
    fn test_cancel_reveal() {
        let t0 = Instant::now();
        let mut session = Session::new(DOC, ms(10)).unwrap();
        let commit = session.commit_range(0, 0, "Strong", CommitMode::Stream, t0).unwrap();
        session.poll(t0 + ms(20));
        if let Some(handle) = commit.reveal {
            handle.cancel();
        }
        assert!(!session.poll(t0 + ms(1000)));
        assert_eq!(session.document(), "<p><replace>St</replace> Typing helps</p>");
        assert!(!session.is_revealing());
    }

    #[test]
    fn test_annotation_kept_when_document_does_not_tokenize() {
        let t0 = Instant::now();
        let mut session = Session::new(DOC, ms(10)).unwrap();
        session.commit_range(0, 0, "<b class=\"k\">x</b>", CommitMode::Stream, t0).unwrap();
        session.poll(t0 + ms(90));
        let segments_before = session.segments().to_vec();
        // the tenth tick leaves `<b class="` in the marker and the tail cannot be lexed
        assert!(session.poll(t0 + ms(100)));
        assert!(session.document().contains("<replace><b class=\"</replace>"));
        assert_eq!(session.segments(), segments_before.as_slice());
    }

    #[test]
    fn test_static_typing_stream_scenario() {
        let t0 = Instant::now();
        let mut session = Session::new(DOC, ms(10)).unwrap();
        select(&mut session, 0, 2);
        assert!(session.tracker().is_awaiting_input());

        let commit = session
            .commit("Strong typing", CommitMode::Stream, t0)
            .unwrap()
            .unwrap();
        assert_eq!(commit.original, "Static Typing");
        assert_eq!(session.document(), "<p><replace>Static Typing</replace> helps</p>");

        let mut shown = String::new();
        for tick in 1..=6 {
            assert!(session.poll(t0 + ms(10 * tick)));
            let doc = session.document();
            let inner = &doc["<p><replace>".len()..doc.len() - "</replace> helps</p>".len()];
            assert!(inner.starts_with(&shown));
            shown = inner.to_string();
        }
        assert_eq!(session.document(), "<p><replace>Strong</replace> helps</p>");

        assert!(session.poll(t0 + ms(1000)));
        assert_eq!(session.document(), "<p>Strong typing helps</p>");
        assert!(!session.is_revealing());
        assert!(!session.has_marker());
        let words: Vec<&str> = session.segments().iter().map(|s| s.text.as_str()).collect();
        assert_eq!(words, vec!["Strong", " ", "typing", " ", "helps"]);
    }

    #[test]
    fn test_immediate_commit_rejected_when_result_does_not_tokenize() {
        let mut session = Session::new(DOC, ms(10)).unwrap();
        assert!(matches!(
            session.commit_range(0, 0, "<b class=\"k", CommitMode::Immediate, Instant::now()),
            Err(MarkswapError::MalformedMarkup { .. })
        ));
        assert_eq!(session.document(), DOC);
        assert!(!session.is_stale());

        session
            .commit_range(4, 4, "aids", CommitMode::Immediate, Instant::now())
            .unwrap();
        assert_eq!(session.document(), "<p>Static Typing aids</p>");
    }

    #[test]
    fn test_stale_document_blocks_commits() {
        let t0 = Instant::now();
        let mut session = Session::new(DOC, ms(10)).unwrap();
        session.commit_range(0, 0, "<b class=\"k", CommitMode::Stream, t0).unwrap();
        session.poll(t0 + ms(1000));
        assert!(!session.is_revealing());
        assert_eq!(session.document(), "<p><b class=\"k Typing helps</p>");
        assert!(session.is_stale());

        let before = session.document().to_string();
        assert!(matches!(
            session.commit_range(4, 4, "aids", CommitMode::Immediate, t0 + ms(1000)),
            Err(MarkswapError::MalformedMarkup { .. })
        ));
        assert_eq!(session.document(), before);
    }

    #[test]
    fn test_cancelled_marker_can_be_finished() {
        let t0 = Instant::now();
        let mut session = Session::new(DOC, ms(10)).unwrap();
        session.commit_range(0, 0, "Strong", CommitMode::Stream, t0).unwrap();
        session.poll(t0 + ms(20));
        session.cancel_reveal();
        assert_eq!(session.document(), "<p><replace>St</replace> Typing helps</p>");
        assert!(session.has_marker());
        assert!(matches!(
            session.commit_range(2, 2, "typing", CommitMode::Immediate, t0 + ms(30)),
            Err(MarkswapError::MarkerAlreadyPresent)
        ));

        session.reveal("Strong", t0 + ms(30)).unwrap();
        assert!(session.poll(t0 + ms(1000)));
        assert_eq!(session.document(), "<p>Strong Typing helps</p>");
        assert!(!session.has_marker());

        session
            .commit_range(2, 2, "typing", CommitMode::Immediate, t0 + ms(1000))
            .unwrap();
        assert_eq!(session.document(), "<p>Strong typing helps</p>");
    }
}
