//! markswap - select a run of rendered text in markup and swap it out
//!
//! The core turns markup into addressable segments, tracks a selection over
//! them, brackets the selection with a `<replace>` marker and can reveal new
//! content into that marker one character at a time. The terminal host in
//! `app`, `display`, `input` and `terminal` is one surface built on top.

pub mod app;
pub mod config;
pub mod display;
pub mod error;
pub mod highlight;
pub mod input;
pub mod marker;
pub mod markup;
pub mod reveal;
pub mod segment;
pub mod selection;
pub mod session;
pub mod style;
pub mod terminal;
pub mod tokenizer;

pub use error::{MarkswapError, Result};
pub use highlight::Highlight;
pub use marker::{insert_marker, selected_text, strip_addressing};
pub use reveal::{CancelHandle, RevealTask, Revealer, Tick};
pub use segment::{Segment, SegmentKind};
pub use selection::{PointerEvent, PointerTarget, RangeTracker, SelectionInterval, TrackerState};
pub use session::{Commit, CommitMode, Session};
pub use tokenizer::tokenize;
