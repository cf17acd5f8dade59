//! View sync: project the tracked interval onto segments
//!
//! Nothing here mutates a tracker or a document; the highlight is derived
//! fresh from whatever interval is current.

use crate::error::Result;
use crate::markup::Fragment;
use crate::segment;
use crate::selection::{RangeTracker, SelectionInterval};
use crate::style::{Color, Style};

/// Which segments to mark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Highlight {
    interval: Option<SelectionInterval>,
}

impl Highlight {
    pub fn new(interval: Option<SelectionInterval>) -> Self {
        Self { interval }
    }

    /// Highlight for a tracker's current interval
    pub fn from_tracker(tracker: &RangeTracker) -> Self {
        Self::new(tracker.interval())
    }

    /// Check if the segment at `index` is marked
    pub fn is_marked(&self, index: usize) -> bool {
        self.interval.is_some_and(|i| i.contains(index))
    }

    /// Display style for the segment at `index`
    ///
    /// Selection wins over the marker style.
    pub fn style_for(&self, index: usize, in_marker: bool) -> Style {
        if self.is_marked(index) {
            selected_style()
        } else if in_marker {
            marker_style()
        } else {
            Style::default()
        }
    }

    /// Rewrite annotated markup so marked wrappers carry the `selected` class
    ///
    /// Unmarked wrappers lose it. Everything that is not a wrapper is kept
    /// as is.
    pub fn apply_to_markup(&self, annotated: &str) -> Result<String> {
        let mut fragment = Fragment::parse(annotated)?;
        for id in fragment.descendants() {
            let Some((index, kind)) = segment::recognize_node(&fragment, id) else {
                continue;
            };
            let marked = self.is_marked(index);
            if let Some(element) = fragment.element_mut(id) {
                element.open_tag = segment::wrapper_open_tag(index, kind, marked);
                element.attributes = segment::wrapper_attributes(index, kind, marked);
            }
        }
        Ok(fragment.serialize())
    }
}

/// Style of a highlighted segment
pub fn selected_style() -> Style {
    Style::bg(Color::Cyan).with_fg(Color::Blue)
}

/// Style of content inside the replacement marker
pub fn marker_style() -> Style {
    Style::fg(Color::Yellow).with_underline()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::PointerTarget;
    use crate::tokenizer::{segments_of, tokenize};

    #[test]
    fn test_no_interval_marks_nothing() {
        let highlight = Highlight::default();
        assert!(!highlight.is_marked(0));
        assert!(highlight.style_for(0, false).is_default());
        assert_eq!(highlight.style_for(0, true), marker_style());
    }

    #[test]
    fn test_marks_exactly_the_interval() {
        let highlight = Highlight::new(Some(SelectionInterval::new(4, 2)));
        let marked: Vec<usize> = (0..7).filter(|&i| highlight.is_marked(i)).collect();
        assert_eq!(marked, vec![2, 3, 4]);
        assert_eq!(highlight.style_for(3, false), selected_style());
        assert_eq!(highlight.style_for(3, true), selected_style());
        assert!(highlight.style_for(5, false).is_default());
    }

    #[test]
    fn test_from_tracker() {
        let mut tracker = RangeTracker::new();
        tracker.on_press(PointerTarget::Segment(1));
        tracker.on_move(PointerTarget::Segment(0));
        let highlight = Highlight::from_tracker(&tracker);
        assert!(highlight.is_marked(0) && highlight.is_marked(1));
        assert!(!highlight.is_marked(2));
    }

    #[test]
    fn test_apply_to_markup() {
        let annotated = tokenize("<p>Static Typing helps</p>").unwrap();
        let marked = Highlight::new(Some(SelectionInterval::new(0, 1)))
            .apply_to_markup(&annotated)
            .unwrap();
        assert!(marked.contains(
            r#"<span data-word-index="0" class="selectable-word selected">Static</span>"#
        ));
        assert!(marked.contains(
            r#"<span data-word-index="1" class="selectable-space selected"> </span>"#
        ));
        assert!(marked.contains(r#"<span data-word-index="2" class="selectable-word">Typing</span>"#));

        // segments survive and clearing restores the plain annotation
        assert_eq!(segments_of(&marked).unwrap().len(), 5);
        let cleared = Highlight::default().apply_to_markup(&marked).unwrap();
        assert_eq!(cleared, annotated);
    }
}
