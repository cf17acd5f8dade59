//! Range tracking from pointer-style input
//!
//! The tracker is a small state machine, `Idle -> Selecting -> Idle`, driven
//! only by press, move, release and outside-interaction transitions. The
//! interval it holds is always normalized so `start <= end`, whichever way
//! the pointer was dragged.

use std::ops::RangeInclusive;

/// An inclusive interval of segment indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionInterval {
    pub start: usize,
    pub end: usize,
}

impl SelectionInterval {
    /// Create an interval from two bounds in any order
    pub fn new(a: usize, b: usize) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    /// An interval covering a single segment
    pub fn single(index: usize) -> Self {
        Self {
            start: index,
            end: index,
        }
    }

    /// Check if a segment index lies in the interval
    pub fn contains(&self, index: usize) -> bool {
        index >= self.start && index <= self.end
    }

    /// Number of indices covered
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// Always false; an interval covers at least one index
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The covered indices
    pub fn indices(&self) -> RangeInclusive<usize> {
        self.start..=self.end
    }
}

/// What the pointer is over when an event happens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    /// A segment, by index
    Segment(usize),
    /// The content surface, but not over any segment
    Surface,
    /// The auxiliary input region (the replacement prompt)
    Dialog,
    /// Anywhere else
    Outside,
}

/// A pointer event together with its target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEvent {
    Press(PointerTarget),
    Move(PointerTarget),
    Release(PointerTarget),
}

/// Tracker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackerState {
    #[default]
    Idle,
    /// A drag is in progress, anchored where it started
    Selecting { anchor: usize },
}

/// Tracks the selected interval across pointer events
#[derive(Debug, Clone, Default)]
pub struct RangeTracker {
    state: TrackerState,
    interval: Option<SelectionInterval>,
    /// Whether the host should show its replacement input
    awaiting_input: bool,
}

impl RangeTracker {
    /// Create an idle tracker with no selection
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state
    pub fn state(&self) -> TrackerState {
        self.state
    }

    /// Current interval, None when nothing is selected
    pub fn interval(&self) -> Option<SelectionInterval> {
        self.interval
    }

    /// Check if a drag is in progress
    pub fn is_selecting(&self) -> bool {
        matches!(self.state, TrackerState::Selecting { .. })
    }

    /// Check if a finalized selection is waiting for replacement text
    pub fn is_awaiting_input(&self) -> bool {
        self.awaiting_input
    }

    /// Pointer pressed
    pub fn on_press(&mut self, target: PointerTarget) {
        match target {
            PointerTarget::Dialog | PointerTarget::Surface => {}
            PointerTarget::Outside => self.on_outside_interaction(),
            PointerTarget::Segment(index) => {
                self.state = TrackerState::Selecting { anchor: index };
                self.interval = Some(SelectionInterval::single(index));
                tracing::trace!(index, "selection started");
            }
        }
    }

    /// Pointer moved
    pub fn on_move(&mut self, target: PointerTarget) {
        if let (TrackerState::Selecting { anchor }, PointerTarget::Segment(index)) =
            (self.state, target)
        {
            self.interval = Some(SelectionInterval::new(anchor, index));
        }
    }

    /// Pointer released
    ///
    /// Returns the finalized interval when the release lands on a segment;
    /// the host should then ask for replacement text.
    pub fn on_release(&mut self, target: PointerTarget) -> Option<SelectionInterval> {
        if !self.is_selecting() {
            return None;
        }
        self.state = TrackerState::Idle;

        match (target, self.interval) {
            (PointerTarget::Segment(_), Some(interval)) => {
                self.awaiting_input = true;
                tracing::debug!(start = interval.start, end = interval.end, "selection finalized");
                Some(interval)
            }
            _ => None,
        }
    }

    /// Interaction outside both the content and the dialog
    pub fn on_outside_interaction(&mut self) {
        self.state = TrackerState::Idle;
        self.interval = None;
        self.awaiting_input = false;
    }

    /// Dispatch a pointer event to the matching transition
    pub fn handle(&mut self, event: PointerEvent) -> Option<SelectionInterval> {
        match event {
            PointerEvent::Press(target) => {
                self.on_press(target);
                None
            }
            PointerEvent::Move(target) => {
                self.on_move(target);
                None
            }
            PointerEvent::Release(target) => self.on_release(target),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drag(from: usize, to: usize) -> Option<SelectionInterval> {
        let mut tracker = RangeTracker::new();
        tracker.on_press(PointerTarget::Segment(from));
        let step = if to >= from { 1 } else { -1 };
        let mut i = from as isize;
        while i != to as isize {
            i += step;
            tracker.on_move(PointerTarget::Segment(i as usize));
        }
        tracker.on_release(PointerTarget::Segment(to))
    }

    #[test]
    fn test_interval_normalizes() {
        assert_eq!(SelectionInterval::new(5, 2), SelectionInterval { start: 2, end: 5 });
        assert_eq!(SelectionInterval::new(2, 5), SelectionInterval { start: 2, end: 5 });
        let interval = SelectionInterval::new(2, 5);
        assert_eq!(interval.len(), 4);
        assert!(interval.contains(2) && interval.contains(5));
        assert!(!interval.contains(6));
        assert_eq!(interval.indices().collect::<Vec<_>>(), vec![2, 3, 4, 5]);
    }

    #[test]
    fn test_drag_direction_independent() {
        let forward = drag(2, 5);
        let backward = drag(5, 2);
        assert_eq!(forward, Some(SelectionInterval { start: 2, end: 5 }));
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_press_starts_single_interval() {
        let mut tracker = RangeTracker::new();
        tracker.on_press(PointerTarget::Segment(3));
        assert_eq!(tracker.state(), TrackerState::Selecting { anchor: 3 });
        assert_eq!(tracker.interval(), Some(SelectionInterval::single(3)));
    }

    #[test]
    fn test_move_without_press_is_ignored() {
        let mut tracker = RangeTracker::new();
        tracker.on_move(PointerTarget::Segment(4));
        assert_eq!(tracker.interval(), None);
        assert_eq!(tracker.on_release(PointerTarget::Segment(4)), None);
    }

    #[test]
    fn test_move_off_segment_keeps_interval() {
        let mut tracker = RangeTracker::new();
        tracker.on_press(PointerTarget::Segment(1));
        tracker.on_move(PointerTarget::Segment(3));
        tracker.on_move(PointerTarget::Surface);
        assert_eq!(tracker.interval(), Some(SelectionInterval::new(1, 3)));
    }

    #[test]
    fn test_release_off_segment_does_not_finalize() {
        let mut tracker = RangeTracker::new();
        tracker.on_press(PointerTarget::Segment(1));
        tracker.on_move(PointerTarget::Segment(2));
        assert_eq!(tracker.on_release(PointerTarget::Surface), None);
        assert_eq!(tracker.state(), TrackerState::Idle);
        assert_eq!(tracker.interval(), Some(SelectionInterval::new(1, 2)));
        assert!(!tracker.is_awaiting_input());
    }

    #[test]
    fn test_release_on_segment_opens_input() {
        let mut tracker = RangeTracker::new();
        tracker.on_press(PointerTarget::Segment(0));
        tracker.on_move(PointerTarget::Segment(2));
        assert_eq!(
            tracker.on_release(PointerTarget::Segment(2)),
            Some(SelectionInterval::new(0, 2))
        );
        assert!(tracker.is_awaiting_input());
    }

    #[test]
    fn test_press_in_dialog_is_ignored() {
        let mut tracker = RangeTracker::new();
        tracker.on_press(PointerTarget::Segment(0));
        tracker.on_release(PointerTarget::Segment(0));
        tracker.on_press(PointerTarget::Dialog);
        assert_eq!(tracker.interval(), Some(SelectionInterval::single(0)));
        assert!(tracker.is_awaiting_input());
    }

    #[test]
    fn test_outside_interaction_clears() {
        let mut tracker = RangeTracker::new();
        tracker.handle(PointerEvent::Press(PointerTarget::Segment(2)));
        tracker.handle(PointerEvent::Move(PointerTarget::Segment(4)));
        tracker.handle(PointerEvent::Press(PointerTarget::Outside));
        assert_eq!(tracker.interval(), None);
        assert_eq!(tracker.state(), TrackerState::Idle);
        assert!(!tracker.is_awaiting_input());
    }
}
