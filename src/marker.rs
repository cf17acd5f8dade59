//! Replacement marker insertion and addressing removal

use std::collections::HashMap;

use crate::error::{MarkswapError, Result};
use crate::markup::{Fragment, Lexer, NodeId, NodeKind, TokenKind, MARKER_TAG};
use crate::segment;
use crate::selection::SelectionInterval;

/// Map every segment index in a fragment to its wrapper node
///
/// If an index appears twice the first wrapper in document order wins.
fn wrappers_by_index(fragment: &Fragment) -> HashMap<usize, NodeId> {
    let mut map = HashMap::new();
    for id in fragment.descendants() {
        if let Some((index, _)) = segment::recognize_node(fragment, id) {
            map.entry(index).or_insert(id);
        }
    }
    map
}

/// Resolve `[start, end]` to wrapper nodes, requiring every index to exist
fn resolve_range(fragment: &Fragment, start: usize, end: usize) -> Result<Vec<NodeId>> {
    let not_found = MarkswapError::RangeNotFound { start, end };
    if start > end {
        return Err(not_found);
    }
    let map = wrappers_by_index(fragment);
    (start..=end)
        .map(|index| map.get(&index).copied())
        .collect::<Option<Vec<_>>>()
        .ok_or(not_found)
}

fn contains_marker(fragment: &Fragment) -> bool {
    fragment.any(|node| match &node.kind {
        NodeKind::MarkerOpen | NodeKind::MarkerClose => true,
        NodeKind::Element(element) => element.name == MARKER_TAG,
        _ => false,
    })
}

/// Insert the replacement marker around segments `start..=end`
///
/// The open boundary goes directly before the start wrapper, in its parent,
/// and the close boundary directly after the end wrapper, in its parent.
/// Nothing else moves, so a range crossing element boundaries yields markup
/// whose marker does not nest cleanly; that is expected.
pub fn insert_marker(annotated: &str, start: usize, end: usize) -> Result<String> {
    let mut fragment = Fragment::parse(annotated)?;
    insert_marker_into(&mut fragment, start, end)?;
    tracing::debug!(start, end, "inserted replacement marker");
    Ok(fragment.serialize())
}

/// Insert the replacement marker into a parsed fragment
///
/// On error the fragment is left unchanged.
pub fn insert_marker_into(fragment: &mut Fragment, start: usize, end: usize) -> Result<()> {
    if contains_marker(fragment) {
        return Err(MarkswapError::MarkerAlreadyPresent);
    }
    let wrappers = resolve_range(fragment, start, end)?;
    let (Some(&first), Some(&last)) = (wrappers.first(), wrappers.last()) else {
        return Err(MarkswapError::RangeNotFound { start, end });
    };

    let open = fragment.create(NodeKind::MarkerOpen);
    let close = fragment.create(NodeKind::MarkerClose);
    if !fragment.insert_before(first, open) || !fragment.insert_after(last, close) {
        return Err(MarkswapError::Message(
            "segment wrapper is detached from the fragment".to_string(),
        ));
    }
    Ok(())
}

/// Remove every segment wrapper, keeping its content in place
pub fn strip_addressing(markup: &str) -> Result<String> {
    let mut fragment = Fragment::parse(markup)?;
    let mut removed = 0usize;
    for id in fragment.descendants() {
        if segment::recognize_node(&fragment, id).is_some() && fragment.unwrap(id) {
            removed += 1;
        }
    }
    tracing::debug!(removed, "stripped segment wrappers");
    Ok(fragment.serialize())
}

/// Literal text of the segments in an interval
pub fn selected_text(annotated: &str, interval: SelectionInterval) -> Result<String> {
    let fragment = Fragment::parse(annotated)?;
    let wrappers = resolve_range(&fragment, interval.start, interval.end)?;
    Ok(wrappers
        .into_iter()
        .map(|id| segment::wrapper_text(&fragment, id))
        .collect())
}

/// Check if markup contains a replacement marker open tag
pub fn has_marker(markup: &str) -> Result<bool> {
    for token in Lexer::new(markup) {
        if let TokenKind::StartTag { name, .. } = &token?.kind {
            if name == MARKER_TAG {
                return Ok(true);
            }
        }
    }
    Ok(false)
}
