//! Tokenizer: annotate every text run with an addressable segment wrapper

use crate::error::Result;
use crate::markup::{Fragment, NodeKind};
use crate::segment::{self, Segment};

/// Tokenize a markup string
///
/// Returns the annotated markup. Text nodes are replaced by runs of segment
/// wrappers indexed `0..N` in document order; all other markup is kept byte
/// for byte.
pub fn tokenize(markup: &str) -> Result<String> {
    let mut fragment = Fragment::parse(markup)?;
    let count = tokenize_fragment(&mut fragment);
    tracing::debug!(segments = count, bytes = markup.len(), "tokenized markup");
    Ok(fragment.serialize())
}

/// Tokenize a parsed fragment in place, returning the number of segments
pub fn tokenize_fragment(fragment: &mut Fragment) -> usize {
    let text_nodes: Vec<_> = fragment
        .descendants()
        .into_iter()
        .filter(|&id| fragment.text(id).is_some_and(|t| !t.is_empty()))
        .collect();

    let mut next_index = 0;
    for id in text_nodes {
        let text = match fragment.text(id) {
            Some(text) => text.to_string(),
            None => continue,
        };

        let mut wrappers = Vec::new();
        for (kind, run) in segment::split_runs(&text) {
            let wrapper = fragment.create(segment::wrapper_element(next_index, kind));
            fragment.push(Some(wrapper), NodeKind::Text(run.to_string()));
            wrappers.push(wrapper);
            next_index += 1;
        }
        fragment.replace_with(id, &wrappers);
    }

    next_index
}

/// Collect the segments of annotated markup in document order
pub fn segments(fragment: &Fragment) -> Vec<Segment> {
    fragment
        .descendants()
        .into_iter()
        .filter_map(|id| {
            segment::recognize_node(fragment, id).map(|(index, kind)| Segment {
                index,
                text: segment::wrapper_text(fragment, id),
                kind,
            })
        })
        .collect()
}

/// Parse annotated markup and collect its segments
pub fn segments_of(annotated: &str) -> Result<Vec<Segment>> {
    Ok(segments(&Fragment::parse(annotated)?))
}
