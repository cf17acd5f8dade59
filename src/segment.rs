//! Segments: the addressable units of text
//!
//! Every text node is cut into maximal whitespace and non-whitespace runs.
//! Each run is wrapped in a span that carries its index and kind, e.g.
//! `<span data-word-index="3" class="selectable-word">Typing</span>`.

use std::sync::OnceLock;

use regex::Regex;

use crate::markup::{Attribute, Element, Fragment, NodeId, NodeKind};

/// Attribute carrying the segment index
pub const INDEX_ATTR: &str = "data-word-index";
/// Class of non-whitespace segments
pub const WORD_CLASS: &str = "selectable-word";
/// Class of whitespace segments
pub const SPACE_CLASS: &str = "selectable-space";
/// Extra class added to highlighted segments
pub const SELECTED_CLASS: &str = "selected";

const WRAPPER_TAG: &str = "span";
const WRAPPER_CLOSE: &str = "</span>";

/// Whether a segment is a word or a whitespace run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    /// A run of non-whitespace characters
    Word,
    /// A run of whitespace characters
    Space,
}

impl SegmentKind {
    /// Classify a run of text
    pub fn of(run: &str) -> Self {
        if run.chars().all(char::is_whitespace) {
            SegmentKind::Space
        } else {
            SegmentKind::Word
        }
    }

    /// Class name used on the wrapper
    pub fn class_name(&self) -> &'static str {
        match self {
            SegmentKind::Word => WORD_CLASS,
            SegmentKind::Space => SPACE_CLASS,
        }
    }

    /// Parse a kind from its wrapper class name
    pub fn from_class(class: &str) -> Option<Self> {
        match class {
            WORD_CLASS => Some(SegmentKind::Word),
            SPACE_CLASS => Some(SegmentKind::Space),
            _ => None,
        }
    }
}

/// One addressable run of text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Position in document order, unique within a fragment
    pub index: usize,
    /// The literal run
    pub text: String,
    pub kind: SegmentKind,
}

fn run_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\s+|\S+").expect("segment run pattern is valid"))
}

/// Split text into maximal whitespace / non-whitespace runs
///
/// Concatenating the returned runs reproduces `text` exactly.
pub fn split_runs(text: &str) -> Vec<(SegmentKind, &str)> {
    run_pattern()
        .find_iter(text)
        .map(|m| (SegmentKind::of(m.as_str()), m.as_str()))
        .collect()
}

/// Literal open tag of a segment wrapper
pub fn wrapper_open_tag(index: usize, kind: SegmentKind, selected: bool) -> String {
    if selected {
        format!(
            r#"<span {}="{}" class="{} {}">"#,
            INDEX_ATTR,
            index,
            kind.class_name(),
            SELECTED_CLASS
        )
    } else {
        format!(r#"<span {}="{}" class="{}">"#, INDEX_ATTR, index, kind.class_name())
    }
}

/// Parsed attributes matching `wrapper_open_tag`
pub fn wrapper_attributes(index: usize, kind: SegmentKind, selected: bool) -> Vec<Attribute> {
    let class = if selected {
        format!("{} {}", kind.class_name(), SELECTED_CLASS)
    } else {
        kind.class_name().to_string()
    };
    vec![
        Attribute::new(INDEX_ATTR, Some(&index.to_string())),
        Attribute::new("class", Some(&class)),
    ]
}

/// Build the element node data of a segment wrapper
pub fn wrapper_element(index: usize, kind: SegmentKind) -> NodeKind {
    NodeKind::Element(Element {
        name: WRAPPER_TAG.to_string(),
        attributes: wrapper_attributes(index, kind, false),
        open_tag: wrapper_open_tag(index, kind, false),
        close_tag: Some(WRAPPER_CLOSE.to_string()),
    })
}

/// Recognize a segment wrapper by its exact identifying marks
///
/// Matches only a `span` with an explicit close tag and exactly two
/// attributes: a decimal `data-word-index` and a `class` whose first token is
/// a segment class and whose remaining tokens are all `selected`. Anything
/// else, however similar, is ordinary markup.
pub fn recognize(element: &Element) -> Option<(usize, SegmentKind)> {
    if element.name != WRAPPER_TAG || element.close_tag.is_none() || element.attributes.len() != 2
    {
        return None;
    }

    let index = element.attribute(INDEX_ATTR)?;
    if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let index = index.parse::<usize>().ok()?;

    let mut classes = element.attribute("class")?.split_ascii_whitespace();
    let kind = SegmentKind::from_class(classes.next()?)?;
    if !classes.all(|c| c == SELECTED_CLASS) {
        return None;
    }

    Some((index, kind))
}

/// Recognize a node as a segment wrapper
pub fn recognize_node(fragment: &Fragment, id: NodeId) -> Option<(usize, SegmentKind)> {
    fragment.element(id).and_then(recognize)
}

/// Literal text inside a segment wrapper
pub fn wrapper_text(fragment: &Fragment, id: NodeId) -> String {
    fragment
        .children_of(Some(id))
        .iter()
        .filter_map(|&child| fragment.text(child))
        .collect()
}
