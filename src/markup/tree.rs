//! Node tree for markup fragments
//!
//! Nodes live in one arena and refer to each other by index. Elements keep
//! their literal open and close tags, text keeps its literal bytes, so a
//! parsed fragment serializes back to exactly the string it came from.

use super::lexer::{is_void_element, Attribute, Lexer, TokenKind};
use super::{MARKER_CLOSE, MARKER_OPEN};
use crate::error::Result;

/// Index of a node in its fragment's arena
pub type NodeId = usize;

/// An element with its literal tags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Tag name, ASCII-lowercased
    pub name: String,
    /// Attributes in source order
    pub attributes: Vec<Attribute>,
    /// Literal open tag including angle brackets
    pub open_tag: String,
    /// Literal close tag; None for void, self-closing and implicitly closed elements
    pub close_tag: Option<String>,
}

impl Element {
    /// Value of the first attribute with this name ("" for bare attributes)
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_deref().unwrap_or(""))
    }
}

/// What a node is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element(Element),
    Text(String),
    Comment(String),
    Declaration(String),
    RawText(String),
    /// An end tag that closed nothing; kept so its bytes survive
    StrayEndTag(String),
    /// Opening boundary of the replacement marker
    MarkerOpen,
    /// Closing boundary of the replacement marker
    MarkerClose,
}

/// A node and its links
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub kind: NodeKind,
}

/// A parsed markup fragment
#[derive(Debug, Clone, Default)]
pub struct Fragment {
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
}

impl Fragment {
    /// Create an empty fragment
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse markup into a tree
    ///
    /// End tags close the nearest open element with the same name, implicitly
    /// closing anything opened after it. End tags with no open counterpart
    /// become `StrayEndTag` nodes.
    pub fn parse(source: &str) -> Result<Self> {
        let mut fragment = Self::new();
        let mut open: Vec<NodeId> = Vec::new();

        for token in Lexer::new(source) {
            let token = token?;
            let literal = token.text(source).to_string();
            let parent = open.last().copied();

            match token.kind {
                TokenKind::Text => {
                    fragment.push(parent, NodeKind::Text(literal));
                }
                TokenKind::Comment => {
                    fragment.push(parent, NodeKind::Comment(literal));
                }
                TokenKind::Declaration => {
                    fragment.push(parent, NodeKind::Declaration(literal));
                }
                TokenKind::RawText => {
                    fragment.push(parent, NodeKind::RawText(literal));
                }
                TokenKind::StartTag {
                    name,
                    attributes,
                    self_closing,
                } => {
                    let opens = !self_closing && !is_void_element(&name);
                    let id = fragment.push(
                        parent,
                        NodeKind::Element(Element {
                            name,
                            attributes,
                            open_tag: literal,
                            close_tag: None,
                        }),
                    );
                    if opens {
                        open.push(id);
                    }
                }
                TokenKind::EndTag { name } => {
                    let depth = open
                        .iter()
                        .rposition(|&id| fragment.element(id).is_some_and(|e| e.name == name));
                    match depth {
                        Some(depth) => {
                            if let NodeKind::Element(element) = &mut fragment.nodes[open[depth]].kind {
                                element.close_tag = Some(literal);
                            }
                            open.truncate(depth);
                        }
                        None => {
                            fragment.push(parent, NodeKind::StrayEndTag(literal));
                        }
                    }
                }
            }
        }

        Ok(fragment)
    }

    /// Serialize the reachable tree back to markup
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for &id in &self.roots {
            self.write_node(id, &mut out);
        }
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        let node = &self.nodes[id];
        match &node.kind {
            NodeKind::Element(element) => {
                out.push_str(&element.open_tag);
                for &child in &node.children {
                    self.write_node(child, out);
                }
                if let Some(close) = &element.close_tag {
                    out.push_str(close);
                }
            }
            NodeKind::Text(s)
            | NodeKind::Comment(s)
            | NodeKind::Declaration(s)
            | NodeKind::RawText(s)
            | NodeKind::StrayEndTag(s) => out.push_str(s),
            NodeKind::MarkerOpen => out.push_str(MARKER_OPEN),
            NodeKind::MarkerClose => out.push_str(MARKER_CLOSE),
        }
    }

    /// Top-level nodes in order
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Get a node by id
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    /// Get a node's element data, if it is an element
    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes.get(id)?.kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Mutable element data
    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes.get_mut(id)?.kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Get a node's literal text, if it is a text node
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.nodes.get(id)?.kind {
            NodeKind::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Children of `parent`, or the roots when `parent` is None
    pub fn children_of(&self, parent: Option<NodeId>) -> &[NodeId] {
        match parent {
            Some(p) => &self.nodes[p].children,
            None => &self.roots,
        }
    }

    fn siblings_mut(&mut self, parent: Option<NodeId>) -> &mut Vec<NodeId> {
        match parent {
            Some(p) => &mut self.nodes[p].children,
            None => &mut self.roots,
        }
    }

    /// Create a node that is not yet attached anywhere
    pub fn create(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            kind,
        });
        self.nodes.len() - 1
    }

    /// Create a node and append it to `parent` (or the roots)
    pub fn push(&mut self, parent: Option<NodeId>, kind: NodeKind) -> NodeId {
        let id = self.create(kind);
        self.nodes[id].parent = parent;
        self.siblings_mut(parent).push(id);
        id
    }

    /// Position of a node among its parent's children
    pub fn position(&self, id: NodeId) -> Option<usize> {
        let parent = self.nodes.get(id)?.parent;
        self.children_of(parent).iter().position(|&c| c == id)
    }

    fn splice(&mut self, parent: Option<NodeId>, at: usize, remove: usize, ids: &[NodeId]) {
        for &id in ids {
            self.nodes[id].parent = parent;
        }
        self.siblings_mut(parent)
            .splice(at..at + remove, ids.iter().copied());
    }

    /// Insert a detached node directly before `anchor`
    ///
    /// Returns false if `anchor` is not attached.
    pub fn insert_before(&mut self, anchor: NodeId, id: NodeId) -> bool {
        match self.position(anchor) {
            Some(at) => {
                let parent = self.nodes[anchor].parent;
                self.splice(parent, at, 0, &[id]);
                true
            }
            None => false,
        }
    }

    /// Insert a detached node directly after `anchor`
    ///
    /// Returns false if `anchor` is not attached.
    pub fn insert_after(&mut self, anchor: NodeId, id: NodeId) -> bool {
        match self.position(anchor) {
            Some(at) => {
                let parent = self.nodes[anchor].parent;
                self.splice(parent, at + 1, 0, &[id]);
                true
            }
            None => false,
        }
    }

    /// Replace a node with a sequence of detached nodes, in place
    pub fn replace_with(&mut self, id: NodeId, replacements: &[NodeId]) -> bool {
        match self.position(id) {
            Some(at) => {
                let parent = self.nodes[id].parent;
                self.splice(parent, at, 1, replacements);
                self.nodes[id].parent = None;
                true
            }
            None => false,
        }
    }

    /// Replace a node with its own children, dropping its tags
    pub fn unwrap(&mut self, id: NodeId) -> bool {
        let children = std::mem::take(&mut self.nodes[id].children);
        if self.replace_with(id, &children) {
            true
        } else {
            self.nodes[id].children = children;
            false
        }
    }

    /// All reachable nodes in document order (pre-order, left to right)
    pub fn descendants(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.nodes[id].children.iter().rev().copied());
        }
        order
    }

    /// Check if any reachable node matches
    pub fn any(&self, mut predicate: impl FnMut(&Node) -> bool) -> bool {
        self.descendants()
            .into_iter()
            .any(|id| predicate(&self.nodes[id]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
  <div>
    <h2>Programming Concepts</h2>
    <ul>
    <li><strong>Static Typing</strong>: Helps catch errors at compile time</li>
    <li>Dynamic Binding: <strong>Resolves references</strong> at runtime</li>
    </ul>
    <p><span>These concepts are <em>fundamental</em> to</span><br></p>
  </div>
"#;

    #[test]
    fn test_round_trip() {
        let inputs = [
            SAMPLE,
            "",
            "plain text only",
            "<p>unclosed <b>bold <i>italic</b> tail",
            "stray </em> end tag",
            "<!DOCTYPE html><!-- c --><img src=x><br/><script>a<b</script>",
            "<P CLASS='Mixed'>Case</p>",
            "a < b and c > d",
        ];
        for input in inputs {
            let fragment = Fragment::parse(input).unwrap();
            assert_eq!(fragment.serialize(), input);
        }
    }

    #[test]
    fn test_structure() {
        let fragment = Fragment::parse("<p>a<b>c</b></p>d").unwrap();
        assert_eq!(fragment.roots().len(), 2);
        let p = fragment.roots()[0];
        assert_eq!(fragment.element(p).unwrap().name, "p");
        let children = fragment.children_of(Some(p));
        assert_eq!(children.len(), 2);
        assert_eq!(fragment.text(children[0]), Some("a"));
        assert_eq!(fragment.node(children[1]).parent, Some(p));
        assert_eq!(fragment.text(fragment.roots()[1]), Some("d"));
    }

    #[test]
    fn test_implicit_close_and_stray_end() {
        let fragment = Fragment::parse("<b><i>x</b></i>").unwrap();
        let b = fragment.roots()[0];
        let i = fragment.children_of(Some(b))[0];
        assert_eq!(fragment.element(i).unwrap().close_tag, None);
        assert_eq!(fragment.element(b).unwrap().close_tag.as_deref(), Some("</b>"));
        assert!(matches!(
            fragment.node(fragment.roots()[1]).kind,
            NodeKind::StrayEndTag(_)
        ));
    }

    #[test]
    fn test_void_elements_do_not_open() {
        let fragment = Fragment::parse("<p>a<br>b</p>").unwrap();
        let p = fragment.roots()[0];
        assert_eq!(fragment.children_of(Some(p)).len(), 3);
    }

    #[test]
    fn test_descendants_document_order() {
        let fragment = Fragment::parse("<a>1<b>2</b>3</a>4").unwrap();
        let texts: Vec<&str> = fragment
            .descendants()
            .into_iter()
            .filter_map(|id| fragment.text(id))
            .collect();
        assert_eq!(texts, vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn test_insert_and_unwrap() {
        let mut fragment = Fragment::parse("<p><b>x</b></p>").unwrap();
        let p = fragment.roots()[0];
        let b = fragment.children_of(Some(p))[0];

        let open = fragment.create(NodeKind::MarkerOpen);
        let close = fragment.create(NodeKind::MarkerClose);
        assert!(fragment.insert_before(b, open));
        assert!(fragment.insert_after(b, close));
        assert_eq!(fragment.serialize(), "<p><replace><b>x</b></replace></p>");

        assert!(fragment.unwrap(b));
        assert_eq!(fragment.serialize(), "<p><replace>x</replace></p>");
    }

    #[test]
    fn test_replace_with() {
        let mut fragment = Fragment::parse("a<i>b</i>c").unwrap();
        let i = fragment.roots()[1];
        let x = fragment.create(NodeKind::Text("X".to_string()));
        let y = fragment.create(NodeKind::Text("Y".to_string()));
        assert!(fragment.replace_with(i, &[x, y]));
        assert_eq!(fragment.serialize(), "aXYc");
        assert!(!fragment.replace_with(i, &[]));
    }

    #[test]
    fn test_malformed() {
        assert!(Fragment::parse("<p>ok<a href=\"x").is_err());
    }
}
