//! Markup model
//!
//! A lossless lexer and an index-based node tree. These stand in for the
//! host's "parse" and "serialize" capabilities: `Fragment::parse(x).serialize()`
//! returns `x` unchanged for any input the lexer accepts.

mod lexer;
mod tree;

pub use lexer::{is_void_element, lex, Attribute, Lexer, Token, TokenKind};
pub use tree::{Element, Fragment, Node, NodeId, NodeKind};

/// Tag name of the replacement marker
pub const MARKER_TAG: &str = "replace";
/// Literal opening boundary of the replacement marker
pub const MARKER_OPEN: &str = "<replace>";
/// Literal closing boundary of the replacement marker
pub const MARKER_CLOSE: &str = "</replace>";
