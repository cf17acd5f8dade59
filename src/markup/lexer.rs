//! Tolerant markup lexer
//!
//! Splits a fragment into text, tags, comments and declarations without
//! decoding anything. Every token records its byte span and the spans of
//! consecutive tokens are contiguous, so concatenating them in order rebuilds
//! the input exactly.

use std::ops::Range;

use crate::error::{MarkswapError, Result};

const COMMENT_START: &str = "<!--";
const COMMENT_END: &str = "-->";
const CDATA_START: &str = "<![CDATA[";
const CDATA_END: &str = "]]>";

/// An attribute as written inside a start tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute name, ASCII-lowercased
    pub name: String,
    /// Raw value without its quotes (None for bare attributes)
    pub value: Option<String>,
}

impl Attribute {
    pub fn new(name: &str, value: Option<&str>) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            value: value.map(str::to_string),
        }
    }
}

/// Lexical token kinds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Character data between tags
    Text,
    /// `<name ...>` or `<name ... />`
    StartTag {
        name: String,
        attributes: Vec<Attribute>,
        self_closing: bool,
    },
    /// `</name>`
    EndTag { name: String },
    /// `<!-- ... -->`
    Comment,
    /// `<!DOCTYPE ...>`, `<?...>` and CDATA sections
    Declaration,
    /// Unparsed content of `script` and `style`
    RawText,
}

/// A token and the bytes it covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Range<usize>,
}

impl Token {
    /// The literal source text of this token
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.span.clone()]
    }

    /// Check if this is a start tag with the given (lowercase) name
    pub fn is_start_tag(&self, tag: &str) -> bool {
        matches!(&self.kind, TokenKind::StartTag { name, .. } if name == tag)
    }

    /// Check if this is an end tag with the given (lowercase) name
    pub fn is_end_tag(&self, tag: &str) -> bool {
        matches!(&self.kind, TokenKind::EndTag { name } if name == tag)
    }
}

/// Elements that never have children or a close tag
pub fn is_void_element(name: &str) -> bool {
    matches!(
        name,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

fn is_raw_text_element(name: &str) -> bool {
    matches!(name, "script" | "style")
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':' | b'.')
}

/// Find `</name` (case-insensitive) followed by a name terminator
fn find_close_tag(haystack: &str, name: &str) -> Option<usize> {
    let bytes = haystack.as_bytes();
    haystack.match_indices("</").map(|(i, _)| i).find(|&i| {
        let after = i + 2;
        let end = after + name.len();
        end <= bytes.len()
            && bytes[after..end].eq_ignore_ascii_case(name.as_bytes())
            && bytes
                .get(end)
                .map_or(true, |b| b.is_ascii_whitespace() || matches!(b, b'>' | b'/'))
    })
}

/// Streaming lexer over a markup string
///
/// Yields `Err` once for the first malformed construct and then stops, so a
/// caller can scan a prefix of a document whose tail is not yet well formed.
pub struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    /// Name of a `script`/`style` element whose raw content comes next
    raw_text_until: Option<String>,
    failed: bool,
}

impl<'a> Lexer<'a> {
    /// Create a lexer at the start of `source`
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: 0,
            raw_text_until: None,
            failed: false,
        }
    }

    /// Byte offset of the next token
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Check if a tag, comment or declaration starts at byte `i`
    fn starts_markup(&self, i: usize) -> bool {
        let bytes = self.source.as_bytes();
        if bytes.get(i) != Some(&b'<') {
            return false;
        }
        match bytes.get(i + 1) {
            Some(b) if b.is_ascii_alphabetic() => true,
            Some(b'!') | Some(b'?') => true,
            Some(b'/') => bytes.get(i + 2).is_some_and(|b| b.is_ascii_alphabetic()),
            _ => false,
        }
    }

    fn scan_name(&self, mut i: usize) -> usize {
        let bytes = self.source.as_bytes();
        while i < bytes.len() && is_name_byte(bytes[i]) {
            i += 1;
        }
        i
    }

    fn skip_whitespace(&self, mut i: usize) -> usize {
        let bytes = self.source.as_bytes();
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        i
    }

    fn next_token(&mut self) -> Result<Option<Token>> {
        let len = self.source.len();
        if self.pos >= len {
            return Ok(None);
        }

        if let Some(name) = self.raw_text_until.take() {
            let start = self.pos;
            let end = find_close_tag(&self.source[start..], &name).map_or(len, |rel| start + rel);
            if end > start {
                self.pos = end;
                return Ok(Some(Token {
                    kind: TokenKind::RawText,
                    span: start..end,
                }));
            }
        }

        let start = self.pos;
        if self.starts_markup(start) {
            return self.lex_markup(start).map(Some);
        }

        // Text runs up to the next construct; a lone '<' is just text
        let bytes = self.source.as_bytes();
        let mut end = start + 1;
        while end < len && !(bytes[end] == b'<' && self.starts_markup(end)) {
            end += 1;
        }
        self.pos = end;
        Ok(Some(Token {
            kind: TokenKind::Text,
            span: start..end,
        }))
    }

    fn lex_markup(&mut self, start: usize) -> Result<Token> {
        let rest = &self.source[start..];

        let (kind, end) = if rest.starts_with(COMMENT_START) {
            let body = start + COMMENT_START.len();
            let rel = self.source[body..]
                .find(COMMENT_END)
                .ok_or_else(|| MarkswapError::malformed(start, "unterminated comment"))?;
            (TokenKind::Comment, body + rel + COMMENT_END.len())
        } else if rest.starts_with(CDATA_START) {
            let body = start + CDATA_START.len();
            let rel = self.source[body..]
                .find(CDATA_END)
                .ok_or_else(|| MarkswapError::malformed(start, "unterminated CDATA section"))?;
            (TokenKind::Declaration, body + rel + CDATA_END.len())
        } else if rest.starts_with("<!") || rest.starts_with("<?") {
            let rel = rest
                .find('>')
                .ok_or_else(|| MarkswapError::malformed(start, "unterminated declaration"))?;
            (TokenKind::Declaration, start + rel + 1)
        } else if rest.starts_with("</") {
            let name_end = self.scan_name(start + 2);
            let name = self.source[start + 2..name_end].to_ascii_lowercase();
            let rel = self.source[name_end..]
                .find('>')
                .ok_or_else(|| MarkswapError::malformed(start, "unterminated end tag"))?;
            (TokenKind::EndTag { name }, name_end + rel + 1)
        } else {
            return self.lex_start_tag(start);
        };

        self.pos = end;
        Ok(Token {
            kind,
            span: start..end,
        })
    }

    fn lex_start_tag(&mut self, start: usize) -> Result<Token> {
        let bytes = self.source.as_bytes();
        let len = bytes.len();
        let name_end = self.scan_name(start + 1);
        let name = self.source[start + 1..name_end].to_ascii_lowercase();

        let mut attributes = Vec::new();
        let mut i = name_end;
        let self_closing = loop {
            i = self.skip_whitespace(i);
            if i >= len {
                return Err(MarkswapError::malformed(start, "unterminated start tag"));
            }
            match bytes[i] {
                b'>' => {
                    i += 1;
                    break false;
                }
                b'/' if bytes.get(i + 1) == Some(&b'>') => {
                    i += 2;
                    break true;
                }
                b'/' => {
                    i += 1;
                    continue;
                }
                _ => {}
            }

            let attr_start = i;
            while i < len
                && !bytes[i].is_ascii_whitespace()
                && !matches!(bytes[i], b'=' | b'>')
                && !(bytes[i] == b'/' && bytes.get(i + 1) == Some(&b'>'))
            {
                i += 1;
            }
            let attr_name = &self.source[attr_start..i];

            let j = self.skip_whitespace(i);
            if j < len && bytes[j] == b'=' {
                let j = self.skip_whitespace(j + 1);
                if j >= len {
                    return Err(MarkswapError::malformed(start, "unterminated start tag"));
                }
                let value = match bytes[j] {
                    quote @ (b'"' | b'\'') => {
                        let value_start = j + 1;
                        let rel = self.source[value_start..]
                            .find(quote as char)
                            .ok_or_else(|| {
                                MarkswapError::malformed(j, "unterminated attribute value")
                            })?;
                        i = value_start + rel + 1;
                        &self.source[value_start..value_start + rel]
                    }
                    _ => {
                        let mut k = j;
                        while k < len && !bytes[k].is_ascii_whitespace() && bytes[k] != b'>' {
                            k += 1;
                        }
                        i = k;
                        &self.source[j..k]
                    }
                };
                attributes.push(Attribute::new(attr_name, Some(value)));
            } else {
                attributes.push(Attribute::new(attr_name, None));
            }
        };

        if !self_closing && is_raw_text_element(&name) {
            self.raw_text_until = Some(name.clone());
        }

        self.pos = i;
        Ok(Token {
            kind: TokenKind::StartTag {
                name,
                attributes,
                self_closing,
            },
            span: start..i,
        })
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_token() {
            Ok(token) => token.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Lex a whole string, failing on the first malformed construct
pub fn lex(source: &str) -> Result<Vec<Token>> {
    Lexer::new(source).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_spans_are_contiguous() {
        let source = "<div class=\"a\">Hi <b>there</b><!-- note --> &amp; bye</div>";
        let tokens = lex(source).unwrap();
        let mut pos = 0;
        let mut rebuilt = String::new();
        for token in &tokens {
            assert_eq!(token.span.start, pos);
            rebuilt.push_str(token.text(source));
            pos = token.span.end;
        }
        assert_eq!(pos, source.len());
        assert_eq!(rebuilt, source);
    }

    #[test]
    fn test_lone_angle_bracket_is_text() {
        let tokens = lex("a < b <= c").unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Text);
    }

    #[test]
    fn test_attributes() {
        let tokens = lex(r#"<A HREF='x>y' data-n=3 hidden>"#).unwrap();
        match &tokens[0].kind {
            TokenKind::StartTag {
                name,
                attributes,
                self_closing,
            } => {
                assert_eq!(name, "a");
                assert!(!self_closing);
                assert_eq!(attributes.len(), 3);
                assert_eq!(attributes[0], Attribute::new("href", Some("x>y")));
                assert_eq!(attributes[1], Attribute::new("data-n", Some("3")));
                assert_eq!(attributes[2], Attribute::new("hidden", None));
            }
            other => panic!("unexpected token {:?}", other),
        }
    }

    #[test]
    fn test_self_closing_and_end_tag() {
        let tokens = lex("<br/></P >").unwrap();
        assert!(matches!(
            &tokens[0].kind,
            TokenKind::StartTag { name, self_closing: true, .. } if name == "br"
        ));
        assert!(tokens[1].is_end_tag("p"));
    }

    #[test]
    fn test_script_content_is_raw() {
        let source = "<script>if (a <b) { x = '<i>'; }</script>after";
        let k = kinds(source);
        assert_eq!(k.len(), 4);
        assert_eq!(k[1], TokenKind::RawText);
        assert_eq!(k[2], TokenKind::EndTag { name: "script".to_string() });
        assert_eq!(k[3], TokenKind::Text);
    }

    #[test]
    fn test_declarations_and_comments() {
        let k = kinds("<!DOCTYPE html><?xml version=\"1.0\"?><![CDATA[a>b]]><!-- <p> -->");
        assert_eq!(
            k,
            vec![
                TokenKind::Declaration,
                TokenKind::Declaration,
                TokenKind::Declaration,
                TokenKind::Comment
            ]
        );
    }

    #[test]
    fn test_unterminated_start_tag() {
        match lex("<p>ok</p><div class=\"x") {
            Err(MarkswapError::MalformedMarkup { offset, .. }) => assert_eq!(offset, 20),
            other => panic!("expected malformed markup, got {:?}", other),
        }
    }

    #[test]
    fn test_unterminated_comment() {
        assert!(matches!(
            lex("text <!-- open"),
            Err(MarkswapError::MalformedMarkup { offset: 5, .. })
        ));
    }

    #[test]
    fn test_lexer_stops_after_error() {
        let mut lexer = Lexer::new("<b>x</b><i");
        assert!(lexer.next().unwrap().is_ok());
        assert!(lexer.next().unwrap().is_ok());
        assert!(lexer.next().unwrap().is_ok());
        assert!(lexer.next().unwrap().is_err());
        assert!(lexer.next().is_none());
    }

    #[test]
    fn test_utf8_text() {
        let source = "<p>héllo 😀 wörld</p>";
        let tokens = lex(source).unwrap();
        assert_eq!(tokens[1].text(source), "héllo 😀 wörld");
    }
}
