//! Single-pass markup scanner.
//!
//! Splits markup into text runs and tag delimiters: `[name]`, `[/name]` and
//! `[name=value]`. Leaf tags (`code`, `img`, `youtube`) are recognized here
//! and carry their raw body, so nothing downstream ever re-parses it.

use crate::grammar::Tag;

/// A unit of scanned markup.
///
/// All variants borrow from the source; `raw` is the exact source slice the
/// token was scanned from, used to render unrecognized tags literally.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Token<'a> {
    /// Plain text between tags.
    Text(&'a str),
    /// Opening tag `[name]` or `[name=value]`.
    Open {
        name: &'a str,
        attr: Option<&'a str>,
        raw: &'a str,
    },
    /// Closing tag `[/name]`.
    Close { name: &'a str, raw: &'a str },
    /// A complete leaf tag `[code]body[/code]`.
    Leaf {
        tag: Tag,
        body: &'a str,
        raw: &'a str,
    },
}

/// Iterator over the tokens of a markup string.
pub(crate) struct Tokenizer<'a> {
    src: &'a str,
    pos: usize,
    /// Tag scanned while a preceding text run was being emitted.
    pending: Option<(Token<'a>, usize)>,
}

impl<'a> Tokenizer<'a> {
    pub(crate) fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            pending: None,
        }
    }

    /// Find the next tag at or after `from`, returning the token, its start
    /// offset and the offset just past it.
    fn next_tag(&self, from: usize) -> Option<(Token<'a>, usize, usize)> {
        let mut search = from;
        while let Some(rel) = self.src[search..].find('[') {
            let start = search + rel;
            if let Some((token, end)) = self.scan_tag(start) {
                return Some((token, start, end));
            }
            search = start + 1;
        }
        None
    }

    /// Scan a tag starting at the `[` at `start`.
    fn scan_tag(&self, start: usize) -> Option<(Token<'a>, usize)> {
        let rest = &self.src[start + 1..];
        let closing = rest.starts_with('/');
        let name_start = start + 1 + usize::from(closing);
        let name_len = tag_name_len(&self.src[name_start..]);
        if name_len == 0 {
            return None;
        }
        let name = &self.src[name_start..name_start + name_len];
        let after_name = name_start + name_len;
        let tail = &self.src[after_name..];

        if closing {
            if !tail.starts_with(']') {
                return None;
            }
            let end = after_name + 1;
            return Some((
                Token::Close {
                    name,
                    raw: &self.src[start..end],
                },
                end,
            ));
        }

        let (attr, end) = if tail.starts_with(']') {
            (None, after_name + 1)
        } else if tail.starts_with('=') {
            let value_len = attribute_len(&tail[1..])?;
            let value = &tail[1..1 + value_len];
            (Some(strip_quotes(value.trim())), after_name + 1 + value_len + 1)
        } else {
            return None;
        };

        if attr.is_none()
            && let Some(tag) = Tag::from_name(name).filter(|t| t.is_leaf())
            && let Some((body_end, leaf_end)) = self.find_leaf_close(end, tag)
        {
            return Some((
                Token::Leaf {
                    tag,
                    body: &self.src[end..body_end],
                    raw: &self.src[start..leaf_end],
                },
                leaf_end,
            ));
        }

        Some((
            Token::Open {
                name,
                attr,
                raw: &self.src[start..end],
            },
            end,
        ))
    }

    /// Locate the first `[/tag]` closer after `from`, ignoring ASCII case.
    ///
    /// Returns the body end and the offset just past the closer.
    fn find_leaf_close(&self, from: usize, tag: Tag) -> Option<(usize, usize)> {
        let closer = format!("[/{}]", tag.name());
        let offset = find_ascii_case_insensitive(&self.src[from..], &closer)?;
        let body_end = from + offset;
        Some((body_end, body_end + closer.len()))
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        if let Some((token, end)) = self.pending.take() {
            self.pos = end;
            return Some(token);
        }
        if self.pos >= self.src.len() {
            return None;
        }

        match self.next_tag(self.pos) {
            Some((token, start, end)) if start == self.pos => {
                self.pos = end;
                Some(token)
            }
            Some((token, start, end)) => {
                let text = &self.src[self.pos..start];
                self.pending = Some((token, end));
                self.pos = start;
                Some(Token::Text(text))
            }
            None => {
                let text = &self.src[self.pos..];
                self.pos = self.src.len();
                Some(Token::Text(text))
            }
        }
    }
}

/// Length of a tag name at the start of `s`: an ASCII letter followed by
/// ASCII alphanumerics.
fn tag_name_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    if !bytes.first().is_some_and(u8::is_ascii_alphabetic) {
        return 0;
    }
    bytes
        .iter()
        .take_while(|b| b.is_ascii_alphanumeric())
        .count()
}

/// Length of an attribute value up to the `]` that closes the tag.
///
/// Bracket pairs inside the value are balanced, so `[url=a[1]]` has the
/// value `a[1]`. Returns `None` if the tag is never closed.
fn attribute_len(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '[' => depth += 1,
            ']' if depth == 0 => return Some(i),
            ']' => depth -= 1,
            '\n' => return None,
            _ => {}
        }
    }
    None
}

/// Strip one pair of matching quotes around a value.
pub(crate) fn strip_quotes(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2
            && let Some(inner) = value
                .strip_prefix(quote)
                .and_then(|v| v.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

/// Byte offset of the first ASCII-case-insensitive occurrence of `needle`.
///
/// `needle` must be ASCII, so a match always starts on a char boundary.
pub(crate) fn find_ascii_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    let hay = haystack.as_bytes();
    let needle = needle.as_bytes();
    if needle.is_empty() || hay.len() < needle.len() {
        return None;
    }
    hay.windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
}
