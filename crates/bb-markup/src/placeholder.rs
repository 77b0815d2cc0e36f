//! Placeholder tokens for rendered leaf tags.
//!
//! Leaf HTML is parked under a short key while the rest of the document is
//! assembled, then substituted back in one pass. Keys look like
//! `<bb-leaf-3>`: rendered text always has `<` escaped, so a key can never
//! collide with user content.

/// Per-render store of leaf HTML keyed by placeholder token.
#[derive(Debug, Default)]
pub(crate) struct Placeholders {
    items: Vec<String>,
}

impl Placeholders {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Store `html` and return the placeholder to splice in its place.
    pub(crate) fn insert(&mut self, html: String) -> String {
        let key = key(self.items.len());
        self.items.push(html);
        key
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    /// Substitute every placeholder in `out` with its stored HTML.
    ///
    /// Consumes the store so a render call cannot restore twice.
    pub(crate) fn restore(self, out: &mut String) {
        if self.items.is_empty() {
            return;
        }

        let extra: usize = self.items.iter().map(String::len).sum();
        let mut result = String::with_capacity(out.len() + extra);
        let mut rest = out.as_str();

        while let Some(start) = rest.find(KEY_PREFIX) {
            result.push_str(&rest[..start]);
            let after = &rest[start + KEY_PREFIX.len()..];
            let digits = after.bytes().take_while(u8::is_ascii_digit).count();
            let index = after[..digits].parse::<usize>().ok();

            match index.and_then(|i| self.items.get(i)) {
                Some(html) if after[digits..].starts_with('>') => {
                    result.push_str(html);
                    rest = &after[digits + 1..];
                }
                _ => {
                    result.push_str(KEY_PREFIX);
                    rest = after;
                }
            }
        }
        result.push_str(rest);

        *out = result;
    }
}

const KEY_PREFIX: &str = "<bb-leaf-";

fn key(index: usize) -> String {
    format!("{KEY_PREFIX}{index}>")
}
