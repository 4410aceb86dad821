use crate::config::Config;
use crate::error::{Error, Pos, Result};

/// A fragment of template source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// Literal text, already trimmed by any adjacent trim markers.
    Text { text: &'a str, pos: Pos },
    /// The inside of `{{ }}`.
    Object { source: &'a str, pos: Pos },
    /// The inside of `{% %}`, split into the tag name and its raw arguments.
    Tag { name: &'a str, args: &'a str, pos: Pos },
}

#[derive(Clone, Copy)]
enum Markup {
    Object,
    Tag,
}

/// Lazy scanner over template source. Create a new one to restart.
pub struct Tokenizer<'s, 'c> {
    src: &'s str,
    config: &'c Config,
    /// Current byte offset.
    pos: usize,
    /// The previous markup ended with a trim marker.
    trim_next: bool,
    line: usize,
    line_offset: usize,
    done: bool,
}

impl<'s, 'c> Tokenizer<'s, 'c> {
    pub fn new(src: &'s str, config: &'c Config) -> Self {
        Self {
            src,
            config,
            pos: 0,
            trim_next: false,
            line: 1,
            line_offset: 0,
            done: false,
        }
    }

    /// Offsets handed in are non-decreasing, so lines are counted incrementally.
    fn pos_at(&mut self, offset: usize) -> Pos {
        if offset > self.line_offset {
            self.line += self.src.as_bytes()[self.line_offset..offset]
                .iter()
                .filter(|b| **b == b'\n')
                .count();
            self.line_offset = offset;
        }
        Pos::new(offset, self.line)
    }

    /// Finds the next markup opener at or after `self.pos`.
    fn next_opener(&self) -> Option<(usize, Markup)> {
        let rest = &self.src[self.pos..];
        let delims = &self.config.delims;
        let object = rest.find(delims.object_start.as_str());
        let tag = rest.find(delims.tag_start.as_str());
        match (object, tag) {
            (Some(o), Some(t)) if t < o => Some((self.pos + t, Markup::Tag)),
            (Some(o), _) => Some((self.pos + o, Markup::Object)),
            (None, Some(t)) => Some((self.pos + t, Markup::Tag)),
            (None, None) => None,
        }
    }

    fn delims_of(&self, kind: Markup) -> (&'c str, &'c str) {
        let delims = &self.config.delims;
        match kind {
            Markup::Object => (delims.object_start.as_str(), delims.object_end.as_str()),
            Markup::Tag => (delims.tag_start.as_str(), delims.tag_end.as_str()),
        }
    }

    fn scan_text(&mut self, end: usize, trim_end: bool) -> Option<Token<'s>> {
        let raw = &self.src[self.pos..end];
        let mut text = raw;
        let mut lead = 0;
        if std::mem::take(&mut self.trim_next) {
            text = raw.trim_start();
            lead = raw.len() - text.len();
        }
        if trim_end {
            text = text.trim_end();
        }
        let start = self.pos + lead;
        self.pos = end;
        if text.is_empty() {
            return None;
        }
        let pos = self.pos_at(start);
        Some(Token::Text { text, pos })
    }

    fn scan_markup(&mut self, kind: Markup) -> Result<Token<'s>> {
        let (open, close) = self.delims_of(kind);
        let start = self.pos;
        let pos = self.pos_at(start);
        let content_start = start + open.len();
        // Tag arguments are opaque, so only object markup honours quotes.
        let close_at = match kind {
            Markup::Object => find_close(self.src, content_start, close),
            Markup::Tag => self.src[content_start..]
                .find(close)
                .map(|i| content_start + i),
        };
        let Some(close_at) = close_at else {
            self.done = true;
            return Err(Error::Tokenize {
                delim: open.to_string(),
                pos,
            });
        };

        let marker = self.config.trim_marker;
        self.trim_next = false;
        let mut inner = &self.src[content_start..close_at];
        if let Some(stripped) = inner.strip_prefix(marker) {
            inner = stripped;
        }
        if let Some(stripped) = inner.strip_suffix(marker) {
            inner = stripped;
            self.trim_next = true;
        }
        self.pos = close_at + close.len();

        let inner = inner.trim();
        match kind {
            Markup::Object => Ok(Token::Object { source: inner, pos }),
            Markup::Tag => {
                let name_len = inner
                    .find(|c: char| !(c.is_alphanumeric() || c == '_'))
                    .unwrap_or(inner.len());
                if name_len == 0 {
                    self.done = true;
                    return Err(Error::ExpressionSyntax {
                        fragment: inner.to_string(),
                        message: "expected a tag name".to_string(),
                        pos,
                    });
                }
                let (name, args) = inner.split_at(name_len);
                Ok(Token::Tag {
                    name,
                    args: args.trim(),
                    pos,
                })
            }
        }
    }
}

impl<'s> Iterator for Tokenizer<'s, '_> {
    type Item = Result<Token<'s>>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done && self.pos < self.src.len() {
            match self.next_opener() {
                Some((at, kind)) if at == self.pos => return Some(self.scan_markup(kind)),
                Some((at, kind)) => {
                    let (open, _) = self.delims_of(kind);
                    let trim_end = self.src[at + open.len()..].starts_with(self.config.trim_marker);
                    if let Some(token) = self.scan_text(at, trim_end) {
                        return Some(Ok(token));
                    }
                }
                None => {
                    let end = self.src.len();
                    if let Some(token) = self.scan_text(end, false) {
                        return Some(Ok(token));
                    }
                }
            }
        }
        None
    }
}

/// Scans a template. Each call starts from the beginning of `src`.
pub fn tokenize<'s, 'c>(src: &'s str, config: &'c Config) -> Tokenizer<'s, 'c> {
    Tokenizer::new(src, config)
}

/// Finds `close` at or after `from`, skipping over quoted strings.
fn find_close(src: &str, from: usize, close: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in src[from..].char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if src[from + i..].starts_with(close) => return Some(from + i),
            None => {}
        }
    }
    // An unbalanced quote must not hide the closing delimiter.
    if quote.is_some() {
        return src[from..].find(close).map(|i| from + i);
    }
    None
}
