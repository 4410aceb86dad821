/// Markup delimiters recognised by the tokenizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delims {
    pub object_start: String,
    pub object_end: String,
    pub tag_start: String,
    pub tag_end: String,
}

impl Default for Delims {
    fn default() -> Self {
        Self {
            object_start: "{{".to_string(),
            object_end: "}}".to_string(),
            tag_start: "{%".to_string(),
            tag_end: "%}".to_string(),
        }
    }
}

/// Engine configuration.
///
/// ```
/// use uliquid::{Config, Engine};
///
/// let engine = Engine::with_config(Config::default().delims("<<", ">>", "<%", "%>"));
/// let out = engine
///     .parse_and_render("<% if true %><< 'yes' >><% endif %>", &Default::default())
///     .unwrap();
/// assert_eq!(out, "yes");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub delims: Delims,
    /// Placed right inside a delimiter, strips whitespace from the adjacent text.
    pub trim_marker: char,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            delims: Delims::default(),
            trim_marker: '-',
        }
    }
}

impl Config {
    /// Replaces the delimiters. Empty strings keep the current value.
    pub fn delims(mut self, object_start: &str, object_end: &str, tag_start: &str, tag_end: &str) -> Self {
        let set = |slot: &mut String, v: &str| {
            if !v.is_empty() {
                *slot = v.to_string();
            }
        };
        set(&mut self.delims.object_start, object_start);
        set(&mut self.delims.object_end, object_end);
        set(&mut self.delims.tag_start, tag_start);
        set(&mut self.delims.tag_end, tag_end);
        self
    }

    pub fn trim_marker(mut self, marker: char) -> Self {
        self.trim_marker = marker;
        self
    }
}
