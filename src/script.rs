use crate::foundation::error::{ReelError, ReelResult};

/// Parsed script: the first line is the title, every following non-empty line is body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextBlock {
    title: String,
    body: Vec<String>,
}

impl TextBlock {
    pub fn parse(raw: &str) -> ReelResult<Self> {
        let (first, rest) = match raw.split_once('\n') {
            Some((first, rest)) => (first, rest),
            None => (raw, ""),
        };
        let title = first.trim().to_string();
        let body: Vec<String> = rest
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();

        if title.is_empty() && body.is_empty() {
            return Err(ReelError::invalid_input("script text is empty"));
        }
        Ok(Self { title, body })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self) -> &[String] {
        &self.body
    }

    pub fn body_text(&self) -> String {
        self.body.join("\n")
    }

    /// Text handed to the TTS engine: the body, or the title when there is no body.
    pub fn narration(&self) -> String {
        if self.body.is_empty() {
            self.title.clone()
        } else {
            self.body_text()
        }
    }
}

/// Turn literal `\n` escapes (as typed on a shell command line) into line breaks.
pub fn unescape_newlines(raw: &str) -> String {
    raw.replace("\\n", "\n")
}

/// Directory-safe form of a script's first line.
///
/// Path-hostile characters and whitespace become `_`, runs of `_` collapse, the result is cut to
/// `max_len` characters and trimmed of `_`.
pub fn sanitize_dir_name(text: &str, max_len: usize) -> String {
    let first = text.split('\n').next().unwrap_or("").trim();
    let mut out = String::with_capacity(first.len());
    for ch in first.chars() {
        let ch = if matches!(ch, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*')
            || ch.is_whitespace()
        {
            '_'
        } else {
            ch
        };
        if ch == '_' && out.ends_with('_') {
            continue;
        }
        out.push(ch);
    }
    let truncated: String = out.chars().take(max_len).collect();
    truncated.trim_matches('_').to_string()
}
