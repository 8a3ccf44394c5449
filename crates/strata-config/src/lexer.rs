//! Tokenizer turning raw path strings into navigable token sequences.

use crate::error::ConfigError;
use std::fmt;

/// One step of a parsed path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Token {
    /// A map key.
    Field(String),
    /// An array slot.
    Index(usize),
}

impl Token {
    /// Convenience constructor for a field token.
    pub fn field(name: impl Into<String>) -> Self {
        Token::Field(name.into())
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Field(name) => f.write_str(name),
            Token::Index(index) => write!(f, "[{index}]"),
        }
    }
}

/// Splits raw paths on an unescaped delimiter, with `[n]` index suffixes.
///
/// `db.hosts[0].name` tokenizes to `Field(db), Field(hosts), Index(0),
/// Field(name)`. A delimiter preceded by the escape character is literal:
/// `log\.level` is the single key `log.level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathLexer {
    delimiter: char,
    escape: char,
}

impl Default for PathLexer {
    fn default() -> Self {
        Self {
            delimiter: '.',
            escape: '\\',
        }
    }
}

impl PathLexer {
    /// Lexer with a custom delimiter (escape stays `\`).
    pub fn with_delimiter(delimiter: char) -> Self {
        Self {
            delimiter,
            escape: '\\',
        }
    }

    /// The configured delimiter.
    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Tokenize a raw path. The empty path is the tree root (no tokens).
    ///
    /// Fails with [`ConfigError::InvalidPath`] when a bracket suffix is not
    /// a valid non-negative integer or a segment is malformed; the failure
    /// is fatal for this call only.
    pub fn tokenize(&self, path: &str) -> Result<Vec<Token>, ConfigError> {
        if path.is_empty() {
            return Ok(Vec::new());
        }
        let mut tokens = Vec::new();
        for segment in self.split_segments(path) {
            self.tokenize_segment(path, &segment)
                .map(|parsed| tokens.extend(parsed))?;
        }
        Ok(tokens)
    }

    /// Split on unescaped delimiters, dropping the escape character in the
    /// returned segments.
    fn split_segments(&self, path: &str) -> Vec<String> {
        let mut segments = Vec::new();
        let mut current = String::new();
        let mut escaped = false;
        for ch in path.chars() {
            if escaped {
                current.push(ch);
                escaped = false;
            } else if ch == self.escape {
                escaped = true;
            } else if ch == self.delimiter {
                segments.push(std::mem::take(&mut current));
            } else {
                current.push(ch);
            }
        }
        if escaped {
            // Trailing escape escapes nothing; keep it literal.
            current.push(self.escape);
        }
        segments.push(current);
        segments
    }

    /// Turn one segment into a field token plus its trailing index tokens.
    fn tokenize_segment(&self, path: &str, segment: &str) -> Result<Vec<Token>, ConfigError> {
        if segment.is_empty() {
            return Err(ConfigError::InvalidPath {
                path: path.to_string(),
                reason: "empty path segment".to_string(),
            });
        }

        let name_end = segment.find('[').unwrap_or(segment.len());
        let (name, mut suffix) = segment.split_at(name_end);
        if name.is_empty() {
            return Err(ConfigError::InvalidPath {
                path: path.to_string(),
                reason: format!("segment '{segment}' has an index suffix but no name"),
            });
        }

        let mut tokens = vec![Token::field(name)];
        while !suffix.is_empty() {
            let close = suffix.find(']').ok_or_else(|| ConfigError::InvalidPath {
                path: path.to_string(),
                reason: format!("unterminated index suffix in segment '{segment}'"),
            })?;
            let digits = &suffix[1..close];
            let index = digits.parse::<usize>().map_err(|_| ConfigError::InvalidPath {
                path: path.to_string(),
                reason: format!("'{digits}' is not a valid non-negative array index"),
            })?;
            tokens.push(Token::Index(index));
            suffix = &suffix[close + 1..];
            if !suffix.is_empty() && !suffix.starts_with('[') {
                return Err(ConfigError::InvalidPath {
                    path: path.to_string(),
                    reason: format!("unexpected trailing characters in segment '{segment}'"),
                });
            }
        }
        Ok(tokens)
    }
}

/// Render a token slice back to a dotted path, for diagnostics.
pub fn render_path(tokens: &[Token]) -> String {
    let mut out = String::new();
    for token in tokens {
        match token {
            Token::Field(name) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(name);
            }
            Token::Index(index) => {
                out.push('[');
                out.push_str(&index.to_string());
                out.push(']');
            }
        }
    }
    out
}
