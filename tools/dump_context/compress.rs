//! Lossy content compression used to cut token volume in the dump.

use std::borrow::Cow;

/// Line prefixes treated as comments in compressed mode.
const COMMENT_MARKERS: &[&str] = &["#", "//", "/*", "*"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMode {
    /// Keep the original formatting.
    None,
    /// Drop blank and comment lines, then join the rest with "; ".
    Compressed,
}

impl CompressionMode {
    /// Map an interactive menu choice ("1" / "2") to a mode.
    pub fn from_choice(choice: &str) -> Option<Self> {
        match choice.trim() {
            "1" => Some(Self::None),
            "2" => Some(Self::Compressed),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::None => "none (original formatting)",
            Self::Compressed => "compressed (comments, blank lines and newlines removed)",
        }
    }
}

pub fn compress_content(content: &str, mode: CompressionMode) -> Cow<'_, str> {
    match mode {
        CompressionMode::None => Cow::Borrowed(content),
        CompressionMode::Compressed => {
            // Blank fragments (e.g. between "\r" and "\n") are filtered out below.
            let kept: Vec<&str> = content
                .split(is_line_break)
                .map(str::trim)
                .filter(|l| !l.is_empty() && !is_comment(l))
                .collect();
            Cow::Owned(kept.join("; "))
        }
    }
}

/// Every separator recognised as a line boundary, including bare `\r`.
fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c'..='\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

fn is_comment(line: &str) -> bool {
    COMMENT_MARKERS.iter().any(|m| line.starts_with(m))
}
