//! Line-break style detection.

/// The dominant line-break style of a piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineBreak {
    /// Windows-style `\r\n`.
    Crlf,
    /// Classic-Mac-style `\r`.
    Cr,
    /// Unix-style `\n`. Default for empty or LF-only text.
    Lf,
}

impl LineBreak {
    /// Detect the line-break style of `text`.
    ///
    /// A `\r\n` anywhere wins over a bare `\r`; text with neither
    /// (including empty text) is LF.
    pub fn detect(text: &str) -> Self {
        if text.contains("\r\n") {
            LineBreak::Crlf
        } else if text.contains('\r') {
            LineBreak::Cr
        } else {
            LineBreak::Lf
        }
    }

    /// The literal byte sequence for this style.
    pub fn as_str(&self) -> &'static str {
        match self {
            LineBreak::Crlf => "\r\n",
            LineBreak::Cr => "\r",
            LineBreak::Lf => "\n",
        }
    }

    /// Replace internal LF line breaks with this style.
    pub fn restore(&self, lf_text: &str) -> String {
        match self {
            LineBreak::Lf => lf_text.to_string(),
            other => lf_text.replace('\n', other.as_str()),
        }
    }
}

impl std::fmt::Display for LineBreak {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LineBreak::Crlf => write!(f, "CRLF"),
            LineBreak::Cr => write!(f, "CR"),
            LineBreak::Lf => write!(f, "LF"),
        }
    }
}

/// Normalize any line-break style to LF.
pub fn normalize_to_lf(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_crlf() {
        assert_eq!(LineBreak::detect("a\r\nb\r\n"), LineBreak::Crlf);
    }

    #[test]
    fn test_detect_cr() {
        assert_eq!(LineBreak::detect("a\rb\r"), LineBreak::Cr);
    }

    #[test]
    fn test_detect_lf() {
        assert_eq!(LineBreak::detect("a\nb\n"), LineBreak::Lf);
    }

    #[test]
    fn test_detect_empty_defaults_to_lf() {
        assert_eq!(LineBreak::detect(""), LineBreak::Lf);
    }

    #[test]
    fn test_crlf_wins_over_cr() {
        // Mixed text with both: CRLF is checked first.
        assert_eq!(LineBreak::detect("a\r\nb\rc"), LineBreak::Crlf);
    }

    #[test]
    fn test_no_breaks_is_lf() {
        assert_eq!(LineBreak::detect("single line"), LineBreak::Lf);
    }

    #[test]
    fn test_normalize_to_lf() {
        assert_eq!(normalize_to_lf("a\r\nb\rc\n"), "a\nb\nc\n");
    }

    #[test]
    fn test_restore_crlf() {
        assert_eq!(LineBreak::Crlf.restore("a\nb\n"), "a\r\nb\r\n");
    }

    #[test]
    fn test_restore_lf_is_identity() {
        assert_eq!(LineBreak::Lf.restore("a\nb\n"), "a\nb\n");
    }
}
