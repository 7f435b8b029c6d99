//! Console color decoration for format strings
//!
//! A format string is split into typed segments and every segment is wrapped
//! in the ANSI color its kind calls for. Only escape bytes are ever added, so
//! the printf directives survive untouched for the renderer.

use crate::severity::Severity;

/// ANSI reset sequence
pub const RESET: &str = "\x1b[0m";
/// Bright red foreground
pub const BRIGHT_RED: &str = "\x1b[91m";
/// Bright green foreground
pub const BRIGHT_GREEN: &str = "\x1b[92m";
/// Bright yellow foreground
pub const BRIGHT_YELLOW: &str = "\x1b[93m";
/// Bright cyan foreground
pub const BRIGHT_CYAN: &str = "\x1b[96m";

/// Verb characters recognised after `%`
pub const VERBS: &[u8] = b"vTsdfqbcoxXUeEgGpt";

/// Flag characters allowed between `%` and the verb
const FLAGS: &[u8] = b"-+ #0";

/// Kind of a format string segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// A printf directive such as `%s` or `%-5d`
    Placeholder,
    /// A single `[` or `]`
    Bracket,
    /// A run of text without `%`, `[` or `]`
    Literal,
    /// `%%` or a `%` that does not start a directive
    Unmatched,
}

/// A slice of a format string tagged with its kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    pub kind: SegmentKind,
    pub text: &'a str,
}

impl<'a> Segment<'a> {
    fn new(kind: SegmentKind, text: &'a str) -> Self {
        Self { kind, text }
    }
}

/// Length in bytes of the printf directive starting at `bytes[0] == b'%'`
///
/// Returns `None` when the `%` does not begin a recognised directive.
pub(crate) fn directive_len(bytes: &[u8]) -> Option<usize> {
    let mut i = 1;
    while i < bytes.len() && FLAGS.contains(&bytes[i]) {
        i += 1;
    }
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
    }
    match bytes.get(i) {
        Some(verb) if VERBS.contains(verb) => Some(i + 1),
        _ => None,
    }
}

/// Split a format string into segments, left to right
///
/// Concatenating the segment texts gives back the input exactly.
pub fn tokenize(format: &str) -> Vec<Segment<'_>> {
    let bytes = format.as_bytes();
    let mut segments = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                if bytes.get(i + 1) == Some(&b'%') {
                    segments.push(Segment::new(SegmentKind::Unmatched, &format[i..i + 2]));
                    i += 2;
                } else if let Some(len) = directive_len(&bytes[i..]) {
                    segments.push(Segment::new(SegmentKind::Placeholder, &format[i..i + len]));
                    i += len;
                } else {
                    segments.push(Segment::new(SegmentKind::Unmatched, &format[i..i + 1]));
                    i += 1;
                }
            }
            b'[' | b']' => {
                segments.push(Segment::new(SegmentKind::Bracket, &format[i..i + 1]));
                i += 1;
            }
            _ => {
                let start = i;
                while i < bytes.len() && !matches!(bytes[i], b'%' | b'[' | b']') {
                    i += 1;
                }
                segments.push(Segment::new(SegmentKind::Literal, &format[start..i]));
            }
        }
    }

    segments
}

/// Color for a segment kind at a given severity, `None` for uncolored
pub fn segment_color(kind: SegmentKind, severity: Severity) -> Option<&'static str> {
    match kind {
        SegmentKind::Placeholder => Some(BRIGHT_YELLOW),
        SegmentKind::Bracket | SegmentKind::Unmatched => None,
        SegmentKind::Literal => Some(match severity {
            Severity::Error => BRIGHT_RED,
            Severity::Info => BRIGHT_GREEN,
            _ => BRIGHT_CYAN,
        }),
    }
}

/// Wrap every segment of `format` in its color for `severity`
pub fn colorize(format: &str, severity: Severity) -> String {
    let mut out = String::with_capacity(format.len() * 2);
    for segment in tokenize(format) {
        match segment_color(segment.kind, severity) {
            Some(color) => {
                out.push_str(color);
                out.push_str(segment.text);
                out.push_str(RESET);
            }
            None => out.push_str(segment.text),
        }
    }
    out
}

/// Remove ANSI CSI escape sequences from `s`
pub fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            // Parameters run until the final byte in 0x40..=0x7e
            for c in chars.by_ref() {
                if ('\x40'..='\x7e').contains(&c) {
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(format: &str) -> Vec<SegmentKind> {
        tokenize(format).iter().map(|s| s.kind).collect()
    }

    fn placeholders(format: &str) -> Vec<String> {
        tokenize(format)
            .into_iter()
            .filter(|s| s.kind == SegmentKind::Placeholder)
            .map(|s| s.text.to_string())
            .collect()
    }

    #[test]
    fn test_tokenize_mixed() {
        let segments = tokenize("[%s] took %dms");
        let texts: Vec<&str> = segments.iter().map(|s| s.text).collect();
        assert_eq!(texts, vec!["[", "%s", "]", " took ", "%d", "ms"]);
        assert_eq!(
            kinds("[%s] took %dms"),
            vec![
                SegmentKind::Bracket,
                SegmentKind::Placeholder,
                SegmentKind::Bracket,
                SegmentKind::Literal,
                SegmentKind::Placeholder,
                SegmentKind::Literal,
            ]
        );
    }

    #[test]
    fn test_tokenize_directive_with_width() {
        let segments = tokenize("%-8s|%05.2f");
        assert_eq!(segments[0].text, "%-8s");
        assert_eq!(segments[2].text, "%05.2f");
    }

    #[test]
    fn test_tokenize_percent_escape_and_stray_percent() {
        assert_eq!(
            kinds("100%% done %"),
            vec![
                SegmentKind::Literal,
                SegmentKind::Unmatched,
                SegmentKind::Literal,
                SegmentKind::Unmatched,
            ]
        );
        // A non-verb after `%` leaves the `%` alone
        assert_eq!(kinds("%k"), vec![SegmentKind::Unmatched, SegmentKind::Literal]);
    }

    #[test]
    fn test_tokenize_reassembles_exactly() {
        let input = "héllo [wörld] %v%% %z ]]";
        let rebuilt: String = tokenize(input).iter().map(|s| s.text).collect();
        assert_eq!(rebuilt, input);
    }

    #[test]
    fn test_segment_color_by_severity() {
        assert_eq!(segment_color(SegmentKind::Literal, Severity::Error), Some(BRIGHT_RED));
        assert_eq!(segment_color(SegmentKind::Literal, Severity::Info), Some(BRIGHT_GREEN));
        for severity in [
            Severity::Trace,
            Severity::Debug,
            Severity::Warning,
            Severity::Fatal,
        ] {
            assert_eq!(segment_color(SegmentKind::Literal, severity), Some(BRIGHT_CYAN));
        }
        for severity in Severity::ALL {
            assert_eq!(
                segment_color(SegmentKind::Placeholder, severity),
                Some(BRIGHT_YELLOW)
            );
            assert_eq!(segment_color(SegmentKind::Bracket, severity), None);
        }
    }

    #[test]
    fn test_colorize_info_line() {
        let colored = colorize("User %s logged in", Severity::Info);
        assert_eq!(
            colored,
            format!(
                "{g}User {r}{y}%s{r}{g} logged in{r}",
                g = BRIGHT_GREEN,
                y = BRIGHT_YELLOW,
                r = RESET
            )
        );
    }

    #[test]
    fn test_colorize_leaves_brackets_plain() {
        let colored = colorize("[a]", Severity::Error);
        assert_eq!(colored, format!("[{}a{}]", BRIGHT_RED, RESET));
    }

    #[test]
    fn test_colorize_only_adds_escapes() {
        let inputs = [
            "",
            "plain",
            "%s %d %v %T %q %x %X %U %e %E %g %G %p %b %c %o %f %t",
            "[%s][%d]",
            "50%% of [%5.1f] %",
            "ünïcode %s ✓",
        ];
        for input in inputs {
            for severity in Severity::ALL {
                let colored = colorize(input, severity);
                assert_eq!(strip_ansi(&colored), input);
                assert_eq!(placeholders(&strip_ansi(&colored)), placeholders(input));
            }
        }
    }

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi("\x1b[92mok\x1b[0m"), "ok");
        assert_eq!(strip_ansi("no escapes"), "no escapes");
    }
}
