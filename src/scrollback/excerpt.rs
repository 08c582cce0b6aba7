//! Line selection and escape stripping for scrollback excerpts.
//!
//! These run on a private copy of the ring, outside the shared lock.

const ESC: u8 = 0x1b;

/// Returns the suffix of `raw` holding at most `max_lines` lines.
///
/// A single trailing newline terminates the last line rather than opening an
/// empty one.
pub fn tail_lines(raw: &[u8], max_lines: usize) -> &[u8] {
    if max_lines == 0 || raw.is_empty() {
        return &raw[raw.len()..];
    }

    let scan_end = if raw.ends_with(b"\n") {
        raw.len() - 1
    } else {
        raw.len()
    };

    let mut seen = 0;
    for (idx, byte) in raw[..scan_end].iter().enumerate().rev() {
        if *byte == b'\n' {
            seen += 1;
            if seen == max_lines {
                return &raw[idx + 1..];
            }
        }
    }
    raw
}

/// Removes CSI sequences (`ESC [` through the first ASCII letter) and
/// two-byte `ESC x` sequences.
///
/// Longer string-terminated sequences (OSC, DCS) only lose their introducer.
pub fn strip_escapes(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    let mut idx = 0;

    while idx < input.len() {
        let byte = input[idx];
        if byte != ESC {
            out.push(byte);
            idx += 1;
            continue;
        }

        match input.get(idx + 1) {
            Some(b'[') => {
                let body = &input[idx + 2..];
                match body.iter().position(u8::is_ascii_alphabetic) {
                    Some(end) => idx += 2 + end + 1,
                    // Unterminated CSI runs to the end of the excerpt.
                    None => break,
                }
            }
            Some(_) => idx += 2,
            None => break,
        }
    }

    out
}

/// Selects the last `max_lines` lines of `raw` and strips escapes.
pub fn render_excerpt(raw: &[u8], max_lines: usize) -> String {
    let tail = tail_lines(raw, max_lines);
    String::from_utf8_lossy(&strip_escapes(tail)).into_owned()
}

/// Counts lines the way [`tail_lines`] does.
pub fn line_count(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    let body = text.strip_suffix('\n').unwrap_or(text);
    body.matches('\n').count() + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tail_lines_ignores_trailing_newline() {
        let raw = b"one\ntwo\nthree\n";
        assert_eq!(tail_lines(raw, 2), b"two\nthree\n");
        assert_eq!(tail_lines(raw, 1), b"three\n");
        assert_eq!(tail_lines(raw, 3), raw);
        assert_eq!(tail_lines(raw, 10), raw);
    }

    #[test]
    fn tail_lines_keeps_partial_last_line() {
        let raw = b"one\ntwo\n$ pro";
        assert_eq!(tail_lines(raw, 1), b"$ pro");
        assert_eq!(tail_lines(raw, 2), b"two\n$ pro");
    }

    #[test]
    fn tail_lines_zero_is_empty() {
        assert!(tail_lines(b"one\ntwo\n", 0).is_empty());
        assert!(tail_lines(b"", 5).is_empty());
    }

    #[test]
    fn strip_removes_csi_sequences_through_final_letter() {
        let raw = b"\x1b[1;31mred\x1b[0m plain \x1b[2K\x1b[?25hdone";
        assert_eq!(strip_escapes(raw), b"red plain done");
    }

    #[test]
    fn strip_removes_two_byte_escapes() {
        assert_eq!(strip_escapes(b"a\x1b=b\x1b>c\x1b7d"), b"abcd");
    }

    #[test]
    fn strip_drops_unterminated_tail() {
        assert_eq!(strip_escapes(b"text\x1b[38;5"), b"text");
        assert_eq!(strip_escapes(b"text\x1b"), b"text");
    }

    #[test]
    fn string_terminated_sequences_only_lose_introducer() {
        // Known gap: OSC payloads survive apart from the introducer and ST.
        let stripped = strip_escapes(b"\x1b]0;title\x07prompt");
        assert_eq!(stripped, b"0;title\x07prompt");
    }

    #[test]
    fn render_excerpt_selects_then_strips() {
        let raw = b"\x1b[32mfirst\x1b[0m\nsecond\n\x1b[1mthird\x1b[0m\n";
        assert_eq!(render_excerpt(raw, 2), "second\nthird\n");
    }

    #[test]
    fn line_count_matches_tail_selection() {
        assert_eq!(line_count(""), 0);
        assert_eq!(line_count("a"), 1);
        assert_eq!(line_count("a\n"), 1);
        assert_eq!(line_count("a\nb"), 2);
        assert_eq!(line_count("a\nb\n"), 2);
    }
}
