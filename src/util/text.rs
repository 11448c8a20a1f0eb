use std::borrow::Cow;

use unicode_width::UnicodeWidthChar;

/// Ellipsis appended to truncated text
const ELLIPSIS: &str = "...";
const ELLIPSIS_WIDTH: usize = 3;

/// Longest slug derived from a title
const MAX_SLUG_LEN: usize = 80;

/// Truncates a string to fit within `max_width` terminal columns.
///
/// Appends "..." when text is cut. Borrows when the string already fits.
/// Widths at or below the ellipsis width are filled with plain characters.
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if max_width == 0 {
        return Cow::Borrowed("");
    }

    let budget = if max_width <= ELLIPSIS_WIDTH {
        max_width
    } else {
        max_width - ELLIPSIS_WIDTH
    };

    let mut width = 0;
    let mut cut = None;
    for (idx, c) in s.char_indices() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if cut.is_none() && width + w > budget {
            cut = Some(idx);
        }
        if width + w > max_width {
            let cut = cut.unwrap_or(idx);
            return if max_width <= ELLIPSIS_WIDTH {
                Cow::Owned(s[..cut].to_string())
            } else {
                Cow::Owned(format!("{}{}", &s[..cut], ELLIPSIS))
            };
        }
        width += w;
    }
    Cow::Borrowed(s)
}

/// Strip terminal control characters and ANSI escape sequences.
///
/// Scraped titles and descriptions are rendered straight into the terminal,
/// so ESC sequences, C0 controls and DEL are removed. Tab and newline
/// survive. Borrows when nothing needs stripping.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    let is_control = |c: char| c == '\u{1b}' || c == '\u{7f}' || (c < ' ' && c != '\t' && c != '\n');
    if !s.chars().any(is_control) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\u{1b}' {
            match chars.peek() {
                // CSI: parameters until a final byte in 0x40..=0x7e
                Some('[') => {
                    chars.next();
                    for next in chars.by_ref() {
                        if ('\u{40}'..='\u{7e}').contains(&next) {
                            break;
                        }
                    }
                }
                // OSC: until BEL or ST
                Some(']') => {
                    chars.next();
                    while let Some(next) = chars.next() {
                        if next == '\u{07}' {
                            break;
                        }
                        if next == '\u{1b}' && chars.peek() == Some(&'\\') {
                            chars.next();
                            break;
                        }
                    }
                }
                _ => {}
            }
        } else if !is_control(c) {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

/// Lowercase ASCII slug: alphanumerics kept, everything else collapsed to `-`.
pub fn slugify(s: &str) -> String {
    let mut slug = String::with_capacity(s.len().min(MAX_SLUG_LEN));
    let mut pending_dash = false;
    for c in s.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
            if slug.len() >= MAX_SLUG_LEN {
                break;
            }
        } else {
            pending_dash = true;
        }
    }
    slug
}
