use unicode_width::UnicodeWidthChar;

/// Truncate a string to at most `max_width` terminal columns, appending `…`
/// when anything was cut. Borrows when nothing needs to change.
pub fn truncate_width(s: &str, max_width: usize) -> std::borrow::Cow<'_, str> {
    let mut used = 0;
    for (idx, ch) in s.char_indices() {
        let w = ch.width().unwrap_or(0);
        if used + w > max_width {
            if max_width == 0 {
                return "".into();
            }
            // Leave one column for the ellipsis.
            let mut cut = String::new();
            let mut cut_used = 0;
            for c in s[..idx].chars() {
                let cw = c.width().unwrap_or(0);
                if cut_used + cw + 1 > max_width {
                    break;
                }
                cut.push(c);
                cut_used += cw;
            }
            cut.push('…');
            return cut.into();
        }
        used += w;
    }
    s.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_strings_are_borrowed() {
        assert!(matches!(
            truncate_width("fix", 10),
            std::borrow::Cow::Borrowed("fix")
        ));
    }

    #[test]
    fn long_strings_get_ellipsis() {
        assert_eq!(truncate_width("refactor parser", 8), "refacto…");
        assert_eq!(truncate_width("abc", 0), "");
    }

    #[test]
    fn wide_characters_count_double() {
        // Each CJK character is two columns wide.
        assert_eq!(truncate_width("日本語テキスト", 7), "日本語…");
    }
}
