use super::identifier::present;

/// Separator substituted for the `\x02` control character in akas list columns.
pub const ATTRIBUTE_SEPARATOR: char = '|';
const ARRAY_CONTROL_SEPARATOR: char = '\u{2}';

/// Canonical display form of a category label.
///
/// Underscores become spaces, the first character is upper-cased and the rest
/// lower-cased, so `tv_series`, `Tv series` and `TV_SERIES` all map to `Tv series`.
/// This string is the only deduplication key for dictionary entries.
pub fn normalize_label(raw: &str) -> Option<String> {
    let value = present(Some(raw))?;
    let spaced = value.replace('_', " ");
    let mut chars = spaced.chars();
    let first = chars.next()?;
    let mut out = String::with_capacity(spaced.len());
    out.extend(first.to_uppercase());
    out.extend(chars.flat_map(char::to_lowercase));
    Some(out)
}

/// Trimmed free text (names, countries); blank and null-marker values are absent.
pub fn clean_token(raw: &str) -> Option<&str> {
    present(Some(raw))
}

/// Truncate to at most `max_chars` characters without splitting a code point.
pub fn clip(value: &str, max_chars: usize) -> &str {
    match value.char_indices().nth(max_chars) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}

/// Split a delimited list, yielding `(position, token)` with 1-based positions.
///
/// Blank tokens are skipped but still consume a position so ordinals stay
/// aligned with the source list.
pub fn split_list(raw: Option<&str>, separator: char) -> Vec<(i32, &str)> {
    let Some(value) = present(raw) else {
        return Vec::new();
    };
    value
        .split(separator)
        .zip(1..)
        .filter_map(|(token, pos)| {
            let token = token.trim();
            (!token.is_empty()).then_some((pos, token))
        })
        .collect()
}

/// Split an akas attribute/type column, where entries are joined either by the
/// `\x02` control character or by a pipe.
pub fn split_attribute_list(raw: Option<&str>) -> Vec<&str> {
    let Some(value) = present(raw) else {
        return Vec::new();
    };
    value
        .split(|c| c == ARRAY_CONTROL_SEPARATOR || c == ATTRIBUTE_SEPARATOR)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .collect()
}

/// Parse the principals `characters` column (`["Self","Host"]`).
///
/// Falls back to a quote-stripping split for arrays that are not valid JSON
/// and to the raw value when there are no brackets at all.
pub fn parse_characters(raw: Option<&str>) -> Vec<String> {
    let Some(value) = present(raw) else {
        return Vec::new();
    };
    if !(value.starts_with('[') && value.ends_with(']')) {
        return vec![value.to_string()];
    }
    let parsed = match serde_json::from_str::<Vec<String>>(value) {
        Ok(items) => items,
        Err(_) => value[1..value.len() - 1]
            .replace("\",\"", "\t")
            .replace('"', "")
            .split('\t')
            .map(str::to_string)
            .collect(),
    };
    parsed
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty() && c != super::identifier::NULL_MARKER)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equivalent_labels_collapse() {
        let variants = ["tv_series", "Tv series", "TV_SERIES", "tv series", " tv_Series "];
        for v in variants {
            assert_eq!(normalize_label(v).as_deref(), Some("Tv series"), "{v}");
        }
        assert_eq!(normalize_label("actor"), normalize_label("Actor"));
        assert_eq!(normalize_label("miscellaneous").as_deref(), Some("Miscellaneous"));
    }

    #[test]
    fn absent_labels_are_none() {
        assert_eq!(normalize_label(""), None);
        assert_eq!(normalize_label("   "), None);
        assert_eq!(normalize_label("\\N"), None);
    }

    #[test]
    fn clip_respects_char_boundaries() {
        assert_eq!(clip("Amélie", 3), "Amé");
        assert_eq!(clip("short", 200), "short");
    }

    #[test]
    fn split_list_keeps_source_positions() {
        let parts = split_list(Some("actor,,director, writer"), ',');
        assert_eq!(parts, vec![(1, "actor"), (3, "director"), (4, "writer")]);
        assert!(split_list(Some("\\N"), ',').is_empty());
        assert!(split_list(None, ',').is_empty());
    }

    #[test]
    fn attribute_lists_accept_control_and_pipe_separators() {
        assert_eq!(
            split_attribute_list(Some("literal title\u{2}informal title")),
            vec!["literal title", "informal title"]
        );
        assert_eq!(
            split_attribute_list(Some("alternative|working")),
            vec!["alternative", "working"]
        );
        assert!(split_attribute_list(Some("\\N")).is_empty());
    }

    #[test]
    fn characters_parse_json_and_fallbacks() {
        assert_eq!(
            parse_characters(Some(r#"["Self","Host"]"#)),
            vec!["Self".to_string(), "Host".to_string()]
        );
        assert_eq!(
            parse_characters(Some(r#"["Bad "quote","Ok"]"#)),
            vec!["Bad quote".to_string(), "Ok".to_string()]
        );
        assert_eq!(parse_characters(Some("Narrator")), vec!["Narrator".to_string()]);
        assert!(parse_characters(Some("\\N")).is_empty());
    }
}
