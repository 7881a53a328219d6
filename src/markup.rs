//! Targeted text scanning over the notebook XML
//!
//! The notebook vocabulary we touch is tiny (`page`, `background` and the
//! root element), so tags are located by scanning rather than by a full
//! XML parser. Everything that looks at raw markup goes through here.

use std::ops::Range;

/// Find the first start tag named `name` at or after `from`.
///
/// Returns the byte range covering `<name ...>` or `<name .../>`. A tag name
/// only matches when followed by whitespace, `>` or `/`, so `<page` never
/// matches `<pagebreak`.
pub fn find_start_tag(text: &str, name: &str, from: usize) -> Option<Range<usize>> {
    let needle = format!("<{}", name);
    let mut cursor = from;

    while let Some(rel) = text.get(cursor..)?.find(&needle) {
        let start = cursor + rel;
        let after = start + needle.len();
        match text[after..].chars().next() {
            Some(c) if c.is_whitespace() || c == '>' || c == '/' => {
                let end = after + text[after..].find('>')? + 1;
                return Some(start..end);
            }
            _ => cursor = after,
        }
    }

    None
}

/// Find the last occurrence of `</name>` and return its byte range.
pub fn find_last_end_tag(text: &str, name: &str) -> Option<Range<usize>> {
    let needle = format!("</{}>", name);
    text.rfind(&needle).map(|start| start..start + needle.len())
}

/// Name of the first element in the text, skipping the XML declaration,
/// comments and doctype.
pub fn root_element_name(text: &str) -> Option<&str> {
    let mut cursor = 0;
    while let Some(rel) = text[cursor..].find('<') {
        let start = cursor + rel + 1;
        let rest = &text[start..];
        if rest.starts_with('?') || rest.starts_with('!') {
            cursor = start;
            continue;
        }
        let len = rest
            .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
            .unwrap_or(rest.len());
        return (len > 0).then(|| &rest[..len]);
    }
    None
}

/// Raw (still escaped) value of attribute `name` inside a single tag.
pub fn attr_value<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    let needle = format!("{}=\"", name);
    let mut cursor = 0;

    while let Some(rel) = tag[cursor..].find(&needle) {
        let start = cursor + rel;
        let preceded_by_space = tag[..start]
            .chars()
            .next_back()
            .is_some_and(char::is_whitespace);
        let value_start = start + needle.len();
        if preceded_by_space {
            let value_len = tag[value_start..].find('"')?;
            return Some(&tag[value_start..value_start + value_len]);
        }
        cursor = value_start;
    }

    None
}

/// Escape text for use inside a double-quoted attribute value.
pub fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Undo the predefined XML entity escapes in an attribute value.
///
/// Unknown entities are left untouched.
pub fn unescape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let replaced = [
            ("&amp;", '&'),
            ("&lt;", '<'),
            ("&gt;", '>'),
            ("&quot;", '"'),
            ("&apos;", '\''),
        ]
        .iter()
        .find(|(entity, _)| rest.starts_with(*entity));

        match replaced {
            Some((entity, c)) => {
                out.push(*c);
                rest = &rest[entity.len()..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_start_tag_respects_name_boundary() {
        let text = "<pagebreak/>\n<page width=\"1\">\n</page>";
        let range = find_start_tag(text, "page", 0).unwrap();
        assert_eq!(&text[range], "<page width=\"1\">");
    }

    #[test]
    fn test_find_last_end_tag() {
        let text = "<page>a</page><page>b</page>tail";
        let range = find_last_end_tag(text, "page").unwrap();
        assert_eq!(&text[range.end..], "tail");
        assert!(find_last_end_tag(text, "layer").is_none());
    }

    #[test]
    fn test_root_element_skips_prolog() {
        let text = "<?xml version=\"1.0\"?>\n<!-- note -->\n<xournal creator=\"x\">";
        assert_eq!(root_element_name(text), Some("xournal"));
        assert_eq!(root_element_name("no markup"), None);
    }

    #[test]
    fn test_attr_value_needs_word_boundary() {
        let tag = r#"<background type="pdf" xfilename="no" filename="a.pdf" pageno="3ll"/>"#;
        assert_eq!(attr_value(tag, "filename"), Some("a.pdf"));
        assert_eq!(attr_value(tag, "pageno"), Some("3ll"));
        assert_eq!(attr_value(tag, "domain"), None);
    }

    #[test]
    fn test_escape_and_unescape() {
        let raw = r#"/tmp/Tom & Jerry "notes".pdf"#;
        let escaped = escape_attr(raw);
        assert_eq!(escaped, "/tmp/Tom &amp; Jerry &quot;notes&quot;.pdf");
        assert_eq!(unescape_attr(&escaped), raw);
        assert_eq!(unescape_attr("a &unknown; b"), "a &unknown; b");
    }
}
