//! Derive a local filename for a downloaded artifact.
//!
//! `Content-Disposition` wins when present (`filename*=` before `filename=`,
//! per RFC 6266); otherwise the last non-empty URL path segment is used.
//! Whatever comes back is reduced to a bare file name so a hostile header
//! cannot write outside the destination directory.

use percent_encoding::percent_decode_str;
use reqwest::Url;

/// Name used when neither the header nor the URL yields one.
pub const FALLBACK: &str = "download";

/// Parse a `Content-Disposition` header value.
pub fn from_content_disposition(header: &str) -> Option<String> {
    let mut plain = None;

    for (key, value) in parameters(header) {
        match key.as_str() {
            "filename*" => {
                // charset'language'percent-encoded
                let encoded = value.splitn(3, '\'').nth(2).unwrap_or(value.as_str());
                if let Ok(decoded) = percent_decode_str(encoded).decode_utf8() {
                    if let Some(name) = sanitize(&decoded) {
                        return Some(name);
                    }
                }
            }
            "filename" => plain = Some(value),
            _ => {}
        }
    }

    plain.and_then(|p| sanitize(&p))
}

/// Split `type; key=value; key="quoted; value"` into lowercased keys and
/// unquoted values. `;` inside a quoted string does not end the parameter,
/// and `\"` inside one is a literal quote.
fn parameters(header: &str) -> Vec<(String, String)> {
    let mut params = Vec::new();
    let mut chars = header.chars();
    // Skip the disposition type.
    for c in chars.by_ref() {
        if c == ';' {
            break;
        }
    }

    loop {
        let mut key = String::new();
        let mut value = String::new();
        let mut saw_eq = false;
        let mut in_quotes = false;
        let mut ended = true;

        while let Some(c) = chars.next() {
            match c {
                '"' if saw_eq => in_quotes = !in_quotes,
                '\\' if in_quotes => {
                    if let Some(escaped) = chars.next() {
                        value.push(escaped);
                    }
                }
                ';' if !in_quotes => {
                    ended = false;
                    break;
                }
                '=' if !saw_eq => saw_eq = true,
                c if saw_eq => value.push(c),
                c => key.push(c),
            }
        }

        if saw_eq {
            let key = key.trim().to_ascii_lowercase();
            if !key.is_empty() {
                params.push((key, value.trim().to_string()));
            }
        }
        if ended {
            return params;
        }
    }
}

/// Last non-empty path segment of `url`, percent-decoded.
pub fn from_url(url: &Url) -> Option<String> {
    let last = url.path_segments()?.rev().find(|s| !s.is_empty())?;
    let decoded = percent_decode_str(last).decode_utf8_lossy();
    sanitize(&decoded)
}

/// Reduce to a bare file name; reject empty and dot-only names.
fn sanitize(name: &str) -> Option<String> {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(name)
        .trim();
    if base.is_empty() || base.chars().all(|c| c == '.') {
        None
    } else {
        Some(base.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_filename() {
        assert_eq!(
            from_content_disposition("attachment; filename=\"table.xlsx\"").as_deref(),
            Some("table.xlsx")
        );
    }

    #[test]
    fn extended_filename_takes_precedence() {
        let h = "attachment; filename=\"fallback.pdf\"; filename*=UTF-8''r%C3%A9sum%C3%A9.pdf";
        assert_eq!(from_content_disposition(h).as_deref(), Some("résumé.pdf"));
    }

    #[test]
    fn semicolon_inside_quotes_is_part_of_the_name() {
        assert_eq!(
            from_content_disposition("attachment; filename=\"Q1; final.pdf\"").as_deref(),
            Some("Q1; final.pdf")
        );
        assert_eq!(
            from_content_disposition("attachment; filename=\"a \\\"b\\\".xlsx\"; size=10")
                .as_deref(),
            Some("a \"b\".xlsx")
        );
        assert_eq!(
            from_content_disposition("attachment;filename=plain.csv;creation-date=x").as_deref(),
            Some("plain.csv")
        );
    }

    #[test]
    fn header_without_filename() {
        assert_eq!(from_content_disposition("inline"), None);
        assert_eq!(from_content_disposition("attachment; filename=\"\""), None);
    }

    #[test]
    fn path_traversal_is_stripped() {
        assert_eq!(
            from_content_disposition("attachment; filename=\"../../etc/passwd\"").as_deref(),
            Some("passwd")
        );
        assert_eq!(from_content_disposition("attachment; filename=\"..\""), None);
    }

    #[test]
    fn url_last_segment() {
        let url = Url::parse("https://x.example/media/docs/My%20Report.docx").unwrap();
        assert_eq!(from_url(&url).as_deref(), Some("My Report.docx"));

        let url = Url::parse("https://x.example/api/files/12/").unwrap();
        assert_eq!(from_url(&url).as_deref(), Some("12"));

        let url = Url::parse("https://x.example/").unwrap();
        assert_eq!(from_url(&url), None);
    }
}
