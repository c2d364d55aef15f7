//! Cookie header parsing and session cookie decoding.

use std::borrow::Cow;

use super::AuthError;

/// The session cookie split into its signature prefix and raw session key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookieValue {
    pub signature: String,
    pub raw_key: String,
}

/// Split a `Cookie` header into `(name, value)` pairs in header order.
///
/// Pairs without `=` are skipped. Values are unquoted and percent-decoded.
pub fn parse_cookie_header(header: &str) -> Vec<(&str, String)> {
    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            Some((name, percent_decode(value).into_owned()))
        })
        .collect()
}

/// Find the session cookie in `header` and split it on the first `.`.
pub fn decode(header: Option<&str>, cookie_name: &str) -> Result<SessionCookieValue, AuthError> {
    let header = header.ok_or(AuthError::MissingCookie)?;

    // First occurrence wins, as browsers send the most specific path first.
    let value = parse_cookie_header(header)
        .into_iter()
        .find(|(name, _)| *name == cookie_name)
        .map(|(_, value)| value)
        .ok_or(AuthError::MissingCookie)?;

    let (signature, raw_key) = value.split_once('.').ok_or(AuthError::MalformedCookie)?;
    if raw_key.is_empty() {
        return Err(AuthError::MalformedCookie);
    }

    Ok(SessionCookieValue {
        signature: signature.to_string(),
        raw_key: raw_key.to_string(),
    })
}

/// Decode `%XX` escapes. Invalid escapes and non-UTF-8 results leave the input untouched.
fn percent_decode(input: &str) -> Cow<'_, str> {
    if !input.contains('%') {
        return Cow::Borrowed(input);
    }

    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_val(bytes[i + 1]), hex_val(bytes[i + 2])) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    match String::from_utf8(out) {
        Ok(s) => Cow::Owned(s),
        Err(_) => Cow::Borrowed(input),
    }
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_multiple_cookies() {
        let pairs = parse_cookie_header("theme=dark; qid=sig1.abc123;  lang = en ");
        assert_eq!(
            pairs,
            vec![
                ("theme", "dark".to_string()),
                ("qid", "sig1.abc123".to_string()),
                ("lang", "en".to_string()),
            ]
        );
    }

    #[test]
    fn skips_pairs_without_equals() {
        let pairs = parse_cookie_header("garbage; qid=a.b");
        assert_eq!(pairs, vec![("qid", "a.b".to_string())]);
    }

    #[test]
    fn decodes_session_cookie() {
        let value = decode(Some("qid=sig1.abc123"), "qid").unwrap();
        assert_eq!(value.raw_key, "abc123");
        assert_eq!(value.signature, "sig1");
    }

    #[test]
    fn splits_only_on_first_separator() {
        let value = decode(Some("qid=sig.key.with.dots"), "qid").unwrap();
        assert_eq!(value.raw_key, "key.with.dots");
    }

    #[test]
    fn percent_encoded_and_quoted_values_are_decoded() {
        let value = decode(Some("qid=\"s%3Asig.abc%2D1\""), "qid").unwrap();
        assert_eq!(value.signature, "s:sig");
        assert_eq!(value.raw_key, "abc-1");
    }

    #[test]
    fn invalid_escape_is_left_as_is() {
        assert_eq!(percent_decode("100%zz"), "100%zz");
        assert_eq!(percent_decode("trailing%"), "trailing%");
        assert_eq!(percent_decode("a%2"), "a%2");
    }

    #[test]
    fn missing_header_is_missing_cookie() {
        assert_eq!(decode(None, "qid"), Err(AuthError::MissingCookie));
    }

    #[test]
    fn other_cookies_only_is_missing_cookie() {
        assert_eq!(
            decode(Some("theme=dark; qidx=a.b"), "qid"),
            Err(AuthError::MissingCookie)
        );
    }

    #[test]
    fn value_without_separator_is_malformed() {
        assert_eq!(decode(Some("qid=abc123"), "qid"), Err(AuthError::MalformedCookie));
    }

    #[test]
    fn empty_raw_key_is_malformed() {
        assert_eq!(decode(Some("qid=sig."), "qid"), Err(AuthError::MalformedCookie));
    }

    #[test]
    fn first_occurrence_wins() {
        let value = decode(Some("qid=a.first; qid=b.second"), "qid").unwrap();
        assert_eq!(value.raw_key, "first");
    }
}
