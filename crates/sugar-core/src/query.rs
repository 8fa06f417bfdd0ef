//! Query string and urlencoded form parsing.
//!
//! Both `?a=1&b=2` query strings and `application/x-www-form-urlencoded`
//! bodies share this parser. Keys and values are percent-decoded on access,
//! `+` decodes to a space, and repeated keys keep every value in order.
//!
//! ```
//! use sugar_core::QueryString;
//!
//! let qs = QueryString::parse("tag=a&tag=b&q=hello+world");
//! assert_eq!(qs.get("q").as_deref(), Some("hello world"));
//! assert_eq!(qs.get_all("tag"), vec!["a", "b"]);
//! ```

use std::borrow::Cow;

/// A borrowed, lazily decoded query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueryString<'a> {
    raw: &'a str,
}

impl<'a> QueryString<'a> {
    /// Wrap a query string (without the leading `?`).
    #[must_use]
    pub fn parse(raw: &'a str) -> Self {
        Self {
            raw: raw.strip_prefix('?').unwrap_or(raw),
        }
    }

    /// Returns true if there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs().next().is_none()
    }

    /// The raw, undecoded string.
    #[must_use]
    pub fn raw(&self) -> &'a str {
        self.raw
    }

    /// Raw `(key, value)` pairs. Keys without `=` yield an empty value.
    pub fn raw_pairs(&self) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.raw
            .split('&')
            .filter(|s| !s.is_empty())
            .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
    }

    /// Decoded `(key, value)` pairs.
    pub fn pairs(&self) -> impl Iterator<Item = (Cow<'a, str>, Cow<'a, str>)> {
        self.raw_pairs()
            .map(|(k, v)| (percent_decode(k), percent_decode(v)))
    }

    /// First decoded value for a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Cow<'a, str>> {
        self.pairs().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Every decoded value for a key, in order.
    #[must_use]
    pub fn get_all(&self, key: &str) -> Vec<String> {
        self.pairs()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
            .collect()
    }

    /// Whether a key is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.pairs().any(|(k, _)| k == key)
    }

    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.raw_pairs().count()
    }
}

/// Percent-decode a string, treating `+` as a space.
///
/// Malformed escapes are kept verbatim and invalid UTF-8 is replaced
/// lossily. Borrows when nothing needs decoding.
#[must_use]
pub fn percent_decode(s: &str) -> Cow<'_, str> {
    if !s.contains(['%', '+']) {
        return Cow::Borrowed(s);
    }
    decode(s, true)
}

/// Percent-decode a URL path segment. Unlike form data, `+` stays literal.
#[must_use]
pub fn percent_decode_path(s: &str) -> Cow<'_, str> {
    if !s.contains('%') {
        return Cow::Borrowed(s);
    }
    decode(s, false)
}

fn decode(s: &str, plus_as_space: bool) -> Cow<'_, str> {

    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                match (hex_digit(bytes[i + 1]), hex_digit(bytes[i + 2])) {
                    (Some(hi), Some(lo)) => {
                        out.push(hi << 4 | lo);
                        i += 3;
                    }
                    _ => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b'+' if plus_as_space => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    Cow::Owned(String::from_utf8_lossy(&out).into_owned())
}

/// Percent-encode a form component. Unreserved characters pass through.
#[must_use]
pub fn percent_encode(s: &str) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = String::with_capacity(s.len());
    for &b in s.as_bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~') {
            out.push(char::from(b));
        } else {
            out.push('%');
            out.push(char::from(HEX[usize::from(b >> 4)]));
            out.push(char::from(HEX[usize::from(b & 0x0F)]));
        }
    }
    out
}

fn hex_digit(b: u8) -> Option<u8> {
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
    fn test_empty() {
        let qs = QueryString::parse("");
        assert!(qs.is_empty());
        assert_eq!(qs.len(), 0);
        assert_eq!(qs.get("any"), None);
    }

    #[test]
    fn test_leading_question_mark_is_stripped() {
        let qs = QueryString::parse("?a=1");
        assert_eq!(qs.raw(), "a=1");
        assert_eq!(qs.get("a").as_deref(), Some("1"));
    }

    #[test]
    fn test_repeated_keys() {
        let qs = QueryString::parse("a=1&b=2&a=3");
        assert_eq!(qs.get("a").as_deref(), Some("1"));
        assert_eq!(qs.get_all("a"), vec!["1", "3"]);
        assert_eq!(qs.len(), 3);
    }

    #[test]
    fn test_flag_and_empty_values() {
        let qs = QueryString::parse("flag&name=&&age=30&");
        assert!(qs.contains("flag"));
        assert_eq!(qs.get("flag").as_deref(), Some(""));
        assert_eq!(qs.get("name").as_deref(), Some(""));
        assert_eq!(qs.len(), 3);
    }

    #[test]
    fn test_keys_are_decoded() {
        let qs = QueryString::parse("x%5Fid=7&first+name=Ann");
        assert_eq!(qs.get("x_id").as_deref(), Some("7"));
        assert_eq!(qs.get("first name").as_deref(), Some("Ann"));
    }

    #[test]
    fn test_percent_decode() {
        assert!(matches!(percent_decode("hello"), Cow::Borrowed(_)));
        assert_eq!(percent_decode("hello%20world"), "hello world");
        assert_eq!(percent_decode("hello+world%21"), "hello world!");
        assert_eq!(percent_decode("caf%C3%A9"), "café");
        assert_eq!(percent_decode("a%26b%3Dc"), "a&b=c");
        assert_eq!(percent_decode("%2F"), "/");
    }

    #[test]
    fn test_percent_decode_path_keeps_plus() {
        assert!(matches!(percent_decode_path("a+b"), Cow::Borrowed("a+b")));
        assert_eq!(percent_decode_path("a+b%20c"), "a+b c");
        assert_eq!(percent_decode_path("%2B"), "+");
    }

    #[test]
    fn test_percent_decode_malformed() {
        assert_eq!(percent_decode("%ZZ"), "%ZZ");
        assert_eq!(percent_decode("%2"), "%2");
        assert_eq!(percent_decode("100%"), "100%");
    }

    #[test]
    fn test_percent_encode() {
        assert_eq!(percent_encode("plain-text_1.0~"), "plain-text_1.0~");
        assert_eq!(percent_encode("a b&c=d"), "a%20b%26c%3Dd");
        assert_eq!(percent_decode(&percent_encode("café/ü")), "café/ü");
    }
}
