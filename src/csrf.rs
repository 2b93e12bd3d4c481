use crate::page::Page;
use crate::selector::Selector;

pub(crate) const CSRF_COOKIE_NAME: &str = "csrftoken";
pub(crate) const CSRF_HIDDEN_FIELD_NAME: &str = "csrfmiddlewaretoken";
pub(crate) const CSRF_HEADER: &str = "X-CSRFToken";

/// Where a page reads its CSRF token from. The cookie is the session-wide
/// source; the hidden field is embedded per form by the backend templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Cookie,
    HiddenField,
}

/// First `name=value` pair in the cookie string whose key matches, with the
/// value percent-decoded. Returns `None` when the cookie is absent.
pub(crate) fn cookie_token(cookie: &str, name: &str) -> Option<String> {
    if cookie.is_empty() {
        return None;
    }
    for pair in cookie.split(';') {
        let pair = pair.trim();
        if let Some(value) = pair.strip_prefix(name) {
            if let Some(value) = value.strip_prefix('=') {
                return Some(percent_decode(value));
            }
        }
    }
    None
}

/// Percent-decoding without form semantics (`+` stays `+`). Malformed
/// escapes pass through literally rather than failing the lookup.
fn percent_decode(src: &str) -> String {
    let bytes = src.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0usize;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let decoded = bytes
                .get(i + 1)
                .and_then(|b| from_hex_digit(*b))
                .zip(bytes.get(i + 2).and_then(|b| from_hex_digit(*b)));
            if let Some((hi, lo)) = decoded {
                out.push((hi << 4) | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn from_hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

impl Page {
    /// Reads the session token. No shape validation; an empty or missing
    /// token simply means mutating requests go out without the header and
    /// the backend gets to reject them.
    pub fn csrf_token(&self, source: TokenSource) -> Option<String> {
        match source {
            TokenSource::Cookie => cookie_token(self.cookie(), CSRF_COOKIE_NAME),
            TokenSource::HiddenField => {
                let selector =
                    Selector::parse(&format!("[name={CSRF_HIDDEN_FIELD_NAME}]")).ok()?;
                let node = selector
                    .query_all(self.dom(), self.dom().root())
                    .into_iter()
                    .next()?;
                self.dom().value(node).map(ToOwned::to_owned)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_the_matching_cookie_value() {
        assert_eq!(
            cookie_token("csrftoken=ABC123; other=xyz", "csrftoken"),
            Some("ABC123".to_string())
        );
    }

    #[test]
    fn ignores_keys_that_only_share_a_prefix() {
        assert_eq!(
            cookie_token("csrftoken2=nope; csrftoken=real", "csrftoken"),
            Some("real".to_string())
        );
    }

    #[test]
    fn missing_cookie_yields_none() {
        assert_eq!(cookie_token("", "csrftoken"), None);
        assert_eq!(cookie_token("session=abc", "csrftoken"), None);
    }

    #[test]
    fn values_are_percent_decoded() {
        assert_eq!(
            cookie_token("csrftoken=a%2Bb%3Dc", "csrftoken"),
            Some("a+b=c".to_string())
        );
    }

    #[test]
    fn malformed_escapes_pass_through() {
        assert_eq!(
            cookie_token("csrftoken=a%2", "csrftoken"),
            Some("a%2".to_string())
        );
    }
}
