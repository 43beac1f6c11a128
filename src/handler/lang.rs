//! Language negotiation module
//!
//! Picks the response language from the `noobhttp-lang` cookie, then the
//! Accept-Language header, falling back to English. The negotiated value is
//! the function's return value; callers assign it to the request context.

/// Cookie carrying an explicit language choice.
pub const LANG_COOKIE: &str = "noobhttp-lang";

const DEFAULT_LANGUAGE: &str = "en";

/// Negotiate the request language.
///
/// A cookie value wins when it names an available language; otherwise the
/// first Accept-Language entry whose two-letter prefix is available wins.
pub fn negotiate(
    cookie_lang: Option<&str>,
    accept_language: Option<&str>,
    available: &[String],
) -> String {
    if let Some(lang) = cookie_lang {
        if available.iter().any(|a| a == lang) {
            return lang.to_string();
        }
    }

    if let Some(header) = accept_language {
        for entry in header.split([',', ';']) {
            let prefix = entry.trim().get(..2).unwrap_or_default();
            if available.iter().any(|a| a == prefix) {
                return prefix.to_string();
            }
        }
    }

    DEFAULT_LANGUAGE.to_string()
}

/// Extract one value from a raw `Cookie` header line.
///
/// Thin scan; full cookie parsing stays outside this core.
pub fn cookie_value<'a>(cookie_header: &'a str, name: &str) -> Option<&'a str> {
    cookie_header.split(';').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key.trim() == name).then(|| value.trim())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn available() -> Vec<String> {
        vec!["en".to_string(), "fr".to_string()]
    }

    #[test]
    fn test_cookie_wins() {
        assert_eq!(negotiate(Some("fr"), Some("en"), &available()), "fr");
    }

    #[test]
    fn test_unavailable_cookie_falls_through() {
        assert_eq!(negotiate(Some("de"), Some("fr-CA,en"), &available()), "fr");
    }

    #[test]
    fn test_accept_language_prefix() {
        assert_eq!(negotiate(None, Some("de-DE,fr;q=0.8"), &available()), "fr");
    }

    #[test]
    fn test_default_when_nothing_matches() {
        assert_eq!(negotiate(None, Some("de,ja"), &available()), "en");
        assert_eq!(negotiate(None, None, &available()), "en");
    }

    #[test]
    fn test_cookie_value_scan() {
        let header = "session=abc; noobhttp-lang=fr; other=1";
        assert_eq!(cookie_value(header, LANG_COOKIE), Some("fr"));
        assert_eq!(cookie_value(header, "missing"), None);
    }
}
