//! Template tag grammar module
//!
//! Tags look like `{noobhttp-<name><query>}`: an alphanumeric,
//! case-insensitive name followed by URL-query-encoded options. Scanning is a
//! pure function over the whole document; no cursor state survives a call.

use regex::Regex;
use std::sync::OnceLock;
use url::form_urlencoded;

/// Tag names whose source spans carry content and survive cleaning.
const CONTENT_MARKERS: &[&str] = &["include"];

fn tag_regex() -> &'static Regex {
    static TAG_RE: OnceLock<Regex> = OnceLock::new();
    TAG_RE.get_or_init(|| {
        Regex::new(r"(?i)\{noobhttp-([a-z0-9]+)(.*?)\}").expect("tag pattern is valid")
    })
}

/// A coerced option value.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Integer(i64),
    Bool(bool),
    Null,
    /// Key present with an empty value.
    Absent,
    Text(String),
}

/// Coerce a decoded option value: integer literal, `true`/`false`, `null`
/// (all case-insensitive), empty, or the string as-is.
pub fn coerce(value: &str) -> OptionValue {
    if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(n) = value.parse::<i64>() {
            return OptionValue::Integer(n);
        }
    }
    if value.eq_ignore_ascii_case("true") {
        return OptionValue::Bool(true);
    }
    if value.eq_ignore_ascii_case("false") {
        return OptionValue::Bool(false);
    }
    if value.eq_ignore_ascii_case("null") {
        return OptionValue::Null;
    }
    if value.is_empty() {
        return OptionValue::Absent;
    }
    OptionValue::Text(value.to_string())
}

/// One parsed tag occurrence.
#[derive(Debug, Clone)]
pub struct TagMatch {
    /// Lowercased tag name.
    pub name: String,
    /// Exact source text the tag occupies, for later removal/substitution.
    pub raw: String,
    /// Byte offset of the occurrence in the scanned document.
    pub start: usize,
    /// Option key/value pairs in document order.
    pub options: Vec<(String, OptionValue)>,
}

impl TagMatch {
    pub fn option(&self, key: &str) -> Option<&OptionValue> {
        self.options.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// String value of an option, when it coerced to text.
    pub fn text_option(&self, key: &str) -> Option<&str> {
        match self.option(key) {
            Some(OptionValue::Text(s)) => Some(s),
            _ => None,
        }
    }
}

/// Storage shape for a tag name: the first occurrence is a single value, a
/// repeated name promotes to an ordered list.
#[derive(Debug, Clone)]
pub enum TagOccurrence {
    Single(TagMatch),
    Repeated(Vec<TagMatch>),
}

/// All tags of a document keyed by name, first-seen order preserved.
#[derive(Debug, Clone, Default)]
pub struct ParsedOptions {
    entries: Vec<(String, TagOccurrence)>,
}

impl ParsedOptions {
    fn insert(&mut self, m: TagMatch) {
        match self.entries.iter_mut().find(|(name, _)| *name == m.name) {
            None => self.entries.push((m.name.clone(), TagOccurrence::Single(m))),
            Some((_, occ)) => match occ {
                TagOccurrence::Single(first) => {
                    *occ = TagOccurrence::Repeated(vec![first.clone(), m]);
                }
                TagOccurrence::Repeated(list) => list.push(m),
            },
        }
    }

    pub fn get(&self, name: &str) -> Option<&TagOccurrence> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, occ)| occ)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// All occurrences of a tag name, in document order.
    pub fn matches(&self, name: &str) -> &[TagMatch] {
        match self.get(name) {
            Some(TagOccurrence::Single(m)) => std::slice::from_ref(m),
            Some(TagOccurrence::Repeated(list)) => list,
            None => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TagOccurrence)> {
        self.entries.iter().map(|(n, occ)| (n.as_str(), occ))
    }
}

/// Whether the document contains any tag at all.
pub fn has_tags(content: &str) -> bool {
    tag_regex().is_match(content)
}

/// Scan the whole document for tag occurrences.
pub fn parse_options(content: &str) -> ParsedOptions {
    let mut options = ParsedOptions::default();

    for caps in tag_regex().captures_iter(content) {
        let whole = caps.get(0).expect("capture 0 always present");
        options.insert(TagMatch {
            name: caps[1].to_ascii_lowercase(),
            raw: whole.as_str().to_string(),
            start: whole.start(),
            options: parse_query(&caps[2]),
        });
    }

    options
}

/// Parse a tag's option query: trimmed, whitespace- or `&`-separated,
/// URL-decoded key/value pairs coerced in document order.
fn parse_query(query: &str) -> Vec<(String, OptionValue)> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let joined = trimmed.split_whitespace().collect::<Vec<_>>().join("&");
    form_urlencoded::parse(joined.as_bytes())
        .map(|(k, v)| (k.into_owned(), coerce(&v)))
        .collect()
}

/// Remove the literal source span of every recorded tag except content
/// markers; `include` tags stay in place for the substitution pass.
pub fn clean_content(content: &str, options: &ParsedOptions) -> String {
    let mut cleaned = content.to_string();

    for (name, _) in options.iter() {
        if CONTENT_MARKERS.contains(&name) {
            continue;
        }
        for m in options.matches(name) {
            cleaned = cleaned.replacen(&m.raw, "", 1);
        }
    }

    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coercion() {
        assert_eq!(coerce("42"), OptionValue::Integer(42));
        assert_eq!(coerce("true"), OptionValue::Bool(true));
        assert_eq!(coerce("FALSE"), OptionValue::Bool(false));
        assert_eq!(coerce("Null"), OptionValue::Null);
        assert_eq!(coerce(""), OptionValue::Absent);
        assert_eq!(coerce("header.html"), OptionValue::Text("header.html".into()));
        // Mixed digits and letters stay text
        assert_eq!(coerce("12ab"), OptionValue::Text("12ab".into()));
    }

    #[test]
    fn test_single_tag_with_file_option() {
        let options = parse_options("before {noobhttp-include file=header.html} after");
        let m = &options.matches("include")[0];
        assert_eq!(m.raw, "{noobhttp-include file=header.html}");
        assert_eq!(m.text_option("file"), Some("header.html"));
    }

    #[test]
    fn test_case_insensitive_name() {
        let options = parse_options("{NoobHTTP-Layout}");
        assert!(options.contains("layout"));
    }

    #[test]
    fn test_repeated_tag_promotes_to_ordered_list() {
        let options = parse_options("{noobhttp-meta a=1}{noobhttp-meta b=2}");
        match options.get("meta") {
            Some(TagOccurrence::Repeated(list)) => {
                assert_eq!(list.len(), 2);
                assert_eq!(list[0].option("a"), Some(&OptionValue::Integer(1)));
                assert_eq!(list[1].option("b"), Some(&OptionValue::Integer(2)));
                assert!(list[0].start < list[1].start);
            }
            other => panic!("expected Repeated, got {other:?}"),
        }
    }

    #[test]
    fn test_first_occurrence_stays_single() {
        let options = parse_options("{noobhttp-meta a=1}");
        assert!(matches!(options.get("meta"), Some(TagOccurrence::Single(_))));
    }

    #[test]
    fn test_scan_is_pure_across_calls() {
        // A stateful scanner would resume mid-document on the second call
        let doc = "{noobhttp-meta a=1} trailing";
        let first = parse_options(doc);
        let second = parse_options(doc);
        assert_eq!(first.matches("meta").len(), second.matches("meta").len());
        assert_eq!(first.matches("meta")[0].start, second.matches("meta")[0].start);
    }

    #[test]
    fn test_clean_strips_non_include_tags_only() {
        let doc = "{noobhttp-meta a=1}text{noobhttp-include file=x.html}more{noobhttp-layout}";
        let options = parse_options(doc);
        let cleaned = clean_content(doc, &options);
        assert_eq!(cleaned, "text{noobhttp-include file=x.html}more");
    }

    #[test]
    fn test_query_encoded_values_decode() {
        let options = parse_options("{noobhttp-meta title=hello%20world}");
        let m = &options.matches("meta")[0];
        assert_eq!(m.text_option("title"), Some("hello world"));
    }

    #[test]
    fn test_space_separated_options() {
        let options = parse_options("{noobhttp-meta a=1 b=true c=}");
        let m = &options.matches("meta")[0];
        assert_eq!(m.option("a"), Some(&OptionValue::Integer(1)));
        assert_eq!(m.option("b"), Some(&OptionValue::Bool(true)));
        assert_eq!(m.option("c"), Some(&OptionValue::Absent));
    }
}
