//! Query encoder: typed filter values to a canonical query string.
//!
//! # Design
//! `Filters` is an ordered mapping of filter key to an optional
//! `FilterValue`. Absent values (and empty strings or lists) never reach the
//! wire. `Filters::to_params` expands the mapping into a `QueryParams`
//! sequence, where list filters become repeated keys in caller order, and
//! `QueryParams::encode` percent-encodes each component on its own.
//!
//! Keys may contain dot-separated segments (`meta.modified.after`); the dots
//! are unreserved and pass through encoding untouched.

use std::borrow::Cow;

use chrono::{DateTime, FixedOffset, NaiveDate, SecondsFormat, Utc};

/// A typed value usable as a query filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Str(String),
    Bool(bool),
    Int(i64),
    /// Day precision, encoded as `YYYY-MM-DD`.
    Date(NaiveDate),
    /// Encoded as RFC 3339 with an explicit offset.
    Timestamp(DateTime<FixedOffset>),
    /// One `key=value` pair per element.
    List(Vec<String>),
}

impl FilterValue {
    /// Wire strings for this value. Empty for values that count as absent.
    pub fn wire_values(&self) -> Vec<String> {
        match self {
            FilterValue::Str(s) if s.is_empty() => Vec::new(),
            FilterValue::Str(s) => vec![s.clone()],
            FilterValue::Bool(b) => vec![if *b { "true" } else { "false" }.to_string()],
            FilterValue::Int(n) => vec![n.to_string()],
            FilterValue::Date(d) => vec![d.format("%Y-%m-%d").to_string()],
            FilterValue::Timestamp(ts) => vec![format_timestamp(ts)],
            FilterValue::List(items) => items.clone(),
        }
    }
}

/// Timestamp wire format: RFC 3339, fractional seconds only when present.
pub fn format_timestamp(ts: &DateTime<FixedOffset>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, false)
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Str(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Str(value)
    }
}

impl From<&String> for FilterValue {
    fn from(value: &String) -> Self {
        FilterValue::Str(value.clone())
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Bool(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Int(value)
    }
}

impl From<i32> for FilterValue {
    fn from(value: i32) -> Self {
        FilterValue::Int(value.into())
    }
}

impl From<u32> for FilterValue {
    fn from(value: u32) -> Self {
        FilterValue::Int(value.into())
    }
}

impl From<NaiveDate> for FilterValue {
    fn from(value: NaiveDate) -> Self {
        FilterValue::Date(value)
    }
}

impl From<DateTime<FixedOffset>> for FilterValue {
    fn from(value: DateTime<FixedOffset>) -> Self {
        FilterValue::Timestamp(value)
    }
}

impl From<DateTime<Utc>> for FilterValue {
    fn from(value: DateTime<Utc>) -> Self {
        FilterValue::Timestamp(value.fixed_offset())
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(value: Vec<String>) -> Self {
        FilterValue::List(value)
    }
}

impl From<&[String]> for FilterValue {
    fn from(value: &[String]) -> Self {
        FilterValue::List(value.to_vec())
    }
}

impl From<Vec<&str>> for FilterValue {
    fn from(value: Vec<&str>) -> Self {
        FilterValue::List(value.into_iter().map(str::to_string).collect())
    }
}

/// Ordered mapping of filter key to optional value.
///
/// Each key maps to exactly one value; setting a key again replaces the value
/// in its original position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters {
    entries: Vec<(String, Option<FilterValue>)>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.insert(key, Some(value.into()));
        self
    }

    pub fn with_opt<V: Into<FilterValue>>(mut self, key: impl Into<String>, value: Option<V>) -> Self {
        self.insert(key, value.map(Into::into));
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Option<FilterValue>) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn set<V: Into<FilterValue>>(&mut self, key: impl Into<String>, value: Option<V>) {
        self.insert(key, value.map(Into::into));
    }

    /// Set a list filter, treating an empty list as absent.
    pub fn set_list(&mut self, key: impl Into<String>, values: &[String]) {
        let value = (!values.is_empty()).then(|| FilterValue::List(values.to_vec()));
        self.insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<&FilterValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.as_ref())
    }

    /// Append every entry of `other`, replacing keys that already exist.
    pub fn extend(&mut self, other: Filters) {
        for (key, value) in other.entries {
            self.insert(key, value);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_params(&self) -> QueryParams {
        let mut params = QueryParams::new();
        for (key, value) in &self.entries {
            let Some(value) = value else { continue };
            for wire in value.wire_values() {
                params.push(key.clone(), wire);
            }
        }
        params
    }
}

/// Ordered `(key, value)` pairs, repeated keys allowed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// Every value recorded for `key`, in order.
    pub fn values<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pairs
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// `k1=v1&k2=v2`, each component percent-encoded independently.
    pub fn encode(&self) -> String {
        self.pairs
            .iter()
            .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Inverse of `encode`. Accepts an optional leading `?`.
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let pairs = query
            .split('&')
            .filter(|part| !part.is_empty())
            .map(|part| {
                let (k, v) = part.split_once('=').unwrap_or((part, ""));
                (decode_component(k), decode_component(v))
            })
            .collect();
        Self { pairs }
    }
}

impl From<&Filters> for QueryParams {
    fn from(filters: &Filters) -> Self {
        filters.to_params()
    }
}

/// Percent-encode one query component.
///
/// Idempotent: an already-encoded component is decoded first, so running it
/// twice yields the same string.
pub fn encode_component(raw: &str) -> String {
    let decoded = urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw));
    urlencoding::encode(&decoded).into_owned()
}

fn decode_component(encoded: &str) -> String {
    urlencoding::decode(encoded)
        .map(Cow::into_owned)
        .unwrap_or_else(|_| encoded.to_string())
}

/// Append the encoded query to `uri`, keeping whatever path and query it has.
pub fn append_query(uri: &str, params: &QueryParams) -> String {
    if params.is_empty() {
        return uri.to_string();
    }
    let separator = match uri.find('?') {
        None => "?",
        Some(_) if uri.ends_with('?') || uri.ends_with('&') => "",
        Some(_) => "&",
    };
    format!("{uri}{separator}{}", params.encode())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn list_filter_repeats_key_in_order() {
        let params = Filters::new()
            .with("parent", vec!["a", "b", "c"])
            .to_params();
        assert_eq!(params.encode(), "parent=a&parent=b&parent=c");
        assert_eq!(params.values("parent").collect::<Vec<_>>(), ["a", "b", "c"]);
    }

    #[test]
    fn booleans_are_lowercase() {
        let params = Filters::new()
            .with("expandReferenceNames", true)
            .with("includeDeleted", false)
            .to_params();
        assert_eq!(params.encode(), "expandReferenceNames=true&includeDeleted=false");
    }

    #[test]
    fn dates_use_day_precision() {
        let params = Filters::new()
            .with("startDate.onOrAfter", date(2024, 3, 5))
            .to_params();
        assert_eq!(params.encode(), "startDate.onOrAfter=2024-03-05");
    }

    #[test]
    fn timestamps_keep_offset_and_fraction() {
        let offset = FixedOffset::east_opt(3600).unwrap();
        let ts = offset
            .with_ymd_and_hms(2024, 3, 5, 10, 15, 30)
            .unwrap()
            + chrono::Duration::milliseconds(250);
        assert_eq!(
            FilterValue::from(ts).wire_values(),
            ["2024-03-05T10:15:30.250+01:00"]
        );

        let utc = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            FilterValue::from(utc).wire_values(),
            ["2024-01-01T00:00:00+00:00"]
        );
    }

    #[test]
    fn timestamp_is_percent_encoded_on_the_wire() {
        let ts = DateTime::parse_from_rfc3339("2024-03-05T10:15:30+01:00").unwrap();
        let params = Filters::new().with("meta.modified.after", ts).to_params();
        assert_eq!(
            params.encode(),
            "meta.modified.after=2024-03-05T10%3A15%3A30%2B01%3A00"
        );
    }

    #[test]
    fn absent_and_empty_filters_are_omitted() {
        let params = Filters::new()
            .with_opt::<String>("civicNo", None)
            .with("nameContains", Vec::<String>::new())
            .with("eduPersonPrincipalName", "")
            .with("limit", 10)
            .to_params();
        assert_eq!(params.encode(), "limit=10");
    }

    #[test]
    fn setting_a_key_twice_keeps_its_position() {
        let mut filters = Filters::new().with("a", 1).with("b", 2);
        filters.set("a", Some(3));
        assert_eq!(filters.to_params().encode(), "a=3&b=2");
        filters.set::<i64>("a", None);
        assert_eq!(filters.to_params().encode(), "b=2");
        assert_eq!(filters.len(), 2);
    }

    #[test]
    fn encode_component_is_idempotent() {
        let once = encode_component("Anna Svensson/åäö");
        assert_eq!(once, "Anna%20Svensson%2F%C3%A5%C3%A4%C3%B6");
        assert_eq!(encode_component(&once), once);
    }

    #[test]
    fn page_tokens_with_percent_signs() {
        // A bare `%` is not an escape and is encoded.
        assert_eq!(encode_component("50%off"), "50%25off");
        // An escape-like sequence is taken as already encoded.
        assert_eq!(encode_component("abc%2Fdef"), "abc%2Fdef");
        assert_eq!(encode_component("%41"), "A");

        let mut filters = Filters::new();
        crate::pagination::PageRequest {
            page_token: Some("c%2F1".to_string()),
            ..Default::default()
        }
        .apply(&mut filters);
        assert_eq!(filters.to_params().encode(), "pageToken=c%2F1");
    }

    #[test]
    fn encode_then_parse_recovers_pairs() {
        let ts = DateTime::parse_from_rfc3339("2023-11-30T23:59:59.5-05:00").unwrap();
        let filters = Filters::new()
            .with("organisationCode", vec!["A&B", "C=D", "e f"])
            .with("expandReferenceNames", true)
            .with("limit", 25)
            .with("endDate.onOrBefore", date(2025, 6, 30))
            .with("meta.created.before", ts)
            .with("pageToken", "abc+/=");
        let params = filters.to_params();
        let parsed = QueryParams::parse(&params.encode());
        assert_eq!(parsed, params);
        assert_eq!(parsed.len(), 8);
    }

    #[test]
    fn append_query_preserves_path_and_existing_query() {
        let mut params = QueryParams::new();
        params.push("limit", "5");
        assert_eq!(
            append_query("https://api.test/v2/persons", &params),
            "https://api.test/v2/persons?limit=5"
        );
        assert_eq!(
            append_query("https://api.test/v2/persons?x=1", &params),
            "https://api.test/v2/persons?x=1&limit=5"
        );
        assert_eq!(
            append_query("https://api.test/v2/persons?", &params),
            "https://api.test/v2/persons?limit=5"
        );
        assert_eq!(
            append_query("https://api.test/v2/persons", &QueryParams::new()),
            "https://api.test/v2/persons"
        );
    }

    #[test]
    fn parse_accepts_leading_question_mark_and_bare_keys() {
        let parsed = QueryParams::parse("?flag&k=v");
        assert_eq!(
            parsed.pairs(),
            [
                ("flag".to_string(), String::new()),
                ("k".to_string(), "v".to_string())
            ]
        );
    }
}
