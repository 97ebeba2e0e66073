use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::{EpochSeconds, LabelMatcher, MatchOp, TimeRange};

const AGGREGATOR_NONE: &str = "none";

const FILTER_REGEXP: &str = "regexp";
const FILTER_LITERAL_OR: &str = "literal_or";
const FILTER_NOT_LITERAL_OR: &str = "not_literal_or";

/// How tag matchers are mapped onto OpenTSDB filters.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MatcherPolicy {
    /// Every tag matcher becomes a `regexp` filter with its value verbatim,
    /// whatever its match op. Negated matchers are therefore sent as
    /// positive ones and equality values are interpreted as regexes.
    Regexp,
    /// Map each match op onto the closest native filter and reject the
    /// ones OpenTSDB can't express (`!~`).
    Strict,
}

impl Default for MatcherPolicy {
    fn default() -> Self {
        MatcherPolicy::Regexp
    }
}

// {"start": 1622100000, "end": 1622103600, "queries": [...]}
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QueryRequest {
    pub start: EpochSeconds,
    pub end: EpochSeconds,
    pub queries: Vec<SubQuery>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubQuery {
    pub aggregator: String,
    pub metric: String,
    pub ms_resolution: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<Filter>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    #[serde(rename = "type")]
    pub kind: String,
    pub tagk: String,
    pub filter: String,
    pub group_by: bool,
}

impl Filter {
    fn new(kind: &str, tagk: &str, filter: String) -> Self {
        Self {
            kind: kind.to_string(),
            tagk: tagk.to_string(),
            filter,
            group_by: false,
        }
    }
}

pub fn build_request(
    range: TimeRange,
    matchers: &[LabelMatcher],
    policy: MatcherPolicy,
) -> Result<QueryRequest> {
    let mut metric = None;
    let mut filters = Vec::with_capacity(matchers.len());

    for m in matchers {
        if m.is_name_matcher() {
            if m.match_op() != MatchOp::Eql {
                return Err(Error::unsupported_matcher(&format!(
                    "OpenTSDB can only select metrics by exact name, got {}",
                    m
                )));
            }
            if metric.replace(m.value()).is_some() {
                return Err(Error::unsupported_matcher(
                    "OpenTSDB queries select exactly one metric name",
                ));
            }
            continue;
        }

        filters.push(match policy {
            MatcherPolicy::Regexp => Filter::new(FILTER_REGEXP, m.label(), m.value().to_string()),
            MatcherPolicy::Strict => strict_filter(m)?,
        });
    }

    let metric = match metric {
        Some(metric) => metric,
        None => {
            return Err(Error::unsupported_matcher(
                "OpenTSDB queries need a metric name matcher",
            ))
        }
    };

    Ok(QueryRequest {
        start: range.start(),
        end: range.end(),
        queries: vec![SubQuery {
            aggregator: AGGREGATOR_NONE.to_string(),
            metric: metric.to_string(),
            ms_resolution: true,
            filters,
        }],
    })
}

fn strict_filter(m: &LabelMatcher) -> Result<Filter> {
    // literal_or treats '|' as a value separator.
    let is_plain_literal = !m.value().contains('|');

    match m.match_op() {
        MatchOp::Eql if is_plain_literal => Ok(Filter::new(
            FILTER_LITERAL_OR,
            m.label(),
            m.value().to_string(),
        )),
        MatchOp::Eql => Ok(Filter::new(
            FILTER_REGEXP,
            m.label(),
            format!("^{}$", regex::escape(m.value())),
        )),
        MatchOp::Neq if is_plain_literal => Ok(Filter::new(
            FILTER_NOT_LITERAL_OR,
            m.label(),
            m.value().to_string(),
        )),
        MatchOp::EqlRe => Ok(Filter::new(FILTER_REGEXP, m.label(), m.value().to_string())),
        MatchOp::Neq | MatchOp::NeqRe => Err(Error::unsupported_matcher(&format!(
            "OpenTSDB has no filter for {}",
            m
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn range() -> TimeRange {
        TimeRange::new(1622100000, 1622103600).unwrap()
    }

    #[test]
    fn test_build_request_metric_and_regexp_filter() {
        let matchers = vec![
            LabelMatcher::name_matcher("foo"),
            LabelMatcher::new("host", MatchOp::EqlRe, "bar.*").unwrap(),
        ];

        let request = build_request(range(), &matchers, MatcherPolicy::Regexp).unwrap();

        assert_eq!(request.start, 1622100000);
        assert_eq!(request.end, 1622103600);
        assert_eq!(request.queries.len(), 1);
        assert_eq!(request.queries[0].metric, "foo");
        assert_eq!(request.queries[0].aggregator, "none");
        assert!(request.queries[0].ms_resolution);
        assert_eq!(
            request.queries[0].filters,
            vec![Filter::new("regexp", "host", "bar.*".to_string())]
        );
    }

    #[test]
    fn test_build_request_wire_format() {
        let matchers = vec![
            LabelMatcher::new("host", MatchOp::Eql, "web-1").unwrap(),
            LabelMatcher::name_matcher("sys.cpu.user"),
        ];

        let request = build_request(range(), &matchers, MatcherPolicy::Regexp).unwrap();

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({
                "start": 1622100000,
                "end": 1622103600,
                "queries": [{
                    "aggregator": "none",
                    "metric": "sys.cpu.user",
                    "msResolution": true,
                    "filters": [{"type": "regexp", "tagk": "host", "filter": "web-1", "groupBy": false}],
                }],
            })
        );

        let request =
            build_request(range(), &[LabelMatcher::name_matcher("up")], MatcherPolicy::Regexp)
                .unwrap();
        let json = serde_json::to_value(&request).unwrap();
        assert!(json["queries"][0].get("filters").is_none());
    }

    #[test]
    fn test_build_request_regexp_policy_erases_match_op() {
        for op in &[MatchOp::Eql, MatchOp::Neq, MatchOp::EqlRe, MatchOp::NeqRe] {
            let matchers = vec![
                LabelMatcher::name_matcher("foo"),
                LabelMatcher::new("dc", *op, "ams").unwrap(),
            ];
            let request = build_request(range(), &matchers, MatcherPolicy::Regexp).unwrap();
            assert_eq!(
                request.queries[0].filters,
                vec![Filter::new("regexp", "dc", "ams".to_string())],
                "while testing {}",
                op
            );
        }
    }

    #[test]
    fn test_build_request_unsupported_name_matchers() {
        #[rustfmt::skip]
        let tests = [
            vec![LabelMatcher::new("__name__", MatchOp::EqlRe, "foo.*").unwrap()],
            vec![LabelMatcher::new("__name__", MatchOp::Neq, "foo").unwrap()],
            vec![LabelMatcher::new("__name__", MatchOp::NeqRe, "foo").unwrap()],
            vec![LabelMatcher::new("host", MatchOp::Eql, "web-1").unwrap()],
            vec![LabelMatcher::name_matcher("foo"), LabelMatcher::name_matcher("bar")],
        ];

        for matchers in &tests {
            let err = build_request(range(), matchers, MatcherPolicy::Regexp).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::UnsupportedMatcher, "{:?}", matchers);
        }
    }

    #[test]
    fn test_build_request_strict_policy() {
        #[rustfmt::skip]
        let tests = [
            (MatchOp::Eql, "web-1", Some(("literal_or", "web-1"))),
            (MatchOp::Eql, "a|b", Some(("regexp", r"^a\|b$"))),
            (MatchOp::Neq, "web-1", Some(("not_literal_or", "web-1"))),
            (MatchOp::Neq, "a|b", None),
            (MatchOp::EqlRe, "web-.*", Some(("regexp", "web-.*"))),
            (MatchOp::NeqRe, "web-.*", None),
        ];

        for (op, value, expected) in &tests {
            let matchers = vec![
                LabelMatcher::name_matcher("foo"),
                LabelMatcher::new("host", *op, *value).unwrap(),
            ];
            let actual = build_request(range(), &matchers, MatcherPolicy::Strict);
            match expected {
                Some((kind, filter)) => assert_eq!(
                    actual.unwrap().queries[0].filters,
                    vec![Filter::new(kind, "host", filter.to_string())],
                ),
                None => assert_eq!(
                    actual.unwrap_err().kind(),
                    ErrorKind::UnsupportedMatcher,
                    "{} {}",
                    op,
                    value
                ),
            }
        }
    }
}
