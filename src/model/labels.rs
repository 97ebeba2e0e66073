use std::convert::TryFrom;
use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::{Error, ErrorKind, Result};

pub const METRIC_NAME: &str = "__name__";

pub type LabelName = String;

pub type LabelValue = String;

lazy_static! {
    static ref LABEL_NAME_RE: Regex = Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").unwrap();
}

#[derive(Clone, Debug, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub struct Label {
    pub name: LabelName,
    pub value: LabelValue,
}

impl Label {
    pub fn new<N, V>(name: N, value: V) -> Self
    where
        N: Into<LabelName>,
        V: Into<LabelValue>,
    {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A label set kept sorted by name, with unique names.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Labels(Vec<Label>);

impl Labels {
    pub fn new(mut labels: Vec<Label>) -> Self {
        // Stable sort + dedup keeps the last label pushed for a given name.
        labels.reverse();
        labels.sort_by(|a, b| a.name.cmp(&b.name));
        labels.dedup_by(|a, b| a.name == b.name);
        Self(labels)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .binary_search_by(|l| l.name.as_str().cmp(name))
            .ok()
            .map(|i| self.0[i].value.as_str())
    }

    pub fn metric_name(&self) -> Option<&str> {
        self.get(METRIC_NAME)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Label> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a Labels {
    type Item = &'a Label;
    type IntoIter = std::slice::Iter<'a, Label>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Labels {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{{")?;
        for (i, label) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={:?}", label.name, label.value)?;
        }
        write!(f, "}}")
    }
}

// Prometheus API renders label sets as plain JSON objects.
impl Serialize for Labels {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for label in &self.0 {
            map.serialize_entry(&label.name, &label.value)?;
        }
        map.end()
    }
}

#[derive(Clone, Debug)]
pub struct LabelMatcher {
    label: LabelName,
    match_op: MatchOp,
    value: LabelValue,
    re: Option<Regex>,
}

impl LabelMatcher {
    pub fn new<N, V>(label: N, match_op: MatchOp, value: V) -> Result<Self>
    where
        N: Into<LabelName>,
        V: Into<LabelValue>,
    {
        let label = label.into();
        let value = value.into();

        if !LABEL_NAME_RE.is_match(&label) {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                &format!("invalid label name {:?}", label),
            ));
        }

        let re = match match_op {
            MatchOp::EqlRe | MatchOp::NeqRe => Some(
                Regex::new(&format!("^(?:{})$", value))
                    .map_err(|e| ("invalid regex in label matcher", e))?,
            ),
            _ => None,
        };

        Ok(Self {
            label,
            match_op,
            value,
            re,
        })
    }

    pub fn name_matcher<V>(name: V) -> Self
    where
        V: Into<LabelValue>,
    {
        Self {
            label: METRIC_NAME.to_string(),
            match_op: MatchOp::Eql,
            value: name.into(),
            re: None,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn match_op(&self) -> MatchOp {
        self.match_op
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_name_matcher(&self) -> bool {
        self.label == METRIC_NAME
    }

    pub fn matches(&self, v: &str) -> bool {
        match (self.match_op, &self.re) {
            (MatchOp::Eql, _) => self.value == v,
            (MatchOp::Neq, _) => self.value != v,
            (MatchOp::EqlRe, Some(re)) => re.is_match(v),
            (MatchOp::NeqRe, Some(re)) => !re.is_match(v),
            (_, None) => unreachable!("regex matchers always carry a compiled regex"),
        }
    }
}

impl PartialEq for LabelMatcher {
    fn eq(&self, other: &Self) -> bool {
        self.label == other.label && self.match_op == other.match_op && self.value == other.value
    }
}

impl fmt::Display for LabelMatcher {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}{:?}", self.label, self.match_op, self.value)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MatchOp {
    Eql,
    Neq,
    EqlRe,
    NeqRe,
}

impl fmt::Display for MatchOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            MatchOp::Eql => "=",
            MatchOp::Neq => "!=",
            MatchOp::EqlRe => "=~",
            MatchOp::NeqRe => "!~",
        };
        f.write_str(s)
    }
}

impl TryFrom<&str> for MatchOp {
    type Error = Error;

    fn try_from(op: &str) -> Result<Self> {
        match op {
            "=" => Ok(MatchOp::Eql),
            "!=" => Ok(MatchOp::Neq),
            "=~" => Ok(MatchOp::EqlRe),
            "!~" => Ok(MatchOp::NeqRe),
            _ => Err(Error::new(
                ErrorKind::InvalidArgument,
                "unexpected match op literal",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_sorted_regardless_of_insertion_order() {
        let labels = Labels::new(vec![
            Label::new("zone", "eu"),
            Label::new("host", "web-1"),
            Label::new(METRIC_NAME, "cpu"),
            Label::new("dc", "ams"),
        ]);

        let names: Vec<&str> = labels.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["__name__", "dc", "host", "zone"]);
        assert_eq!(labels.metric_name(), Some("cpu"));
        assert_eq!(labels.get("host"), Some("web-1"));
        assert_eq!(labels.get("rack"), None);
    }

    #[test]
    fn test_labels_last_duplicate_wins() {
        let labels = Labels::new(vec![
            Label::new(METRIC_NAME, "from_tags"),
            Label::new("host", "a"),
            Label::new(METRIC_NAME, "cpu"),
        ]);
        assert_eq!(labels.len(), 2);
        assert_eq!(labels.metric_name(), Some("cpu"));
    }

    #[test]
    fn test_labels_display_and_serialize() {
        let labels = Labels::new(vec![Label::new("host", "a"), Label::new(METRIC_NAME, "cpu")]);
        assert_eq!(labels.to_string(), r#"{__name__="cpu", host="a"}"#);
        assert_eq!(
            serde_json::to_string(&labels).unwrap(),
            r#"{"__name__":"cpu","host":"a"}"#
        );
    }

    #[test]
    fn test_matcher_matches() {
        #[rustfmt::skip]
        let tests = [
            (MatchOp::Eql, "web", "web", true),
            (MatchOp::Eql, "web", "web-1", false),
            (MatchOp::Neq, "web", "db", true),
            (MatchOp::EqlRe, "web.*", "web-1", true),
            (MatchOp::EqlRe, "web", "web-1", false),
            (MatchOp::NeqRe, "db.*", "web-1", true),
            (MatchOp::NeqRe, "web.*", "web-1", false),
        ];

        for &(op, value, input, expected) in &tests {
            let m = LabelMatcher::new("host", op, value).unwrap();
            assert_eq!(m.matches(input), expected, "{} against {:?}", m, input);
        }
    }

    #[test]
    fn test_matcher_invalid() {
        let err = LabelMatcher::new("host", MatchOp::EqlRe, "web(").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err = LabelMatcher::new("1host", MatchOp::Eql, "web").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_match_op_literals() {
        for op in &[MatchOp::Eql, MatchOp::Neq, MatchOp::EqlRe, MatchOp::NeqRe] {
            assert_eq!(MatchOp::try_from(op.to_string().as_str()).unwrap(), *op);
        }
        assert!(MatchOp::try_from("~").is_err());
    }
}
