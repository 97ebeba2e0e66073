use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::{Error, ErrorKind, Result};
use crate::model::{EpochSeconds, Label, Labels, Sample, METRIC_NAME};

/// Marker OpenTSDB puts into the error body when the queried metric has
/// never been written.
pub const METRIC_NOT_FOUND: &str = "No such name for 'metrics'";

// [
//   {
//     "metric": "sys.cpu.user",
//     "tags": {"host": "web-1", "dc": "ams"},
//     "aggregateTags": [],
//     "dps": {"1622100000": 42.5, "1622100015": 43}
//   }
// ]
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ResponseEntry {
    pub metric: String,
    #[serde(default)]
    pub tags: Tags,
    #[serde(rename = "dps", default)]
    pub datapoints: Datapoints,
}

impl ResponseEntry {
    /// Tags plus the metric name, sorted by label name.
    pub fn labels(&self) -> Labels {
        let mut labels = self.tags.labels();
        labels.push(Label::new(METRIC_NAME, self.metric.as_str()));
        Labels::new(labels)
    }

    pub fn samples(&self) -> Vec<Sample> {
        self.datapoints.samples()
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Tags(BTreeMap<String, String>);

impl Tags {
    fn labels(&self) -> Vec<Label> {
        self.0
            .iter()
            .map(|(name, value)| Label::new(name.as_str(), value.as_str()))
            .collect()
    }
}

impl<N: Into<String>, V: Into<String>> std::iter::FromIterator<(N, V)> for Tags {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(n, v)| (n.into(), v.into())).collect())
    }
}

/// Datapoints keyed by epoch seconds. JSON object keys are strings; serde
/// parses them as integers and rejects anything else.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Datapoints(BTreeMap<EpochSeconds, f64>);

impl Datapoints {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn samples(&self) -> Vec<Sample> {
        // parse_response rejects keys that overflow in millis.
        let mut samples: Vec<Sample> = self
            .0
            .iter()
            .map(|(&secs, &value)| Sample::new(secs.saturating_mul(1000), value))
            .collect();

        // Already ordered by the map, but consumers rely on it.
        samples.sort_by_key(|s| s.timestamp());
        samples
    }
}

// Keys are sorted, so only the two ends can overflow once in millis.
fn out_of_range(datapoints: &Datapoints) -> Option<EpochSeconds> {
    let first = datapoints.0.keys().next();
    let last = datapoints.0.keys().next_back();
    first
        .into_iter()
        .chain(last)
        .find(|secs| secs.checked_mul(1000).is_none())
        .copied()
}

impl std::iter::FromIterator<(EpochSeconds, f64)> for Datapoints {
    fn from_iter<I: IntoIterator<Item = (EpochSeconds, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// {"error": {"code": 400, "message": "No such name for 'metrics': 'foo'", ...}}
#[derive(Deserialize)]
struct ErrorDocument {
    error: ErrorDetails,
}

#[derive(Deserialize)]
struct ErrorDetails {
    message: String,
}

pub fn parse_response(status: u16, body: &[u8]) -> Result<Vec<ResponseEntry>> {
    if !(200..300).contains(&status) {
        let body = String::from_utf8_lossy(body);

        // An unknown metric and a metric without matching series have to
        // look the same to the query engine.
        if body.contains(METRIC_NOT_FOUND) {
            tracing::debug!("metric not found in OpenTSDB, returning empty result");
            return Ok(vec![]);
        }

        let message = match serde_json::from_str::<ErrorDocument>(&body) {
            Ok(doc) => format!("OpenTSDB request failed with status {}: {}", status, doc.error.message),
            Err(_) => format!("OpenTSDB request failed with status {}", status),
        };
        tracing::warn!(status, "{}", message);
        return Err(Error::transport(&message));
    }

    let mut entries: Vec<ResponseEntry> = serde_json::from_slice(body)
        .map_err(|e| Error::with_source(ErrorKind::Decode, "malformed OpenTSDB response", e))?;

    entries.retain(|e| !e.datapoints.is_empty());

    for entry in &entries {
        if let Some(secs) = out_of_range(&entry.datapoints) {
            tracing::warn!(metric = %entry.metric, secs, "datapoint timestamp out of range");
            return Err(Error::new(
                ErrorKind::Decode,
                "datapoint timestamp out of range",
            ));
        }
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_sorted_with_metric_name() {
        let entry = ResponseEntry {
            metric: "sys.cpu.user".to_string(),
            tags: vec![("zone", "eu"), ("host", "web-1"), ("app", "api")]
                .into_iter()
                .collect(),
            datapoints: Datapoints::default(),
        };

        let labels: Vec<(String, String)> = entry
            .labels()
            .iter()
            .map(|l| (l.name.clone(), l.value.clone()))
            .collect();

        assert_eq!(
            labels,
            vec![
                ("__name__".to_string(), "sys.cpu.user".to_string()),
                ("app".to_string(), "api".to_string()),
                ("host".to_string(), "web-1".to_string()),
                ("zone".to_string(), "eu".to_string()),
            ]
        );
    }

    #[test]
    fn test_samples_ascending_in_millis() {
        let body = br#"[{"metric": "m", "tags": {}, "dps": {"30": 3.0, "10": 1.0, "9": 0.5, "20": 2.0}}]"#;
        let entries = parse_response(200, body).unwrap();

        let samples: Vec<(i64, f64)> = entries[0]
            .samples()
            .iter()
            .map(|s| (s.timestamp(), s.value()))
            .collect();

        assert_eq!(
            samples,
            vec![(9_000, 0.5), (10_000, 1.0), (20_000, 2.0), (30_000, 3.0)]
        );
    }

    #[test]
    fn test_parse_response_empty_array() {
        assert_eq!(parse_response(200, b"[]").unwrap(), vec![]);
    }

    #[test]
    fn test_parse_response_drops_empty_series() {
        let body = br#"[
            {"metric": "m", "tags": {"host": "a"}, "aggregateTags": [], "dps": {}},
            {"metric": "m", "tags": {"host": "b"}, "aggregateTags": [], "dps": {"1622100000": 1}}
        ]"#;

        let entries = parse_response(200, body).unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].labels().get("host"), Some("b"));
        assert_eq!(entries[0].datapoints.len(), 1);
    }

    #[test]
    fn test_parse_response_metric_not_found() {
        let body = br#"{"error":{"code":400,"message":"No such name for 'metrics': 'foo'","details":"..."}}"#;
        assert_eq!(parse_response(400, body).unwrap(), vec![]);
    }

    #[test]
    fn test_parse_response_failures() {
        #[rustfmt::skip]
        let tests: [(u16, &[u8], ErrorKind, &str); 7] = [
            (500, b"boom", ErrorKind::Transport, "OpenTSDB request failed with status 500"),
            (400, br#"{"error":{"code":400,"message":"Unknown filter type"}}"#, ErrorKind::Transport, "OpenTSDB request failed with status 400: Unknown filter type"),
            (200, b"{not json", ErrorKind::Decode, "malformed OpenTSDB response"),
            (200, br#"{"metric": "m"}"#, ErrorKind::Decode, "malformed OpenTSDB response"),
            (200, br#"[{"metric": "m", "dps": {"yesterday": 1.0}}]"#, ErrorKind::Decode, "malformed OpenTSDB response"),
            (200, br#"[{"metric": "m", "tags": {}, "dps": {"9223372036854776": 1.0}}]"#, ErrorKind::Decode, "datapoint timestamp out of range"),
            (200, br#"[{"metric": "m", "tags": {}, "dps": {"-9223372036854776": 1.0, "1": 2.0}}]"#, ErrorKind::Decode, "datapoint timestamp out of range"),
        ];

        for (status, body, kind, message) in &tests {
            let err = parse_response(*status, body).unwrap_err();
            assert_eq!(err.kind(), *kind, "while testing {}", String::from_utf8_lossy(body));
            assert_eq!(err.message(), *message);
        }
    }
}
