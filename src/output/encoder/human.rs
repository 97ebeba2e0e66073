use chrono::prelude::*;

use super::encoder::Encoder;
use crate::error::{Error, Result};
use crate::model::Timestamp;
use crate::output::ApiValue;

pub struct HumanReadableEncoder {}

impl HumanReadableEncoder {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for HumanReadableEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder for HumanReadableEncoder {
    fn encode(&self, value: &ApiValue) -> Result<Vec<u8>> {
        let mut lines = vec![];
        match value {
            ApiValue::Matrix(matrix) => {
                for series in matrix {
                    lines.push(series.labels.to_string());
                    for &(t, v) in &series.samples {
                        lines.push(format!("\t{}\t{}", format_time(t), v));
                    }
                }
            }
            ApiValue::Series(series) => {
                for labels in series {
                    lines.push(labels.to_string());
                }
            }
            ApiValue::LabelValues(values) => lines.extend(values.iter().cloned()),
        }

        Ok(String::into_bytes(lines.join("\n")))
    }

    fn encode_error(&self, err: &Error) -> Result<Vec<u8>> {
        Ok(String::into_bytes(format!("error ({}): {}", err.kind(), err)))
    }
}

fn format_time(t: Timestamp) -> String {
    match Utc.timestamp_millis_opt(t).single() {
        Some(ts) => ts.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
        None => t.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Label, Labels, METRIC_NAME};
    use crate::output::SeriesData;

    #[test]
    fn test_encode_matrix() {
        let value = ApiValue::Matrix(vec![SeriesData {
            labels: Labels::new(vec![Label::new(METRIC_NAME, "cpu"), Label::new("host", "a")]),
            samples: vec![(1622104500000, 0.5), (1622104515000, 1.0)],
        }]);

        let buf = HumanReadableEncoder::new().encode(&value).unwrap();

        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "{__name__=\"cpu\", host=\"a\"}\n\t2021-05-27 08:35:00.000\t0.5\n\t2021-05-27 08:35:15.000\t1"
        );
    }
}
