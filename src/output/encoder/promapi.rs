use serde::{Serialize, Serializer};

use super::encoder::Encoder;
use crate::error::{Error, ErrorKind, Result};
use crate::model::{Labels, SampleValue, Timestamp};
use crate::output::{ApiValue, SeriesData};

// Range query - matrix
// {
//   "status": "success",
//   "data": {
//     "resultType": "matrix",
//     "result": [
//       {
//         "metric": {"__name__": "cpu", "host": "web-1"},
//         "values": [[1622104474, "0.938"], [1622104489, "0.94"]]
//       }
//     ]
//   }
// }
#[derive(Serialize)]
struct Success<T> {
    status: &'static str,
    data: T,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Matrix<'a> {
    result_type: &'static str,
    result: Vec<MatrixItem<'a>>,
}

#[derive(Serialize)]
struct MatrixItem<'a> {
    metric: &'a Labels,
    values: Vec<(UnixTime, String)>,
}

impl<'a> MatrixItem<'a> {
    fn new(series: &'a SeriesData) -> Self {
        Self {
            metric: &series.labels,
            values: series
                .samples
                .iter()
                .map(|&(t, v)| (UnixTime(t), format_value(v)))
                .collect(),
        }
    }
}

// {"status": "error", "errorType": "bad_data", "error": "..."}
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Failure<'a> {
    status: &'static str,
    error_type: &'static str,
    error: &'a str,
}

pub struct PromApiEncoder {}

impl PromApiEncoder {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for PromApiEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder for PromApiEncoder {
    fn encode(&self, value: &ApiValue) -> Result<Vec<u8>> {
        let buf = match value {
            ApiValue::Matrix(matrix) => serde_json::to_vec(&Success {
                status: "success",
                data: Matrix {
                    result_type: "matrix",
                    result: matrix.iter().map(MatrixItem::new).collect(),
                },
            })?,
            ApiValue::Series(series) => serde_json::to_vec(&Success {
                status: "success",
                data: series,
            })?,
            ApiValue::LabelValues(values) => serde_json::to_vec(&Success {
                status: "success",
                data: values,
            })?,
        };
        Ok(buf)
    }

    fn encode_error(&self, err: &Error) -> Result<Vec<u8>> {
        let message = err.to_string();
        Ok(serde_json::to_vec(&Failure {
            status: "error",
            error_type: error_type(err.kind()),
            error: &message,
        })?)
    }
}

/// Prometheus API error type for an error kind.
pub fn error_type(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::InvalidArgument | ErrorKind::UnsupportedMatcher => "bad_data",
        ErrorKind::UnsupportedOperation => "unavailable",
        ErrorKind::Transport | ErrorKind::Decode => "execution",
        ErrorKind::Canceled => "canceled",
        ErrorKind::Timeout => "timeout",
        ErrorKind::Io => "internal",
    }
}

// Same spelling as Go's strconv.FormatFloat(v, 'f', -1, 64), which is what
// Prometheus puts on the wire.
fn format_value(v: SampleValue) -> String {
    if v.is_nan() {
        String::from("NaN")
    } else if v.is_infinite() {
        String::from(if v > 0.0 { "+Inf" } else { "-Inf" })
    } else {
        v.to_string()
    }
}

// Seconds as Prometheus writes them: 1622104474, 1622104489.5.
struct UnixTime(Timestamp);

impl Serialize for UnixTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if self.0 % 1000 == 0 {
            serializer.serialize_i64(self.0 / 1000)
        } else {
            serializer.serialize_f64(self.0 as f64 / 1000.0)
        }
    }
}
