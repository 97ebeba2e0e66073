//! OpenTSDB `/api/query` wire types, request building and the HTTP client.

mod client;
mod request;
mod response;

pub use client::OpenTsdbClient;
pub use request::{build_request, Filter, MatcherPolicy, QueryRequest, SubQuery};
pub use response::{parse_response, Datapoints, ResponseEntry, Tags, METRIC_NOT_FOUND};
