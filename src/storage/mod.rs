//! The storage contract a PromQL engine evaluates selectors against, and
//! its OpenTSDB implementation.
//!
//! Iteration follows a cursor protocol: sets and iterators start before
//! the first element, `next` advances and `at` reads the current element.

mod querier;
mod series;

pub use querier::{OpenTsdbQuerier, OpenTsdbQueryable};
pub use series::{OpenTsdbSeriesSet, SampleIterator};

use async_trait::async_trait;

use crate::context::QueryContext;
use crate::error::{Error, Result};
use crate::model::{LabelMatcher, LabelValue, Labels, SampleValue, Timestamp, TimeRange};

pub trait SeriesIterator: Send {
    /// Moves to the first sample at or after `t`, or to the last sample if
    /// every sample is older. Returns false only for an empty series.
    fn seek(&mut self, t: Timestamp) -> bool;

    /// The sample under the cursor, `None` until `next` or `seek` succeeds.
    fn at(&self) -> Option<(Timestamp, SampleValue)>;

    fn next(&mut self) -> bool;

    fn err(&self) -> Option<&Error>;
}

pub trait Series: Send + Sync {
    fn labels(&self) -> Labels;

    fn iterator(&self) -> Box<dyn SeriesIterator>;
}

pub trait SeriesSet: Send {
    fn next(&mut self) -> bool;

    fn at(&self) -> Option<&dyn Series>;

    /// The error that cut the select short, if any. Whatever series were
    /// collected stay iterable.
    fn err(&self) -> Option<&Error>;
}

#[async_trait]
pub trait Querier: Send + Sync {
    /// Never fails directly: errors are carried by the returned set.
    async fn select(&self, ctx: &QueryContext, matchers: &[LabelMatcher]) -> Box<dyn SeriesSet>;

    async fn label_values(&self, name: &str) -> Result<Vec<LabelValue>>;

    fn close(&self) -> Result<()>;
}

pub trait Appender: Send {
    fn add(&mut self, labels: &Labels, t: Timestamp, v: SampleValue) -> Result<()>;

    fn commit(&mut self) -> Result<()>;
}

pub trait Queryable: Send + Sync {
    fn querier(&self, range: TimeRange) -> Result<Box<dyn Querier>>;

    fn appender(&self) -> Result<Box<dyn Appender>>;
}
