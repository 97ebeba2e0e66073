use super::{Series, SeriesIterator, SeriesSet};
use crate::error::Error;
use crate::model::{Labels, Sample, SampleValue, Timestamp};
use crate::opentsdb::ResponseEntry;

impl Series for ResponseEntry {
    fn labels(&self) -> Labels {
        ResponseEntry::labels(self)
    }

    fn iterator(&self) -> Box<dyn SeriesIterator> {
        Box::new(SampleIterator::new(self.samples()))
    }
}

pub struct SampleIterator {
    samples: Vec<Sample>,
    cursor: Option<usize>,
}

impl SampleIterator {
    /// `samples` must be sorted by timestamp.
    pub fn new(samples: Vec<Sample>) -> Self {
        Self {
            samples,
            cursor: None,
        }
    }
}

impl SeriesIterator for SampleIterator {
    fn seek(&mut self, t: Timestamp) -> bool {
        if self.samples.is_empty() {
            return false;
        }

        let i = self.samples.partition_point(|s| s.timestamp() < t);
        self.cursor = Some(i.min(self.samples.len() - 1));
        true
    }

    fn at(&self) -> Option<(Timestamp, SampleValue)> {
        self.cursor
            .map(|i| (self.samples[i].timestamp(), self.samples[i].value()))
    }

    fn next(&mut self) -> bool {
        let next = self.cursor.map_or(0, |i| i + 1);
        if next >= self.samples.len() {
            return false;
        }
        self.cursor = Some(next);
        true
    }

    fn err(&self) -> Option<&Error> {
        None
    }
}

pub struct OpenTsdbSeriesSet {
    series: Vec<ResponseEntry>,
    cursor: Option<usize>,
    err: Option<Error>,
}

impl OpenTsdbSeriesSet {
    pub fn new(series: Vec<ResponseEntry>) -> Self {
        Self {
            series,
            cursor: None,
            err: None,
        }
    }

    pub fn from_error(err: Error) -> Self {
        Self {
            series: vec![],
            cursor: None,
            err: Some(err),
        }
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

impl SeriesSet for OpenTsdbSeriesSet {
    fn next(&mut self) -> bool {
        let next = self.cursor.map_or(0, |i| i + 1);
        if next >= self.series.len() {
            return false;
        }
        self.cursor = Some(next);
        true
    }

    fn at(&self) -> Option<&dyn Series> {
        self.cursor.map(|i| &self.series[i] as &dyn Series)
    }

    fn err(&self) -> Option<&Error> {
        self.err.as_ref()
    }
}
