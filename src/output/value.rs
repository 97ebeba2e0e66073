use crate::error::{Error, Result};
use crate::model::{LabelValue, Labels, SampleValue, Timestamp};
use crate::storage::SeriesSet;

#[derive(Debug, PartialEq)]
pub struct SeriesData {
    pub labels: Labels,
    pub samples: Vec<(Timestamp, SampleValue)>,
}

/// Results the frontend and the CLI render.
#[derive(Debug, PartialEq)]
pub enum ApiValue {
    Matrix(Vec<SeriesData>),
    Series(Vec<Labels>),
    LabelValues(Vec<LabelValue>),
}

/// Drains `set` into owned series data, failing if the set carries an
/// error.
pub fn collect_matrix(set: &mut dyn SeriesSet) -> Result<Vec<SeriesData>> {
    check(set)?;

    let mut matrix = vec![];
    while set.next() {
        let series = match set.at() {
            Some(series) => series,
            None => break,
        };

        let mut it = series.iterator();
        let mut samples = vec![];
        while it.next() {
            if let Some(sample) = it.at() {
                samples.push(sample);
            }
        }
        if let Some(err) = it.err() {
            return Err(Error::new(err.kind(), &err.to_string()));
        }

        matrix.push(SeriesData {
            labels: series.labels(),
            samples,
        });
    }
    Ok(matrix)
}

pub fn collect_series(set: &mut dyn SeriesSet) -> Result<Vec<Labels>> {
    check(set)?;

    let mut labels = vec![];
    while set.next() {
        if let Some(series) = set.at() {
            labels.push(series.labels());
        }
    }
    Ok(labels)
}

fn check(set: &dyn SeriesSet) -> Result<()> {
    match set.err() {
        Some(err) => Err(Error::new(err.kind(), &err.to_string())),
        None => Ok(()),
    }
}
