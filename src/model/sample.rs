use super::timestamp::Timestamp;

pub type SampleValue = f64;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Sample {
    timestamp: Timestamp,
    value: SampleValue,
}

impl Sample {
    pub fn new(timestamp: Timestamp, value: SampleValue) -> Self {
        Self { timestamp, value }
    }

    #[inline]
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    #[inline]
    pub fn value(&self) -> SampleValue {
        self.value
    }
}
