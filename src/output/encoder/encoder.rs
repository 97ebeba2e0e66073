use crate::error::{Error, Result};
use crate::output::ApiValue;

pub trait Encoder: Send + Sync {
    fn encode(&self, value: &ApiValue) -> Result<Vec<u8>>;

    fn encode_error(&self, err: &Error) -> Result<Vec<u8>>;
}
