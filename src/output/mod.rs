mod encoder;
mod value;
mod writer;

pub use encoder::{error_type, Encoder, HumanReadableEncoder, PromApiEncoder};
pub use value::{collect_matrix, collect_series, ApiValue, SeriesData};
pub use writer::{LineWriter, Writer};
