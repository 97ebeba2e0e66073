mod labels;
mod sample;
mod timestamp;

pub use labels::*;
pub use sample::*;
pub use timestamp::*;
