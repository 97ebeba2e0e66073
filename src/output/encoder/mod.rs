mod encoder;
mod human;
mod promapi;

pub use encoder::Encoder;
pub use human::HumanReadableEncoder;
pub use promapi::{error_type, PromApiEncoder};
