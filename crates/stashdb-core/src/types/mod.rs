mod timestamp;

pub use timestamp::{Timestamp, TimestampError};
