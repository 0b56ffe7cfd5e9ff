pub mod record;

pub use record::{ChildRecord, Record, TrackedRecord};
