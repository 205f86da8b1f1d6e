pub mod delivery;
pub mod file_sink;
pub mod lookup;
pub mod registry;
pub mod resolver;
pub mod sink;

pub use delivery::{Delivery, DeliveryReport};
pub use file_sink::FileSink;
pub use lookup::{FileLookup, TargetLookup};
pub use registry::SinkRegistry;
pub use resolver::{ConnectionResolver, RetryPolicy};
pub use sink::{AudioPayload, Sink};
