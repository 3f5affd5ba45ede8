pub mod compose;
pub mod digest;
pub mod dispatch;
pub mod ingest;
pub mod outbox;
pub mod registry;

pub use compose::Composer;
pub use digest::{DigestHook, DigestOptions, DigestOutcome};
pub use dispatch::{DispatchOutcome, Dispatcher, NotifyTarget};
pub use ingest::{IngestOptions, IngestReport, Ingestor};
pub use outbox::{DeliveryReport, Outbox, SendFailure};
pub use registry::Registry;
