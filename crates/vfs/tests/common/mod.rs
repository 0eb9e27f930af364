pub mod fixtures;
pub mod mocks;

#[allow(unused_imports)]
pub use fixtures::{Harness, file_request, seeded_bytes, sha256};
#[allow(unused_imports)]
pub use mocks::{CreateFailure, InstrumentedByteStore, InstrumentedDocumentStore};
