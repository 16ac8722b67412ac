//! Pipeline stages: ingestion, retrieval, and response synthesis.
//!
//! Each stage is a struct that captures its dependencies and registers a
//! handler closure on the bus at construction, mirroring how documents
//! and queries actually flow: `DocumentUpload` → ingestion;
//! `QueryRequest` → retrieval → `RetrievalResult` → synthesis → answer
//! mailbox.

pub mod ingestion;
pub mod retrieval;
pub mod synthesis;

/// Receiver name of the ingestion stage.
pub const INGESTION: &str = "ingestion";
/// Receiver name of the retrieval stage.
pub const RETRIEVAL: &str = "retrieval";
/// Receiver name of the response-synthesis stage.
pub const SYNTHESIS: &str = "synthesis";
