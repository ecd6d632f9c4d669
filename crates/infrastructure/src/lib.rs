pub mod dns;
pub mod ingest;
