//! HTTP layer: the message-turn endpoint, its NDJSON streaming variant, and
//! read endpoints for snapshots and the mutation log. All under `/api/v1/`.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod response;
pub mod router;
