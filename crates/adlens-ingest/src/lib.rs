//! Report normalizers: turn an uploaded delimited export from one of the
//! known sources into a content-addressed [`adlens_core::Report`].

pub mod error;
pub mod normalize;
pub mod reader;
pub mod source;
pub mod value;

pub use error::IngestError;
pub use normalize::{normalize, normalize_at, NormalizeSummary};
pub use source::{required_headers, SourceLayout};
