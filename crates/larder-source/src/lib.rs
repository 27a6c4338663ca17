pub mod error;
pub mod parse;
pub mod source;

pub use error::SourceError;
pub use parse::parse_rows;
pub use source::ConfiguredSource;
