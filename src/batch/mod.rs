pub mod handlers;
pub mod model;
pub mod multipart_parser;

pub use model::{BatchStatus, BatchStatusError, BatchUpload};
