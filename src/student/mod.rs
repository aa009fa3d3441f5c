pub mod handlers;
pub mod model;

pub use model::{CertificateStatus, NewStudent, StudentRecord};
