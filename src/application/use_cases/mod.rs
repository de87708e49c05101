pub mod batch_validation;
pub mod chunking;
pub mod validate_email;
pub mod validate_upload;
