pub mod use_cases;

pub use use_cases::validate_email::ValidateEmailUseCase;
pub use use_cases::validate_upload::ValidateUploadUseCase;
