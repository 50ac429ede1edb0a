mod model;
mod repository;

pub use model::{NewValidationLogDB, ValidationLogDB};
pub use repository::ValidationLogRepository;
