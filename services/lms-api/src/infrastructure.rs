// Infrastructure layer modules
pub mod assignment_repository;
pub mod config;
pub mod course_repository;
pub mod enrollment_repository;
pub mod logging;
pub mod object_store;
pub mod repository;
pub mod user_repository;

// Re-exports
pub use assignment_repository::{AssignmentRepository, DynamoAssignmentRepository};
pub use config::{BucketConfig, ConfigError, load_aws_config, required_env};
pub use course_repository::{CourseRepository, DynamoCourseRepository};
pub use enrollment_repository::{DynamoEnrollmentRepository, EnrollmentRepository};
pub use logging::init_logging;
pub use object_store::{ObjectStore, ObjectStoreError, S3ObjectStore};
pub use repository::RepositoryError;
pub use user_repository::{DynamoUserRepository, UserRepository};
