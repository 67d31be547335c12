// Domain layer modules
pub mod assignment;
pub mod board;
pub mod catalog;
pub mod course;
pub mod enrollment;
pub mod listing;
pub mod post;
pub mod role;
pub mod timestamp;
pub mod user;

// Re-exports
pub use assignment::{
    AssignmentError, AssignmentRecord, AssignmentStatus, ItemType, NewAssignment, SubmissionFile,
};
pub use board::BoardKind;
pub use catalog::{MainCategoryNode, SubCategoryNode};
pub use course::{
    CourseLevel, CourseRecord, CourseStatus, CourseUpdate, CourseValidationError, InstructorRef,
    NewCourse,
};
pub use enrollment::{EnrollmentRecord, EnrollmentStatus};
pub use listing::{Category, FolderEntry, ObjectListing, ObjectSummary};
pub use post::{Attachment, AttachmentRequest, NewPost, Post, PostValidationError};
pub use role::{Role, UnknownRole};
pub use user::UserRecord;
