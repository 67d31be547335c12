// アプリケーション層モジュール
pub mod admin_course_handler;
pub mod admin_user_handler;
pub mod assignment_handler;
pub mod board_service;
pub mod catalog_handler;
pub mod community_handler;
pub mod course_handler;
pub mod enrollment_handler;
pub mod entry;
pub mod error;
pub mod notice_handler;
pub mod qna_handler;
pub mod request;
pub mod response;
pub mod route;
pub mod user_directory_handler;

// 再エクスポート
pub use admin_course_handler::AdminCourseHandler;
pub use admin_user_handler::AdminUserHandler;
pub use assignment_handler::AssignmentHandler;
pub use board_service::{BoardService, CreatedPost, UploadUrl};
pub use catalog_handler::CatalogHandler;
pub use community_handler::CommunityHandler;
pub use course_handler::CourseHandler;
pub use enrollment_handler::EnrollmentHandler;
pub use entry::{RequestHandler, configuration_error, dispatch};
pub use error::{ErrorContext, HandlerError};
pub use notice_handler::NoticeHandler;
pub use qna_handler::QnaHandler;
pub use request::{ApiRequest, Claims, RequestError};
pub use response::{ApiResponse, Envelope};
pub use user_directory_handler::UserDirectoryHandler;
