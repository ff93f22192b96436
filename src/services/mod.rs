pub mod book_service;
pub mod user_service;

pub use book_service::{BookDraft, BookPatch, BookService, CoverUpload};
pub use user_service::{LoginData, UserService};
