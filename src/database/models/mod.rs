pub mod book;
pub mod summary;
pub mod user;

pub use book::{Book, BookRow, CreatorRef, Genre};
pub use summary::{RecentBook, TenantSummary};
pub use user::{PublicUser, Role, UserRow};
