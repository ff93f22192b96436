pub mod books;
pub mod dashboard;
