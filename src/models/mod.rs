//! Domain models: versioned entities, value types and request types

pub mod author;
pub mod book;
pub mod genre;
pub mod photo;
pub mod reader;
pub mod validation;
pub mod version;

// Re-export commonly used types
pub use author::{Author, AuthorPatch};
pub use book::{Book, BookPatch, Isbn, Page, SearchBooksQuery};
pub use genre::Genre;
pub use photo::Photo;
pub use reader::{Reader, ReaderNumber, ReaderPatch};
