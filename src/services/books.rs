//! Book catalog service

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{CreateBookRequest, UpdateBookRequest},
        validation::require,
        Book, BookPatch, Isbn, Page, SearchBooksQuery,
    },
    repository::{escape_like, Repository},
};

#[derive(Clone)]
pub struct BooksService {
    repository: Repository,
}

impl BooksService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Register a new book under `isbn`.
    /// The ISBN must be free; genre and authors must already exist.
    pub async fn create(&self, isbn: &str, request: CreateBookRequest) -> AppResult<Book> {
        let isbn = Isbn::parse(isbn)?;
        if self.repository.books.exists_by_isbn(isbn.as_str()).await? {
            return Err(AppError::Conflict(format!("Book with ISBN {} already exists", isbn)));
        }

        let genre = self
            .repository
            .resolve_genre(&require("Genre", request.genre)?)
            .await?;
        let authors = self
            .repository
            .resolve_authors(&require("Authors", request.authors)?)
            .await?;
        let title = require("Title", request.title)?;

        let book = Book::new(
            isbn.as_str(),
            &title,
            request.description.as_deref(),
            genre,
            authors,
            request.photo_uri.as_deref(),
        )?;

        let saved = self.repository.books.save(&book).await?;
        tracing::info!(isbn = saved.isbn(), "Book created");
        Ok(saved)
    }

    /// Patch a book. References in the request are resolved first, then the
    /// version-guarded patch is applied and the book is saved.
    pub async fn update(&self, isbn: &str, request: UpdateBookRequest, expected_version: i64) -> AppResult<Book> {
        let mut book = self.find_by_isbn(isbn).await?;

        let genre = match request.genre {
            Some(name) => Some(self.repository.resolve_genre(&name).await?),
            None => None,
        };
        let authors = match request.authors {
            Some(numbers) => Some(self.repository.resolve_authors(&numbers).await?),
            None => None,
        };

        book.apply_patch(
            expected_version,
            BookPatch {
                title: request.title,
                description: request.description,
                genre,
                authors,
                photo_uri: request.photo_uri,
            },
        )?;

        let saved = self.repository.books.save(&book).await?;
        tracing::info!(isbn = saved.isbn(), version = saved.version(), "Book updated");
        Ok(saved)
    }

    pub async fn find_by_isbn(&self, isbn: &str) -> AppResult<Book> {
        self.repository
            .books
            .find_by_isbn(&Isbn::normalize(isbn))
            .await?
            .ok_or_else(|| AppError::not_found(format!("Book with ISBN {} not found", isbn)))
    }

    pub async fn find_by_genre(&self, genre: &str) -> AppResult<Vec<Book>> {
        self.repository.books.find_by_genre(genre).await
    }

    pub async fn find_by_title(&self, title: &str) -> AppResult<Vec<Book>> {
        self.repository.books.find_by_title(title).await
    }

    /// Books with at least one author whose name starts with `name`
    pub async fn find_by_author_name(&self, name: &str) -> AppResult<Vec<Book>> {
        let pattern = format!("{}%", escape_like(name));
        self.repository.books.find_by_author_name(&pattern).await
    }

    /// Paged search; a missing page means the first page, a missing query
    /// matches every book.
    pub async fn search(&self, page: Option<Page>, query: Option<SearchBooksQuery>) -> AppResult<(Vec<Book>, Page)> {
        let page = match page {
            Some(page) => Page::new(page.number, page.limit)?,
            None => Page::default(),
        };
        let query = query.unwrap_or_default();
        let books = self.repository.books.search(&page, &query).await?;
        Ok((books, page))
    }

    pub async fn remove_photo(&self, isbn: &str, expected_version: i64) -> AppResult<Book> {
        let mut book = self.find_by_isbn(isbn).await?;
        if book.photo().is_none() {
            return Err(AppError::not_found(format!("Book {} has no photo", book.isbn())));
        }

        book.remove_photo(expected_version)?;
        let saved = self.repository.books.save(&book).await?;
        tracing::info!(isbn = saved.isbn(), "Book photo removed");
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Author, Genre};
    use crate::repository::{
        MockAuthorRepository, MockBookRepository, MockGenreRepository, MockReaderRepository,
    };
    use mockall::predicate::eq;
    use std::sync::Arc;

    const VALID_ISBN: &str = "9783161484100";
    const VALID_TITLE: &str = "O Senhor dos Anéis";
    const VALID_DESCRIPTION: &str = "Uma história épica.";
    const VALID_GENRE_NAME: &str = "Fantasia";
    const VALID_AUTHOR_ID: i64 = 1;

    fn service(books: MockBookRepository, authors: MockAuthorRepository, genres: MockGenreRepository) -> BooksService {
        BooksService::new(Repository {
            books: Arc::new(books),
            authors: Arc::new(authors),
            genres: Arc::new(genres),
            readers: Arc::new(MockReaderRepository::new()),
        })
    }

    fn author() -> Author {
        Author::restore(VALID_AUTHOR_ID, "Tolkien".into(), "Bio".into(), None, 1)
    }

    fn genre() -> Genre {
        Genre::new(VALID_GENRE_NAME).unwrap()
    }

    fn stored_book(photo: Option<&str>) -> Book {
        Book::restore(
            VALID_ISBN.into(),
            VALID_TITLE.into(),
            None,
            genre(),
            vec![author()],
            photo.map(str::to_string),
            1,
        )
    }

    fn create_request() -> CreateBookRequest {
        CreateBookRequest {
            title: Some(VALID_TITLE.into()),
            description: Some(VALID_DESCRIPTION.into()),
            genre: Some(VALID_GENRE_NAME.into()),
            authors: Some(vec![VALID_AUTHOR_ID]),
            photo_uri: None,
        }
    }

    #[tokio::test]
    async fn test_create_conflicts_when_isbn_exists() {
        let mut books = MockBookRepository::new();
        books
            .expect_exists_by_isbn()
            .withf(|isbn| isbn == VALID_ISBN)
            .returning(|_| Ok(true));
        books.expect_save().never();

        let err = service(books, MockAuthorRepository::new(), MockGenreRepository::new())
            .create(VALID_ISBN, create_request())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_create_not_found_when_genre_missing() {
        let mut books = MockBookRepository::new();
        books.expect_exists_by_isbn().returning(|_| Ok(false));
        let mut genres = MockGenreRepository::new();
        genres
            .expect_find_by_name()
            .withf(|name| name == VALID_GENRE_NAME)
            .returning(|_| Ok(None));

        let err = service(books, MockAuthorRepository::new(), genres)
            .create(VALID_ISBN, create_request())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_create_not_found_when_author_missing() {
        let mut books = MockBookRepository::new();
        books.expect_exists_by_isbn().returning(|_| Ok(false));
        let mut genres = MockGenreRepository::new();
        genres.expect_find_by_name().returning(|_| Ok(Some(genre())));
        let mut authors = MockAuthorRepository::new();
        authors.expect_find_by_author_number().returning(|_| Ok(None));

        let err = service(books, authors, genres)
            .create(VALID_ISBN, create_request())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_create_rejects_missing_title() {
        let mut books = MockBookRepository::new();
        books.expect_exists_by_isbn().returning(|_| Ok(false));
        books.expect_save().never();
        let mut genres = MockGenreRepository::new();
        genres.expect_find_by_name().returning(|_| Ok(Some(genre())));
        let mut authors = MockAuthorRepository::new();
        authors.expect_find_by_author_number().returning(|_| Ok(Some(author())));

        let request = CreateBookRequest {
            title: None,
            ..create_request()
        };
        let err = service(books, authors, genres).create(VALID_ISBN, request).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid argument: Title cannot be null");
    }

    #[tokio::test]
    async fn test_create_rejects_empty_author_list() {
        let mut books = MockBookRepository::new();
        books.expect_exists_by_isbn().returning(|_| Ok(false));
        books.expect_save().never();
        let mut genres = MockGenreRepository::new();
        genres.expect_find_by_name().returning(|_| Ok(Some(genre())));

        let request = CreateBookRequest {
            authors: Some(vec![]),
            ..create_request()
        };
        let err = service(books, MockAuthorRepository::new(), genres)
            .create(VALID_ISBN, request)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_create_saves_valid_book() {
        let mut books = MockBookRepository::new();
        books.expect_exists_by_isbn().returning(|_| Ok(false));
        books
            .expect_save()
            .withf(|book| {
                book.isbn() == VALID_ISBN
                    && book.title() == VALID_TITLE
                    && book.description() == Some(VALID_DESCRIPTION)
                    && !book.is_persisted()
            })
            .times(1)
            .returning(|book| Ok(book.clone().saved(1)));
        let mut genres = MockGenreRepository::new();
        genres.expect_find_by_name().returning(|_| Ok(Some(genre())));
        let mut authors = MockAuthorRepository::new();
        authors
            .expect_find_by_author_number()
            .with(eq(VALID_AUTHOR_ID))
            .returning(|_| Ok(Some(author())));

        let book = service(books, authors, genres)
            .create("978-3-16-148410-0", create_request())
            .await
            .unwrap();

        assert_eq!(book.isbn(), VALID_ISBN);
        assert_eq!(book.authors(), &[author()]);
        assert!(book.is_persisted());
    }

    #[tokio::test]
    async fn test_update_not_found_when_genre_missing() {
        let mut books = MockBookRepository::new();
        books.expect_find_by_isbn().returning(|_| Ok(Some(stored_book(None))));
        books.expect_save().never();
        let mut genres = MockGenreRepository::new();
        genres.expect_find_by_name().returning(|_| Ok(None));

        let request = UpdateBookRequest {
            genre: Some(VALID_GENRE_NAME.into()),
            ..Default::default()
        };
        let err = service(books, MockAuthorRepository::new(), genres)
            .update(VALID_ISBN, request, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_applies_patch_and_saves() {
        let mut books = MockBookRepository::new();
        books.expect_find_by_isbn().returning(|_| Ok(Some(stored_book(None))));
        books
            .expect_save()
            .withf(|book| book.title() == "Novo Título" && book.version() == 1)
            .times(1)
            .returning(|book| Ok(book.clone().saved(2)));

        let request = UpdateBookRequest {
            title: Some("Novo Título".into()),
            ..Default::default()
        };
        let book = service(books, MockAuthorRepository::new(), MockGenreRepository::new())
            .update(VALID_ISBN, request, 1)
            .await
            .unwrap();

        assert_eq!(book.title(), "Novo Título");
        assert_eq!(book.version(), 2);
        assert_eq!(book.genre(), &genre());
    }

    #[tokio::test]
    async fn test_update_with_stale_version_is_not_saved() {
        let mut books = MockBookRepository::new();
        books.expect_find_by_isbn().returning(|_| Ok(Some(stored_book(None))));
        books.expect_save().never();

        let request = UpdateBookRequest {
            title: Some("Ignored".into()),
            ..Default::default()
        };
        let err = service(books, MockAuthorRepository::new(), MockGenreRepository::new())
            .update(VALID_ISBN, request, 7)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::StaleVersion { expected: 7, actual: 1 }));
    }

    #[tokio::test]
    async fn test_update_replaces_author_list() {
        let mut books = MockBookRepository::new();
        books.expect_find_by_isbn().returning(|_| Ok(Some(stored_book(None))));
        books
            .expect_save()
            .withf(|book| {
                let numbers: Vec<_> = book.authors().iter().filter_map(|a| a.author_number()).collect();
                numbers == vec![2, 3]
            })
            .times(1)
            .returning(|book| Ok(book.clone().saved(2)));
        let mut authors = MockAuthorRepository::new();
        authors
            .expect_find_by_author_number()
            .returning(|n| Ok(Some(Author::restore(n, format!("Author {}", n), "Bio".into(), None, 1))));

        let request = UpdateBookRequest {
            authors: Some(vec![2, 3]),
            ..Default::default()
        };
        let book = service(books, authors, MockGenreRepository::new())
            .update(VALID_ISBN, request, 1)
            .await
            .unwrap();

        assert!(!book.authors().contains(&author()));
        assert_eq!(book.authors().len(), 2);
    }

    #[tokio::test]
    async fn test_find_by_isbn_not_found() {
        let mut books = MockBookRepository::new();
        books.expect_find_by_isbn().returning(|_| Ok(None));

        let err = service(books, MockAuthorRepository::new(), MockGenreRepository::new())
            .find_by_isbn("9999999999999")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_find_by_isbn_normalizes_separators() {
        let mut books = MockBookRepository::new();
        books
            .expect_find_by_isbn()
            .withf(|isbn| isbn == VALID_ISBN)
            .returning(|_| Ok(Some(stored_book(None))));

        let book = service(books, MockAuthorRepository::new(), MockGenreRepository::new())
            .find_by_isbn("978-3-16-148410-0")
            .await
            .unwrap();
        assert_eq!(book.isbn(), VALID_ISBN);
    }

    #[tokio::test]
    async fn test_find_by_author_name_uses_prefix() {
        let mut books = MockBookRepository::new();
        books
            .expect_find_by_author_name()
            .withf(|pattern| pattern == "Autor%")
            .returning(|_| Ok(vec![stored_book(None)]));

        let found = service(books, MockAuthorRepository::new(), MockGenreRepository::new())
            .find_by_author_name("Autor")
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn test_find_by_genre_and_title_delegate() {
        let mut books = MockBookRepository::new();
        books
            .expect_find_by_genre()
            .withf(|genre| genre == VALID_GENRE_NAME)
            .returning(|_| Ok(vec![stored_book(None)]));
        books
            .expect_find_by_title()
            .withf(|title| title == VALID_TITLE)
            .returning(|_| Ok(vec![stored_book(None)]));

        let service = service(books, MockAuthorRepository::new(), MockGenreRepository::new());
        assert_eq!(service.find_by_genre(VALID_GENRE_NAME).await.unwrap().len(), 1);
        assert_eq!(service.find_by_title(VALID_TITLE).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_photo_not_found_without_photo() {
        let mut books = MockBookRepository::new();
        books.expect_find_by_isbn().returning(|_| Ok(Some(stored_book(None))));
        books.expect_save().never();

        let err = service(books, MockAuthorRepository::new(), MockGenreRepository::new())
            .remove_photo(VALID_ISBN, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_remove_photo() {
        let mut books = MockBookRepository::new();
        books
            .expect_find_by_isbn()
            .returning(|_| Ok(Some(stored_book(Some("cover.jpg")))));
        books
            .expect_save()
            .withf(|book| book.photo().is_none())
            .returning(|book| Ok(book.clone().saved(2)));

        let book = service(books, MockAuthorRepository::new(), MockGenreRepository::new())
            .remove_photo(VALID_ISBN, 1)
            .await
            .unwrap();
        assert!(book.photo().is_none());
    }

    #[tokio::test]
    async fn test_search_defaults_page_and_query() {
        let mut books = MockBookRepository::new();
        books
            .expect_search()
            .withf(|page, query| *page == Page::default() && *query == SearchBooksQuery::default())
            .returning(|_, _| Ok(vec![stored_book(None)]));

        let (found, page) = service(books, MockAuthorRepository::new(), MockGenreRepository::new())
            .search(None, None)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(page, Page::default());
    }

    #[tokio::test]
    async fn test_search_rejects_invalid_page() {
        let err = service(MockBookRepository::new(), MockAuthorRepository::new(), MockGenreRepository::new())
            .search(Some(Page { number: 0, limit: 10 }), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
    }
}
