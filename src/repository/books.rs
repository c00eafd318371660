//! Books repository for database operations

use async_trait::async_trait;
use sqlx::{FromRow, Pool, Postgres, QueryBuilder};

use super::{
    authors::AuthorRow, conflict_on_duplicate, escape_like, stale_or_missing, BookRepository,
};
use crate::{
    error::{AppError, AppResult},
    models::{Author, Book, Genre, Page, SearchBooksQuery},
};

#[derive(Debug, FromRow)]
struct BookRow {
    isbn: String,
    title: String,
    description: Option<String>,
    genre: String,
    photo_file: Option<String>,
    version: i64,
}

#[derive(Clone)]
pub struct PgBooksRepository {
    pool: Pool<Postgres>,
}

impl PgBooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Attach the ordered author list to a book row
    async fn load(&self, row: BookRow) -> AppResult<Book> {
        let authors = sqlx::query_as::<_, AuthorRow>(
            r#"
            SELECT a.*
            FROM authors a
            JOIN book_authors ba ON ba.author_number = a.author_number
            WHERE ba.isbn = $1
            ORDER BY ba.position
            "#,
        )
        .bind(&row.isbn)
        .fetch_all(&self.pool)
        .await?;

        Ok(Book::restore(
            row.isbn,
            row.title,
            row.description,
            Genre::from_stored(row.genre),
            authors.into_iter().map(Author::from).collect(),
            row.photo_file,
            row.version,
        ))
    }

    async fn load_all(&self, rows: Vec<BookRow>) -> AppResult<Vec<Book>> {
        let mut books = Vec::with_capacity(rows.len());
        for row in rows {
            books.push(self.load(row).await?);
        }
        Ok(books)
    }

    async fn current_version(&self, isbn: &str) -> AppResult<Option<i64>> {
        let version = sqlx::query_scalar("SELECT version FROM books WHERE isbn = $1")
            .bind(isbn)
            .fetch_optional(&self.pool)
            .await?;
        Ok(version)
    }
}

#[async_trait]
impl BookRepository for PgBooksRepository {
    async fn find_by_isbn(&self, isbn: &str) -> AppResult<Option<Book>> {
        let row = sqlx::query_as::<_, BookRow>("SELECT * FROM books WHERE isbn = $1")
            .bind(isbn)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(Some(self.load(row).await?)),
            None => Ok(None),
        }
    }

    async fn exists_by_isbn(&self, isbn: &str) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE isbn = $1)")
            .bind(isbn)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn save(&self, book: &Book) -> AppResult<Book> {
        let photo_file = book.photo().map(|p| p.photo_file());
        let mut tx = self.pool.begin().await?;

        let version = if book.is_persisted() {
            let updated: Option<i64> = sqlx::query_scalar(
                r#"
                UPDATE books
                SET title = $2, description = $3, genre = $4, photo_file = $5,
                    version = version + 1
                WHERE isbn = $1 AND version = $6
                RETURNING version
                "#,
            )
            .bind(book.isbn())
            .bind(book.title())
            .bind(book.description())
            .bind(book.genre().name())
            .bind(photo_file)
            .bind(book.version())
            .fetch_optional(&mut *tx)
            .await?;

            match updated {
                Some(version) => version,
                None => {
                    tx.rollback().await?;
                    return Err(stale_or_missing(
                        book.version(),
                        self.current_version(book.isbn()).await?,
                        || format!("Book {} not found", book.isbn()),
                    ));
                }
            }
        } else {
            sqlx::query(
                r#"
                INSERT INTO books (isbn, title, description, genre, photo_file, version)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(book.isbn())
            .bind(book.title())
            .bind(book.description())
            .bind(book.genre().name())
            .bind(photo_file)
            .bind(book.version())
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                conflict_on_duplicate(e, || format!("Book with ISBN {} already exists", book.isbn()))
            })?;
            book.version()
        };

        sqlx::query("DELETE FROM book_authors WHERE isbn = $1")
            .bind(book.isbn())
            .execute(&mut *tx)
            .await?;

        for (position, author) in book.authors().iter().enumerate() {
            let author_number = author.author_number().ok_or_else(|| {
                AppError::invalid(format!("Author {} has not been saved", author.name()))
            })?;
            sqlx::query("INSERT INTO book_authors (isbn, position, author_number) VALUES ($1, $2, $3)")
                .bind(book.isbn())
                .bind(position as i32)
                .bind(author_number)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(book.clone().saved(version))
    }

    async fn find_by_genre(&self, genre: &str) -> AppResult<Vec<Book>> {
        let rows = sqlx::query_as::<_, BookRow>(
            "SELECT * FROM books WHERE genre ILIKE $1 ORDER BY title, isbn",
        )
        .bind(format!("%{}%", escape_like(genre)))
        .fetch_all(&self.pool)
        .await?;
        self.load_all(rows).await
    }

    async fn find_by_title(&self, title: &str) -> AppResult<Vec<Book>> {
        let rows = sqlx::query_as::<_, BookRow>(
            "SELECT * FROM books WHERE title ILIKE $1 ORDER BY title, isbn",
        )
        .bind(format!("%{}%", escape_like(title)))
        .fetch_all(&self.pool)
        .await?;
        self.load_all(rows).await
    }

    async fn find_by_author_name(&self, pattern: &str) -> AppResult<Vec<Book>> {
        let rows = sqlx::query_as::<_, BookRow>(
            r#"
            SELECT DISTINCT b.*
            FROM books b
            JOIN book_authors ba ON ba.isbn = b.isbn
            JOIN authors a ON a.author_number = ba.author_number
            WHERE a.name ILIKE $1
            ORDER BY b.title, b.isbn
            "#,
        )
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;
        self.load_all(rows).await
    }

    async fn find_by_author_number(&self, author_number: i64) -> AppResult<Vec<Book>> {
        let rows = sqlx::query_as::<_, BookRow>(
            r#"
            SELECT b.*
            FROM books b
            JOIN book_authors ba ON ba.isbn = b.isbn
            WHERE ba.author_number = $1
            ORDER BY b.title, b.isbn
            "#,
        )
        .bind(author_number)
        .fetch_all(&self.pool)
        .await?;
        self.load_all(rows).await
    }

    async fn search(&self, page: &Page, query: &SearchBooksQuery) -> AppResult<Vec<Book>> {
        let mut builder = QueryBuilder::<Postgres>::new(
            r#"
            SELECT DISTINCT b.*
            FROM books b
            LEFT JOIN book_authors ba ON ba.isbn = b.isbn
            LEFT JOIN authors a ON a.author_number = ba.author_number
            WHERE TRUE
            "#,
        );

        macro_rules! add_filter {
            ($field:expr, $column:expr) => {
                if let Some(value) = $field.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                    builder
                        .push(concat!(" AND ", $column, " ILIKE "))
                        .push_bind(format!("%{}%", escape_like(value)));
                }
            };
        }

        add_filter!(query.title, "b.title");
        add_filter!(query.genre, "b.genre");
        add_filter!(query.author_name, "a.name");

        builder
            .push(" ORDER BY b.title, b.isbn LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows = builder.build_query_as::<BookRow>().fetch_all(&self.pool).await?;
        self.load_all(rows).await
    }
}
