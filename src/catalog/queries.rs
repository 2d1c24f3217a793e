//! Read side of the catalog: lookups, listings and search.
//!
//! Reads never take a book's section; they see whatever summary the last
//! completed recomputation wrote.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::error::{CatalogError, CatalogResult, FieldError};
use super::models::{Book, BookId, Review, ReviewId};
use super::CatalogService;
use crate::utils::{paginate, Page};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    #[default]
    CreatedAt,
    AverageRating,
    Title,
    Author,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// `GET /api/books` parameters
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub author: Option<String>,
    pub genre: Option<String>,
    pub sort_by: Option<SortField>,
    pub sort_order: Option<SortOrder>,
}

/// Free-text search over title and author
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvancedSearchQuery {
    pub title: Option<String>,
    pub author: Option<String>,
    pub genre: Option<String>,
    pub language: Option<String>,
    pub min_rating: Option<f64>,
    pub max_rating: Option<f64>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort_by: Option<SortField>,
    pub sort_order: Option<SortOrder>,
}

/// Type-ahead parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SuggestionQuery {
    #[serde(default)]
    pub q: String,
}

/// Field a suggestion was drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionKind {
    Title,
    Author,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    #[serde(rename = "type")]
    pub kind: SuggestionKind,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Suggestions {
    pub suggestions: Vec<Suggestion>,
}

/// Shorter input yields no suggestions
pub const MIN_SUGGESTION_INPUT: usize = 2;
pub const SUGGESTIONS_PER_KIND: usize = 5;
pub const MAX_SUGGESTIONS: usize = 10;

/// A book with one page of its reviews, newest first
#[derive(Debug, Clone, Serialize)]
pub struct BookWithReviews {
    pub book: Book,
    pub reviews: Page<Review>,
}

/// Case-insensitive substring filter over books
#[derive(Debug, Default)]
struct BookFilter {
    title: Option<String>,
    author: Option<String>,
    genre: Option<String>,
    language: Option<String>,
    /// Matches title or author
    text: Option<String>,
    min_rating: Option<f64>,
    max_rating: Option<f64>,
}

fn needle(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_lowercase)
}

fn contains(haystack: &str, needle: &Option<String>) -> bool {
    match needle {
        Some(needle) => haystack.to_lowercase().contains(needle.as_str()),
        None => true,
    }
}

impl BookFilter {
    fn matches(&self, book: &Book) -> bool {
        let details = &book.details;
        let rating = book.rating.average_rating;

        let text = match &self.text {
            Some(text) => {
                details.title.to_lowercase().contains(text.as_str())
                    || details.author.to_lowercase().contains(text.as_str())
            }
            None => true,
        };

        text && contains(&details.title, &self.title)
            && contains(&details.author, &self.author)
            && contains(&details.genre, &self.genre)
            && contains(&details.language, &self.language)
            && self.min_rating.map_or(true, |min| rating >= min)
            && self.max_rating.map_or(true, |max| rating <= max)
    }
}

fn compare(a: &Book, b: &Book, field: SortField) -> Ordering {
    match field {
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::AverageRating => a.rating.average_rating.total_cmp(&b.rating.average_rating),
        SortField::Title => a
            .details
            .title
            .to_lowercase()
            .cmp(&b.details.title.to_lowercase()),
        SortField::Author => a
            .details
            .author
            .to_lowercase()
            .cmp(&b.details.author.to_lowercase()),
    }
}

/// Order by `field`, breaking ties newest first
fn sort_books(books: &mut [Book], field: SortField, order: SortOrder) {
    books.sort_by(|a, b| {
        let primary = match order {
            SortOrder::Asc => compare(a, b, field),
            SortOrder::Desc => compare(b, a, field),
        };
        primary
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| b.id.cmp(&a.id))
    });
}

/// Distinct values containing `needle`, alphabetical, at most
/// `SUGGESTIONS_PER_KIND`
fn distinct_matches<'a>(values: impl Iterator<Item = &'a str>, needle: &str) -> Vec<String> {
    values
        .filter(|value| value.to_lowercase().contains(needle))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .take(SUGGESTIONS_PER_KIND)
        .map(str::to_string)
        .collect()
}

fn rating_bound(
    errors: &mut Vec<FieldError>,
    field: &'static str,
    value: Option<f64>,
) -> Option<f64> {
    if let Some(value) = value {
        if !(0.0..=5.0).contains(&value) {
            errors.push(FieldError::new(field, "must be between 0 and 5"));
        }
    }
    value
}

impl CatalogService {
    pub async fn get_book(&self, book_id: BookId) -> CatalogResult<Book> {
        self.require_book(&book_id).await
    }

    pub async fn get_review(&self, review_id: ReviewId) -> CatalogResult<Review> {
        self.store
            .get_review(&review_id)
            .await?
            .ok_or_else(|| CatalogError::review_not_found(review_id))
    }

    /// One page of a book's reviews, newest first
    pub async fn reviews_for_book(
        &self,
        book_id: BookId,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> CatalogResult<Page<Review>> {
        let request = self.page_request(page, limit)?;
        self.require_book(&book_id).await?;

        let mut reviews = self.store.reviews_for_book(&book_id).await?;
        reviews.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(paginate(reviews, request.page, request.limit))
    }

    /// Every stored review of a book, unordered and unpaged.
    ///
    /// Does not require the book to exist, so reviews left behind by a
    /// failed cascade still show up.
    pub async fn stored_reviews(&self, book_id: BookId) -> CatalogResult<Vec<Review>> {
        Ok(self.store.reviews_for_book(&book_id).await?)
    }

    pub async fn book_with_reviews(
        &self,
        book_id: BookId,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> CatalogResult<BookWithReviews> {
        let reviews = self.reviews_for_book(book_id, page, limit).await?;
        let book = self.require_book(&book_id).await?;
        Ok(BookWithReviews { book, reviews })
    }

    pub async fn list_books(&self, query: &BookListQuery) -> CatalogResult<Page<Book>> {
        let request = self.page_request(query.page, query.limit)?;
        let filter = BookFilter {
            author: needle(query.author.as_deref()),
            genre: needle(query.genre.as_deref()),
            ..BookFilter::default()
        };

        self.filtered_page(
            filter,
            query.sort_by.unwrap_or_default(),
            query.sort_order.unwrap_or_default(),
            request.page,
            request.limit,
        )
        .await
    }

    /// Title/author search, best rated first
    pub async fn search_books(&self, query: &SearchQuery) -> CatalogResult<Page<Book>> {
        let text = needle(Some(query.q.as_str()))
            .ok_or_else(|| CatalogError::invalid("q", "is required"))?;
        let request = self.page_request(query.page, query.limit)?;
        let filter = BookFilter {
            text: Some(text),
            ..BookFilter::default()
        };

        self.filtered_page(
            filter,
            SortField::AverageRating,
            SortOrder::Desc,
            request.page,
            request.limit,
        )
        .await
    }

    pub async fn advanced_search(&self, query: &AdvancedSearchQuery) -> CatalogResult<Page<Book>> {
        let mut errors = Vec::new();
        let min_rating = rating_bound(&mut errors, "minRating", query.min_rating);
        let max_rating = rating_bound(&mut errors, "maxRating", query.max_rating);
        if let (Some(min), Some(max)) = (min_rating, max_rating) {
            if min > max {
                errors.push(FieldError::new("minRating", "cannot exceed maxRating"));
            }
        }
        if !errors.is_empty() {
            return Err(CatalogError::InvalidInput(errors));
        }

        let request = self.page_request(query.page, query.limit)?;
        let filter = BookFilter {
            title: needle(query.title.as_deref()),
            author: needle(query.author.as_deref()),
            genre: needle(query.genre.as_deref()),
            language: needle(query.language.as_deref()),
            text: None,
            min_rating,
            max_rating,
        };

        self.filtered_page(
            filter,
            query.sort_by.unwrap_or(SortField::AverageRating),
            query.sort_order.unwrap_or_default(),
            request.page,
            request.limit,
        )
        .await
    }

    /// Type-ahead over titles and authors: up to five distinct titles, then
    /// up to five distinct authors
    pub async fn search_suggestions(&self, query: &SuggestionQuery) -> CatalogResult<Suggestions> {
        let text = match needle(Some(query.q.as_str())) {
            Some(text) if text.chars().count() >= MIN_SUGGESTION_INPUT => text,
            _ => return Ok(Suggestions::default()),
        };

        let books = self
            .store
            .find_books(&|book: &Book| {
                book.details.title.to_lowercase().contains(text.as_str())
                    || book.details.author.to_lowercase().contains(text.as_str())
            })
            .await?;

        let titles = distinct_matches(books.iter().map(|b| b.details.title.as_str()), &text);
        let authors = distinct_matches(books.iter().map(|b| b.details.author.as_str()), &text);

        let suggestions = titles
            .into_iter()
            .map(|value| Suggestion {
                kind: SuggestionKind::Title,
                value,
            })
            .chain(authors.into_iter().map(|value| Suggestion {
                kind: SuggestionKind::Author,
                value,
            }))
            .take(MAX_SUGGESTIONS)
            .collect();
        Ok(Suggestions { suggestions })
    }

    async fn filtered_page(
        &self,
        filter: BookFilter,
        field: SortField,
        order: SortOrder,
        page: u32,
        limit: u32,
    ) -> CatalogResult<Page<Book>> {
        let mut books = self
            .store
            .find_books(&|book: &Book| filter.matches(book))
            .await?;
        sort_books(&mut books, field, order);
        Ok(paginate(books, page, limit))
    }
}
