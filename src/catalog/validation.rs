//! Input checks applied inside the catalog before any write.
//!
//! Requests are normally validated at the edge already; these run again so
//! the core never stores a record that breaks its own bounds.

use super::error::{CatalogError, CatalogResult, FieldError};
use super::models::{BookDetails, BookInput, ReviewContent, ReviewInput, DEFAULT_LANGUAGE};

pub const TITLE_MAX: usize = 200;
pub const AUTHOR_MAX: usize = 100;
pub const GENRE_MAX: usize = 50;
pub const DESCRIPTION_MAX: usize = 2000;
pub const COMMENT_MIN: usize = 10;
pub const COMMENT_MAX: usize = 1000;
pub const RATING_MIN: i64 = 1;
pub const RATING_MAX: i64 = 5;

fn required_text(
    errors: &mut Vec<FieldError>,
    field: &'static str,
    value: &str,
    max: usize,
) -> String {
    let value = value.trim();
    let len = value.chars().count();
    if len == 0 {
        errors.push(FieldError::new(field, "is required"));
    } else if len > max {
        errors.push(FieldError::new(
            field,
            format!("cannot exceed {} characters", max),
        ));
    }
    value.to_string()
}

/// Digits and hyphens only, with exactly 10 or 13 digits
pub fn is_valid_isbn(isbn: &str) -> bool {
    let allowed = !isbn.is_empty() && isbn.chars().all(|c| c.is_ascii_digit() || c == '-');
    let digits = isbn.chars().filter(char::is_ascii_digit).count();
    allowed && (digits == 10 || digits == 13)
}

pub fn book_details(input: &BookInput) -> CatalogResult<BookDetails> {
    let mut errors = Vec::new();

    let title = required_text(&mut errors, "title", &input.title, TITLE_MAX);
    let author = required_text(&mut errors, "author", &input.author, AUTHOR_MAX);
    let genre = required_text(&mut errors, "genre", &input.genre, GENRE_MAX);
    let description = required_text(
        &mut errors,
        "description",
        &input.description,
        DESCRIPTION_MAX,
    );

    let isbn = input
        .isbn
        .as_deref()
        .map(str::trim)
        .filter(|isbn| !isbn.is_empty())
        .map(str::to_string);
    if let Some(isbn) = &isbn {
        if !is_valid_isbn(isbn) {
            errors.push(FieldError::new("isbn", "Please enter a valid ISBN"));
        }
    }

    if input.page_count == Some(0) {
        errors.push(FieldError::new("pageCount", "must be at least 1"));
    }

    let language = input
        .language
        .as_deref()
        .map(str::trim)
        .filter(|language| !language.is_empty())
        .unwrap_or(DEFAULT_LANGUAGE)
        .to_string();

    if !errors.is_empty() {
        return Err(CatalogError::InvalidInput(errors));
    }

    Ok(BookDetails {
        title,
        author,
        genre,
        description,
        published_date: input.published_date,
        isbn,
        page_count: input.page_count,
        language,
    })
}

pub fn review_content(input: &ReviewInput) -> CatalogResult<ReviewContent> {
    let mut errors = Vec::new();

    if !(RATING_MIN..=RATING_MAX).contains(&input.rating) {
        errors.push(FieldError::new(
            "rating",
            format!("must be between {} and {}", RATING_MIN, RATING_MAX),
        ));
    }

    let comment = input.comment.trim();
    let len = comment.chars().count();
    if len < COMMENT_MIN {
        errors.push(FieldError::new(
            "comment",
            format!("must be at least {} characters long", COMMENT_MIN),
        ));
    } else if len > COMMENT_MAX {
        errors.push(FieldError::new(
            "comment",
            format!("cannot exceed {} characters", COMMENT_MAX),
        ));
    }

    match u8::try_from(input.rating) {
        Ok(rating) if errors.is_empty() => Ok(ReviewContent {
            rating,
            comment: comment.to_string(),
        }),
        _ => Err(CatalogError::InvalidInput(errors)),
    }
}

/// Normalized page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn new(page: u32, limit: u32) -> Self {
        Self { page, limit }
    }

    /// Apply defaults and reject out-of-range values
    pub fn parse(
        page: Option<u32>,
        limit: Option<u32>,
        default_limit: u32,
        max_limit: u32,
    ) -> CatalogResult<Self> {
        let mut errors = Vec::new();
        let page = page.unwrap_or(1);
        let limit = limit.unwrap_or(default_limit);

        if page == 0 {
            errors.push(FieldError::new("page", "must be at least 1"));
        }
        if limit == 0 || limit > max_limit {
            errors.push(FieldError::new(
                "limit",
                format!("must be between 1 and {}", max_limit),
            ));
        }

        if errors.is_empty() {
            Ok(Self { page, limit })
        } else {
            Err(CatalogError::InvalidInput(errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn input() -> BookInput {
        BookInput {
            title: "  The Left Hand of Darkness ".to_string(),
            author: "Ursula K. Le Guin".to_string(),
            genre: "Science Fiction".to_string(),
            description: "Envoy Genly Ai on the planet Gethen".to_string(),
            published_date: NaiveDate::from_ymd_opt(1969, 3, 1).unwrap(),
            isbn: Some("978-0-441-47812-5".to_string()),
            page_count: Some(304),
            language: None,
        }
    }

    fn fields(err: CatalogError) -> Vec<&'static str> {
        match err {
            CatalogError::InvalidInput(errors) => errors.iter().map(|e| e.field).collect(),
            other => panic!("expected invalid input, got {other:?}"),
        }
    }

    #[test]
    fn valid_book_is_trimmed_and_defaulted() {
        let details = book_details(&input()).unwrap();
        assert_eq!(details.title, "The Left Hand of Darkness");
        assert_eq!(details.language, DEFAULT_LANGUAGE);
    }

    #[test]
    fn book_errors_are_collected() {
        let mut bad = input();
        bad.title = "   ".to_string();
        bad.genre = "g".repeat(GENRE_MAX + 1);
        bad.isbn = Some("12-34".to_string());
        bad.page_count = Some(0);

        assert_eq!(
            fields(book_details(&bad).unwrap_err()),
            vec!["title", "genre", "isbn", "pageCount"]
        );
    }

    #[test]
    fn isbn_formats() {
        assert!(is_valid_isbn("0306406152"));
        assert!(is_valid_isbn("978-3-16-148410-0"));
        assert!(!is_valid_isbn("978-3-16-148410"));
        assert!(!is_valid_isbn("ISBN 0306406152"));
        assert!(!is_valid_isbn(""));
    }

    #[test]
    fn rating_bounds() {
        for rating in [1, 5] {
            let content = review_content(&ReviewInput {
                rating,
                comment: "A thoughtful read".to_string(),
            })
            .unwrap();
            assert_eq!(i64::from(content.rating), rating);
        }
        for rating in [0, 6, -1, 300] {
            let err = review_content(&ReviewInput {
                rating,
                comment: "A thoughtful read".to_string(),
            })
            .unwrap_err();
            assert_eq!(fields(err), vec!["rating"]);
        }
    }

    #[test]
    fn comment_bounds_apply_after_trimming() {
        let err = review_content(&ReviewInput {
            rating: 3,
            comment: "   short    ".to_string(),
        })
        .unwrap_err();
        assert_eq!(fields(err), vec!["comment"]);

        let err = review_content(&ReviewInput {
            rating: 3,
            comment: "x".repeat(COMMENT_MAX + 1),
        })
        .unwrap_err();
        assert_eq!(fields(err), vec!["comment"]);
    }

    #[test]
    fn page_request_defaults_and_bounds() {
        assert_eq!(
            PageRequest::parse(None, None, 10, 50).unwrap(),
            PageRequest::new(1, 10)
        );
        assert!(PageRequest::parse(Some(0), None, 10, 50).is_err());
        assert!(PageRequest::parse(None, Some(51), 10, 50).is_err());
    }
}
