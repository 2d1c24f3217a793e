//! Catalog domain records

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use bookshelf_authz::UserId;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Fresh time-ordered id
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(value.trim()).map(Self)
            }
        }
    };
}

record_id!(
    /// Book identity, assigned at creation
    BookId
);
record_id!(
    /// Review identity, assigned at creation
    ReviewId
);

pub const DEFAULT_LANGUAGE: &str = "English";

/// Descriptive fields of a book, editable by its creator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookDetails {
    pub title: String,
    pub author: String,
    pub genre: String,
    pub description: String,
    pub published_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    pub language: String,
}

/// Derived rating fields of a book.
///
/// Only the rating engine writes these; they always describe the review set
/// as of the most recent completed recomputation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    pub average_rating: f64,
    pub total_reviews: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: BookId,
    #[serde(flatten)]
    pub details: BookDetails,
    #[serde(flatten)]
    pub rating: RatingSummary,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    pub fn new(details: BookDetails, created_by: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: BookId::new(),
            details,
            rating: RatingSummary::default(),
            created_by,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub book_id: BookId,
    pub user_id: UserId,
    pub rating: u8,
    pub comment: String,
    pub helpful: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Review {
    pub fn new(
        book_id: BookId,
        user_id: UserId,
        content: ReviewContent,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ReviewId::new(),
            book_id,
            user_id,
            rating: content.rating,
            comment: content.comment,
            helpful: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Unvalidated book fields as submitted by a caller
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookInput {
    pub title: String,
    pub author: String,
    pub genre: String,
    pub description: String,
    pub published_date: NaiveDate,
    #[serde(default)]
    pub isbn: Option<String>,
    #[serde(default)]
    pub page_count: Option<u32>,
    #[serde(default)]
    pub language: Option<String>,
}

/// Unvalidated review fields as submitted by a caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewInput {
    pub rating: i64,
    pub comment: String,
}

/// Validated rating and comment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewContent {
    pub rating: u8,
    pub comment: String,
}

/// Result of a review create or update
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewOutcome {
    pub review: Review,
    pub book_rating: RatingSummary,
}

/// Result of a review deletion
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedReview {
    pub review_id: ReviewId,
    pub book_id: BookId,
    pub book_rating: RatingSummary,
}

/// Result of a cascading book deletion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeReport {
    pub book_id: BookId,
    pub reviews_removed: usize,
}

/// Result of re-running recomputation for one book
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileOutcome {
    pub book_id: BookId,
    pub before: RatingSummary,
    pub after: RatingSummary,
    pub changed: bool,
}

/// Result of a reconciliation sweep over every book
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub scanned: usize,
    pub corrected: usize,
    /// Books deleted while the sweep was running
    pub vanished: usize,
}
