use serde::Deserialize;

use crate::catalog::ReviewInput;

/// `POST /api/reviews` body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    pub book_id: String,
    pub rating: i64,
    pub comment: String,
}

impl CreateReviewRequest {
    pub fn into_parts(self) -> (String, ReviewInput) {
        (
            self.book_id,
            ReviewInput {
                rating: self.rating,
                comment: self.comment,
            },
        )
    }
}
