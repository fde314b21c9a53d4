//! Review list filtering and sorting.
//!
//! Pure functions over an already-fetched page of reviews; the backend owns
//! any server-side filtering, this only shapes what is rendered.

use crate::api::types::Review;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewSort {
    Date,
    Rating,
    Helpful,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone)]
pub struct ReviewFilters {
    /// Only reviews with exactly this rating.
    pub rating: Option<u8>,
    /// Only reviews with (or without) a seller response.
    pub has_response: Option<bool>,
    /// Case-insensitive match against title and content.
    pub search: Option<String>,
    pub sort_by: ReviewSort,
    pub sort_order: SortOrder,
}

impl Default for ReviewFilters {
    fn default() -> Self {
        Self {
            rating: None,
            has_response: None,
            search: None,
            sort_by: ReviewSort::Date,
            sort_order: SortOrder::Desc,
        }
    }
}

pub fn filter_reviews<'a>(reviews: &'a [Review], filters: &ReviewFilters) -> Vec<&'a Review> {
    let needle = filters.search.as_ref().map(|s| s.to_lowercase());

    let mut visible: Vec<&Review> = reviews
        .iter()
        .filter(|review| {
            if let Some(rating) = filters.rating {
                if review.rating != rating {
                    return false;
                }
            }

            if let Some(wants_response) = filters.has_response {
                if review.response.is_some() != wants_response {
                    return false;
                }
            }

            if let Some(needle) = &needle {
                let in_title = review
                    .title
                    .as_ref()
                    .map(|t| t.to_lowercase().contains(needle))
                    .unwrap_or(false);
                let in_content = review.content.to_lowercase().contains(needle);
                if !in_title && !in_content {
                    return false;
                }
            }

            true
        })
        .collect();

    visible.sort_by(|a, b| {
        let ordering = match filters.sort_by {
            ReviewSort::Date => a.created_at.cmp(&b.created_at),
            ReviewSort::Rating => a.rating.cmp(&b.rating),
            ReviewSort::Helpful => a.helpful_count.cmp(&b.helpful_count),
        };
        match filters.sort_order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });

    visible
}

/// Histogram over ratings 1-5; out-of-range ratings are ignored.
pub fn rating_counts(reviews: &[Review]) -> [u32; 5] {
    let mut counts = [0u32; 5];
    for review in reviews {
        if (1..=5).contains(&review.rating) {
            counts[review.rating as usize - 1] += 1;
        }
    }
    counts
}

/// Label shown under the filter bar, reflecting the active filters.
pub fn count_label(visible_count: usize, filters: &ReviewFilters) -> String {
    if visible_count == 0 {
        return "No reviews yet".to_string();
    }

    let mut label = format!("Showing {} reviews", visible_count);

    if let Some(rating) = filters.rating {
        label.push_str(&format!(" · {} stars", rating));
    }
    if let Some(has_response) = filters.has_response {
        label.push_str(if has_response {
            " · with response"
        } else {
            " · without response"
        });
    }
    if let Some(search) = &filters.search {
        label.push_str(&format!(" · matching \"{}\"", search));
    }

    label
}

/// Average rating, rounded to one decimal for the summary header.
pub fn average_rating(reviews: &[Review]) -> f32 {
    if reviews.is_empty() {
        return 0.0;
    }

    let sum: u32 = reviews.iter().map(|r| r.rating as u32).sum();
    let average = sum as f32 / reviews.len() as f32;
    (average * 10.0).round() / 10.0
}
