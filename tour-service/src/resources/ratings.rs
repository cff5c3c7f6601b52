//! Review storage that keeps tour ratings current
//!
//! Every review write recomputes `ratingsQuantity` and `ratingsAverage` on
//! the reviewed tour from its remaining reviews. A tour without reviews goes
//! back to 0 and 4.5.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::{json, Value};

use super::{Review, Tour};
use crate::store::{
    Collection, Document, Filter, FindQuery, MemoryCollection, Schema, StoreResult, UpdateOptions,
};

/// Average given to a tour that has no reviews
pub const DEFAULT_RATINGS_AVERAGE: f64 = 4.5;

/// Reviews stored in memory, with rating totals written through to tours
pub struct RatedReviews {
    reviews: MemoryCollection<Review>,
    tours: Arc<MemoryCollection<Tour>>,
}

impl RatedReviews {
    pub fn new(tours: Arc<MemoryCollection<Tour>>) -> Self {
        Self {
            reviews: MemoryCollection::new(),
            tours,
        }
    }

    /// Import seed reviews, then recompute the ratings of every tour they touch
    pub async fn import(&self, documents: Vec<Document>) -> StoreResult<usize> {
        let touched: BTreeSet<String> = documents
            .iter()
            .filter_map(|review| tour_of(review).map(str::to_string))
            .collect();

        let inserted = self.reviews.import(documents).await?;
        for tour_id in &touched {
            self.refresh(tour_id).await;
        }
        Ok(inserted)
    }

    /// Recompute one tour's ratings; a failure is logged, not returned
    async fn refresh(&self, tour_id: &str) {
        if let Err(err) = self.write_ratings(tour_id).await {
            tracing::warn!(tour_id, error = %err, "Failed to update tour ratings");
        }
    }

    async fn write_ratings(&self, tour_id: &str) -> StoreResult<()> {
        let query = FindQuery::new(Filter::new().equals("tour", tour_id));
        let ratings: Vec<f64> = self
            .reviews
            .find(&query)
            .await?
            .iter()
            .filter_map(|review| review.get("rating").and_then(Value::as_f64))
            .collect();
        let (quantity, average) = summarize(&ratings);

        let mut fields = Document::new();
        fields.insert("ratingsQuantity".to_string(), json!(quantity));
        fields.insert("ratingsAverage".to_string(), json!(average));
        let options = UpdateOptions {
            return_updated: false,
            run_validators: false,
        };

        if self
            .tours
            .find_by_id_and_update(tour_id, fields, options)
            .await?
            .is_none()
        {
            tracing::debug!(tour_id, "Reviewed tour not found, ratings not written");
        }
        Ok(())
    }
}

/// Review count and mean rating
fn summarize(ratings: &[f64]) -> (usize, f64) {
    if ratings.is_empty() {
        return (0, DEFAULT_RATINGS_AVERAGE);
    }
    let total: f64 = ratings.iter().sum();
    (ratings.len(), total / ratings.len() as f64)
}

fn tour_of(review: &Document) -> Option<&str> {
    review.get("tour").and_then(Value::as_str)
}

impl Collection<Review> for RatedReviews {
    fn schema(&self) -> &Schema {
        self.reviews.schema()
    }

    async fn find(&self, query: &FindQuery) -> StoreResult<Vec<Document>> {
        self.reviews.find(query).await
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Document>> {
        self.reviews.find_by_id(id).await
    }

    async fn count_documents(&self, filter: &Filter) -> StoreResult<u64> {
        self.reviews.count_documents(filter).await
    }

    async fn create(&self, fields: Document) -> StoreResult<Document> {
        let review = self.reviews.create(fields).await?;
        if let Some(tour_id) = tour_of(&review) {
            self.refresh(tour_id).await;
        }
        Ok(review)
    }

    async fn find_by_id_and_update(
        &self,
        id: &str,
        fields: Document,
        options: UpdateOptions,
    ) -> StoreResult<Option<Document>> {
        let before = self.reviews.find_by_id(id).await?;
        let Some(result) = self.reviews.find_by_id_and_update(id, fields, options).await? else {
            return Ok(None);
        };
        let after = self.reviews.find_by_id(id).await?;

        // a review moved to another tour changes both tours
        let touched: BTreeSet<&str> = [before.as_ref(), after.as_ref()]
            .into_iter()
            .flatten()
            .filter_map(tour_of)
            .collect();
        for tour_id in touched {
            self.refresh(tour_id).await;
        }
        Ok(Some(result))
    }

    async fn find_by_id_and_delete(&self, id: &str) -> StoreResult<bool> {
        let before = self.reviews.find_by_id(id).await?;
        let deleted = self.reviews.find_by_id_and_delete(id).await?;

        if deleted {
            if let Some(tour_id) = before.as_ref().and_then(tour_of) {
                self.refresh(tour_id).await;
            }
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    async fn setup() -> (Arc<MemoryCollection<Tour>>, RatedReviews) {
        let tours = Arc::new(MemoryCollection::<Tour>::new());
        tours
            .import(vec![body(json!({
                "id": "tour_hiker",
                "name": "The Forest Hiker",
                "duration": 5,
                "maxGroupSize": 25,
                "difficulty": "easy",
                "price": 397,
                "imageCover": "tour-1-cover.jpg",
            }))])
            .await
            .unwrap();
        let reviews = RatedReviews::new(tours.clone());
        (tours, reviews)
    }

    async fn ratings(tours: &MemoryCollection<Tour>) -> (Value, Value) {
        let tour = tours.find_by_id("tour_hiker").await.unwrap().unwrap();
        (tour["ratingsQuantity"].clone(), tour["ratingsAverage"].clone())
    }

    fn review(user: &str, rating: f64) -> Document {
        body(json!({"review": "Fine", "tour": "tour_hiker", "user": user, "rating": rating}))
    }

    #[test]
    fn test_summarize() {
        assert_eq!(summarize(&[]), (0, DEFAULT_RATINGS_AVERAGE));
        assert_eq!(summarize(&[4.0, 5.0]), (2, 4.5));
    }

    #[tokio::test]
    async fn test_create_updates_tour_ratings() {
        let (tours, reviews) = setup().await;
        assert_eq!(ratings(&tours).await, (json!(0), json!(4.5)));

        reviews.create(review("user_a", 4.0)).await.unwrap();
        reviews.create(review("user_b", 5.0)).await.unwrap();
        reviews.create(review("user_c", 5.0)).await.unwrap();

        // 14 / 3 rounded to one decimal
        assert_eq!(ratings(&tours).await, (json!(3), json!(4.7)));
    }

    #[tokio::test]
    async fn test_update_and_delete_recompute_ratings() {
        let (tours, reviews) = setup().await;
        let first = reviews.create(review("user_a", 2.0)).await.unwrap();
        let id = first["id"].as_str().unwrap();
        assert_eq!(ratings(&tours).await, (json!(1), json!(2)));

        reviews
            .find_by_id_and_update(id, body(json!({"rating": 4})), UpdateOptions::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ratings(&tours).await, (json!(1), json!(4)));

        assert!(reviews.find_by_id_and_delete(id).await.unwrap());
        assert_eq!(ratings(&tours).await, (json!(0), json!(4.5)));
    }

    #[tokio::test]
    async fn test_failed_write_leaves_ratings_alone() {
        let (tours, reviews) = setup().await;
        let error = reviews
            .create(body(json!({"review": "No rating range", "tour": "tour_hiker", "user": "user_a", "rating": 9})))
            .await;

        assert!(error.is_err());
        assert_eq!(ratings(&tours).await, (json!(0), json!(4.5)));
    }

    #[tokio::test]
    async fn test_import_recomputes_touched_tours() {
        let (tours, reviews) = setup().await;
        let inserted = reviews
            .import(vec![review("user_a", 3.0), review("user_b", 4.0)])
            .await
            .unwrap();

        assert_eq!(inserted, 2);
        assert_eq!(ratings(&tours).await, (json!(2), json!(3.5)));
    }
}
