use serde_json::json;

use crate::store::{FieldDef, Resource, Schema};

/// A user's review of a tour; one per user and tour
pub struct Review;

impl Resource for Review {
    const NAME: &'static str = "Review";
    const SINGULAR: &'static str = "review";
    const PLURAL: &'static str = "reviews";
    const ID_PREFIX: &'static str = "review";

    fn schema() -> Schema {
        Schema::new(vec![
            FieldDef::text("review").required("Review must be filled in!"),
            FieldDef::number("rating")
                .default_value(json!(3.5))
                .min(1.0, "Ratings must be 1 or above")
                .max(5.0, "Ratings must be 5 or below"),
            FieldDef::reference("tour", "tour").required("Review must belong to a tour"),
            FieldDef::reference("user", "user").required("Review must belong to a user"),
        ])
        .unique_together(&["tour", "user"])
    }
}
