use serde_json::json;

use crate::store::{FieldDef, Resource, Schema};

/// A user's paid place on a tour
pub struct Booking;

impl Resource for Booking {
    const NAME: &'static str = "Booking";
    const SINGULAR: &'static str = "booking";
    const PLURAL: &'static str = "bookings";
    const ID_PREFIX: &'static str = "booking";

    fn schema() -> Schema {
        Schema::new(vec![
            FieldDef::reference("tour", "tour").required("Booking must belong to a Tour!"),
            FieldDef::reference("user", "user").required("Booking must belong to a User!"),
            FieldDef::number("price").required("Booking must have a price."),
            FieldDef::boolean("paid").default_value(json!(true)),
        ])
    }
}
