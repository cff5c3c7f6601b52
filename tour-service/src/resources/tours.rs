use serde_json::{json, Value};

use crate::store::{Document, FieldDef, FieldType, Filter, Resource, Schema};

pub const TOUR_DIFFICULTIES: &[&str] = &["easy", "medium", "difficult"];

/// A bookable tour
pub struct Tour;

impl Resource for Tour {
    const NAME: &'static str = "Tour";
    const SINGULAR: &'static str = "tour";
    const PLURAL: &'static str = "tours";
    const ID_PREFIX: &'static str = "tour";

    fn schema() -> Schema {
        Schema::new(vec![
            FieldDef::text("name")
                .required("tour must have a name")
                .unique()
                .trim()
                .max_length(40, "Tour name must be 40 characters or less")
                .min_length(10, "Tour name must be 10 or more characters long"),
            FieldDef::text("slug"),
            FieldDef::number("duration").required("A tour must have a duration"),
            FieldDef::number("maxGroupSize").required("tour must have a group size"),
            FieldDef::text("difficulty")
                .required("tour must have a difficulty")
                .one_of(
                    TOUR_DIFFICULTIES,
                    "Tour difficulty must be set to: easy, medium or difficult",
                ),
            FieldDef::number("ratingsAverage")
                .default_value(json!(4.5))
                .min(1.0, "Ratings must be 1.0 or above")
                .max(5.0, "Ratings must be 5.0 or below")
                .round_to(1),
            FieldDef::number("ratingsQuantity").default_value(json!(0)),
            FieldDef::number("price").required("tour must have a price"),
            FieldDef::number("priceDiscount"),
            FieldDef::text("summary").trim(),
            FieldDef::text("description").trim(),
            FieldDef::text("imageCover").required("A tour must have a cover image"),
            FieldDef::array("images", FieldType::Text),
            FieldDef::array("startDates", FieldType::Date),
            FieldDef::boolean("secret").default_value(json!(false)),
            FieldDef::object("startLocation"),
            FieldDef::array("locations", FieldType::Object),
            FieldDef::array("guides", FieldType::Reference("user")),
        ])
        .rule(discount_below_price)
        .on_save(set_slug)
        .virtual_field("durationWeeks", duration_weeks)
        .read_scope(Filter::new().not_equals("secret", true))
    }
}

fn discount_below_price(document: &Document) -> Option<String> {
    let discount = document.get("priceDiscount")?.as_f64()?;
    let price = document.get("price")?.as_f64()?;
    (discount >= price).then(|| "Discounts values cannot exceed the regular Price value.".to_string())
}

fn set_slug(document: &mut Document) {
    if let Some(name) = document.get("name").and_then(Value::as_str) {
        let slug = slugify(name);
        document.insert("slug".to_string(), Value::String(slug));
    }
}

fn duration_weeks(document: &Document) -> Option<Value> {
    let days = document.get("duration")?.as_f64()?;
    Some(json!(days / 7.0))
}

/// Lowercase, with runs of other characters collapsed to `-`
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}
