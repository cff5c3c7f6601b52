use serde_json::json;

use crate::store::{FieldDef, Filter, Resource, Schema};

pub const USER_ROLES: &[&str] = &["user", "guide", "lead-guide", "admin"];

/// An account; `role` drives access checks and `active` gates login
pub struct User;

impl Resource for User {
    const NAME: &'static str = "User";
    const SINGULAR: &'static str = "user";
    const PLURAL: &'static str = "users";
    const ID_PREFIX: &'static str = "user";

    fn schema() -> Schema {
        Schema::new(vec![
            FieldDef::text("name").required("Please provide a name"),
            FieldDef::text("email")
                .required("please provide an email address")
                .unique()
                .trim()
                .lowercase()
                .email("Please provide a valid email"),
            FieldDef::text("photo").default_value(json!("default.jpg")),
            FieldDef::text("role")
                .default_value(json!("user"))
                .one_of(USER_ROLES, "Role must be one of: user, guide, lead-guide, admin"),
            FieldDef::boolean("active")
                .default_value(json!(true))
                .hidden()
                .filterable(false),
        ])
        .read_scope(Filter::new().not_equals("active", false))
    }
}
