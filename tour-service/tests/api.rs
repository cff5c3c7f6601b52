//! End-to-end tests driving the full router

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use tour_service::prelude::*;

const ADMIN_ID: &str = "user_admin";
const LEAD_ID: &str = "user_lead";
const MEMBER_ID: &str = "user_member";
const PRICES: [i64; 5] = [10, 30, 20, 50, 40];

struct TestApp {
    router: Router,
    state: AppState,
}

fn document(value: Value) -> Document {
    value.as_object().cloned().unwrap()
}

fn tour(index: usize, price: i64) -> Document {
    document(json!({
        "id": format!("tour_{index}"),
        "name": format!("The Seeded Tour {index}"),
        "duration": 7,
        "maxGroupSize": 10,
        "difficulty": "medium",
        "ratingsAverage": 4.0 + (index as f64) / 10.0,
        "price": price,
        "summary": "A seeded tour",
        "imageCover": "cover.jpg",
        "guides": [LEAD_ID],
    }))
}

fn seed() -> SeedData {
    SeedData {
        users: vec![
            document(json!({"id": ADMIN_ID, "name": "Admin", "email": "admin@example.com", "role": "admin"})),
            document(json!({"id": LEAD_ID, "name": "Lead Guide", "email": "lead@example.com", "role": "lead-guide"})),
            document(json!({"id": MEMBER_ID, "name": "Member", "email": "member@example.com", "photo": "member.jpg"})),
            document(json!({"id": "user_gone", "name": "Gone", "email": "gone@example.com", "active": false})),
        ],
        tours: PRICES
            .iter()
            .enumerate()
            .map(|(index, price)| tour(index, *price))
            .collect(),
        ..SeedData::default()
    }
}

async fn test_app(environment: Environment) -> TestApp {
    let mut config = Config::default();
    config.jwt.secret = "integration-test-secret".to_string();
    config.service.environment = environment;

    let state = AppState::builder()
        .config(config)
        .seed(seed())
        .build()
        .await
        .unwrap();

    TestApp {
        router: app(state.clone()),
        state,
    }
}

impl TestApp {
    fn token(&self, id: &str) -> String {
        let role = match id {
            ADMIN_ID => Role::Admin,
            LEAD_ID => Role::LeadGuide,
            _ => Role::User,
        };
        self.state.auth().sign(id, role).unwrap()
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        as_user: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(id) = as_user {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", self.token(id)));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None, None).await
    }
}

fn prices(body: &Value) -> Vec<i64> {
    body["data"]["tours"]
        .as_array()
        .unwrap()
        .iter()
        .map(|tour| tour["price"].as_i64().unwrap())
        .collect()
}

fn new_tour() -> Value {
    json!({
        "name": "The Northern Lights",
        "duration": 4,
        "maxGroupSize": 8,
        "difficulty": "difficult",
        "price": 1497,
        "imageCover": "lights.jpg",
        "startDates": ["2027-01-10", "2027-02-14,10:00"],
    })
}

#[tokio::test]
async fn test_sort_descending_with_limit() {
    let app = test_app(Environment::Development).await;
    let (status, body) = app.get("/api/v1/tours?sort=-price&limit=2&page=1").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["results"], 2);
    assert_eq!(prices(&body), vec![50, 40]);
}

#[tokio::test]
async fn test_pages_are_disjoint_and_exhaustive() {
    let app = test_app(Environment::Development).await;
    let mut ids = Vec::new();
    for page in 1..=3 {
        let (_, body) = app
            .get(&format!("/api/v1/tours?sort=price&limit=2&page={page}"))
            .await;
        let tours = body["data"]["tours"].as_array().unwrap();
        assert!(tours.len() <= 2);
        ids.extend(tours.iter().map(|t| t["id"].as_str().unwrap().to_string()));
    }

    let total = ids.len();
    ids.sort();
    ids.dedup();
    assert_eq!((ids.len(), total), (5, 5));
}

#[tokio::test]
async fn test_range_filters_hold_for_every_result() {
    let app = test_app(Environment::Development).await;
    let (_, body) = app.get("/api/v1/tours?price[gte]=20&price[lte]=40").await;

    let found = prices(&body);
    assert_eq!(found.len(), 3);
    assert!(found.iter().all(|price| (20..=40).contains(price)));
}

#[tokio::test]
async fn test_uncoercible_filter_is_bad_request() {
    let app = test_app(Environment::Production).await;
    let (status, body) = app.get("/api/v1/tours?price[lt]=abc").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"status": "fail", "message": "Invalid price: abc."}));
}

#[tokio::test]
async fn test_unknown_filters_and_malformed_paging_are_ignored() {
    let app = test_app(Environment::Development).await;
    let (status, body) = app
        .get("/api/v1/tours?password=x&price[ne]=10&page=-3&limit=abc")
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"], 5);
}

#[tokio::test]
async fn test_field_projection() {
    let app = test_app(Environment::Development).await;
    let (_, body) = app.get("/api/v1/tours?fields=name,price&limit=1").await;

    let tour = body["data"]["tours"][0].as_object().unwrap();
    let mut keys: Vec<&str> = tour.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(keys, vec!["id", "name", "price"]);
}

#[tokio::test]
async fn test_top_five_cheap_alias() {
    let app = test_app(Environment::Development).await;
    let (status, body) = app.get("/api/v1/tours/top-5-cheap?limit=100").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"], 5);
    let first = body["data"]["tours"][0].as_object().unwrap();
    assert!(first.contains_key("summary"));
    assert!(!first.contains_key("imageCover"));
    // highest rated first
    assert_eq!(first["name"], "The Seeded Tour 4");
}

#[tokio::test]
async fn test_get_one_expands_guides_and_reviews() {
    let app = test_app(Environment::Development).await;
    let (status, body) = app.get("/api/v1/tours/tour_0").await;

    assert_eq!(status, StatusCode::OK);
    let tour = &body["data"]["tour"];
    assert_eq!(tour["id"], "tour_0");
    assert_eq!(tour["guides"][0]["name"], "Lead Guide");
    assert_eq!(tour["reviews"], json!([]));
    assert_eq!(tour["durationWeeks"], 1.0);
    assert!(tour.get("createdAt").is_none());
}

#[tokio::test]
async fn test_missing_id_is_not_found_everywhere() {
    let app = test_app(Environment::Production).await;
    let expected = json!({"status": "fail", "message": "No document found with that ID"});

    assert_eq!(app.get("/api/v1/tours/tour_missing").await, (StatusCode::NOT_FOUND, expected.clone()));
    assert_eq!(
        app.send(Method::PATCH, "/api/v1/tours/tour_missing", Some(ADMIN_ID), Some(json!({"price": 1})))
            .await,
        (StatusCode::NOT_FOUND, expected.clone())
    );
    assert_eq!(
        app.send(Method::DELETE, "/api/v1/tours/tour_missing", Some(ADMIN_ID), None)
            .await,
        (StatusCode::NOT_FOUND, expected)
    );
}

#[tokio::test]
async fn test_create_then_get_round_trip() {
    let app = test_app(Environment::Development).await;
    let (status, body) = app
        .send(Method::POST, "/api/v1/tours", Some(LEAD_ID), Some(new_tour()))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let created = &body["data"]["tour"];
    let id = created["id"].as_str().unwrap();
    assert!(id.starts_with("tour_"));
    assert_eq!(created["slug"], "the-northern-lights");

    let (status, body) = app.get(&format!("/api/v1/tours/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    let fetched = &body["data"]["tour"];
    for field in ["name", "duration", "maxGroupSize", "difficulty", "price", "imageCover"] {
        assert_eq!(fetched[field], new_tour()[field], "field {field}");
    }
    assert_eq!(fetched["startDates"][0], "2027-01-10T00:00:00.000Z");
    assert_eq!(fetched["startDates"][1], "2027-02-14T10:00:00.000Z");
}

#[tokio::test]
async fn test_missing_required_field_keeps_count() {
    let app = test_app(Environment::Development).await;
    let mut tour = new_tour();
    tour.as_object_mut().unwrap().remove("price");

    let (status, body) = app
        .send(Method::POST, "/api/v1/tours", Some(ADMIN_ID), Some(tour))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "fail");
    assert_eq!(body["message"], "Invalid input data. tour must have a price");
    assert!(body.get("data").is_none());
    assert_eq!(body["error"]["kind"], "validation_failed");

    let (_, body) = app.get("/api/v1/tours").await;
    assert_eq!(body["results"], 5);
}

#[tokio::test]
async fn test_duplicate_name_is_rejected() {
    let app = test_app(Environment::Production).await;
    let mut tour = new_tour();
    tour["name"] = json!("The Seeded Tour 1");

    let (status, body) = app
        .send(Method::POST, "/api/v1/tours", Some(ADMIN_ID), Some(tour))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Duplicate field value 'The Seeded Tour 1'. Please use another value"
    );
}

#[tokio::test]
async fn test_update_validates_merged_document() {
    let app = test_app(Environment::Development).await;

    let (status, body) = app
        .send(Method::PATCH, "/api/v1/tours/tour_2", Some(ADMIN_ID), Some(json!({"price": 25})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["tour"]["price"], 25);

    let (status, body) = app
        .send(
            Method::PATCH,
            "/api/v1/tours/tour_2",
            Some(ADMIN_ID),
            Some(json!({"priceDiscount": 100})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Invalid input data. Discounts values cannot exceed the regular Price value."
    );
}

#[tokio::test]
async fn test_delete_then_get_is_not_found() {
    let app = test_app(Environment::Development).await;

    let (status, body) = app
        .send(Method::DELETE, "/api/v1/tours/tour_3", Some(ADMIN_ID), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, _) = app.get("/api/v1/tours/tour_3").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = test_app(Environment::Production).await;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/tours")
        .header(header::AUTHORIZATION, format!("Bearer {}", app.token(ADMIN_ID)))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"name\": "))
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_write_access_requires_staff() {
    let app = test_app(Environment::Production).await;

    let (status, body) = app
        .send(Method::POST, "/api/v1/tours", None, Some(new_tour()))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "You are not logged in! Please log in to get access.");

    let (status, body) = app
        .send(Method::POST, "/api/v1/tours", Some(MEMBER_ID), Some(new_tour()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "You do not have permission to perform this action");
}

#[tokio::test]
async fn test_rejected_tokens() {
    let app = test_app(Environment::Production).await;

    let forged = Request::builder()
        .uri("/api/v1/reviews")
        .header(header::AUTHORIZATION, "Bearer not.a.token")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(forged).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .send(Method::GET, "/api/v1/reviews", Some("user_gone"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "The user belonging to this token does no longer exist.");

    // public reads ignore bad credentials
    let (status, _) = app
        .send(Method::GET, "/api/v1/tours", Some("user_gone"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_cookie_authentication() {
    let app = test_app(Environment::Development).await;
    let request = Request::builder()
        .uri("/api/v1/users")
        .header(header::COOKIE, format!("jwt={}", app.token(ADMIN_ID)))
        .body(Body::empty())
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_users_are_admin_only_and_exclude_deactivated() {
    let app = test_app(Environment::Development).await;

    let (status, _) = app.send(Method::GET, "/api/v1/users", Some(LEAD_ID), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.send(Method::GET, "/api/v1/users", Some(ADMIN_ID), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"], 3);
    let users = body["data"]["users"].as_array().unwrap();
    assert!(users.iter().all(|user| user.get("active").is_none()));
    assert!(users.iter().all(|user| user["id"] != "user_gone"));

    let (status, _) = app
        .send(Method::GET, "/api/v1/users/user_gone", Some(ADMIN_ID), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send(
            Method::PATCH,
            "/api/v1/users/user_gone",
            Some(ADMIN_ID),
            Some(json!({"name": "Back again"})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_secret_tours_are_never_listed() {
    let app = test_app(Environment::Development).await;
    let mut tour = new_tour();
    tour["secret"] = json!(true);

    let (status, body) = app
        .send(Method::POST, "/api/v1/tours", Some(ADMIN_ID), Some(tour))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["data"]["tour"]["id"].as_str().unwrap().to_string();

    let (_, body) = app.get("/api/v1/tours?secret=true").await;
    assert_eq!(body["results"], 0);

    let (_, body) = app.get("/api/v1/tours").await;
    assert_eq!(body["results"], 5);

    let (status, _) = app.get(&format!("/api/v1/tours/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send(Method::GET, &format!("/api/v1/tours/{id}"), Some(ADMIN_ID), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_review_writes_update_tour_ratings() {
    let app = test_app(Environment::Development).await;
    let ratings = |body: &Value| {
        let tour = &body["data"]["tour"];
        (tour["ratingsQuantity"].clone(), tour["ratingsAverage"].clone())
    };

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/tours/tour_1/reviews",
            Some(MEMBER_ID),
            Some(json!({"review": "Too crowded", "rating": 2})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let review_id = body["data"]["review"]["id"].as_str().unwrap().to_string();

    let (_, body) = app.get("/api/v1/tours/tour_1").await;
    assert_eq!(ratings(&body), (json!(1), json!(2)));

    let (status, _) = app
        .send(
            Method::PATCH,
            &format!("/api/v1/reviews/{review_id}"),
            Some(MEMBER_ID),
            Some(json!({"rating": 4.5})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = app.get("/api/v1/tours/tour_1").await;
    assert_eq!(ratings(&body), (json!(1), json!(4.5)));

    let (status, _) = app
        .send(Method::DELETE, &format!("/api/v1/reviews/{review_id}"), Some(MEMBER_ID), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, body) = app.get("/api/v1/tours/tour_1").await;
    assert_eq!(ratings(&body), (json!(0), json!(4.5)));
}

#[tokio::test]
async fn test_nested_reviews_flow() {
    let app = test_app(Environment::Development).await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/tours/tour_1/reviews",
            Some(MEMBER_ID),
            Some(json!({"review": "Unforgettable", "rating": 5})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["review"]["tour"], "tour_1");
    assert_eq!(body["data"]["review"]["user"], MEMBER_ID);

    // one review per user and tour
    let (status, _) = app
        .send(
            Method::POST,
            "/api/v1/tours/tour_1/reviews",
            Some(MEMBER_ID),
            Some(json!({"review": "Again"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // only regular users write reviews
    let (status, _) = app
        .send(
            Method::POST,
            "/api/v1/tours/tour_2/reviews",
            Some(ADMIN_ID),
            Some(json!({"review": "Admin review"})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, body) = app
        .send(Method::GET, "/api/v1/tours/tour_1/reviews", Some(LEAD_ID), None)
        .await;
    assert_eq!(body["results"], 1);
    assert_eq!(body["data"]["reviews"][0]["user"], json!({"id": MEMBER_ID, "name": "Member", "photo": "member.jpg"}));

    let (_, body) = app
        .send(Method::GET, "/api/v1/tours/tour_2/reviews", Some(LEAD_ID), None)
        .await;
    assert_eq!(body["results"], 0);

    let (_, body) = app.get("/api/v1/tours/tour_1").await;
    let reviews = body["data"]["tour"]["reviews"].as_array().unwrap();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0]["user"]["name"], "Member");

    let (_, body) = app
        .send(Method::GET, "/api/v1/users/me/reviews", Some(MEMBER_ID), None)
        .await;
    assert_eq!(body["results"], 1);

    let (_, body) = app
        .send(Method::GET, "/api/v1/users/me/reviews", Some(LEAD_ID), None)
        .await;
    assert_eq!(body["results"], 0);
}

#[tokio::test]
async fn test_unknown_route() {
    let app = test_app(Environment::Production).await;
    let (status, body) = app.get("/api/v1/nowhere").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body,
        json!({"status": "fail", "message": "Can't find /api/v1/nowhere route on this server!"})
    );
}

#[tokio::test]
async fn test_development_errors_carry_detail() {
    let app = test_app(Environment::Development).await;
    let (_, body) = app.get("/api/v1/tours/tour_missing").await;

    assert_eq!(body["error"]["entityType"], "Tour");
    assert_eq!(body["error"]["entityId"], "tour_missing");
    assert_eq!(body["error"]["statusCode"], 404);
    assert!(body["stack"].as_str().unwrap().contains("No document found with that ID"));
}

#[tokio::test]
async fn test_health_and_readiness() {
    let app = test_app(Environment::Production).await;

    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = app.get("/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], true);
    assert_eq!(body["dependencies"]["tours"]["message"], "5 documents");
}
