//! Resource definitions
//!
//! Each resource is a unit type implementing [`Resource`](crate::store::Resource):
//! its envelope keys, id prefix and [`Schema`](crate::store::Schema).
//! Reviews are stored through [`RatedReviews`], which keeps each tour's
//! rating totals in step with its reviews.

mod bookings;
mod ratings;
mod reviews;
mod tours;
mod users;

pub use bookings::Booking;
pub use ratings::{RatedReviews, DEFAULT_RATINGS_AVERAGE};
pub use reviews::Review;
pub use tours::{slugify, Tour, TOUR_DIFFICULTIES};
pub use users::{User, USER_ROLES};
