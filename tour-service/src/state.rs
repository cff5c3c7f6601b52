//! Application state management

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::{
    config::Config,
    error::Result,
    middleware::JwtAuth,
    resources::{Booking, RatedReviews, Tour, User},
    store::{Document, MemoryCollection},
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    auth: JwtAuth,
    tours: Arc<MemoryCollection<Tour>>,
    reviews: Arc<RatedReviews>,
    users: Arc<MemoryCollection<User>>,
    bookings: Arc<MemoryCollection<Booking>>,
}

impl AppState {
    /// Create state with empty collections
    ///
    /// Fails when the JWT secret is not configured.
    pub fn new(config: Config) -> Result<Self> {
        let users = Arc::new(MemoryCollection::<User>::new());
        let auth = JwtAuth::new(&config.jwt)?.with_principals(users.clone());
        let tours = Arc::new(MemoryCollection::<Tour>::new());

        Ok(Self {
            config: Arc::new(config),
            auth,
            reviews: Arc::new(RatedReviews::new(tours.clone())),
            tours,
            users,
            bookings: Arc::new(MemoryCollection::new()),
        })
    }

    /// Create a new state builder
    pub fn builder() -> AppStateBuilder {
        AppStateBuilder::new()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn auth(&self) -> &JwtAuth {
        &self.auth
    }

    pub fn tours(&self) -> &Arc<MemoryCollection<Tour>> {
        &self.tours
    }

    pub fn reviews(&self) -> &Arc<RatedReviews> {
        &self.reviews
    }

    pub fn users(&self) -> &Arc<MemoryCollection<User>> {
        &self.users
    }

    pub fn bookings(&self) -> &Arc<MemoryCollection<Booking>> {
        &self.bookings
    }

    /// Import seed documents, referenced resources first
    pub async fn import(&self, seed: SeedData) -> Result<SeedSummary> {
        let summary = SeedSummary {
            users: self.users.import(seed.users).await?,
            tours: self.tours.import(seed.tours).await?,
            reviews: self.reviews.import(seed.reviews).await?,
            bookings: self.bookings.import(seed.bookings).await?,
        };

        tracing::info!(
            users = summary.users,
            tours = summary.tours,
            reviews = summary.reviews,
            bookings = summary.bookings,
            "Seed data imported"
        );
        Ok(summary)
    }
}

/// Documents to load at startup, keyed by collection
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub tours: Vec<Document>,
    #[serde(default)]
    pub users: Vec<Document>,
    #[serde(default)]
    pub reviews: Vec<Document>,
    #[serde(default)]
    pub bookings: Vec<Document>,
}

impl SeedData {
    /// Read a JSON seed file
    pub async fn from_file(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Number of documents imported per collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub users: usize,
    pub tours: usize,
    pub reviews: usize,
    pub bookings: usize,
}

/// Builder for AppState
#[derive(Default)]
pub struct AppStateBuilder {
    config: Option<Config>,
    seed: Option<SeedData>,
}

impl AppStateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Import these documents instead of the configured seed file
    pub fn seed(mut self, seed: SeedData) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Build the state and import seed data
    pub async fn build(self) -> Result<AppState> {
        let config = self.config.unwrap_or_default();

        let seed = match (self.seed, &config.data.seed_path) {
            (Some(seed), _) => Some(seed),
            (None, Some(path)) => {
                tracing::info!("Loading seed data from: {}", path.display());
                Some(SeedData::from_file(path).await?)
            }
            (None, None) => None,
        };

        let state = AppState::new(config)?;
        if let Some(seed) = seed {
            state.import(seed).await?;
        }
        Ok(state)
    }
}
