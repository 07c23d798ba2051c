use std::sync::Arc;

use sqlx::PgPool;

use crate::core::config::Settings;
use crate::services::randomness::RandomSource;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    db: PgPool,
    random: Arc<dyn RandomSource>,
}

impl AppState {
    pub(crate) fn new(settings: Settings, db: PgPool, random: Arc<dyn RandomSource>) -> Self {
        Self { inner: Arc::new(InnerState { settings, db, random }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn db(&self) -> &PgPool {
        &self.inner.db
    }

    /// Randomness used for question sampling and answer option order.
    pub(crate) fn random(&self) -> &dyn RandomSource {
        self.inner.random.as_ref()
    }
}
