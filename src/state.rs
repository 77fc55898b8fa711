use std::sync::Arc;

use sqlx::PgPool;

use super::{
    config::Config,
    database::init_pool,
    ideas::IdeaStore,
    rate_limit::FixedWindowLimiter,
};

/// Process-wide shared state, built once at startup and handed to every
/// handler through axum's state extractor. Nothing here is ambient.
pub struct State {
    pub config: Config,
    pub pool: PgPool,
    pub store: IdeaStore,
    pub limiter: FixedWindowLimiter,
}

impl State {
    pub fn new() -> Arc<Self> {
        let config = Config::load();
        let pool = init_pool(&config).expect("Database misconfigured!");
        let store = IdeaStore::new(pool.clone());
        let limiter = FixedWindowLimiter::with_defaults();

        Arc::new(Self {
            config,
            pool,
            store,
            limiter,
        })
    }
}
