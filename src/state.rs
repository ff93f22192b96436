use sqlx::PgPool;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::BookStore;
use crate::media::ImageHost;
use crate::services::{BookService, UserService};

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub pool: PgPool,
    pub users: UserService,
    pub books: BookService,
}

impl AppState {
    pub fn new(config: AppConfig, pool: PgPool, images: Arc<dyn ImageHost>) -> Self {
        let users = UserService::new(pool.clone(), config.security.clone());
        let books = BookService::new(BookStore::new(pool.clone()), images, &config);

        Self {
            config: Arc::new(config),
            pool,
            users,
            books,
        }
    }
}
