use std::sync::Arc;

use crate::{
    db::{DbPool, OrmConn},
    storage::SharedImageStorage,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub images: SharedImageStorage,
    pub jwt_secret: Arc<str>,
}
