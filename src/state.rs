use std::collections::HashSet;
use std::sync::Arc;

use crate::catalog::CatalogManager;
use crate::store::DiskStore;

pub struct AppState {
    pub catalog: Arc<CatalogManager<DiskStore>>,
    pub admin_ids: HashSet<u64>,
}

impl AppState {
    pub fn is_admin(&self, user_id: u64) -> bool {
        self.admin_ids.contains(&user_id)
    }
}

pub type Context<'a> = poise::Context<'a, AppState, anyhow::Error>;
