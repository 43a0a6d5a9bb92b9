pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

use crate::config::DripConfig;
use crate::database::CampaignStore;
use crate::services::{
    batch_sender::BatchSender, drip_scheduler::DripScheduler, email_dispatcher::EmailDispatcher,
    recruiter_directory::RecruiterDirectory,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CampaignStore>,
    pub scheduler: Arc<DripScheduler>,
    pub drip_api_secret: String,
}

impl AppState {
    pub fn new(
        drip: &DripConfig,
        store: Arc<dyn CampaignStore>,
        directory: Arc<dyn RecruiterDirectory>,
        dispatcher: Arc<dyn EmailDispatcher>,
        drip_api_secret: String,
    ) -> Self {
        let sender = BatchSender::new(drip, directory, dispatcher);
        let scheduler = Arc::new(DripScheduler::new(drip, store.clone(), sender));
        Self {
            store,
            scheduler,
            drip_api_secret,
        }
    }
}
