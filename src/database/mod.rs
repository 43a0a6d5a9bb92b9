pub mod campaign_store;
pub mod memory;
pub mod pool;
pub mod postgres;

pub use campaign_store::{CampaignFilter, CampaignPatch, CampaignStore, WaveProgress};
pub use memory::MemoryCampaignStore;
pub use postgres::PgCampaignStore;
