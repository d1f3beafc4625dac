pub mod app_config;
pub mod memory;
pub mod pms_client;
pub mod redis_repo;

pub use memory::InMemoryDraftStore;
pub use pms_client::HttpPmsClient;
pub use redis_repo::RedisDraftStore;
