pub mod cache;
pub mod publisher;
pub mod relay;
pub mod storage;
