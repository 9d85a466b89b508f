//! HTTP API handlers for mpatch-rec

pub mod audio_proxy;
pub mod health;
pub mod recommend;

pub use audio_proxy::audio_proxy_routes;
pub use health::health_routes;
pub use recommend::recommend_routes;
