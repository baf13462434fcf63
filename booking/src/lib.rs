pub mod cache;
pub mod countdown;
pub mod desk;
pub mod payment;
pub mod renewal;
pub mod watcher;
