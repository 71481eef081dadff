pub mod config;
pub mod logging;

pub mod agent;
pub mod download;
mod http;
pub mod protocol;
pub mod proxy;
pub mod publish;
pub mod queue;
pub mod scrape;
pub mod worker;
