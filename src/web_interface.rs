// Web Interface module root
pub mod types;
pub mod web_server;

pub use web_server::WebServer;
