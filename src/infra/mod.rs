pub mod chart_writer;
pub mod http_client;
