pub mod csv_parser;
pub mod in_memory_store;
pub mod slack_client;
pub mod svg_renderer;
