pub mod api;
pub mod cli;
pub mod command;
pub mod conf;
pub mod connection;
pub mod ctx;
pub mod logging;
pub mod server;
pub mod static_files;
