pub mod apply;
pub mod build;
pub mod config;
pub mod engine;
pub mod init;
pub mod loader;
pub mod session;
