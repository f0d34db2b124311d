//! Hydrobot core library: conversation engine, messaging bridge, and the status gateway
//! used by the CLI.

pub mod channels;
pub mod config;
pub mod connectivity;
pub mod conversation;
pub mod gateway;
pub mod init;
