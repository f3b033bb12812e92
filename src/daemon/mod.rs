mod server;

pub use server::DaemonServer;
