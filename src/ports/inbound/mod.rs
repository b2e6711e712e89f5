/// Inbound ports (Driving ports) - Use case interfaces
///
/// These ports define the interfaces that external adapters (e.g., CLI,
/// background tasks) use to interact with the application core.
pub mod feed_sync_port;

pub use feed_sync_port::FeedSyncPort;
