//! Plain data types shared by the engine, the CLI and the panel.

mod connection;
mod network;
mod toast;

pub use connection::{ActiveConnection, ConnectionKind, ConnectionRecord};
pub use network::{
    CacheState, DiagnosticCache, LookupResult, NetworkInfo, PingResult, PriorityInterface,
};
pub use toast::{Toast, ToastType};
