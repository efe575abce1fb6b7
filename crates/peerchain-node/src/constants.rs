pub(crate) const DEFAULT_LISTEN: &str = "127.0.0.1:8000";
pub(crate) const HTTP_CONNECT_TIMEOUT_SECS: u64 = 2;
pub(crate) const BROADCAST_TIMEOUT_SECS: u64 = 5;
