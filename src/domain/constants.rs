// Defaults shared by the controller, the config loader and the exchange adapters.
// A ping slower than this is reported as degraded connectivity.
pub const LATENCY_WARN_THRESHOLD_MS: u64 = 1000;
pub const DEFAULT_DEPTH_LIMIT: u32 = 100;
pub const DEFAULT_UPDATE_INTERVAL_MS: u64 = 100;
pub const DEFAULT_RECV_WINDOW_MS: u64 = 5000;
// Binance refuses a recvWindow above one minute
pub const MAX_RECV_WINDOW_MS: u64 = 60_000;
pub const API_KEY_HEADER: &str = "X-MBX-APIKEY";
