pub const PROGRESS_BAR_LEN: u64 = 100;
pub const KEY_POLL_INTERVAL_MS: u64 = 200;
/// Jobs reachable with the `1`..`9` selection keys.
pub const MAX_SELECT_KEYS: usize = 9;
