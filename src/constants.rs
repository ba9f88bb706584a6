/// Poll cadence applied when a rule is created without one
pub const DEFAULT_POLL_INTERVAL_SECONDS: i32 = 600;

/// Upper bound on outbox markers dispatched per sweep
pub const OUTBOX_SWEEP_BATCH: i64 = 200;

/// Per-user realtime broadcast buffer; slow subscribers lag past this
pub const STREAM_CHANNEL_CAPACITY: usize = 64;
