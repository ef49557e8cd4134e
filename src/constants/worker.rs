use std::time::Duration;

/// Workers spawned per queue unless configured otherwise.
pub const DEFAULT_WORKER_COUNT: usize = 2;

/// Attempts made on a message before it is marked failed and dropped.
pub const WORKER_DEFAULT_MAXIMUM_RETRIES: u32 = 3;

/// Messages pulled per poll; also the broker's batch ceiling.
pub const RECEIVE_BATCH_SIZE: usize = 10;

/// Deadline on a single receive call, on top of the broker's long poll.
pub const RECEIVE_TIMEOUT: Duration = Duration::from_secs(30);

/// Deliveries after which a message whose job row cannot be found is
/// dropped instead of being released for redelivery.
pub const LOOKUP_REDELIVERY_LIMIT: u32 = 3;

/// Base delay between attempts; doubles each retry.
pub const RETRY_BACKOFF_BASE: Duration = Duration::from_secs(5);

/// Lease extension granted per attempt, scaled by the attempt number.
pub const LEASE_EXTENSION_STEP_SECS: u32 = 60;

/// How long shutdown waits for workers to drain before forcing exit.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);
