use std::time::Duration;

/// Ideas generated per job when the request does not say otherwise.
pub const DEFAULT_IDEA_COUNT: u8 = 5;

/// Idea summaries are trimmed to this many characters at a word boundary.
pub const IDEA_SUMMARY_MAX_LEN: usize = 200;

/// Upper bound on a single agent call; article drafting is slow.
pub const AGENT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);
