//! Structured logging field name constants for refnote.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation tools can query by the same names across subsystems.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (startup, shutdown), operation completions |
//! | DEBUG | Decision points, intermediate values, config choices |

/// Correlation ID propagated across a request. Format: UUIDv7 (time-ordered).
pub const REQUEST_ID: &str = "request_id";

/// Subsystem originating the log event. Values: "api", "db", "storage".
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem. Examples: "notes", "files", "pool".
pub const COMPONENT: &str = "component";

/// Logical operation name. Examples: "fetch", "add_note", "upload".
pub const OPERATION: &str = "op";

/// Reference ID of the notes thread being operated on.
pub const REF_ID: &str = "ref_id";

/// File number within a note's attachment list.
pub const FILE_NO: &str = "file_no";

/// Denormalized note count after a write.
pub const NOTE_COUNT: &str = "note_count";

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
