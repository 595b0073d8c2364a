//! Domain-level constants.
//!
//! These constants define business rules and validation requirements.

// =============================================================================
// Identity
// =============================================================================

/// Number of numeric suffixes tried (`name1` ..= `name10`) before a display
/// name is considered exhausted.
pub const MAX_NAME_SUFFIX_ATTEMPTS: u32 = 10;

/// Maximum display name length accepted from callers
pub const MAX_NAME_LENGTH: usize = 255;

// =============================================================================
// Donation Requests
// =============================================================================

/// Request is waiting for a matching donation
pub const STATUS_PENDING: &str = "pending";

/// Request was matched and its donation claimed for the requester
pub const STATUS_FULFILLED: &str = "fulfilled";

/// Request was withdrawn before it could be matched
pub const STATUS_CANCELLED: &str = "cancelled";

// =============================================================================
// Projections
// =============================================================================

/// Recipient label shown for donations nobody has claimed yet
pub const UNCLAIMED_LABEL: &str = "UNCLAIMED";
