/// Per-assignment detail endpoint of the upstream recruitment service.
pub const ASSIGNMENT_ITEM_URL: &str =
    "https://recruit.visma.com/External/Feeds/AssignmentItem.ashx";

/// Marker string the upstream service embeds in the response body when the
/// configured group guid is unknown. Its presence is a terminal batch error.
pub const GROUP_NOT_FOUND_MARKER: &str = "Kunde inte hitta gruppen";

/// Connect/read timeout for feed and detail fetches.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Upper bound on concurrent per-record detail fetches.
pub const DEFAULT_CONCURRENCY: usize = 8;
