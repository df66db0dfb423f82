// * Configuration Constants
// * Central location for all extraction thresholds, depth bounds and timeouts

// * Sentinel for a field that could not be classified (distinct from "")
pub const UNKNOWN: &str = "unknown";

// * Ancestor levels walked by the completeness-driven card locator (S3)
pub const MAX_ANCESTOR_DEPTH: usize = 12;

// * Ancestor levels walked by the label-presence card locator (S4)
pub const LABEL_SEARCH_DEPTH: usize = 15;

// * Distinct field markers a card needs to count as complete
pub const MIN_FIELD_MARKERS: usize = 2;

// * Text length that makes a marker-less card complete
pub const MIN_CARD_TEXT_LEN: usize = 60;

// * Minimum non-empty fragments for a structural (S2) candidate
pub const MIN_CARD_FRAGMENTS: usize = 3;

// * Page navigation timeout in milliseconds
pub const PAGE_TIMEOUT_MS: u64 = 60_000;

// * How long the renderer waits for the ready selector
pub const READY_TIMEOUT_MS: u64 = 10_000;

// * Poll interval while waiting for the ready selector
pub const READY_POLL_MS: u64 = 250;

// * Pause after readiness so late client-side renders can land
pub const SETTLE_DELAY_MS: u64 = 2_000;

// * Pause between consecutive listing pages
pub const DEFAULT_PAGE_DELAY_MS: u64 = 2_000;

// * Listing pages visited when the caller does not say otherwise
pub const DEFAULT_MAX_PAGES: usize = 2;

// * Cards kept by the diagnostic sampler
pub const DEFAULT_SAMPLE_CARDS: usize = 5;

// * Desktop window the renderer opens
pub const WINDOW_WIDTH: u32 = 1920;
pub const WINDOW_HEIGHT: u32 = 1080;

// * Desktop Chrome user agent sent by the renderer
pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
