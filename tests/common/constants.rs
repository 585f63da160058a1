//! Shared constants for end-to-end tests
//!
//! This module contains all constants used across the test suite.
//! When test data changes (user credentials, library IDs, etc.),
//! update only this file.

// ============================================================================
// Test User Credentials
// ============================================================================

/// Regular test user email
pub const TEST_USER: &str = "listener@example.com";

/// Regular test user password
pub const TEST_PASS: &str = "testpass123";

/// Admin test user email
pub const ADMIN_USER: &str = "curator@example.com";

/// Admin test user password
pub const ADMIN_PASS: &str = "adminpass123";

// ============================================================================
// Test Library IDs
// ============================================================================

/// Artist ID for "Nova"
pub const ARTIST_NOVA_ID: &str = "artist-nova";

/// Artist ID for "The Midnight Collective"
pub const ARTIST_MIDNIGHT_ID: &str = "artist-midnight";

/// Genre ID for "House"
pub const GENRE_HOUSE_ID: &str = "genre-house";

/// Genre ID for "Downtempo"
pub const GENRE_DOWNTEMPO_ID: &str = "genre-downtempo";

/// Album ID for "Night Drive" by Nova
pub const ALBUM_NIGHT_DRIVE_ID: &str = "album-night-drive";

/// Song ID for "Horizon" on Night Drive (128 bpm)
pub const SONG_HORIZON_ID: &str = "song-horizon";

/// Song ID for "Echo" on Night Drive (95 bpm)
pub const SONG_ECHO_ID: &str = "song-echo";

/// Song ID for "Adrift", a single by The Midnight Collective (75 bpm)
pub const SONG_ADRIFT_ID: &str = "song-adrift";

// ============================================================================
// Timeouts
// ============================================================================

/// How long to wait for the test server to become ready
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Poll interval while waiting for the server
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 20;

/// Per-request timeout for the test client
pub const REQUEST_TIMEOUT_SECS: u64 = 5;
