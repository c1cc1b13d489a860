//! Shared constants for end-to-end tests
//!
//! This module contains all constants used across the test suite.
//! When test data changes (user credentials, seeded content, etc.),
//! update only this file.

// ============================================================================
// Test User Credentials
// ============================================================================

/// Regular test user, owner of the seeded album, two songs and both playlists
pub const TEST_USER: &str = "ana";
pub const TEST_EMAIL: &str = "ana@example.com";
pub const TEST_PASS: &str = "anapass123";

/// Second regular user, owner of one seeded song
pub const OTHER_USER: &str = "bruno";
pub const OTHER_EMAIL: &str = "bruno@example.com";
pub const OTHER_PASS: &str = "brunopass123";

/// Admin test user
pub const ADMIN_USER: &str = "admin";
pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASS: &str = "adminpass123";

// ============================================================================
// Seeded Content
// ============================================================================

pub const ALBUM_TITLE: &str = "First Light";

/// In the album, genre "rock"
pub const ROCK_SONG_TITLE: &str = "Rock Anthem";

/// Genre "jazz"
pub const JAZZ_SONG_TITLE: &str = "Jazz Nights";

/// Owned by the second user, genre "pop"
pub const BALLAD_SONG_TITLE: &str = "Midnight Ballad";

/// Public, holds the rock and jazz songs in that order
pub const PUBLIC_PLAYLIST_TITLE: &str = "Road Trip";

/// Private, holds the ballad
pub const PRIVATE_PLAYLIST_TITLE: &str = "Late Night Drafts";

// ============================================================================
// Test Timeouts and Configuration
// ============================================================================

/// Maximum time to wait for server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Timeout for individual HTTP requests (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Polling interval when waiting for server ready (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;

/// Secret the test server signs tokens with
pub const TEST_JWT_SECRET: &[u8] = b"e2e-test-secret";
