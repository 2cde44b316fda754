//! Test utilities for QuadLite integration tests
//!
//! `TestFixture` wraps a quad store (in memory or on a Sled temp dir) and
//! runs compiled join trees against it.

pub mod test_fixture;
