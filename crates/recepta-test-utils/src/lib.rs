// SPDX-FileCopyrightText: 2026 Recepta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock collaborators for deterministic Recepta tests.
//!
//! Provides a scriptable transport, an in-memory conversation store, a
//! canned reply generator, and a status sink that captures snapshots.

pub mod memory_store;
pub mod mock_replier;
pub mod mock_transport;
pub mod status_capture;

pub use memory_store::MemoryStore;
pub use mock_replier::MockReplier;
pub use mock_transport::{MockSessionHandle, MockTransport};
pub use status_capture::CapturingStatusSink;
