// SPDX-FileCopyrightText: 2026 Recepta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams between the messaging core and its external collaborators.
//!
//! All traits use `#[async_trait]` for dynamic dispatch compatibility, so
//! production adapters and test doubles are interchangeable.

pub mod replier;
pub mod repository;
pub mod status;
pub mod transport;

pub use replier::ReplyGenerator;
pub use repository::ConversationStore;
pub use status::{LogStatusSink, StatusSink};
pub use transport::{Transport, TransportEvent, TransportSession};
