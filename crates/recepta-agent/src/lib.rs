// SPDX-FileCopyrightText: 2026 Recepta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recepta agent runtime: connection lifecycle, outbound delivery, and
//! inbound ingestion.
//!
//! The [`connection::ConnectionManager`] owns the single live transport
//! session and its bounded reconnect policy. The [`queue::OutboundQueue`]
//! retries deliveries against that connection. The
//! [`ingest::InboundIngester`] turns inbound events into persisted
//! conversations, messages, and queued replies.

pub mod connection;
pub mod ingest;
pub mod queue;
pub mod shutdown;

pub use connection::{ConnectionManager, ReconnectPolicy};
pub use ingest::InboundIngester;
pub use queue::{DeliveryPolicy, OutboundQueue};
