// SPDX-FileCopyrightText: 2026 Recepta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.
//!
//! The canonical types are defined in `recepta-core::types` for use across
//! trait boundaries. This module re-exports them for convenience within the
//! storage crate.

pub use recepta_core::types::{Conversation, ConversationDefaults, Message, NewMessage, Sender};
