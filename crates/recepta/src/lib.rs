// SPDX-FileCopyrightText: 2026 Recepta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recepta: an always-on messaging bot core with durable conversations.
//!
//! This crate wires the Recepta subsystems into a runnable service. The
//! transport session library and the reply generator are injected by the
//! embedding application; see [`serve::run`].

pub mod serve;
