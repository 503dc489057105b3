// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams between the keystore and the outside world.
//!
//! The keystore never touches stdin or the controlling terminal directly: it
//! goes through a [`Terminal`], and passphrases arrive through an ordered list
//! of [`PassphraseSource`]s.

pub mod passphrase;
pub mod terminal;

pub use passphrase::PassphraseSource;
pub use terminal::Terminal;
