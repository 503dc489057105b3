// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Passphrase source trait.

use crate::error::WardenError;
use crate::traits::terminal::Terminal;
use crate::types::{Passphrase, PassphrasePurpose};

/// One channel a keystore passphrase can arrive through.
///
/// Sources are tried in a fixed priority order. A source that cannot serve the
/// current process (no pipe, no terminal, variable unset) returns `Ok(None)`
/// and the next one is tried; a source that is available but fails returns an
/// error and stops the search.
pub trait PassphraseSource {
    /// Short name used in log output.
    fn name(&self) -> &'static str;

    /// Produce a passphrase, or `None` if this source is unavailable.
    fn acquire(
        &self,
        terminal: &mut dyn Terminal,
        purpose: PassphrasePurpose,
    ) -> Result<Option<Passphrase>, WardenError>;
}
