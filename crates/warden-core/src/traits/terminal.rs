// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Terminal abstraction used by the keystore commands.

use zeroize::Zeroizing;

use crate::error::WardenError;

/// Operator-facing input and output.
///
/// Implementations decide where prompts go and how secrets are masked. Every
/// secret returned is wrapped in [`Zeroizing`] so callers cannot forget to wipe it.
pub trait Terminal {
    /// Print a line to standard output.
    fn println(&mut self, message: &str);

    /// Print a line to standard error.
    fn eprintln(&mut self, message: &str);

    /// Ask a yes/no question, returning `default` on empty input.
    ///
    /// Without an interactive terminal no input is read and `default` is
    /// returned, so piped data is never consumed as an answer.
    fn prompt_yes_no(&mut self, question: &str, default: bool) -> Result<bool, WardenError>;

    /// Read a secret with echo disabled.
    fn read_secret(&mut self, prompt: &str) -> Result<Zeroizing<String>, WardenError>;

    /// Read one line from piped standard input, without its line terminator.
    ///
    /// Returns `None` at end of input.
    fn read_line(&mut self) -> Result<Option<Zeroizing<String>>, WardenError>;

    /// Whether standard input is attached to an interactive terminal.
    fn is_interactive(&self) -> bool;
}
