// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`Terminal`] implementations: the process console and a scripted stand-in.

use std::io::{BufRead, IsTerminal, Write};

use warden_core::{Terminal, WardenError};
use zeroize::Zeroizing;

/// The real console: stdout, stderr, and stdin of the current process.
///
/// Secret input is read through `rpassword` with echo disabled.
#[derive(Debug, Default)]
pub struct ConsoleTerminal;

impl ConsoleTerminal {
    pub fn new() -> Self {
        Self
    }
}

fn read_error(e: std::io::Error) -> WardenError {
    WardenError::Io {
        context: "failed to read from standard input".to_string(),
        source: e,
    }
}

/// Remove one trailing `\n` or `\r\n`.
pub(crate) fn strip_line_terminator(line: &mut String) {
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
}

impl Terminal for ConsoleTerminal {
    fn println(&mut self, message: &str) {
        println!("{message}");
    }

    fn eprintln(&mut self, message: &str) {
        eprintln!("{message}");
    }

    fn prompt_yes_no(&mut self, question: &str, default: bool) -> Result<bool, WardenError> {
        // Piped stdin carries data, never answers.
        if !self.is_interactive() {
            return Ok(default);
        }
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        loop {
            eprint!("{question} {hint} ");
            let _ = std::io::stderr().flush();
            let Some(answer) = self.read_line()? else {
                return Ok(default);
            };
            match answer.trim().to_ascii_lowercase().as_str() {
                "" => return Ok(default),
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => eprintln!("Please answer 'y' or 'n'."),
            }
        }
    }

    fn read_secret(&mut self, prompt: &str) -> Result<Zeroizing<String>, WardenError> {
        rpassword::prompt_password(prompt)
            .map(Zeroizing::new)
            .map_err(read_error)
    }

    fn read_line(&mut self) -> Result<Option<Zeroizing<String>>, WardenError> {
        let mut line = Zeroizing::new(String::new());
        let read = std::io::stdin()
            .lock()
            .read_line(&mut line)
            .map_err(read_error)?;
        if read == 0 {
            return Ok(None);
        }
        strip_line_terminator(&mut line);
        Ok(Some(line))
    }

    fn is_interactive(&self) -> bool {
        std::io::stdin().is_terminal()
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use scripted::ScriptedTerminal;

#[cfg(any(test, feature = "test-utils"))]
mod scripted {
    use std::collections::VecDeque;

    use super::*;

    /// In-memory terminal with pre-loaded input, recording all output.
    #[derive(Debug, Default)]
    pub struct ScriptedTerminal {
        interactive: bool,
        stdin: VecDeque<String>,
        secrets: VecDeque<String>,
        answers: VecDeque<bool>,
        /// Lines written to standard output.
        pub stdout: Vec<String>,
        /// Lines written to standard error.
        pub stderr: Vec<String>,
        /// Prompts shown for secret input and yes/no questions.
        pub prompts: Vec<String>,
    }

    impl ScriptedTerminal {
        /// A terminal attached to a TTY; answers come from `with_secrets`/`with_answers`.
        ///
        /// Scripted answers are ignored on non-interactive terminals, which
        /// always take the prompt's default.
        pub fn interactive() -> Self {
            Self {
                interactive: true,
                ..Self::default()
            }
        }

        /// A non-interactive process whose stdin yields `lines`.
        pub fn piped<I, S>(lines: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            Self {
                interactive: false,
                stdin: lines.into_iter().map(Into::into).collect(),
                ..Self::default()
            }
        }

        /// No terminal and nothing on stdin, as under a service manager.
        pub fn detached() -> Self {
            Self::default()
        }

        pub fn with_secrets<I, S>(mut self, secrets: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            self.secrets.extend(secrets.into_iter().map(Into::into));
            self
        }

        pub fn with_answers(mut self, answers: impl IntoIterator<Item = bool>) -> Self {
            self.answers.extend(answers);
            self
        }

        /// Standard output joined with newlines.
        pub fn output(&self) -> String {
            self.stdout.join("\n")
        }

        /// Standard error joined with newlines.
        pub fn errors(&self) -> String {
            self.stderr.join("\n")
        }

        /// Unconsumed stdin lines.
        pub fn remaining_stdin(&self) -> usize {
            self.stdin.len()
        }
    }

    impl Terminal for ScriptedTerminal {
        fn println(&mut self, message: &str) {
            self.stdout.push(message.to_string());
        }

        fn eprintln(&mut self, message: &str) {
            self.stderr.push(message.to_string());
        }

        fn prompt_yes_no(&mut self, question: &str, default: bool) -> Result<bool, WardenError> {
            self.prompts.push(question.to_string());
            if !self.interactive {
                return Ok(default);
            }
            Ok(self.answers.pop_front().unwrap_or(default))
        }

        fn read_secret(&mut self, prompt: &str) -> Result<Zeroizing<String>, WardenError> {
            self.prompts.push(prompt.to_string());
            self.secrets.pop_front().map(Zeroizing::new).ok_or_else(|| {
                read_error(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "no scripted secret left",
                ))
            })
        }

        fn read_line(&mut self) -> Result<Option<Zeroizing<String>>, WardenError> {
            Ok(self.stdin.pop_front().map(Zeroizing::new))
        }

        fn is_interactive(&self) -> bool {
            self.interactive
        }
    }
}
