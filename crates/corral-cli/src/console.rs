//! Named-command tables and the line-oriented console they are read from.
//!
//! Each authentication context owns a [`CommandTable`]; a name that is not in
//! the active table is reported as unknown even when the other table has it.

use std::fmt;
use std::io::{self, BufRead, Write};
use std::str::FromStr;

use corral_protocol::Operation;
use strum::{Display, EnumString, IntoStaticStr};

use crate::errors::CliError;
use crate::secret;

/// Every command the console understands, across both tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum CommandName {
    /// `register <email>`
    Register,
    /// `login <email>`
    Login,
    /// `logout`
    Logout,
    /// `info`
    Info,
    /// `show`
    Show,
    /// `add <record>`
    Add,
    /// `remove <record>`
    Remove,
    /// `remove_first`
    RemoveFirst,
    /// `remove_last`
    RemoveLast,
    /// `import <path>`
    Import,
    /// `load`
    Load,
    /// `save`
    Save,
    /// `stop`
    Stop,
    /// `help`
    Help,
    /// `exit`
    Exit,
}

impl CommandName {
    /// Synopsis shown by `help`.
    #[must_use]
    pub const fn usage(self) -> &'static str {
        match self {
            Self::Register => "register <email>",
            Self::Login => "login <email>",
            Self::Logout => "logout",
            Self::Info => "info",
            Self::Show => "show",
            Self::Add => "add <record>",
            Self::Remove => "remove <record>",
            Self::RemoveFirst => "remove_first",
            Self::RemoveLast => "remove_last",
            Self::Import => "import <path>",
            Self::Load => "load",
            Self::Save => "save",
            Self::Stop => "stop",
            Self::Help => "help",
            Self::Exit => "exit",
        }
    }

    /// One-line description shown by `help`.
    #[must_use]
    pub const fn summary(self) -> &'static str {
        match self {
            Self::Register => "create an account; the secret is sent to the address",
            Self::Login => "log in with the delivered secret",
            Self::Logout => "forget the current login",
            Self::Info => "summarise the collection",
            Self::Show => "list records in natural order",
            Self::Add => "add a JSON record literal",
            Self::Remove => "remove records equal to a JSON record literal",
            Self::RemoveFirst => "remove the largest record",
            Self::RemoveLast => "remove the smallest record",
            Self::Import => "add every record from a JSON array file",
            Self::Load => "ask the server to reload the collection",
            Self::Save => "ask the server to persist the collection",
            Self::Stop => "stop the server",
            Self::Help => "list the available commands",
            Self::Exit => "leave the client",
        }
    }

    /// Operation sent on the wire, for commands that send one.
    #[must_use]
    pub const fn operation(self) -> Option<Operation> {
        match self {
            Self::Register => Some(Operation::Register),
            Self::Login => Some(Operation::Login),
            Self::Info => Some(Operation::Info),
            Self::Show => Some(Operation::Show),
            Self::Add => Some(Operation::Add),
            Self::Remove => Some(Operation::Remove),
            Self::RemoveFirst => Some(Operation::RemoveFirst),
            Self::RemoveLast => Some(Operation::RemoveLast),
            Self::Import => Some(Operation::Import),
            Self::Load => Some(Operation::Load),
            Self::Save => Some(Operation::Save),
            Self::Stop => Some(Operation::Stop),
            Self::Logout | Self::Help | Self::Exit => None,
        }
    }
}

/// Commands available in one authentication context.
#[derive(Debug)]
pub struct CommandTable {
    commands: &'static [CommandName],
}

/// Table active before a successful login.
pub static ANONYMOUS_COMMANDS: CommandTable = CommandTable {
    commands: &[
        CommandName::Register,
        CommandName::Login,
        CommandName::Help,
        CommandName::Exit,
    ],
};

/// Table active while logged in.
pub static AUTHENTICATED_COMMANDS: CommandTable = CommandTable {
    commands: &[
        CommandName::Info,
        CommandName::Show,
        CommandName::Add,
        CommandName::Remove,
        CommandName::RemoveFirst,
        CommandName::RemoveLast,
        CommandName::Import,
        CommandName::Load,
        CommandName::Save,
        CommandName::Stop,
        CommandName::Logout,
        CommandName::Help,
        CommandName::Exit,
    ],
};

impl CommandTable {
    /// Finds `name` in this table.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<CommandName> {
        CommandName::from_str(name)
            .ok()
            .filter(|command| self.commands.contains(command))
    }

    /// Commands in display order.
    #[must_use]
    pub const fn commands(&self) -> &'static [CommandName] {
        self.commands
    }
}

/// One input line split into a command name and its argument text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandLine<'a> {
    /// First word.
    pub name: &'a str,
    /// Everything after the first word, trimmed; empty when absent.
    pub argument: &'a str,
}

/// Splits `line` at the first whitespace. Blank lines yield `None`.
#[must_use]
pub fn split_command(line: &str) -> Option<CommandLine<'_>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let (name, argument) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(name, rest)| (name, rest.trim()));
    Some(CommandLine { name, argument })
}

/// Line input plus the two output streams.
pub(crate) struct Console<'a, R, W, E> {
    input: R,
    stdout: &'a mut W,
    stderr: &'a mut E,
    mask_echo: bool,
}

impl<'a, R, W, E> Console<'a, R, W, E>
where
    R: BufRead,
    W: Write,
    E: Write,
{
    pub(crate) fn new(input: R, stdout: &'a mut W, stderr: &'a mut E, mask_echo: bool) -> Self {
        Self {
            input,
            stdout,
            stderr,
            mask_echo,
        }
    }

    /// Writes `prompt` and reads one line; `None` at end of input.
    pub(crate) fn prompt(&mut self, prompt: &str) -> Result<Option<String>, CliError> {
        self.write_prompt(prompt)?;
        read_line(&mut self.input).map_err(CliError::ReadInput)
    }

    /// Like [`Console::prompt`], with terminal echo off while reading.
    pub(crate) fn prompt_secret(&mut self, prompt: &str) -> Result<Option<String>, CliError> {
        self.write_prompt(prompt)?;
        let input = &mut self.input;
        let line = if self.mask_echo {
            secret::without_echo(|| read_line(input))
        } else {
            read_line(input)
        };
        line.map_err(CliError::ReadInput)
    }

    pub(crate) fn say(&mut self, message: impl fmt::Display) -> Result<(), CliError> {
        writeln!(self.stdout, "{message}").map_err(CliError::WriteOutput)
    }

    pub(crate) fn complain(&mut self, error: &CliError) -> Result<(), CliError> {
        writeln!(self.stderr, "error: {error}").map_err(CliError::WriteOutput)
    }

    fn write_prompt(&mut self, prompt: &str) -> Result<(), CliError> {
        write!(self.stdout, "{prompt}")
            .and_then(|()| self.stdout.flush())
            .map_err(CliError::WriteOutput)
    }
}

fn read_line<R: BufRead>(input: &mut R) -> io::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_owned()))
}
