//! Authentication context and command execution.
//!
//! The session starts [`AuthContext::Unauthenticated`]. Only an affirmative
//! `login` reply moves it to [`AuthContext::Authenticated`], retaining exactly
//! the login/credential pair that was sent; `logout` drops the pair locally.

use std::fs;
use std::io::{BufRead, Write};

use corral_protocol::{
    CredentialDigest, Credentials, DispatchRegistry, Envelope, Operation, Payload, Record, Role,
    Sha256Digest,
};

use crate::console::{
    ANONYMOUS_COMMANDS, AUTHENTICATED_COMMANDS, CommandName, CommandTable, Console, split_command,
};
use crate::errors::CliError;
use crate::responses::{Reply, response_registry};
use crate::transport::RequestChannel;

const SECRET_PROMPT: &str = "secret: ";

/// Which command table is active, and the credentials when logged in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthContext {
    /// No credentials; only `register`, `login`, `help` and `exit`.
    #[default]
    Unauthenticated,
    /// Credentials accepted by the server.
    Authenticated(Credentials),
}

impl AuthContext {
    /// Commands accepted in this context.
    #[must_use]
    pub const fn commands(&self) -> &'static CommandTable {
        match self {
            Self::Unauthenticated => &ANONYMOUS_COMMANDS,
            Self::Authenticated(_) => &AUTHENTICATED_COMMANDS,
        }
    }

    /// Retained pair, if logged in.
    #[must_use]
    pub const fn credentials(&self) -> Option<&Credentials> {
        match self {
            Self::Unauthenticated => None,
            Self::Authenticated(credentials) => Some(credentials),
        }
    }
}

/// Whether the console should keep reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Read the next command.
    Continue,
    /// Leave the client.
    Exit,
}

/// Client state machine bound to one server link.
pub struct Session<L> {
    link: L,
    context: AuthContext,
    responses: DispatchRegistry<Reply>,
    digest: Box<dyn CredentialDigest>,
}

impl<L: RequestChannel> Session<L> {
    /// Starts anonymous, digesting secrets with SHA-256.
    #[must_use]
    pub fn new(link: L) -> Self {
        Self::with_digest(link, Box::new(Sha256Digest))
    }

    /// Starts anonymous with a custom digest.
    #[must_use]
    pub fn with_digest(link: L, digest: Box<dyn CredentialDigest>) -> Self {
        Self {
            link,
            context: AuthContext::default(),
            responses: response_registry(),
            digest,
        }
    }

    /// Active context.
    #[must_use]
    pub const fn context(&self) -> &AuthContext {
        &self.context
    }

    /// Underlying link.
    #[must_use]
    pub const fn link(&self) -> &L {
        &self.link
    }

    /// Console prompt naming the logged-in user, if any.
    #[must_use]
    pub fn prompt(&self) -> String {
        self.context.credentials().map_or_else(
            || String::from("corral> "),
            |credentials| format!("corral({})> ", credentials.login),
        )
    }

    /// Runs one input line against the active command table.
    ///
    /// # Errors
    ///
    /// Returns the reason the command was aborted; see [`CliError`].
    pub(crate) fn execute<R, W, E>(
        &mut self,
        line: &str,
        console: &mut Console<'_, R, W, E>,
    ) -> Result<Flow, CliError>
    where
        R: BufRead,
        W: Write,
        E: Write,
    {
        let Some(input) = split_command(line) else {
            return Ok(Flow::Continue);
        };
        let table = self.context.commands();
        let command = table
            .lookup(input.name)
            .ok_or_else(|| CliError::UnknownCommand(input.name.to_owned()))?;

        match command {
            CommandName::Exit => return Ok(Flow::Exit),
            CommandName::Help => {
                for entry in table.commands() {
                    console.say(format_args!("  {:<18}{}", entry.usage(), entry.summary()))?;
                }
            }
            CommandName::Logout => {
                self.context = AuthContext::Unauthenticated;
                console.say("logged out")?;
            }
            CommandName::Register => {
                let address = required(command, input.argument, "an email address")?;
                self.register(address, console)?;
            }
            CommandName::Login => {
                let address = required(command, input.argument, "an email address")?;
                self.login(address, console)?;
            }
            CommandName::Add | CommandName::Remove => {
                let literal = required(command, input.argument, "a JSON record")?;
                let record = Record::from_literal(literal)?;
                self.submit(command, Payload::Record(record), console)?;
            }
            CommandName::Import => {
                let path = required(command, input.argument, "a file path")?;
                let text = fs::read_to_string(path).map_err(|source| CliError::ReadImport {
                    path: path.to_owned(),
                    source,
                })?;
                Record::from_document(&text)?;
                self.submit(command, Payload::Text(text), console)?;
            }
            CommandName::Info
            | CommandName::Show
            | CommandName::RemoveFirst
            | CommandName::RemoveLast
            | CommandName::Load
            | CommandName::Save
            | CommandName::Stop => self.submit(command, Payload::None, console)?,
        }
        Ok(Flow::Continue)
    }

    fn register<R, W, E>(
        &self,
        address: &str,
        console: &mut Console<'_, R, W, E>,
    ) -> Result<(), CliError>
    where
        R: BufRead,
        W: Write,
        E: Write,
    {
        let request = Envelope::request(Operation::Register, Payload::Text(address.to_owned()));
        if !self.exchange(&request)?.is_some_and(|reply| reply.accepted()) {
            return Err(CliError::RegistrationRefused(address.to_owned()));
        }
        console.say(format_args!(
            "a secret was sent to {address}; enter `login {address}` to use it"
        ))
    }

    fn login<R, W, E>(
        &mut self,
        address: &str,
        console: &mut Console<'_, R, W, E>,
    ) -> Result<(), CliError>
    where
        R: BufRead,
        W: Write,
        E: Write,
    {
        let secret = console
            .prompt_secret(SECRET_PROMPT)?
            .ok_or(CliError::MissingSecret)?;
        let credentials = Credentials::from_secret(address, &secret, self.digest.as_ref());
        let request = Envelope::authenticated(Operation::Login, Payload::None, &credentials);
        if !self.exchange(&request)?.is_some_and(|reply| reply.accepted()) {
            return Err(CliError::LoginRefused(address.to_owned()));
        }
        self.context = AuthContext::Authenticated(credentials);
        console.say(format_args!("logged in as {address}"))
    }

    /// Sends an authenticated request and prints whatever the reply renders.
    fn submit<R, W, E>(
        &self,
        command: CommandName,
        body: Payload,
        console: &mut Console<'_, R, W, E>,
    ) -> Result<(), CliError>
    where
        R: BufRead,
        W: Write,
        E: Write,
    {
        let Some(operation) = command.operation() else {
            return Ok(());
        };
        let credentials = self
            .context
            .credentials()
            .ok_or(CliError::LoginRequired(operation))?;
        let request = Envelope::authenticated(operation, body, credentials);
        if let Some(reply) = self.exchange(&request)? {
            for line in reply.lines() {
                console.say(line)?;
            }
        }
        Ok(())
    }

    /// Sends `request`, then waits only if a response handler exists.
    fn exchange(&self, request: &Envelope) -> Result<Option<Reply>, CliError> {
        let operation = request.operation();
        self.link.send(request)?;
        if !self.responses.has_handler(Role::Response, operation) {
            return Ok(None);
        }
        let response = self
            .link
            .await_reply(operation)?
            .ok_or(CliError::NoResponse(operation))?;
        let mut reply = Reply::default();
        self.responses.dispatch_response(&mut reply, &response);
        match reply.unexpected() {
            Some(found) => Err(CliError::UnexpectedReply { operation, found }),
            None => Ok(Some(reply)),
        }
    }
}

fn required<'a>(
    command: CommandName,
    argument: &'a str,
    expected: &'static str,
) -> Result<&'a str, CliError> {
    if argument.is_empty() {
        Err(CliError::MissingArgument {
            command,
            argument: expected,
        })
    } else {
        Ok(argument)
    }
}
