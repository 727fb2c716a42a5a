//! Interactive client for a corral server.
//!
//! `corral <address> <port>` reads commands line by line from stdin. Before
//! login only `register`, `login`, `help` and `exit` exist; after a successful
//! login the collection commands replace them. Every collection request carries
//! the login and credential digest accepted at login, since the server keeps no
//! session.
//!
//! Requests whose operation has a response handler wait for the matching reply
//! up to the configured timeout; the rest are sent fire-and-forget.

mod console;
mod errors;
mod responses;
mod secret;
mod session;
mod transport;

use std::ffi::OsString;
use std::io::{self, BufRead, IsTerminal, Write};
use std::process::ExitCode;

use clap::Parser;
use corral_config::ClientArgs;

pub use console::{
    ANONYMOUS_COMMANDS, AUTHENTICATED_COMMANDS, CommandLine, CommandName, CommandTable,
    split_command,
};
pub use errors::CliError;
pub use responses::{Reply, response_registry};
pub use session::{AuthContext, Flow, Session};
pub use transport::{RequestChannel, UdpLink};

use console::Console;

/// Runs the client until `exit` or end of input.
///
/// Secrets are read with echo disabled when stdin is a terminal.
#[must_use]
pub fn run<I, T, R, W, E>(args: I, input: R, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
    R: BufRead,
    W: Write,
    E: Write,
{
    run_with_echo(args, input, stdout, stderr, io::stdin().is_terminal())
}

pub(crate) fn run_with_echo<I, T, R, W, E>(
    args: I,
    input: R,
    stdout: &mut W,
    stderr: &mut E,
    mask_echo: bool,
) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
    R: BufRead,
    W: Write,
    E: Write,
{
    let args = match ClientArgs::try_parse_from(args) {
        Ok(args) => args,
        Err(error) => return usage(&error, stdout, stderr),
    };
    let link = match UdpLink::connect(&args.address, args.port, args.timeout()) {
        Ok(link) => link,
        Err(error) => {
            let _ = writeln!(stderr, "corral: {error}");
            return ExitCode::FAILURE;
        }
    };

    let outcome = {
        let mut console = Console::new(input, &mut *stdout, &mut *stderr, mask_echo);
        drive(&mut Session::new(link), &mut console)
    };
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let _ = writeln!(stderr, "corral: {error}");
            ExitCode::FAILURE
        }
    }
}

/// Reads and executes commands until `exit`, end of input, or a console
/// failure. Command failures are reported and the loop continues.
fn drive<L, R, W, E>(
    session: &mut Session<L>,
    console: &mut Console<'_, R, W, E>,
) -> Result<(), CliError>
where
    L: RequestChannel,
    R: BufRead,
    W: Write,
    E: Write,
{
    loop {
        let Some(line) = console.prompt(&session.prompt())? else {
            return Ok(());
        };
        match session.execute(&line, console) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Exit) => return Ok(()),
            Err(error) if error.is_fatal() => return Err(error),
            Err(error) => console.complain(&error)?,
        }
    }
}

fn usage<W: Write, E: Write>(error: &clap::Error, stdout: &mut W, stderr: &mut E) -> ExitCode {
    if error.use_stderr() {
        let _ = write!(stderr, "{}", error.render());
        ExitCode::FAILURE
    } else {
        let _ = write!(stdout, "{}", error.render());
        ExitCode::SUCCESS
    }
}

#[cfg(test)]
mod tests;
