//! Msh builtins
//!
//! Commands that must run inside the shell process because they read or
//! mutate the shell's own state, such as the working directory, the umask,
//! or the job registry.

use crate::errors::Result;
use crate::parser::Command;
use crate::shell::Shell;

use self::dirs::Cd;
use self::exit::Exit;
use self::jobs::Fg;
use self::jobs::Jobs;
use self::mask::Umask;

mod dirs;
mod exit;
mod jobs;
mod mask;

const CD_NAME: &str = "cd";
const EXIT_NAME: &str = "exit";
const FG_NAME: &str = "fg";
const JOBS_NAME: &str = "jobs";
const UMASK_NAME: &str = "umask";

/// Represents an Msh builtin command such as cd or jobs.
pub trait BuiltinCommand {
    /// The NAME of the command.
    const NAME: &'static str;
    /// The help string to display to the user.
    const HELP: &'static str;
    /// The usage string to display to the user.
    fn usage() -> String {
        Self::HELP.lines().nth(0).unwrap().to_owned()
    }
    /// Runs the command with the given arguments in the `shell` environment.
    fn run(shell: &mut Shell, args: Vec<String>) -> Result<()>;
}

pub fn is_builtin<T: AsRef<str>>(program: T) -> bool {
    [CD_NAME, EXIT_NAME, FG_NAME, JOBS_NAME, UMASK_NAME].contains(&program.as_ref())
}

/// precondition: command is a builtin.
pub fn run(shell: &mut Shell, command: &Command) -> Result<()> {
    assert!(is_builtin(command.program()));
    let args = command.args().to_vec();
    match command.program() {
        CD_NAME => Cd::run(shell, args),
        EXIT_NAME => Exit::run(shell, args),
        FG_NAME => Fg::run(shell, args),
        JOBS_NAME => Jobs::run(shell, args),
        UMASK_NAME => Umask::run(shell, args),
        _ => unreachable!(),
    }
}
