//! The shell context: the prompt loop, builtin dispatch, and the state that
//! outlives a single command line (job registry, signal disposition, umask).

use std::fs::File;
use std::io::{self, BufRead, Read, Write};
use std::path::Path;
use std::process;

use failure::ResultExt;
use nix::libc;
use nix::sys::stat::{self, Mode};

use crate::builtins;
use crate::errors::{ErrorKind, Result};
use crate::exec;
use crate::jobs::{JobRegistry, JobReport, DEFAULT_JOB_CAPACITY};
use crate::parser::CommandLine;
use crate::signals::SignalController;

pub const PROMPT: &str = "msh> ";

const DEFAULT_MASK: libc::mode_t = 0o022;
const DEFAULT_FORMATTED_MASK: u32 = 22;

/// Policy object controlling how the shell operates.
#[derive(Clone, Copy, Debug)]
pub struct ShellConfig {
    job_capacity: usize,
    /// Print startup and shutdown messages (interactive sessions only).
    display_messages: bool,
}

impl ShellConfig {
    /// Creates an interactive shell, e.g. prompts the user for input.
    pub fn interactive() -> ShellConfig {
        ShellConfig {
            job_capacity: DEFAULT_JOB_CAPACITY,
            display_messages: true,
        }
    }

    /// Creates a noninteractive shell, e.g. executes a script.
    pub fn noninteractive() -> ShellConfig {
        Default::default()
    }
}

impl Default for ShellConfig {
    fn default() -> ShellConfig {
        ShellConfig {
            job_capacity: DEFAULT_JOB_CAPACITY,
            display_messages: false,
        }
    }
}

/// The shell: owns every piece of cross-command state.
#[derive(Debug)]
pub struct Shell {
    registry: JobRegistry,
    signals: SignalController,
    formatted_mask: u32,
    config: ShellConfig,
}

impl Shell {
    /// Constructs a new shell with the default umask and an installed
    /// interrupt handler.
    pub fn new(config: ShellConfig) -> Result<Shell> {
        stat::umask(Mode::from_bits_truncate(DEFAULT_MASK));
        let shell = Shell {
            registry: JobRegistry::with_capacity(config.job_capacity),
            signals: SignalController::new()?,
            formatted_mask: DEFAULT_FORMATTED_MASK,
            config,
        };
        info!("msh started up");
        Ok(shell)
    }

    /// Runs a shell script from a file.
    pub fn execute_commands_from_file(&mut self, path: &Path) -> Result<()> {
        let mut file = File::open(path).context(ErrorKind::Io)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents).context(ErrorKind::Io)?;
        for line in contents.split('\n') {
            self.execute_command_string(line)?;
        }
        Ok(())
    }

    /// Parses and executes one raw input line. Syntax errors are reported
    /// to the user and are not fatal.
    pub fn execute_command_string(&mut self, input: &str) -> Result<()> {
        let line = match CommandLine::parse(input) {
            Ok(Some(line)) => line,
            Ok(None) => return Ok(()),
            Err(e) => {
                if let ErrorKind::Syntax(ref line) = *e.kind() {
                    eprintln!("msh: syntax error near: {}", line);
                    return Ok(());
                }
                return Err(e);
            }
        };

        let command = &line.commands[0];
        if builtins::is_builtin(command.program()) {
            builtins::run(self, command)
        } else {
            exec::execute(&line, &mut self.registry, &mut self.signals)
        }
    }

    /// Runs the interactive prompt loop until EOF or `exit`.
    pub fn execute_from_stdin(&mut self) {
        let stdin = io::stdin();
        loop {
            self.display_prompt();
            let mut input = String::new();
            match stdin.lock().read_line(&mut input) {
                Ok(0) => break, // EOF
                Ok(_) => {}
                Err(e) => {
                    warn!("failed to read line: {}", e);
                    continue;
                }
            }
            if let Err(e) = self.execute_command_string(&input) {
                eprintln!("msh: {}", e);
                debug!("command failed: {}", e);
            }
        }
    }

    fn display_prompt(&self) {
        print!("{}", PROMPT);
        let result = io::stdout().flush();
        log_if_err!(result, "flushing prompt");
    }

    /// Reports and reaps the background jobs, in slot order.
    pub fn list_jobs(&mut self) -> Vec<JobReport> {
        self.registry.list_and_reap()
    }

    /// Brings the job in `slot` (default 1) to the foreground.
    pub fn put_job_in_foreground(&mut self, slot: Option<usize>) -> Result<()> {
        let Shell {
            ref mut registry,
            ref mut signals,
            ..
        } = *self;
        registry.promote_to_foreground(slot, signals)
    }

    /// Sets the process umask. `formatted` is the octal digit string the
    /// user supplied, reparsed as decimal for display.
    pub fn set_mask(&mut self, mask: libc::mode_t, formatted: u32) {
        stat::umask(Mode::from_bits_truncate(mask));
        self.formatted_mask = formatted;
    }

    pub fn formatted_mask(&self) -> u32 {
        self.formatted_mask
    }

    /// Exits the shell, killing any remaining background processes.
    pub fn exit(&mut self, code: Option<i32>) -> ! {
        if self.config.display_messages {
            println!("exit");
        }
        self.registry.terminate_all_and_release();
        info!("msh has shut down");
        process::exit(code.unwrap_or(0))
    }
}
