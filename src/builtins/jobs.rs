use crate::builtins::{self, BuiltinCommand};
use crate::errors::{Error, Result};
use crate::shell::Shell;

pub struct Jobs;

impl BuiltinCommand for Jobs {
    const NAME: &'static str = builtins::JOBS_NAME;

    const HELP: &'static str = "\
jobs: jobs
    Lists the background jobs, one per line, and reaps the finished ones.
    A finished job is listed as Done exactly once.";

    fn run(shell: &mut Shell, _args: Vec<String>) -> Result<()> {
        for report in shell.list_jobs() {
            println!("{}", report);
        }
        Ok(())
    }
}

pub struct Fg;

impl BuiltinCommand for Fg {
    const NAME: &'static str = builtins::FG_NAME;

    const HELP: &'static str = "\
fg: fg [job]
    Moves the background job with slot number JOB into the foreground and
    waits for it. JOB defaults to 1.";

    fn run(shell: &mut Shell, args: Vec<String>) -> Result<()> {
        let slot = match args.first() {
            Some(arg) => Some(arg.parse::<usize>().map_err(|_| {
                Error::builtin_command(
                    format!("fg: {}: numeric argument required\nusage: {}", arg, Fg::usage()),
                    2,
                )
            })?),
            None => None,
        };
        shell.put_job_in_foreground(slot)
    }
}
