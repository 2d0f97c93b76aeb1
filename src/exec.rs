//! Pipeline executor
//!
//! Forks one child per pipeline stage, wiring adjacent stages together with
//! a pipe. Stages are spawned left to right with at most one pipe pair live
//! at a time; each child applies the line's redirections before the pipe
//! bindings so that pipe plumbing wins for interior stages.

use std::ffi::CString;
use std::fs::File;
use std::os::unix::io::{AsRawFd, FromRawFd, RawFd};

use failure::{Fail, ResultExt};
use nix::errno::Errno;
use nix::fcntl::{self, FcntlArg, FdFlag};
use nix::libc;
use nix::sys::wait::{self, WaitStatus};
use nix::unistd::{self, ForkResult, Pid};

use crate::errors::{ErrorKind, Result};
use crate::jobs::{Job, JobRegistry};
use crate::parser::{Command, CommandLine};
use crate::redirect;
use crate::signals::SignalController;

const COMMAND_NOT_FOUND_EXIT_STATUS: i32 = 127;

/// Executes one parsed command line, either waiting for the whole pipeline
/// or registering it as a background job.
pub(crate) fn execute(
    line: &CommandLine,
    registry: &mut JobRegistry,
    signals: &mut SignalController,
) -> Result<()> {
    if line.commands.is_empty() {
        return Ok(());
    }
    if line.background && registry.is_full() {
        // checked before any fork so a full registry never leaks processes
        return Err(crate::errors::Error::registry_full(registry.capacity()));
    }

    // children mutate fds 0/1/2 only in their own copies, but the parent's
    // streams are snapshotted so a failed spawn mid-pipeline cannot leave
    // the shell reading from a half-wired pipe
    let _streams = StreamSnapshot::capture()?;

    if line.background {
        spawn_background(line, registry)
    } else {
        let _guard = signals.foreground_wait()?;
        spawn_foreground(line)
    }
}

fn spawn_foreground(line: &CommandLine) -> Result<()> {
    let n = line.commands.len();
    let mut prev_read: Option<File> = None;
    for (i, command) in line.commands.iter().enumerate() {
        let pipe = next_pipe(i, n)?;
        let pid = spawn_stage(command, &line.redirects, prev_read.as_ref(), pipe.as_ref())?;
        prev_read = pipe.map(|(read_end, _write_end)| read_end);
        wait_for_child(pid)?;
    }
    Ok(())
}

fn spawn_background(line: &CommandLine, registry: &mut JobRegistry) -> Result<()> {
    let n = line.commands.len();
    let mut prev_read: Option<File> = None;
    let mut slot = 0;
    let mut last_pid = Pid::from_raw(0);
    for (i, command) in line.commands.iter().enumerate() {
        let spawned = next_pipe(i, n).and_then(|pipe| {
            let pid = spawn_stage(command, &line.redirects, prev_read.as_ref(), pipe.as_ref())?;
            Ok((pid, pipe))
        });
        let (pid, pipe) = match spawned {
            Ok(spawned) => spawned,
            Err(e) => {
                // a stage failed to spawn: the stages already running can
                // never be joined by the rest of the pipeline, so kill and
                // forget them instead of listing the job as Running forever
                if i > 0 {
                    registry.discard(slot);
                }
                return Err(e);
            }
        };
        prev_read = pipe.map(|(read_end, _write_end)| read_end);
        if i == 0 {
            slot = registry.insert(Job::new(&line.input, n))?;
        }
        registry.record_pid(slot, pid);
        last_pid = pid;
    }
    println!("[{}] {}", slot, last_pid);
    Ok(())
}

fn next_pipe(index: usize, command_count: usize) -> Result<Option<(File, File)>> {
    if index + 1 < command_count {
        Ok(Some(create_pipe()?))
    } else {
        Ok(None)
    }
}

/// Forks one pipeline stage. The child never returns: it rebinds its
/// standard streams and execs, or exits with the command-not-found status.
fn spawn_stage(
    command: &Command,
    redirects: &crate::RedirectSet,
    prev_read: Option<&File>,
    pipe: Option<&(File, File)>,
) -> Result<Pid> {
    match unistd::fork().context(ErrorKind::Nix)? {
        ForkResult::Parent { child } => {
            debug!("forked {} for '{}'", child, command.program());
            Ok(child)
        }
        ForkResult::Child => {
            redirect::apply_all(redirects);
            if let Some(read_end) = prev_read {
                exit_if_err(unistd::dup2(read_end.as_raw_fd(), libc::STDIN_FILENO));
                exit_if_err(unistd::close(read_end.as_raw_fd()));
            }
            if let Some((read_end, write_end)) = pipe {
                exit_if_err(unistd::close(read_end.as_raw_fd()));
                exit_if_err(unistd::dup2(write_end.as_raw_fd(), libc::STDOUT_FILENO));
                exit_if_err(unistd::close(write_end.as_raw_fd()));
            }
            run_command(command)
        }
    }
}

/// Replaces the child's image with the command. Only reached in the child.
fn run_command(command: &Command) -> ! {
    let argv: Vec<CString> = command
        .argv
        .iter()
        .filter_map(|arg| CString::new(arg.as_str()).ok())
        .collect();
    if !argv.is_empty() {
        let argv_refs: Vec<&std::ffi::CStr> = argv.iter().map(|arg| arg.as_c_str()).collect();
        let _ = unistd::execvp(argv_refs[0], &argv_refs);
    }
    eprintln!("{}: Command not found", command.program());
    unsafe { libc::_exit(COMMAND_NOT_FOUND_EXIT_STATUS) }
}

fn exit_if_err<T>(result: nix::Result<T>) {
    if let Err(e) = result {
        eprintln!("msh: {}", e);
        unsafe { libc::_exit(1) }
    }
}

/// Blocks until `pid` exits or is killed. An interrupt arriving during the
/// wait restarts it; the child sees the signal and dies, the shell does not.
pub(crate) fn wait_for_child(pid: Pid) -> Result<()> {
    loop {
        match wait::waitpid(pid, None) {
            Ok(WaitStatus::Exited(_, status)) => {
                debug!("{} exited with status {}", pid, status);
                return Ok(());
            }
            Ok(WaitStatus::Signaled(_, signal, _)) => {
                debug!("{} killed by {:?}", pid, signal);
                return Ok(());
            }
            Ok(_) => continue,
            Err(nix::Error::Sys(Errno::EINTR)) => continue,
            Err(nix::Error::Sys(Errno::ECHILD)) => return Ok(()),
            Err(e) => return Err(e.context(ErrorKind::Nix).into()),
        }
    }
}

/// Wraps `unistd::pipe()` to return RAII structs instead of raw, owning file
/// descriptors.
fn create_pipe() -> Result<(File, File)> {
    // It is safe to call from_raw_fd here because the fds returned by
    // unistd::pipe() are owned by no other struct.
    let (read_end_pipe, write_end_pipe) = unistd::pipe().context(ErrorKind::Nix)?;
    unsafe {
        Ok((
            File::from_raw_fd(read_end_pipe),
            File::from_raw_fd(write_end_pipe),
        ))
    }
}

/// CLOEXEC duplicates of the shell's standard streams, restored on drop.
struct StreamSnapshot {
    stdin: File,
    stdout: File,
    stderr: File,
}

impl StreamSnapshot {
    fn capture() -> Result<StreamSnapshot> {
        Ok(StreamSnapshot {
            stdin: duplicate(libc::STDIN_FILENO)?,
            stdout: duplicate(libc::STDOUT_FILENO)?,
            stderr: duplicate(libc::STDERR_FILENO)?,
        })
    }
}

impl Drop for StreamSnapshot {
    fn drop(&mut self) {
        let result = unistd::dup2(self.stderr.as_raw_fd(), libc::STDERR_FILENO);
        log_if_err!(result, "restoring stderr");
        let result = unistd::dup2(self.stdin.as_raw_fd(), libc::STDIN_FILENO);
        log_if_err!(result, "restoring stdin");
        let result = unistd::dup2(self.stdout.as_raw_fd(), libc::STDOUT_FILENO);
        log_if_err!(result, "restoring stdout");
    }
}

/// Duplicates `fd` with CLOEXEC set so the copy never leaks into children.
fn duplicate(fd: RawFd) -> Result<File> {
    let duped = unistd::dup(fd).context(ErrorKind::Nix)?;
    if let Err(e) = fcntl::fcntl(duped, FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC)) {
        let _ = unistd::close(duped);
        return Err(e.context(ErrorKind::Nix).into());
    }
    unsafe { Ok(File::from_raw_fd(duped)) }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::thread;
    use std::time::Duration;

    use tempdir::TempDir;

    use super::*;
    use crate::jobs::JobStatus;
    use crate::parser::CommandLine;

    fn run_line(input: &str, registry: &mut JobRegistry) {
        let line = CommandLine::parse(input).unwrap().unwrap();
        let mut signals = SignalController::disarmed();
        execute(&line, registry, &mut signals).unwrap();
    }

    fn poll_until_removed(registry: &mut JobRegistry) -> Vec<crate::jobs::JobReport> {
        let mut done = Vec::new();
        for _ in 0..200 {
            for report in registry.list_and_reap() {
                if report.status == JobStatus::Done {
                    done.push(report);
                }
            }
            if !registry.has_jobs() {
                return done;
            }
            thread::sleep(Duration::from_millis(20));
        }
        panic!("background job never finished");
    }

    #[test]
    fn test_single_command_foreground() {
        let mut registry = JobRegistry::default();
        run_line("true", &mut registry);
        assert!(!registry.has_jobs());
    }

    #[test]
    fn test_pipeline_output_redirection() {
        let tmp = TempDir::new("exec_test").unwrap();
        let out = tmp.path().join("out.txt");
        let mut registry = JobRegistry::default();
        run_line(
            &format!("echo hello | cat > {}", out.display()),
            &mut registry,
        );
        assert_eq!(fs::read_to_string(&out).unwrap(), "hello\n");
    }

    #[test]
    fn test_background_job_tracked_to_done() {
        let mut registry = JobRegistry::default();
        run_line("sleep 0.1 &", &mut registry);
        assert!(registry.has_jobs());

        let done = poll_until_removed(&mut registry);
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].slot, 1);
        assert_eq!(done[0].instruction, "sleep 0.1 &");
    }

    #[test]
    fn test_background_pipeline_reported_once() {
        let mut registry = JobRegistry::default();
        run_line("sleep 0.1 | cat | cat &", &mut registry);
        assert!(registry.has_jobs());

        let done = poll_until_removed(&mut registry);
        assert_eq!(done.len(), 1);
    }
}
