//! Background job registry
//!
//! Tracks one `Job` per background pipeline in insertion order. Slots are
//! 1-based and reported slots stay stable until a finished job is removed,
//! after which later jobs slide down. The registry grows up to a fixed
//! capacity and refuses new jobs beyond it.

use std::fmt;

use nix::sys::signal::{self, Signal};
use nix::sys::wait::{self, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;

use crate::errors::{Error, Result};
use crate::exec;
use crate::signals::SignalController;

pub const DEFAULT_JOB_CAPACITY: usize = 50;

#[derive(Debug)]
struct JobProcess {
    pid: Pid,
    /// Set once the pid has been collected with waitpid, so a pid recycled
    /// by the kernel is never reaped twice.
    reaped: bool,
}

/// One background pipeline: its verbatim instruction and the processes
/// spawned for it so far.
pub struct Job {
    instruction: String,
    processes: Vec<JobProcess>,
    expected: usize,
    completed: bool,
}

impl Job {
    pub fn new<T: AsRef<str>>(instruction: T, expected: usize) -> Job {
        Job {
            instruction: instruction.as_ref().to_string(),
            processes: Vec::with_capacity(expected),
            expected,
            completed: false,
        }
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    fn record_pid(&mut self, pid: Pid) {
        debug_assert!(self.processes.len() < self.expected);
        self.processes.push(JobProcess { pid, reaped: false });
    }

    /// Reaps any exited processes and reports whether the whole job is done.
    /// The result latches: once finished, always finished. A job whose
    /// stages are still being spawned is never finished.
    fn poll_finished(&mut self) -> bool {
        if self.completed {
            return true;
        }
        if self.processes.len() < self.expected {
            return false;
        }
        for process in self.processes.iter_mut().filter(|p| !p.reaped) {
            match wait::waitpid(process.pid, Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::StillAlive) => return false,
                Ok(status) => {
                    debug!("reaped {}: {:?}", process.pid, status);
                    process.reaped = true;
                }
                Err(e) => {
                    debug!("waitpid {} failed: {}", process.pid, e);
                    process.reaped = true;
                }
            }
        }
        self.completed = self.processes.iter().all(|p| p.reaped);
        self.completed
    }

    fn live_pids(&self) -> Vec<Pid> {
        self.processes
            .iter()
            .filter(|p| !p.reaped)
            .map(|p| p.pid)
            .collect()
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Job {{ instruction: {:?}, processes: {}/{}, completed: {} }}",
            self.instruction,
            self.processes.len(),
            self.expected,
            self.completed
        )
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum JobStatus {
    Running,
    Done,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            JobStatus::Running => write!(f, "Running"),
            JobStatus::Done => write!(f, "Done"),
        }
    }
}

/// One line of `jobs` output.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct JobReport {
    pub slot: usize,
    pub status: JobStatus,
    pub instruction: String,
}

impl fmt::Display for JobReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}] {}\t{}", self.slot, self.status, self.instruction)
    }
}

#[derive(Debug)]
pub struct JobRegistry {
    jobs: Vec<Job>,
    capacity: usize,
}

impl Default for JobRegistry {
    fn default() -> JobRegistry {
        JobRegistry::with_capacity(DEFAULT_JOB_CAPACITY)
    }
}

impl JobRegistry {
    pub fn with_capacity(capacity: usize) -> JobRegistry {
        JobRegistry {
            jobs: Vec::new(),
            capacity,
        }
    }

    pub fn has_jobs(&self) -> bool {
        !self.jobs.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.jobs.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Registers a job in the first free slot, returning its 1-based slot.
    pub fn insert(&mut self, job: Job) -> Result<usize> {
        if self.is_full() {
            return Err(Error::registry_full(self.capacity));
        }
        self.jobs.push(job);
        Ok(self.jobs.len())
    }

    /// # Panics
    /// Panics if `slot` was not returned by a prior `insert`.
    pub fn record_pid(&mut self, slot: usize, pid: Pid) {
        let job = self
            .jobs
            .get_mut(slot.wrapping_sub(1))
            .expect("job slot out of range");
        job.record_pid(pid);
    }

    /// Reports every job's status, then drops the finished ones. Removal is
    /// deferred until after the full pass so each job is reported exactly
    /// once as Done before its slot is reused.
    pub fn list_and_reap(&mut self) -> Vec<JobReport> {
        let reports = self
            .jobs
            .iter_mut()
            .enumerate()
            .map(|(i, job)| JobReport {
                slot: i + 1,
                status: if job.poll_finished() {
                    JobStatus::Done
                } else {
                    JobStatus::Running
                },
                instruction: job.instruction.clone(),
            })
            .collect();
        self.jobs.retain(|job| !job.completed);
        reports
    }

    /// Moves the job in `slot` (default 1) to the foreground and waits for
    /// its remaining processes. Interrupts delivered while waiting go to the
    /// job, not the shell.
    pub fn promote_to_foreground(
        &mut self,
        slot: Option<usize>,
        signals: &mut SignalController,
    ) -> Result<()> {
        if self.jobs.is_empty() {
            println!("fg: no jobs available");
            return Ok(());
        }
        let slot = slot.unwrap_or(1);
        if slot == 0 || slot > self.jobs.len() {
            return Err(Error::no_such_job(slot));
        }
        let index = slot - 1;
        if self.jobs[index].poll_finished() {
            let job = self.jobs.remove(index);
            println!("fg: job has terminated");
            println!("[{}] {}\t{}", slot, JobStatus::Done, job.instruction);
            return Ok(());
        }

        println!("{}", self.jobs[index].instruction);
        let pids = self.jobs[index].live_pids();
        {
            let _guard = signals.foreground_wait()?;
            for pid in pids {
                exec::wait_for_child(pid)?;
            }
        }
        self.jobs.remove(index);
        Ok(())
    }

    /// Kills, reaps, and forgets a job whose pipeline could not be fully
    /// spawned. A half-spawned job must not linger as Running forever.
    pub fn discard(&mut self, slot: usize) {
        if slot == 0 || slot > self.jobs.len() {
            return;
        }
        let job = self.jobs.remove(slot - 1);
        for pid in job.live_pids() {
            let result = signal::kill(pid, Signal::SIGKILL);
            log_if_err!(result, "killing {}", pid);
            let result = exec::wait_for_child(pid);
            log_if_err!(result, "reaping {}", pid);
        }
    }

    /// Kills every remaining background process. Used at shell exit.
    pub fn terminate_all_and_release(&mut self) {
        for job in &self.jobs {
            for pid in job.live_pids() {
                let result = signal::kill(pid, Signal::SIGKILL);
                log_if_err!(result, "killing {}", pid);
            }
        }
        self.jobs.clear();
    }
}
