//! Redirection applier
//!
//! Rebinds a standard stream to a named file inside a freshly forked child.
//! Failure to open a target is reported and leaves the original binding in
//! place; it never aborts the pipeline.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::io::{AsRawFd, RawFd};

use nix::libc;
use nix::unistd;

/// Which standard stream a redirection rebinds.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StreamRole {
    Input,
    Output,
    Error,
}

impl StreamRole {
    fn target_fd(self) -> RawFd {
        match self {
            StreamRole::Input => libc::STDIN_FILENO,
            StreamRole::Output => libc::STDOUT_FILENO,
            StreamRole::Error => libc::STDERR_FILENO,
        }
    }

    /// Input targets are opened read-only; output and error targets are
    /// created and truncated.
    fn open(self, filename: &str) -> io::Result<File> {
        match self {
            StreamRole::Input => File::open(filename),
            StreamRole::Output | StreamRole::Error => OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(filename),
        }
    }
}

/// Optional input/output/error redirection filenames for one pipeline.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RedirectSet {
    pub input: Option<String>,
    pub output: Option<String>,
    pub error: Option<String>,
}

impl RedirectSet {
    pub fn is_empty(&self) -> bool {
        self.input.is_none() && self.output.is_none() && self.error.is_none()
    }
}

/// Applies a whole redirection set. Order is part of the contract: error,
/// then input, then output, so redirecting both output and error to the
/// same file behaves predictably.
pub(crate) fn apply_all(redirects: &RedirectSet) {
    if let Some(ref filename) = redirects.error {
        apply(StreamRole::Error, filename);
    }
    if let Some(ref filename) = redirects.input {
        apply(StreamRole::Input, filename);
    }
    if let Some(ref filename) = redirects.output {
        apply(StreamRole::Output, filename);
    }
}

/// Opens `filename` and rebinds `role`'s stream to it, releasing the
/// temporary descriptor immediately. On failure the diagnostic names the
/// file and the original binding is kept.
pub(crate) fn apply(role: StreamRole, filename: &str) {
    let file = match role.open(filename) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("{}: Error. {}", filename, e);
            return;
        }
    };
    if let Err(e) = unistd::dup2(file.as_raw_fd(), role.target_fd()) {
        eprintln!("{}: Error. {}", filename, e);
    }
    // `file` drops here, closing the temporary descriptor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_set_is_empty() {
        assert!(RedirectSet::default().is_empty());
        let redirects = RedirectSet {
            output: Some("out".to_string()),
            ..Default::default()
        };
        assert!(!redirects.is_empty());
    }

    #[test]
    fn test_apply_missing_input_leaves_stream_bound() {
        // the open fails, so no stream is touched and nothing panics
        apply(StreamRole::Input, "/definitely/not/a/real/path");
        apply(StreamRole::Output, "/definitely/not/a/real/path");
    }
}
