use crate::redirect::RedirectSet;

/// A single pipeline stage: the program name followed by its arguments.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Command {
    pub argv: Vec<String>,
}

impl Command {
    /// # Panics
    /// Panics if `argv` is empty; the parser never produces such a command.
    pub fn program(&self) -> &str {
        &self.argv[0]
    }

    pub fn args(&self) -> &[String] {
        &self.argv[1..]
    }
}

/// Everything the executor needs for one parsed input line.
#[derive(Debug, Default, PartialEq)]
pub struct CommandLine {
    /// Verbatim (trimmed) input line, used for job announcements.
    pub input: String,
    /// The commands to execute, in pipe order.
    pub commands: Vec<Command>,
    /// Redirections, applied to the pipeline as a whole.
    pub redirects: RedirectSet,
    /// Run the pipeline in the background, defaults to false.
    pub background: bool,
}
