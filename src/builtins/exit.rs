use crate::builtins::{self, BuiltinCommand};
use crate::errors::Result;
use crate::shell::Shell;

pub struct Exit;

impl BuiltinCommand for Exit {
    const NAME: &'static str = builtins::EXIT_NAME;

    const HELP: &'static str = "\
exit: exit [n]
    Exit the shell with a status of N. If N is omitted, the exit status
    is 0. Any remaining background processes are killed.";

    fn run(shell: &mut Shell, args: Vec<String>) -> Result<()> {
        let status_code = args.first().map(|arg| {
            arg.parse::<i32>().unwrap_or_else(|_| {
                eprintln!("msh: exit: {}: numeric argument required", arg);
                2
            })
        });
        shell.exit(status_code)
    }
}
