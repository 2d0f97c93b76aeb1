use nix::libc;

use crate::builtins::{self, BuiltinCommand};
use crate::errors::{Error, Result};
use crate::shell::Shell;

pub struct Umask;

impl BuiltinCommand for Umask {
    const NAME: &'static str = builtins::UMASK_NAME;

    const HELP: &'static str = "\
umask: umask [mode]
    Sets the file creation mask to MODE, given as up to four octal digits.
    With no MODE, prints the current mask.";

    fn run(shell: &mut Shell, args: Vec<String>) -> Result<()> {
        let arg = match args.first() {
            Some(arg) => arg,
            None => {
                println!("{:04}", shell.formatted_mask());
                return Ok(());
            }
        };
        let mask = parse_octal(arg).ok_or_else(|| Error::invalid_mask(arg))?;
        // the digits are octal but redisplay as the literal digit string
        let formatted = arg
            .parse::<u32>()
            .map_err(|_| Error::invalid_mask(arg))?;
        shell.set_mask(mask, formatted);
        println!("{:04}", formatted);
        Ok(())
    }
}

/// Accepts one to four octal digits.
fn parse_octal(arg: &str) -> Option<libc::mode_t> {
    if arg.is_empty() || arg.len() > 4 || !arg.chars().all(|c| c.is_digit(8)) {
        return None;
    }
    u32::from_str_radix(arg, 8).ok().map(|mask| mask as libc::mode_t)
}
