//! Operator confirmation before archiving.

use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use std::path::Path;

use crate::config::Config;
use crate::process::Cmd;

const QUESTION: &str = "Does this look like a correct Linux root filesystem? (y/n): ";
const REPROMPT: &str = "Please enter 'y' for yes or 'n' for no.";

/// List the mounted filesystem (`ls -la`) for the operator to inspect.
pub fn list_contents(root: &Path, config: &Config) -> Result<String> {
    let result = Cmd::new(&config.ls)
        .arg("-la")
        .arg_path(root)
        .elevated(config.sudo())
        .error_msg(format!("Failed to list {}", root.display()))
        .run()?;
    Ok(result.stdout)
}

/// Ask until the operator answers yes or no.
///
/// End of input counts as "no".
pub fn confirm<R, W>(input: &mut R, output: &mut W) -> Result<bool>
where
    R: BufRead + ?Sized,
    W: Write + ?Sized,
{
    loop {
        write!(output, "{QUESTION}")?;
        output.flush()?;

        let mut line = String::new();
        let n = input
            .read_line(&mut line)
            .context("Failed to read confirmation")?;
        if n == 0 {
            writeln!(output)?;
            return Ok(false);
        }

        match line.trim().to_lowercase().as_str() {
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ => writeln!(output, "{REPROMPT}")?,
        }
    }
}
