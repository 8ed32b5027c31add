use std::io::{self, BufRead, Write};

/// Asks a yes/no question until it gets an answer.
///
/// Accepts `y`, `yes`, `n`, `no` in any case. An empty line or end of input
/// picks `default`.
pub fn confirm<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    question: &str,
    default: bool,
) -> io::Result<bool> {
    let hint = if default { "Y/n" } else { "y/N" };
    let mut line = String::new();

    loop {
        write!(output, "{} ({}): ", question, hint)?;
        output.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            writeln!(output)?;
            return Ok(default);
        }

        match line.trim().to_ascii_lowercase().as_str() {
            "" => return Ok(default),
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            other => writeln!(output, "Please answer y or n, not '{}'.", other)?,
        }
    }
}
