use std::io::{self, BufRead, Write};

/// Ask `question` on `output` and read one answer line from `input`.
///
/// Only `y` or `yes` (any case) counts as agreement; EOF is a refusal.
pub(crate) fn confirm(
    question: &str,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> io::Result<bool> {
    write!(output, "{question} (y/n): ")?;
    output.flush()?;

    let mut answer = String::new();
    if input.read_line(&mut answer)? == 0 {
        writeln!(output)?;
        return Ok(false);
    }
    Ok(is_affirmative(&answer))
}

pub(crate) fn is_affirmative(answer: &str) -> bool {
    let answer = answer.trim();
    answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
}
