use std::io::{self, BufRead, Write};

/// Print `prompt` and read one trimmed line.
///
/// Returns `None` at end of input. Values are returned as typed; coercion
/// and validation happen during feature assembly.
pub fn prompt_line<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    prompt: &str,
) -> io::Result<Option<String>> {
    write!(output, "{prompt}")?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Like [`prompt_line`], but an empty answer yields `default`.
pub fn prompt_or<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    prompt: &str,
    default: &str,
) -> io::Result<String> {
    let answer = prompt_line(input, output, &format!("{prompt} [{default}]: "))?;
    Ok(match answer {
        Some(value) if !value.is_empty() => value,
        _ => default.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_trimmed_lines_until_eof() {
        let mut input = "  80.5 \nabc\n".as_bytes();
        let mut output = Vec::new();
        assert_eq!(prompt_line(&mut input, &mut output, "PM10: ").unwrap(), Some("80.5".into()));
        assert_eq!(prompt_line(&mut input, &mut output, "NO2: ").unwrap(), Some("abc".into()));
        assert_eq!(prompt_line(&mut input, &mut output, "CO: ").unwrap(), None);
        assert_eq!(String::from_utf8(output).unwrap(), "PM10: NO2: CO: ");
    }

    #[test]
    fn blank_answer_takes_default() {
        let mut input = "\n".as_bytes();
        let mut output = Vec::new();
        let value = prompt_or(&mut input, &mut output, "Date", "2020-01-01").unwrap();
        assert_eq!(value, "2020-01-01");
    }
}
