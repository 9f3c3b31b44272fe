use super::{ScanError, ScanErrorKind};

/// A physical-line-independent statement group with string literals blanked
/// out and comments removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LogicalLine {
    pub(crate) line: usize,
    pub(crate) text: String,
}

/// Splits Python source into logical lines, joining bracket and backslash
/// continuations. String literal contents are replaced by `""` so nothing
/// inside a string can look like code.
pub(crate) fn logical_lines(source: &str) -> Result<Vec<LogicalLine>, ScanError> {
    let chars: Vec<char> = source.chars().collect();
    let mut lines = Vec::new();
    let mut buffer = String::new();
    let mut depth: usize = 0;
    let mut line = 1;
    let mut start_line = 1;
    let mut idx = 0;

    while idx < chars.len() {
        let ch = chars[idx];
        match ch {
            '#' => {
                while idx < chars.len() && chars[idx] != '\n' {
                    idx += 1;
                }
                continue;
            }
            '\'' | '"' => {
                idx = skip_string(&chars, idx, &mut line)?;
                buffer.push_str("\"\"");
                continue;
            }
            '\\' => {
                let next = chars.get(idx + 1).copied();
                if next == Some('\n') {
                    line += 1;
                    buffer.push(' ');
                    idx += 2;
                    continue;
                }
                if next == Some('\r') && chars.get(idx + 2) == Some(&'\n') {
                    line += 1;
                    buffer.push(' ');
                    idx += 3;
                    continue;
                }
                buffer.push(ch);
            }
            '(' | '[' | '{' => {
                depth += 1;
                buffer.push(ch);
            }
            ')' | ']' | '}' => {
                if depth == 0 {
                    return Err(ScanError::new(line, ScanErrorKind::UnbalancedBracket));
                }
                depth -= 1;
                buffer.push(ch);
            }
            '\n' => {
                line += 1;
                if depth > 0 {
                    buffer.push(' ');
                } else {
                    flush(&mut lines, &mut buffer, start_line);
                    start_line = line;
                }
            }
            '\r' => {}
            _ => buffer.push(ch),
        }
        idx += 1;
    }

    if depth > 0 {
        return Err(ScanError::new(
            start_line,
            ScanErrorKind::UnbalancedBracket,
        ));
    }
    flush(&mut lines, &mut buffer, start_line);
    Ok(lines)
}

fn flush(lines: &mut Vec<LogicalLine>, buffer: &mut String, start_line: usize) {
    if !buffer.trim().is_empty() {
        lines.push(LogicalLine {
            line: start_line,
            text: std::mem::take(buffer),
        });
    }
    buffer.clear();
}

/// Consumes a string literal starting at `start` (the opening quote) and
/// returns the index just past its closing quote. Prefix letters (`r`, `b`,
/// `f`, ...) were already pushed as ordinary identifier characters.
fn skip_string(chars: &[char], start: usize, line: &mut usize) -> Result<usize, ScanError> {
    let quote = chars[start];
    let opened_at = *line;
    let triple = chars.get(start + 1) == Some(&quote) && chars.get(start + 2) == Some(&quote);
    let mut idx = if triple { start + 3 } else { start + 1 };

    while idx < chars.len() {
        let ch = chars[idx];
        match ch {
            '\\' => {
                match (chars.get(idx + 1), chars.get(idx + 2)) {
                    (Some('\n'), _) => {
                        *line += 1;
                        idx += 2;
                    }
                    (Some('\r'), Some('\n')) => {
                        *line += 1;
                        idx += 3;
                    }
                    _ => idx += 2,
                }
                continue;
            }
            '\n' => {
                if !triple {
                    return Err(ScanError::new(
                        opened_at,
                        ScanErrorKind::UnterminatedString,
                    ));
                }
                *line += 1;
            }
            _ if ch == quote => {
                if !triple {
                    return Ok(idx + 1);
                }
                if chars.get(idx + 1) == Some(&quote) && chars.get(idx + 2) == Some(&quote) {
                    return Ok(idx + 3);
                }
            }
            _ => {}
        }
        idx += 1;
    }

    Err(ScanError::new(
        opened_at,
        ScanErrorKind::UnterminatedString,
    ))
}
