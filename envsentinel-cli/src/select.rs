//! Minimal interactive prompts.

use std::io::{self, Write};

/// Print a numbered menu and read a selection from stdin.
///
/// Accepts comma-separated indices and ranges (`1,3-5`), `all`, or an empty
/// line to select nothing. Returns zero-based indices.
pub fn multi_select(prompt: &str, options: &[String]) -> io::Result<Vec<usize>> {
    for (i, option) in options.iter().enumerate() {
        println!("  {}. {}", i + 1, option);
    }
    print!("{prompt} (e.g. 1,3-5 or 'all'; empty to cancel): ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    parse_selection(&line, options.len())
}

fn parse_selection(input: &str, len: usize) -> io::Result<Vec<usize>> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(Vec::new());
    }
    if input.eq_ignore_ascii_case("all") {
        return Ok((0..len).collect());
    }

    let mut selected = Vec::new();
    for token in input.split(',') {
        let token = token.trim();
        let (start, end) = match token.split_once('-') {
            Some((a, b)) => (parse_index(a, len)?, parse_index(b, len)?),
            None => {
                let index = parse_index(token, len)?;
                (index, index)
            }
        };

        if start > end {
            return Err(invalid(token));
        }
        for index in start..=end {
            if !selected.contains(&index) {
                selected.push(index);
            }
        }
    }

    Ok(selected)
}

fn parse_index(token: &str, len: usize) -> io::Result<usize> {
    let number: usize = token.trim().parse().map_err(|_| invalid(token))?;
    if number == 0 || number > len {
        return Err(invalid(token));
    }
    Ok(number - 1)
}

fn invalid(token: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("invalid selection: {token:?}"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_and_list() {
        assert_eq!(parse_selection("2", 3).unwrap(), vec![1]);
        assert_eq!(parse_selection("1, 3", 3).unwrap(), vec![0, 2]);
    }

    #[test]
    fn test_parse_range() {
        assert_eq!(parse_selection("1-3", 5).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_parse_all_and_empty() {
        assert_eq!(parse_selection("all", 3).unwrap(), vec![0, 1, 2]);
        assert!(parse_selection("\n", 3).unwrap().is_empty());
    }

    #[test]
    fn test_parse_deduplicates() {
        assert_eq!(parse_selection("2,1-2", 3).unwrap(), vec![1, 0]);
    }

    #[test]
    fn test_parse_rejects_out_of_range() {
        assert!(parse_selection("0", 3).is_err());
        assert!(parse_selection("4", 3).is_err());
        assert!(parse_selection("3-1", 3).is_err());
        assert!(parse_selection("x", 3).is_err());
    }
}
