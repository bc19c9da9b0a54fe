//! Command line parser
//!
//! Simple split on whitespace, max 3 positional arguments. Commands that
//! take free text or a long byte list (`automsg`, `eewrite`) use `rest`,
//! the line after the command token.

/// Parsed command with up to 3 arguments
#[derive(Debug, Clone)]
pub struct ParsedCommand<'a> {
    /// The command name (first token)
    pub command: &'a str,
    /// Up to 3 arguments
    pub args: [Option<&'a str>; 3],
    /// Everything after the command token, leading whitespace stripped
    pub rest: &'a str,
}

impl<'a> ParsedCommand<'a> {
    /// Create empty command
    pub const fn empty() -> Self {
        Self {
            command: "",
            args: [None, None, None],
            rest: "",
        }
    }

    /// Get argument by index (0-based)
    pub fn arg(&self, idx: usize) -> Option<&'a str> {
        self.args.get(idx).copied().flatten()
    }
}

/// Parse a command line into command and arguments
pub fn parse_line(line: &str) -> ParsedCommand<'_> {
    let line = line.trim_start();
    let mut parts = line.split_whitespace();

    let command = parts.next().unwrap_or("");
    // the command token is a prefix of the trimmed line, so this split is
    // on an ASCII-safe boundary
    let rest = line[command.len()..].trim_start();

    let mut args = [None, None, None];
    for (i, arg) in parts.take(3).enumerate() {
        args[i] = Some(arg);
    }

    ParsedCommand { command, args, rest }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let cmd = parse_line("baud 45");
        assert_eq!(cmd.command, "baud");
        assert_eq!(cmd.arg(0), Some("45"));
        assert_eq!(cmd.arg(1), None);
        assert_eq!(cmd.rest, "45");
    }

    #[test]
    fn test_parse_empty() {
        let cmd = parse_line("");
        assert_eq!(cmd.command, "");
        assert_eq!(cmd.arg(0), None);
        assert_eq!(cmd.rest, "");
    }

    #[test]
    fn test_parse_extra_whitespace() {
        let cmd = parse_line("   table   3  ");
        assert_eq!(cmd.command, "table");
        assert_eq!(cmd.arg(0), Some("3"));
    }

    #[test]
    fn test_rest_preserves_inner_spacing() {
        let cmd = parse_line("automsg HELLO  WORLD");
        assert_eq!(cmd.command, "automsg");
        assert_eq!(cmd.rest, "HELLO  WORLD");
    }

    #[test]
    fn test_args_capped_at_three() {
        let cmd = parse_line("eewrite 0010 41 42 43");
        assert_eq!(cmd.arg(0), Some("0010"));
        assert_eq!(cmd.arg(2), Some("42"));
        // the fourth token is only reachable through rest
        assert_eq!(cmd.rest, "0010 41 42 43");
    }
}
