//! Parsing for the interactive `user` prompt.

use anyhow::{Result, anyhow};

/// Commands accepted at the user prompt.
#[derive(Debug, PartialEq, Eq)]
pub enum UserCommand {
    /// `cfg N`: ask for a DSS of N disks.
    Configure { disk_count: u16 },
    /// `bye`: deregister and leave.
    Bye,
}

impl UserCommand {
    /// Parses one input line. Blank lines yield `Ok(None)`; anything
    /// unrecognised yields an error carrying the usage text to print.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        let parts: Vec<&str> = trimmed.split_whitespace().collect();
        match parts.as_slice() {
            ["bye"] => Ok(Some(UserCommand::Bye)),
            // A bare `cfg` is not a configure attempt.
            ["cfg", count, ..] => {
                let disk_count = count
                    .parse::<u16>()
                    .map_err(|_| anyhow!("usage: cfg N"))?;
                Ok(Some(UserCommand::Configure { disk_count }))
            }
            _ => Err(anyhow!("commands: cfg N | bye")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_lines_are_ignored() {
        assert!(matches!(UserCommand::parse(""), Ok(None)));
        assert!(matches!(UserCommand::parse("   \n"), Ok(None)));
    }

    #[test]
    fn test_configure() {
        assert_eq!(
            UserCommand::parse("cfg 3\n").unwrap(),
            Some(UserCommand::Configure { disk_count: 3 })
        );
        assert_eq!(
            UserCommand::parse("  cfg 0 ").unwrap(),
            Some(UserCommand::Configure { disk_count: 0 })
        );
    }

    #[test]
    fn test_configure_usage() {
        for line in ["cfg x", "cfg -1", "cfg 70000", "  cfg  x  "] {
            let err = UserCommand::parse(line).unwrap_err();
            assert_eq!(err.to_string(), "usage: cfg N", "line {line:?}");
        }
    }

    #[test]
    fn test_bye_and_unknown() {
        assert_eq!(UserCommand::parse("bye").unwrap(), Some(UserCommand::Bye));
        for line in ["hello", "cfg", "  cfg  ", "cfg3", "bye now"] {
            let err = UserCommand::parse(line).unwrap_err();
            assert_eq!(err.to_string(), "commands: cfg N | bye", "line {line:?}");
        }
    }
}
