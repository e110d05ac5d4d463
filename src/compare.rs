//! Output comparison for problems without a custom checker

/// Decides whether produced output matches the reference answer
///
/// Lines are split on `\n`. Everything not covered by an enabled relaxation
/// has to match byte for byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Comparator {
    /// Ignore ASCII whitespace at the end of every line (covers `\r` of CRLF)
    pub ignore_trailing_whitespace: bool,
    /// Ignore empty lines at the end of the output
    pub ignore_trailing_blank_lines: bool,
}

impl Default for Comparator {
    fn default() -> Self {
        Self {
            ignore_trailing_whitespace: true,
            ignore_trailing_blank_lines: true,
        }
    }
}

impl Comparator {
    /// Byte-exact comparison
    pub fn strict() -> Self {
        Self {
            ignore_trailing_whitespace: false,
            ignore_trailing_blank_lines: false,
        }
    }

    pub fn matches(&self, expected: &[u8], actual: &[u8]) -> bool {
        self.normalize(expected) == self.normalize(actual)
    }

    fn normalize<'a>(&self, output: &'a [u8]) -> Vec<&'a [u8]> {
        let mut lines: Vec<&[u8]> = output
            .split(|&b| b == b'\n')
            .map(|line| {
                if self.ignore_trailing_whitespace {
                    line.trim_ascii_end()
                } else {
                    line
                }
            })
            .collect();

        if self.ignore_trailing_blank_lines {
            while lines.last().is_some_and(|line| line.is_empty()) {
                lines.pop();
            }
        }
        lines
    }
}
