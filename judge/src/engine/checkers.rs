//! This module implements the output checker used by the judge engine: the
//! two tier line comparison that separates exact matches from
//! formatting-only mismatches from wrong answers in a single pass.
//!

use std::io::BufRead;

/// Classification of a captured output against the reference output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Comparison {
    /// Every line pair is identical byte for byte.
    ExactMatch,

    /// At least one line pair differs, but every differing pair becomes
    /// identical once whitespace is removed and case is folded.
    FormatMismatch,

    /// The outputs differ in content or in line count.
    WrongAnswer
}

/// Compare the captured output against the reference output line by line.
///
/// The two streams are walked in lockstep, one line pair in memory at a
/// time. A stream exhausted before the other is a wrong answer immediately,
/// as is a line pair that still differs after normalization. A line pair
/// that differs byte for byte but agrees once normalized only marks the run
/// as a format mismatch and scanning continues, so a later content
/// difference can still downgrade the result to a wrong answer. Lines are
/// compared as raw bytes; output that does not decode as text is simply
/// unequal.
pub fn compare<O, A>(mut output: O, mut answer: A) -> std::io::Result<Comparison>
    where O: BufRead, A: BufRead {
    let mut format_mismatch = false;

    loop {
        match (read_line(&mut output)?, read_line(&mut answer)?) {
            (None, None) => break,
            (Some(..), None) | (None, Some(..)) => return Ok(Comparison::WrongAnswer),
            (Some(output_line), Some(answer_line)) => {
                if output_line == answer_line {
                    continue;
                }
                if normalize(&output_line) == normalize(&answer_line) {
                    format_mismatch = true;
                } else {
                    return Ok(Comparison::WrongAnswer);
                }
            }
        }
    }

    if format_mismatch {
        Ok(Comparison::FormatMismatch)
    } else {
        Ok(Comparison::ExactMatch)
    }
}

/// Read the next line from the reader, keeping its terminator. Returns
/// `Ok(None)` at end of stream.
fn read_line<R>(reader: &mut R) -> std::io::Result<Option<Vec<u8>>>
    where R: BufRead {
    let mut line = Vec::new();
    if reader.read_until(b'\n', &mut line)? == 0 {
        Ok(None)
    } else {
        Ok(Some(line))
    }
}

/// Normalized form of a line: every ASCII whitespace byte removed and ASCII
/// uppercase letters folded to lowercase.
fn normalize(line: &[u8]) -> Vec<u8> {
    line.iter()
        .filter(|byte| !byte.is_ascii_whitespace())
        .map(|byte| byte.to_ascii_lowercase())
        .collect()
}


#[cfg(test)]
mod tests {
    use super::*;

    fn compare_bytes(output: &[u8], answer: &[u8]) -> Comparison {
        compare(output, answer).unwrap()
    }

    #[test]
    fn test_identical_outputs_match_exactly() {
        assert_eq!(compare_bytes(b"3\n7\n", b"3\n7\n"), Comparison::ExactMatch);
    }

    #[test]
    fn test_empty_outputs_match_exactly() {
        assert_eq!(compare_bytes(b"", b""), Comparison::ExactMatch);
    }

    #[test]
    fn test_internal_whitespace_is_a_format_mismatch() {
        assert_eq!(compare_bytes(b"3  7\n", b"3 7\n"), Comparison::FormatMismatch);
    }

    #[test]
    fn test_case_difference_is_a_format_mismatch() {
        assert_eq!(compare_bytes(b"Hello\n", b"hello\n"), Comparison::FormatMismatch);
    }

    #[test]
    fn test_missing_final_newline_is_a_format_mismatch() {
        assert_eq!(compare_bytes(b"hello", b"hello\n"), Comparison::FormatMismatch);
    }

    #[test]
    fn test_content_difference_is_a_wrong_answer() {
        assert_eq!(compare_bytes(b"3\n", b"4\n"), Comparison::WrongAnswer);
    }

    #[test]
    fn test_shorter_output_is_a_wrong_answer() {
        assert_eq!(compare_bytes(b"3\n", b"3\n7\n"), Comparison::WrongAnswer);
    }

    #[test]
    fn test_longer_output_is_a_wrong_answer() {
        assert_eq!(compare_bytes(b"3\n7\n9\n", b"3\n7\n"), Comparison::WrongAnswer);
    }

    #[test]
    fn test_format_mismatch_does_not_mask_a_later_wrong_answer() {
        assert_eq!(compare_bytes(b"3  7\n9\n", b"3 7\n8\n"), Comparison::WrongAnswer);
    }

    #[test]
    fn test_binary_output_is_a_wrong_answer() {
        assert_eq!(compare_bytes(b"\xff\xfe\n", b"hello\n"), Comparison::WrongAnswer);
    }
}
