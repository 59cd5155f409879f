//! Program text
//!
//! Programs are entered as hex text, e.g. `A9 03 8D 20 00 00`. Whitespace
//! anywhere is ignored; what remains must be a non-empty, even-length run of
//! hex digits.

use kernel_api::KernelError;

/// Parses hex program text into an image
pub fn parse_program_text(text: &str) -> Result<Vec<u8>, KernelError> {
    let digits: String = text.chars().filter(|c| !c.is_whitespace()).collect();

    if digits.is_empty() {
        return Err(KernelError::InvalidProgram("program is empty".to_string()));
    }
    hex::decode(&digits).map_err(|err| KernelError::InvalidProgram(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_spaced_and_packed() {
        assert_eq!(
            parse_program_text("A9 03 8d2000\n00").unwrap(),
            vec![0xA9, 0x03, 0x8D, 0x20, 0x00, 0x00]
        );
    }

    #[test]
    fn test_rejects_empty() {
        assert!(matches!(
            parse_program_text("  \n\t"),
            Err(KernelError::InvalidProgram(_))
        ));
    }

    #[test]
    fn test_rejects_non_hex() {
        assert!(matches!(
            parse_program_text("A9 0G"),
            Err(KernelError::InvalidProgram(_))
        ));
    }

    #[test]
    fn test_lowercase_and_uppercase_agree() {
        assert_eq!(
            parse_program_text("ff Ea 0d").unwrap(),
            parse_program_text("FFEA0D").unwrap()
        );
    }

    #[test]
    fn test_error_names_the_bad_character() {
        let Err(KernelError::InvalidProgram(detail)) = parse_program_text("A9 0G") else {
            panic!("expected an invalid program error");
        };
        assert!(detail.contains('G'));
    }

    #[test]
    fn test_rejects_odd_length() {
        assert!(matches!(
            parse_program_text("A9 0"),
            Err(KernelError::InvalidProgram(_))
        ));
    }
}
