// 🪪 PAN identifiers - input validation
// Format rule: exactly 10 alphanumeric characters. No trimming, no case folding.

/// Required identifier length.
pub const PAN_LENGTH: usize = 10;

pub fn is_valid_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().count() == PAN_LENGTH && s.chars().all(char::is_alphanumeric)
}

/// Split a newline-separated block into trimmed, non-blank identifiers.
pub fn parse_identifiers(block: &str) -> Vec<String> {
    block
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Offending identifiers, in input order.
pub fn invalid_identifiers(identifiers: &[String]) -> Vec<String> {
    identifiers
        .iter()
        .filter(|pan| !is_valid_identifier(pan))
        .cloned()
        .collect()
}
