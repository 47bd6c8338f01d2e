//! CLI argument structs and input validators.

use clap::Parser;

use crate::config::MAX_DEPTH_LIMIT;

/// Arguments for the `tree` command
#[derive(Parser, Debug, Clone)]
pub struct TreeArgs {
    /// Person to build the tree from
    #[arg(value_parser = validate_person_id)]
    pub root: String,

    /// Generations to show above the root (0 shows the root alone)
    ///
    /// Defaults to `traversal.max-depth` from the config file.
    #[arg(short, long, value_parser = validate_depth)]
    pub depth: Option<usize>,
}

/// Arguments for the `add-parent` command
#[derive(Parser, Debug, Clone)]
pub struct AddParentArgs {
    /// Person gaining a parent
    #[arg(value_parser = validate_person_id)]
    pub child: String,

    /// Person to link as the parent
    #[arg(value_parser = validate_person_id)]
    pub parent: String,

    /// Generations of the rebuilt tree to show above the child
    #[arg(short, long, value_parser = validate_depth)]
    pub depth: Option<usize>,

    /// Write the edited records back to the records file
    #[arg(long)]
    pub save: bool,
}

/// Validate a person ID argument.
///
/// # Errors
///
/// Returns a message if the ID is empty or contains whitespace.
pub fn validate_person_id(s: &str) -> Result<String, String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err("Person ID cannot be empty".to_string());
    }
    if trimmed.chars().any(char::is_whitespace) {
        return Err(format!("Person ID cannot contain whitespace: '{}'", trimmed));
    }
    Ok(trimmed.to_string())
}

/// Validate a generation count.
///
/// # Errors
///
/// Returns a message if the value is not a number or exceeds the depth limit.
pub fn validate_depth(s: &str) -> Result<usize, String> {
    let depth: usize = s
        .trim()
        .parse()
        .map_err(|_| format!("Invalid depth: '{}'. Expected a non-negative integer", s))?;
    if depth > MAX_DEPTH_LIMIT {
        return Err(format!("Depth cannot exceed {}", MAX_DEPTH_LIMIT));
    }
    Ok(depth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("7", "7")]
    #[case("  I42 ", "I42")]
    fn test_validate_person_id_accepts(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(validate_person_id(input), Ok(expected.to_string()));
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("a b")]
    fn test_validate_person_id_rejects(#[case] input: &str) {
        assert!(validate_person_id(input).is_err());
    }

    #[rstest]
    #[case("0", Some(0))]
    #[case("3", Some(3))]
    #[case("64", Some(64))]
    #[case("65", None)]
    #[case("-1", None)]
    #[case("two", None)]
    fn test_validate_depth(#[case] input: &str, #[case] expected: Option<usize>) {
        assert_eq!(validate_depth(input).ok(), expected);
    }
}
