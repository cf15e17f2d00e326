pub const BEARER_PREFIX: &str = "Bearer ";

/// Strip the `Bearer ` scheme from an authorization header value.
///
/// Values without the prefix are returned unchanged, so callers that send a
/// bare token still work. This is not a validation step.
pub fn parse_bearer(header_value: &str) -> &str {
    header_value
        .strip_prefix(BEARER_PREFIX)
        .unwrap_or(header_value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_prefix() {
        assert_eq!(parse_bearer("Bearer abc.def.ghi"), "abc.def.ghi");
    }

    #[test]
    fn test_bare_token_unchanged() {
        assert_eq!(parse_bearer("abc.def.ghi"), "abc.def.ghi");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(parse_bearer(""), "");
        assert_eq!(parse_bearer("Bearer "), "");
    }

    #[test]
    fn test_prefix_is_case_sensitive() {
        assert_eq!(parse_bearer("bearer abc"), "bearer abc");
        assert_eq!(parse_bearer("Bearer  abc"), " abc");
    }
}
