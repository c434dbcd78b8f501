use anyhow::{Result, anyhow};

/// Normalizes a domain for issuance: trims, drops the trailing dot, converts
/// IDNs to their ASCII form and lowercases.
///
/// http-01 cannot prove control of a wildcard, so those are rejected here.
pub fn normalize_domain(input: &str) -> Result<String> {
    let trimmed = input.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        return Err(anyhow!("domain name is required"));
    }
    if trimmed.starts_with("*.") {
        return Err(anyhow!(
            "wildcard domain {trimmed} cannot be validated over http-01"
        ));
    }
    let ascii = idna::domain_to_ascii(trimmed)
        .map_err(|err| anyhow!("invalid domain name: {err}"))?;
    if !ascii.contains('.') {
        return Err(anyhow!("domain {ascii} is not fully qualified"));
    }
    Ok(ascii.to_lowercase())
}

pub fn normalize_domain_for_display(input: &str) -> String {
    let trimmed = input.trim().trim_end_matches('.');
    let (unicode, _) = idna::domain_to_unicode(trimmed);
    unicode.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_trailing_dot() {
        assert_eq!(normalize_domain(" Example.COM. ").unwrap(), "example.com");
    }

    #[test]
    fn converts_idn_to_ascii() {
        assert_eq!(normalize_domain("testé.fr").unwrap(), "xn--test-epa.fr");
        assert_eq!(normalize_domain_for_display("xn--test-epa.fr"), "testé.fr");
    }

    #[test]
    fn rejects_empty_wildcard_and_bare_labels() {
        assert!(normalize_domain("  ").is_err());
        assert!(normalize_domain("*.example.com").is_err());
        assert!(normalize_domain("localhost").is_err());
    }
}
