use validator::ValidateEmail;

/// Validates that the input looks like a valid email address
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    !email.is_empty() && email.validate_email()
}

/// Validates a fully-qualified domain name for portfolio tracking.
/// Rules:
/// - at least two dot-separated labels, total length <= 253
/// - labels are 1-63 chars of ASCII letters, digits, or hyphens
/// - labels neither start nor end with a hyphen
/// - the TLD label is not all-numeric
pub fn is_valid_domain_name(domain: &str) -> bool {
    if domain.is_empty() || domain.len() > 253 {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }

    for label in &labels {
        if label.is_empty() || label.len() > 63 {
            return false;
        }
        if label.starts_with('-') || label.ends_with('-') {
            return false;
        }
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return false;
        }
    }

    // An all-numeric TLD is an IP octet, not a domain
    let tld = labels.last().unwrap();
    !tld.chars().all(|c| c.is_ascii_digit())
}

/// Extract the TLD of a domain name, without the leading dot.
pub fn tld_of(domain: &str) -> Option<&str> {
    domain.rsplit('.').next().filter(|t| !t.is_empty())
}
