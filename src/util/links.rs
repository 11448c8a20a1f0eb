use url::Url;

/// Check a post link before handing it to the system opener.
///
/// Only absolute http(s) URLs without control characters are passed on;
/// anything else could be interpreted by the opener as a command or path.
pub fn validate_url_for_open(raw: &str) -> Result<Url, String> {
    if raw.chars().any(char::is_control) {
        return Err("Refusing to open link with control characters".to_string());
    }
    let parsed = Url::parse(raw.trim()).map_err(|e| format!("Invalid link: {}", e))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(format!("Refusing to open {} link", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_web_links() {
        let url = validate_url_for_open("https://example.com/post?id=1").unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
        assert!(validate_url_for_open("http://example.com").is_ok());
    }

    #[test]
    fn test_rejects_other_schemes() {
        assert!(validate_url_for_open("file:///etc/passwd").is_err());
        assert!(validate_url_for_open("javascript:alert(1)").is_err());
        assert!(validate_url_for_open("not a url").is_err());
    }

    #[test]
    fn test_rejects_control_characters() {
        assert!(validate_url_for_open("https://example.com/\n--flag").is_err());
    }
}
