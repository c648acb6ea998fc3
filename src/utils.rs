//! Header and URL parsing helpers for filename and charset discovery.

/// Extract a filename from a `Content-Disposition` header value.
///
/// Handles both the plain `filename="name.ext"` parameter and the RFC 5987
/// `filename*=charset'lang'percent-encoded` form. Surrounding single or
/// double quotes are stripped and the extension is kept.
///
/// # Arguments
///
/// * `value` - The raw header value, e.g. `attachment; filename="report.pdf"`
///
/// # Returns
///
/// Returns the first filename the header carries, or `None` when no
/// `filename` parameter is present or the parameter is empty.
///
/// # Examples
///
/// ```
/// use parfetch::utils::file_name_from_disposition;
///
/// let name = file_name_from_disposition(r#"attachment; filename="report.pdf""#);
/// assert_eq!(name.as_deref(), Some("report.pdf"));
/// ```
#[must_use]
pub fn file_name_from_disposition(value: &str) -> Option<String> {
    for part in value.split(';') {
        let Some((name, val)) = part.trim().split_once('=') else {
            continue;
        };
        match name.trim() {
            "filename" => {
                let trimmed = val.trim().trim_matches(['"', '\'']);
                if !trimmed.is_empty() {
                    return Some(trimmed.to_string());
                }
            }
            "filename*" => {
                // RFC 5987 format: charset'language'percent-encoded-name
                if let Some(idx) = val.rfind('\'')
                    && let Ok(decoded) = urlencoding::decode(&val[idx + 1..])
                    && !decoded.is_empty()
                {
                    return Some(decoded.into_owned());
                }
            }
            _ => {}
        }
    }
    None
}

/// Extract the final path segment of a URL as a filename.
///
/// # Arguments
///
/// * `url` - An absolute URL, e.g. `https://example.com/files/archive.zip`
///
/// # Returns
///
/// Returns the last non-empty path segment, or `None` when the URL does not
/// parse or its path ends in `/`.
///
/// # Examples
///
/// ```
/// use parfetch::utils::file_name_from_url;
///
/// let name = file_name_from_url("https://example.com/files/archive.zip");
/// assert_eq!(name.as_deref(), Some("archive.zip"));
/// assert_eq!(file_name_from_url("https://example.com/"), None);
/// ```
#[must_use]
pub fn file_name_from_url(url: &str) -> Option<String> {
    if let Ok(parsed) = url::Url::parse(url)
        && let Some(mut segments) = parsed.path_segments()
        && let Some(last) = segments.next_back()
        && !last.is_empty()
    {
        return Some(last.to_string());
    }
    None
}

/// Pull the `charset` parameter out of a `Content-Type` header value.
///
/// The parameter name is matched case-insensitively and surrounding quotes
/// are removed from the value.
///
/// # Arguments
///
/// * `value` - The raw header value, e.g. `text/html; charset=ISO-8859-1`
///
/// # Returns
///
/// Returns the charset name, or `None` when the header has no charset
/// parameter.
///
/// # Examples
///
/// ```
/// use parfetch::utils::charset_from_content_type;
///
/// let charset = charset_from_content_type("text/html; charset=utf-8");
/// assert_eq!(charset.as_deref(), Some("utf-8"));
/// ```
#[must_use]
pub fn charset_from_content_type(value: &str) -> Option<String> {
    for part in value.split(';') {
        if let Some((name, val)) = part.trim().split_once('=')
            && name.trim().eq_ignore_ascii_case("charset")
        {
            let charset = val.trim().trim_matches(['"', '\'']);
            if !charset.is_empty() {
                return Some(charset.to_string());
            }
        }
    }
    None
}
