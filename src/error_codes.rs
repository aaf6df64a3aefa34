//! Human-readable descriptions for marketplace error status codes.

/// Look up the description for a status code.
/// Unknown codes return `None` and callers fall back to the raw status.
pub fn lookup(status: &str) -> Option<&'static str> {
    let desc = match status {
        "0" => "Network error",
        "401" => "Unauthorized",
        "403" => "Forbidden",
        "404" => "Not found",
        "409" => "Conflict",
        "426" => "Too many requests",
        "429" => "Too many requests",
        "458" => "Verification required",
        "459" => "Captcha triggered",
        "461" => "Permission denied",
        "463" => "Item no longer available",
        "478" => "No longer available",
        "482" => "Invalid price",
        "512" => "Temporarily blocked",
        "521" => "Temporarily blocked",
        _ => return None,
    };
    Some(desc)
}

/// Formatted `description(status)` text for progress logs, degrading to
/// the bare status when no mapping exists.
pub fn describe(status: &str) -> String {
    match lookup(status) {
        Some(desc) => format!("{desc}({status})"),
        None => status.to_string(),
    }
}
