use crate::types::Response;

/// Serialize a [`Response`] to a JSON string.
///
/// When `pretty` is `true` the output is indented for readability.
pub fn format_json(response: &Response, pretty: bool) -> String {
    let result = if pretty {
        serde_json::to_string_pretty(response)
    } else {
        serde_json::to_string(response)
    };
    result.unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
}

/// Render a [`Response`] in a human-readable debug format.
pub fn format_debug(response: &Response) -> String {
    let mut out = String::with_capacity(256);

    out.push_str("=== HTTP Response ===\n");
    out.push_str(&format!("Version: {}\n", response.version));
    out.push_str(&format!("Status:  {}\n", response.status_code));
    out.push_str(&format!("Reason:  {}\n", response.reason));

    out.push_str(&format!("\n--- Headers ({}) ---\n", response.headers.len()));
    for (name, value) in response.headers.sorted() {
        out.push_str(&format!("  {name}: {value}\n"));
    }

    if response.body.is_empty() {
        out.push_str("\n--- No Body ---\n");
    } else {
        out.push_str(&format!("\n--- Body ({} bytes) ---\n", response.body.len()));
        match response.body_as_str() {
            Some(s) => out.push_str(s),
            None => out.push_str(&format!("<binary data: {} bytes>", response.body.len())),
        }
        out.push('\n');
    }

    out.push_str("=====================\n");
    out
}

/// Render only the status line and headers (no body).
pub fn format_headers_only(response: &Response) -> String {
    let mut out = String::with_capacity(64 + response.headers.len() * 40);

    out.push_str(&format!("{} {}", response.version, response.status_code));
    if !response.reason.is_empty() {
        out.push(' ');
        out.push_str(&response.reason);
    }
    out.push('\n');

    for (name, value) in response.headers.sorted() {
        out.push_str(&format!("{name}: {value}\n"));
    }

    out
}
