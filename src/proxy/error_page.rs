//! HTML Error Responses

/// Builds a complete HTTP/1.0 error response with a small HTML body.
///
/// `cause` is the offending input (e.g. the rejected method) and is echoed,
/// HTML-escaped, into the body after `long_msg`.
pub fn render(cause: &str, status: u16, short_msg: &str, long_msg: &str) -> Vec<u8> {
    let cause = escape_html(cause);
    let body = format!(
        "<html><title>Proxy Error</title>\
         <body bgcolor=\"ffffff\">\r\n\
         {status}: {short_msg}\r\n\
         <p>{long_msg}: {cause}\r\n\
         <hr><em>mini_proxy</em>\r\n"
    );

    let mut response = format!(
        "HTTP/1.0 {status} {short_msg}\r\n\
         Content-type: text/html\r\n\
         Content-length: {}\r\n\r\n",
        body.len()
    )
    .into_bytes();
    response.extend_from_slice(body.as_bytes());
    response
}

/// Escapes the characters that would let client input open markup.
fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// 501 response for a request method the proxy does not serve.
pub fn not_implemented(method: &str) -> Vec<u8> {
    render(
        method,
        501,
        "Not Implemented",
        "Proxy does not implement this method",
    )
}
