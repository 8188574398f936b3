//! Response-header parsing over the accumulated header buffer.
//!
//! The engine delivers every header block of the transfer, so a followed
//! redirect chain leaves several blocks separated by blank lines. Accessors
//! report the final block — the response the transfer ended on.

/// Parse the final status code out of `raw` header bytes.
pub(crate) fn parse_status(raw: &[u8]) -> Option<u16> {
    let block = last_block(raw)?;
    let status_line = block.lines().find(|line| line.starts_with("HTTP/"))?;
    status_line.split_whitespace().nth(1)?.parse().ok()
}

/// Parse the final block's header fields as (name, value) pairs.
pub(crate) fn parse_headers(raw: &[u8]) -> Vec<(String, String)> {
    let Some(block) = last_block(raw) else {
        return Vec::new();
    };
    block
        .lines()
        .filter_map(|line| {
            let (name, value) = line.split_once(':')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), value.trim().to_string()))
        })
        .collect()
}

/// The last non-empty header block of the buffer. `None` when the buffer
/// holds no text (not finished yet, or a custom header sink is set).
fn last_block(raw: &[u8]) -> Option<&str> {
    let text = std::str::from_utf8(raw).ok()?;
    text.split("\r\n\r\n")
        .map(str::trim_end)
        .filter(|block| !block.is_empty())
        .last()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE: &[u8] = b"HTTP/1.1 200 OK\r\ncontent-type: text/plain\r\ncontent-length: 5\r\n\r\n";

    const REDIRECTED: &[u8] = b"HTTP/1.1 301 Moved Permanently\r\nlocation: /new\r\n\r\n\
        HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\n\r\n";

    #[test]
    fn parses_the_status_code() {
        assert_eq!(parse_status(SIMPLE), Some(200));
    }

    #[test]
    fn reports_the_final_status_of_a_redirect_chain() {
        assert_eq!(parse_status(REDIRECTED), Some(404));
    }

    #[test]
    fn parses_header_fields() {
        let headers = parse_headers(SIMPLE);
        assert_eq!(
            headers,
            vec![
                ("content-type".to_string(), "text/plain".to_string()),
                ("content-length".to_string(), "5".to_string()),
            ]
        );
    }

    #[test]
    fn redirect_chain_reports_the_final_headers() {
        let headers = parse_headers(REDIRECTED);
        assert_eq!(
            headers,
            vec![("content-length".to_string(), "0".to_string())]
        );
    }

    #[test]
    fn empty_buffer_parses_to_nothing() {
        assert_eq!(parse_status(b""), None);
        assert!(parse_headers(b"").is_empty());
    }

    #[test]
    fn garbage_lines_are_skipped() {
        let raw = b"HTTP/1.1 200 OK\r\nno-colon-line\r\nx-ok: yes\r\n\r\n";
        let headers = parse_headers(raw);
        assert_eq!(headers, vec![("x-ok".to_string(), "yes".to_string())]);
    }
}
