//! HTTP-flavored connection wrapper.

use std::ops::Deref;
use std::rc::Rc;

use towline::Connection;

use crate::response;

/// A connection with HTTP-specific setters and response accessors.
///
/// Wraps a shared [`Connection`] and derefs to it, so every core setter and
/// getter stays available. Hand [`connection`](HttpConnection::connection)
/// to [`TransferDriver::start`](towline::TransferDriver::start) to run it.
pub struct HttpConnection {
    conn: Rc<Connection>,
}

impl HttpConnection {
    /// Create an idle HTTP connection.
    pub fn new() -> Self {
        Self {
            conn: Connection::new(),
        }
    }

    /// Wrap an existing connection.
    pub fn from_connection(conn: Rc<Connection>) -> Self {
        Self { conn }
    }

    /// The underlying shared connection.
    pub fn connection(&self) -> &Rc<Connection> {
        &self.conn
    }

    // ── Request configuration ───────────────────────────────────────

    /// Issue a POST request instead of GET.
    pub fn set_use_post(&self, use_post: bool) {
        self.conn.update_options(|options| options.use_post = use_post);
    }

    /// Replace all request headers.
    pub fn set_request_headers<I, K, V>(&self, headers: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let lines = headers
            .into_iter()
            .map(|(name, value)| header_line(name.as_ref(), value.as_ref()))
            .collect();
        self.conn
            .update_options(|options| options.request_headers = lines);
    }

    /// Append one request header.
    pub fn add_request_header(&self, name: &str, value: &str) {
        let line = header_line(name, value);
        self.conn
            .update_options(|options| options.request_headers.push(line));
    }

    /// Follow redirect responses automatically. Default false.
    pub fn set_auto_redirect(&self, auto_redirect: bool) {
        self.conn
            .update_options(|options| options.follow_redirects = auto_redirect);
    }

    /// Upper bound on followed redirects. `None` means unlimited.
    pub fn set_max_auto_redirect_count(&self, count: Option<u32>) {
        self.conn
            .update_options(|options| options.max_redirects = count);
    }

    // ── Response accessors ──────────────────────────────────────────

    /// The final HTTP status code. `None` until the transfer finishes, or
    /// when a custom write-header callback swallows the header data.
    pub fn status_code(&self) -> Option<u16> {
        response::parse_status(&self.conn.response_header())
    }

    /// The final response's header fields as (name, value) pairs, in wire
    /// order. Empty until the transfer finishes, or when a custom
    /// write-header callback is set. A followed redirect chain reports the
    /// response the transfer ended on.
    pub fn response_headers(&self) -> Vec<(String, String)> {
        response::parse_headers(&self.conn.response_header())
    }

    /// First response header matching `name`, case-insensitively.
    pub fn response_header_value(&self, name: &str) -> Option<String> {
        let lower = name.to_ascii_lowercase();
        self.response_headers()
            .into_iter()
            .find(|(k, _)| k.to_ascii_lowercase() == lower)
            .map(|(_, v)| v)
    }
}

impl Default for HttpConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for HttpConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.conn
    }
}

fn header_line(name: &str, value: &str) -> String {
    format!("{name}: {value}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use towline::TransferIo;

    #[test]
    fn request_headers_accumulate_as_lines() {
        let http = HttpConnection::new();
        http.set_request_headers([("accept", "text/plain"), ("x-a", "1")]);
        http.add_request_header("x-b", "2");
        http.set_use_post(true);

        let mut captured = Vec::new();
        http.connection()
            .update_options(|options| captured = options.request_headers.clone());
        assert_eq!(captured, vec!["accept: text/plain", "x-a: 1", "x-b: 2"]);
    }

    #[test]
    fn status_and_headers_come_from_the_accumulated_buffer() {
        let http = HttpConnection::new();
        assert_eq!(http.status_code(), None);

        // Feed the buffer the way the engine does during a run.
        http.connection()
            .write_header(b"HTTP/1.1 200 OK\r\nserver: tow\r\n\r\n");
        assert_eq!(http.status_code(), Some(200));
        assert_eq!(
            http.response_header_value("SERVER").as_deref(),
            Some("tow")
        );
    }
}
