//! Loopback receiver for the popup flow, and callback URL parsing
//!
//! The popup flow listens on `127.0.0.1` for the provider's redirect. The
//! redirect flow has no listener: the same parameters arrive on the landing
//! URL of the next start and go through [`CallbackParams::from_url`].

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;

const DONE_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="UTF-8"><title>Habitual | Signed in</title></head>
<body style="font-family: system-ui, sans-serif; text-align: center; padding-top: 20vh;">
    <h1>You're signed in</h1>
    <p>You can close this window and return to Habitual.</p>
</body>
</html>"#;

const FAILED_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="UTF-8"><title>Habitual | Sign-in failed</title></head>
<body style="font-family: system-ui, sans-serif; text-align: center; padding-top: 20vh;">
    <h1>Sign-in did not complete</h1>
    <p>Return to Habitual to try again.</p>
</body>
</html>"#;

/// Query parameters the provider appends to the redirect URI
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackParams {
    pub fn from_url(url: &Url) -> Self {
        let mut params = Self::default();
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "code" => params.code = Some(value.into_owned()),
                "state" => params.state = Some(value.into_owned()),
                "error" => params.error = Some(value.into_owned()),
                "error_description" => params.error_description = Some(value.into_owned()),
                _ => {}
            }
        }
        params
    }

    /// Whether the URL looks like a provider callback at all
    pub fn is_callback(&self) -> bool {
        self.code.is_some() || self.error.is_some()
    }

    /// Human-readable form of the provider's error, if any
    pub fn error_text(&self) -> Option<String> {
        self.error.as_ref().map(|err| match &self.error_description {
            Some(description) => format!("{} - {}", err, description),
            None => err.clone(),
        })
    }
}

/// Extract callback parameters from a raw HTTP request
pub fn parse_callback_request(request: &str) -> std::result::Result<CallbackParams, String> {
    // GET /callback?code=xxx&state=yyy HTTP/1.1
    let first_line = request.lines().next().ok_or("empty request")?;
    let path = first_line
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| format!("malformed request line: {:?}", first_line))?;

    let url = Url::parse(&format!("http://localhost{}", path))
        .map_err(|e| format!("unparseable callback path: {}", e))?;
    Ok(CallbackParams::from_url(&url))
}

pub fn redirect_uri(port: u16) -> String {
    format!("http://127.0.0.1:{}/callback", port)
}

pub async fn bind_listener(port: u16) -> std::io::Result<TcpListener> {
    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    tracing::debug!("Callback listener bound on {}", redirect_uri(port));
    Ok(listener)
}

/// Accept connections until one carries callback parameters
///
/// Browsers also ask for `/favicon.ico` and similar; those get a 404 and the
/// wait continues.
pub async fn accept_callback(listener: &TcpListener) -> std::io::Result<CallbackParams> {
    loop {
        let (mut socket, peer) = listener.accept().await?;

        let mut buffer = vec![0u8; 4096];
        let n = socket.read(&mut buffer).await?;
        let request = String::from_utf8_lossy(&buffer[..n]);

        let params = match parse_callback_request(&request) {
            Ok(params) if params.is_callback() => params,
            Ok(_) | Err(_) => {
                tracing::debug!("Ignoring non-callback request from {}", peer);
                let _ = socket
                    .write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                    .await;
                continue;
            }
        };

        let (status, body) = if params.code.is_some() {
            ("200 OK", DONE_HTML)
        } else {
            ("400 Bad Request", FAILED_HTML)
        };
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        let _ = socket.write_all(response.as_bytes()).await;
        let _ = socket.shutdown().await;

        return Ok(params);
    }
}
