// Runtime config endpoint - hands connection settings to the browser at page load

use crate::config::RuntimeConfig;
use serde_json::Value;
use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};

pub const CONTENT_TYPE: &str = "application/javascript; charset=utf-8";
pub const CACHE_CONTROL: &str = "no-store, max-age=0";

/// The script assigning the config to `window.__BAZUNIA_*` globals.
pub fn render_script(config: &RuntimeConfig) -> String {
    format!(
        "window.__BAZUNIA_SUPABASE_URL={};\nwindow.__BAZUNIA_SUPABASE_ANON_KEY={};\nwindow.__BAZUNIA_PUBLIC_DECK_PROVIDER={};",
        js_string(&config.supabase_url),
        js_string(&config.supabase_anon_key),
        js_string(config.public_deck_provider.as_str()),
    )
}

fn js_string(value: &str) -> String {
    Value::from(value).to_string()
}

/// Full HTTP/1.1 response for one request line.
pub fn build_response(request_line: &str, config: &RuntimeConfig) -> String {
    let method = request_line.split_whitespace().next().unwrap_or_default();
    if method != "GET" && method != "HEAD" {
        return "HTTP/1.1 405 Method Not Allowed\r\n\
            Allow: GET, HEAD\r\n\
            Content-Length: 0\r\n\
            Connection: close\r\n\r\n"
            .to_string();
    }

    let body = render_script(config);
    let head = format!(
        "HTTP/1.1 200 OK\r\n\
        Content-Type: {}\r\n\
        Cache-Control: {}\r\n\
        X-Content-Type-Options: nosniff\r\n\
        Content-Length: {}\r\n\
        Connection: close\r\n\r\n",
        CONTENT_TYPE,
        CACHE_CONTROL,
        body.len()
    );
    if method == "HEAD" {
        head
    } else {
        head + &body
    }
}

/// Serve the runtime config until the listener fails.
pub fn serve(addr: SocketAddr, config: &RuntimeConfig) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr)?;
    tracing::info!("Runtime config endpoint listening on http://{}", listener.local_addr()?);

    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                if let Err(e) = handle_connection(stream, config) {
                    tracing::warn!("Runtime config request failed: {}", e);
                }
            }
            Err(e) => {
                tracing::error!("Accept error: {}", e);
                return Err(e);
            }
        }
    }
    Ok(())
}

fn handle_connection(mut stream: TcpStream, config: &RuntimeConfig) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;
    tracing::debug!("Runtime config request: {}", request_line.trim_end());

    let response = build_response(&request_line, config);
    stream.write_all(response.as_bytes())?;
    stream.flush()
}
