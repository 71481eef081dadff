//! Minimal HTTP/1.1 server for integration tests: serves a scrapeable video
//! page under `/watch/...` and media bodies under `/media/...`.
//!
//! Media paths containing "broken" declare a Content-Length larger than what
//! is actually sent, then close the connection, simulating a transfer that
//! dies mid-stream. Paths containing "slow" send half the body and then
//! stall for several seconds, for exercising download deadlines.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::thread;

/// Starts a server in a background thread. Returns the base URL
/// (e.g. "http://127.0.0.1:12345/"). The server runs until the process exits.
///
/// The page served under `/watch/` is `page_html(base)`, so its source URLs
/// point back at this server.
pub fn start(media: Vec<u8>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let base = format!("http://127.0.0.1:{}/", port);
    let page = Arc::new(page_html(&base));
    let media = Arc::new(media);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let page = Arc::clone(&page);
            let media = Arc::clone(&media);
            thread::spawn(move || handle(stream, &page, &media));
        }
    });
    base
}

/// Page with two playable sources (720p wins), one invalid webm source, a
/// title, tags, and a thumbnail.
fn page_html(base: &str) -> String {
    format!(
        r##"<html><head>
  <meta property="og:title" content="Night Drive">
  <meta property="og:image" content="{base}media/thumb.jpg">
</head><body>
  <video>
    <source src="{base}media/clip.webm">
    <source src="{base}media/clip-480p.mp4" res="480p">
    <source src="{base}media/clip-720p.mp4" res="720p">
  </video>
  <div class="tags">
    <a class="tag-item" href="/t/cars">#cars</a>
    <a class="tag-item" href="/t/night">#night</a>
  </div>
</body></html>"##
    )
}

/// Same layout but every playable source is a "broken" media path.
pub fn start_with_broken_media(media: Vec<u8>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let base = format!("http://127.0.0.1:{}/", port);
    let page = Arc::new(format!(
        r##"<html><head><meta property="og:title" content="Night Drive"></head>
<body><video><source src="{base}media/broken-720p.mp4" res="720p"></video></body></html>"##
    ));
    let media = Arc::new(media);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let page = Arc::clone(&page);
            let media = Arc::clone(&media);
            thread::spawn(move || handle(stream, &page, &media));
        }
    });
    base
}

fn handle(mut stream: std::net::TcpStream, page: &str, media: &[u8]) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(n) => n,
        Err(_) => return,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let path = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/");

    if path.starts_with("/watch") {
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            page.len(),
            page
        );
        let _ = stream.write_all(response.as_bytes());
    } else if path.contains("broken") {
        // Promise more bytes than we deliver, then hang up.
        let declared = media.len() * 2 + 64;
        let header = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: video/mp4\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            declared
        );
        let _ = stream.write_all(header.as_bytes());
        let _ = stream.write_all(media);
        let _ = stream.flush();
    } else if path.contains("slow") {
        // Half the body, then a stall longer than any test deadline.
        let header = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: video/mp4\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            media.len()
        );
        let _ = stream.write_all(header.as_bytes());
        let _ = stream.write_all(&media[..media.len() / 2]);
        let _ = stream.flush();
        thread::sleep(std::time::Duration::from_secs(8));
        let _ = stream.write_all(&media[media.len() / 2..]);
    } else if path.ends_with(".mp4") {
        let header = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: video/mp4\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            media.len()
        );
        let _ = stream.write_all(header.as_bytes());
        let _ = stream.write_all(media);
    } else {
        let _ = stream.write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n");
    }
}
