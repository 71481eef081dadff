//! Shared reqwest client construction for proxied requests.

use std::time::Duration;

/// Builds a client routed through `proxy` (`host:port`) when given, direct
/// otherwise. `timeout` bounds the whole request; streaming downloads pass
/// None and enforce their own deadline around the body copy.
pub(crate) fn client_for(
    proxy: Option<&str>,
    timeout: Option<Duration>,
) -> reqwest::Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().connect_timeout(Duration::from_secs(10));
    if let Some(proxy) = proxy {
        builder = builder.proxy(reqwest::Proxy::all(format!("http://{proxy}"))?);
    }
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build()
}
