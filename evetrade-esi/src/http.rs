use std::time::Duration;

#[derive(Debug)]
pub struct HttpClientParams<'a> {
    pub timeout: u64,
    pub connect_timeout: u64,
    /// Descriptive identification per ESI etiquette: app name, version and
    /// a maintainer contact.
    pub user_agent: &'a str,
}

/// Helper to build the reqwest client with sane defaults for ESI polling.
pub fn build_http_client(
    params: HttpClientParams,
) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::ClientBuilder::new()
        .use_rustls_tls()
        .gzip(true)
        .timeout(Duration::from_secs(params.timeout))
        .connect_timeout(Duration::from_secs(params.connect_timeout))
        .user_agent(params.user_agent)
        .build()
}
