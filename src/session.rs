//! Authenticated session handling
//!
//! One login per run. The session owns a cookie-store HTTP client that is
//! shared, read-only, by every concurrent download action; nothing mutates
//! the session after login succeeds.

use reqwest::Client;
use url::Url;

use crate::config::SiteConfig;
use crate::error::{Error, Result};

/// An authenticated session against the distribution site
#[derive(Clone, Debug)]
pub struct Session {
    client: Client,
    base_url: Url,
}

impl Session {
    /// Log in with the configured credentials.
    ///
    /// POSTs the credentials as a form to the login endpoint and keeps the
    /// issued cookies in the client's cookie store. A non-success status or
    /// a transport error (including the request timeout) is an
    /// authentication failure.
    pub async fn login(site: &SiteConfig) -> Result<Self> {
        let base_url = Url::parse(&site.base_url).map_err(|e| {
            Error::config(
                format!("invalid base URL '{}': {}", site.base_url, e),
                "base_url",
            )
        })?;

        let client = Client::builder()
            .cookie_store(true)
            .timeout(site.request_timeout)
            .build()?;

        let login_url = join_url(&base_url, &site.login_path)?;
        let response = client
            .post(login_url.clone())
            .form(&[
                ("username", site.username.as_str()),
                ("password", site.password.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::Auth(format!("login request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Auth(format!("login rejected with status {status}")));
        }

        tracing::debug!(url = %login_url, "login accepted");
        Ok(Self { client, base_url })
    }

    /// Fetch a protected page and return its body.
    ///
    /// Used for the archive landing page; a non-success status here means
    /// the session was not accepted and is reported as an authentication
    /// failure rather than a generic network error.
    pub async fn protected_page(&self, path: &str) -> Result<String> {
        let url = join_url(&self.base_url, path)?;
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Error::Auth(format!("fetch of {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Auth(format!(
                "protected page {url} returned status {status}"
            )));
        }

        Ok(response.text().await?)
    }

    /// The site base URL this session was established against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The underlying HTTP client (shared cookie store)
    ///
    /// `reqwest::Client` is internally reference-counted, so cloning it for
    /// each download task shares the same connection pool and cookies.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

fn join_url(base: &Url, path: &str) -> Result<Url> {
    base.join(path).map_err(|e| {
        Error::config(
            format!("cannot resolve '{path}' against '{base}': {e}"),
            "base_url",
        )
    })
}
