use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::redirect::Policy;
use reqwest::{Client, Request, Response, Url};
use tracing::debug;

use crate::config::Settings;
use crate::error::{FetchError, Result};
use crate::transport::Credentials;
use crate::utils::constants::MAX_REDIRECTS;

/// Decides whether basic credentials survive a redirect hop.
///
/// The Earthdata handshake bounces archive -> identity provider -> archive,
/// so credentials must reach the trusted host, but never a third party.
#[derive(Debug, Clone)]
pub struct RedirectAuthPolicy {
    trusted_host: String,
}

impl RedirectAuthPolicy {
    pub fn new(trusted_host: impl Into<String>) -> Self {
        Self {
            trusted_host: trusted_host.into(),
        }
    }

    pub fn keep_authorization(&self, previous: &Url, next: &Url) -> bool {
        let previous_host = previous.host_str();
        let next_host = next.host_str();
        let trusted = Some(self.trusted_host.as_str());

        previous_host == next_host || previous_host == trusted || next_host == trusted
    }
}

/// HTTP session carrying Earthdata credentials across the login redirects.
#[derive(Clone)]
pub struct AuthSession {
    client: Client,
    credentials: Credentials,
    policy: RedirectAuthPolicy,
}

impl AuthSession {
    pub fn new(credentials: Credentials, settings: &Settings) -> Result<Self> {
        // redirects are followed by hand so the auth header can be rebuilt per hop
        let client = Client::builder()
            .redirect(Policy::none())
            .cookie_store(true)
            .user_agent(settings.user_agent.clone())
            .timeout(settings.request_timeout())
            .build()?;

        Ok(Self {
            client,
            credentials,
            policy: RedirectAuthPolicy::new(settings.auth_host.clone()),
        })
    }

    /// Build one GET, with or without the Authorization header.
    pub fn build_request(&self, url: &Url, authorize: bool) -> Result<Request> {
        let mut builder = self.client.get(url.clone());
        if authorize {
            builder = builder.basic_auth(&self.credentials.username, Some(&self.credentials.password));
        }
        Ok(builder.build()?)
    }

    /// GET `url`, following redirects and stripping credentials when a hop
    /// leaves the trusted hosts. Returns the first non-redirect response.
    pub async fn get(&self, url: &str) -> Result<Response> {
        let mut current = parse_url(url)?;
        let mut authorize = true;

        for _ in 0..=MAX_REDIRECTS {
            let request = self.build_request(&current, authorize)?;
            let response = self.client.execute(request).await?;

            if !response.status().is_redirection() {
                return Ok(response);
            }

            let next = match redirect_target(&current, &response)? {
                Some(next) => next,
                None => return Ok(response),
            };

            authorize = authorize && self.policy.keep_authorization(&current, &next);
            debug!(
                from = %current,
                to = %next,
                authorize,
                "following redirect"
            );
            current = next;
        }

        Err(FetchError::Auth(format!(
            "Too many redirects while fetching {}",
            url
        )))
    }

    /// GET a text document (summary, checksum list). An HTML body means the
    /// login handshake failed.
    pub async fn get_text(&self, url: &str) -> Result<String> {
        let response = self.get(url).await?;
        if is_html(&response) {
            return Err(FetchError::Auth(format!(
                "Received an HTML page instead of {}; check Earthdata credentials",
                url
            )));
        }
        Ok(response.error_for_status()?.text().await?)
    }
}

pub fn parse_url(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|e| FetchError::InvalidFormat(format!("Invalid URL '{}': {}", url, e)))
}

fn redirect_target(current: &Url, response: &Response) -> Result<Option<Url>> {
    let location = match response.headers().get(LOCATION) {
        Some(location) => location,
        None => return Ok(None),
    };

    let location = location.to_str().map_err(|_| {
        FetchError::InvalidFormat(format!("Unreadable Location header from {}", current))
    })?;

    current
        .join(location)
        .map(Some)
        .map_err(|e| FetchError::InvalidFormat(format!("Bad redirect '{}': {}", location, e)))
}

/// Error and login pages come back as HTML; data never does.
pub fn is_html(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_ascii_lowercase().contains("html"))
        .unwrap_or(false)
}
