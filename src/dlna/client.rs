//! The HTTP transport used for HEAD requests.

use super::header::HeadResponse;
use super::DlnaError;

/// Issues one blocking HEAD request, returning once the response head has arrived.
///
/// A response with a non-success status is returned as `Ok`; the negotiator decides which
/// statuses it accepts.
pub trait HeadClient {
    fn head(&mut self, uri: &str, headers: &[(&str, &str)]) -> Result<HeadResponse, DlnaError>;
}

impl<C: HeadClient + ?Sized> HeadClient for &mut C {
    fn head(&mut self, uri: &str, headers: &[(&str, &str)]) -> Result<HeadResponse, DlnaError> {
        (**self).head(uri, headers)
    }
}

#[cfg(feature = "http")]
pub use self::ureq_client::UreqHeadClient;

#[cfg(feature = "http")]
mod ureq_client {
    use super::{DlnaError, HeadClient, HeadResponse};
    use std::time::Duration;

    /// A [`HeadClient`](trait.HeadClient.html) using `ureq`.
    #[derive(Debug, Clone)]
    pub struct UreqHeadClient {
        timeout: Option<Duration>,
        user_agent: Option<String>,
    }

    impl Default for UreqHeadClient {
        fn default() -> Self {
            UreqHeadClient {
                timeout: Some(Duration::from_secs(30)),
                user_agent: None,
            }
        }
    }

    impl UreqHeadClient {
        pub fn new() -> Self {
            Self::default()
        }

        /// Set the request timeout.
        pub fn with_timeout(mut self, timeout: Duration) -> Self {
            self.timeout = Some(timeout);
            self
        }

        pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
            self.user_agent = Some(user_agent.into());
            self
        }
    }

    impl HeadClient for UreqHeadClient {
        fn head(
            &mut self,
            uri: &str,
            headers: &[(&str, &str)],
        ) -> Result<HeadResponse, DlnaError> {
            let mut request = ureq::request("HEAD", uri);
            if let Some(timeout) = self.timeout {
                request = request.timeout(timeout);
            }
            if let Some(ua) = &self.user_agent {
                request = request.set("User-Agent", ua);
            }
            for (name, value) in headers {
                request = request.set(name, value);
            }
            let response = match request.call() {
                Ok(response) => response,
                Err(ureq::Error::Status(_, response)) => response,
                Err(e) => return Err(DlnaError::Transport(e.to_string())),
            };
            let headers = response
                .headers_names()
                .into_iter()
                .filter_map(|name| {
                    let value = response.header(&name)?.to_string();
                    Some((name, value))
                })
                .collect();
            Ok(HeadResponse::new(response.status(), headers))
        }
    }

}
