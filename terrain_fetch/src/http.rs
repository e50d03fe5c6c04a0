//! Blocking HTTP helper shared by the elevation and tile clients.

use std::io::Read;
use std::thread;
use std::time::Duration;

use serde::{Serialize, de::DeserializeOwned};

use crate::error::{FetchError, Result};

/// Thin wrapper over a `ureq` agent that applies a timeout, a user agent and
/// a bounded retry loop with exponential backoff.
#[derive(Clone)]
pub struct HttpClient {
    agent: ureq::Agent,
    max_attempts: u32,
    backoff_base: Duration,
}

impl HttpClient {
    /// `max_attempts` counts the first try; zero is treated as one.
    pub fn new(timeout: Duration, max_attempts: u32, user_agent: &str) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(user_agent)
            .build();
        Self {
            agent,
            max_attempts: max_attempts.max(1),
            backoff_base: Duration::from_millis(100),
        }
    }

    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.execute_with_retry(url, |agent| agent.get(url).call())?;
        let mut bytes = Vec::new();
        response.into_reader().read_to_end(&mut bytes)?;
        Ok(bytes)
    }

    pub fn post_json<B, T>(&self, url: &str, body: &B) -> Result<T>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        let response = self.execute_with_retry(url, |agent| agent.post(url).send_json(body))?;
        response
            .into_json()
            .map_err(|err| FetchError::Decode(format!("{url}: {err}")))
    }

    fn execute_with_retry<F>(&self, url: &str, mut send: F) -> Result<ureq::Response>
    where
        F: FnMut(&ureq::Agent) -> std::result::Result<ureq::Response, ureq::Error>,
    {
        let mut last = None;
        for attempt in 1..=self.max_attempts {
            if attempt > 1 {
                let backoff = self.backoff_base * 2u32.pow(attempt - 2);
                log::debug!("[terrain_fetch] retrying {url} in {backoff:?} (attempt {attempt})");
                thread::sleep(backoff);
            }

            match send(&self.agent) {
                Ok(response) => return Ok(response),
                Err(ureq::Error::Status(status, _)) if !is_transient(status) => {
                    return Err(FetchError::Status {
                        url: url.to_string(),
                        status,
                    });
                }
                Err(ureq::Error::Status(status, _)) => {
                    log::warn!("[terrain_fetch] {url} answered HTTP {status} (attempt {attempt})");
                    last = Some(FetchError::Status {
                        url: url.to_string(),
                        status,
                    });
                }
                Err(ureq::Error::Transport(transport)) => {
                    log::warn!("[terrain_fetch] {url} failed: {transport} (attempt {attempt})");
                    last = Some(FetchError::Http {
                        url: url.to_string(),
                        message: transport.to_string(),
                    });
                }
            }
        }

        let last = last.unwrap_or_else(|| FetchError::Http {
            url: url.to_string(),
            message: "no attempt made".to_string(),
        });
        if self.max_attempts == 1 {
            return Err(last);
        }
        Err(FetchError::RetriesExhausted {
            url: url.to_string(),
            attempts: self.max_attempts,
            last: Box::new(last),
        })
    }
}

/// Server-side trouble worth another try.
fn is_transient(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}
