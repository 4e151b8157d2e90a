//! SOAP-over-HTTP exchange with the WinRM listener.

use reqwest::StatusCode;

use crate::error::{DnsError, Result};
use crate::utils::log_sanitizer::truncate_for_log;

use super::WinRmSession;
use super::envelope::Action;
use super::response::{SoapResponse, parse_response};

const SOAP_CONTENT_TYPE: &str = "application/soap+xml;charset=UTF-8";

impl WinRmSession {
    /// Posts one envelope and parses the reply.
    ///
    /// SOAP faults are returned inside the response (WinRM sends them with
    /// HTTP 500) so the caller can decide whether a fault is fatal.
    pub(crate) async fn post(&self, action: Action, envelope: String) -> Result<SoapResponse> {
        let endpoint = self.endpoint.as_str();
        log::debug!("[{endpoint}] {}", action.name());

        let response = self
            .client
            .post(endpoint)
            .basic_auth(&self.username, Some(&self.password))
            .header(reqwest::header::CONTENT_TYPE, SOAP_CONTENT_TYPE)
            .body(envelope)
            .send()
            .await
            .map_err(|e| self.send_error(action, &e))?;

        let status = response.status();
        log::debug!("[{endpoint}] {} status: {status}", action.name());

        if status == StatusCode::UNAUTHORIZED {
            return Err(DnsError::Connection {
                endpoint: self.endpoint.clone(),
                detail: "authentication rejected (HTTP 401): check username and password"
                    .to_string(),
            });
        }

        let body = response.text().await.map_err(|e| DnsError::Transport {
            operation: action.name().to_string(),
            stderr: format!("failed to read response body: {e}"),
            exit_code: -1,
        })?;

        log::debug!(
            "[{endpoint}] {} body: {}",
            action.name(),
            truncate_for_log(&body)
        );

        if status.is_success() || status == StatusCode::INTERNAL_SERVER_ERROR {
            let parsed = parse_response(&body)?;
            if status.is_success() || parsed.fault.is_some() {
                return Ok(parsed);
            }
        }

        Err(DnsError::Transport {
            operation: action.name().to_string(),
            stderr: format!("HTTP {status}: {}", truncate_for_log(&body)),
            exit_code: -1,
        })
    }

    /// Like [`post`](Self::post) but treats any SOAP fault as a transport failure.
    pub(crate) async fn post_expecting_success(
        &self,
        action: Action,
        envelope: String,
    ) -> Result<SoapResponse> {
        let resp = self.post(action, envelope).await?;
        if let Some(fault) = &resp.fault {
            log::error!("[{}] {} fault: {}", self.endpoint, action.name(), fault.message);
            return Err(DnsError::Transport {
                operation: action.name().to_string(),
                stderr: fault.message.clone(),
                exit_code: -1,
            });
        }
        Ok(resp)
    }

    fn send_error(&self, action: Action, e: &reqwest::Error) -> DnsError {
        if e.is_timeout() {
            DnsError::Timeout {
                operation: action.name().to_string(),
                seconds: super::HTTP_REQUEST_TIMEOUT_SECS,
            }
        } else if e.is_connect() || action == Action::CreateShell {
            DnsError::Connection {
                endpoint: self.endpoint.clone(),
                detail: e.to_string(),
            }
        } else {
            DnsError::Transport {
                operation: action.name().to_string(),
                stderr: e.to_string(),
                exit_code: -1,
            }
        }
    }
}
