//! WS-Management SOAP response parsing.
//!
//! Elements are matched on local names so the namespace prefixes chosen by
//! the server do not matter.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::{DnsError, Result};

/// `w:TimedOut` surfaced as a WSManFault code.
const WSMAN_TIMED_OUT_CODE: &str = "2150858793";
const COMMAND_STATE_DONE_SUFFIX: &str = "CommandState/Done";

/// A SOAP fault returned instead of a regular body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SoapFault {
    /// Subcode values such as `w:TimedOut`.
    pub subcodes: Vec<String>,
    /// `WSManFault` `Code` attribute.
    pub wsman_code: Option<String>,
    /// Human-readable reason.
    pub message: String,
}

impl SoapFault {
    /// An operation timeout on Receive means "no output yet, poll again".
    pub fn is_timed_out(&self) -> bool {
        self.wsman_code.as_deref() == Some(WSMAN_TIMED_OUT_CODE)
            || self.subcodes.iter().any(|s| s.ends_with("TimedOut"))
    }
}

/// Everything this client reads out of a WinRM response.
#[derive(Debug, Default)]
pub(crate) struct SoapResponse {
    pub shell_id: Option<String>,
    pub command_id: Option<String>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub command_done: bool,
    pub exit_code: Option<i32>,
    pub fault: Option<SoapFault>,
}

/// Text content currently being captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
    ShellId,
    ShellIdSelector,
    CommandId,
    Stdout,
    Stderr,
    ExitCode,
    FaultSubcode,
    FaultText,
    FaultMessage,
}

pub(crate) fn parse_response(xml: &str) -> Result<SoapResponse> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut resp = SoapResponse::default();
    let mut capture: Option<Capture> = None;
    let mut in_subcode = false;

    loop {
        match reader.read_event().map_err(soap_parse_error)? {
            Event::Start(e) => {
                match e.local_name().as_ref() {
                    b"Subcode" => in_subcode = true,
                    b"Fault" => {
                        resp.fault.get_or_insert_with(SoapFault::default);
                    }
                    _ => {}
                }
                inspect_element(&e, &mut resp)?;
                capture = capture_for(&e, in_subcode)?;
            }
            Event::Empty(e) => {
                inspect_element(&e, &mut resp)?;
            }
            Event::Text(t) => {
                if let Some(target) = capture {
                    let text = t.unescape().map_err(soap_parse_error)?;
                    store_text(&mut resp, target, text.trim())?;
                }
            }
            Event::End(e) => {
                if e.local_name().as_ref() == b"Subcode" {
                    in_subcode = false;
                }
                capture = None;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(resp)
}

/// Attribute-only information: command state and fault codes.
fn inspect_element(e: &BytesStart<'_>, resp: &mut SoapResponse) -> Result<()> {
    match e.local_name().as_ref() {
        b"CommandState" => {
            if attribute(e, "State")?.is_some_and(|s| s.ends_with(COMMAND_STATE_DONE_SUFFIX)) {
                resp.command_done = true;
            }
        }
        b"WSManFault" => {
            let code = attribute(e, "Code")?;
            resp.fault.get_or_insert_with(SoapFault::default).wsman_code = code;
        }
        _ => {}
    }
    Ok(())
}

fn capture_for(e: &BytesStart<'_>, in_subcode: bool) -> Result<Option<Capture>> {
    let capture = match e.local_name().as_ref() {
        b"ShellId" => Some(Capture::ShellId),
        b"Selector" if attribute(e, "Name")?.as_deref() == Some("ShellId") => {
            Some(Capture::ShellIdSelector)
        }
        b"CommandId" => Some(Capture::CommandId),
        b"Stream" => match attribute(e, "Name")?.as_deref() {
            Some("stdout") => Some(Capture::Stdout),
            Some("stderr") => Some(Capture::Stderr),
            _ => None,
        },
        b"ExitCode" => Some(Capture::ExitCode),
        b"Value" if in_subcode => Some(Capture::FaultSubcode),
        b"Text" => Some(Capture::FaultText),
        b"Message" => Some(Capture::FaultMessage),
        _ => None,
    };
    Ok(capture)
}

fn store_text(resp: &mut SoapResponse, target: Capture, text: &str) -> Result<()> {
    match target {
        Capture::ShellId => resp.shell_id = Some(text.to_string()),
        Capture::ShellIdSelector => {
            resp.shell_id.get_or_insert_with(|| text.to_string());
        }
        Capture::CommandId => resp.command_id = Some(text.to_string()),
        Capture::Stdout => resp.stdout.extend(decode_stream(text)?),
        Capture::Stderr => resp.stderr.extend(decode_stream(text)?),
        Capture::ExitCode => {
            let code = text
                .parse::<i32>()
                .map_err(|e| DnsError::parse(format!("invalid exit code '{text}': {e}")))?;
            resp.exit_code = Some(code);
        }
        Capture::FaultSubcode => resp
            .fault
            .get_or_insert_with(SoapFault::default)
            .subcodes
            .push(text.to_string()),
        Capture::FaultText | Capture::FaultMessage => {
            let fault = resp.fault.get_or_insert_with(SoapFault::default);
            if fault.message.is_empty() {
                fault.message = text.to_string();
            }
        }
    }
    Ok(())
}

fn decode_stream(text: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(text)
        .map_err(|e| DnsError::parse(format!("invalid base64 stream chunk: {e}")))
}

fn attribute(e: &BytesStart<'_>, name: &str) -> Result<Option<String>> {
    let Some(attr) = e.try_get_attribute(name).map_err(soap_parse_error)? else {
        return Ok(None);
    };
    let value = attr.unescape_value().map_err(soap_parse_error)?;
    Ok(Some(value.into_owned()))
}

fn soap_parse_error(e: impl std::fmt::Display) -> DnsError {
    DnsError::parse(format!("malformed SOAP response: {e}"))
}
