//! WS-Management SOAP request envelopes for the Windows remote shell.

use quick_xml::escape::escape;
use uuid::Uuid;

const NS_DECLARATIONS: &str = concat!(
    r#"xmlns:s="http://www.w3.org/2003/05/soap-envelope" "#,
    r#"xmlns:a="http://schemas.xmlsoap.org/ws/2004/08/addressing" "#,
    r#"xmlns:w="http://schemas.dmtf.org/wbem/wsman/1/wsman.xsd" "#,
    r#"xmlns:rsp="http://schemas.microsoft.com/wbem/wsman/1/windows/shell""#,
);
const RESOURCE_URI_CMD: &str = "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/cmd";
const ANONYMOUS_ADDRESS: &str = "http://schemas.xmlsoap.org/ws/2004/08/addressing/role/anonymous";
const SIGNAL_TERMINATE: &str = "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/signal/terminate";
const MAX_ENVELOPE_SIZE: u32 = 153_600;
/// Server-side wait per request. Receive calls that produce no output within
/// this window come back as a `w:TimedOut` fault and are polled again.
pub(crate) const OPERATION_TIMEOUT_SECS: u64 = 20;

/// The shell actions this client issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    CreateShell,
    Command,
    Receive,
    Signal,
    DeleteShell,
}

impl Action {
    pub fn uri(self) -> &'static str {
        match self {
            Self::CreateShell => "http://schemas.xmlsoap.org/ws/2004/09/transfer/Create",
            Self::Command => "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/Command",
            Self::Receive => "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/Receive",
            Self::Signal => "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/Signal",
            Self::DeleteShell => "http://schemas.xmlsoap.org/ws/2004/09/transfer/Delete",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::CreateShell => "CreateShell",
            Self::Command => "Command",
            Self::Receive => "Receive",
            Self::Signal => "Signal",
            Self::DeleteShell => "DeleteShell",
        }
    }
}

pub(crate) fn create_shell(endpoint: &str) -> String {
    let options = r#"<w:OptionSet><w:Option Name="WINRS_NOPROFILE">FALSE</w:Option><w:Option Name="WINRS_CODEPAGE">65001</w:Option></w:OptionSet>"#;
    let body = "<rsp:Shell><rsp:InputStreams>stdin</rsp:InputStreams><rsp:OutputStreams>stdout stderr</rsp:OutputStreams></rsp:Shell>";
    envelope(endpoint, Action::CreateShell, None, options, body)
}

pub(crate) fn command(endpoint: &str, shell_id: &str, command_line: &str) -> String {
    let options = r#"<w:OptionSet><w:Option Name="WINRS_CONSOLEMODE_STDIN">TRUE</w:Option><w:Option Name="WINRS_SKIP_CMD_SHELL">FALSE</w:Option></w:OptionSet>"#;
    let body = format!(
        "<rsp:CommandLine><rsp:Command>{}</rsp:Command></rsp:CommandLine>",
        escape(command_line)
    );
    envelope(endpoint, Action::Command, Some(shell_id), options, &body)
}

pub(crate) fn receive(endpoint: &str, shell_id: &str, command_id: &str) -> String {
    let body = format!(
        r#"<rsp:Receive><rsp:DesiredStream CommandId="{}">stdout stderr</rsp:DesiredStream></rsp:Receive>"#,
        escape(command_id)
    );
    envelope(endpoint, Action::Receive, Some(shell_id), "", &body)
}

pub(crate) fn signal_terminate(endpoint: &str, shell_id: &str, command_id: &str) -> String {
    let body = format!(
        r#"<rsp:Signal CommandId="{}"><rsp:Code>{SIGNAL_TERMINATE}</rsp:Code></rsp:Signal>"#,
        escape(command_id)
    );
    envelope(endpoint, Action::Signal, Some(shell_id), "", &body)
}

pub(crate) fn delete_shell(endpoint: &str, shell_id: &str) -> String {
    envelope(endpoint, Action::DeleteShell, Some(shell_id), "", "")
}

fn envelope(
    endpoint: &str,
    action: Action,
    shell_id: Option<&str>,
    options: &str,
    body: &str,
) -> String {
    let selector = shell_id
        .map(|id| {
            format!(
                r#"<w:SelectorSet><w:Selector Name="ShellId">{}</w:Selector></w:SelectorSet>"#,
                escape(id)
            )
        })
        .unwrap_or_default();

    format!(
        concat!(
            r#"<s:Envelope {ns}><s:Header>"#,
            r#"<a:To>{to}</a:To>"#,
            r#"<a:ReplyTo><a:Address s:mustUnderstand="true">{anonymous}</a:Address></a:ReplyTo>"#,
            r#"<w:MaxEnvelopeSize s:mustUnderstand="true">{max_size}</w:MaxEnvelopeSize>"#,
            r#"<a:MessageID>uuid:{message_id}</a:MessageID>"#,
            r#"<w:Locale xml:lang="en-US" s:mustUnderstand="false"/>"#,
            r#"<w:OperationTimeout>PT{timeout}S</w:OperationTimeout>"#,
            r#"<w:ResourceURI s:mustUnderstand="true">{resource}</w:ResourceURI>"#,
            r#"<a:Action s:mustUnderstand="true">{action}</a:Action>"#,
            r#"{selector}{options}"#,
            r#"</s:Header><s:Body>{body}</s:Body></s:Envelope>"#,
        ),
        ns = NS_DECLARATIONS,
        to = escape(endpoint),
        anonymous = ANONYMOUS_ADDRESS,
        max_size = MAX_ENVELOPE_SIZE,
        message_id = Uuid::new_v4().to_string().to_uppercase(),
        timeout = OPERATION_TIMEOUT_SECS,
        resource = RESOURCE_URI_CMD,
        action = action.uri(),
        selector = selector,
        options = options,
        body = body,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENDPOINT: &str = "http://dc01:5985/wsman";

    #[test]
    fn create_shell_has_action_and_streams() {
        let xml = create_shell(ENDPOINT);
        assert!(xml.contains(&format!(
            r#"<a:Action s:mustUnderstand="true">{}</a:Action>"#,
            Action::CreateShell.uri()
        )));
        assert!(xml.contains("<rsp:OutputStreams>stdout stderr</rsp:OutputStreams>"));
        assert!(xml.contains("<a:To>http://dc01:5985/wsman</a:To>"));
        assert!(!xml.contains("SelectorSet"));
    }

    #[test]
    fn command_carries_shell_selector_and_escaped_command() {
        let xml = command(ENDPOINT, "SHELL-1", "powershell.exe -EncodedCommand QQA=<&>");
        assert!(xml.contains(r#"<w:Selector Name="ShellId">SHELL-1</w:Selector>"#));
        assert!(xml.contains(
            "<rsp:Command>powershell.exe -EncodedCommand QQA=&lt;&amp;&gt;</rsp:Command>"
        ));
    }

    #[test]
    fn receive_and_signal_reference_command() {
        let xml = receive(ENDPOINT, "SHELL-1", "CMD-1");
        assert!(xml.contains(r#"<rsp:DesiredStream CommandId="CMD-1">stdout stderr</rsp:DesiredStream>"#));
        let xml = signal_terminate(ENDPOINT, "SHELL-1", "CMD-1");
        assert!(xml.contains(SIGNAL_TERMINATE));
        assert!(xml.contains(r#"<rsp:Signal CommandId="CMD-1">"#));
    }

    #[test]
    fn every_envelope_gets_a_fresh_message_id() {
        let a = delete_shell(ENDPOINT, "SHELL-1");
        let b = delete_shell(ENDPOINT, "SHELL-1");
        assert_ne!(a, b);
        assert!(a.contains("<s:Body></s:Body>"));
    }
}
