//! Single-line transport encoding for `PowerShell` scripts.
//!
//! `powershell.exe -EncodedCommand` expects base64 over UTF-16LE. For ASCII
//! scripts that is every byte followed by a zero byte.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

/// Encodes a script as `powershell.exe -EncodedCommand <base64>`.
pub fn encode_command(script: &str) -> String {
    let wide: Vec<u8> = script
        .encode_utf16()
        .flat_map(u16::to_le_bytes)
        .collect();
    format!("powershell.exe -EncodedCommand {}", STANDARD.encode(wide))
}
