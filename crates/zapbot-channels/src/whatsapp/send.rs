//! Outbound helpers — formatting, chunking, and retry.

use tracing::{error, warn};
use wacore_binary::jid::Jid;
use whatsapp_rust::client::Client;
use zapbot_core::error::ZapError;

/// Retry delays for exponential backoff: 500ms, 1s, 2s.
pub(super) const RETRY_DELAYS_MS: [u64; 3] = [500, 1000, 2000];

/// WhatsApp's practical text-message limit per send.
pub(super) const MAX_CHUNK_LEN: usize = 4096;

/// Send a WhatsApp message, retrying with backoff. Returns the message id.
pub(super) async fn retry_send(
    client: &Client,
    jid: &Jid,
    msg: waproto::whatsapp::Message,
) -> Result<String, ZapError> {
    let mut last_err = None;

    for (attempt, delay_ms) in RETRY_DELAYS_MS.iter().enumerate() {
        match client.send_message(jid.clone(), msg.clone()).await {
            Ok(msg_id) => return Ok(msg_id),
            Err(e) => {
                let attempt_num = attempt + 1;
                if attempt_num < RETRY_DELAYS_MS.len() {
                    warn!(
                        "whatsapp send attempt {attempt_num}/{} failed: {e}, retrying in {delay_ms}ms",
                        RETRY_DELAYS_MS.len()
                    );
                    tokio::time::sleep(std::time::Duration::from_millis(*delay_ms)).await;
                } else {
                    error!(
                        "whatsapp send attempt {attempt_num}/{} failed: {e}, giving up",
                        RETRY_DELAYS_MS.len()
                    );
                }
                last_err = Some(e);
            }
        }
    }

    Err(ZapError::Channel(format!(
        "whatsapp send failed after {} attempts: {}",
        RETRY_DELAYS_MS.len(),
        last_err.map(|e| e.to_string()).unwrap_or_default()
    )))
}

/// Convert Markdown-ish provider output to WhatsApp-native formatting.
///
/// - `# Header` / `## Header` / `### Header` -> `*HEADER*`
/// - `**bold**` -> `*bold*`
/// - `[text](url)` -> `text (url)`
/// - `---` horizontal rules -> removed
pub(super) fn to_whatsapp_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());

    for line in text.lines() {
        let trimmed = line.trim();

        // Drop horizontal rules.
        if trimmed.len() >= 3 && trimmed.chars().all(|c| c == '-' || c == ' ') {
            continue;
        }

        // Headers become bold uppercase.
        let header = trimmed
            .strip_prefix("### ")
            .or_else(|| trimmed.strip_prefix("## "))
            .or_else(|| trimmed.strip_prefix("# "));
        if let Some(header) = header {
            out.push('*');
            out.push_str(&header.trim().to_uppercase());
            out.push_str("*\n");
            continue;
        }

        let mut result = line.to_string();

        // [text](url) -> text (url)
        while let Some(start) = result.find('[') {
            let Some(mid) = result[start..].find("](") else {
                break;
            };
            let mid = start + mid;
            let Some(end) = result[mid + 2..].find(')') else {
                break;
            };
            let end = mid + 2 + end;
            let replacement = format!("{} ({})", &result[start + 1..mid], &result[mid + 2..end]);
            result.replace_range(start..=end, &replacement);
        }

        // **bold** -> *bold*
        while let Some(start) = result.find("**") {
            let Some(end) = result[start + 2..].find("**") else {
                break;
            };
            let end = start + 2 + end;
            let inner = result[start + 2..end].to_string();
            result.replace_range(start..end + 2, &format!("*{inner}*"));
        }

        out.push_str(&result);
        out.push('\n');
    }

    if !text.ends_with('\n') && out.ends_with('\n') {
        out.pop();
    }

    out
}

/// Split a message into chunks of at most `limit` bytes, preferring line
/// boundaries and falling back to a hard char-boundary split for single
/// oversized lines.
pub(super) fn split_message(text: &str, limit: usize) -> Vec<String> {
    if text.len() <= limit {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();

    for line in text.split_inclusive('\n') {
        if current.len() + line.len() > limit && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }

        if line.len() > limit {
            // Single line longer than the limit: hard-split it.
            let mut rest = line;
            while rest.len() > limit {
                let mut cut = limit;
                while !rest.is_char_boundary(cut) {
                    cut -= 1;
                }
                let (head, tail) = rest.split_at(cut);
                chunks.push(head.to_string());
                rest = tail;
            }
            current.push_str(rest);
        } else {
            current.push_str(line);
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}
