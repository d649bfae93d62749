use super::events::RecentIds;
use super::qr::generate_qr_terminal;
use super::send::{split_message, to_whatsapp_text, MAX_CHUNK_LEN, RETRY_DELAYS_MS};

#[test]
fn test_split_short_message() {
    let chunks = split_message("oi, tudo bem?", MAX_CHUNK_LEN);
    assert_eq!(chunks, vec!["oi, tudo bem?"]);
}

#[test]
fn test_split_long_message_respects_limit() {
    let text = "uma linha de teste\n".repeat(500);
    let chunks = split_message(&text, MAX_CHUNK_LEN);
    assert!(chunks.len() >= 2);
    for chunk in &chunks {
        assert!(chunk.len() <= MAX_CHUNK_LEN);
    }
    assert_eq!(chunks.concat(), text, "no content lost in splitting");
}

#[test]
fn test_split_oversized_single_line() {
    let text = "a".repeat(MAX_CHUNK_LEN * 2 + 10);
    let chunks = split_message(&text, MAX_CHUNK_LEN);
    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks.concat(), text);
}

#[test]
fn test_whatsapp_text_headers() {
    assert_eq!(to_whatsapp_text("## Nossos planos"), "*NOSSOS PLANOS*");
    assert_eq!(to_whatsapp_text("# Título"), "*TÍTULO*");
}

#[test]
fn test_whatsapp_text_bold() {
    assert_eq!(
        to_whatsapp_text("isso é **importante** aqui"),
        "isso é *importante* aqui"
    );
}

#[test]
fn test_whatsapp_text_links() {
    assert_eq!(
        to_whatsapp_text("veja [nosso site](https://criate.dev) hoje"),
        "veja nosso site (https://criate.dev) hoje"
    );
}

#[test]
fn test_whatsapp_text_horizontal_rules_removed() {
    assert_eq!(to_whatsapp_text("acima\n---\nabaixo"), "acima\nabaixo");
}

#[test]
fn test_whatsapp_text_passthrough() {
    // Native WhatsApp formatting passes through unchanged.
    assert_eq!(to_whatsapp_text("*negrito*"), "*negrito*");
    assert_eq!(to_whatsapp_text("_itálico_"), "_itálico_");
    let plain = "Oi! Tudo certo por aí?";
    assert_eq!(to_whatsapp_text(plain), plain);
}

#[test]
fn test_generate_qr_terminal() {
    let art = generate_qr_terminal("pairing-test-data").unwrap();
    assert!(!art.is_empty());
    assert!(art.lines().count() > 10, "QR should span multiple lines");
}

#[test]
fn test_retry_delays_exponential() {
    assert_eq!(RETRY_DELAYS_MS.len(), 3);
    assert_eq!(RETRY_DELAYS_MS[1], RETRY_DELAYS_MS[0] * 2);
    assert_eq!(RETRY_DELAYS_MS[2], RETRY_DELAYS_MS[1] * 2);
}

#[test]
fn test_recent_ids_dedup() {
    let mut ids = RecentIds::new();
    assert!(ids.insert("3EB0A"), "first delivery passes");
    assert!(!ids.insert("3EB0A"), "duplicate within window is dropped");
    assert!(ids.insert("3EB0B"), "unrelated id passes");
    assert_eq!(ids.len(), 2);
}
