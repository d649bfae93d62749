//! Structured intake — the website briefing flow.
//!
//! Collects company name, offering, and site goal one question at a time,
//! tracking progress in the conversation's collected info under
//! `current_field`, then hands off to a human.

use super::Gateway;
use std::collections::HashMap;
use tracing::info;
use zapbot_context::{ConversationState, Stage};
use zapbot_core::message::IncomingMessage;

/// Result of advancing the intake flow by one customer answer.
pub(super) struct IntakeStep {
    /// Collected-info updates to merge.
    pub updates: Vec<(String, String)>,
    /// Next question, or the hand-off summary when done.
    pub reply: String,
    /// Whether the flow finished with this answer.
    pub done: bool,
}

fn kv(key: &str, value: &str) -> (String, String) {
    (key.to_string(), value.to_string())
}

/// Advance the website intake with the customer's answer.
pub(super) fn advance_intake(collected: &HashMap<String, String>, answer: &str) -> IntakeStep {
    match collected.get("current_field").map(String::as_str) {
        Some("company_name") => IntakeStep {
            updates: vec![
                kv("company_name", answer),
                kv("current_field", "product_service"),
            ],
            reply: "🤔 Que tipo de produto ou serviço sua empresa oferece?".to_string(),
            done: false,
        },
        Some("product_service") => IntakeStep {
            updates: vec![
                kv("product_service", answer),
                kv("current_field", "site_goal"),
            ],
            reply: "🎯 Qual o principal objetivo do site? (ex: vendas, portfólio, agendamento)"
                .to_string(),
            done: false,
        },
        Some("site_goal") => {
            let company = collected
                .get("company_name")
                .map(String::as_str)
                .unwrap_or("sua empresa");
            let product = collected
                .get("product_service")
                .map(String::as_str)
                .unwrap_or("-");
            IntakeStep {
                updates: vec![kv("site_goal", answer), kv("current_field", "done")],
                reply: format!(
                    "Perfeito! 🚀 Anotei tudo:\n\
                     • Empresa: {company}\n\
                     • Oferece: {product}\n\
                     • Objetivo: {answer}\n\n\
                     Vou repassar para o nosso time e já te retornamos por aqui."
                ),
                done: true,
            }
        }
        // No (or unknown) progress marker: restart the flow at the first
        // question without touching what was already collected.
        _ => IntakeStep {
            updates: vec![kv("current_field", "company_name")],
            reply: "🏢 Pra começar, me diz o nome da sua empresa?".to_string(),
            done: false,
        },
    }
}

impl Gateway {
    /// Enter the website intake flow for this customer.
    pub(super) async fn start_intake(&self, incoming: &IncomingMessage) {
        self.store
            .update_stage(&incoming.sender_id, Stage::CollectingBusinessInfo);
        self.store.update_collected_info(
            &incoming.sender_id,
            [
                kv("service", "website"),
                kv("current_field", "company_name"),
            ],
        );
        info!("intake started for {}", incoming.sender_id);

        self.send_reply(
            incoming,
            "Que ótimo! 🙌 Pra começar, me diz o nome da sua empresa?",
        )
        .await;
    }

    /// Handle one customer answer while the intake flow is active.
    pub(super) async fn handle_intake(
        &self,
        incoming: &IncomingMessage,
        conversation: &ConversationState,
        text: &str,
    ) {
        // Only the website flow is structured; any other service value
        // falls back to the provider without losing collected state.
        let service = conversation.collected_info.get("service");
        if service.map(String::as_str) != Some("website") {
            return self.handle_llm(incoming, conversation, text).await;
        }

        let step = advance_intake(&conversation.collected_info, text);
        self.store
            .update_collected_info(&incoming.sender_id, step.updates);
        if step.done {
            self.store
                .update_stage(&incoming.sender_id, Stage::ProposingSolution);
            info!("intake complete for {}", incoming.sender_id);
        }

        self.send_reply(incoming, &step.reply).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collected(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_company_name_advances_to_product() {
        let info = collected(&[("service", "website"), ("current_field", "company_name")]);
        let step = advance_intake(&info, "Padaria do João");
        assert!(!step.done);
        assert!(step
            .updates
            .contains(&kv("company_name", "Padaria do João")));
        assert!(step.updates.contains(&kv("current_field", "product_service")));
        assert!(step.reply.contains("produto ou serviço"));
    }

    #[test]
    fn test_product_advances_to_goal() {
        let info = collected(&[("current_field", "product_service")]);
        let step = advance_intake(&info, "pães artesanais");
        assert!(!step.done);
        assert!(step.updates.contains(&kv("current_field", "site_goal")));
        assert!(step.reply.contains("objetivo do site"));
    }

    #[test]
    fn test_goal_finishes_with_summary() {
        let info = collected(&[
            ("company_name", "Padaria do João"),
            ("product_service", "pães artesanais"),
            ("current_field", "site_goal"),
        ]);
        let step = advance_intake(&info, "vendas");
        assert!(step.done);
        assert!(step.updates.contains(&kv("site_goal", "vendas")));
        assert!(step.reply.contains("Padaria do João"));
        assert!(step.reply.contains("pães artesanais"));
        assert!(step.reply.contains("vendas"));
    }

    #[test]
    fn test_missing_marker_restarts_at_first_question() {
        let info = collected(&[("service", "website")]);
        let step = advance_intake(&info, "oi?");
        assert!(!step.done);
        assert_eq!(step.updates, vec![kv("current_field", "company_name")]);
        assert!(step.reply.contains("nome da sua empresa"));
    }
}
