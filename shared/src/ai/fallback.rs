//! Deterministic local reply templates.

use super::AiRequest;

/// Produces a reply without leaving the process. Must be deterministic for
/// identical input.
pub trait FallbackGenerator: Send + Sync {
    fn compose(&self, request: &AiRequest) -> String;
}

/// Care-guidance template used by the API when the AI service is absent or
/// failing.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClinicTemplate;

impl FallbackGenerator for ClinicTemplate {
    fn compose(&self, request: &AiRequest) -> String {
        let context = request.patient_context.as_ref();

        let addressee = context
            .map(|ctx| ctx.name.trim())
            .filter(|name| !name.is_empty())
            .map(|name| format!(" for {}", name))
            .unwrap_or_default();

        let notes = context
            .and_then(|ctx| ctx.medical_notes.as_deref())
            .map(str::trim)
            .filter(|notes| !notes.is_empty())
            .map(|notes| format!(" I see notes: {}.", notes))
            .unwrap_or_default();

        format!(
            "Dental assistant reply{}: Thanks for your message. Please keep brushing twice daily, \
             floss nightly, and schedule a check if pain persists over 48 hours.{}",
            addressee, notes
        )
    }
}

/// Template served by the AI service itself when no model is reachable.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockTemplate;

impl FallbackGenerator for MockTemplate {
    fn compose(&self, request: &AiRequest) -> String {
        let notes = request
            .patient_context
            .as_ref()
            .and_then(|ctx| ctx.medical_notes.as_deref())
            .filter(|notes| !notes.trim().is_empty());

        match notes {
            Some(notes) => format!(
                "Mock AI reply: Thanks for sharing. Continue daily brushing and flossing. \
                 Given your notes ({}), if pain or swelling continues, contact the clinic.",
                notes
            ),
            None => "Mock AI reply: Thanks for your message. Maintain oral hygiene and book a \
                     follow-up if symptoms persist."
                .to_string(),
        }
    }
}
