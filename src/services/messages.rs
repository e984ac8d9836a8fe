//! User-facing text for clarifications and escalations.

use crate::domain::models::{EscalationReason, Language};

pub fn clarification_question(language: Language) -> &'static str {
    match language {
        Language::Es => "¿Podría aclarar su pregunta, por favor?",
        Language::Hi => "क्या आप कृपया अपना प्रश्न स्पष्ट कर सकते हैं?",
        Language::Ur => "کیا آپ براہ کرم اپنا سوال واضح کر سکتے ہیں؟",
        _ => "Could you please clarify your question?",
    }
}

const fn refusal(language: Language) -> &'static str {
    match language {
        Language::Es => "Lo siento, no puedo ayudar con esta solicitud.",
        Language::Hi => "क्षमा करें, मैं इस अनुरोध में सहायता नहीं कर सकता।",
        Language::Ur => "معذرت، میں اس درخواست میں مدد نہیں کر سکتا۔",
        _ => "I'm sorry, but I'm unable to help with that request.",
    }
}

/// Refusal in the query's language followed by the reason.
///
/// The reason explanation is English; other languages get the reason code.
pub fn escalation_message(language: Language, reason: EscalationReason) -> String {
    match language {
        Language::Es | Language::Hi | Language::Ur => {
            format!("{} [{}]", refusal(language), reason.code())
        }
        _ => format!("{} {}", refusal(language), reason.describe()),
    }
}
