//! Prompt and diagnostic text for page translation.
//!
//! Everything the service says to the model, or says to the reader in place
//! of a translation, is built here so the wording can be checked by unit
//! tests without a backend.

/// Human-readable name for a language code, as used in the prompt.
///
/// Unknown codes are returned verbatim.
pub fn language_label(code: &str) -> &str {
    match code {
        "en" => "English",
        "pt-BR" => "Brazilian Portuguese",
        "es" => "Spanish",
        "fr" => "French",
        "de" => "German",
        "it" => "Italian",
        "ja" => "Japanese",
        "zh-Hans" => "Chinese (Simplified)",
        other => other,
    }
}

/// Build the single user message sent for one page.
pub fn translation_prompt(text: &str, source_lang: &str, target_lang: &str) -> String {
    let src = language_label(source_lang);
    let tgt = language_label(target_lang);
    format!(
        "You are a professional {src} ({source_lang}) to {tgt} ({target_lang}) translator. \
Your goal is to accurately convey the meaning and nuances of the original text while \
adhering to the grammar, vocabulary, and cultural sensitivities of the target language. \
Preserve all numbers, units, acronyms, and technical terms when appropriate. \
If the text is incomplete or illegible, indicate that briefly in the target language \
without inventing content. Produce only the {tgt} translation, without any additional \
explanations or commentary.\n\n\
Please translate the following {src} text into {tgt}:\n\n\
{text}"
    )
}

/// Locale family used to pick diagnostic wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NoticeLocale {
    Portuguese,
    Spanish,
    French,
    German,
    English,
}

fn notice_locale(target_lang: &str) -> NoticeLocale {
    let primary = target_lang
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    match primary.as_str() {
        "pt" => NoticeLocale::Portuguese,
        "es" => NoticeLocale::Spanish,
        "fr" => NoticeLocale::French,
        "de" => NoticeLocale::German,
        _ => NoticeLocale::English,
    }
}

/// Placeholder written in place of a page whose backend call failed.
pub fn transport_failure_notice(target_lang: &str, error: &str) -> String {
    match notice_locale(target_lang) {
        NoticeLocale::Portuguese => format!(
            "Falha ao traduzir este trecho com o modelo de tradução. Mensagem técnica: {error}"
        ),
        NoticeLocale::Spanish => format!(
            "No se pudo traducir este fragmento con el modelo de traducción. Mensaje técnico: {error}"
        ),
        NoticeLocale::French => format!(
            "Échec de la traduction de ce passage par le modèle de traduction. Message technique : {error}"
        ),
        NoticeLocale::German => format!(
            "Dieser Abschnitt konnte vom Übersetzungsmodell nicht übersetzt werden. Technische Meldung: {error}"
        ),
        NoticeLocale::English => format!(
            "Failed to translate this passage with the translation model. Technical message: {error}"
        ),
    }
}

/// Placeholder written when the backend answered with something unusable.
pub fn malformed_response_notice(target_lang: &str) -> String {
    let text = match notice_locale(target_lang) {
        NoticeLocale::Portuguese => {
            "Falha ao interpretar a resposta do modelo durante a tradução deste trecho."
        }
        NoticeLocale::Spanish => {
            "No se pudo interpretar la respuesta del modelo al traducir este fragmento."
        }
        NoticeLocale::French => {
            "Impossible d'interpréter la réponse du modèle lors de la traduction de ce passage."
        }
        NoticeLocale::German => {
            "Die Antwort des Modells konnte beim Übersetzen dieses Abschnitts nicht ausgewertet werden."
        }
        NoticeLocale::English => {
            "Failed to interpret the model's response while translating this passage."
        }
    };
    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_have_labels() {
        assert_eq!(language_label("pt-BR"), "Brazilian Portuguese");
        assert_eq!(language_label("zh-Hans"), "Chinese (Simplified)");
        assert_eq!(language_label("ko"), "ko");
    }

    #[test]
    fn prompt_names_both_languages_and_ends_with_text() {
        let prompt = translation_prompt("Hello world", "en", "pt-BR");
        assert!(prompt.starts_with(
            "You are a professional English (en) to Brazilian Portuguese (pt-BR) translator."
        ));
        assert!(prompt.contains("Produce only the Brazilian Portuguese translation"));
        assert!(prompt.ends_with("text into Brazilian Portuguese:\n\nHello world"));
    }

    #[test]
    fn portuguese_notices_match_both_codes() {
        let a = transport_failure_notice("pt-BR", "connection refused");
        let b = transport_failure_notice("pt", "connection refused");
        assert_eq!(a, b);
        assert!(a.ends_with("Mensagem técnica: connection refused"));
        assert_eq!(
            malformed_response_notice("pt-BR"),
            "Falha ao interpretar a resposta do modelo durante a tradução deste trecho."
        );
    }

    #[test]
    fn unknown_targets_fall_back_to_english() {
        assert!(transport_failure_notice("ja", "timeout").starts_with("Failed to translate"));
        assert!(malformed_response_notice("").starts_with("Failed to interpret"));
    }

    #[test]
    fn regional_variants_share_a_locale() {
        assert_eq!(notice_locale("es-MX"), NoticeLocale::Spanish);
        assert_eq!(notice_locale("fr_CA"), NoticeLocale::French);
        assert_eq!(notice_locale("DE"), NoticeLocale::German);
    }
}
