use serde::Serialize;

/// A language the chat UI offers by default. `code` is what the translate
/// endpoint understands, `speech_code` the BCP-47 tag recognizers expect.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct Language {
    pub name: &'static str,
    pub code: &'static str,
    pub speech_code: &'static str,
}

/// Languages offered by the relay's clients. Free-form codes are still
/// accepted on the chat path; this table backs `/languages` only.
pub const SUPPORTED: &[Language] = &[
    Language { name: "Hindi", code: "hi", speech_code: "hi-IN" },
    Language { name: "English", code: "en", speech_code: "en-US" },
    Language { name: "Spanish", code: "es", speech_code: "es-ES" },
    Language { name: "French", code: "fr", speech_code: "fr-FR" },
    Language { name: "German", code: "de", speech_code: "de-DE" },
    Language { name: "Chinese", code: "zh-cn", speech_code: "zh-CN" },
    Language { name: "Japanese", code: "ja", speech_code: "ja-JP" },
    Language { name: "Arabic", code: "ar", speech_code: "ar-SA" },
    Language { name: "Portuguese", code: "pt", speech_code: "pt-PT" },
    Language { name: "Russian", code: "ru", speech_code: "ru-RU" },
];

/// Sentinel asking the translator to detect the source language itself.
pub const AUTO: &str = "auto";

pub fn is_supported(code: &str) -> bool {
    code == AUTO || SUPPORTED.iter().any(|l| l.code.eq_ignore_ascii_case(code))
}

pub fn name_of(code: &str) -> Option<&'static str> {
    SUPPORTED
        .iter()
        .find(|l| l.code.eq_ignore_ascii_case(code))
        .map(|l| l.name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes() {
        assert!(is_supported("hi"));
        assert!(is_supported("EN"));
        assert!(is_supported("zh-cn"));
        assert!(is_supported(AUTO));
        assert!(!is_supported("xx"));
    }

    #[test]
    fn name_lookup() {
        assert_eq!(name_of("fr"), Some("French"));
        assert_eq!(name_of("auto"), None);
        assert_eq!(name_of("klingon"), None);
    }

    #[test]
    fn table_serializes() {
        let json = serde_json::to_value(SUPPORTED).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 10);
        assert_eq!(json[0]["code"], "hi");
        assert_eq!(json[1]["speech_code"], "en-US");
    }
}
