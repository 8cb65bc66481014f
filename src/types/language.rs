use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Reply language requested from the relay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Language {
    #[default]
    English,
    Hindi,
    Hinglish,
}

/// Localized strings for the chat surface.
#[derive(Debug)]
pub struct LanguageTexts {
    pub label: &'static str,
    pub flag: &'static str,
    pub greeting: &'static str,
    pub subtitle: &'static str,
    pub description: &'static str,
    pub features: [&'static str; 3],
    pub prompt: &'static str,
    pub placeholder: &'static str,
}

const ENGLISH_TEXTS: LanguageTexts = LanguageTexts {
    label: "English",
    flag: "🇬🇧",
    greeting: "Hello! I'm Dr. Aisha",
    subtitle: "Your AI Medical Assistant",
    description: "I'm here to help you understand your symptoms and provide general health guidance. Please remember, I'm an AI assistant and cannot replace a real doctor.",
    features: [
        "Ask about your symptoms",
        "Get general health guidance",
        "Know when to see a doctor",
    ],
    prompt: "How can I help you today?",
    placeholder: "Describe your symptoms...",
};

const HINDI_TEXTS: LanguageTexts = LanguageTexts {
    label: "हिंदी",
    flag: "🇮🇳",
    greeting: "नमस्ते! मैं डॉ. आइशा हूं",
    subtitle: "आपकी AI मेडिकल असिस्टेंट",
    description: "मैं यहाँ आपके लक्षणों को समझने और सामान्य स्वास्थ्य मार्गदर्शन प्रदान करने में मदद करने के लिए हूं। कृपया याद रखें, मैं एक AI सहायक हूं और एक वास्तविक डॉक्टर की जगह नहीं ले सकती।",
    features: [
        "अपने लक्षणों के बारे में पूछें",
        "सामान्य स्वास्थ्य मार्गदर्शन प्राप्त करें",
        "जानें कब डॉक्टर से मिलना है",
    ],
    prompt: "आज मैं आपकी कैसे मदद कर सकती हूं?",
    placeholder: "अपने लक्षण बताइए...",
};

const HINGLISH_TEXTS: LanguageTexts = LanguageTexts {
    label: "Hinglish",
    flag: "🇮🇳",
    greeting: "Namaste! Main Dr. Aisha hoon",
    subtitle: "Aapki AI Medical Assistant",
    description: "Main yahaan aapke symptoms samajhne aur general health guidance dene ke liye hoon. Yaad rakhiye, main ek AI assistant hoon aur real doctor ki jagah nahi le sakti.",
    features: [
        "Apne symptoms ke baare mein puchiye",
        "General health guidance paiye",
        "Jaaniye kab doctor se milna hai",
    ],
    prompt: "Aaj main aapki kaise madad kar sakti hoon?",
    placeholder: "Apne symptoms bataiye...",
};

impl Language {
    pub const ALL: [Language; 3] = [Language::English, Language::Hindi, Language::Hinglish];

    pub fn code(self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Hindi => "hi",
            Language::Hinglish => "hinglish",
        }
    }

    /// Parses a wire code. Unknown codes map to English.
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "hi" => Language::Hindi,
            "hinglish" => Language::Hinglish,
            "en" => Language::English,
            other => {
                tracing::debug!(code = other, "unknown language code, using English");
                Language::English
            }
        }
    }

    pub fn texts(self) -> &'static LanguageTexts {
        match self {
            Language::English => &ENGLISH_TEXTS,
            Language::Hindi => &HINDI_TEXTS,
            Language::Hinglish => &HINGLISH_TEXTS,
        }
    }

    /// Next language in selector order, wrapping around.
    pub fn next(self) -> Self {
        match self {
            Language::English => Language::Hindi,
            Language::Hindi => Language::Hinglish,
            Language::Hinglish => Language::English,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let texts = self.texts();
        write!(f, "{} {}", texts.flag, texts.label)
    }
}

impl Serialize for Language {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

impl<'de> Deserialize<'de> for Language {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Ok(Language::from_code(&code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip() {
        for language in Language::ALL {
            assert_eq!(Language::from_code(language.code()), language);
        }
    }

    #[test]
    fn test_unknown_code_falls_back_to_english() {
        assert_eq!(Language::from_code("fr"), Language::English);
        assert_eq!(Language::from_code(""), Language::English);
        assert_eq!(Language::from_code(" HI "), Language::Hindi);
    }

    #[test]
    fn test_deserialize_unknown_code_is_english() {
        let language: Language = serde_json::from_str("\"tamil\"").unwrap();
        assert_eq!(language, Language::English);
        let language: Language = serde_json::from_str("\"hinglish\"").unwrap();
        assert_eq!(language, Language::Hinglish);
    }

    #[test]
    fn test_next_cycles_through_all_languages() {
        let mut language = Language::English;
        let mut seen = Vec::new();
        for _ in 0..3 {
            seen.push(language);
            language = language.next();
        }
        assert_eq!(language, Language::English);
        assert_eq!(seen, Language::ALL.to_vec());
    }

    #[test]
    fn test_texts_are_localized() {
        assert_eq!(Language::Hindi.texts().placeholder, "अपने लक्षण बताइए...");
        assert_eq!(Language::Hinglish.texts().placeholder, "Apne symptoms bataiye...");
        assert!(Language::English.texts().greeting.contains("Dr. Aisha"));
    }
}
