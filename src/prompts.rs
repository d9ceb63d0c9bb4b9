//! Segmentation instructions and the request builder.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — tightening a segmentation rule (e.g. the
//!    delimiter scheme) requires editing exactly one place.
//!
//! 2. **Testability** — unit tests can inspect the built request directly
//!    without a live LLM, so instruction regressions are caught cheaply.
//!
//! The instructions are Turkish because the product is: cards are `Kart`,
//! headings are `Ana Başlık` / `Alt Başlık`, and the OCR default language is
//! Turkish. The generator must preserve the source wording regardless of
//! language, so the rules spell that out first.

use crate::cards::ResponseContract;
use serde::{Deserialize, Serialize};

/// Default instructions: partition by topic, keep wording and order, separate
/// units with `=== KART <N> ===` markers.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"Sen bir PDF okuma asistanısın. Amacın, okuyucunun okuma alışkanlığı kazanması için belge içeriğinden "okuma kartları" oluşturmak.

Kurallar:
1. Metni sadece konu başlıklarına ve bütünlüğe göre anlamlı parçalara ayır
2. Kelimeleri değiştirme, metni olduğu gibi koru
3. Ek özet, yorum veya açıklama ekleme
4. Kartların sırası orijinal sıralamaya sadık kalsın
5. Her kartı "=== KART [NUMARA] ===" ile ayır, numaralar 1'den başlasın

Örnek format:
=== KART 1 ===
[Orijinal metin bölümü]

=== KART 2 ===
[Orijinal metin bölümü]"#;

/// Structured instructions: same partitioning and delimiter scheme, plus a
/// labelled main heading and sub-heading inferred per unit. One main heading
/// may span several consecutive units.
pub const STRUCTURED_SYSTEM_PROMPT: &str = r#"Sen bir PDF okuma asistanısın. Amacın, belge içeriğinden başlıklandırılmış "okuma kartları" oluşturmak.

Kurallar:
1. Metni konu başlıklarına ve bütünlüğe göre anlamlı parçalara ayır
2. Gövde metnindeki kelimeleri değiştirme, olduğu gibi koru
3. Her kart için içerikten bir ana başlık ve bir alt başlık çıkar; bir ana başlık birden fazla kartı kapsayabilir
4. Her kartın başına şu etiketli satırları ekle:
Ana Başlık: [ana başlık]
Alt Başlık: [alt başlık]
5. Kartların sırası orijinal sıralamaya sadık kalsın
6. Her kartı "=== KART [NUMARA] ===" ile ayır, numaralar 1'den başlasın"#;

/// JSON-contract instructions: respond only with strict JSON, prose forbidden.
pub const JSON_SYSTEM_PROMPT: &str = r#"Sen bir PDF okuma asistanısın. Amacın, belge içeriğini "okuma kartlarına" dönüştürmek.

Kurallar:
- Metindeki kelimeleri değiştirme, olduğu gibi koru
- Metni sadece konu başlıklarına ve bütünlüğe göre parçalara ayır
- Kartların sırası orijinal sıralamaya sadık kalsın
- Ek özet, yorum veya açıklama ekleme
- Her kart için içerikten türetilmiş uygun bir başlık oluştur

SADECE geçerli JSON döndür, başka hiçbir metin yazma:
{"cards": [{"title": "Kart başlığı", "content": "Orijinal metin içeriği"}]}

Hata durumunda:
{"error": "hata açıklaması", "cards": []}"#;

/// Which built-in instruction set to use, or caller-supplied instructions
/// used verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PromptVariant {
    /// Topic partitioning only; delimiter output. (default)
    #[default]
    Default,
    /// Adds `Ana Başlık:` / `Alt Başlık:` labelled heading lines per unit.
    Structured,
    /// Caller-supplied system instructions, used as-is. The builder does not
    /// second-guess whatever output format they specify.
    Custom(String),
}

/// Options for [`build_request`].
#[derive(Debug, Clone, Default)]
pub struct SegmentOptions {
    pub variant: PromptVariant,
    pub contract: ResponseContract,
    /// The user-facing range spec, forwarded as an advisory hint. `"all"`
    /// and empty strings add nothing; the pipeline does not independently
    /// enforce the hint.
    pub page_range_hint: String,
}

/// A fully built segmentation request: system instructions plus the user
/// payload carrying the document text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentationRequest {
    pub system: String,
    pub user: String,
}

/// Build the system instructions and user payload for one segmentation call.
///
/// The JSON contract overrides the Default/Structured instruction sets (those
/// describe the delimiter scheme); a Custom variant always wins, since the
/// caller has taken responsibility for the output format.
pub fn build_request(text: &str, options: &SegmentOptions) -> SegmentationRequest {
    let mut system = match (&options.variant, options.contract) {
        (PromptVariant::Custom(instructions), _) => instructions.clone(),
        (_, ResponseContract::Json) => JSON_SYSTEM_PROMPT.to_string(),
        (PromptVariant::Default, ResponseContract::Delimited) => DEFAULT_SYSTEM_PROMPT.to_string(),
        (PromptVariant::Structured, ResponseContract::Delimited) => {
            STRUCTURED_SYSTEM_PROMPT.to_string()
        }
    };

    let hint = options.page_range_hint.trim();
    if !hint.is_empty() && !hint.eq_ignore_ascii_case("all") {
        system.push_str(&format!(
            "\n\nSadece belgenin {hint} sayfa aralığındaki içeriği analiz et."
        ));
    }

    SegmentationRequest {
        system,
        user: format!("Lütfen aşağıdaki içeriği okuma kartlarına dönüştür:\n\n{text}"),
    }
}
