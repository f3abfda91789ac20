//! Slide deck: the fixed, ordered content the synchronizer walks through.

use std::fs;
use std::path::Path;
use std::slice;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// One slide. Immutable once the deck is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slide {
    /// 0-based position, assigned by [`Deck`]
    #[serde(skip)]
    pub index: usize,
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub bullets: Vec<String>,
    /// Narration text, also shown as the caption
    pub script: String,
}

impl Slide {
    pub fn new(title: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            index: 0,
            title: title.into(),
            subtitle: String::new(),
            bullets: Vec::new(),
            script: script.into(),
        }
    }
}

#[derive(Deserialize)]
struct DeckFile {
    #[serde(default)]
    slides: Vec<Slide>,
}

/// Ordered, non-empty, fixed-length sequence of slides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deck {
    slides: Vec<Slide>,
}

impl Deck {
    /// Builds a deck, re-assigning indices `0..n`.
    ///
    /// # Errors
    /// Returns an error if `slides` is empty.
    pub fn new(mut slides: Vec<Slide>) -> Result<Self> {
        if slides.is_empty() {
            bail!("A deck needs at least one slide");
        }
        for (index, slide) in slides.iter_mut().enumerate() {
            slide.index = index;
        }
        Ok(Self { slides })
    }

    /// The built-in seven-slide training deck.
    pub fn builtin() -> Self {
        let slides = BUILTIN_SLIDES
            .iter()
            .enumerate()
            .map(|(index, (title, subtitle, bullets, script))| Slide {
                index,
                title: (*title).to_string(),
                subtitle: (*subtitle).to_string(),
                bullets: bullets.iter().map(|b| (*b).to_string()).collect(),
                script: (*script).to_string(),
            })
            .collect();
        Self { slides }
    }

    /// Parses a TOML deck made of `[[slides]]` tables.
    ///
    /// # Errors
    /// Returns an error if the TOML is invalid or contains no slides.
    pub fn parse(contents: &str) -> Result<Self> {
        let file: DeckFile = toml::from_str(contents).context("Invalid deck TOML")?;
        Self::new(file.slides)
    }

    /// Loads a TOML deck from disk.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or is empty.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read deck from {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("Failed to load deck {}", path.display()))
    }

    pub fn len(&self) -> usize {
        self.slides.len()
    }

    /// Always false: construction rejects empty decks.
    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Slide> {
        self.slides.get(index)
    }

    pub fn iter(&self) -> slice::Iter<'_, Slide> {
        self.slides.iter()
    }
}

impl<'a> IntoIterator for &'a Deck {
    type Item = &'a Slide;
    type IntoIter = slice::Iter<'a, Slide>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

type SlideRow = (&'static str, &'static str, &'static [&'static str], &'static str);

const BUILTIN_SLIDES: [SlideRow; 7] = [
    (
        "채용 평판조회 법적 리스크 예방",
        "인재 영입, 안전하고 공정하게!",
        &[
            "임직원 여러분, 안녕하십니까.",
            "우수 인재 채용을 위한 평판조회,",
            "법적 리스크 없이 진행하는 방법을 알아봅니다.",
        ],
        "안녕하십니까, 임직원 여러분. 우리 회사는 우수한 인재를 영입하기 위해 최선을 다하고 있습니다. 그 과정에서 후보자의 역량을 검증하기 위해 평판조회를 진행하는 경우가 많습니다. 오늘은 안전한 채용을 위한 평판조회 가이드를 말씀드리겠습니다.",
    ),
    (
        "동의 없는 정보 수집 금지",
        "개인정보보호법 위반 사례",
        &[
            "전 직장 인사팀 직접 문의 금지",
            "지원자 동의 없음 = 불법",
            "결과: 5년 이하 징역 또는 벌금형",
        ],
        "가장 흔히 발생하는 실수는 지원자의 동의 없이 평판을 조회하는 것입니다. 전 직장 인사팀에 직접 연락해 정보를 얻는 행위는 개인정보보호법상 형사처벌 대상이 될 수 있습니다.",
    ),
    (
        "지인 찬스 리스크",
        "사적인 대화도 법적 책임이 따릅니다",
        &[
            "전 직장 동료 문의 금지",
            "공식 정보가 아니더라도 위험",
            "결과: 최대 5천만 원 과태료",
        ],
        "사적인 네트워크를 통한 조회도 마찬가지입니다. 업무 목적으로 지원자의 동의 없이 정보를 수집했다면 과태료 부과 대상이 될 가능성이 매우 높으므로 주의해야 합니다.",
    ),
    (
        "제공자의 법적 리스크",
        "선의로 알려줘도 처벌받을 수 있습니다",
        &[
            "형법상 명예훼손죄 성립",
            "비밀유지 의무 위반",
            "비방 목적 인정 시 가중 처벌",
        ],
        "정보를 제공하는 사람 역시 명예훼손이나 영업비밀 유출 등으로 법적 분쟁에 휘말릴 수 있습니다. 평판 조회를 요청할 때도, 응답할 때도 신중함이 필요합니다.",
    ),
    (
        "채용절차법 준수",
        "직무와 무관한 정보 수집 금지",
        &[
            "부모 직업, 재산, 혼인 등 금지",
            "직무 수행과 무관한 개인사 배제",
            "위반 시 즉시 과태료 부과",
        ],
        "채용절차법에 따라 직무와 무관한 개인적인 정보를 묻는 것은 엄격히 금지되어 있습니다. 오직 지원자의 직무 역량에만 집중하여 평가해야 합니다.",
    ),
    (
        "안전한 조회를 위한 원칙",
        "반드시 지켜야 할 3요소",
        &[
            "1. 서면 동의 획득",
            "2. 지정된 레퍼리에게만 연락",
            "3. 역량 중심 질문",
        ],
        "안전한 조회를 위해 서면 동의를 반드시 받고, 지원자가 지정한 대상에게만 연락하며, 질문은 성과와 역량에만 집중하십시오.",
    ),
    (
        "교육 요약 및 마무리",
        "준법 채용이 회사의 경쟁력입니다",
        &[
            "인사팀 공식 프로세스 준수",
            "임의적 조회 지양",
            "공정하고 투명한 채용 문화",
        ],
        "결론입니다. 개인적인 평판조회는 큰 리스크를 동반합니다. 반드시 인사팀의 공식 절차를 따라주십시오. 경청해주셔서 감사합니다.",
    ),
];

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn builtin_deck_has_seven_ordered_slides() {
        let deck = Deck::builtin();
        assert_eq!(deck.len(), 7);
        for (expected, slide) in deck.iter().enumerate() {
            assert_eq!(slide.index, expected);
            assert!(!slide.script.is_empty());
            assert_eq!(slide.bullets.len(), 3);
        }
    }

    #[test]
    fn parse_reassigns_indices() {
        let deck = Deck::parse(
            r#"
[[slides]]
title = "Consent first"
script = "Always ask for written consent."

[[slides]]
title = "Job-related questions only"
subtitle = "Stay on competence"
bullets = ["performance", "skills"]
script = "Ask only about performance."
"#,
        )
        .unwrap();

        assert_eq!(deck.len(), 2);
        assert_eq!(deck.get(1).unwrap().index, 1);
        assert_eq!(deck.get(1).unwrap().bullets, vec!["performance", "skills"]);
        assert!(deck.get(0).unwrap().subtitle.is_empty());
        assert!(deck.get(2).is_none());
    }

    #[test]
    fn empty_deck_is_rejected() {
        assert!(Deck::parse("").is_err());
        assert!(Deck::new(Vec::new()).is_err());
    }

    #[test]
    fn load_from_reports_the_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("deck.toml");
        std::fs::write(&path, "[[slides]]\ntitle = 1\n").unwrap();

        let err = Deck::load_from(&path).unwrap_err();
        assert!(format!("{err:#}").contains("deck.toml"));
    }
}
