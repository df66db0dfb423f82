// * Per-site configuration
// * One SiteConfig replaces one bespoke scraper: the cascade is fixed, only these values vary.

use scraper::Selector;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read site config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid site config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Selector `{selector}` does not compile: {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Base origin is not an absolute URL: {0}")]
    InvalidBaseOrigin(String),

    #[error("Detail path must not be empty")]
    EmptyDetailPath,

    #[error("No built-in site named `{0}`")]
    UnknownPreset(String),
}

/// How a listing URL changes from one page to the next
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageScheme {
    /// The listing is one page (infinite scroll or no paging)
    #[default]
    Single,
    /// `?{name}=N` on the query string
    QueryParam { name: String },
    /// Last path segment, `{n}` replaced by the page number (e.g. `page-{n}`)
    PathSuffix { template: String },
    /// `{name}=N` inside a fragment starting with `prefix` (e.g. `#search&...`)
    FragmentParam { name: String, prefix: String },
}

/// Per-field selectors read inside a stable-attribute card before classification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldSelectors {
    pub title: Option<String>,
    pub institution: Option<String>,
    pub location: Option<String>,
    pub tuition: Option<String>,
}

impl FieldSelectors {
    pub fn new(title: &str, institution: &str, location: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            institution: Some(institution.to_string()),
            location: Some(location.to_string()),
            tuition: None,
        }
    }

    pub fn with_tuition(mut self, selector: &str) -> Self {
        self.tuition = Some(selector.to_string());
        self
    }

    // * Declared selectors in record field order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        [&self.title, &self.institution, &self.location, &self.tuition]
            .into_iter()
            .filter_map(|s| s.as_deref())
    }
}

/// Everything the pipeline and the renderer need to know about one site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Source label: provenance tag and output file prefix
    pub label: String,
    /// Origin relative hrefs are resolved against
    pub base_origin: String,
    /// Substring of an href that marks a program detail page
    pub detail_path: String,
    /// Site-specific card selector for the stable-attribute strategy
    #[serde(default)]
    pub stable_selector: Option<String>,
    /// Selector the renderer waits for before taking the HTML
    #[serde(default)]
    pub ready_selector: Option<String>,
    /// First listing page, when the site has a sensible default
    #[serde(default)]
    pub start_url: Option<String>,
    #[serde(default)]
    pub page_scheme: PageScheme,
    /// Field selectors applied to stable-attribute cards
    #[serde(default)]
    pub field_selectors: FieldSelectors,
}

const HOTCOURSES_START_URL: &str = "https://www.hotcoursesabroad.com/study/training-degrees/international/postgraduate/computer-and-mathematical-science-courses/slevel/3/cgory/e-2/sin/ct/programs.html#search&catCode=E-2&countryId=211&parentQualId=3&nationCode=59&nationCntryCode=59&studyAbroad=Y&studyOnline=N&studyCross=N&studyDomestic=N&studyPartTime=N&startOnlineCampusLater=N&manStdyAbrdFlg=Y&parentCatEngName=Computer%20and%20Mathematical%20Science&fastlane=N";

const PRESET_NAMES: &[&str] = &["applyboard", "bachelorsportal", "educations", "hotcourses"];

impl SiteConfig {
    /// Creates a minimal config; selectors and paging can be set afterwards
    pub fn new(label: &str, base_origin: &str, detail_path: &str) -> Self {
        Self {
            label: label.to_string(),
            base_origin: base_origin.to_string(),
            detail_path: detail_path.to_string(),
            stable_selector: None,
            ready_selector: None,
            start_url: None,
            page_scheme: PageScheme::Single,
            field_selectors: FieldSelectors::default(),
        }
    }

    pub fn with_stable_selector(mut self, selector: &str) -> Self {
        self.stable_selector = Some(selector.to_string());
        self
    }

    pub fn with_ready_selector(mut self, selector: &str) -> Self {
        self.ready_selector = Some(selector.to_string());
        self
    }

    pub fn with_start_url(mut self, url: &str) -> Self {
        self.start_url = Some(url.to_string());
        self
    }

    pub fn with_page_scheme(mut self, scheme: PageScheme) -> Self {
        self.page_scheme = scheme;
        self
    }

    pub fn with_field_selectors(mut self, selectors: FieldSelectors) -> Self {
        self.field_selectors = selectors;
        self
    }

    /// Names of the built-in presets
    pub fn presets() -> &'static [&'static str] {
        PRESET_NAMES
    }

    /// Returns a built-in preset by name
    pub fn preset(name: &str) -> Result<Self, ConfigError> {
        let config = match name.to_ascii_lowercase().as_str() {
            "applyboard" => Self::new(
                "applyboard_programs",
                "https://www.applyboard.com",
                "/programs/",
            )
            .with_stable_selector("[data-testid='search-result-card']")
            .with_ready_selector("a[href*='/programs/']")
            .with_start_url(
                "https://www.applyboard.com/search?filter[locations]=us&filter[q]=Computer%20Science",
            ),
            "bachelorsportal" => {
                Self::new("bachelors_programs", "https://www.bachelorsportal.com", "/studies/")
                    .with_stable_selector(
                        "div.ProgramCard, article.program-card, div[data-role='ProgramCard']",
                    )
                    .with_ready_selector(".ProgramCard")
                    .with_start_url(
                        "https://www.bachelorsportal.com/search/bachelor/computer-science/germany/page-1",
                    )
                    .with_page_scheme(PageScheme::PathSuffix {
                        template: "page-{n}".to_string(),
                    })
                    .with_field_selectors(
                        FieldSelectors::new(
                            "h3, h2",
                            "a.university, span.institution",
                            "span.location, div.location",
                        )
                        .with_tuition("span.tuition"),
                    )
            }
            "educations" => Self::new(
                "educations_bachelors_na",
                "https://www.educations.com",
                "/study/",
            )
            .with_stable_selector("div.card__content")
            .with_ready_selector(".card__title-link")
            .with_start_url("https://www.educations.com/bachelors-degree/north-america")
            .with_page_scheme(PageScheme::QueryParam {
                name: "page".to_string(),
            })
            .with_field_selectors(FieldSelectors::new(
                "a.card__title-link",
                ".card__provider",
                ".card__location",
            )),
            "hotcourses" => Self::new(
                "hotcourses_programs",
                "https://www.hotcoursesabroad.com",
                "/course-details/",
            )
            .with_stable_selector(".searchResults__cardWrapper")
            .with_ready_selector(".searchResults__cardWrapper")
            .with_start_url(HOTCOURSES_START_URL)
            .with_page_scheme(PageScheme::FragmentParam {
                name: "pageNo".to_string(),
                prefix: "search&".to_string(),
            })
            .with_field_selectors(FieldSelectors::new(
                ".course-title a",
                ".institution-title",
                ".location",
            )),
            _ => return Err(ConfigError::UnknownPreset(name.to_string())),
        };

        Ok(config)
    }

    /// Loads and validates a custom site from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: SiteConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolves a CLI argument: preset name first, then a JSON file path
    pub fn resolve(name_or_path: &str) -> Result<Self, ConfigError> {
        match Self::preset(name_or_path) {
            Ok(config) => Ok(config),
            Err(ConfigError::UnknownPreset(_)) if Path::new(name_or_path).is_file() => {
                Self::from_json_file(name_or_path)
            }
            Err(e) => Err(e),
        }
    }

    /// Checks the origin, detail path and every selector
    pub fn validate(&self) -> Result<(), ConfigError> {
        match Url::parse(&self.base_origin) {
            Ok(url) if url.has_host() => {}
            _ => return Err(ConfigError::InvalidBaseOrigin(self.base_origin.clone())),
        }

        if self.detail_path.trim().is_empty() {
            return Err(ConfigError::EmptyDetailPath);
        }

        if let Some(selector) = &self.stable_selector {
            compile_selector(selector)?;
        }
        if let Some(selector) = &self.ready_selector {
            compile_selector(selector)?;
        }
        for selector in self.field_selectors.iter() {
            compile_selector(selector)?;
        }

        Ok(())
    }
}

/// Compiles a CSS selector, mapping the parser's borrowed error into ConfigError
pub fn compile_selector(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|e| ConfigError::InvalidSelector {
        selector: selector.to_string(),
        reason: format!("{:?}", e),
    })
}
