use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use compact_str::CompactString;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::{filter::RevisionFilter, page::PageRef};

const PROJECT_VOX_START: NaiveDate = match NaiveDate::from_ymd_opt(2014, 2, 28) {
    Some(date) => date,
    None => panic!("invalid default start date"),
};

// (label, title, language)
const PROJECT_VOX_PAGES: &[(&str, &str, &str)] = &[
    ("Margaret Cavendish (English)", "Margaret_Cavendish,_Duchess_of_Newcastle-upon-Tyne", "en"),
    ("Margaret Cavendish (French)", "Margaret_Cavendish", "fr"),
    ("Margaret Cavendish (Spanish)", "Margaret_Cavendish", "es"),
    ("Margaret Cavendish (German)", "Margaret_Cavendish,_Duchess_of_Newcastle", "de"),
    ("Margaret Cavendish (Italian)", "Margaret_Cavendish", "it"),
    ("Margaret Cavendish (Russian)", "Кавендиш,_Маргарет", "ru"),
    ("Émilie du Châtelet (English)", "Émilie_du_Châtelet", "en"),
    ("Émilie du Châtelet (German)", "Émilie_du_Châtelet", "de"),
    ("Émilie du Châtelet (Spanish)", "Émilie_du_Châtelet", "es"),
    ("Émilie du Châtelet (French)", "Émilie_du_Châtelet", "fr"),
    ("Émilie du Châtelet (Italian)", "Émilie_du_Châtelet", "it"),
    ("Émilie du Châtelet (Vietnamese)", "Émilie_du_Châtelet", "vi"),
    ("Anne Conway (English)", "Anne_Conway_(philosopher)", "en"),
    ("Anne Conway (Italian)", "Anne_Conway", "it"),
    ("Anne Conway (French)", "Anne_Conway", "fr"),
    ("Anne Finch (Spanish)", "Anne_Finch", "es"),
    ("Anne Conway (German)", "Anne_Conway", "de"),
    ("Anne Conway (Russian)", "Конуэй,_Энн", "ru"),
    ("Anne Conway (Korean)", "앤_콘웨이", "ko"),
    ("Juana Inés de la Cruz (English)", "Juana_Inés_de_la_Cruz", "en"),
    ("Juana Inés de la Cruz (German)", "Juana_Inés_de_la_Cruz", "de"),
    ("Juana Inés de la Cruz (Spanish)", "Juana_Inés_de_la_Cruz", "es"),
    ("Juana Inés de la Cruz (French)", "Juana_Inés_de_la_Cruz", "fr"),
    ("Juana Inés de la Cruz (Italian)", "Juana_Inés_de_la_Cruz", "it"),
    ("Juana Inés de la Cruz (Vietnamese)", "Juana_Inés_de_la_Cruz", "vi"),
    ("Juana Inés de la Cruz (Russian)", "Хуана_Инес_де_ла_Крус", "ru"),
    ("Juana Inés de la Cruz (Korean)", "후아나_이네스_데_라_크루스", "ko"),
    ("Juana Inés de la Cruz (Chinese)", "胡安娜·伊内斯·德·拉·克鲁兹", "zh"),
];

const PROJECT_VOX_EDITORS: &[&str] = &[
    "ZL027", "Nubia Nurain Khan", "NetwonsBucket", "My Poor Meatball",
    "Modernistarthistorian", "MaxyMama", "Lizmilewicz", "Lily Saige",
    "Janiak123", "Fmercer", "Citedesdames", "13mpurcell11",
    "Following Zero", "Bemonubu", "Oddlyintoppe", "lindsaymarie403",
    "ayji", "wsshaw498", "philosophyfan_22", "historian42", "wiki_wanderer",
    "RenaissanceMind", "earlymodernwoman", "feministtheorist",
    "intellectualroots", "academic_writer", "FccFcc", "hlj2014", "Jmbanks23",
    "Aurorakexin", "mjv5712", "Lascano 222", "Truth And Humility Matter", "Sortizhinojosa",
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    #[error("invalid config")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageEntry {
    pub label: String,
    pub title: String,
    pub language: String,
}

impl PageEntry {
    pub fn page_ref(&self) -> PageRef {
        PageRef::new(self.title.clone(), self.language.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Action API URL with a `{lang}` placeholder for the language code.
    pub endpoint_template: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            user_agent: concat!(
                "wikipersist/",
                env!("CARGO_PKG_VERSION"),
                " (edit persistency research tool)"
            )
            .to_string(),
            timeout_secs: 30,
            endpoint_template: "https://{lang}.wikipedia.org/w/api.php".to_string(),
        }
    }
}

/// Startup configuration: the tracked pages, the editor allow-list and API settings.
///
/// Every field is optional in the JSON form and falls back to the built-in Project Vox
/// configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub default_start: NaiveDate,
    pub pages: Vec<PageEntry>,
    pub editors: Vec<CompactString>,
    pub api: ApiSettings,
    /// Number of editors listed in the summary report.
    pub top_editors: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_start: PROJECT_VOX_START,
            pages: PROJECT_VOX_PAGES
                .iter()
                .map(|(label, title, language)| PageEntry {
                    label: label.to_string(),
                    title: title.to_string(),
                    language: language.to_string(),
                })
                .collect(),
            editors: PROJECT_VOX_EDITORS
                .iter()
                .copied()
                .map(CompactString::from)
                .collect(),
            api: ApiSettings::default(),
            top_editors: 10,
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json(&content)?;
        tracing::debug!(
            message = "loaded config",
            path = %path.as_ref().display(),
            pages = config.pages.len(),
            editors = config.editors.len()
        );
        Ok(config)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn page(&self, label: &str) -> Option<&PageEntry> {
        self.pages.iter().find(|p| p.label == label)
    }

    pub fn editor_allow_list(&self) -> FxHashSet<CompactString> {
        self.editors.iter().cloned().collect()
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        start_of_day(self.default_start)
    }

    /// Build the filter for a run, restricted to the configured editors unless `all_editors`.
    pub fn revision_filter(&self, start: DateTime<Utc>, all_editors: bool) -> RevisionFilter {
        let filter = RevisionFilter::new(start);
        if all_editors {
            filter
        } else {
            filter.with_editors(self.editors.iter().cloned())
        }
    }
}

pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}
