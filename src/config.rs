use std::{collections::HashSet, num::NonZeroUsize};

use indexmap::IndexMap;
use itertools::Itertools as _;
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Clone, Debug)]
#[serde(tag = "type")]
pub enum Store {
    S3 {
        bucket: String,
        region: Option<String>,
        endpoint: Option<String>,
        access_key_id: Option<String>,
        secret_access_key: Option<String>,
    },
    Sqlite {
        url: String,
    },
}

#[derive(Deserialize, Clone, Debug)]
#[serde(tag = "type")]
pub enum Notify {
    Log,
    Webhook { url: String },
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MergeMode {
    /// Same-key rows are removed from the log and the new rows appended.
    #[default]
    AppendDistinct,
    /// Same-key rows are replaced where they stand; unseen keys are appended.
    FullOverwrite,
}

/// An optional column together with the value used when it is absent or blank.
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct OptionalColumn {
    pub name: String,
    #[serde(default)]
    pub default: String,
}

fn default_handle() -> String {
    "Handle".into()
}

fn default_disambiguator() -> String {
    "Image Src".into()
}

fn default_title() -> String {
    "Title".into()
}

fn default_description() -> String {
    "desc".into()
}

fn default_targets() -> Vec<String> {
    vec![
        "SEO Description".into(),
        "Body (HTML)".into(),
        "desc (product.metafields.custom.desc)".into(),
    ]
}

fn default_completion() -> String {
    "edited".into()
}

fn default_fabric() -> OptionalColumn {
    OptionalColumn {
        name: "fabric".into(),
        default: "saree".into(),
    }
}

fn default_product_type() -> OptionalColumn {
    OptionalColumn {
        name: "product_type".into(),
        default: String::new(),
    }
}

#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Columns {
    #[serde(default = "default_handle")]
    pub handle: String,
    #[serde(default = "default_disambiguator")]
    pub disambiguator: String,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_description")]
    pub description: String,
    #[serde(default = "default_targets")]
    pub targets: Vec<String>,
    #[serde(default = "default_completion")]
    pub completion: String,
    #[serde(default = "default_fabric")]
    pub fabric: OptionalColumn,
    #[serde(default = "default_product_type")]
    pub product_type: OptionalColumn,
}

impl Default for Columns {
    fn default() -> Self {
        Self {
            handle: default_handle(),
            disambiguator: default_disambiguator(),
            title: default_title(),
            description: default_description(),
            targets: default_targets(),
            completion: default_completion(),
            fabric: default_fabric(),
            product_type: default_product_type(),
        }
    }
}

impl Columns {
    /// Columns a base dataset cannot be reviewed without.
    pub fn required(&self) -> [&str; 4] {
        [
            self.handle.as_str(),
            self.disambiguator.as_str(),
            self.title.as_str(),
            self.description.as_str(),
        ]
    }

    fn names(&self) -> impl Iterator<Item = &str> {
        self.required()
            .into_iter()
            .chain(self.targets.iter().map(String::as_str))
            .chain([
                self.completion.as_str(),
                self.fabric.name.as_str(),
                self.product_type.name.as_str(),
            ])
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct Category {
    pub label: String,
    pub base: String,
    pub updated: String,
}

fn default_batch_size() -> NonZeroUsize {
    NonZeroUsize::new(5).unwrap_or(NonZeroUsize::MIN)
}

fn default_topic() -> String {
    "catalog-review".into()
}

#[derive(Deserialize, Clone, Debug)]
pub struct NotifyConfig {
    #[serde(flatten)]
    pub kind: Notify,
    #[serde(default = "default_topic")]
    pub topic: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            kind: Notify::Log,
            topic: default_topic(),
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    pub store: Store,
    #[serde(default = "default_batch_size")]
    pub batch_size: NonZeroUsize,
    #[serde(default)]
    pub merge_mode: MergeMode,
    #[serde(default)]
    pub write_back_base: bool,
    #[serde(default)]
    pub columns: Columns,
    #[serde(default)]
    pub notify: NotifyConfig,
    pub categories: IndexMap<String, Category>,
}

impl Config {
    pub fn validate(&self) -> Result<(), String> {
        if self.categories.is_empty() {
            return Err("no category is configured".into());
        }
        let mut blobs = HashSet::new();
        for (name, category) in &self.categories {
            if category.base == category.updated {
                return Err(format!(
                    "category {name}: base and updated blob are both {}",
                    category.base
                ));
            }
            for blob in [&category.base, &category.updated] {
                if !blobs.insert(blob.as_str()) {
                    return Err(format!("category {name}: blob {blob} is used twice"));
                }
            }
        }
        if self.columns.names().any(|name| name.trim().is_empty()) {
            return Err("column names must not be blank".into());
        }
        if self.columns.targets.is_empty() {
            return Err("at least one target column is required".into());
        }
        if let Notify::Webhook { url } = &self.notify.kind {
            if url.trim().is_empty() {
                return Err("webhook url must not be blank".into());
            }
        }
        Ok(())
    }

    pub fn category(&self, name: &str) -> Result<&Category, String> {
        self.categories.get(name).ok_or_else(|| {
            format!(
                "unknown category {name}; configured: {}",
                self.categories.keys().join(", ")
            )
        })
    }
}
