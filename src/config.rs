use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::storage::{Storage, StorageError};
use crate::template::DEFAULT_CONTENT_TEMPLATE;

/// Storage key holding the JSON-serialized [`Config`].
pub const CONFIG_KEY: &str = "memos_config";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub base_url: String,
    pub api_key: String,
    pub user: String,
    pub default_visibility: VisibilityOption,
    pub content_template: String,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            base_url: String::new(),
            api_key: String::new(),
            user: String::new(),
            default_visibility: VisibilityOption::default(),
            content_template: DEFAULT_CONTENT_TEMPLATE.to_string(),
        }
    }
}

impl Config {
    pub fn is_configured(&self) -> bool {
        !self.base_url.is_empty() && !self.api_key.is_empty() && !self.user.is_empty()
    }
}

/// Stored shape of a visibility choice: `{"name": "Public"}`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityOption {
    pub name: Visibility,
}

impl From<Visibility> for VisibilityOption {
    fn from(name: Visibility) -> VisibilityOption {
        VisibilityOption { name }
    }
}

/// Who can see a memo.
///
/// Names that are not recognised (from an older or hand-edited store) read
/// back as [`Visibility::Public`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Visibility {
    #[default]
    Public,
    Private,
    Workspace,
}

impl Visibility {
    pub const ALL: [Visibility; 3] = [Visibility::Public, Visibility::Private, Visibility::Workspace];

    pub fn name(self) -> &'static str {
        match self {
            Visibility::Public => "Public",
            Visibility::Private => "Private",
            Visibility::Workspace => "Workspace",
        }
    }

    /// Value the Memos API expects.
    pub fn api_value(self) -> &'static str {
        match self {
            Visibility::Public => "PUBLIC",
            Visibility::Private => "PRIVATE",
            Visibility::Workspace => "PROTECTED",
        }
    }
}

impl From<String> for Visibility {
    fn from(name: String) -> Visibility {
        name.parse().unwrap_or_default()
    }
}

impl From<Visibility> for String {
    fn from(v: Visibility) -> String {
        v.name().to_string()
    }
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Visibility, String> {
        Visibility::ALL
            .into_iter()
            .find(|v| v.name().eq_ignore_ascii_case(s) || v.api_value().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown visibility '{}', expected Public, Private or Workspace", s))
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Reads and writes the [`Config`] blob. Performs no normalization of its
/// own; callers clean up values such as the base URL before saving.
pub struct ConfigStore<S> {
    storage: S,
}

impl<S: Storage> ConfigStore<S> {
    pub fn new(storage: S) -> ConfigStore<S> {
        ConfigStore { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn get(&self) -> Result<Config, StorageError> {
        match self.storage.get_item(CONFIG_KEY)? {
            Some(blob) => Ok(serde_json::from_str(&blob)?),
            None => Ok(Config::default()),
        }
    }

    /// Overwrites the stored blob with `config`.
    pub fn save(&self, config: &Config) -> Result<(), StorageError> {
        let blob = serde_json::to_string(config)?;
        self.storage.set_item(CONFIG_KEY, &blob)
    }

    pub fn is_configured(&self) -> Result<bool, StorageError> {
        Ok(self.get()?.is_configured())
    }

    /// Blanks the connection fields. The rest of the blob is dropped, so the
    /// default visibility and template read back as their defaults.
    pub fn clear(&self) -> Result<(), StorageError> {
        let blob = json!({
            "baseUrl": "",
            "apiKey": "",
            "user": "",
        });
        self.storage.set_item(CONFIG_KEY, &blob.to_string())
    }
}
