use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reqwest::Url;
use tokio::task::JoinHandle;

use crate::api::{ApiError, Memo, MemosClient, NewMemo};
use crate::archive;
use crate::config::{Config, ConfigStore, Visibility};
use crate::draft::{create_time, parse_tag, BookmarkDraft};
use crate::error::{Error, Result, ValidationError};
use crate::notify::Notification;
use crate::storage::Storage;
use crate::template::{fill_content_template, DEFAULT_CONTENT_TEMPLATE, PREVIEW_TITLE, PREVIEW_URL};

#[derive(Parser)]
#[clap(version, about)]
/// Save bookmarks as memos on a self-hosted Memos server
pub struct Args {
    /// Storage file holding the saved settings
    #[clap(short, long, parse(from_os_str), env = "MEMOCLIP_STORAGE")]
    pub storage: Option<PathBuf>,
    /// Log debug output to stderr
    #[clap(short, long)]
    pub verbose: bool,
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Connect to a Memos server and store the settings
    Options {
        #[clap(long)]
        base_url: String,
        #[clap(long, env = "MEMOCLIP_API_KEY", hide_env_values = true)]
        api_key: String,
        /// Public, Private or Workspace
        #[clap(long)]
        visibility: Option<Visibility>,
    },
    /// Forget the server connection
    Logout,
    /// Print the stored settings
    Show,
    /// Inspect or change the content template
    Template {
        #[clap(subcommand)]
        action: TemplateAction,
    },
    /// Print the memo that would be created for a page
    Draft {
        #[clap(long)]
        url: String,
        #[clap(long, default_value = "")]
        title: String,
    },
    /// List the tags already used on the server
    Tags,
    /// Save a page as a memo
    Save(SaveArgs),
}

#[derive(Subcommand)]
pub enum TemplateAction {
    Show,
    /// Store a new template; `{title}`, `{url}` and `\n` are recognised
    Set { template: String },
    Reset,
    /// Render a template with example values
    Preview { template: Option<String> },
}

#[derive(Clone, Default, clap::Args)]
pub struct SaveArgs {
    #[clap(long)]
    pub url: String,
    #[clap(long, default_value = "")]
    pub title: String,
    /// Memo body; defaults to the filled content template
    #[clap(long)]
    pub content: Option<String>,
    #[clap(short, long = "tag")]
    pub tags: Vec<String>,
    #[clap(long)]
    pub visibility: Option<Visibility>,
    /// Back-date the memo, as YYYY-MM-DD
    #[clap(long)]
    pub date: Option<String>,
    /// Time of day for --date, as HH:MM
    #[clap(long, requires = "date")]
    pub time: Option<String>,
    /// Skip the Wayback Machine snapshot
    #[clap(long)]
    pub no_archive: bool,
}

pub struct Saved {
    pub memo: Memo,
    pub duplicate_of: Option<Memo>,
    pub archive: Option<JoinHandle<()>>,
}

pub struct MemoClip<S> {
    store: ConfigStore<S>,
}

impl<S: Storage> MemoClip<S> {
    pub fn new(storage: S) -> MemoClip<S> {
        MemoClip {
            store: ConfigStore::new(storage),
        }
    }

    pub async fn run(&self, command: &Command) -> Result<()> {
        match command {
            Command::Options {
                base_url,
                api_key,
                visibility,
            } => {
                let config = self.configure(base_url, api_key, *visibility).await?;
                tracing::info!(user = %config.user, "settings saved");
                Notification::success(
                    "Saved",
                    "Your settings have been saved, you can now save bookmarks.",
                )
                .show();
            }
            Command::Logout => {
                self.logout()?;
                Notification::success("Logged out", "The server connection was removed.").show();
            }
            Command::Show => {
                let config = self.store.get()?;
                println!("Base URL:           {}", config.base_url);
                println!("API key:            {}", mask(&config.api_key));
                println!("User:               {}", config.user);
                println!("Default visibility: {}", config.default_visibility.name);
                println!("Configured:         {}", config.is_configured());
            }
            Command::Template { action } => match action {
                TemplateAction::Show => println!("{}", self.store.get()?.content_template),
                TemplateAction::Set { template } => {
                    self.set_template(Some(template.as_str()))?;
                    Notification::success("Saved", "Template saved.").show();
                }
                TemplateAction::Reset => {
                    self.set_template(None)?;
                    Notification::success("Saved", "Template reset to the default.").show();
                }
                TemplateAction::Preview { template } => {
                    let template = match template {
                        Some(t) => t.clone(),
                        None => self.store.get()?.content_template,
                    };
                    println!("{}", fill_content_template(&template, PREVIEW_TITLE, PREVIEW_URL));
                }
            },
            Command::Draft { url, title } => {
                let draft = self.draft(url, title).await?;
                println!("Visibility: {}", draft.visibility);
                println!("Configured: {}", draft.configured);
                if draft.duplicated {
                    println!("Already saved: yes");
                }
                println!();
                println!("{}", draft.content);
            }
            Command::Tags => {
                for tag in self.tags().await? {
                    println!("{}", tag);
                }
            }
            Command::Save(args) => {
                let saved = self.save(args).await?;
                if let Some(previous) = &saved.duplicate_of {
                    Notification::success(
                        "Note",
                        format!("This page was already saved as {}.", previous.name),
                    )
                    .show();
                }
                Notification::success("Success", "Memo saved successfully!").show();
                if let Some(handle) = saved.archive {
                    archive::settle(handle).await;
                }
            }
        }
        Ok(())
    }

    /// Checks the credentials against the server and stores them. The base
    /// URL loses one trailing `/`; the stored template is kept, and so is the
    /// stored default visibility unless a new one is given.
    pub async fn configure(
        &self,
        base_url: &str,
        api_key: &str,
        visibility: Option<Visibility>,
    ) -> Result<Config> {
        validate_base_url(base_url)?;
        if api_key.trim().is_empty() {
            return Err(ValidationError::new("apiKey", "an API key is required").into());
        }
        let base_url = base_url.strip_suffix('/').unwrap_or(base_url);

        let client = MemosClient::new(base_url, api_key)?;
        let status = client.get_user_status().await?;

        let current = self.store.get()?;
        let config = Config {
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            user: status.name,
            default_visibility: visibility
                .unwrap_or(current.default_visibility.name)
                .into(),
            content_template: current.content_template,
        };
        self.store.save(&config)?;
        Ok(config)
    }

    pub fn logout(&self) -> Result<()> {
        if !self.store.is_configured()? {
            return Err(Error::NotConfigured);
        }
        self.store.clear()?;
        Ok(())
    }

    /// Stores `template`, or the default when `None`, leaving the other
    /// settings as they are.
    pub fn set_template(&self, template: Option<&str>) -> Result<Config> {
        let mut config = self.store.get()?;
        config.content_template = template.unwrap_or(DEFAULT_CONTENT_TEMPLATE).to_string();
        self.store.save(&config)?;
        Ok(config)
    }

    /// Pre-fills the bookmark form for a page. When configured, the server
    /// is asked whether the URL was saved before; a failed lookup only logs.
    pub async fn draft(&self, url: &str, title: &str) -> Result<BookmarkDraft> {
        let config = self.store.get()?;
        let mut draft = BookmarkDraft::new(&config, url, title);
        if draft.configured && !url.is_empty() {
            let client = MemosClient::from_config(&config)?;
            draft.duplicated = find_duplicate(&client, &config, url).await.is_some();
        }
        Ok(draft)
    }

    pub async fn tags(&self) -> Result<Vec<String>> {
        let config = self.configured()?;
        let client = MemosClient::from_config(&config)?;
        Ok(client.list_tags(&config.user).await?)
    }

    pub async fn save(&self, args: &SaveArgs) -> Result<Saved> {
        let config = self.configured()?;

        let mut draft = BookmarkDraft::new(&config, &args.url, &args.title);
        if let Some(content) = &args.content {
            draft.content = content.clone();
        }
        if let Some(visibility) = args.visibility {
            draft.visibility = visibility;
        }
        draft.tags = args
            .tags
            .iter()
            .map(|t| parse_tag(t))
            .collect::<std::result::Result<_, _>>()?;
        let created = match &args.date {
            Some(date) => Some(create_time(date, args.time.as_deref())?),
            None => None,
        };
        draft.validate()?;

        let client = MemosClient::from_config(&config)?;
        let duplicate_of = find_duplicate(&client, &config, &draft.url).await;

        let memo = client
            .create_memo(&NewMemo {
                content: draft.memo_content(),
                visibility: draft.visibility.api_value(),
            })
            .await?;
        tracing::info!(memo = %memo.name, visibility = %draft.visibility, "memo created");

        let memo = match created {
            Some(at) => {
                client
                    .update_memo(&memo.name, Some(&at.to_rfc3339()), None)
                    .await?
            }
            None => memo,
        };

        let archive = (!args.no_archive).then(|| archive::spawn_snapshot(client.http().clone(), &draft.url));
        Ok(Saved {
            memo,
            duplicate_of,
            archive,
        })
    }

    fn configured(&self) -> Result<Config> {
        let config = self.store.get()?;
        if !config.is_configured() {
            return Err(Error::NotConfigured);
        }
        Ok(config)
    }
}

async fn find_duplicate(client: &MemosClient, config: &Config, url: &str) -> Option<Memo> {
    match client.search_memo_by_url(&config.user, url).await {
        Ok(found) => found,
        Err(e) => {
            tracing::warn!(error = %e, "duplicate lookup failed");
            None
        }
    }
}

fn validate_base_url(base_url: &str) -> std::result::Result<(), ValidationError> {
    match Url::parse(base_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => Ok(()),
        _ => Err(ValidationError::new(
            "baseUrl",
            format!("'{}' is not an http(s) URL", base_url),
        )),
    }
}

fn mask(secret: &str) -> String {
    match secret.char_indices().nth_back(3) {
        Some((i, _)) if secret.chars().count() > 8 => format!("****{}", &secret[i..]),
        _ if secret.is_empty() => String::new(),
        _ => "****".to_string(),
    }
}

/// What the user is told when `command` fails with `error`.
pub fn failure_notice(command: &Command, error: &Error) -> Notification {
    match (command, error) {
        (_, Error::Api(ApiError::Unauthorized)) => Notification::error("Invalid API Key"),
        (_, Error::Validation(e)) => Notification::error(e.to_string()),
        (Command::Options { .. }, _) => {
            Notification::error("Something went wrong, check your values are correct.")
        }
        (Command::Logout, _) => Notification::error(
            "Either you didn't configure the extension or there was an error while trying to log out. Please try again.",
        ),
        (_, Error::NotConfigured) => Notification::error(error.to_string()),
        (Command::Save(_), Error::Api(ApiError::Status { message: Some(m), .. })) => {
            Notification::error(m.clone())
        }
        (Command::Save(_), _) => Notification::error(
            "There was an error while trying to save the memo. Please try again.",
        ),
        _ => Notification::error(error.to_string()),
    }
}
