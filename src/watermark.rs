//! Persistence of the last published item.
//!
//! Two backends share one contract: the local env file the program reads its
//! settings from, or a remote config-vars endpoint when credentials for it
//! are configured.
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::config::{Config, Heroku};

#[async_trait]
pub trait WatermarkStore: Send + Sync {
    async fn get(&self, name: &str) -> Result<Option<String>>;

    async fn set(&self, name: &str, value: &str) -> Result<()>;
}

/// Pick the backend for a configuration: remote when credentials exist,
/// otherwise the env file at `env_file`.
pub fn from_config(cfg: &Config, env_file: &Path) -> Result<Box<dyn WatermarkStore>> {
    match &cfg.heroku {
        Some(heroku) => Ok(Box::new(HerokuConfigStore::new(heroku)?)),
        None => {
            warn!(
                "HerokuToken/HerokuVarsUrl empty, keeping watermark in {}",
                env_file.display()
            );
            Ok(Box::new(EnvFileStore::new(env_file)))
        }
    }
}

/// `KEY='value'` lines in a local file.
#[derive(Debug, Clone)]
pub struct EnvFileStore {
    path: PathBuf,
}

impl EnvFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        let iter = dotenvy::from_path_iter(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        let mut vars = BTreeMap::new();
        for entry in iter {
            let (k, v) =
                entry.with_context(|| format!("failed to parse {}", self.path.display()))?;
            vars.insert(k, v);
        }
        Ok(vars)
    }
}

/// Values are single-quoted so they are read back verbatim; a value holding a
/// single quote falls back to an escaped double-quoted form.
fn render_env(vars: &BTreeMap<String, String>) -> String {
    let mut out = String::new();
    for (k, v) in vars {
        if !v.contains('\'') {
            out.push_str(&format!("{k}='{v}'\n"));
            continue;
        }
        let escaped = v
            .replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('$', "\\$")
            .replace('\n', "\\n");
        out.push_str(&format!("{k}=\"{escaped}\"\n"));
    }
    out
}

#[async_trait]
impl WatermarkStore for EnvFileStore {
    async fn get(&self, name: &str) -> Result<Option<String>> {
        if !tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(None);
        }
        Ok(self.read_all()?.remove(name))
    }

    async fn set(&self, name: &str, value: &str) -> Result<()> {
        let mut vars = match self.read_all() {
            Ok(vars) => vars,
            Err(err) => {
                warn!(?err, "loading env file");
                BTreeMap::new()
            }
        };
        vars.insert(name.to_string(), value.to_string());
        tokio::fs::write(&self.path, render_env(&vars))
            .await
            .with_context(|| format!("failed to write {}", self.path.display()))
    }
}

/// App config vars behind a `PATCH`-able JSON endpoint.
#[derive(Clone)]
pub struct HerokuConfigStore {
    http: Client,
    url: Url,
    token: String,
}

impl std::fmt::Debug for HerokuConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HerokuConfigStore")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl HerokuConfigStore {
    pub fn new(heroku: &Heroku) -> Result<Self> {
        let url = Url::parse(&heroku.vars_url).context("invalid HerokuVarsUrl")?;
        let http = Client::builder()
            .user_agent("tg-ytchan/0.1")
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            url,
            token: heroku.token.clone(),
        })
    }

    fn request(&self, method: reqwest::Method) -> reqwest::RequestBuilder {
        self.http
            .request(method, self.url.clone())
            .header("Accept", "application/vnd.heroku+json; version=3")
            .header("Authorization", format!("Bearer {}", self.token))
    }

    pub fn build_patch(&self, name: &str, value: &str) -> Result<reqwest::Request> {
        let mut body = Map::new();
        body.insert(name.to_string(), json!(value));
        self.request(reqwest::Method::PATCH)
            .json(&Value::Object(body))
            .build()
            .context("failed to build config-vars request")
    }
}

#[async_trait]
impl WatermarkStore for HerokuConfigStore {
    async fn get(&self, name: &str) -> Result<Option<String>> {
        let res = self
            .request(reqwest::Method::GET)
            .send()
            .await
            .context("failed to reach config vars")?;
        if res.status() != reqwest::StatusCode::OK {
            return Err(anyhow!("response status: {}", res.status()));
        }
        let vars: BTreeMap<String, Option<String>> =
            res.json().await.context("invalid config vars JSON")?;
        Ok(vars.get(name).cloned().flatten())
    }

    async fn set(&self, name: &str, value: &str) -> Result<()> {
        let req = self.build_patch(name, value)?;
        let res = self
            .http
            .execute(req)
            .await
            .context("failed to reach config vars")?;
        if res.status() != reqwest::StatusCode::OK {
            return Err(anyhow!("response status: {}", res.status()));
        }
        Ok(())
    }
}
