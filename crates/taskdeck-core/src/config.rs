use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};
use std::time::Duration;

use anyhow::{
  Context,
  anyhow
};
use tracing::{
  debug,
  info,
  trace,
  warn
};

use crate::manager::LoadOrdering;

pub const DEFAULT_API_URL: &str =
  "http://localhost:5000";
pub const API_URL_ENV: &str =
  "TASKDECK_API_URL";
pub const RC_ENV: &str = "TASKDECKRC";

#[derive(Debug, Clone)]
pub struct Config {
  map: HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    let mut map = HashMap::new();
    for (key, value) in [
      ("api.url", DEFAULT_API_URL),
      ("api.tasks_path", "/tasks"),
      ("api.timeout_secs", "30"),
      ("filter.debounce_ms", "300"),
      ("load.ordering", "arrival"),
      ("color", "on")
    ] {
      map.insert(
        key.to_string(),
        value.to_string()
      );
    }
    Config {
      map,
      loaded_files: vec![]
    }
  }
}

impl Config {
  #[tracing::instrument(skip(
    rc_override
  ))]
  pub fn load(
    rc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::default();

    let rc =
      resolve_rc_path(rc_override)?;
    if let Some(path) = rc {
      info!(rcfile = %path.display(), "loading rc file");
      cfg.load_file(&path)?;
    } else {
      debug!(
        "no rc file found; using \
         defaults"
      );
    }

    if let Ok(url) =
      std::env::var(API_URL_ENV)
      && !url.trim().is_empty()
    {
      debug!(url = %url, "api url taken from environment");
      cfg.set("api.url", url.trim());
    }

    Ok(cfg)
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      debug!(key = %k, value = %v, "applying override");
      self.map.insert(k, v);
    }
  }

  pub fn set(
    &mut self,
    key: &str,
    value: &str
  ) {
    self.map.insert(
      key.to_string(),
      value.to_string()
    );
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  pub fn api_url(&self) -> String {
    self
      .get("api.url")
      .filter(|v| !v.trim().is_empty())
      .unwrap_or_else(|| {
        DEFAULT_API_URL.to_string()
      })
  }

  pub fn tasks_path(&self) -> String {
    self
      .get("api.tasks_path")
      .unwrap_or_else(|| {
        "/tasks".to_string()
      })
  }

  pub fn timeout(
    &self
  ) -> anyhow::Result<Duration> {
    let secs =
      self.get_u64("api.timeout_secs")?;
    Ok(Duration::from_secs(secs))
  }

  pub fn debounce(
    &self
  ) -> anyhow::Result<Duration> {
    let ms =
      self.get_u64("filter.debounce_ms")?;
    Ok(Duration::from_millis(ms))
  }

  pub fn load_ordering(
    &self
  ) -> anyhow::Result<LoadOrdering> {
    let raw = self
      .get("load.ordering")
      .unwrap_or_else(|| {
        "arrival".to_string()
      });
    match raw
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "arrival" => {
        Ok(LoadOrdering::ArrivalOrder)
      }
      | "latest" | "issued" => {
        Ok(LoadOrdering::LatestIssued)
      }
      | other => {
        Err(anyhow!(
          "invalid load.ordering \
           value: {other}"
        ))
      }
    }
  }

  pub fn color(
    &self
  ) -> anyhow::Result<bool> {
    let raw = self
      .get("color")
      .unwrap_or_else(|| {
        "on".to_string()
      });
    match raw
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "on" | "yes" | "true" | "1" => {
        Ok(true)
      }
      | "off" | "no" | "false" | "0" => {
        Ok(false)
      }
      | other => {
        Err(anyhow!(
          "invalid color setting: \
           {other}"
        ))
      }
    }
  }

  pub fn iter(
    &self
  ) -> impl Iterator<Item = (&String, &String)>
  {
    self.map.iter()
  }

  fn get_u64(
    &self,
    key: &str
  ) -> anyhow::Result<u64> {
    let raw =
      self.get(key).ok_or_else(|| {
        anyhow!(
          "missing config key {key}"
        )
      })?;
    raw.trim().parse::<u64>().with_context(
      || {
        format!(
          "config key {key} must be \
           a whole number, got \
           {raw:?}"
        )
      }
    )
  }

  #[tracing::instrument(skip(self))]
  fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;

    self
      .loaded_files
      .push(path.clone());

    for (line_num, raw_line) in
      text.lines().enumerate()
    {
      let mut line = raw_line.trim();
      if let Some((before, _)) =
        line.split_once('#')
      {
        line = before.trim();
      }

      if line.is_empty() {
        continue;
      }

      let (k, v) = line
        .split_once('=')
        .ok_or_else(|| {
          anyhow!(
            "invalid config line \
             {}:{}: {}",
            path.display(),
            line_num + 1,
            raw_line
          )
        })?;

      let key = k.trim().to_string();
      let value = v.trim().to_string();
      if key.is_empty() {
        warn!(line = line_num + 1, "ignoring config line with empty key");
        continue;
      }
      trace!(key = %key, value = %value, "loaded config key");
      self.map.insert(key, value);
    }

    Ok(())
  }
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_rc_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(rc_env) =
    std::env::var(RC_ENV)
  {
    if rc_env == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      rc_env
    )));
  }

  let Some(home) = dirs::home_dir()
  else {
    warn!(
      "cannot determine home \
       directory; skipping rc file"
    );
    return Ok(None);
  };
  let candidate =
    home.join(".taskdeckrc");
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}
