pub mod error;

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::fs;

pub use model::{normalize, validate, Question};
pub use serde_json::Value;

/// One stored quiz file: question objects exactly as they were read, not yet validated.
pub type ContentSet = Vec<Value>;

const PREFIX: &str = "quiz_";
const EXTENSION: &str = ".json";

/// Content is published per UTC calendar day.
pub fn period_key(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d").to_string()
}

pub fn today() -> String {
    period_key(Utc::now())
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|byte| byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_'))
}

/// Directory of daily quiz files named `quiz_{period}_{name}.json`.
pub struct Library {
    root: PathBuf,
}

impl Library {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn init(&self) -> error::Result<()> {
        fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    /// Lists the files whose names satisfy `accept`, sorted by name.
    async fn list(&self, accept: impl Fn(&str) -> bool) -> error::Result<Vec<PathBuf>> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if name.to_str().is_some_and(&accept) {
                paths.push(entry.path());
            }
        }

        paths.sort_unstable();
        Ok(paths)
    }

    async fn read(path: &Path) -> error::Result<Value> {
        let bytes = fs::read(path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Loads every content set published for `period`, ordered by file name. Files that cannot be
    /// read or do not hold a JSON array are skipped.
    pub async fn load_content_for_period(&self, period: &str) -> error::Result<Vec<ContentSet>> {
        let prefix = format!("{PREFIX}{period}_");
        let paths = self.list(|name| name.starts_with(&prefix) && name.ends_with(EXTENSION)).await?;

        let mut sets = Vec::with_capacity(paths.len());
        for path in paths {
            match Self::read(&path).await {
                Ok(Value::Array(items)) => sets.push(items),
                Ok(_) => log::warn!("skipping {}: not a list of questions", path.display()),
                Err(err) => log::warn!("skipping {}: {err}", path.display()),
            }
        }

        Ok(sets)
    }

    /// Normalizes `records` and stores them as the content set `name` for `period`.
    pub async fn save_for_period(&self, period: &str, name: &str, records: &[Value]) -> error::Result<PathBuf> {
        if !is_valid_name(name) {
            return Err(error::Error::BadInput);
        }

        let questions = normalize(records, &mut rand::thread_rng());
        if questions.is_empty() {
            return Err(error::Error::BadInput);
        }

        self.init().await?;
        let path = self.root.join(format!("{PREFIX}{period}_{name}{EXTENSION}"));
        fs::write(&path, serde_json::to_vec_pretty(&questions)?).await?;
        log::info!("saved {} questions to {}", questions.len(), path.display());
        Ok(path)
    }

    /// Rewrites every stored file that is not yet canonical. The original is kept next to it with
    /// a `.backup` suffix. Returns the number of converted files.
    pub async fn convert_all(&self) -> error::Result<usize> {
        let paths = self.list(|name| name.ends_with(EXTENSION)).await?;

        let mut converted = 0;
        for path in paths {
            let records = match Self::read(&path).await {
                Ok(Value::Array(records)) => records,
                Ok(_) => {
                    log::warn!("cannot convert {}: not a list of questions", path.display());
                    continue;
                }
                Err(err) => {
                    log::warn!("cannot convert {}: {err}", path.display());
                    continue;
                }
            };

            if validate(&records).is_ok() {
                continue;
            }

            let questions = normalize(&records, &mut rand::thread_rng());
            if questions.is_empty() {
                log::warn!("cannot convert {}: no usable questions", path.display());
                continue;
            }

            let bytes = match serde_json::to_vec_pretty(&questions) {
                Ok(bytes) => bytes,
                Err(err) => {
                    log::warn!("cannot convert {}: {err}", path.display());
                    continue;
                }
            };
            let canonical: ContentSet = match serde_json::from_slice(&bytes) {
                Ok(canonical) => canonical,
                Err(err) => {
                    log::warn!("cannot convert {}: {err}", path.display());
                    continue;
                }
            };
            if let Err(err) = validate(&canonical) {
                log::warn!("cannot convert {}: {err}", path.display());
                continue;
            }

            let backup = path.with_extension("json.backup");
            if let Err(err) = fs::rename(&path, &backup).await {
                log::warn!("cannot back up {}: {err}", path.display());
                continue;
            }

            if let Err(err) = fs::write(&path, bytes).await {
                log::warn!("cannot write {}: {err}", path.display());
                if let Err(err) = fs::rename(&backup, &path).await {
                    log::error!("cannot restore {} from its backup: {err}", path.display());
                }
                continue;
            }

            log::info!("converted {}", path.display());
            converted += 1;
        }

        Ok(converted)
    }
}

/// Built-in demonstration content in the loose `correct_answer` / `wrong_answers` shape.
pub fn sample_records() -> Vec<Value> {
    use serde_json::json;
    Vec::from([
        json!({
            "question": "What does HTML stand for?",
            "correct_answer": "HyperText Markup Language",
            "wrong_answers": ["Home Tool Markup Language", "Hyperlinks Text Mark Language", "Hyperlinking Text Marking Language"],
            "explanation": "HTML stands for HyperText Markup Language, the standard markup language for web pages.",
        }),
        json!({
            "question": "Which programming language is known as the 'language of the web'?",
            "correct_answer": "JavaScript",
            "wrong_answers": ["Python", "Java", "C++"],
            "explanation": "JavaScript is often called the 'language of the web' because it runs in web browsers.",
        }),
        json!({
            "question": "What does CSS stand for?",
            "correct_answer": "Cascading Style Sheets",
            "wrong_answers": ["Computer Style Sheets", "Creative Style Sheets", "Colorful Style Sheets"],
            "explanation": "CSS stands for Cascading Style Sheets, used for styling web pages.",
        }),
    ])
}
