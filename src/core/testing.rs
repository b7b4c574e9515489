//! In-memory collaborators for tests.

use std::collections::{HashMap, VecDeque};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::error::{InstallerError, InstallerResult};
use crate::core::http::Remote;
use crate::core::loaders::process::CommandRunner;
use crate::core::prompt::Prompter;

/// Serves fixed bodies by URL; anything else is a 404.
#[derive(Default)]
pub struct StaticRemote {
    bodies: HashMap<String, Vec<u8>>,
    requests: Mutex<Vec<String>>,
}

impl StaticRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bytes(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.bodies.insert(url.to_string(), body.into());
        self
    }

    pub fn with_text(self, url: &str, body: &str) -> Self {
        self.with_bytes(url, body.as_bytes().to_vec())
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Remote for StaticRemote {
    async fn get_bytes(&self, url: &str) -> InstallerResult<Vec<u8>> {
        if let Ok(mut r) = self.requests.lock() {
            r.push(url.to_string());
        }
        self.bodies
            .get(url)
            .cloned()
            .ok_or_else(|| InstallerError::DownloadFailed {
                url: url.to_string(),
                status: 404,
            })
    }

    async fn exists(&self, url: &str) -> bool {
        self.bodies.contains_key(url)
    }
}

/// Answers questions from a queue, then falls back to defaults.
/// Every question asked is recorded.
#[derive(Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<bool>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new(answers: &[bool]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().copied().collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().map(|a| a.clone()).unwrap_or_default()
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&self, question: &str, default: bool) -> bool {
        if let Ok(mut asked) = self.asked.lock() {
            asked.push(question.to_string());
        }
        self.answers
            .lock()
            .ok()
            .and_then(|mut a| a.pop_front())
            .unwrap_or(default)
    }

    fn input(&self, question: &str, default: &str) -> String {
        if let Ok(mut asked) = self.asked.lock() {
            asked.push(question.to_string());
        }
        default.to_string()
    }
}

/// Records invocations and replays scripted exit codes.
/// When the script runs dry every further call exits with 0.
#[derive(Default)]
pub struct ScriptedRunner {
    codes: Mutex<VecDeque<Option<i32>>>,
    calls: Mutex<Vec<(PathBuf, Vec<String>)>>,
}

impl ScriptedRunner {
    pub fn new(codes: &[Option<i32>]) -> Self {
        Self {
            codes: Mutex::new(codes.iter().copied().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(PathBuf, Vec<String>)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &Path, args: &[String], _cwd: &Path) -> io::Result<Option<i32>> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((program.to_path_buf(), args.to_vec()));
        }
        Ok(self
            .codes
            .lock()
            .ok()
            .and_then(|mut c| c.pop_front())
            .unwrap_or(Some(0)))
    }
}
