use super::ScriptError;
use crate::error::AppResult;
use crate::router::simulated::{drive, NativeEntry, SimulatedBrowser};
use crate::router::{HashChangeOutcome, HistoryHost, NavigateOptions, RouterProxy};
use log::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Specify different navigation step types.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Navigate {
        hash: String,
        #[serde(default)]
        preserve_history: bool,
        #[serde(default)]
        disable_preservation: bool,
    },
    Back,
    BrowserBack {
        #[serde(default = "default_browser_back_steps")]
        steps: usize,
    },
    External {
        hash: String,
    },
    Restore,
    SetGuard {
        hash: String,
    },
    ClearGuard,
    StoreFocus {
        control_id: String,
        #[serde(default)]
        info: Option<serde_json::Value>,
    },
}

fn default_browser_back_steps() -> usize {
    1
}

/// A navigation session to replay.
///
#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub initial_hash: String,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Script {
    /// Read and parse a script file.
    ///
    pub fn load(path: &Path) -> Result<Script, ScriptError> {
        let contents = fs::read_to_string(path).map_err(|e| ScriptError::LoadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        Script::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Script, ScriptError> {
        serde_yaml::from_str(contents).map_err(|e| ScriptError::ParseFailed(e.to_string()))
    }
}

/// Snapshot taken after a step was replayed.
///
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub step: Step,
    /// Whether the router changed the browser history (navigation steps only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub navigated: Option<bool>,
    /// Hash changes the browser reported during the step.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hash_changes: Vec<(String, HashChangeOutcome)>,
    pub stack: Vec<String>,
    pub native: Vec<NativeEntry>,
    pub cursor: usize,
}

/// Specify struct for replaying steps against a router.
///
pub struct Handler<'a> {
    router: &'a RouterProxy<SimulatedBrowser>,
    index: usize,
}

impl<'a> Handler<'a> {
    /// Return new instance with reference to the router.
    ///
    pub fn new(router: &'a RouterProxy<SimulatedBrowser>) -> Self {
        Handler { router, index: 0 }
    }

    /// Handle navigation steps by type.
    ///
    pub async fn handle(&mut self, step: Step) -> AppResult<StepReport> {
        debug!("Replaying step {} '{:?}'...", self.index, step);
        self.router.with_host(|host| host.clear_hash_change_log());

        let navigated = match &step {
            Step::Navigate {
                hash,
                preserve_history,
                disable_preservation,
            } => {
                let options = NavigateOptions {
                    preserve_history: *preserve_history,
                    disable_preservation: *disable_preservation,
                };
                Some(drive(self.router, self.router.navigate_to(hash, options)).await?)
            }
            Step::Back => {
                drive(self.router, self.router.navigate_back()).await?;
                None
            }
            Step::BrowserBack { steps } => {
                if *steps == 0 {
                    return Err(ScriptError::InvalidStep {
                        index: self.index,
                        message: "browser_back needs at least one step".to_string(),
                    }
                    .into());
                }
                self.router.with_host(|host| host.go(-(*steps as isize)));
                drive(self.router, async {}).await;
                None
            }
            Step::External { hash } => {
                self.router.with_host(|host| host.visit(hash));
                drive(self.router, async {}).await;
                None
            }
            Step::Restore => {
                drive(self.router, self.router.restore_history()).await?;
                None
            }
            Step::SetGuard { hash } => {
                self.router.set_guard(hash);
                None
            }
            Step::ClearGuard => {
                self.router.clear_guard();
                None
            }
            Step::StoreFocus { control_id, info } => {
                if !self.router.store_focus_for_current_hash(control_id, info.clone()) {
                    warn!(
                        "Current hash is not in the history, focus for '{}' not stored",
                        control_id
                    );
                }
                None
            }
        };

        self.index += 1;
        Ok(self.snapshot(step, navigated))
    }

    fn snapshot(&self, step: Step, navigated: Option<bool>) -> StepReport {
        let stack = self
            .router
            .entries()
            .into_iter()
            .map(|entry| entry.hash)
            .collect();
        let (hash_changes, native, cursor) = self.router.with_host(|host| {
            (
                host.hash_change_log().to_vec(),
                host.entries().to_vec(),
                host.cursor(),
            )
        });
        StepReport {
            step,
            navigated,
            hash_changes,
            stack,
            native,
            cursor,
        }
    }
}
