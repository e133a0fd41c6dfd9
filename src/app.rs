use crate::config::Config;
use crate::events::script::{Handler as ScriptHandler, Script, StepReport};
use crate::logger::{self, HistoryLogger};
use crate::router::simulated::SimulatedBrowser;
use crate::router::RouterProxy;
use anyhow::{Context, Result};
use log::*;
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// A replayed step together with the log lines it produced.
///
#[derive(Debug, Serialize)]
pub struct ReplayedStep {
    #[serde(flatten)]
    pub report: StepReport,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub trace: Vec<String>,
}

/// Oversees script loading, replay and report output.
///
pub struct App {
    config: Config,
    trace: Arc<Mutex<Vec<String>>>,
}

impl App {
    /// Replay the script at `script_path` according to the given
    /// configuration and print the report to stdout.
    ///
    pub async fn start(config: Config, script_path: &Path) -> Result<()> {
        let app = App::new(config);
        app.init_logger()?;

        info!("Starting replay of '{}'...", script_path.display());
        let script = Script::load(script_path)
            .with_context(|| format!("Failed to load script {}", script_path.display()))?;
        let steps = app.replay(script).await?;

        let report = serde_yaml::to_string(&steps).context("Failed to serialize replay report")?;
        println!("{}", report);

        info!("Exiting application...");
        Ok(())
    }

    pub fn new(config: Config) -> Self {
        App {
            config,
            trace: Arc::new(Mutex::new(vec![])),
        }
    }

    /// Install the global logger, capturing its output for the report.
    ///
    fn init_logger(&self) -> Result<()> {
        let logger = HistoryLogger::new(logger::parse_level(&self.config.log_level)).quiet();
        let trace = Arc::clone(&self.trace);
        logger.set_log_callback(Box::new(move |line| {
            if let Ok(mut lines) = trace.lock() {
                lines.push(line);
            }
        }));
        logger::init(logger)?;
        Ok(())
    }

    /// Replay every step of `script` against a fresh router over a simulated
    /// browser.
    ///
    pub async fn replay(&self, script: Script) -> Result<Vec<ReplayedStep>> {
        debug!(
            "Replaying {} steps from '{}' (fcl: {})...",
            script.steps.len(),
            script.initial_hash,
            self.config.fcl_enabled
        );
        let browser = SimulatedBrowser::new(&script.initial_hash)
            .with_guard_answer(self.config.confirm_guard_crossing);
        let router = RouterProxy::new(browser, self.config.fcl_enabled);
        self.take_trace();

        let mut handler = ScriptHandler::new(&router);
        let mut steps = vec![];
        for (index, step) in script.steps.into_iter().enumerate() {
            let report = handler
                .handle(step)
                .await
                .with_context(|| format!("Failed to replay step {}", index))?;
            steps.push(ReplayedStep {
                report,
                trace: self.take_trace(),
            });
        }

        router.destroy();
        Ok(steps)
    }

    fn take_trace(&self) -> Vec<String> {
        match self.trace.lock() {
            Ok(mut lines) => std::mem::take(&mut *lines),
            Err(_) => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replay_reports_every_step() {
        let script = Script::parse(
            r#"
initial_hash: "A"
steps:
  - navigate: { hash: "A/B" }
  - navigate: { hash: "A/B/C" }
  - set_guard: { hash: "A/B" }
  - navigate: { hash: "X" }
"#,
        )
        .unwrap();
        let mut config = Config::new();
        config.confirm_guard_crossing = false;

        let steps = App::new(config).replay(script).await.unwrap();
        assert_eq!(steps.len(), 4);
        assert_eq!(steps[1].report.stack, vec!["A", "A/B", "A/B/C"]);
        // Crossing the guard is declined, so nothing changes.
        assert_eq!(steps[3].report.navigated, Some(false));
        assert_eq!(steps[3].report.stack, vec!["A", "A/B", "A/B/C"]);
        assert_eq!(steps[3].report.cursor, 2);

        let yaml = serde_yaml::to_string(&steps).unwrap();
        assert!(yaml.contains("navigated: false"));
    }

    #[tokio::test]
    async fn test_replay_stops_at_invalid_step() {
        let script =
            Script::parse("initial_hash: A\nsteps:\n  - browser_back: { steps: 0 }\n").unwrap();
        let error = App::new(Config::new()).replay(script).await.unwrap_err();
        assert!(error.to_string().contains("step 0"));
    }
}
