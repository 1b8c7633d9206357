use indicatif::{ProgressBar, ProgressDrawTarget, ProgressState, ProgressStyle};
use perses::engine::progress::{Progress, ProgressCallback};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

const SPINNER_TICK_MS: u64 = 80;

#[derive(Default)]
struct PhaseState {
    current: Option<&'static str>,
    completed: Vec<&'static str>,
}

/// Renders workflow progress on stderr: a spinner per phase, a bar for counted tasks.
#[derive(Clone)]
pub struct CliProgressHandler {
    pb: Arc<Mutex<ProgressBar>>,
    phases: Arc<Mutex<PhaseState>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        Self::with_draw_target(ProgressDrawTarget::stderr())
    }

    fn with_draw_target(target: ProgressDrawTarget) -> Self {
        let pb = ProgressBar::new(0).with_style(Self::spinner_style());
        pb.set_draw_target(target);
        pb.finish_and_clear();

        Self {
            pb: Arc::new(Mutex::new(pb)),
            phases: Arc::new(Mutex::new(PhaseState::default())),
        }
    }

    /// Names of the phases that have finished, in order.
    pub fn completed_phases(&self) -> Vec<&'static str> {
        self.phases
            .lock()
            .map(|state| state.completed.clone())
            .unwrap_or_default()
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let pb = self.pb.clone();
        let phases = self.phases.clone();

        Box::new(move |progress: Progress| {
            let (Ok(pb), Ok(mut phases)) = (pb.lock(), phases.lock()) else {
                warn!("Progress state mutex was poisoned. Cannot update progress.");
                return;
            };

            match progress {
                Progress::PhaseStart { name } => {
                    phases.current = Some(name);
                    pb.reset();
                    pb.set_length(0);
                    pb.set_style(Self::spinner_style());
                    pb.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
                    pb.set_message(name);
                }
                Progress::PhaseFinish => {
                    pb.disable_steady_tick();
                    match phases.current.take() {
                        Some(name) => {
                            pb.finish_with_message(format!("✓ {}", name));
                            phases.completed.push(name);
                        }
                        None => pb.finish(),
                    }
                }
                Progress::TaskStart { total_steps } => {
                    pb.disable_steady_tick();
                    pb.set_style(Self::bar_style());
                    pb.set_length(total_steps);
                    pb.set_position(0);
                }
                Progress::TaskIncrement => pb.inc(1),
                Progress::TaskFinish => {
                    if let Some(length) = pb.length() {
                        pb.set_position(length);
                    }
                }
                Progress::Message(msg) => pb.println(format!("  {}", msg)),
            }
        })
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .expect("Failed to create spinner style template")
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template("{msg:<24} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .expect("Failed to create bar style template")
            .with_key("eta", |state: &ProgressState, w: &mut dyn std::fmt::Write| {
                let _ = write!(w, "{:.1}s", state.eta().as_secs_f64());
            })
            .progress_chars("##-")
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn hidden() -> CliProgressHandler {
        CliProgressHandler::with_draw_target(ProgressDrawTarget::hidden())
    }

    #[test]
    fn handler_starts_idle() {
        let handler = hidden();
        assert!(handler.pb.lock().unwrap().is_finished());
        assert!(handler.completed_phases().is_empty());
    }

    #[test]
    fn callback_tracks_phases_and_tasks() {
        let handler = hidden();
        let callback = handler.get_callback();

        callback(Progress::PhaseStart { name: "Reading Ligands" });
        {
            let pb = handler.pb.lock().unwrap();
            assert_eq!(pb.message(), "Reading Ligands");
            assert!(!pb.is_finished());
        }

        callback(Progress::TaskStart { total_steps: 4 });
        callback(Progress::TaskIncrement);
        assert_eq!(handler.pb.lock().unwrap().position(), 1);

        callback(Progress::TaskFinish);
        assert_eq!(handler.pb.lock().unwrap().position(), 4);

        callback(Progress::PhaseFinish);
        {
            let pb = handler.pb.lock().unwrap();
            assert!(pb.is_finished());
            assert_eq!(pb.message(), "✓ Reading Ligands");
        }
        assert_eq!(handler.completed_phases(), vec!["Reading Ligands"]);
    }

    #[test]
    fn unmatched_finish_is_ignored() {
        let handler = hidden();
        let callback = handler.get_callback();
        callback(Progress::PhaseFinish);
        callback(Progress::Message("no phase running".to_string()));
        assert!(handler.completed_phases().is_empty());
    }

    #[test]
    fn callback_is_thread_safe() {
        let handler = hidden();
        let callback = handler.get_callback();

        thread::spawn(move || {
            callback(Progress::PhaseStart { name: "Building Schedules" });
            callback(Progress::PhaseFinish);
        })
        .join()
        .unwrap();

        assert_eq!(handler.completed_phases(), vec!["Building Schedules"]);
    }
}
