use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Protocol length used when a nonequilibrium setup does not specify one.
pub const DEFAULT_SWITCHING_STEPS: usize = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("An alchemical schedule needs at least one state")]
    NoStates,
    #[error("A switching protocol needs at least one step")]
    NoSteps,
    #[error("Work save interval must be a positive divisor of the protocol length {n_steps} (got {interval})")]
    InvalidWorkInterval { n_steps: usize, interval: usize },
    #[error("The {what} count does not fit in a machine-sized integer")]
    CountOverflow { what: &'static str },
}

/// Lambda values of the thermodynamic states, from the old (0) to the new (1) end state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlchemicalSchedule {
    lambdas: Vec<f64>,
}

impl AlchemicalSchedule {
    /// `n_states` equally spaced values covering [0, 1]. A single state sits at 0.
    pub fn linear(n_states: usize) -> Result<Self, ScheduleError> {
        let lambdas = match n_states {
            0 => return Err(ScheduleError::NoStates),
            1 => vec![0.0],
            n => (0..n).map(|i| i as f64 / (n - 1) as f64).collect(),
        };
        Ok(Self { lambdas })
    }

    pub fn lambdas(&self) -> &[f64] {
        &self.lambdas
    }

    pub fn n_states(&self) -> usize {
        self.lambdas.len()
    }
}

/// How each alchemical parameter follows the master `lambda` during switching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LambdaFunction {
    pub parameter: String,
    pub expression: String,
}

/// A nonequilibrium switching protocol driving `lambda` from 0 to 1 in `n_steps` steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchingProtocol {
    pub n_steps: usize,
    pub work_save_interval: usize,
    pub functions: Vec<LambdaFunction>,
}

impl SwitchingProtocol {
    pub fn new(n_steps: usize, work_save_interval: usize) -> Result<Self, ScheduleError> {
        if n_steps == 0 {
            return Err(ScheduleError::NoSteps);
        }
        if work_save_interval == 0 || n_steps % work_save_interval != 0 {
            return Err(ScheduleError::InvalidWorkInterval {
                n_steps,
                interval: work_save_interval,
            });
        }
        Ok(Self {
            n_steps,
            work_save_interval,
            functions: Self::default_functions(),
        })
    }

    /// Sterics and electrostatics both follow the master parameter directly.
    pub fn default_functions() -> Vec<LambdaFunction> {
        ["lambda_sterics", "lambda_electrostatics"]
            .into_iter()
            .map(|parameter| LambdaFunction {
                parameter: parameter.to_string(),
                expression: "lambda".to_string(),
            })
            .collect()
    }

    /// The value of `lambda` after `step` steps, clamped to [0, 1].
    pub fn lambda_at(&self, step: usize) -> f64 {
        (step as f64 / self.n_steps as f64).clamp(0.0, 1.0)
    }

    /// Every `(step, lambda)` pair of one protocol application, ending at lambda = 1.
    pub fn steps(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        (0..=self.n_steps).map(|step| (step, self.lambda_at(step)))
    }

    /// Work values recorded per application, including the initial zero.
    pub fn n_work_values(&self) -> usize {
        self.n_steps / self.work_save_interval + 1
    }
}

/// Iteration plan of a self-adjusted mixture sampling run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamsSchedule {
    pub n_equilibration_iterations: usize,
    pub n_production_iterations: usize,
    pub steps_per_iteration: usize,
    pub n_states: usize,
}

impl SamsSchedule {
    pub fn total_iterations(&self) -> Result<usize, ScheduleError> {
        self.n_equilibration_iterations
            .checked_add(self.n_production_iterations)
            .ok_or(ScheduleError::CountOverflow { what: "SAMS iteration" })
    }

    pub fn total_steps(&self) -> Result<usize, ScheduleError> {
        self.total_iterations()?
            .checked_mul(self.steps_per_iteration)
            .ok_or(ScheduleError::CountOverflow { what: "SAMS step" })
    }
}

/// Iteration plan of a nonequilibrium switching run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchingSchedule {
    pub protocol: SwitchingProtocol,
    pub n_equilibration_iterations: usize,
    pub n_equilibrium_steps_per_iteration: usize,
    pub n_cycles: usize,
    pub n_iterations_per_cycle: usize,
}

impl SwitchingSchedule {
    /// Forward and reverse switching steps performed in one cycle.
    pub fn switching_steps_per_cycle(&self) -> Result<usize, ScheduleError> {
        self.protocol
            .n_steps
            .checked_mul(self.n_iterations_per_cycle)
            .and_then(|steps| steps.checked_mul(2))
            .ok_or(ScheduleError::CountOverflow { what: "switching step" })
    }
}

/// The sampling plan attached to a setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Protocol {
    Nonequilibrium(SwitchingSchedule),
    Sams(SamsSchedule),
}
