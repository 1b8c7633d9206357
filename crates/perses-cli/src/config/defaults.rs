use perses::engine::config::Phase;

/// Values used for setup keys that neither the document nor the command line sets.
pub struct DefaultsConfig {
    pub pressure: f64,
    pub temperature: f64,
    pub solvent_padding: f64,
    pub timestep: f64,
    pub phases: Vec<Phase>,
    pub solvate: bool,
    pub n_states: usize,
    pub n_steps_per_move_application: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            pressure: 1.0,
            temperature: 300.0,
            solvent_padding: 9.0,
            timestep: 1.0,
            phases: vec![Phase::Solvent, Phase::Complex],
            solvate: true,
            n_states: 10,
            n_steps_per_move_application: 1,
        }
    }
}
