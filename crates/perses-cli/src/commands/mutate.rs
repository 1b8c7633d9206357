use crate::cli::MutateArgs;
use crate::config::defaults::DefaultsConfig;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use perses::engine::progress::ProgressReporter;
use perses::engine::proposal::MutationPolicy;
use perses::engine::proposal::point_mutation::Mutation;
use perses::workflows::mutate::{self, MoveSet, MutateRequest};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;

pub async fn run(args: MutateArgs) -> Result<()> {
    let request = MutateRequest {
        structure: args.input.clone(),
        chain_id: args.chain,
        moves: move_set(&args)?,
        templates: args.templates.clone(),
        temperature: args.temperature.unwrap_or(DefaultsConfig::default().temperature),
        constrain_hydrogens: args.constrain_hydrogens,
    };
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    info!("Mutation request: {:?}", &request);

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Mutating chain {} of {}...", args.chain, args.input.display());
    let outcome = tokio::task::block_in_place(|| mutate::run(&request, &reporter, &mut rng))?;
    mutate::write_outcome(&outcome, &args.output, args.placements.as_deref())?;

    println!(
        "✓ {} -> {} ({} atom(s) grown)",
        outcome.proposal.old_chemical_state_key(),
        outcome.proposal.new_chemical_state_key(),
        outcome.geometry.placements.len()
    );
    println!(
        "  logp forward: {:.4}, logp reverse: {:.4}",
        outcome.geometry.logp, outcome.logp_reverse
    );
    println!("Mutated structure written to: {}", args.output.display());
    if let Some(path) = &args.placements {
        println!("Placements written to: {}", path.display());
    }
    Ok(())
}

fn move_set(args: &MutateArgs) -> Result<MoveSet> {
    if !args.library.is_empty() {
        return Ok(MoveSet::PeptideLibrary(args.library.clone()));
    }
    if !args.mutations.is_empty() {
        let mutations = args
            .mutations
            .iter()
            .map(|text| text.parse::<Mutation>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| CliError::Argument(e.to_string()))?;
        return Ok(MoveSet::PointMutations(MutationPolicy::Allowed(vec![mutations])));
    }
    if let Some(max_point_mutants) = args.max_point_mutants {
        let residues_allowed_to_mutate = (!args.allowed_residues.is_empty()).then(|| args.allowed_residues.clone());
        return Ok(MoveSet::PointMutations(MutationPolicy::Random {
            max_point_mutants,
            residues_allowed_to_mutate,
        }));
    }
    Err(CliError::Argument(
        "Give at least one --mutation, a --library sequence or --max-point-mutants.".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;

    fn parse(extra: &[&str]) -> MutateArgs {
        let mut args = vec!["perses", "mutate", "-i", "in.pdb", "-o", "out.pdb"];
        args.extend_from_slice(extra);
        match Cli::parse_from(args).command {
            Commands::Mutate(mutate_args) => mutate_args,
            _ => panic!("Expected 'mutate' subcommand"),
        }
    }

    #[test]
    fn explicit_mutations_form_one_allowed_state() {
        let moves = move_set(&parse(&["-m", "2-SER", "-m", "L3A"])).unwrap();
        let MoveSet::PointMutations(MutationPolicy::Allowed(states)) = moves else {
            panic!("expected an allowed-mutation policy");
        };
        assert_eq!(states.len(), 1);
        let names: Vec<String> = states[0].iter().map(ToString::to_string).collect();
        assert_eq!(names, vec!["2-SER", "3-ALA"]);
    }

    #[test]
    fn random_policy_keeps_allowed_residues() {
        let moves = move_set(&parse(&["--max-point-mutants", "2", "--allow-residue", "5"])).unwrap();
        assert_eq!(
            moves,
            MoveSet::PointMutations(MutationPolicy::Random {
                max_point_mutants: 2,
                residues_allowed_to_mutate: Some(vec![5]),
            })
        );
    }

    #[test]
    fn library_takes_the_sequences() {
        let moves = move_set(&parse(&["--library", "ASG", "--library", "AAG"])).unwrap();
        assert_eq!(moves, MoveSet::PeptideLibrary(vec!["ASG".to_string(), "AAG".to_string()]));
    }

    #[test]
    fn a_move_must_be_requested() {
        assert!(matches!(move_set(&parse(&[])), Err(CliError::Argument(_))));
        assert!(matches!(move_set(&parse(&["-m", "nonsense"])), Err(CliError::Argument(_))));
    }
}
