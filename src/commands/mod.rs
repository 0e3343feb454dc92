use anyhow::{bail, Context as _, Result};

use crate::cli::Command;
use crate::collaboration::CollaborationService;
use crate::github::CollaboratorSource;
use crate::storage::Store;

impl Command {
    /// Runs a one-shot command against the service and prints its result to stdout.
    pub fn run<S, F>(&self, service: &CollaborationService<S, F>) -> Result<()>
    where
        S: Store,
        F: CollaboratorSource,
    {
        match self {
            Command::Sync { repo } => {
                let report = service
                    .synchronize(repo)
                    .with_context(|| format!("synchronizing {}", repo))?;
                println!(
                    "{}: fetched {}, linked {}, pruned {}",
                    report.repository, report.fetched, report.linked, report.pruned
                );
                Ok(())
            }
            Command::SyncAll => {
                let outcomes = service
                    .synchronize_tracked()
                    .context("listing tracked repositories")?;

                let total = outcomes.len();
                let mut failed = 0;
                for (repository, outcome) in outcomes {
                    match outcome {
                        Ok(report) => println!(
                            "{}: fetched {}, linked {}, pruned {}",
                            repository, report.fetched, report.linked, report.pruned
                        ),
                        Err(err) => {
                            failed += 1;
                            println!("{}: failed: {}", repository, err);
                        }
                    }
                }

                if failed > 0 {
                    bail!("{} of {} repositories failed to synchronize", failed, total);
                }
                Ok(())
            }
            Command::List { repo } => {
                let accounts = service
                    .list_accounts(repo)
                    .with_context(|| format!("listing collaborators of {}", repo))?;
                println!("{}", serde_json::to_string_pretty(&accounts)?);
                Ok(())
            }
            Command::Disconnect { repo, login } => {
                let removed = service
                    .disconnect_account(repo, login)
                    .with_context(|| format!("disconnecting {} from {}", login, repo))?;
                if removed {
                    println!("{}: disconnected {}", repo, login);
                } else {
                    println!("{}: {} was not a collaborator", repo, login);
                }
                Ok(())
            }
            Command::Track { repo } => {
                service
                    .create_repository(repo)
                    .and_then(|_| service.set_tracked(repo, true))
                    .with_context(|| format!("tracking {}", repo))?;
                println!("{}: tracked", repo);
                Ok(())
            }
            Command::Untrack { repo } => {
                service
                    .set_tracked(repo, false)
                    .with_context(|| format!("untracking {}", repo))?;
                println!("{}: untracked", repo);
                Ok(())
            }
        }
    }
}
