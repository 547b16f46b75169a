// request.rs — Request subcommands: list, show, counts.

use clap::Subcommand;
use coach_lifecycle::{EngagementRequest, Program, RequestStatus, StatusCounts};
use coach_policy::Collection;
use coach_sync::store::read_collection;
use coach_sync::JsonFileOptionStore;

use crate::DataPaths;

#[derive(Subcommand)]
pub enum RequestCommands {
    /// List requests, newest first.
    List {
        /// Only show requests in this status (e.g. PENDING, PLAN_READY).
        #[arg(long)]
        status: Option<String>,
        /// Only show requests owned by this subject.
        #[arg(long)]
        subject: Option<String>,
    },
    /// Show one request as JSON, with its program if published.
    Show {
        /// Request ID (full or prefix).
        id: String,
    },
    /// Count requests per status.
    Counts,
}

pub fn execute(cmd: &RequestCommands, paths: &DataPaths) -> anyhow::Result<()> {
    let store = JsonFileOptionStore::new(&paths.options)?;
    let mut requests: Vec<EngagementRequest> = read_collection(&store, Collection::Requests)?;

    match cmd {
        RequestCommands::List { status, subject } => {
            let wanted = status.as_deref().map(parse_status).transpose()?;
            requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            let shown: Vec<&EngagementRequest> = requests
                .iter()
                .filter(|r| wanted.map_or(true, |s| r.status == s))
                .filter(|r| subject.as_deref().map_or(true, |s| r.subject_id == s))
                .collect();

            if shown.is_empty() {
                println!("No requests.");
                return Ok(());
            }

            println!(
                "{:<10} {:<10} {:<26} {:>10} CREATED",
                "ID", "SUBJECT", "STATUS", "PRICE"
            );
            println!("{}", "-".repeat(80));
            for r in shown {
                println!(
                    "{:<10} {:<10} {:<26} {:>10} {}",
                    short_id(&r.id),
                    r.subject_id,
                    r.status.to_string(),
                    r.price.map(|p| p.to_string()).unwrap_or_else(|| "-".into()),
                    r.created_at.format("%Y-%m-%d %H:%M"),
                );
            }
        }

        RequestCommands::Show { id } => {
            let matches: Vec<&EngagementRequest> = requests
                .iter()
                .filter(|r| r.id.starts_with(id.as_str()))
                .collect();
            let request = match matches.as_slice() {
                [one] => *one,
                [] => anyhow::bail!("No request matches '{}'", id),
                _ => anyhow::bail!(
                    "'{}' matches {} requests; use a longer prefix",
                    id,
                    matches.len()
                ),
            };

            println!("{}", serde_json::to_string_pretty(request)?);
            let programs: Vec<Program> = read_collection(&store, Collection::Programs)?;
            match Program::for_request(&programs, &request.id) {
                Some(program) => println!(
                    "\nProgram {}: {} day(s), {} row(s), {} → {}",
                    short_id(&program.id),
                    program.days.len(),
                    program.total_rows(),
                    program.start_date,
                    program.end_date,
                ),
                None => println!("\nNo program published."),
            }
        }

        RequestCommands::Counts => {
            let counts = StatusCounts::tally(&requests);
            println!("New requests:        {}", counts.pending);
            println!("Awaiting payment:    {}", counts.awaiting_payment);
            println!("Receipts to review:  {}", counts.receipts_to_review);
            println!("Awaiting profile:    {}", counts.awaiting_profile);
            println!("Waiting for plan:    {}", counts.waiting_for_plan);
            println!("Active programs:     {}", counts.active);
            println!("Rejected:            {}", counts.rejected);
        }
    }

    Ok(())
}

fn parse_status(s: &str) -> anyhow::Result<RequestStatus> {
    let upper = s.to_ascii_uppercase();
    RequestStatus::ALL
        .into_iter()
        .find(|status| status.to_string() == upper)
        .ok_or_else(|| anyhow::anyhow!("unknown status '{}'", s))
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}
