//! Governance event ledger — reference runtime demo CLI.
//!
//! Wires the seven-crate workspace together end to end: validated append,
//! epoch boundary crossing and root publication, two-phase intent/commit/
//! failure emission with orphan detection, and completeness proof generation
//! plus independent offline verification over an exported ledger.
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- lifecycle
//!   cargo run -p demo -- epoch
//!   cargo run -p demo -- two-phase
//!   cargo run -p demo -- proof
//!   cargo run -p demo -- integrity

use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use ledger_audit::memory::InMemoryLedger;
use ledger_integrity::{emit_commit, emit_failure, emit_intent, scan_orphans, InFlightRegistry};
use ledger_merkle::EpochManager;
use ledger_ports::{Clock, LedgerRead, SystemClock};
use ledger_proof::{export_ledger, generate_completeness, to_persisted_events, verify_completeness};
use ledger_types::config::LedgerConfig;
use ledger_types::event::GovernanceEvent;
use ledger_validate::{ActorRegistry, ValidatedLedger};

#[derive(Debug, thiserror::Error)]
enum DemoError {
    #[error("validation rejected event: {0}")]
    Validation(#[from] ledger_validate::ValidationError),
    #[error("proof error: {0}")]
    Proof(#[from] ledger_proof::ProofError),
    #[error("merkle/epoch error: {0}")]
    Merkle(#[from] ledger_merkle::MerkleError),
    #[error("integrity error: {0}")]
    Integrity(#[from] ledger_integrity::IntegrityError),
    #[error("event construction error: {0}")]
    LedgerType(#[from] ledger_types::error::LedgerTypeError),
}

type DemoResult<T> = Result<T, DemoError>;

#[derive(Parser)]
#[command(
    name = "demo",
    about = "Governance event ledger reference runtime demo",
    long_about = "Exercises the governance event ledger end to end: write-time\n\
                  validation, hash chaining, Merkle epoch publication, two-phase\n\
                  intent/commit/failure emission with orphan detection, and\n\
                  completeness proof generation with independent verification."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run every scenario in sequence against one shared ledger.
    RunAll,
    /// Append a task through its full legal lifecycle under the validation gate.
    Lifecycle,
    /// Cross an epoch boundary and publish its Merkle root into the chain.
    Epoch,
    /// Emit an intent/commit pair, an intent/failure pair, and detect an orphan.
    TwoPhase,
    /// Generate a completeness proof, export the ledger, and verify independently.
    Proof,
    /// Tamper with a cloned event list and show hash-break detection catching it.
    Integrity,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    print_banner();

    let result = match cli.command {
        Command::RunAll => run_all(),
        Command::Lifecycle => {
            let ledger = fresh_ledger();
            lifecycle_scenario(&ledger).map(|_| ())
        }
        Command::Epoch => epoch_scenario(&fresh_ledger()),
        Command::TwoPhase => two_phase_scenario(&fresh_ledger()),
        Command::Proof => proof_scenario(&fresh_ledger()),
        Command::Integrity => integrity_scenario(),
    };

    match result {
        Ok(()) => println!("\nAll selected scenarios completed successfully."),
        Err(e) => {
            eprintln!("\nDemo error: {e}");
            std::process::exit(1);
        }
    }
}

fn print_banner() {
    println!();
    println!("Governance Event Ledger — Reference Runtime Demo");
    println!("=================================================");
    println!();
}

fn fresh_ledger() -> ValidatedLedger<InMemoryLedger> {
    let actors = ActorRegistry::with_actors(["demo-actor", "system"]);
    ValidatedLedger::new(InMemoryLedger::new(), actors, LedgerConfig::default().hash_algorithm, true)
}

fn run_all() -> DemoResult<()> {
    let ledger = fresh_ledger();
    lifecycle_scenario(&ledger)?;
    epoch_scenario(&ledger)?;
    two_phase_scenario(&ledger)?;
    proof_scenario(&ledger)?;
    integrity_scenario()?;
    Ok(())
}

/// Appends `task-demo-001` through `PENDING -> AUTHORIZED -> ACTIVATED ->
/// ACCEPTED -> COMPLETED`, printing the sequence/hash assigned to each step.
/// Returns the ledger so later scenarios can keep building on it.
fn lifecycle_scenario(ledger: &ValidatedLedger<InMemoryLedger>) -> DemoResult<&ValidatedLedger<InMemoryLedger>> {
    println!("--- Scenario: task lifecycle under write-time validation ---");
    let clock = SystemClock;
    let steps = [
        ("executive.task.authorized", "task authorized"),
        ("executive.task.activated", "task activated"),
        ("executive.task.accepted", "offer accepted"),
        ("executive.task.completed", "task completed"),
    ];

    for (event_type, note) in steps {
        let event = GovernanceEvent::create(
            event_type,
            clock.now(),
            "demo-actor",
            "trace-lifecycle-001",
            json!({"task_id": "task-demo-001", "note": note}),
            ledger_types::event::CURRENT_SCHEMA_VERSION,
        )?;
        let persisted = ledger.append(event)?;
        println!(
            "  seq={:<4} {:<32} hash={}",
            persisted.sequence,
            event_type,
            &persisted.event.hash()[..24.min(persisted.event.hash().len())]
        );
    }

    let illegal = GovernanceEvent::create(
        "executive.task.activated",
        clock.now(),
        "demo-actor",
        "trace-lifecycle-001",
        json!({"task_id": "task-demo-001"}),
        ledger_types::event::CURRENT_SCHEMA_VERSION,
    )?;
    match ledger.append(illegal) {
        Err(ledger_validate::ValidationError::IllegalStateTransition { current, attempted, .. }) => {
            println!("  rejected re-activation of a completed task: '{current}' -> '{attempted}' is not allowed");
        }
        Err(other) => return Err(other.into()),
        Ok(persisted) => panic!("expected rejection, got sequence {}", persisted.sequence),
    }

    Ok(ledger)
}

/// Seeds enough filler events to cross a (deliberately small) epoch boundary,
/// then builds and publishes the Merkle root for that epoch.
fn epoch_scenario(ledger: &ValidatedLedger<InMemoryLedger>) -> DemoResult<()> {
    println!("\n--- Scenario: epoch boundary and Merkle root publication ---");
    let clock = SystemClock;
    let mut config = LedgerConfig::default();
    config.events_per_epoch = 5;
    let manager = EpochManager::new(config);

    while ledger.max_sequence() % 5 != 0 {
        let event = GovernanceEvent::create(
            "witness.observation.recorded",
            clock.now(),
            "demo-actor",
            "trace-epoch",
            json!({"observation": ledger.max_sequence() + 1}),
            ledger_types::event::CURRENT_SCHEMA_VERSION,
        )?;
        ledger.append(event)?;
    }

    let sequence = ledger.max_sequence();
    if let Some(epoch) = manager.maybe_build_and_publish(ledger.backend(), &clock, sequence, "system", "trace-epoch")? {
        println!("  epoch {} built over sequences [{}, {}]", epoch.epoch_id, epoch.start_sequence, epoch.end_sequence);
        println!("  root: {}", epoch.root_hash);
        println!("  published as event {:?}", epoch.root_event_id);
    } else {
        println!("  no epoch boundary crossed at sequence {sequence}");
    }
    Ok(())
}

/// Demonstrates a successful two-phase op, a failing one, and one that is
/// abandoned mid-flight long enough to be flagged as an orphan.
fn two_phase_scenario(ledger: &ValidatedLedger<InMemoryLedger>) -> DemoResult<()> {
    println!("\n--- Scenario: two-phase intent/commit/failure emission ---");
    let clock = SystemClock;
    let registry = InFlightRegistry::new();
    let backend = ledger.backend();
    let algorithm = LedgerConfig::default().hash_algorithm;

    let (_, ok_correlation) = emit_intent(
        backend,
        &registry,
        &clock,
        "consent",
        json!({"subject_id": "subject-1"}),
        "demo-actor",
        "trace-two-phase-ok",
        &algorithm,
    )?;
    emit_commit(
        backend,
        &registry,
        &clock,
        &ok_correlation,
        json!({"status": "granted"}),
        "demo-actor",
        "trace-two-phase-ok",
        &algorithm,
    )?;
    println!("  consent: intent -> commit resolved cleanly (correlation {ok_correlation})");

    let (_, fail_correlation) = emit_intent(
        backend,
        &registry,
        &clock,
        "safety",
        json!({"report_id": "incident-1"}),
        "demo-actor",
        "trace-two-phase-fail",
        &algorithm,
    )?;
    emit_failure(
        backend,
        &registry,
        &clock,
        &fail_correlation,
        "downstream reviewer unreachable",
        json!({"retryable": true}),
        "demo-actor",
        "trace-two-phase-fail",
        &algorithm,
    )?;
    println!("  safety: intent -> failure resolved cleanly (correlation {fail_correlation})");

    let (_, orphan_correlation) = emit_intent(
        backend,
        &registry,
        &clock,
        "exit",
        json!({"member_id": "member-1"}),
        "demo-actor",
        "trace-two-phase-orphan",
        &algorithm,
    )?;
    println!("  exit: intent emitted (correlation {orphan_correlation}), deliberately left unresolved");

    let far_future = clock.now() + chrono::Duration::minutes(10);
    let orphans = scan_orphans(&registry, far_future, std::time::Duration::from_secs(300));
    println!("  orphan scan at +10min (timeout=5min) found {} orphan(s):", orphans.len());
    for orphan in &orphans {
        println!("    correlation={} age={}s type={}", orphan.correlation_id, orphan.age_seconds, orphan.original_event_type);
    }
    Ok(())
}

/// Generates a completeness proof over the ledger built so far, exports it
/// to the self-describing JSON format, reconstructs events from that export,
/// and confirms independent verification agrees with the live proof.
fn proof_scenario(ledger: &ValidatedLedger<InMemoryLedger>) -> DemoResult<()> {
    println!("\n--- Scenario: completeness proof, export, independent verification ---");
    let clock = SystemClock;
    let backend = ledger.backend();
    let algorithm = LedgerConfig::default().hash_algorithm;

    let proof = generate_completeness(backend, &algorithm, Some("demo-auditor"), &clock)?;
    println!("  proof {} over {} events, merkle root {}", proof.proof_id, proof.total_events, proof.merkle_root);

    let export = export_ledger(backend, &algorithm, clock.now());
    println!(
        "  export {} covers sequences [{}, {}], chain_valid={}",
        export.metadata.export_id, export.metadata.sequence_range.0, export.metadata.sequence_range.1, export.verification.chain_valid
    );

    let reconstructed = to_persisted_events(&export)?;
    let result = verify_completeness(&proof, &reconstructed, &clock);
    println!(
        "  independent verification over the export: status={:?} hash_chain_valid={} merkle_valid={} issues={}",
        result.status,
        result.hash_chain_valid,
        result.merkle_valid,
        result.issues.len()
    );
    Ok(())
}

/// Builds a small clean chain, clones it, tampers with one event's payload,
/// and shows the hash-break scanner catching exactly the tampered event
/// without ever touching the real (untamperable) ledger.
fn integrity_scenario() -> DemoResult<()> {
    println!("\n--- Scenario: hash-break detection over a tampered copy ---");
    let clock = SystemClock;
    let events: Vec<GovernanceEvent> = (0..3)
        .map(|i| {
            GovernanceEvent::create(
                "witness.observation.recorded",
                clock.now(),
                "demo-actor",
                "trace-integrity",
                json!({"i": i}),
                ledger_types::event::CURRENT_SCHEMA_VERSION,
            )
        })
        .collect::<Result<_, _>>()?;
    let chained = ledger_audit::chain::chain_events(events, &LedgerConfig::default().hash_algorithm)?;
    let persisted: Vec<_> = chained
        .into_iter()
        .enumerate()
        .map(|(i, e)| ledger_types::event::PersistedEvent::new(e, (i + 1) as u64))
        .collect::<Result<_, _>>()?;

    let mut tampered = persisted.clone();
    tampered[1].event.payload = json!({"i": "tampered"});

    let breaks = ledger_integrity::scan(&tampered);
    println!("  scanned a 3-event copy with event 2's payload rewritten after the fact:");
    for b in &breaks {
        println!("    sequence={} category={} — {}", b.sequence, b.category.as_str(), b.description);
    }
    if breaks.is_empty() {
        println!("    no breaks found (unexpected)");
    }
    Ok(())
}
