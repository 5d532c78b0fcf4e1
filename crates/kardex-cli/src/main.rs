//! Kardex - academic-records client CLI
//!
//! The `kardex` command drives the cascading-selection coordinator against
//! a live academic-records service (`--base-url`) or, for the `demo`
//! subcommand, against a seeded in-memory catalog.
//!
//! ## Commands
//!
//! - `cycles`: list academic cycles
//! - `offerings`: browse courses (and groups) for a career and cycle
//! - `eligible`: list students eligible to enroll in a cycle
//! - `enroll`: enroll a student in a group
//! - `repoint`: move an existing enrollment to a different group
//! - `demo`: scripted walkthrough against the in-memory catalog

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use uuid::Uuid;

use kardex_catalog::{
    CareerId, CatalogGateway, CourseId, CycleId, EnrollmentId, GroupId, HttpCatalog,
    MemoryCatalog, StudentId,
};
use kardex_core::{
    init_tracing, CommitOutcome, CoordinatorConfig, EnrollmentChange, EnrollmentCoordinator,
    LogFormat, QueryState, QueryWatch, SessionIdentity,
};

#[derive(Parser)]
#[command(name = "kardex")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Academic-records client coordinator", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output and JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Base URL of the academic-records service
    #[arg(long, global = true, env = "KARDEX_BASE_URL")]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List academic cycles
    Cycles,

    /// Browse the course offering for a career and cycle
    Offerings {
        /// Career id
        #[arg(long)]
        career: Uuid,

        /// Cycle id
        #[arg(long)]
        cycle: Uuid,

        /// Also list the groups offering this course
        #[arg(long)]
        course: Option<Uuid>,
    },

    /// List students eligible to enroll in a cycle
    Eligible {
        /// Cycle id
        #[arg(long)]
        cycle: Uuid,
    },

    /// Enroll a student in a group
    Enroll {
        /// Student id
        #[arg(long)]
        student: Uuid,

        /// Group id
        #[arg(long)]
        group: Uuid,
    },

    /// Move an existing enrollment to a different group
    Repoint {
        /// Enrollment id to edit
        #[arg(long)]
        enrollment: Uuid,

        /// Student owning the enrollment
        #[arg(long)]
        student: Uuid,

        /// Target group id
        #[arg(long)]
        group: Uuid,
    },

    /// Scripted walkthrough against a seeded in-memory catalog
    Demo,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let format = if cli.json {
        LogFormat::Json
    } else {
        LogFormat::Text
    };
    init_tracing(format, level);

    if let Commands::Demo = cli.command {
        return cmd_demo(cli.json).await;
    }

    let base_url = cli
        .base_url
        .context("--base-url (or KARDEX_BASE_URL) is required for this command")?;
    let gateway: Arc<dyn CatalogGateway> = Arc::new(HttpCatalog::new(base_url));

    match cli.command {
        Commands::Cycles => cmd_cycles(gateway, cli.json).await,
        Commands::Offerings {
            career,
            cycle,
            course,
        } => {
            cmd_offerings(
                gateway,
                CareerId(career),
                CycleId(cycle),
                course.map(CourseId),
                cli.json,
            )
            .await
        }
        Commands::Eligible { cycle } => cmd_eligible(gateway, CycleId(cycle), cli.json).await,
        Commands::Enroll { student, group } => {
            cmd_enroll(gateway, StudentId(student), GroupId(group), cli.json).await
        }
        Commands::Repoint {
            enrollment,
            student,
            group,
        } => {
            cmd_repoint(
                gateway,
                EnrollmentId(enrollment),
                StudentId(student),
                GroupId(group),
                cli.json,
            )
            .await
        }
        Commands::Demo => unreachable!("handled above"),
    }
}

fn coordinator(gateway: Arc<dyn CatalogGateway>, session: SessionIdentity) -> EnrollmentCoordinator {
    EnrollmentCoordinator::new(gateway, session, CoordinatorConfig::default())
}

/// Wait for the next publication on a derived list and then for it to
/// leave `Loading`.
async fn settled<T: Clone>(watch: &mut QueryWatch<T>) -> QueryState<T> {
    match watch.next().await {
        Some(state) if !state.is_loading() => state,
        _ => watch.settled_state().await,
    }
}

fn print_list<T: serde::Serialize>(items: &[T], json: bool, render: impl Fn(&T) -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(items)?);
    } else {
        for item in items {
            println!("{}", render(item));
        }
    }
    Ok(())
}

fn unwrap_ready<T>(state: QueryState<T>, what: &str) -> Result<Vec<T>> {
    match state {
        QueryState::Ready(items) => Ok(items),
        QueryState::Failed(err) => Err(err).with_context(|| format!("failed to load {what}")),
        QueryState::Loading => bail!("{what} still loading"),
    }
}

async fn cmd_cycles(gateway: Arc<dyn CatalogGateway>, json: bool) -> Result<()> {
    let coord = coordinator(gateway, SessionIdentity::administrative());
    let mut cycles = coord.watch_cycles();
    let cycles = unwrap_ready(settled(&mut cycles).await, "cycles")?;
    print_list(&cycles, json, |c| format!("{}  {}", c.id, c.code))
}

async fn cmd_offerings(
    gateway: Arc<dyn CatalogGateway>,
    career: CareerId,
    cycle: CycleId,
    course: Option<CourseId>,
    json: bool,
) -> Result<()> {
    let coord = coordinator(gateway, SessionIdentity::administrative());
    let mut courses = coord.watch_courses();
    let mut groups = coord.watch_groups();

    coord.set_career(Some(career));
    coord.set_cycle(Some(cycle));
    coord.set_course(course);

    let courses = unwrap_ready(settled(&mut courses).await, "courses")?;
    if !json {
        println!("courses:");
    }
    print_list(&courses, json, |c| {
        format!("{}  {} ({} cr)", c.id, c.name, c.credits)
    })?;

    if course.is_some() {
        let groups = unwrap_ready(settled(&mut groups).await, "groups")?;
        if !json {
            println!("groups:");
        }
        print_list(&groups, json, |g| {
            format!("{}  {} (capacity {})", g.id, g.code, g.capacity)
        })?;
    }
    Ok(())
}

async fn cmd_eligible(gateway: Arc<dyn CatalogGateway>, cycle: CycleId, json: bool) -> Result<()> {
    let coord = coordinator(gateway, SessionIdentity::administrative());
    let mut eligible = coord.watch_eligible_students();
    coord.set_cycle(Some(cycle));

    let students = unwrap_ready(settled(&mut eligible).await, "eligible students")?;
    print_list(&students, json, |s| {
        format!("{}  {}  {}", s.id, s.code, s.full_name)
    })
}

fn report_outcome(outcome: CommitOutcome, json: bool) -> Result<()> {
    match outcome {
        CommitOutcome::Succeeded(EnrollmentChange::Created(record)) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&record)?);
            } else {
                println!("enrolled: {} -> group {}", record.id, record.group_id);
            }
            Ok(())
        }
        CommitOutcome::Succeeded(EnrollmentChange::Repointed { enrollment, group }) => {
            if json {
                println!(
                    "{}",
                    serde_json::json!({ "repointed": enrollment, "group": group })
                );
            } else {
                println!("repointed: {enrollment} -> group {group}");
            }
            Ok(())
        }
        CommitOutcome::Failed(err) => Err(err).context("commit failed"),
        other => bail!("unexpected commit state: {other:?}"),
    }
}

async fn cmd_enroll(
    gateway: Arc<dyn CatalogGateway>,
    student: StudentId,
    group: GroupId,
    json: bool,
) -> Result<()> {
    let coord = coordinator(gateway, SessionIdentity::administrative());
    coord.set_student(Some(student));
    coord.set_group(Some(group));

    coord.commit().await;
    report_outcome(coord.take_outcome(), json)
}

async fn cmd_repoint(
    gateway: Arc<dyn CatalogGateway>,
    enrollment: EnrollmentId,
    student: StudentId,
    group: GroupId,
    json: bool,
) -> Result<()> {
    let coord = coordinator(gateway, SessionIdentity::administrative());
    coord.set_student(Some(student));
    coord.begin_edit(enrollment);
    coord.set_group(Some(group));

    coord.commit().await;
    report_outcome(coord.take_outcome(), json)
}

/// End-to-end walkthrough on the seeded catalog: browse the cascade,
/// enroll, trip the duplicate check, then repoint.
async fn cmd_demo(json: bool) -> Result<()> {
    let catalog = Arc::new(MemoryCatalog::new());
    let seed = kardex_catalog::seed_demo(&catalog);
    info!(career = %seed.career, cycle = %seed.cycle, "seeded demo catalog");

    let coord = coordinator(
        Arc::clone(&catalog) as Arc<dyn CatalogGateway>,
        SessionIdentity::student(seed.student),
    );
    let mut courses = coord.watch_courses();
    let mut groups = coord.watch_groups();
    let mut changes = coord.subscribe_changes();

    coord.set_career(Some(seed.career));
    coord.set_cycle(Some(seed.cycle));
    let courses = unwrap_ready(settled(&mut courses).await, "courses")?;
    println!("courses for selected career/cycle:");
    print_list(&courses, json, |c| format!("  {}  {}", c.id, c.name))?;

    coord.set_course(Some(seed.course));
    let groups = unwrap_ready(settled(&mut groups).await, "groups")?;
    println!("groups offering the selected course:");
    print_list(&groups, json, |g| format!("  {}  {}", g.id, g.code))?;

    coord.set_group(Some(seed.group_a1));
    coord.commit().await;
    report_outcome(coord.take_outcome(), json)?;
    if let Ok(change) = changes.try_recv() {
        info!(?change, "sibling screens notified");
    }

    // Second attempt for the same pair must be rejected locally.
    coord.commit().await;
    match coord.take_outcome() {
        CommitOutcome::Failed(err) => println!("duplicate attempt rejected: {err}"),
        other => bail!("duplicate attempt was not rejected: {other:?}"),
    }

    // Repoint the enrollment to the other group.
    let enrollment = catalog
        .enrollments()
        .first()
        .map(|record| record.id)
        .context("no enrollment stored after demo commit")?;
    coord.begin_edit(enrollment);
    coord.set_group(Some(seed.group_a2));
    coord.commit().await;
    report_outcome(coord.take_outcome(), json)?;

    Ok(())
}
