use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use groupscholar_semester_gpa::config::{self, StoreConfig};
use groupscholar_semester_gpa::grade::{self, format_gpa};
use groupscholar_semester_gpa::models::{self, Computation, SemesterRecord, StudentInfo, Subject};
use groupscholar_semester_gpa::store::{KeyPolicy, Outcome, SwapMode};
use groupscholar_semester_gpa::{import, report, stats};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "semester-gpa")]
#[command(about = "Semester GPA calculator and student record store for Group Scholar", long_about = None)]
struct Cli {
    /// Store file path (overrides SEMESTER_GPA_STORE)
    #[arg(long, global = true)]
    store: Option<PathBuf>,
    /// Key policy: unique or per-semester (overrides SEMESTER_GPA_KEYS)
    #[arg(long, global = true, value_parser = config::parse_key_policy)]
    keys: Option<KeyPolicy>,
    /// Swap mode for rewrites: delete-rename or rename (overrides SEMESTER_GPA_SWAP)
    #[arg(long, global = true, value_parser = config::parse_swap_mode)]
    swap: Option<SwapMode>,
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct MarksInput {
    /// Marks for one subject (0-100); repeat for an unweighted GPA
    #[arg(long = "marks", value_name = "MARKS")]
    marks: Vec<i64>,
    /// Weighted subject as NAME:MARKS:CREDITS; repeat per subject
    #[arg(long = "subject", value_name = "NAME:MARKS:CREDITS")]
    subjects: Vec<String>,
    /// CSV file with subject,marks,credits columns
    #[arg(long)]
    csv: Option<PathBuf>,
}

#[derive(Args)]
struct StudentArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    semester: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute a GPA without saving it
    Compute {
        #[command(flatten)]
        input: MarksInput,
    },
    /// Compute a GPA and append the record to the store
    Save {
        #[command(flatten)]
        student: StudentArgs,
        #[command(flatten)]
        input: MarksInput,
    },
    /// List every stored record
    List,
    /// Print the store file as text
    Dump,
    /// Search records by student name
    Search {
        #[arg(long)]
        name: String,
    },
    /// Replace a student's first stored record with a freshly computed one
    Update {
        #[command(flatten)]
        student: StudentArgs,
        #[command(flatten)]
        input: MarksInput,
    },
    /// Delete every record stored for a student
    Delete {
        #[arg(long)]
        name: String,
    },
    /// Summarize GPA and classification spread across the store
    Stats,
    /// Generate a markdown report
    Report {
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("groupscholar_semester_gpa=info,semester_gpa=info")
        }))
        .init();

    let cli = Cli::parse();
    let mut config = StoreConfig::from_env().context("invalid store configuration")?;
    if let Some(path) = cli.store {
        config.path = path;
    }
    if let Some(keys) = cli.keys {
        config.key_policy = keys;
    }
    if let Some(swap) = cli.swap {
        config.swap_mode = swap;
    }
    let store = config.open_store();
    tracing::debug!(path = %store.path().display(), "using store");

    match cli.command {
        Commands::Compute { input } => {
            let computation = compute(&input)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&computation)?);
            } else {
                println!("GPA Calculated Successfully!");
                print_computation(&computation);
            }
        }
        Commands::Save { student, input } => {
            let record = build_record(&student, &input)?;
            print_record(&record);
            match store.append(&record).context("failed to save record")? {
                Outcome::Done => println!("Record saved successfully!"),
                _ => println!("Student already exists! Use Update instead."),
            }
        }
        Commands::List => {
            let mut records = store.list_all();
            let listed: Vec<SemesterRecord> = records.by_ref().collect();
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&listed)?);
            } else if listed.is_empty() {
                println!("No records found.");
            } else {
                for record in &listed {
                    print_record(record);
                    println!();
                }
            }
            if let Some(err) = records.halted() {
                eprintln!("Listing stopped early: {err}");
            }
        }
        Commands::Dump => {
            let text = store.read_text();
            if text.is_empty() {
                println!("No records found.");
            } else {
                print!("{text}");
            }
        }
        Commands::Search { name } => {
            let name = models::validate_name(&name)?;
            let found = store.find_all(&name);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&found)?);
            } else if found.is_empty() {
                println!("Student not found.");
            } else {
                for record in &found {
                    print_record(record);
                    println!();
                }
            }
        }
        Commands::Update { student, input } => {
            let record = build_record(&student, &input)?;
            match store.update(&record).context("failed to update record")? {
                Outcome::Done => println!("Student record updated successfully."),
                _ => println!("Student not found."),
            }
        }
        Commands::Delete { name } => {
            let name = models::validate_name(&name)?;
            match store.delete(&name).context("failed to delete record")? {
                Outcome::Done => println!("Student record deleted."),
                _ => println!("Student not found."),
            }
        }
        Commands::Stats => {
            let summary = stats::summarize(&store);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else if summary.count == 0 {
                println!("No records found.");
            } else {
                println!(
                    "{} records, average GPA {}",
                    summary.count,
                    format_gpa(summary.average_gpa)
                );
                for bucket in &summary.buckets {
                    println!(
                        "- {}: {} ({:.1}%)",
                        bucket.classification, bucket.count, bucket.percent
                    );
                }
            }
        }
        Commands::Report { out } => {
            let records: Vec<SemesterRecord> = store.list_all().collect();
            let summary = stats::summarize_records(records.clone());
            let report = report::build_report(chrono::Utc::now(), &summary, &records);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

fn compute(input: &MarksInput) -> anyhow::Result<Computation> {
    if let Some(path) = &input.csv {
        let subjects = import::read_subjects(path)
            .with_context(|| format!("failed to read subjects from {}", path.display()))?;
        return Ok(grade::compute_weighted(subjects));
    }

    if !input.subjects.is_empty() {
        let subjects = input
            .subjects
            .iter()
            .map(|arg| arg.parse::<Subject>())
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(grade::compute_weighted(subjects));
    }

    let marks = input
        .marks
        .iter()
        .map(|mark| models::validate_marks(*mark))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(grade::compute_simple(&marks))
}

fn build_record(student: &StudentArgs, input: &MarksInput) -> anyhow::Result<SemesterRecord> {
    let info = StudentInfo::new(&student.name, &student.semester)?;
    Ok(SemesterRecord::new(info, compute(input)?))
}

fn print_computation(computation: &Computation) {
    println!("GPA: {}", format_gpa(computation.gpa));
    println!("Classification: {}", computation.classification);
    if let Some(subjects) = &computation.subjects {
        for subject in subjects {
            println!(
                "  {} | Marks: {} | Credits: {} | Grade: {}",
                subject.name(),
                subject.marks(),
                subject.credits(),
                subject.grade()
            );
        }
    }
}

fn print_record(record: &SemesterRecord) {
    println!("Name: {}", record.name);
    println!("Semester: {}", record.semester);
    print_computation(&Computation {
        gpa: record.gpa,
        classification: record.classification,
        subjects: record.subjects.clone(),
    });
}
