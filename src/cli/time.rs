//! Time tracking CLI commands

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::Subcommand;
use tracing::{debug, warn};

use super::output::{hours, Output};
use super::task;
use crate::domain::{Clock, SystemClock, Task, TaskStatus, TimeRecord};
use crate::storage::{TaskRepository, TimeRecordRepository, Workspace};

#[derive(Subcommand)]
pub enum TimeCommands {
    /// Start a timer on a task
    Start {
        /// Task ID
        task: String,

        /// What is being worked on
        #[arg(long, short)]
        description: Option<String>,
    },

    /// Stop the running timer and add its duration to the task
    Stop {
        /// Task ID
        task: String,
    },

    /// Record hours worked without a timer
    Log {
        /// Task ID
        task: String,

        /// Hours worked
        hours: f64,

        /// What was worked on
        #[arg(long, short)]
        description: Option<String>,
    },

    /// List time records of a task
    List {
        /// Task ID
        task: String,
    },

    /// List time records started within a date range
    Report {
        /// First day (YYYY-MM-DD)
        #[arg(long)]
        since: String,

        /// Last day, inclusive (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        until: Option<String>,
    },
}

pub fn run(cmd: TimeCommands, output: &Output) -> Result<()> {
    match cmd {
        TimeCommands::Start { task, description } => start_timer(output, &task, description),
        TimeCommands::Stop { task } => stop_timer(output, &task),
        TimeCommands::Log { task, hours, description } => log_time(output, &task, hours, description),
        TimeCommands::List { task } => list_records(output, &task),
        TimeCommands::Report { since, until } => report(output, &since, until.as_deref()),
    }
}

fn start_timer(output: &Output, task_id: &str, description: Option<String>) -> Result<()> {
    let workspace = Workspace::open_current()?;
    let mut task = task::load(&workspace, task_id)?;
    let records = workspace.time_records();

    if let Some(active) = records.find_active_record(&task.id)? {
        anyhow::bail!(
            "A timer is already running on {} (since {})",
            task.id,
            active.start_time.format("%Y-%m-%d %H:%M")
        );
    }

    let clock = SystemClock;
    let mut record = TimeRecord::start(task.id, &clock);
    if let Some(desc) = description {
        record.description = desc;
    }
    let record = records.save(record)?;

    if task.status == TaskStatus::NotStarted {
        task.start(&clock);
        workspace.tasks().save(task.clone())?;
        debug!(task = %task.id, "task started by timer");
    }

    if output.is_json() {
        output.record(&record)?;
    } else {
        output.success(&format!("Started timer {} on {}: {}", record.id, task.id, task.name));
    }

    Ok(())
}

fn stop_timer(output: &Output, task_id: &str) -> Result<()> {
    let workspace = Workspace::open_current()?;
    let task = task::load(&workspace, task_id)?;
    let records = workspace.time_records();

    let Some(mut record) = records.find_active_record(&task.id)? else {
        anyhow::bail!("No timer is running on {}", task.id);
    };

    let clock = SystemClock;
    record.stop(&clock);
    let (record, task) = commit_time(&workspace.tasks(), &records, task, record, &clock)?;

    if output.is_json() {
        output.record(&record)?;
    } else {
        output.success(&format!(
            "Stopped timer on {}: {} ({} total)",
            task.id,
            hours(record.duration()),
            hours(task.actual_hours)
        ));
    }

    Ok(())
}

fn log_time(output: &Output, task_id: &str, amount: f64, description: Option<String>) -> Result<()> {
    if !amount.is_finite() || amount < 0.0 {
        anyhow::bail!("Hours must be a non-negative number, got {}", amount);
    }

    let workspace = Workspace::open_current()?;
    let task = task::load(&workspace, task_id)?;
    let clock = SystemClock;

    let mut record = TimeRecord::start(task.id, &clock);
    record.stop(&clock);
    record.set_duration(amount);
    if let Some(desc) = description {
        record.description = desc;
    }
    let (record, task) = commit_time(&workspace.tasks(), &workspace.time_records(), task, record, &clock)?;

    if output.is_json() {
        output.record(&record)?;
    } else {
        output.success(&format!(
            "Logged {} on {} ({} total)",
            hours(amount),
            task.id,
            hours(task.actual_hours)
        ));
    }

    Ok(())
}

/// Adds a finished record's hours to its task and saves both
///
/// The task is saved first. If the record then cannot be saved, the task is
/// put back so that retrying does not count the hours twice.
fn commit_time(
    tasks: &impl TaskRepository,
    records: &impl TimeRecordRepository,
    task: Task,
    record: TimeRecord,
    clock: &dyn Clock,
) -> Result<(TimeRecord, Task)> {
    let mut updated = task.clone();
    updated.log_hours(record.duration(), clock);
    let updated = tasks.save(updated)?;

    match records.save(record.clone()) {
        Ok(record) => Ok((record, updated)),
        Err(err) => {
            if let Err(undo) = tasks.save(task) {
                warn!(
                    task = %updated.id,
                    hours = record.duration(),
                    error = %undo,
                    "Could not take back logged hours; subtract them before retrying"
                );
            }
            Err(anyhow::Error::new(err)
                .context(format!("Failed to save the time record for {}", updated.id)))
        }
    }
}

fn list_records(output: &Output, task_id: &str) -> Result<()> {
    let workspace = Workspace::open_current()?;
    let task = task::load(&workspace, task_id)?;
    let records = workspace.time_records().find_by_task_id(&task.id)?;

    print_records(output, &records)
}

fn report(output: &Output, since: &str, until: Option<&str>) -> Result<()> {
    let start = parse_day(since)?.and_time(NaiveTime::MIN).and_utc();
    let end = match until {
        Some(day) => end_of_day(parse_day(day)?)?,
        None => end_of_day(SystemClock.now().date_naive())?,
    };
    if end < start {
        anyhow::bail!("--until must not be before --since");
    }

    let workspace = Workspace::open_current()?;
    let records = workspace.time_records().find_by_date_range(start, end)?;

    print_records(output, &records)
}

fn print_records(output: &Output, records: &[TimeRecord]) -> Result<()> {
    if output.is_json() {
        return output.records(records);
    }

    if records.is_empty() {
        println!("No time records found.");
        return Ok(());
    }

    println!("{:<38} {:<17} {:<17} {:>8} DESCRIPTION", "TASK", "START", "END", "HOURS");
    println!("{}", "-".repeat(96));
    for record in records {
        let end = match record.end_time {
            Some(end) => end.format("%Y-%m-%d %H:%M").to_string(),
            None => "running".to_string(),
        };
        println!(
            "{:<38} {:<17} {:<17} {:>8} {}",
            record.task_id,
            record.start_time.format("%Y-%m-%d %H:%M"),
            end,
            hours(record.duration()),
            record.description
        );
    }

    let total: f64 = records.iter().map(TimeRecord::duration).sum();
    println!();
    println!("Total: {}", hours(total));

    Ok(())
}

fn parse_day(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}': expected YYYY-MM-DD", raw))
}

fn end_of_day(day: NaiveDate) -> Result<DateTime<Utc>> {
    day.and_hms_milli_opt(23, 59, 59, 999)
        .map(|dt| dt.and_utc())
        .with_context(|| format!("Invalid end of day for {}", day))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FixedClock, ProjectId, TimeRecordId};
    use crate::storage::{InMemoryTaskRepository, InMemoryTimeRecordRepository, StorageError};
    use chrono::TimeZone;

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap())
    }

    fn finished_record(task: &Task, hours: f64) -> TimeRecord {
        let mut record = TimeRecord::start(task.id, &clock());
        record.stop(&clock());
        record.set_duration(hours);
        record
    }

    /// Time records that can never be written
    struct ReadOnlyRecords;

    impl TimeRecordRepository for ReadOnlyRecords {
        fn save(&self, _record: TimeRecord) -> Result<TimeRecord, StorageError> {
            Err(StorageError::Poisoned)
        }

        fn find_by_id(&self, _id: &TimeRecordId) -> Result<Option<TimeRecord>, StorageError> {
            Ok(None)
        }

        fn find_all(&self) -> Result<Vec<TimeRecord>, StorageError> {
            Ok(Vec::new())
        }

        fn delete(&self, _id: &TimeRecordId) -> Result<bool, StorageError> {
            Ok(false)
        }
    }

    #[test]
    fn commit_adds_hours_and_saves_both() {
        let tasks = InMemoryTaskRepository::new();
        let records = InMemoryTimeRecordRepository::new();
        let task = tasks.save(Task::new(ProjectId::new(), "Build", 8.0, &clock())).unwrap();
        let record = finished_record(&task, 1.5);

        let (saved, updated) = commit_time(&tasks, &records, task.clone(), record.clone(), &clock()).unwrap();

        assert_eq!(saved, record);
        assert_eq!(updated.actual_hours, 1.5);
        assert_eq!(tasks.find_by_id(&task.id).unwrap().unwrap().actual_hours, 1.5);
        assert_eq!(records.find_by_task_id(&task.id).unwrap(), vec![record]);
    }

    #[test]
    fn failed_record_save_takes_the_hours_back() {
        let tasks = InMemoryTaskRepository::new();
        let mut task = Task::new(ProjectId::new(), "Build", 8.0, &clock());
        task.actual_hours = 2.0;
        let task = tasks.save(task).unwrap();
        let record = finished_record(&task, 1.5);

        let err = commit_time(&tasks, &ReadOnlyRecords, task.clone(), record, &clock()).unwrap_err();

        assert!(format!("{:#}", err).contains("Failed to save the time record"));
        assert_eq!(tasks.find_by_id(&task.id).unwrap().unwrap().actual_hours, 2.0);
    }

    #[test]
    fn parses_days() {
        let day = parse_day(" 2025-03-01 ").unwrap();
        assert_eq!(day, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
        assert!(parse_day("03/01/2025").is_err());
    }

    #[test]
    fn end_of_day_is_inclusive() {
        let day = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let end = end_of_day(day).unwrap();
        assert_eq!(end.to_rfc3339(), "2025-03-01T23:59:59.999+00:00");
    }
}
