use anyhow::Context;
use async_trait::async_trait;
use schemars::schema_for;
use seating_core::{validate, ArrangementSink, Directory, SeatingRequest};
use solver_csp::generate_seating;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use types::{SeatingResult, StaffRecord, StudentRecord};

/// Serves directory lookups from the rosters embedded in the request file.
/// A class list entry matches either the bare class label or the packed
/// class+section form ("10" or "10A").
struct FileDirectory {
    students: Vec<StudentRecord>,
    staff: Vec<StaffRecord>,
}

#[async_trait]
impl Directory for FileDirectory {
    async fn find_students(&self, classes: &[String]) -> anyhow::Result<Vec<StudentRecord>> {
        Ok(self
            .students
            .iter()
            .filter(|s| matches_any_class(s, classes))
            .cloned()
            .collect())
    }

    async fn find_staff(&self, limit: usize) -> anyhow::Result<Vec<StaffRecord>> {
        Ok(self.staff.iter().take(limit).cloned().collect())
    }
}

fn matches_any_class(student: &StudentRecord, classes: &[String]) -> bool {
    let class = student.class.trim();
    let packed = format!("{}{}", class, student.section.trim());
    classes.iter().any(|label| {
        let label = label.trim();
        label.eq_ignore_ascii_case(class) || label.eq_ignore_ascii_case(&packed)
    })
}

struct JsonFileSink {
    path: PathBuf,
}

#[async_trait]
impl ArrangementSink for JsonFileSink {
    async fn store(&self, result: &SeatingResult) -> anyhow::Result<()> {
        let body = serde_json::to_string_pretty(result)?;
        std::fs::write(&self.path, body)
            .with_context(|| format!("writing {}", self.path.display()))?;
        Ok(())
    }
}

fn print_schemas() -> anyhow::Result<()> {
    let schemas = serde_json::json!({
        "request": schema_for!(types::SeatingRequest),
        "result": schema_for!(types::SeatingResult),
    });
    println!("{}", serde_json::to_string_pretty(&schemas)?);
    Ok(())
}

fn read_request(path: &str) -> anyhow::Result<SeatingRequest> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    serde_json::from_str(&raw).with_context(|| format!("{path} is not a valid seating request"))
}

const USAGE: &str = "usage: examseat <request.json> [output.json]
       examseat validate <request.json>
       examseat schema";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("schema") => print_schemas(),
        Some("validate") => {
            let path = args.get(1).context(USAGE)?;
            let request = read_request(path)?;
            validate(&request.config)?;
            println!("ok: {} halls, {} declared students", request.config.halls.len(), request.config.total_students);
            Ok(())
        }
        Some(path) => {
            let request = read_request(path)?;
            let out = args.get(1).map(|p| JsonFileSink { path: p.into() });

            let mut params = request.params;
            if params.time_limit_ms.is_none() {
                if let Ok(ms) = std::env::var("EXAMSEAT__SOLVER__TIME_LIMIT_MS") {
                    params.time_limit_ms = ms.parse().ok();
                }
            }

            let directory = FileDirectory {
                students: request.students,
                staff: request.staff,
            };
            let result = generate_seating(&directory, request.config, params).await?;
            tracing::info!(
                "{}: {} students seated, {} violations",
                result.status,
                result.summary.total_students,
                result.violations.len()
            );

            println!("{}", serde_json::to_string_pretty(&result)?);
            if let Some(sink) = out {
                sink.store(&result).await?;
            }
            Ok(())
        }
        None => {
            eprintln!("{USAGE}");
            std::process::exit(2);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::StudentId;

    fn student(class: &str, section: &str) -> StudentRecord {
        StudentRecord {
            id: StudentId("s".into()),
            name: "s".into(),
            class: class.into(),
            section: section.into(),
        }
    }

    #[test]
    fn class_list_matches_bare_and_packed_labels() {
        let labels = vec!["10A".to_string(), "9".to_string()];
        assert!(matches_any_class(&student("10", "A"), &labels));
        assert!(matches_any_class(&student("10A", ""), &labels));
        assert!(matches_any_class(&student("9", "B"), &labels));
        assert!(!matches_any_class(&student("10", "B"), &labels));
        assert!(!matches_any_class(&student("8", "A"), &labels));
    }

    #[test]
    fn label_matching_ignores_case_and_padding() {
        let labels = vec![" 10a ".to_string()];
        assert!(matches_any_class(&student("10", "A"), &labels));
        assert!(matches_any_class(&student("10", "a "), &labels));
    }
}
