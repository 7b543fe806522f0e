use parking_lot::RwLock;
use schemars::JsonSchema;
use seating_core::{SeatingRequest, SeatingResult, Solver};
use std::collections::HashMap;
use tracing::{error, warn};
use uuid::Uuid;

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize, JsonSchema)]
pub struct JobId(pub String);

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize, JsonSchema)]
#[serde(tag = "status")]
pub enum JobStatus {
    Queued,
    Running,
    Completed { result: SeatingResult },
    Failed { message: String },
}

/// Fire-and-forget seating runs keyed by job id. Results stay in memory
/// until the process exits.
#[derive(Clone)]
pub struct InMemJobs<S: Solver> {
    inner: std::sync::Arc<RwLock<HashMap<String, JobStatus>>>,
    solver: std::sync::Arc<S>,
}

impl<S: Solver> InMemJobs<S> {
    pub fn new(solver: S) -> Self {
        Self {
            inner: Default::default(),
            solver: std::sync::Arc::new(solver),
        }
    }

    pub fn enqueue(&self, request: SeatingRequest) -> JobId {
        let id = Uuid::new_v4().to_string();
        self.inner.write().insert(id.clone(), JobStatus::Queued);

        let map = self.inner.clone();
        let solver = self.solver.clone();
        let id_for_task = id.clone();

        tokio::spawn(async move {
            {
                let mut w = map.write();
                w.insert(id_for_task.clone(), JobStatus::Running);
            }
            match solver.solve(request).await {
                Ok(result) => {
                    if !result.is_clean() {
                        warn!(
                            "job {id_for_task} finished degraded with {} violations",
                            result.violations.len()
                        );
                    }
                    map.write()
                        .insert(id_for_task, JobStatus::Completed { result });
                }
                Err(e) => {
                    error!(?e, "seating job failed");
                    map.write().insert(
                        id_for_task,
                        JobStatus::Failed {
                            message: e.to_string(),
                        },
                    );
                }
            }
        });

        JobId(id)
    }

    pub fn get(&self, id: &str) -> Option<JobStatus> {
        self.inner.read().get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use seating_core::SeatingError;
    use std::collections::BTreeMap;
    use std::time::Duration;
    use types::{SeatingConfig, SeatingParams, SeatingSummary};

    struct StubSolver {
        fail: bool,
    }

    #[async_trait]
    impl Solver for StubSolver {
        async fn solve(&self, _request: SeatingRequest) -> Result<SeatingResult, SeatingError> {
            if self.fail {
                return Err(SeatingError::Validation("bad config".into()));
            }
            Ok(SeatingResult {
                status: "solved".into(),
                halls: vec![],
                summary: SeatingSummary {
                    total_students: 0,
                    total_halls: 0,
                    total_capacity: 0,
                    utilization_rate: 0.0,
                    students_per_hall: vec![],
                    teachers_assigned: 0,
                },
                seating_arrangement: BTreeMap::new(),
                violations: vec![],
                stats: serde_json::json!({}),
            })
        }
    }

    fn request() -> SeatingRequest {
        SeatingRequest {
            config: SeatingConfig {
                classes: vec!["9A".into()],
                total_students: 1,
                total_teachers: 1,
                halls: vec![],
                options: Default::default(),
            },
            params: SeatingParams::new(0),
            students: vec![],
            staff: vec![],
        }
    }

    async fn wait_terminal<S: Solver>(jobs: &InMemJobs<S>, id: &JobId) -> JobStatus {
        for _ in 0..200 {
            match jobs.get(&id.0) {
                Some(JobStatus::Queued) | Some(JobStatus::Running) | None => {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
                Some(done) => return done,
            }
        }
        panic!("job never finished");
    }

    #[tokio::test]
    async fn job_runs_to_completion() {
        let jobs = InMemJobs::new(StubSolver { fail: false });
        let id = jobs.enqueue(request());
        let status = wait_terminal(&jobs, &id).await;
        assert!(matches!(status, JobStatus::Completed { .. }));
    }

    #[tokio::test]
    async fn solver_errors_surface_as_failed() {
        let jobs = InMemJobs::new(StubSolver { fail: true });
        let id = jobs.enqueue(request());
        let status = wait_terminal(&jobs, &id).await;
        match status {
            JobStatus::Failed { message } => assert!(message.contains("bad config")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_ids_return_none() {
        let jobs = InMemJobs::new(StubSolver { fail: false });
        assert!(jobs.get("nope").is_none());
    }

    #[test]
    fn status_serializes_with_a_tag() {
        let s = serde_json::to_value(JobStatus::Queued).unwrap();
        assert_eq!(s["status"], "Queued");
    }
}
