//! Job aggregation and project classification
//!
//! Both functions are pure: the same records always produce the same summary
//! and outcome.

use crate::models::{JobRecord, ProjectOutcome, ProjectReport, ProjectRef, ProjectSummary};

/// Group job names by state, merging repeated names into one counted tally.
pub fn summarize<'a, I>(records: I) -> ProjectSummary
where
    I: IntoIterator<Item = &'a JobRecord>,
{
    let mut summary = ProjectSummary::default();
    for record in records {
        summary.record(&record.state, &record.name);
    }
    summary
}

/// Classify a project from its summary.
///
/// `had_any_records` separates "nothing ran" from "everything ran fine".
/// Projects whose jobs are all still in flight count as clean runs.
pub fn classify(summary: &ProjectSummary, had_any_records: bool) -> ProjectOutcome {
    if !had_any_records {
        ProjectOutcome::NoActivity
    } else if summary.has_failures() {
        ProjectOutcome::HasFailures
    } else {
        ProjectOutcome::CleanRun
    }
}

/// Summarize and classify one project's records.
pub fn report(project: ProjectRef, records: &[JobRecord]) -> ProjectReport {
    let summary = summarize(records);
    let outcome = classify(&summary, !records.is_empty());
    ProjectReport {
        project,
        summary,
        outcome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{JobState, JobTally};
    use proptest::prelude::*;

    fn job(name: &str, state: JobState) -> JobRecord {
        JobRecord::new("project-1", name, state)
    }

    fn any_state() -> impl Strategy<Value = JobState> {
        prop_oneof![
            Just(JobState::Idle),
            Just(JobState::Runnable),
            Just(JobState::Running),
            Just(JobState::Done),
            Just(JobState::Failed),
            Just(JobState::Terminated),
        ]
    }

    fn non_failed_state() -> impl Strategy<Value = JobState> {
        prop_oneof![
            Just(JobState::Idle),
            Just(JobState::Running),
            Just(JobState::Done),
            Just(JobState::Terminated),
        ]
    }

    fn any_record(state: impl Strategy<Value = JobState>) -> impl Strategy<Value = JobRecord> {
        ("[a-c]{1,2}", state).prop_map(|(name, state)| job(&name, state))
    }

    #[test]
    fn test_duplicate_names_are_tallied() {
        let records = vec![
            job("align", JobState::Failed),
            job("align", JobState::Failed),
            job("align", JobState::Failed),
        ];

        let summary = summarize(&records);
        let failed = summary.bucket(&JobState::Failed).unwrap();

        assert_eq!(
            failed.jobs,
            vec![JobTally {
                name: "align".to_string(),
                count: 3
            }]
        );
    }

    #[test]
    fn test_buckets_keep_first_seen_order() {
        let records = vec![
            job("b", JobState::Done),
            job("a", JobState::Failed),
            job("c", JobState::Done),
            job("b", JobState::Done),
        ];

        let summary = summarize(&records);
        let states: Vec<_> = summary.buckets().iter().map(|b| b.state.clone()).collect();
        assert_eq!(states, vec![JobState::Done, JobState::Failed]);

        let done: Vec<_> = summary
            .bucket(&JobState::Done)
            .unwrap()
            .jobs
            .iter()
            .map(|j| (j.name.as_str(), j.count))
            .collect();
        assert_eq!(done, vec![("b", 2), ("c", 1)]);
    }

    #[test]
    fn test_empty_project_is_no_activity() {
        let report = report(ProjectRef::new("project-1", "002_empty"), &[]);

        assert!(report.summary.is_empty());
        assert_eq!(report.outcome, ProjectOutcome::NoActivity);
    }

    #[test]
    fn test_in_flight_jobs_are_clean() {
        let records = vec![job("a", JobState::Running), job("b", JobState::Runnable)];
        let summary = summarize(&records);

        assert_eq!(classify(&summary, true), ProjectOutcome::CleanRun);
    }

    proptest! {
        #[test]
        fn prop_summary_preserves_record_count(
            records in prop::collection::vec(any_record(any_state()), 0..40)
        ) {
            let summary = summarize(&records);
            prop_assert_eq!(summary.total(), records.len());
        }

        #[test]
        fn prop_no_failures_is_clean(
            records in prop::collection::vec(any_record(non_failed_state()), 1..40)
        ) {
            let summary = summarize(&records);
            prop_assert_eq!(classify(&summary, true), ProjectOutcome::CleanRun);
        }

        #[test]
        fn prop_any_failure_is_has_failures(
            mut records in prop::collection::vec(any_record(any_state()), 0..40),
            failed in any_record(Just(JobState::Failed)),
            at in any::<prop::sample::Index>()
        ) {
            let idx = at.index(records.len() + 1);
            records.insert(idx, failed);

            let summary = summarize(&records);
            prop_assert_eq!(classify(&summary, true), ProjectOutcome::HasFailures);
        }

        #[test]
        fn prop_no_activity_iff_empty(
            records in prop::collection::vec(any_record(any_state()), 0..10)
        ) {
            let report = report(ProjectRef::new("project-1", "002_p"), &records);
            prop_assert_eq!(report.outcome == ProjectOutcome::NoActivity, records.is_empty());
        }
    }
}
