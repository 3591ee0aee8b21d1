use tokio::time::sleep;
use tracing::{error, info, warn};

use redpost_core::{PostRecord, PostResult, SafetySettings, SubmittedPost};

use crate::session::SessionGuard;
use crate::submitter::Submitter;
use crate::validator::validate_record;

/// Sequential batch loop: one record at a time, a delay between records,
/// one `PostResult` per record no matter what goes wrong.
pub struct BatchRunner<S: Submitter> {
    submitter: S,
    session: SessionGuard,
    dry_run: bool,
}

impl<S: Submitter> BatchRunner<S> {
    pub fn new(submitter: S, settings: SafetySettings, dry_run: bool) -> Self {
        Self {
            submitter,
            session: SessionGuard::new(settings),
            dry_run,
        }
    }

    pub fn session(&self) -> &SessionGuard {
        &self.session
    }

    pub async fn run(&mut self, records: &[PostRecord]) -> Vec<PostResult> {
        let total = records.len();
        info!(total, dry_run = self.dry_run, "starting batch submission");

        let mut results = Vec::with_capacity(total);
        for (index, record) in records.iter().enumerate() {
            info!(
                record = index + 1,
                total,
                subreddit = %record.subreddit,
                "processing record"
            );

            let result = self.submit_one(record).await;
            match (result.success, &result.error) {
                (true, _) => info!(
                    record = index + 1,
                    url = result.post_url.as_deref().unwrap_or(""),
                    "record succeeded"
                ),
                (false, error) => error!(
                    record = index + 1,
                    error = error.as_deref().unwrap_or("unknown"),
                    "record failed"
                ),
            }
            results.push(result);

            // Never sleep after the final record.
            if index + 1 < total {
                let delay = self.session.next_delay(record.delay);
                info!(delay_secs = delay.as_secs(), "waiting before next record");
                sleep(delay).await;
            }
        }

        let succeeded = results.iter().filter(|r| r.success).count();
        info!(succeeded, total, "batch complete");
        results
    }

    /// The per-record pipeline: limits, validation, access check, flair,
    /// submit. Every failure is captured into the result so the batch
    /// carries on.
    async fn submit_one(&mut self, record: &PostRecord) -> PostResult {
        if let Err(e) = self.session.check_limits() {
            warn!(subreddit = %record.subreddit, "{e}");
            return PostResult::failure(record, e.to_string(), self.dry_run);
        }

        if let Err(e) = validate_record(record) {
            warn!(subreddit = %record.subreddit, "validation failed: {e}");
            return PostResult::failure(record, format!("validation failed: {e}"), self.dry_run);
        }

        if self.dry_run {
            info!(
                subreddit = %record.subreddit,
                title = %record.title,
                "[dry run] would submit"
            );
            let simulated = SubmittedPost {
                id: "dry-run".to_string(),
                url: format!("https://reddit.com/r/{}/dry_run_simulation", record.subreddit),
            };
            return PostResult::success(record, simulated, true);
        }

        if let Err(e) = self.submitter.check_subreddit(&record.subreddit).await {
            warn!(subreddit = %record.subreddit, "subreddit check failed: {e}");
            return PostResult::failure(record, format!("subreddit check failed: {e}"), false);
        }

        let flair = match record.flair.as_deref() {
            Some(wanted) => self.submitter.resolve_flair(&record.subreddit, wanted).await,
            None => None,
        };

        match self.submitter.submit(record, flair).await {
            Ok(submitted) => {
                self.session.record_post();
                PostResult::success(record, submitted, false)
            }
            Err(e) => {
                if let Some(retry_after) = e.retry_after() {
                    warn!(
                        subreddit = %record.subreddit,
                        retry_after_secs = retry_after.as_secs(),
                        "server asked to slow down"
                    );
                }
                PostResult::failure(record, e.to_string(), false)
            }
        }
    }
}
