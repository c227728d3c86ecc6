//! # Notification Service
//!
//! Delivers notifications over three channels:
//!
//! - **in_app**: a `notifications` row the user reads through the API
//! - **email** / **sms**: sent synchronously through the integrations
//!
//! A failed email or SMS is not an error for the caller. The message is put on
//! the job queue (`notification.email` / `notification.sms`) and the
//! maintenance CLI retries it with exponential backoff.

use chrono::Utc;
use lib_core::dto::SendNotificationResult;
use lib_core::model::store::enums::{JobStatus, NotificationChannel};
use lib_core::model::store::models::{Job, User};
use lib_core::model::store::{DbPool, JobRepository, NotificationRepository};
use lib_core::{AppError, Result};
use lib_integrations::Integrations;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

pub const EMAIL_JOB: &str = "notification.email";
pub const SMS_JOB: &str = "notification.sms";

/// Retries go ahead of routine jobs.
const RETRY_PRIORITY: i64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailJob {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsJob {
    pub to: String,
    pub body: String,
}

/// Outcome of one `run_due` pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobRunSummary {
    pub processed: usize,
    pub completed: usize,
    pub retried: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct NotificationService {
    db: DbPool,
    integrations: Integrations,
}

impl NotificationService {
    pub fn new(db: DbPool, integrations: Integrations) -> Self {
        Self { db, integrations }
    }

    /// In-app notification for one user. Failures are logged only.
    pub async fn notify(&self, user_id: i64, title: &str, message: &str, kind: &str) {
        match NotificationRepository::create(&self.db, user_id, title, message, kind).await {
            Ok(n) => debug!("[NOTIFY] Notification {} for user {}", n.id, user_id),
            Err(e) => warn!("[NOTIFY] Failed to notify user {}: {}", user_id, e),
        }
    }

    /// Deliver one message to every recipient over each requested channel.
    #[instrument(skip(self, recipients, message), fields(recipients = recipients.len()))]
    pub async fn send(
        &self,
        recipients: &[User],
        title: &str,
        message: &str,
        kind: &str,
        channels: &[NotificationChannel],
    ) -> SendNotificationResult {
        let mut result = SendNotificationResult { recipients: recipients.len(), ..Default::default() };

        for user in recipients {
            for channel in channels {
                match channel {
                    NotificationChannel::InApp => {
                        match NotificationRepository::create(&self.db, user.id, title, message, kind).await {
                            Ok(_) => result.in_app += 1,
                            Err(e) => warn!("[NOTIFY] In-app insert failed for user {}: {}", user.id, e),
                        }
                    }
                    NotificationChannel::Email => {
                        let Some(to) = user.email.as_deref() else {
                            result.skipped += 1;
                            continue;
                        };
                        match self.integrations.email.send(to, title, message).await {
                            Ok(_) => result.email_sent += 1,
                            Err(e) => {
                                warn!("[NOTIFY] Email to user {} failed, queueing retry: {}", user.id, e);
                                let job = EmailJob {
                                    to: to.to_string(),
                                    subject: title.to_string(),
                                    body: message.to_string(),
                                };
                                if self.enqueue(EMAIL_JOB, &job).await {
                                    result.queued_for_retry += 1;
                                }
                            }
                        }
                    }
                    NotificationChannel::Sms => {
                        let Some(to) = user.phone.as_deref() else {
                            result.skipped += 1;
                            continue;
                        };
                        match self.integrations.sms.send(to, message).await {
                            Ok(_) => result.sms_sent += 1,
                            Err(e) => {
                                warn!("[NOTIFY] SMS to user {} failed, queueing retry: {}", user.id, e);
                                let job = SmsJob { to: to.to_string(), body: message.to_string() };
                                if self.enqueue(SMS_JOB, &job).await {
                                    result.queued_for_retry += 1;
                                }
                            }
                        }
                    }
                }
            }
        }

        info!(
            "[NOTIFY] Sent '{}' to {} recipients (in_app={}, email={}, sms={}, queued={}, skipped={})",
            title,
            result.recipients,
            result.in_app,
            result.email_sent,
            result.sms_sent,
            result.queued_for_retry,
            result.skipped
        );
        result
    }

    async fn enqueue<T: Serialize>(&self, job_type: &str, payload: &T) -> bool {
        let payload = match serde_json::to_value(payload) {
            Ok(v) => v,
            Err(e) => {
                warn!("[JOBS] Could not encode {} payload: {}", job_type, e);
                return false;
            }
        };
        match JobRepository::enqueue(&self.db, job_type, &payload, RETRY_PRIORITY, Utc::now()).await {
            Ok(job) => {
                debug!("[JOBS] Queued {} as job {}", job_type, job.id);
                true
            }
            Err(e) => {
                warn!("[JOBS] Could not queue {}: {}", job_type, e);
                false
            }
        }
    }

    /// Execute one claimed job.
    pub async fn process_job(&self, job: &Job) -> Result<()> {
        match job.job_type.as_str() {
            EMAIL_JOB => {
                let payload: EmailJob = decode(&job.payload.0)?;
                self.integrations.email.send(&payload.to, &payload.subject, &payload.body).await?;
            }
            SMS_JOB => {
                let payload: SmsJob = decode(&job.payload.0)?;
                self.integrations.sms.send(&payload.to, &payload.body).await?;
            }
            other => {
                return Err(AppError::InvalidInput(format!("Unknown job type: {}", other)));
            }
        }
        Ok(())
    }

    /// Claim and run up to `max` due jobs. Failures are rescheduled or, after
    /// the last attempt, marked `failed`.
    pub async fn run_due(&self, max: usize) -> Result<JobRunSummary> {
        let mut summary = JobRunSummary::default();

        while summary.processed < max {
            let Some(job) = JobRepository::claim_next(&self.db, Utc::now()).await? else {
                break;
            };
            summary.processed += 1;

            match self.process_job(&job).await {
                Ok(()) => {
                    JobRepository::complete(&self.db, job.id).await?;
                    summary.completed += 1;
                    debug!("[JOBS] Job {} ({}) completed", job.id, job.job_type);
                }
                Err(e) => {
                    let updated = JobRepository::fail(&self.db, &job, &e.to_string()).await?;
                    if updated.status == JobStatus::Failed {
                        warn!("[JOBS] Job {} ({}) failed permanently: {}", job.id, job.job_type, e);
                        summary.failed += 1;
                    } else {
                        info!("[JOBS] Job {} ({}) will retry at {}", job.id, job.job_type, updated.run_at);
                        summary.retried += 1;
                    }
                }
            }
        }

        Ok(summary)
    }
}

fn decode<T: serde::de::DeserializeOwned>(payload: &Value) -> Result<T> {
    serde_json::from_value(payload.clone())
        .map_err(|e| AppError::InvalidInput(format!("Malformed job payload: {}", e)))
}
