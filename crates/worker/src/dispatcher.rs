//! Background delivery of accepted submissions.
//!
//! Jobs go through a bounded queue to a single worker task. For each job the
//! webhook call and both emails run concurrently, and every channel reports
//! exactly one [`DeliveryEvent`] on a broadcast channel. Delivery failures are
//! never surfaced to the submitter.

use delivery::{EmailTemplates, Mailer, OutboundEmail, SubmissionForwarder, WebhookPayload};
use intake_core::{Error, Result, Submission};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use telemetry::{health, metrics};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Dispatcher sizing.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Queued jobs before `enqueue` starts refusing
    pub queue_capacity: usize,
    /// Buffered events per subscriber
    pub event_capacity: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            event_capacity: 256,
        }
    }
}

/// Work for one accepted submission.
#[derive(Debug, Clone)]
pub struct DeliveryJob {
    pub submission: Submission,
    /// False when the webhook already ran inline as the durable step.
    pub forward_webhook: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryChannel {
    Webhook,
    OperatorEmail,
    ConfirmationEmail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Delivered,
    Failed(String),
    Skipped(String),
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryEvent {
    pub submission_id: Uuid,
    pub channel: DeliveryChannel,
    pub outcome: DeliveryOutcome,
}

/// Outbound channels available to the dispatcher.
#[derive(Clone)]
pub struct DeliveryChannels {
    pub forwarder: Option<Arc<dyn SubmissionForwarder>>,
    pub mailer: Option<Arc<dyn Mailer>>,
    pub templates: EmailTemplates,
}

enum Command {
    Deliver(DeliveryJob),
    Shutdown(oneshot::Sender<()>),
}

/// Cloneable handle for queueing jobs and observing outcomes.
#[derive(Clone)]
pub struct DispatcherHandle {
    tx: mpsc::Sender<Command>,
    events: broadcast::Sender<DeliveryEvent>,
}

impl DispatcherHandle {
    /// Queue a job without waiting. Fails when the queue is full or closed.
    pub fn enqueue(&self, job: DeliveryJob) -> Result<()> {
        let id = job.submission.id;
        metrics().dispatch_queue_depth.inc();
        self.tx.try_send(Command::Deliver(job)).map_err(|e| {
            metrics().dispatch_queue_depth.dec();
            warn!(submission_id = %id, error = %e, "Delivery queue rejected job");
            Error::internal(format!("Delivery queue unavailable: {}", e))
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DeliveryEvent> {
        self.events.subscribe()
    }

    /// Deliver everything already queued, then stop the worker.
    pub async fn shutdown(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(Command::Shutdown(ack_tx)).await.is_err() {
            return;
        }
        let _ = ack_rx.await;
    }
}

/// The worker side of the queue.
pub struct Dispatcher {
    rx: mpsc::Receiver<Command>,
    events: broadcast::Sender<DeliveryEvent>,
    channels: DeliveryChannels,
}

impl Dispatcher {
    /// Start the worker task.
    pub fn spawn(
        config: DispatcherConfig,
        channels: DeliveryChannels,
    ) -> (DispatcherHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let (events, _) = broadcast::channel(config.event_capacity.max(1));

        let dispatcher = Self {
            rx,
            events: events.clone(),
            channels,
        };
        let handle = tokio::spawn(dispatcher.run());

        (DispatcherHandle { tx, events }, handle)
    }

    async fn run(mut self) {
        info!("Delivery dispatcher started");

        while let Some(command) = self.rx.recv().await {
            match command {
                Command::Deliver(job) => self.deliver(job).await,
                Command::Shutdown(ack) => {
                    self.rx.close();
                    let mut drained = 0usize;
                    while let Ok(command) = self.rx.try_recv() {
                        if let Command::Deliver(job) = command {
                            self.deliver(job).await;
                            drained += 1;
                        }
                    }
                    info!(drained, "Delivery dispatcher stopped");
                    let _ = ack.send(());
                    return;
                }
            }
        }

        info!("Delivery dispatcher stopped");
    }

    async fn deliver(&self, job: DeliveryJob) {
        metrics().dispatch_queue_depth.dec();
        let start = Instant::now();
        let submission = &job.submission;

        let operator = self.channels.templates.operator_notification(submission);
        let confirmation = self.channels.templates.confirmation(submission);
        let confirmation_skip = if submission.email.is_none() {
            "no email address"
        } else {
            "confirmation disabled"
        };

        let (webhook, operator, confirmation) = tokio::join!(
            self.forward(submission, job.forward_webhook),
            self.send_email(operator, "no notification inbox configured"),
            self.send_email(confirmation, confirmation_skip),
        );

        metrics()
            .delivery_latency_ms
            .observe(start.elapsed().as_millis() as u64);

        for (channel, outcome) in [
            (DeliveryChannel::Webhook, webhook),
            (DeliveryChannel::OperatorEmail, operator),
            (DeliveryChannel::ConfirmationEmail, confirmation),
        ] {
            debug!(submission_id = %submission.id, ?channel, ?outcome, "Delivery attempt finished");
            // No subscribers is fine.
            let _ = self.events.send(DeliveryEvent {
                submission_id: submission.id,
                channel,
                outcome,
            });
        }
    }

    async fn forward(&self, submission: &Submission, enabled: bool) -> DeliveryOutcome {
        if !enabled {
            return DeliveryOutcome::Skipped("delivered inline".into());
        }
        let Some(forwarder) = &self.channels.forwarder else {
            return DeliveryOutcome::Skipped("webhook not configured".into());
        };

        match forwarder.forward(&WebhookPayload::from(submission)).await {
            Ok(()) => {
                metrics().webhook_delivered.inc();
                health().webhook.set_healthy();
                DeliveryOutcome::Delivered
            }
            Err(e) => {
                warn!(submission_id = %submission.id, error = %e, "Webhook delivery failed");
                metrics().webhook_failed.inc();
                health().webhook.set_unhealthy(e.to_string());
                DeliveryOutcome::Failed(e.to_string())
            }
        }
    }

    async fn send_email(&self, email: Option<OutboundEmail>, skip_reason: &str) -> DeliveryOutcome {
        let Some(mailer) = &self.channels.mailer else {
            return DeliveryOutcome::Skipped("email not configured".into());
        };
        let Some(email) = email else {
            return DeliveryOutcome::Skipped(skip_reason.into());
        };

        match mailer.send(&email).await {
            Ok(()) => {
                metrics().emails_sent.inc();
                health().email.set_healthy();
                DeliveryOutcome::Delivered
            }
            Err(e) => {
                warn!(subject = %email.subject, error = %e, "Email delivery failed");
                metrics().emails_failed.inc();
                health().email.set_unhealthy(e.to_string());
                DeliveryOutcome::Failed(e.to_string())
            }
        }
    }
}
