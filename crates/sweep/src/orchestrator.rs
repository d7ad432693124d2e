//! One full pass over all users and their open orders.
//!
//! Per order: derive the deadline, classify the window, consult the ledger,
//! render and dispatch, then record delivery. Failures are counted and
//! logged; nothing here returns an error to the caller.
//!
//! Users are processed by a bounded pool of `concurrency` tasks. Orders of
//! one user run sequentially, and a notification key embeds the user id, so
//! no key is checked and written by two tasks of the same sweep.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, instrument, warn};

use duewatch_core::{NotificationKey, Order, User};
use duewatch_notify::{DeliveryOutcome, Dispatcher, MessageContext, MessageTemplates};
use duewatch_storage::{CreateOutcome, Store};

use crate::deadline::deadline_for;
use crate::ledger::Ledger;
use crate::report::{SweepCounts, SweepReport};
use crate::threshold::{classify, hours_until};

/// Default number of users swept concurrently.
pub const DEFAULT_CONCURRENCY: usize = 8;

pub struct SweepOrchestrator {
    store: Arc<dyn Store>,
    ledger: Ledger,
    dispatcher: Arc<Dispatcher>,
    templates: Arc<MessageTemplates>,
    tz: Tz,
    concurrency: usize,
}

impl SweepOrchestrator {
    pub fn new(
        store: Arc<dyn Store>,
        dispatcher: Arc<Dispatcher>,
        templates: Arc<MessageTemplates>,
        tz: Tz,
    ) -> Self {
        Self {
            ledger: Ledger::new(store.clone()),
            store,
            dispatcher,
            templates,
            tz,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Sweep against the current time.
    pub async fn run_sweep(&self) -> SweepReport {
        self.run_sweep_at(Utc::now()).await
    }

    /// Sweep with thresholds evaluated at `now`.
    pub async fn run_sweep_at(&self, now: DateTime<Utc>) -> SweepReport {
        let started_at = Utc::now();
        info!(
            evaluated_at = %now,
            timezone = %self.tz,
            transport = self.dispatcher.transport_name(),
            concurrency = self.concurrency,
            "Deadline sweep started"
        );

        let mut report = SweepReport {
            evaluated_at: now,
            started_at,
            finished_at: started_at,
            counts: SweepCounts::default(),
            aborted: None,
        };

        let users = match self.store.list_users().await {
            Ok(users) => users,
            Err(e) => {
                error!(error = %e, "Failed to list users; ending sweep early");
                report.aborted = Some(format!("list users: {e}"));
                report.finished_at = Utc::now();
                report.log();
                return report;
            }
        };

        report.counts = stream::iter(users)
            .map(|user| self.sweep_user(user, now))
            .buffer_unordered(self.concurrency)
            .fold(SweepCounts::default(), |mut total, counts| async move {
                total.merge(&counts);
                total
            })
            .await;

        report.finished_at = Utc::now();
        report.log();
        report
    }

    #[instrument(skip_all, fields(user_id = %user.id))]
    async fn sweep_user(&self, user: User, now: DateTime<Utc>) -> SweepCounts {
        let mut counts = SweepCounts {
            users_scanned: 1,
            ..Default::default()
        };

        let Some(token) = user.push_token() else {
            info!("User has no push token; skipping");
            counts.users_without_token = 1;
            return counts;
        };

        let orders = match self.store.list_open_orders(&user.id).await {
            Ok(orders) => orders,
            Err(e) => {
                warn!(error = %e, "Failed to list open orders; skipping user");
                counts.users_failed = 1;
                return counts;
            }
        };

        for order in &orders {
            counts.orders_scanned += 1;
            self.process_order(&user.id, token, order, now, &mut counts)
                .await;
        }
        counts
    }

    async fn process_order(
        &self,
        user_id: &str,
        token: &str,
        order: &Order,
        now: DateTime<Utc>,
        counts: &mut SweepCounts,
    ) {
        let order_id = order.id.as_str();

        let deadline = match deadline_for(order.order_code.as_deref(), self.tz) {
            Ok(deadline) => deadline,
            Err(e) => {
                warn!(order_id, error = %e, "Skipping order with malformed order code");
                counts.malformed += 1;
                return;
            }
        };

        let Some(threshold) = classify(&deadline, &now) else {
            debug!(order_id, deadline = %deadline, "No threshold window matched");
            counts.no_threshold += 1;
            return;
        };

        let key = NotificationKey::new(user_id, order_id, threshold);
        match self.ledger.has_sent(&key).await {
            Ok(true) => {
                debug!(order_id, threshold = %threshold, "Notification already sent");
                counts.already_sent += 1;
                return;
            }
            Ok(false) => {}
            Err(e) => {
                warn!(
                    order_id,
                    threshold = %threshold,
                    error = %e,
                    "Ledger read failed; treating as not sent"
                );
                counts.ledger_read_failures += 1;
            }
        }

        let ctx = MessageContext {
            order_label: order.label(),
            order_code: order.order_code.clone().unwrap_or_default(),
            deadline: deadline.format("%Y-%m-%d %H:%M").to_string(),
            hours_remaining: hours_until(&deadline, &now),
        };
        let message = match self.templates.render(threshold, &ctx) {
            Ok(message) => message,
            Err(e) => {
                error!(
                    order_id,
                    threshold = %threshold,
                    error = %e,
                    "Failed to render notification"
                );
                counts.render_failures += 1;
                return;
            }
        };

        match self
            .dispatcher
            .dispatch(token, &message.title, &message.body)
            .await
        {
            DeliveryOutcome::Delivered => {
                counts.dispatched += 1;
                info!(order_id, threshold = %threshold, "Deadline notification sent");
                match self.ledger.mark_sent(&key, Utc::now()).await {
                    Ok(CreateOutcome::Created) => {}
                    Ok(CreateOutcome::AlreadyExists) => counts.duplicate_records += 1,
                    Err(e) => {
                        error!(
                            order_id,
                            threshold = %threshold,
                            error = %e,
                            "Failed to record sent notification; it may be sent again"
                        );
                        counts.ledger_write_failures += 1;
                    }
                }
            }
            DeliveryOutcome::InvalidToken(reason) => {
                warn!(
                    order_id,
                    threshold = %threshold,
                    reason = %reason,
                    "Push token rejected; user should refresh it"
                );
                counts.invalid_token += 1;
            }
            DeliveryOutcome::TransportError(reason) => {
                warn!(
                    order_id,
                    threshold = %threshold,
                    reason = %reason,
                    "Dispatch failed; will retry next sweep"
                );
                counts.transport_failed += 1;
            }
        }
    }
}
