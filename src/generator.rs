use log::{debug, info, warn};
use rust_decimal::Decimal;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::error::{BatchError, EncodingError, TaskFailure, ValidationError, Warning};
use crate::hub3::{self, Hub3DataBuilder, Hub3Record};
use crate::model::{Contact, Organization, PaymentTemplate};
use crate::planner::{self, DependentSource, GenerationTask};

/// Receives every record built in a batch (barcode encoder, HTML merge, file export).
pub trait RecordSink {
    fn accept(&mut self, task: &GenerationTask, record: &Hub3Record) -> Result<(), EncodingError>;
}

impl<F> RecordSink for F
where
    F: FnMut(&GenerationTask, &Hub3Record) -> Result<(), EncodingError>,
{
    fn accept(&mut self, task: &GenerationTask, record: &Hub3Record) -> Result<(), EncodingError> {
        self(task, record)
    }
}

/// A sink that discards records.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl RecordSink for NullSink {
    fn accept(&mut self, _: &GenerationTask, _: &Hub3Record) -> Result<(), EncodingError> {
        Ok(())
    }
}

/// Cooperative cancellation flag, checked between tasks.
#[derive(Debug, Default, Clone)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
}

/// Result of a single task.
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    pub task: GenerationTask,
    pub result: Result<Hub3Record, TaskFailure>,
    pub warnings: Vec<Warning>,
}

impl TaskOutcome {
    fn failed(task: GenerationTask, failure: TaskFailure, warnings: Vec<Warning>) -> Self {
        Self {
            task,
            result: Err(failure),
            warnings,
        }
    }
}

/// Every task attempted in a batch, in task order.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub total: usize,
    pub outcomes: Vec<TaskOutcome>,
    pub cancelled: bool,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn records(&self) -> impl Iterator<Item = (&GenerationTask, &Hub3Record)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok().map(|r| (&o.task, r)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&GenerationTask, &TaskFailure)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (&o.task, e)))
    }
}

/// Runs a batch in the background. Progress arrives on `progress`.
pub struct BatchHandle {
    pub progress: Receiver<Progress>,
    cancel: CancellationToken,
    handle: JoinHandle<Result<BatchReport, ValidationError>>,
}

impl BatchHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn join(self) -> Result<BatchReport, BatchError> {
        match self.handle.join() {
            Ok(result) => Ok(result?),
            Err(_) => Err(BatchError::WorkerPanicked),
        }
    }
}

/// Generates HUB-3 records for a set of contacts against one template.
///
/// Tasks run sequentially in plan order. A failing task is recorded in the
/// report and the batch continues with the next one.
#[derive(Debug, Clone)]
pub struct BulkGenerator {
    template: PaymentTemplate,
    organization: Organization,
    amount_override: Option<Decimal>,
    cancel: CancellationToken,
}

impl BulkGenerator {
    pub fn new(template: PaymentTemplate, organization: Organization) -> Self {
        Self {
            template,
            organization,
            amount_override: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_amount(mut self, amount: Option<Decimal>) -> Self {
        self.amount_override = amount;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Plans the tasks for `contacts`.
    pub fn plan<S: DependentSource + ?Sized>(
        &self,
        contacts: &[Contact],
        source: &S,
    ) -> Vec<GenerationTask> {
        planner::plan(contacts, &self.template, source)
    }

    /// Runs the whole batch on the calling thread.
    ///
    /// # Arguments
    ///
    /// * `contacts` - The selected contacts, in the order records should appear.
    /// * `source` - Supplies each contact's dependents.
    /// * `sink` - Receives every built record.
    /// * `on_progress` - Called after each task with `current/total`.
    ///
    /// # Returns
    ///
    /// The report of all attempted tasks, or a `ValidationError` if the template
    /// or organization cannot produce any record.
    pub fn run<S, K, P>(
        &self,
        contacts: &[Contact],
        source: &S,
        sink: &mut K,
        mut on_progress: P,
    ) -> Result<BatchReport, ValidationError>
    where
        S: DependentSource + ?Sized,
        K: RecordSink + ?Sized,
        P: FnMut(Progress),
    {
        hub3::validate(&self.template, &self.organization, self.amount_override)?;

        let tasks = self.plan(contacts, source);
        let total = tasks.len();
        info!(
            "Generating {} record(s) with template '{}'",
            total, self.template.name
        );

        let builder = Hub3DataBuilder::new(&self.template, &self.organization)
            .with_amount(self.amount_override);
        let mut report = BatchReport {
            total,
            ..Default::default()
        };

        for task in tasks {
            if self.cancel.is_cancelled() {
                info!(
                    "Generation cancelled after {}/{} task(s)",
                    report.outcomes.len(),
                    total
                );
                report.cancelled = true;
                break;
            }

            let outcome = run_task(&builder, task, &mut *sink);
            if let Err(failure) = &outcome.result {
                warn!(
                    "Task {} ({}) failed: {}",
                    outcome.task.index,
                    outcome.task.label(),
                    failure
                );
            }
            report.outcomes.push(outcome);

            let progress = Progress {
                current: report.outcomes.len(),
                total,
            };
            debug!("Progress {}/{}", progress.current, progress.total);
            on_progress(progress);
        }

        info!(
            "Generated {} record(s), {} failed",
            report.succeeded(),
            report.failed()
        );
        Ok(report)
    }

    /// Runs the batch on a worker thread.
    pub fn spawn<S, K>(self, contacts: Vec<Contact>, source: S, mut sink: K) -> BatchHandle
    where
        S: DependentSource + Send + 'static,
        K: RecordSink + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel();
        let cancel = self.cancel.clone();
        let handle = thread::spawn(move || {
            self.run(&contacts, &source, &mut sink, |progress| {
                // receiver may have been dropped
                let _ = sender.send(progress);
            })
        });
        BatchHandle {
            progress: receiver,
            cancel,
            handle,
        }
    }
}

fn run_task<K: RecordSink + ?Sized>(
    builder: &Hub3DataBuilder<'_>,
    task: GenerationTask,
    sink: &mut K,
) -> TaskOutcome {
    let built = match panic::catch_unwind(AssertUnwindSafe(|| {
        builder.build(&task.payer, &task.source)
    })) {
        Ok(Ok(built)) => built,
        Ok(Err(error)) => return TaskOutcome::failed(task, error.into(), Vec::new()),
        Err(payload) => {
            let failure = TaskFailure::Panicked(panic_message(&*payload));
            return TaskOutcome::failed(task, failure, Vec::new());
        }
    };

    // warnings from the build are kept even when the sink fails
    let accepted = panic::catch_unwind(AssertUnwindSafe(|| sink.accept(&task, &built.value)));
    let result = match accepted {
        Ok(Ok(())) => Ok(built.value),
        Ok(Err(error)) => Err(TaskFailure::from(error)),
        Err(payload) => Err(TaskFailure::Panicked(panic_message(&*payload))),
    };
    TaskOutcome {
        task,
        result,
        warnings: built.warnings,
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
