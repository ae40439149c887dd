//! Batch Coordinator: one size search per target element, one completion
//! event per batch.
//!
//! Sessions report their outcome over an mpsc channel after publishing their
//! own `ResizeFinished`. The coordinator task counts reports and publishes
//! `AllFinished` when the count reaches the number of targets, so subscribers
//! always see all N per-element events before the batch event.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};
use uuid::Uuid;

use crate::dom::lock_document;
use crate::events::FitEvent;
use crate::fitter::search::{FitOutcome, SizeSearch};
use crate::fitter::{FitError, FitOptions, Target, TextFitter};

/// Summary of a finished batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub count: usize,
    /// In completion order.
    pub outcomes: Vec<FitOutcome>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Awaitable completion of a batch started by `TextFitter::fit`.
#[derive(Debug)]
pub struct FitHandle {
    batch_id: Uuid,
    count: usize,
    done: oneshot::Receiver<BatchReport>,
}

impl FitHandle {
    pub fn batch_id(&self) -> Uuid {
        self.batch_id
    }

    /// Number of elements in the batch.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Resolves once every element has finished.
    pub async fn wait(self) -> Result<BatchReport, FitError> {
        self.done
            .await
            .map_err(|_| FitError::Interrupted(self.batch_id))
    }
}

pub(crate) fn start_batch(
    fitter: &TextFitter,
    target: Target,
    options: FitOptions,
) -> Result<FitHandle, FitError> {
    options.validate()?;
    let elements = {
        let doc = lock_document(&fitter.document);
        target.resolve(&doc)?
    };

    let batch_id = Uuid::new_v4();
    let count = elements.len();
    let started_at = Utc::now();
    let (done_tx, done_rx) = oneshot::channel();
    let handle = FitHandle {
        batch_id,
        count,
        done: done_rx,
    };

    info!(%batch_id, count, ?target, "starting text fit batch");

    // Nothing to wait for: complete right away instead of never.
    if count == 0 {
        fitter
            .events
            .publish(FitEvent::AllFinished { batch_id, count });
        let _ = done_tx.send(BatchReport {
            batch_id,
            count,
            outcomes: Vec::new(),
            started_at,
            finished_at: Utc::now(),
        });
        return Ok(handle);
    }

    let (report_tx, mut report_rx) = mpsc::unbounded_channel::<FitOutcome>();
    for element in elements {
        let search = SizeSearch::new(
            fitter.document.clone(),
            fitter.measurer.clone(),
            element,
            options.clone(),
            fitter.config.tick_interval,
        );
        let events = fitter.events.clone();
        let report_tx = report_tx.clone();
        tokio::spawn(async move {
            let outcome = search.run(&events, batch_id).await;
            let _ = report_tx.send(outcome);
        });
    }
    drop(report_tx);

    let events = fitter.events.clone();
    tokio::spawn(async move {
        let mut outcomes = Vec::with_capacity(count);
        while let Some(outcome) = report_rx.recv().await {
            outcomes.push(outcome);
            if outcomes.len() >= count {
                break;
            }
        }
        if outcomes.len() < count {
            warn!(%batch_id, finished = outcomes.len(), count, "fit batch lost sessions");
            return;
        }

        events.publish(FitEvent::AllFinished { batch_id, count });
        let report = BatchReport {
            batch_id,
            count,
            outcomes,
            started_at,
            finished_at: Utc::now(),
        };
        info!(
            %batch_id,
            count,
            elapsed_ms = (report.finished_at - report.started_at).num_milliseconds(),
            "text fit batch finished"
        );
        let _ = done_tx.send(report);
    });

    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{share, Display, Document, Node, NodeId, Style};
    use crate::fitter::test_support::boxed_text;
    use crate::fitter::{Direction, FitterConfig};
    use tokio::sync::broadcast::error::TryRecvError;

    /// Three sized boxes, each holding one `p.fit`.
    fn three_boxes() -> (TextFitter, Vec<NodeId>) {
        let mut doc = Document::new();
        let root = doc.root();
        let mut targets = Vec::new();
        for (width, text) in [(200.0, "Headline"), (120.0, "Hi"), (300.0, "Fit this text")] {
            let container = doc.append(
                root,
                Node::new("div").with_style(Style {
                    width: Some(width),
                    height: Some(100.0),
                    ..Style::default()
                }),
            );
            targets.push(doc.append(container, Node::new("p").with_class("fit").with_text(text)));
        }
        (TextFitter::new(share(doc), FitterConfig::default()), targets)
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_finished_fires_once_after_every_element() {
        let (fitter, targets) = three_boxes();
        let mut rx = fitter.subscribe();
        let handle = fitter.fit(".fit", FitOptions::default()).unwrap();
        assert_eq!(handle.len(), 3);
        let batch_id = handle.batch_id();

        let mut finished = Vec::new();
        loop {
            let event = rx.recv().await.unwrap();
            assert_eq!(event.batch_id(), batch_id);
            match event {
                FitEvent::ResizeFinished { element, .. } => finished.push(element),
                FitEvent::AllFinished { batch_id: id, count } => {
                    assert_eq!(id, batch_id);
                    assert_eq!(count, 3);
                    break;
                }
            }
        }
        finished.sort();
        assert_eq!(finished, targets, "all N finished before the batch event");

        let report = handle.wait().await.unwrap();
        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(rx.try_recv().unwrap_err(), TryRecvError::Empty);
    }

    #[tokio::test(start_paused = true)]
    async fn test_final_sizes_within_bounds() {
        let (fitter, _) = three_boxes();
        let options = FitOptions::default().with_bounds(12.0, 40.0);
        let report = fitter.fit(".fit", options).unwrap().wait().await.unwrap();
        let doc = lock_document(fitter.document());
        for outcome in &report.outcomes {
            assert!((12.0..=40.0).contains(&outcome.final_font_size));
            assert_eq!(doc.computed_font_size(outcome.element), outcome.final_font_size);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_target_completes_immediately() {
        let (fitter, _) = three_boxes();
        let mut rx = fitter.subscribe();
        let handle = fitter.fit(".missing", FitOptions::default()).unwrap();
        assert!(handle.is_empty());
        let batch_id = handle.batch_id();

        assert_eq!(
            rx.try_recv().unwrap(),
            FitEvent::AllFinished { batch_id, count: 0 }
        );
        assert_eq!(rx.try_recv().unwrap_err(), TryRecvError::Empty);
        let report = handle.wait().await.unwrap();
        assert!(report.outcomes.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_class_appears_only_after_finish() {
        let (document, _, p) = boxed_text(200.0, 100.0, "Headline");
        let fitter = TextFitter::new(document, FitterConfig::default());
        let mut rx = fitter.subscribe();
        let handle = fitter
            .fit(p, FitOptions::default().with_ready_class("ready"))
            .unwrap();

        // The session has not run yet: fit only spawns it.
        assert!(!lock_document(fitter.document()).node(p).has_class("ready"));

        loop {
            match rx.recv().await.unwrap() {
                FitEvent::ResizeFinished { element, .. } => {
                    assert_eq!(element, p);
                    break;
                }
                FitEvent::AllFinished { .. } => panic!("batch finished before the element"),
            }
        }
        assert!(lock_document(fitter.document()).node(p).has_class("ready"));
        handle.wait().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_refit_is_idempotent() {
        let (document, _, p) = boxed_text(200.0, 100.0, "Headline");
        let fitter = TextFitter::new(document, FitterConfig::default());
        let options = FitOptions::default().with_bounds(10.0, 60.0);

        let first = fitter.fit(p, options.clone()).unwrap().wait().await.unwrap();
        let second = fitter.fit(p, options).unwrap().wait().await.unwrap();

        let a = first.outcomes[0].final_font_size;
        let b = second.outcomes[0].final_font_size;
        assert!((a - b).abs() <= 1.0, "{a} vs {b}");
        assert_eq!(second.outcomes[0].direction, Direction::Grow);
        assert_eq!(second.outcomes[0].ticks, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restores_styles_for_every_element() {
        let (fitter, targets) = three_boxes();
        {
            let mut doc = lock_document(fitter.document());
            for id in &targets {
                let style = &mut doc.node_mut(*id).style;
                style.display = Display::InlineBlock;
                style.max_width = Some(90.0);
            }
        }
        fitter
            .fit(targets.clone(), FitOptions::default())
            .unwrap()
            .wait()
            .await
            .unwrap();

        let doc = lock_document(fitter.document());
        for id in targets {
            assert_eq!(doc.node(id).style.display, Display::InlineBlock);
            assert_eq!(doc.node(id).style.max_width, Some(90.0));
            assert_eq!(doc.node(id).style.max_height, None);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_bad_input_fails_before_touching_the_document() {
        let (fitter, targets) = three_boxes();
        let mut rx = fitter.subscribe();

        assert!(matches!(
            fitter.fit("p >", FitOptions::default()),
            Err(FitError::Selector { .. })
        ));
        assert!(matches!(
            fitter.fit(".fit", FitOptions::default().with_velocity(0.0)),
            Err(FitError::InvalidOptions(_))
        ));
        assert!(matches!(
            fitter.fit(NodeId(999), FitOptions::default()),
            Err(FitError::UnknownElement(_))
        ));

        assert_eq!(rx.try_recv().unwrap_err(), TryRecvError::Empty);
        let doc = lock_document(fitter.document());
        assert!(targets.iter().all(|id| doc.node(*id).style.font_size.is_none()));
    }
}
