//! Size Search: steps one element's font size until the overflow verdict
//! flips, then finalizes.
//!
//! # States
//! - `Searching`: one tick per `tick_interval`. Each tick applies the step,
//!   re-measures, and either stops (verdict flipped / bound reached) or
//!   schedules the next tick.
//! - `Finalizing` (terminal): writes the clamped final size, adds the ready
//!   class, restores the measurement-mode styles and publishes
//!   `ResizeFinished`.
//!
//! A search that has not finished after `MAX_TICKS` ticks finalizes as a
//! failsafe.
//!
//! The document lock is taken once per step and released before sleeping, so
//! sessions for other elements interleave freely between ticks.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::dom::{lock_document, Document, NodeId, SharedDocument};
use crate::events::{EventBus, FitEvent};
use crate::fitter::bounds;
use crate::fitter::measurement_mode::MeasurementMode;
use crate::fitter::{FitOptions, MAX_TICKS};
use crate::layout::Measurer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Grow,
    Shrink,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FinishReason {
    /// The overflow verdict flipped: the exact-fit threshold was just crossed.
    Threshold,
    /// The font size reached a clamp bound before the verdict flipped.
    Failsafe,
}

/// Result of one element's search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitOutcome {
    pub element: NodeId,
    pub direction: Direction,
    pub initial_font_size: f64,
    pub final_font_size: f64,
    pub ticks: u32,
    pub reason: FinishReason,
}

enum Tick {
    Continue,
    Finish(FinishReason),
}

/// One fitting session. Owns its element for the duration of the search.
pub struct SizeSearch {
    document: SharedDocument,
    measurer: Arc<dyn Measurer>,
    element: NodeId,
    options: FitOptions,
    tick_interval: Duration,
}

impl SizeSearch {
    pub fn new(
        document: SharedDocument,
        measurer: Arc<dyn Measurer>,
        element: NodeId,
        options: FitOptions,
        tick_interval: Duration,
    ) -> Self {
        SizeSearch {
            document,
            measurer,
            element,
            options,
            tick_interval,
        }
    }

    /// Runs the search to completion and publishes `ResizeFinished` on `events`.
    pub async fn run(self, events: &EventBus, batch_id: Uuid) -> FitOutcome {
        let (mut mode, initial_font_size, step) = {
            let mut doc = lock_document(&self.document);
            self.begin(&mut doc)
        };
        let direction = if step > 0.0 {
            Direction::Grow
        } else {
            Direction::Shrink
        };
        debug!(element = %self.element, ?direction, initial_font_size, "starting size search");

        // The first tick runs right away; later ones wait for the interval.
        let mut ticks = 0u32;
        let reason = loop {
            ticks += 1;
            let tick = {
                let mut doc = lock_document(&self.document);
                self.tick(&mut doc, step)
            };
            match tick {
                Tick::Continue if ticks >= MAX_TICKS => break FinishReason::Failsafe,
                Tick::Continue => tokio::time::sleep(self.tick_interval).await,
                Tick::Finish(reason) => break reason,
            }
        };

        let final_font_size = {
            let mut doc = lock_document(&self.document);
            self.finalize(&mut doc, &mut mode, step)
        };

        if reason == FinishReason::Failsafe {
            warn!(
                element = %self.element,
                final_font_size,
                ticks,
                "font size clamped before reaching an exact fit"
            );
        } else {
            debug!(element = %self.element, final_font_size, ticks, "size search finished");
        }

        events.publish(FitEvent::ResizeFinished {
            batch_id,
            element: self.element,
            font_size: final_font_size,
        });

        FitOutcome {
            element: self.element,
            direction,
            initial_font_size,
            final_font_size,
            ticks,
            reason,
        }
    }

    /// Entry action: pin the computed font size, enter measurement mode, and
    /// pick the direction from one bounds check at the unmodified size.
    fn begin(&self, doc: &mut Document) -> (MeasurementMode, f64, f64) {
        let font_size = doc.computed_font_size(self.element);
        doc.node_mut(self.element).style.font_size = Some(font_size);
        let mode = MeasurementMode::enter(&self.document, doc, self.element);

        let step = if bounds::exceeds(doc, self.measurer.as_ref(), self.element) {
            -self.options.velocity
        } else {
            self.options.velocity
        };
        (mode, font_size, step)
    }

    fn tick(&self, doc: &mut Document, step: f64) -> Tick {
        let font_size = doc.computed_font_size(self.element) + step;
        doc.node_mut(self.element).style.font_size = Some(font_size);

        let overflowing = bounds::exceeds(doc, self.measurer.as_ref(), self.element);
        trace!(element = %self.element, font_size, overflowing, "size search tick");

        // Growing stops on the first overflow, shrinking on the first fit.
        if overflowing == (step > 0.0) {
            Tick::Finish(FinishReason::Threshold)
        } else if font_size > self.options.min_fontsize && font_size < self.options.max_fontsize {
            Tick::Continue
        } else {
            Tick::Finish(FinishReason::Failsafe)
        }
    }

    /// Terminal action. The step is always applied in the shrink sense,
    /// whichever way the search was moving; then max is clamped before min,
    /// so inverted bounds resolve to `min_fontsize`.
    fn finalize(&self, doc: &mut Document, mode: &mut MeasurementMode, step: f64) -> f64 {
        let step = if step < 0.0 { step } else { -step };
        let mut font_size = doc.computed_font_size(self.element) + step;
        if font_size > self.options.max_fontsize {
            font_size = self.options.max_fontsize;
        }
        if font_size < self.options.min_fontsize {
            font_size = self.options.min_fontsize;
        }

        let node = doc.node_mut(self.element);
        node.style.font_size = Some(font_size);
        if let Some(class) = &self.options.on_ready_class {
            node.add_class(class.clone());
        }
        mode.restore(doc);
        font_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Display, Node, Style};
    use crate::fitter::test_support::boxed_text;
    use crate::fitter::DEFAULT_TICK_INTERVAL;
    use crate::layout::MetricsMeasurer;

    fn make_search(document: &SharedDocument, element: NodeId, options: FitOptions) -> SizeSearch {
        SizeSearch::new(
            document.clone(),
            Arc::new(MetricsMeasurer),
            element,
            options,
            DEFAULT_TICK_INTERVAL,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_grows_until_overflow_then_steps_back() {
        // "Headline" is 3.91em wide: 51px fits in 200px, 52px does not.
        let (document, _, p) = boxed_text(200.0, 100.0, "Headline");
        let options = FitOptions::default().with_bounds(10.0, 60.0);
        let outcome = make_search(&document, p, options)
            .run(&EventBus::default(), Uuid::new_v4())
            .await;

        assert_eq!(outcome.direction, Direction::Grow);
        assert_eq!(outcome.reason, FinishReason::Threshold);
        assert_eq!(outcome.initial_font_size, 16.0);
        assert_eq!(outcome.ticks, 36, "one tick per px from 17 to 52");
        assert_eq!(outcome.final_font_size, 51.0);
        assert_eq!(lock_document(&document).computed_font_size(p), 51.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scenario_grow_hits_max_failsafe() {
        // At 30px the word is still far narrower than 200px: the max bound stops it.
        let (document, _, p) = boxed_text(200.0, 100.0, "Headline");
        let options = FitOptions::default().with_bounds(10.0, 30.0);
        let outcome = make_search(&document, p, options)
            .run(&EventBus::default(), Uuid::new_v4())
            .await;

        assert_eq!(outcome.direction, Direction::Grow);
        assert_eq!(outcome.reason, FinishReason::Failsafe);
        assert_eq!(outcome.ticks, 14);
        // Finalize always steps in the shrink sense: 30 - 1.
        assert_eq!(outcome.final_font_size, 29.0);
        assert!((10.0..=30.0).contains(&outcome.final_font_size));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shrinks_when_overflowing() {
        let text = "The quick brown fox jumps over the lazy dog ".repeat(10);
        let (document, _, p) = boxed_text(200.0, 100.0, &text);
        let outcome = make_search(&document, p, FitOptions::default())
            .run(&EventBus::default(), Uuid::new_v4())
            .await;

        assert_eq!(outcome.direction, Direction::Shrink);
        assert_eq!(outcome.reason, FinishReason::Failsafe);
        assert_eq!(outcome.final_font_size, 10.0, "clamped at the minimum");
    }

    #[tokio::test(start_paused = true)]
    async fn test_shrink_stops_at_first_fit() {
        // 60px overflows 200px; shrinking stops at 51px and finalize steps to 50.
        let (document, _, p) = boxed_text(200.0, 100.0, "Headline");
        lock_document(&document).node_mut(p).style.font_size = Some(60.0);
        let options = FitOptions::default().with_bounds(10.0, 80.0);
        let outcome = make_search(&document, p, options)
            .run(&EventBus::default(), Uuid::new_v4())
            .await;

        assert_eq!(outcome.direction, Direction::Shrink);
        assert_eq!(outcome.reason, FinishReason::Threshold);
        assert_eq!(outcome.ticks, 9);
        assert_eq!(outcome.final_font_size, 50.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_inverted_bounds_collapse_to_min() {
        let (document, _, p) = boxed_text(200.0, 100.0, "Headline");
        let options = FitOptions::default().with_bounds(20.0, 12.0);
        let outcome = make_search(&document, p, options)
            .run(&EventBus::default(), Uuid::new_v4())
            .await;
        assert_eq!(outcome.reason, FinishReason::Failsafe);
        assert_eq!(outcome.ticks, 1);
        assert_eq!(outcome.final_font_size, 20.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_styles_restored_after_search() {
        let (document, container, p) = boxed_text(200.0, 100.0, "Fit");
        {
            let mut doc = lock_document(&document);
            let style = &mut doc.node_mut(p).style;
            style.display = Display::InlineBlock;
            style.max_width = Some(150.0);
            style.max_height = Some(80.0);
            doc.append(
                p,
                Node::new("span").with_text("me").with_style(Style {
                    display: Display::Inline,
                    ..Style::default()
                }),
            );
        }
        let outcome = make_search(&document, p, FitOptions::default())
            .run(&EventBus::default(), Uuid::new_v4())
            .await;

        let doc = lock_document(&document);
        let style = &doc.node(p).style;
        assert_eq!(style.display, Display::InlineBlock);
        assert_eq!(style.max_width, Some(150.0));
        assert_eq!(style.max_height, Some(80.0));
        let span = doc.children(p)[0];
        assert_eq!(doc.node(span).style.display, Display::Inline);
        assert_eq!(style.font_size, Some(outcome.final_font_size));
        assert_eq!(doc.node(container).style.width, Some(200.0), "parent untouched");
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_are_spaced_by_the_interval() {
        let (document, _, p) = boxed_text(200.0, 100.0, "Headline");
        let options = FitOptions::default().with_bounds(10.0, 30.0);
        let start = tokio::time::Instant::now();
        let outcome = make_search(&document, p, options)
            .run(&EventBus::default(), Uuid::new_v4())
            .await;
        // The first tick is immediate; each later one waits 50ms.
        let expected = DEFAULT_TICK_INTERVAL * (outcome.ticks - 1);
        let elapsed = start.elapsed();
        assert!(elapsed >= expected, "{elapsed:?} < {expected:?}");
        assert!(elapsed < expected + DEFAULT_TICK_INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_class_and_event_after_finalize() {
        let (document, _, p) = boxed_text(200.0, 100.0, "Headline");
        let events = EventBus::default();
        let mut rx = events.subscribe();
        let options = FitOptions::default().with_ready_class("ready");
        let batch_id = Uuid::new_v4();

        let outcome = make_search(&document, p, options).run(&events, batch_id).await;

        assert!(lock_document(&document).node(p).has_class("ready"));
        assert_eq!(
            rx.recv().await.unwrap(),
            FitEvent::ResizeFinished {
                batch_id,
                element: p,
                font_size: outcome.final_font_size,
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_tiny_velocity_stops_at_the_tick_cap() {
        let (document, _, p) = boxed_text(200.0, 100.0, "Headline");
        let options = FitOptions::default().with_bounds(10.0, 60.0).with_velocity(1e-6);
        let bus = EventBus::default();
        let run = make_search(&document, p, options).run(&bus, Uuid::new_v4());
        let outcome = tokio::time::timeout(Duration::from_secs(24 * 60 * 60), run)
            .await
            .expect("search must finish");

        assert_eq!(outcome.reason, FinishReason::Failsafe);
        assert_eq!(outcome.ticks, MAX_TICKS);
        assert!((10.0..=60.0).contains(&outcome.final_font_size));
        assert_eq!(lock_document(&document).node(p).style.display, Display::Block);
    }

    #[tokio::test(start_paused = true)]
    async fn test_step_below_float_resolution_stops_at_the_tick_cap() {
        // 16 + 1e-16 == 16: the size never moves.
        let (document, _, p) = boxed_text(200.0, 100.0, "Headline");
        let options = FitOptions::default().with_bounds(10.0, 60.0).with_velocity(1e-16);
        let bus = EventBus::default();
        let run = make_search(&document, p, options).run(&bus, Uuid::new_v4());
        let outcome = tokio::time::timeout(Duration::from_secs(24 * 60 * 60), run)
            .await
            .expect("search must finish");

        assert_eq!(outcome.reason, FinishReason::Failsafe);
        assert_eq!(outcome.ticks, MAX_TICKS);
        assert_eq!(outcome.final_font_size, 16.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fractional_velocity_matches_plain_addition() {
        // "Hi" fits at every size up to 17px, so only the bounds stop the search.
        let (document, _, p) = boxed_text(200.0, 100.0, "Hi");
        let options = FitOptions::default().with_bounds(10.0, 17.0).with_velocity(0.1);
        let outcome = make_search(&document, p, options)
            .run(&EventBus::default(), Uuid::new_v4())
            .await;

        let mut size = 16.0_f64;
        let mut ticks = 0;
        loop {
            size += 0.1;
            ticks += 1;
            if !(size > 10.0 && size < 17.0) {
                break;
            }
        }
        assert_eq!(outcome.reason, FinishReason::Failsafe);
        assert_eq!(outcome.ticks, ticks);
        assert_eq!(outcome.final_font_size, (size - 0.1).clamp(10.0, 17.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fractional_velocity() {
        let (document, _, p) = boxed_text(200.0, 100.0, "Headline");
        let options = FitOptions::default().with_bounds(10.0, 60.0).with_velocity(0.5);
        let outcome = make_search(&document, p, options)
            .run(&EventBus::default(), Uuid::new_v4())
            .await;
        assert_eq!(outcome.reason, FinishReason::Threshold);
        // Crosses 200px between 51.0 and 51.5 (201.4px); steps back half a pixel.
        assert_eq!(outcome.final_font_size, 51.0);
    }
}
