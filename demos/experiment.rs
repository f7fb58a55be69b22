//! # Example: experiment
//!
//! Drives a small Stroop-style study from start to finish, then reruns it.
//!
//! Shows how to:
//! - Describe a tree of leaves, a templated loop and a skipped leaf.
//! - Attach handlers that end their own component (a simulated participant).
//! - Observe the tree through the built-in [`LogWriter`] subscriber.
//! - Restart the study with [`Jump::Rerun`].
//!
//! ## Flow
//! ```text
//! study (sequence)
//!     ├─► consent       (skip: ends with `skipped`, never shown)
//!     ├─► instructions  (ended by the driver with `response`)
//!     ├─► block (loop, Times(2))
//!     │     └─► trial-{i} from template rows ──► Show handler ends with `response`
//!     └─► debrief       (ended by the driver)
//!
//! Controller ──► Bus.publish(Event) ──► subscriber_listener ──► LogWriter.on_event()
//! ```
//!
//! ## Run
//! Requires the `logging` feature to export [`LogWriter`].
//! ```bash
//! RUST_LOG=debug cargo run --example experiment --features logging
//! ```

use std::{sync::Arc, time::Duration};

use studyflow::{
    ChildSource, Component, ComponentOptions, Controller, Emission, EndReason, HandlerFn, Jump,
    LifecycleEvent, LogWriter, Parameters, Repetitions, Subscribe,
};
use tracing_subscriber::EnvFilter;

fn stroop_rows() -> Vec<Parameters> {
    [("red", "red"), ("green", "blue"), ("blue", "blue")]
        .into_iter()
        .map(|(word, color)| {
            ComponentOptions::new()
                .parameter("word", word)
                .parameter("color", color)
                .parameter("congruent", word == color)
                .parameters
        })
        .collect()
}

fn trial(_row: &Parameters, index: usize) -> Component {
    Component::leaf(ComponentOptions::new().id(format!("trial-{index}"))).on(
        LifecycleEvent::Show,
        HandlerFn::arc(|e: Emission| async move {
            println!("[participant] answered {}", e.label());
            e.handle().end(EndReason::Response).await?;
            anyhow::Ok(())
        }),
    )
}

fn study() -> Component {
    Component::sequence(
        ComponentOptions::new().id("study").title("Stroop demo"),
        vec![
            Component::leaf(ComponentOptions::new().id("consent").skip(true)),
            Component::leaf(ComponentOptions::new().id("instructions")),
            Component::looped(
                ComponentOptions::new().id("block"),
                Repetitions::Times(2),
                ChildSource::template(stroop_rows(), trial),
            ),
            Component::leaf(ComponentOptions::new().id("debrief")),
        ],
    )
}

/// Ends whatever leaf is on screen, as a participant clicking "continue" would.
async fn click_through(controller: &Controller) -> anyhow::Result<()> {
    let Some(leaf) = controller.current_leaf() else {
        anyhow::bail!("nothing is on screen");
    };
    println!("[driver] ending {}", controller.snapshot(leaf)?.label);
    controller.end(leaf, EndReason::Response).await?;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let controller = Controller::builder(study()).with_subscribers(subs).build();

    controller.run().await?;
    click_through(&controller).await?; // instructions; the loop runs by itself
    click_through(&controller).await?; // debrief

    let root = controller.snapshot(controller.root())?;
    println!(
        "[driver] study {} ({}) after {:?}",
        root.status,
        root.end_reason.map(|r| r.to_string()).unwrap_or_default(),
        root.timestamps.duration().unwrap_or_default(),
    );

    controller.jump(Jump::Rerun, controller.root()).await?;
    println!(
        "[driver] rerun: {} is on screen",
        controller
            .current_leaf()
            .map(|id| controller.snapshot(id).map(|s| s.label.to_string()))
            .transpose()?
            .unwrap_or_default()
    );

    // Give the subscriber listener time to drain.
    tokio::time::sleep(Duration::from_millis(100)).await;
    Ok(())
}
