use anyhow::Result;
use conductor_dashboard::app::{App, EventLoop, Frontend};
use conductor_dashboard::config::DashboardConfig;
use conductor_dashboard::control_plane::{
    ControlPlaneEvent, InMemoryControlPlane, LifecycleKind, ProcessEvent, ProcessEventKind,
    TokenMetrics, WorkflowState, WorkflowSummary,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const WORKFLOWS: usize = 24;
const PRODUCERS: usize = 8;
const EVENTS_PER_PRODUCER: usize = 200;

/// Walks the selection down the list on every frame and checks the cache
/// bound after each turn.
struct Cycler {
    renders: usize,
    max_renders: usize,
    violations: Vec<String>,
}

impl Frontend for Cycler {
    fn render(&mut self, app: &mut App) -> Result<()> {
        self.renders += 1;
        let bound = app.store.max_sessions() + app.store.protected_count();
        if app.store.len() > bound {
            self.violations
                .push(format!("{} sessions cached, bound {}", app.store.len(), bound));
        }
        if let Some(selected) = app.workflows.selected_id() {
            if !app.store.contains(selected) {
                self.violations.push(format!("selected {} not cached", selected));
            }
        }

        let change = app
            .workflows
            .move_down()
            .or_else(|| app.workflows.jump_first());
        if let Some(change) = change {
            app.apply_selection(change);
        }
        if self.renders >= self.max_renders {
            app.should_quit = true;
        }
        Ok(())
    }
}

fn seeded_plane() -> InMemoryControlPlane {
    let plane = InMemoryControlPlane::new();
    for n in 0..WORKFLOWS {
        let state = if n % 3 == 0 {
            WorkflowState::Running
        } else {
            WorkflowState::Paused
        };
        plane.add_workflow(WorkflowSummary::new(format!("wf-{}", n), format!("task {}", n), state));
    }
    plane
}

fn event_for(producer: usize, step: usize) -> ControlPlaneEvent {
    let id = format!("wf-{}", (producer * 7 + step) % (WORKFLOWS + 4));
    match step % 5 {
        0 => ControlPlaneEvent::process(
            id,
            ProcessEvent::coordinator(ProcessEventKind::Output).with_output("chunk ", true),
        ),
        1 => ControlPlaneEvent::process(
            id,
            ProcessEvent::worker(ProcessEventKind::Spawned, format!("worker-{}", producer)),
        ),
        2 => ControlPlaneEvent::process(
            id,
            ProcessEvent::coordinator(ProcessEventKind::TokenUsage).with_metrics(TokenMetrics {
                input_tokens: step as u64,
                output_tokens: 1,
                ..TokenMetrics::default()
            }),
        ),
        3 => ControlPlaneEvent::lifecycle(id, LifecycleKind::Paused),
        _ => ControlPlaneEvent::lifecycle(id, LifecycleKind::Resumed),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_producers_keep_cache_bounded() {
    let plane = seeded_plane();
    let cancel = CancellationToken::new();
    let mut event_loop = EventLoop::connect(Arc::new(plane.clone()), cancel.clone())
        .await
        .unwrap();
    let config = DashboardConfig {
        max_sessions: 5,
        ..DashboardConfig::default()
    };
    let mut app = App::new(&config, None);

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|producer| {
            let plane = plane.clone();
            tokio::spawn(async move {
                for step in 0..EVENTS_PER_PRODUCER {
                    plane.publish(event_for(producer, step));
                    if step % 16 == 0 {
                        tokio::task::yield_now().await;
                    }
                }
            })
        })
        .collect();

    let mut frontend = Cycler {
        renders: 0,
        max_renders: 600,
        violations: Vec::new(),
    };
    tokio::time::timeout(Duration::from_secs(20), event_loop.run(&mut app, &mut frontend))
        .await
        .expect("event loop stalled")
        .unwrap();

    for producer in producers {
        producer.await.unwrap();
    }
    assert!(frontend.violations.is_empty(), "{:?}", frontend.violations);
    assert!(app.store.len() <= app.store.max_sessions() + app.store.protected_count());

    event_loop.shutdown();
    tokio::time::timeout(Duration::from_secs(5), async {
        while plane.subscriber_count() > 0 || plane.watcher_count() > 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("subscription leaked after shutdown");
}

#[tokio::test]
async fn repeated_sessions_release_all_subscriptions() {
    let plane = seeded_plane();
    for round in 0..25 {
        let cancel = CancellationToken::new();
        let mut event_loop = EventLoop::connect(Arc::new(plane.clone()), cancel.clone())
            .await
            .unwrap();
        let mut app = App::new(&DashboardConfig::default(), None);
        let mut frontend = Cycler {
            renders: 0,
            max_renders: 3,
            violations: Vec::new(),
        };
        plane.publish(event_for(round, round));
        tokio::time::timeout(Duration::from_secs(5), event_loop.run(&mut app, &mut frontend))
            .await
            .expect("event loop stalled")
            .unwrap();
        drop(event_loop);
    }
    tokio::time::timeout(Duration::from_secs(5), async {
        while plane.subscriber_count() > 0 || plane.watcher_count() > 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("subscriptions leaked across sessions");
}
