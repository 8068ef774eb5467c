//! `sterling` CLI — runs the reactive executor against an in-memory demo
//! task so the autonomy control plane is exercisable end to end without a
//! real voxel-world client or planning service attached (SPEC_FULL.md §6),
//! the same role `agenticlaw-kg`'s `main.rs` plays for the KG executor.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::Parser;
use serde_json::Value;
use sterling_core::{Clock, EnvConfig, SystemClock, TaskId};
use sterling_executor::{Executor, PostconditionRegistry};
use sterling_leaves::{Leaf, LeafContext, LeafMetrics, LeafRegistry, LeafResult, Permission, Provenance};
use sterling_registry::EnhancedRegistry;
use sterling_sim::{SimLeafContext, StubExpansionClient, StubReasoner};
use sterling_tasks::{Step, StepMeta, Task};

#[derive(Parser)]
#[command(name = "sterling", version = env!("CARGO_PKG_VERSION"), about = "Autonomy control plane — reactive executor demo loop")]
struct Cli {
    /// Number of executor ticks to run.
    #[arg(short, long, default_value_t = 8)]
    ticks: u32,

    /// Milliseconds to sleep between ticks.
    #[arg(long, default_value_t = 50)]
    tick_delay_ms: u64,

    /// Leaf the seeded demo task dispatches.
    #[arg(long, default_value = "walk_forward")]
    leaf: String,
}

/// A trivial movement leaf for the demo loop: holds `Control::Forward` for
/// one tick and always succeeds. Real movement leaves live outside this
/// crate family, against a real actuator.
struct WalkForwardLeaf;

#[async_trait]
impl Leaf for WalkForwardLeaf {
    fn name(&self) -> &str {
        "walk_forward"
    }
    fn version(&self) -> &str {
        "1.0.0"
    }
    fn description(&self) -> &str {
        "holds the forward control for one tick"
    }
    fn input_schema(&self) -> Value {
        serde_json::json!({"type": "object"})
    }
    fn permissions(&self) -> &[Permission] {
        &[Permission::Movement]
    }
    async fn run(&self, ctx: &dyn LeafContext, args: Value) -> LeafResult {
        let start = ctx.now_ms();
        if ctx
            .set_control(sterling_leaves::world::Control::Forward, true)
            .await
            .is_err()
        {
            return LeafResult::failure(
                sterling_leaves::LeafError::new(sterling_core::LeafErrorCode::MovementTimeout, None),
                LeafMetrics::default(),
            );
        }
        LeafResult::success(
            args,
            LeafMetrics {
                duration_ms: (ctx.now_ms() - start).max(0) as u64,
                retries: 0,
                timeouts: 0,
            },
        )
    }
}

fn seed_task(leaf_name: &str, now_ms: i64) -> Task {
    let mut task = Task::new(TaskId::new("demo-walk"), "walk to the waypoint", now_ms);
    task.priority = 1;
    task.steps = vec![Step {
        order: 0,
        done: false,
        meta: StepMeta {
            leaf: leaf_name.to_string(),
            args: serde_json::json!({}),
            executable: true,
        },
    }];
    task
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "sterling=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = EnvConfig::from_env();
    tracing::info!(
        intent_resolve_enabled = config.intent_resolve_enabled,
        planning_service_url = ?config.planning_service_url,
        "sterling: loaded environment configuration"
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let ctx = SimLeafContext::new(clock.clone());

    let mut leaves = LeafRegistry::new();
    leaves.register_leaf(
        Arc::new(WalkForwardLeaf),
        Some(Provenance::new("sterling-cli", "builtin", clock.now_ms())),
    )?;

    let mut options = EnhancedRegistry::new();
    options.register_leaf(Arc::new(WalkForwardLeaf), None)?;

    let postconditions = PostconditionRegistry::new();
    let reasoner = StubReasoner::always_proposes_wait_leaf();
    let expansion = StubExpansionClient::always_expands_to(cli.leaf.clone());

    let mut tasks = vec![seed_task(&cli.leaf, clock.now_ms())];
    let mut executor = Executor::new();

    for tick in 0..cli.ticks {
        let now_ms = clock.now_ms();
        let outcome = executor
            .tick(&mut tasks, &leaves, &postconditions, &expansion, &reasoner, &mut options, &ctx, now_ms)
            .await;

        println!(
            "tick {tick}: decision={} task_status={:?} progress={:.2}",
            outcome.decision, tasks[0].status, tasks[0].progress
        );

        if matches!(tasks[0].status, sterling_tasks::TaskStatus::Completed | sterling_tasks::TaskStatus::Failed) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(cli.tick_delay_ms)).await;
    }

    println!("\n=== Run Complete ===");
    println!("Task: {}", tasks[0].title);
    println!("Final status: {:?}", tasks[0].status);
    println!("Progress: {:.2}", tasks[0].progress);

    Ok(())
}
