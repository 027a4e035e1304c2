//! Pre-defined simulation scenarios for Arbor

use std::time::Duration;

use arbor_core::{Address, HardwareAddr};
use arbor_crypto::NetworkKey;
use arbor_node::{MemberPlan, MeshPlan, NodeError, NodeResult};
use arbor_storage::DEFAULT_FLUSH_INTERVAL;
use rand::Rng;
use tracing::info;

use crate::mesh::{SimMesh, SimStats};

/// How long to wait for a message to arrive
pub const DELIVERY_TIMEOUT: Duration = Duration::from_secs(1);

const ROOT: HardwareAddr = HardwareAddr::new([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);
const MIDDLE: HardwareAddr = HardwareAddr::new([0x02, 0x00, 0x00, 0x00, 0x00, 0x02]);
const LEAF: HardwareAddr = HardwareAddr::new([0x02, 0x00, 0x00, 0x00, 0x00, 0x03]);

/// The three-node chain `[]` - `[1]` - `[1,1]`
pub fn chain_plan() -> NodeResult<MeshPlan> {
    Ok(MeshPlan {
        net_id: 111,
        key: NetworkKey::generate(),
        flush_interval_secs: DEFAULT_FLUSH_INTERVAL.as_secs(),
        sender: Some(ROOT),
        members: vec![
            MemberPlan {
                mac: ROOT,
                address: Address::root(),
                neighbors: vec![MIDDLE],
            },
            MemberPlan {
                mac: MIDDLE,
                address: Address::new(&[1])?,
                neighbors: vec![ROOT, LEAF],
            },
            MemberPlan {
                mac: LEAF,
                address: Address::new(&[1, 1])?,
                neighbors: vec![MIDDLE],
            },
        ],
    })
}

/// Run the chain scenario:
///
/// ```text
/// [] sends to [1,1]          relayed once by [1]
/// [1,1] replies to []        relayed once by [1]
/// [] sends to [1,2]          no such node; absorbed by its parent [1]
/// ```
pub async fn run_chain_scenario() -> NodeResult<SimStats> {
    info!("=== Running Chain Scenario ===");

    let plan = chain_plan()?;
    let mut mesh = SimMesh::start(&plan).await?;

    let steps: [(&str, HardwareAddr, Address, &[u8]); 3] = [
        ("[] sends to [1,1]", ROOT, Address::new(&[1, 1])?, b"down"),
        ("[1,1] replies to []", LEAF, Address::root(), b"up"),
        ("[] sends to [1,2]", ROOT, Address::new(&[1, 2])?, b"absorbed"),
    ];

    for (i, (title, from, dest, payload)) in steps.into_iter().enumerate() {
        println!("\n--- Step {}: {} ---", i + 1, title);
        match mesh
            .send_and_wait(&from, dest, payload.to_vec(), DELIVERY_TIMEOUT)
            .await?
        {
            Some(delivered) => println!(
                "  delivered at {} from {}: {:?}",
                delivered.at,
                delivered.message.source,
                String::from_utf8_lossy(&delivered.message.payload)
            ),
            None => println!("  not delivered"),
        }
    }

    let stats = mesh.shutdown().await?;
    print_stats(&stats);
    Ok(stats)
}

/// Run a plan: the sender sends one random byte to a random member per round
///
/// The sender is the plan's `sender`, or its first member.
pub async fn run_plan_scenario(
    plan: &MeshPlan,
    rounds: u32,
    interval: Duration,
) -> NodeResult<SimStats> {
    info!(rounds, "=== Running Plan Scenario ===");

    let sender = plan
        .sender
        .or_else(|| plan.members.first().map(|m| m.mac))
        .ok_or_else(|| NodeError::Config("plan has no members".to_string()))?;

    let mut mesh = SimMesh::start(plan).await?;
    let destinations = mesh.destinations_from(&sender);
    if destinations.is_empty() {
        return Err(NodeError::Config("plan has no destinations".to_string()));
    }

    for round in 1..=rounds {
        let (dest, byte) = {
            let mut rng = rand::rng();
            let dest = destinations[rng.random_range(0..destinations.len())];
            (dest, rng.random::<u8>())
        };

        let outcome = mesh
            .send_and_wait(&sender, dest, vec![byte], DELIVERY_TIMEOUT)
            .await?;
        match outcome {
            Some(delivered) => println!(
                "round {:>3}: {:#04x} -> {} delivered at {}",
                round, byte, dest, delivered.at
            ),
            None => println!("round {:>3}: {:#04x} -> {} not delivered", round, byte, dest),
        }

        if !interval.is_zero() {
            tokio::time::sleep(interval).await;
        }
    }

    let stats = mesh.shutdown().await?;
    print_stats(&stats);
    Ok(stats)
}

fn print_stats(stats: &SimStats) {
    println!("\n=== Final Statistics ===");
    println!("  Submitted: {}", stats.submitted);
    println!("  Delivered: {}", stats.delivered);
    println!("  Unroutable: {}", stats.unroutable);
    println!("  Failed at source: {}", stats.failed);
    println!("  Lost: {}", stats.lost);
}
