use numa_bridge::prelude::*;
use tracing::Level;

fn main() {
    tracing_subscriber::fmt().with_max_level(Level::DEBUG).init();

    let numa = numa_bridge::get();
    let topology = numa.topology();
    topology.log();
    println!("{}", topology.summary());

    if let Some(cpu) = numa.current_cpu() {
        println!(
            "running on cpu {} (node {:?})",
            cpu,
            topology.node_of_cpu(cpu)
        );
    }

    numa.apply_policy(AllocationPolicy::LocalAlloc)
        .expect("Couldn't apply the policy.");
    let mut buffer = numa
        .alloc_interleaved(1 << 20)
        .expect("Couldn't allocate.");
    buffer.as_mut_slice().iter_mut().for_each(|b| *b = 0xAB);
    println!("allocated {} interleaved bytes", buffer.capacity());
    numa.free(buffer);
}
