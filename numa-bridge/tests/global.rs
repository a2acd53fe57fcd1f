use numa_bridge::prelude::*;
use std::thread;

#[test]
fn init_and_get_share_the_instance() {
    let numa = Numa::init();
    assert!(std::ptr::eq(numa, numa_bridge::get()));
    assert!(std::ptr::eq(numa, Numa::init_with(Config::new().disable_numa())));
    assert_eq!(numa.is_available(), numa.kind() == BackendKind::Native);
    assert!(numa.num_nodes() >= 1);
}

#[test]
fn affinity_round_trip() {
    thread::spawn(|| {
        let numa = numa_bridge::get();
        let allowed = numa.get_affinity();
        let cpu = allowed.iter().next().unwrap_or(0);

        numa.set_affinity(cpu).unwrap();
        let pinned = numa.get_affinity();
        match numa.kind() {
            BackendKind::Native => {
                assert_eq!(pinned, numa.new_cpu_bitmask_for_one_cpu(cpu).unwrap());
            }
            BackendKind::Fallback => {
                assert_eq!(pinned, numa.new_cpu_bitmask_for_all_cpus());
            }
        }

        numa.set_affinity_mask(&allowed);
        assert_eq!(numa.get_affinity(), allowed);
    })
    .join()
    .unwrap();
}

#[test]
fn out_of_range_cpu() {
    let numa = numa_bridge::get();
    let num_cpus = numa.num_cpus();

    assert_eq!(
        numa.set_affinity(num_cpus),
        Err(NumaError::InvalidCpu {
            cpu: num_cpus,
            num_cpus
        })
    );
}

#[test]
fn nodes_cover_memory_and_distances() {
    let numa = numa_bridge::get();

    for node in 0..numa.num_nodes() {
        assert_eq!(numa.distance(node, node), Ok(10));
        assert!(numa.node_size(node).is_ok());
        assert!(numa.free_size(node).is_ok());
    }
}

#[test]
fn every_node_takes_allocations() {
    let numa = numa_bridge::get();

    for node in 0..numa.num_nodes() {
        let mut buffer = numa.alloc_on_node(8192, node).unwrap();
        assert_eq!(buffer.capacity(), 8192);
        buffer.as_mut_slice()[8191] = 1;
        numa.free(buffer);
    }

    let buffer = numa.alloc_local(4096).unwrap();
    numa.free(buffer);
}

mod native {
    use super::*;
    use numa_bridge::buffer::Origin;

    fn native() -> Option<&'static Numa> {
        let numa = numa_bridge::get();
        if numa.kind() == BackendKind::Native {
            Some(numa)
        } else {
            None
        }
    }

    #[test]
    fn invalid_node_is_rejected() {
        if let Some(numa) = native() {
            let node = numa.num_nodes();
            let max_node = numa.max_node();
            assert_eq!(
                numa.distance(0, node),
                Err(NumaError::InvalidNode { node, max_node })
            );
            assert!(numa.alloc_on_node(4096, node).is_err());
            assert!(numa.run_on_node(node).is_err());
        }
    }

    #[test]
    fn single_node_interleave_is_local() {
        if let Some(numa) = native() {
            if numa.num_nodes() != 1 {
                return;
            }

            let interleaved = numa.alloc_interleaved(4096).unwrap();
            let local = numa.alloc_local(4096).unwrap();
            assert_eq!(interleaved.origin(), Origin::Numa);
            assert_eq!(interleaved.capacity(), 4096);
            assert_eq!(interleaved.origin(), local.origin());
            assert_eq!(interleaved.capacity(), local.capacity());

            numa.free(interleaved);
            numa.free(local);
        }
    }

    #[test]
    fn every_cpu_belongs_to_a_node() {
        if let Some(numa) = native() {
            let topology = numa.topology();
            let cpus = topology
                .nodes()
                .iter()
                .map(|node| node.cpus.count())
                .sum::<usize>();
            assert!(cpus >= 1);
            assert!(cpus <= numa.num_cpus());
        }
    }

    #[test]
    fn bound_thread_runs_on_its_node() {
        if let Some(numa) = native() {
            thread::spawn(move || {
                let allowed = numa.get_affinity();
                let node0 = numa.node_to_cpus(0).unwrap();
                if !allowed.iter().any(|cpu| node0.is_set(cpu)) {
                    return;
                }

                numa.apply_policy(AllocationPolicy::BoundToNode(0)).unwrap();
                let bound = numa.get_affinity();
                assert!(bound.iter().all(|cpu| node0.is_set(cpu)));

                numa.apply_policy(AllocationPolicy::Default).unwrap();
                numa.set_affinity_mask(&allowed);
            })
            .join()
            .unwrap();
        }
    }
}
