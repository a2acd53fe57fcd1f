use numa_bridge::loader::DylibLoader;
use numa_bridge::prelude::*;
use proptest::prelude::*;

fn fallback() -> Numa {
    Numa::select(&Config::new().disable_numa(), &DylibLoader::new())
}

#[test]
fn single_uniform_node() {
    let numa = fallback();

    assert_eq!(numa.kind(), BackendKind::Fallback);
    assert!(!numa.is_available());
    assert_eq!(numa.max_node(), 0);
    assert_eq!(numa.num_nodes(), 1);
    assert_eq!(numa.preferred_node(), 0);
    assert_eq!(numa.distance(0, 0), Ok(10));
    assert_eq!(numa.node_to_cpus(0).unwrap(), numa.new_cpu_bitmask_for_all_cpus());
}

#[test]
fn affinity_is_left_to_the_scheduler() {
    let numa = fallback();

    numa.set_affinity(0).unwrap();
    assert_eq!(numa.get_affinity(), numa.new_cpu_bitmask_for_all_cpus());

    numa.run_on_node(0).unwrap();
    numa.set_local_alloc();
    numa.set_preferred(0).unwrap();
    numa.run_on_all_nodes();
    assert_eq!(numa.get_affinity().count(), numa.num_cpus());
}

#[test]
fn interleaved_page() {
    let numa = fallback();

    let mut buffer = numa.alloc_interleaved(4096).unwrap();
    assert_eq!(buffer.capacity(), 4096);
    assert!(buffer.as_slice().iter().all(|b| *b == 0));

    buffer.as_mut_slice().copy_from_slice(&[7u8; 4096]);
    assert_eq!(buffer.as_slice()[4095], 7);
    numa.free(buffer);
}

#[test]
fn raw_memory() {
    let numa = fallback();

    let address = numa.alloc_memory(256).unwrap();
    unsafe {
        address.as_ptr().write_bytes(1, 256);
        assert_eq!(*address.as_ptr().add(255), 1);
        numa.free_memory(address, 256);
    }
}

#[test]
fn summary() {
    let topology = fallback().topology();
    assert_eq!(topology.num_nodes(), 1);
    assert!(topology.summary().contains("fallback"));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]
    #[test]
    fn proptest_exact_capacity(capacity in 0usize..(1 << 16), node in 0usize..64) {
        let numa = fallback();

        let buffers = vec![
            numa.alloc(capacity).unwrap(),
            numa.alloc_local(capacity).unwrap(),
            numa.alloc_on_node(capacity, node).unwrap(),
            numa.alloc_interleaved(capacity).unwrap(),
        ];
        for buffer in buffers {
            prop_assert_eq!(buffer.capacity(), capacity);
            prop_assert_eq!(buffer.as_slice().len(), capacity);
            numa.free(buffer);
        }
    }
}
