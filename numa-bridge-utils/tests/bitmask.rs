use numa_bridge_utils::bitmask::{words_for, BitmaskError, CpuBitmask, WORD_BITS};
use proptest::prelude::*;

fn set_bits(mask: &CpuBitmask) -> Vec<usize> {
    let mut bits = Vec::new();
    for (i, word) in mask.words().iter().enumerate() {
        for b in 0..WORD_BITS {
            if word & (1 << b) != 0 {
                bits.push(i * WORD_BITS + b);
            }
        }
    }
    bits
}

#[test]
fn all_cpus_at_fixed_widths() {
    for num_cpus in &[1, 63, 64, 65, 100, 128] {
        let mask = CpuBitmask::for_all_cpus(*num_cpus);
        assert_eq!(mask.words().len(), words_for(*num_cpus));
        assert_eq!(set_bits(&mask), (0..*num_cpus).collect::<Vec<_>>());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1_000))]
    #[test]
    fn proptest_all_cpus(num_cpus in 1usize..1024) {
        let mask = CpuBitmask::for_all_cpus(num_cpus);
        prop_assert_eq!(mask.words().len(), (num_cpus + 63) / 64);
        prop_assert_eq!(mask.count(), num_cpus);
        prop_assert_eq!(set_bits(&mask), (0..num_cpus).collect::<Vec<_>>());
    }

    #[test]
    fn proptest_word_multiples(words in 1usize..16) {
        let mask = CpuBitmask::for_all_cpus(words * 64);
        prop_assert!(mask.words().iter().all(|w| *w == !0));
    }

    #[test]
    fn proptest_one_cpu((num_cpus, cpu) in (1usize..1024).prop_flat_map(|n| (Just(n), 0..n))) {
        let mask = CpuBitmask::for_one_cpu(num_cpus, cpu).unwrap();
        prop_assert_eq!(set_bits(&mask), vec![cpu]);
        prop_assert!(mask.is_set(cpu));
    }

    #[test]
    fn proptest_one_cpu_out_of_range(num_cpus in 0usize..1024, over in 0usize..256) {
        let cpu = num_cpus + over;
        prop_assert_eq!(
            CpuBitmask::for_one_cpu(num_cpus, cpu),
            Err(BitmaskError::CpuOutOfRange { cpu, num_cpus })
        );
    }

    #[test]
    fn proptest_from_words_never_leaks_tail(num_cpus in 1usize..512, seed in any::<u64>()) {
        let words = vec![seed; words_for(num_cpus) + 1];
        let mask = CpuBitmask::from_words(num_cpus, &words);
        prop_assert!(set_bits(&mask).iter().all(|cpu| *cpu < num_cpus));
    }
}
