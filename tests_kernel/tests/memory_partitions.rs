//! Memory Partition Integration Tests
//!
//! These tests validate fixed-partition allocation through the kernel API:
//! - Admission fills partitions in index order, then spills to disk
//! - Active partitions never overlap
//! - A freed partition is zeroed before it is handed out again

use kernel_api::{KernelApi, KernelError, Location};
use sim_kernel::test_utils::programs;
use tests_kernel::{assert_invariants, tick_checked, test_bootstrap};

#[test]
fn test_fourth_load_goes_to_disk() {
    let mut kernel = test_bootstrap();

    let receipts: Vec<_> = (0..4).map(|_| kernel.load(programs::HALT).unwrap()).collect();

    assert_eq!(receipts[0].partition, Some(0));
    assert_eq!(receipts[1].partition, Some(1));
    assert_eq!(receipts[2].partition, Some(2));
    assert_eq!(receipts[3].location, Location::Disk);
    assert_eq!(receipts[3].partition, None);
    assert_eq!(kernel.memory_manager().active_count(), 3);
    assert_invariants(&mut kernel);
}

#[test]
fn test_partitions_are_disjoint_and_cover_memory() {
    let kernel = test_bootstrap();
    let partitions = kernel.memory_manager().partitions();

    assert_eq!(partitions.len(), 3);
    for pair in partitions.windows(2) {
        assert_eq!(pair[0].limit, pair[1].base);
        assert!(!pair[0].bounds().overlaps(&pair[1].bounds()));
    }
    assert_eq!(partitions[0].base, 0);
    assert_eq!(partitions[2].limit, 768);
}

#[test]
fn test_freed_partition_is_zeroed_before_reuse() {
    let mut kernel = test_bootstrap();

    let first = kernel.load(programs::PRINT_HI).unwrap();
    kernel.run(first.pid).unwrap();
    tick_checked(&mut kernel, 4);
    assert!(!kernel.is_executing());

    let contents = kernel.memory_manager().read_partition(0).unwrap();
    assert!(contents.iter().all(|&b| b == 0));

    let second = kernel.load(programs::HALT).unwrap();
    assert_eq!(second.partition, Some(0));
    let contents = kernel.memory_manager().read_partition(0).unwrap();
    assert_eq!(contents[0], 0x00);
    assert!(contents[1..].iter().all(|&b| b == 0));
}

#[test]
fn test_oversized_program_is_rejected_without_side_effects() {
    let mut kernel = test_bootstrap();
    let image = vec![0xEA; 257];

    let err = kernel.load(&image).unwrap_err();
    assert_eq!(
        err,
        KernelError::ProgramTooLarge {
            size: 257,
            capacity: 256
        }
    );
    assert!(kernel.processes().is_empty());
    assert_eq!(kernel.memory_manager().active_count(), 0);

    // The next successful load still gets the first pid
    let receipt = kernel.load(programs::HALT).unwrap();
    assert_eq!(receipt.pid.as_u32(), 0);
}

#[test]
fn test_unformatted_disk_limits_admission_to_memory() {
    let mut kernel = sim_kernel::SimulatedKernel::new().unwrap();
    for _ in 0..3 {
        kernel.load(programs::HALT).unwrap();
    }

    assert_eq!(kernel.load(programs::HALT).unwrap_err(), KernelError::OutOfMemory);
    assert_eq!(kernel.processes().len(), 3);
}
