//! Integration tests for the simosd host runtime

use kernel_api::{KernelApi, Location, ProcessState};
use simosd::{render_process_table, HostRuntime, HostRuntimeConfig, HostRuntimeError};
use std::fs;

const PRINT_SEVEN: &str = "A0 07 A2 01 FF 00";
const LOOP_FOREVER: &str = "A2 01 EC 10 00 D0 FB";

#[test]
fn test_disk_image_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let image_path = dir.path().join("disk.json");

    let config = HostRuntimeConfig {
        format: true,
        disk_image: Some(image_path.clone()),
        ..Default::default()
    };
    let mut runtime = HostRuntime::new(config).unwrap();
    runtime.prepare().unwrap();
    runtime.kernel_mut().create_file("notes").unwrap();
    runtime
        .kernel_mut()
        .write_file("notes", b"persisted across boots")
        .unwrap();
    runtime.shutdown().unwrap();
    assert!(image_path.exists());

    let config = HostRuntimeConfig {
        disk_image: Some(image_path),
        ..Default::default()
    };
    let mut runtime = HostRuntime::new(config).unwrap();
    assert_eq!(
        runtime.kernel_mut().read_file("notes").unwrap(),
        b"persisted across boots"
    );
    assert_eq!(runtime.kernel_mut().list_files().unwrap(), vec!["notes"]);
}

#[test]
fn test_corrupt_image_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let image_path = dir.path().join("disk.json");
    fs::write(&image_path, "{ not json").unwrap();

    let config = HostRuntimeConfig {
        disk_image: Some(image_path),
        ..Default::default()
    };
    let err = HostRuntime::new(config).err().unwrap();
    assert!(matches!(err, HostRuntimeError::Image(_)));
}

#[test]
fn test_kernel_config_from_json() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("kernel.json");
    fs::write(&config_path, r#"{ "quantum": 2, "partition_count": 2, "memory_size": 512 }"#)
        .unwrap();

    let kernel = HostRuntimeConfig::load_kernel_config(&config_path).unwrap();
    assert_eq!(kernel.quantum, 2);
    assert_eq!(kernel.partition_size(), 256);
    assert_eq!(kernel.default_priority, 5);

    let runtime = HostRuntime::new(HostRuntimeConfig {
        kernel,
        ..Default::default()
    })
    .unwrap();
    assert_eq!(runtime.kernel().quantum(), 2);
}

#[test]
fn test_invalid_kernel_config_fails_boot() {
    let mut config = HostRuntimeConfig::default();
    config.kernel.quantum = 0;
    let err = HostRuntime::new(config).err().unwrap();
    assert!(matches!(err, HostRuntimeError::Boot(_)));
}

#[test]
fn test_four_programs_share_three_partitions() {
    let config = HostRuntimeConfig {
        programs: vec![
            PRINT_SEVEN.to_string(),
            PRINT_SEVEN.to_string(),
            PRINT_SEVEN.to_string(),
            PRINT_SEVEN.to_string(),
        ],
        format: true,
        ..Default::default()
    };
    let mut runtime = HostRuntime::new(config).unwrap();
    let receipts = runtime.prepare().unwrap();
    assert_eq!(receipts[3].location, Location::Disk);

    let summary = runtime.run().unwrap().clone();
    assert_eq!(summary.exited.len(), 4);
    assert_eq!(runtime.output(), &["7", "7", "7", "7"]);

    let processes = runtime.kernel().processes();
    assert!(processes
        .iter()
        .all(|p| p.state == ProcessState::Terminated));
    assert_eq!(runtime.kernel().stats().roll_ins, 1);
}

#[test]
fn test_quantum_interleaves_looping_programs() {
    let mut config = HostRuntimeConfig {
        programs: vec![LOOP_FOREVER.to_string(), LOOP_FOREVER.to_string()],
        format: true,
        max_ticks: 12,
        ..Default::default()
    };
    config.kernel.quantum = 3;

    let mut runtime = HostRuntime::new(config).unwrap();
    runtime.prepare().unwrap();
    let summary = runtime.run().unwrap().clone();

    assert_eq!(summary.ticks, 12);
    assert_eq!(summary.preemptions, 4);

    let table = render_process_table(&runtime.kernel().processes());
    assert_eq!(table.lines().count(), 3);
}
