//! Racing writers on secret files
//!
//! Readers must only ever see one complete payload, whichever writer wins.

use std::collections::HashSet;
use std::fs;
use std::sync::{Arc, Barrier};
use std::thread;

use injector_fs::{RobustnessConfig, WriteOptions, io};
use tempfile::tempdir;

fn options() -> WriteOptions {
    WriteOptions {
        robustness: RobustnessConfig {
            enable_fsync: false,
            ..Default::default()
        },
        ..WriteOptions::default()
    }
}

fn payload(writer: usize, round: usize) -> String {
    // Varying lengths make a torn write detectable.
    format!("rotation-{writer}-{round}-{}", "x".repeat(writer * 97 + round))
}

#[test]
fn test_racing_rotations_leave_one_complete_payload() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("app").join("password");
    let writers = 8;
    let rounds = 25;
    let barrier = Arc::new(Barrier::new(writers));

    let handles: Vec<_> = (0..writers)
        .map(|writer| {
            let target = target.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for round in 0..rounds {
                    io::write_atomic(&target, payload(writer, round).as_bytes(), &options())
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let expected: HashSet<String> = (0..writers)
        .flat_map(|w| (0..rounds).map(move |r| payload(w, r)))
        .collect();
    let content = fs::read_to_string(&target).unwrap();
    assert!(expected.contains(&content), "torn write: {:?}", &content[..content.len().min(40)]);

    let stray: Vec<_> = fs::read_dir(target.parent().unwrap())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name != "password")
        .collect();
    assert!(stray.is_empty(), "unexpected files: {:?}", stray);
}

#[test]
fn test_parallel_keys_share_a_directory() {
    // Every writer creates the same missing parent; none may fail on it.
    let dir = tempdir().unwrap();
    let base = dir.path().join("fresh").join("app");
    let keys = ["username", "password", "token", "ca.crt", "tls.key"];
    let barrier = Arc::new(Barrier::new(keys.len()));

    let handles: Vec<_> = keys
        .iter()
        .map(|key| {
            let path = base.join(key);
            let content = format!("value of {key}");
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                io::write_atomic(&path, content.as_bytes(), &options())
            })
        })
        .collect();

    for (key, handle) in keys.iter().zip(handles) {
        handle.join().unwrap().unwrap();
        assert_eq!(
            fs::read_to_string(base.join(key)).unwrap(),
            format!("value of {key}")
        );
    }
}
