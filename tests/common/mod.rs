#![allow(dead_code)]

pub mod mocks;

use std::path::Path;

use rand::distr::{Alphanumeric, SampleString};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// `count` random alphanumeric lines of 1 to 40 characters.
pub fn random_lines(count: usize) -> Vec<String> {
    (0..count)
        .map(|n| Alphanumeric.sample_string(&mut rand::rng(), 1 + n % 40))
        .collect()
}

pub fn file_bytes(path: &Path) -> Vec<u8> {
    std::fs::read(path).unwrap()
}
