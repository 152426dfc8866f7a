// src/exec/probe.rs

//! System-wide process lookup behind a trait.
//!
//! Production code uses [`SystemProbe`]; tests can provide their own
//! implementation that doesn't inspect real processes.

use sysinfo::{ProcessesToUpdate, System};

/// Trait abstracting "is a process with this name running anywhere?".
pub trait ProcessProbe: Send + Sync {
    fn is_running(&self, name: &str) -> bool;
}

/// Real probe backed by `sysinfo`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProbe;

impl ProcessProbe for SystemProbe {
    fn is_running(&self, name: &str) -> bool {
        // Match both the exact file name and its stem, since the helper may
        // show up either way depending on platform.
        let stem = name.strip_suffix(".exe").unwrap_or(name);

        let mut system = System::new();
        system.refresh_processes(ProcessesToUpdate::All, true);
        system.processes().values().any(|process| {
            let proc_name = process.name().to_string_lossy();
            proc_name == name || proc_name == stem
        })
    }
}

/// Fixed-answer probe for tests.
#[derive(Debug, Clone, Copy)]
pub struct StaticProbe(pub bool);

impl ProcessProbe for StaticProbe {
    fn is_running(&self, _name: &str) -> bool {
        self.0
    }
}
