#![allow(dead_code)]

use regfinal::application::session::{FinalizationSession, SessionPorts};
use regfinal::config::FinalizationConfig;
use regfinal::domain::event::ChannelEvent;
use regfinal::domain::ports::ScopeId;
use regfinal::domain::state::{Input, RegistrationFinalizationState, Seed};
use regfinal::infrastructure::in_memory::{InMemoryChannelHub, InMemoryStatusSource};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

pub fn fast_config() -> FinalizationConfig {
    FinalizationConfig {
        poll_attempts: 2,
        poll_backoff: Duration::from_millis(1),
        settle_timeout: Duration::from_secs(2),
        ..FinalizationConfig::default()
    }
}

pub struct Harness {
    pub hub: InMemoryChannelHub,
    pub status: InMemoryStatusSource,
    pub scope: ScopeId,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            hub: InMemoryChannelHub::new(),
            status: InMemoryStatusSource::new(),
            scope: ScopeId::new("user-42"),
        }
    }

    pub async fn mount(&self, seed: Seed) -> FinalizationSession {
        self.mount_with(seed, fast_config()).await
    }

    pub async fn mount_with(&self, seed: Seed, config: FinalizationConfig) -> FinalizationSession {
        let ports = SessionPorts {
            transport: Box::new(self.hub.clone()),
            status: Box::new(self.status.clone()),
        };
        FinalizationSession::mount(self.scope.clone(), seed, ports, config)
            .await
            .unwrap()
    }

    pub async fn publish_all(&self, events: &[ChannelEvent]) {
        for event in events {
            assert!(self.hub.publish(&self.scope, event).await);
        }
    }
}

/// Folds inputs through the pure rule, skipping rejected ones.
pub fn fold(seed: Seed, inputs: &[Input]) -> RegistrationFinalizationState {
    inputs
        .iter()
        .fold(RegistrationFinalizationState::seeded(seed), |state, input| {
            state.apply(input).unwrap_or(state)
        })
}

pub fn write_input_log(rows: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "kind, name, pid, receipt, processing_step").unwrap();
    for row in rows {
        writeln!(file, "{row}").unwrap();
    }
    file
}
