//! Scheduler configuration and input validation.

use crate::{Pid, PolicyKind, ProcessDef, ProcessSpec, Time, ValidationError};

use std::collections::HashSet;
use std::convert::TryFrom;
use std::io::Read;

use serde::{Deserialize, Serialize};

/// Which policy to simulate, and its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Scheduling policy.
    pub policy: PolicyKind,
    /// Round robin time slice. Ignored by other policies.
    #[serde(default)]
    pub quantum: Option<i64>,
}

impl SchedulerConfig {
    /// Constructs a configuration without a quantum.
    #[must_use]
    pub fn new(policy: PolicyKind) -> Self {
        Self {
            policy,
            quantum: None,
        }
    }

    /// Sets the quantum.
    #[must_use]
    pub fn with_quantum(mut self, quantum: i64) -> Self {
        self.quantum = Some(quantum);
        self
    }
}

/// A validated process set together with the policy it will be scheduled under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workload {
    processes: Vec<ProcessDef>,
    policy: PolicyKind,
    quantum: Option<Time>,
}

impl Workload {
    /// Validates `specs` against `config`.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found: an empty process set, a duplicate PID, a
    /// negative arrival, a non-positive burst, a negative priority, a missing priority under a
    /// priority policy, or a missing or non-positive quantum under round robin.
    pub fn new(specs: &[ProcessSpec], config: &SchedulerConfig) -> Result<Self, ValidationError> {
        if specs.is_empty() {
            return Err(ValidationError::EmptyWorkload);
        }
        let quantum = if config.policy.requires_quantum() {
            let quantum = config.quantum.ok_or(ValidationError::MissingQuantum)?;
            Some(
                u64::try_from(quantum)
                    .ok()
                    .filter(|&q| q > 0)
                    .ok_or(ValidationError::NonPositiveQuantum(quantum))?,
            )
        } else {
            None
        };
        let mut pids = HashSet::<Pid>::new();
        let processes = specs
            .iter()
            .map(|spec| {
                if !pids.insert(spec.pid) {
                    return Err(ValidationError::DuplicatePid(spec.pid));
                }
                validate(spec, config.policy)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            processes,
            policy: config.policy,
            quantum,
        })
    }

    /// Validated process definitions, in input order.
    #[must_use]
    pub fn processes(&self) -> &[ProcessDef] {
        &self.processes
    }

    /// Scheduling policy.
    #[must_use]
    pub fn policy(&self) -> PolicyKind {
        self.policy
    }

    /// Round robin quantum; `None` for other policies.
    #[must_use]
    pub fn quantum(&self) -> Option<Time> {
        self.quantum
    }
}

fn validate(spec: &ProcessSpec, policy: PolicyKind) -> Result<ProcessDef, ValidationError> {
    let pid = spec.pid;
    let arrival = u64::try_from(spec.arrival).map_err(|_| ValidationError::NegativeArrival {
        pid,
        arrival: spec.arrival,
    })?;
    let burst = u64::try_from(spec.burst)
        .ok()
        .filter(|&b| b > 0)
        .ok_or(ValidationError::NonPositiveBurst {
            pid,
            burst: spec.burst,
        })?;
    let priority = spec
        .priority
        .map(|priority| {
            u64::try_from(priority)
                .map_err(|_| ValidationError::NegativePriority { pid, priority })
        })
        .transpose()?;
    if priority.is_none() && policy.requires_priority() {
        return Err(ValidationError::MissingPriority { pid, policy });
    }
    Ok(ProcessDef::new(pid, arrival, burst, priority))
}

/// Reads process definitions stored as a stream of JSON objects, e.g., one per line.
///
/// # Errors
///
/// Returns an error if the input is not valid JSON or an object is not a process definition.
pub fn read_processes<R: Read>(reader: R) -> Result<Vec<ProcessSpec>, serde_json::Error> {
    serde_json::Deserializer::from_reader(reader)
        .into_iter::<ProcessSpec>()
        .collect()
}
