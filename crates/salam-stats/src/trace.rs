//! Recorded event traces.
//!
//! A trace is JSON Lines, one [`TraceEvent`] per line, tagged by `event`:
//!
//! ```text
//! {"event": "dependency", "producer": 1, "consumer": 2, "kinds": {"raw": true}}
//! {"event": "commit", "uid": 2, "opcode": 8}
//! {"event": "cycle_end", "cycle": 1}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped. Replaying a trace
//! through [`Accelerator::apply`] drives the same hooks the queue processor
//! would.

use std::io::BufRead;

use serde::{Deserialize, Serialize};

use crate::accelerator::Accelerator;
use crate::cycle::CycleSample;
use crate::edge::DepKinds;
use crate::error::StatsError;
use crate::id::{Opcode, Uid};
use crate::fu::FuType;
use crate::metrics::{MemAccess, PowerInputs};
use crate::stall::StallCause;

fn default_raw() -> DepKinds {
    DepKinds::RAW
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent {
    /// A resolved operand dependency. Kinds default to RAW when omitted.
    Dependency {
        producer: Uid,
        consumer: Uid,
        #[serde(default = "default_raw")]
        kinds: DepKinds,
    },
    Commit {
        uid: Uid,
        opcode: Opcode,
        #[serde(default)]
        is_load: bool,
        #[serde(default)]
        is_store: bool,
    },
    Stall {
        cause: StallCause,
    },
    NoStall,
    Parallelism {
        ready: u64,
        #[serde(default)]
        issued: u64,
    },
    CycleStart,
    /// End of a cycle, optionally carrying its queue occupancy sample.
    /// Numbering may start at 0 or 1.
    CycleEnd {
        cycle: u64,
        #[serde(default)]
        sample: Option<CycleSample>,
    },
    MemoryRead(MemAccess),
    MemoryWrite(MemAccess),
    PortContention {
        is_read: bool,
    },
    /// Bus widths in bytes per cycle.
    BusWidths {
        read: u64,
        write: u64,
    },
    FuBusy {
        fu: FuType,
        start: u64,
        end: u64,
    },
    FuContention {
        fu: FuType,
    },
    FuInstances {
        fu: FuType,
        count: u32,
    },
    Power(PowerInputs),
    Area {
        #[serde(default)]
        fu: f64,
        #[serde(default)]
        reg: f64,
        #[serde(default)]
        spm: f64,
        #[serde(default)]
        cache: f64,
    },
}

/// Parses a JSON Lines trace. Errors carry the 1-based line number.
pub fn parse_trace<R: BufRead>(reader: R) -> Result<Vec<TraceEvent>, StatsError> {
    let mut events = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.map_err(|e| StatsError::Trace {
            line: line_no,
            reason: e.to_string(),
        })?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let event = serde_json::from_str(trimmed).map_err(|e| StatsError::Trace {
            line: line_no,
            reason: e.to_string(),
        })?;
        events.push(event);
    }
    Ok(events)
}

impl Accelerator {
    /// Dispatches one trace event to the matching hook.
    pub fn apply(&mut self, event: &TraceEvent) {
        match *event {
            TraceEvent::Dependency {
                producer,
                consumer,
                kinds,
            } => self.on_dependency(producer, consumer, kinds),
            TraceEvent::Commit {
                uid,
                opcode,
                is_load,
                is_store,
            } => self.on_commit(uid, opcode, is_load, is_store),
            TraceEvent::Stall { cause } => self.on_stall(cause),
            TraceEvent::NoStall => self.on_no_stall(),
            TraceEvent::Parallelism { ready, issued } => self.on_parallelism(ready, issued),
            TraceEvent::CycleStart => self.on_cycle_start(),
            TraceEvent::CycleEnd { cycle, sample } => {
                if let Some(sample) = sample {
                    self.with_stats(|s| {
                        if let Some(current) = s.current_cycle_mut() {
                            *current = sample;
                        }
                    });
                }
                self.on_cycle_end(cycle);
            }
            TraceEvent::MemoryRead(access) => self.on_memory_read(access),
            TraceEvent::MemoryWrite(access) => self.on_memory_write(access),
            TraceEvent::PortContention { is_read } => self.on_port_contention(is_read),
            TraceEvent::BusWidths { read, write } => self.on_bus_widths(read, write),
            TraceEvent::FuBusy { fu, start, end } => self.on_fu_busy(fu, start, end),
            TraceEvent::FuContention { fu } => self.on_fu_contention(fu),
            TraceEvent::FuInstances { fu, count } => self.on_fu_instances(fu, count),
            TraceEvent::Power(inputs) => self.on_power(inputs),
            TraceEvent::Area {
                fu,
                reg,
                spm,
                cache,
            } => self.on_area(fu, reg, spm, cache),
        }
    }

    /// Applies every event in order.
    pub fn replay<'a>(&mut self, events: impl IntoIterator<Item = &'a TraceEvent>) {
        for event in events {
            self.apply(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StatsContext;

    #[test]
    fn parses_events_and_skips_comments() {
        let trace = "# gemm trace\n\n\
            {\"event\":\"dependency\",\"producer\":1,\"consumer\":2}\n\
            {\"event\":\"commit\",\"uid\":2,\"opcode\":8,\"is_store\":true}\n\
            {\"event\":\"no_stall\"}\n";
        let events = parse_trace(trace.as_bytes()).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(
            events[0],
            TraceEvent::Dependency {
                producer: Uid(1),
                consumer: Uid(2),
                kinds: DepKinds::RAW
            }
        );
        assert_eq!(
            events[1],
            TraceEvent::Commit {
                uid: Uid(2),
                opcode: Opcode(8),
                is_load: false,
                is_store: true
            }
        );
        assert_eq!(events[2], TraceEvent::NoStall);
    }

    #[test]
    fn power_event_is_flat() {
        let events =
            parse_trace(r#"{"event":"power","fu_leakage":1.5,"reg_dynamic":0.5}"#.as_bytes())
                .unwrap();
        let TraceEvent::Power(inputs) = &events[0] else {
            panic!("expected power event");
        };
        assert_eq!(inputs.fu_leakage, 1.5);
        assert_eq!(inputs.reg_dynamic, 0.5);
    }

    #[test]
    fn memory_event_is_flat_with_optional_address() {
        let trace = "{\"event\":\"memory_read\",\"kind\":\"cache\",\"latency\":3,\"cache_hit\":true}\n\
            {\"event\":\"memory_write\",\"kind\":\"spm\",\"addr\":128,\"bytes\":4}\n";
        let events = parse_trace(trace.as_bytes()).unwrap();
        assert_eq!(
            events[0],
            TraceEvent::MemoryRead(MemAccess::new(crate::MemAccessKind::Cache, 3).hit(true))
        );
        assert_eq!(
            events[1],
            TraceEvent::MemoryWrite(MemAccess::new(crate::MemAccessKind::Spm, 0).at(128, 4))
        );
    }

    #[test]
    fn fu_events_drive_utilization() {
        let trace = "{\"event\":\"fu_instances\",\"fu\":\"int_muldiv\",\"count\":1}\n\
            {\"event\":\"fu_busy\",\"fu\":\"int_muldiv\",\"start\":0,\"end\":4}\n\
            {\"event\":\"fu_contention\",\"fu\":\"int_muldiv\"}\n";
        let events = parse_trace(trace.as_bytes()).unwrap();
        let mut acc = Accelerator::new("t", StatsContext::default());
        acc.replay(&events);
        let fu = acc.stats().map(|s| s.summary().fu_utilization.clone()).unwrap();
        let muldiv = fu.get(FuType::IntMulDiv);
        assert_eq!((muldiv.instances, muldiv.busy_cycles), (1, 4));
        assert_eq!(muldiv.contention_stalls, 1);
    }

    #[test]
    fn bad_line_reports_line_number() {
        let trace = "{\"event\":\"no_stall\"}\n{\"event\":\"warp\"}\n";
        let err = parse_trace(trace.as_bytes()).unwrap_err();
        assert!(matches!(err, StatsError::Trace { line: 2, .. }));
    }

    #[test]
    fn apply_drives_hooks() {
        let trace = "{\"event\":\"dependency\",\"producer\":1,\"consumer\":2}\n\
            {\"event\":\"stall\",\"cause\":\"raw_hazard\"}\n\
            {\"event\":\"cycle_end\",\"cycle\":3}\n";
        let events = parse_trace(trace.as_bytes()).unwrap();
        let mut acc = Accelerator::new("t", StatsContext::default());
        acc.replay(&events);
        assert_eq!(acc.total_cycles(), 3);
        assert_eq!(acc.stall_cycles(), 1);
        assert_eq!(
            acc.stats().map(|s| s.get_instruction_depth(Uid(2))),
            Some(2)
        );
    }
}
