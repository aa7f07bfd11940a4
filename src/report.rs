//! Result reporting
//!
//! Text output mirrors the classic layout, one result per line:
//!
//! ```text
//! ------------------------------------------------------
//! mutex     |      user=2.100000e-08 system=0.000000e+00
//! ------------------------------------------------------
//! ```
//!
//! (tabs shown as spaces). JSON output collects the same groups into a
//! single document printed when the suite finishes.

use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::cpu_time::CpuTime;
use crate::measure::BenchResult;

/// Separator printed between groups
pub const SEPARATOR: &str = "------------------------------------------------------";

/// Format a float like C's `%e`: six fraction digits and a signed exponent
/// of at least two digits
///
/// # Example
/// ```
/// use primtime::report::sci;
///
/// assert_eq!(sci(0.0), "0.000000e+00");
/// assert_eq!(sci(1.5e-7), "1.500000e-07");
/// assert_eq!(sci(12345.0), "1.234500e+04");
/// ```
pub fn sci(x: f64) -> String {
    if !x.is_finite() {
        return if x.is_nan() {
            "nan".to_string()
        } else if x > 0.0 {
            "inf".to_string()
        } else {
            "-inf".to_string()
        };
    }

    let s = format!("{:.6e}", x);
    match s.split_once('e').map(|(m, e)| (m, e.parse::<i32>())) {
        Some((mantissa, Ok(exp))) => {
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exp.abs())
        }
        _ => s,
    }
}

/// One line of a group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Entry {
    /// Context line such as `open depth 500`
    Heading { text: String },
    Result(BenchResult),
}

/// Results printed between two separators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    pub entries: Vec<Entry>,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    pub fn heading(&mut self, text: impl Into<String>) {
        self.entries.push(Entry::Heading { text: text.into() });
    }

    pub fn result(&mut self, result: BenchResult) {
        self.entries.push(Entry::Result(result));
    }

    pub fn results(&self) -> impl Iterator<Item = &BenchResult> {
        self.entries.iter().filter_map(|e| match e {
            Entry::Result(r) => Some(r),
            Entry::Heading { .. } => None,
        })
    }
}

/// Context printed after all groups
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Total CPU time consumed by the process at the end of the run
    pub total: CpuTime,
    /// Resolution of the real-time clock in seconds
    pub seconds_per_tick: f64,
}

/// Sink for benchmark output
///
/// The runner hands over each group as soon as it has been measured.
pub trait Reporter {
    fn group(&mut self, group: &Group) -> std::io::Result<()>;
    fn finish(&mut self, summary: &Summary) -> std::io::Result<()>;
}

/// `label\t | \t user=<e> system=<e>`
pub fn result_line(label: &str, t: &CpuTime) -> String {
    format!("{}\t | \t user={} system={}", label, sci(t.user), sci(t.system))
}

/// Plain-text reporter writing as it goes
pub struct TextReporter<W: Write> {
    out: W,
    started: bool,
}

impl<W: Write> TextReporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            started: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn start(&mut self) -> std::io::Result<()> {
        if !self.started {
            self.started = true;
            writeln!(self.out, "{}", SEPARATOR)?;
        }
        Ok(())
    }
}

impl<W: Write> Reporter for TextReporter<W> {
    fn group(&mut self, group: &Group) -> std::io::Result<()> {
        self.start()?;
        for entry in &group.entries {
            match entry {
                Entry::Heading { text } => writeln!(self.out, "{}", text)?,
                Entry::Result(r) => writeln!(self.out, "{}", result_line(&r.label, &r.mean))?,
            }
        }
        writeln!(self.out, "{}", SEPARATOR)?;
        self.out.flush()
    }

    fn finish(&mut self, summary: &Summary) -> std::io::Result<()> {
        self.start()?;
        writeln!(self.out, "{}", result_line("total", &summary.total))?;
        writeln!(self.out, "{}", SEPARATOR)?;
        writeln!(self.out, "seconds per tick = {}", sci(summary.seconds_per_tick))?;
        writeln!(self.out, "{}", SEPARATOR)?;
        self.out.flush()
    }
}

/// Full report as serialized by [`JsonReporter`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonReport {
    pub version: String,
    pub groups: Vec<Group>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<Summary>,
}

impl Default for JsonReport {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            groups: Vec::new(),
            summary: None,
        }
    }
}

/// JSON reporter; buffers groups and writes one document on finish
pub struct JsonReporter<W: Write> {
    out: W,
    report: JsonReport,
}

impl<W: Write> JsonReporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            report: JsonReport::default(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Reporter for JsonReporter<W> {
    fn group(&mut self, group: &Group) -> std::io::Result<()> {
        self.report.groups.push(group.clone());
        Ok(())
    }

    fn finish(&mut self, summary: &Summary) -> std::io::Result<()> {
        self.report.summary = Some(*summary);
        serde_json::to_writer_pretty(&mut self.out, &self.report)?;
        writeln!(self.out)?;
        self.out.flush()
    }
}
