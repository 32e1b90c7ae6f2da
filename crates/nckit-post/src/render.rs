//! Per-controller block renderers
//!
//! [`BlockRenderer`]'s provided methods spell every block from the dialect
//! table alone, so an ISO-style controller is a table row plus a unit
//! struct. Siemens and Heidenhain replace only the cycle syntax.

use crate::block::{Block, CycleKind, CycleSpec, Position, SpindleDirection};
use crate::config::{Coolant, FiveAxisMode};
use crate::dialect::{
    ControllerDialect, DialectTable, FANUC, HAAS, HEIDENHAIN, MAZAK, OKUMA, SIEMENS,
};

/// Numeric formatting for one program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberFormat {
    decimals: usize,
}

impl NumberFormat {
    pub fn new(decimal_places: u32) -> Self {
        Self {
            decimals: decimal_places as usize,
        }
    }

    /// Round to the configured precision; never yields `-0`
    pub fn round(&self, value: f64) -> f64 {
        let scale = 10f64.powi(self.decimals as i32);
        let rounded = (value * scale).round() / scale;
        if rounded == 0.0 {
            0.0
        } else {
            rounded
        }
    }

    pub fn coord(&self, value: f64) -> String {
        format!("{:.*}", self.decimals, self.round(value))
    }

    /// Feeds carry at most one decimal
    pub fn feed(&self, value: f64) -> String {
        let decimals = self.decimals.min(1);
        let scale = 10f64.powi(decimals as i32);
        format!("{:.*}", decimals, (value * scale).round() / scale)
    }

    pub fn rpm(&self, value: f64) -> String {
        format!("{:.0}", value.round())
    }

    pub fn dwell(&self, seconds: f64, millis: bool) -> String {
        if millis {
            format!("{:.0}", (seconds * 1000.0).round())
        } else {
            format!("{:.3}", seconds)
        }
    }
}

/// Substitute `{key}` placeholders; each `\n` starts a new block
pub fn fill(template: &str, vars: &[(&str, String)]) -> Vec<String> {
    let mut text = template.to_string();
    for (key, value) in vars {
        text = text.replace(&format!("{{{}}}", key), value);
    }
    text.split('\n').map(str::to_string).collect()
}

fn fill_opt(template: Option<&str>, vars: &[(&str, String)]) -> Vec<String> {
    template.map(|t| fill(t, vars)).unwrap_or_default()
}

/// Turns abstract blocks into one controller's text
pub trait BlockRenderer: Send + Sync {
    fn table(&self) -> &'static DialectTable;

    /// Lines for one block, without numbering or terminator
    fn render(&self, block: &Block, fmt: &NumberFormat) -> Vec<String> {
        let t = self.table();
        match block {
            Block::ProgramOpen { name, number } => framing(t.program_open, name, *number),
            Block::ProgramClose { name, number } => framing(t.program_close, name, *number),
            Block::Comment(text) => vec![self.comment(text)],
            Block::SafeStart => vec![t.safe_start.to_string()],
            Block::WorkOffset(offset) => fill_opt(t.work_offset, &[("offset", offset.to_string())]),
            Block::ToolChange { tool, rpm } => fill(
                t.tool_change,
                &[("tool", tool.to_string()), ("rpm", fmt.rpm(*rpm))],
            ),
            Block::ToolLengthComp { tool } => {
                fill_opt(t.tool_length_comp, &[("tool", tool.to_string())])
            }
            Block::SpindleOn { rpm, direction } => {
                let template = match direction {
                    SpindleDirection::Clockwise => t.spindle_cw,
                    SpindleDirection::CounterClockwise => t.spindle_ccw,
                };
                fill(template, &[("rpm", fmt.rpm(*rpm))])
            }
            Block::SpindleStop => vec![t.spindle_stop.to_string()],
            Block::CoolantOn { coolant, code } => match (code, coolant) {
                (Some(code), _) => vec![code.clone()],
                (None, Coolant::Off) => Vec::new(),
                (None, Coolant::Flood) => vec![t.coolant_flood.to_string()],
                (None, Coolant::Mist) => vec![t.coolant_mist.to_string()],
                (None, Coolant::ThroughSpindle) => {
                    vec![t.coolant_through.unwrap_or(t.coolant_flood).to_string()]
                }
            },
            Block::CoolantOff => vec![t.coolant_off.to_string()],
            Block::Rapid(to) => vec![format!("{} {}", t.rapid, self.axis_words(to, fmt))],
            Block::Linear { to, feed } => {
                let mut line = format!("{} {}", t.feed, self.axis_words(to, fmt));
                if let Some(feed) = feed {
                    line.push_str(&format!(" F{}", fmt.feed(*feed)));
                }
                vec![line]
            }
            Block::Dwell { seconds } => fill(
                t.dwell,
                &[("dwell", fmt.dwell(*seconds, t.dwell_in_millis))],
            ),
            Block::TcpmOn { mode, tool } => {
                let template = match mode {
                    FiveAxisMode::Tcp => t.tcp_on,
                    _ => t.tcpm_on,
                };
                fill_opt(template, &[("tool", tool.to_string())])
            }
            Block::TcpmOff { mode } => {
                let template = match mode {
                    FiveAxisMode::Tcp => t.tcp_off,
                    _ => t.tcpm_off,
                };
                fill_opt(template, &[])
            }
            Block::TiltPlane { a_deg, c_deg } => fill_opt(
                t.tilt_on,
                &[("a", fmt.coord(*a_deg)), ("c", fmt.coord(*c_deg))],
            ),
            Block::TiltPlaneCancel => fill_opt(t.tilt_off, &[]),
            Block::CycleDefine(spec) => self.cycle_define(spec, fmt),
            Block::CycleLocation { x, y } => self.cycle_location(*x, *y, fmt),
            Block::CycleCancel => self.cycle_cancel(),
            Block::ProgramEnd { code } => vec![code
                .clone()
                .unwrap_or_else(|| t.program_end.to_string())],
        }
    }

    /// ISO cycle definition: `G99 G81 Z.. R.. F.. K0`
    fn cycle_define(&self, spec: &CycleSpec, fmt: &NumberFormat) -> Vec<String> {
        let t = self.table();
        let mut words = Vec::new();
        if !t.cycle_return.is_empty() {
            words.push(t.cycle_return.to_string());
        }
        words.push(t.cycles.code(spec.kind).to_string());
        words.push(format!("Z{}", fmt.coord(spec.bottom_z)));
        words.push(format!("R{}", fmt.coord(spec.retract_z)));
        if spec.kind == CycleKind::PeckDrill {
            if let Some(peck) = spec.peck_mm {
                words.push(format!("Q{}", fmt.coord(peck)));
            }
        }
        if spec.kind.uses_dwell() {
            if let Some(dwell) = spec.dwell_s {
                words.push(format!("P{}", fmt.dwell(dwell, t.dwell_in_millis)));
            }
        }
        if let Some(feed) = spec.feed {
            words.push(format!("F{}", fmt.feed(feed)));
        }
        if !t.cycle_define_only.is_empty() {
            words.push(t.cycle_define_only.to_string());
        }
        vec![words.join(" ")]
    }

    fn cycle_location(&self, x: f64, y: f64, fmt: &NumberFormat) -> Vec<String> {
        vec![format!("X{} Y{}", fmt.coord(x), fmt.coord(y))]
    }

    fn cycle_cancel(&self) -> Vec<String> {
        let code = self.table().cycle_cancel;
        if code.is_empty() {
            Vec::new()
        } else {
            vec![code.to_string()]
        }
    }

    fn comment(&self, text: &str) -> String {
        let t = self.table();
        let delimiters: Vec<char> = t
            .comment_open
            .trim()
            .chars()
            .chain(t.comment_close.trim().chars())
            .collect();
        let cleaned: String = text
            .chars()
            .filter(|c| !delimiters.contains(c))
            .collect::<String>()
            .to_uppercase();
        format!("{}{}{}", t.comment_open, cleaned.trim(), t.comment_close)
    }

    fn axis_words(&self, p: &Position, fmt: &NumberFormat) -> String {
        let mut words = format!(
            "X{} Y{} Z{}",
            fmt.coord(p.x),
            fmt.coord(p.y),
            fmt.coord(p.z)
        );
        if let Some(a) = p.a {
            words.push_str(&format!(" A{}", fmt.coord(a)));
        }
        if let Some(c) = p.c {
            words.push_str(&format!(" C{}", fmt.coord(c)));
        }
        words
    }
}

fn framing(lines: &[&str], name: &str, number: u32) -> Vec<String> {
    let vars = [("name", name.to_string()), ("number", format!("{:04}", number))];
    lines.iter().flat_map(|line| fill(line, &vars)).collect()
}

pub struct FanucRenderer;
pub struct HaasRenderer;
pub struct MazakRenderer;
pub struct OkumaRenderer;
pub struct SiemensRenderer;
pub struct HeidenhainRenderer;

impl BlockRenderer for FanucRenderer {
    fn table(&self) -> &'static DialectTable {
        &FANUC
    }
}

impl BlockRenderer for HaasRenderer {
    fn table(&self) -> &'static DialectTable {
        &HAAS
    }
}

impl BlockRenderer for MazakRenderer {
    fn table(&self) -> &'static DialectTable {
        &MAZAK
    }
}

impl BlockRenderer for OkumaRenderer {
    fn table(&self) -> &'static DialectTable {
        &OKUMA
    }
}

/// Sinumerik: modal `MCALL CYCLExx(...)` with positional parameters
impl BlockRenderer for SiemensRenderer {
    fn table(&self) -> &'static DialectTable {
        &SIEMENS
    }

    fn cycle_define(&self, spec: &CycleSpec, fmt: &NumberFormat) -> Vec<String> {
        let t = self.table();
        let rtp = fmt.coord(spec.retract_z);
        let rfp = rtp.clone();
        let dp = fmt.coord(spec.bottom_z);
        let dtb = fmt.coord(spec.dwell_s.unwrap_or(0.0));
        let args = match spec.kind {
            CycleKind::Drill => format!("{rtp},{rfp},0,{dp},"),
            CycleKind::DwellDrill | CycleKind::DwellBore => {
                format!("{rtp},{rfp},0,{dp},,{dtb}")
            }
            CycleKind::PeckDrill => {
                let peck = spec.peck_mm.unwrap_or_else(|| spec.depth());
                let first = fmt.coord(spec.retract_z - peck);
                let dam = fmt.coord(peck);
                format!("{rtp},{rfp},0,{dp},,{first},,{dam},{dtb},0,1,1")
            }
            CycleKind::Tap => {
                let pitch = fmt.coord(spec.pitch_mm.unwrap_or(0.0));
                let sst = fmt.rpm(spec.rpm);
                format!("{rtp},{rfp},0,{dp},,0,3,,{pitch},0,{sst},{sst}")
            }
            CycleKind::Ream => {
                let ffr = spec.feed.map(|f| fmt.feed(f)).unwrap_or_else(|| "0".to_string());
                format!("{rtp},{rfp},0,{dp},,{dtb},{ffr},{ffr}")
            }
            CycleKind::Bore => format!("{rtp},{rfp},0,{dp},,{dtb},3,0,0,0,0"),
        };

        let mut lines = Vec::new();
        if spec.kind != CycleKind::Tap {
            if let Some(feed) = spec.feed {
                lines.push(format!("F{}", fmt.feed(feed)));
            }
        }
        lines.push(format!(
            "{} {}({})",
            t.cycle_define_only,
            t.cycles.code(spec.kind),
            args
        ));
        lines
    }
}

/// TNC ISO: `G2xx` definitions with Q parameters, called per hole with `M99`
impl BlockRenderer for HeidenhainRenderer {
    fn table(&self) -> &'static DialectTable {
        &HEIDENHAIN
    }

    fn cycle_define(&self, spec: &CycleSpec, fmt: &NumberFormat) -> Vec<String> {
        let t = self.table();
        // Q201 is incremental from the surface, negative into the part
        let depth = fmt.coord(-spec.depth());
        let surface = fmt.coord(spec.retract_z);
        let feed = spec.feed.map(|f| fmt.feed(f)).unwrap_or_else(|| "0".to_string());
        let dwell = fmt.coord(spec.dwell_s.unwrap_or(0.0));
        let plunge = fmt.coord(spec.peck_mm.unwrap_or_else(|| spec.depth()));
        let params = match spec.kind {
            CycleKind::Drill => format!(
                "Q200=0 Q201={depth} Q206={feed} Q202={plunge} Q210=0 Q203={surface} Q204=0 Q211=0"
            ),
            CycleKind::DwellDrill | CycleKind::PeckDrill => format!(
                "Q200=0 Q201={depth} Q206={feed} Q202={plunge} Q210=0 Q203={surface} Q204=0 \
                 Q212=0 Q213=0 Q205=0 Q211={dwell} Q208=0 Q256=0.2"
            ),
            CycleKind::Tap => {
                let pitch = fmt.coord(spec.pitch_mm.unwrap_or(0.0));
                format!("Q200=0 Q201={depth} Q239={pitch} Q203={surface} Q204=0")
            }
            CycleKind::Ream => format!(
                "Q200=0 Q201={depth} Q206={feed} Q211={dwell} Q208={feed} Q203={surface} Q204=0"
            ),
            CycleKind::Bore | CycleKind::DwellBore => format!(
                "Q200=0 Q201={depth} Q206={feed} Q211={dwell} Q208=0 Q203={surface} Q204=0 \
                 Q214=0 Q336=0"
            ),
        };
        vec![format!("{} {}", t.cycles.code(spec.kind), params)]
    }

    fn cycle_location(&self, x: f64, y: f64, fmt: &NumberFormat) -> Vec<String> {
        vec![format!(
            "{} X{} Y{} M99",
            self.table().rapid,
            fmt.coord(x),
            fmt.coord(y)
        )]
    }
}

/// Renderer for a dialect
pub fn renderer_for(dialect: ControllerDialect) -> &'static dyn BlockRenderer {
    match dialect {
        ControllerDialect::Fanuc => &FanucRenderer,
        ControllerDialect::Haas => &HaasRenderer,
        ControllerDialect::Siemens => &SiemensRenderer,
        ControllerDialect::Heidenhain => &HeidenhainRenderer,
        ControllerDialect::Mazak => &MazakRenderer,
        ControllerDialect::Okuma => &OkumaRenderer,
    }
}
