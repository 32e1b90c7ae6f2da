//! Controller dialects
//!
//! Each supported controller is one row of static data: the literal codes
//! and templates the renderer needs. Templates use `{name}` placeholders
//! and may span several blocks separated by `\n`.
//!
//! | Placeholder | Value                                   |
//! |-------------|-----------------------------------------|
//! | `{tool}`    | tool number                             |
//! | `{rpm}`     | spindle speed, whole revolutions        |
//! | `{name}`    | program identifier                      |
//! | `{number}`  | program number, four digits             |
//! | `{offset}`  | work offset code (`G54`..`G59`)         |
//! | `{dwell}`   | dwell in the controller's unit          |
//! | `{a}` `{c}` | tilt angles of a 3+2 work plane         |

use crate::block::CycleKind;
use crate::config::FiveAxisMode;
use crate::error::PostError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported controller families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControllerDialect {
    Fanuc,
    Haas,
    #[serde(alias = "sinumerik")]
    Siemens,
    #[serde(alias = "tnc")]
    Heidenhain,
    #[serde(alias = "mazatrol")]
    Mazak,
    #[serde(alias = "osp")]
    Okuma,
}

impl ControllerDialect {
    pub fn all() -> &'static [ControllerDialect] {
        &[
            ControllerDialect::Fanuc,
            ControllerDialect::Haas,
            ControllerDialect::Siemens,
            ControllerDialect::Heidenhain,
            ControllerDialect::Mazak,
            ControllerDialect::Okuma,
        ]
    }

    /// Static vocabulary row for this controller
    pub fn table(self) -> &'static DialectTable {
        match self {
            Self::Fanuc => &FANUC,
            Self::Haas => &HAAS,
            Self::Siemens => &SIEMENS,
            Self::Heidenhain => &HEIDENHAIN,
            Self::Mazak => &MAZAK,
            Self::Okuma => &OKUMA,
        }
    }
}

impl Default for ControllerDialect {
    fn default() -> Self {
        Self::Fanuc
    }
}

impl fmt::Display for ControllerDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fanuc => write!(f, "Fanuc"),
            Self::Haas => write!(f, "Haas"),
            Self::Siemens => write!(f, "Siemens"),
            Self::Heidenhain => write!(f, "Heidenhain"),
            Self::Mazak => write!(f, "Mazak"),
            Self::Okuma => write!(f, "Okuma"),
        }
    }
}

impl FromStr for ControllerDialect {
    type Err = PostError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "fanuc" | "fanuc_0i" | "fanuc_30i" => Ok(Self::Fanuc),
            "haas" | "haas_ngc" => Ok(Self::Haas),
            "siemens" | "sinumerik" | "840d" => Ok(Self::Siemens),
            "heidenhain" | "tnc" | "tnc640" => Ok(Self::Heidenhain),
            "mazak" | "mazatrol" => Ok(Self::Mazak),
            "okuma" | "osp" => Ok(Self::Okuma),
            _ => Err(PostError::UnknownDialect(s.to_string())),
        }
    }
}

/// Canned cycle codes, one per cycle kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleCodes {
    pub drill: &'static str,
    pub dwell_drill: &'static str,
    pub peck_drill: &'static str,
    pub tap: &'static str,
    pub ream: &'static str,
    pub bore: &'static str,
    pub dwell_bore: &'static str,
}

impl CycleCodes {
    pub fn code(&self, kind: CycleKind) -> &'static str {
        match kind {
            CycleKind::Drill => self.drill,
            CycleKind::DwellDrill => self.dwell_drill,
            CycleKind::PeckDrill => self.peck_drill,
            CycleKind::Tap => self.tap,
            CycleKind::Ream => self.ream,
            CycleKind::Bore => self.bore,
            CycleKind::DwellBore => self.dwell_bore,
        }
    }
}

/// Literal vocabulary of one controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialectTable {
    pub name: &'static str,
    /// Raw lines opening the program (never numbered)
    pub program_open: &'static [&'static str],
    /// Raw lines closing the program (never numbered)
    pub program_close: &'static [&'static str],
    pub comment_open: &'static str,
    pub comment_close: &'static str,
    /// Appended to every numbered non-comment block
    pub block_terminator: &'static str,
    pub safe_start: &'static str,
    /// `None` when the datum comes from the controller's preset table
    pub work_offset: Option<&'static str>,
    pub rapid: &'static str,
    pub feed: &'static str,
    pub tool_change: &'static str,
    pub tool_length_comp: Option<&'static str>,
    pub spindle_cw: &'static str,
    pub spindle_ccw: &'static str,
    pub spindle_stop: &'static str,
    pub coolant_flood: &'static str,
    pub coolant_mist: &'static str,
    pub coolant_through: Option<&'static str>,
    pub coolant_off: &'static str,
    pub dwell: &'static str,
    pub dwell_in_millis: bool,
    pub tcpm_on: Option<&'static str>,
    pub tcpm_off: Option<&'static str>,
    pub tcp_on: Option<&'static str>,
    pub tcp_off: Option<&'static str>,
    pub tilt_on: Option<&'static str>,
    pub tilt_off: Option<&'static str>,
    pub cycles: CycleCodes,
    /// Return-plane selection emitted with a cycle definition
    pub cycle_return: &'static str,
    /// Word that defines a cycle without running it at the current position
    pub cycle_define_only: &'static str,
    pub cycle_cancel: &'static str,
    pub program_end: &'static str,
}

impl DialectTable {
    pub fn supports_tcpm(&self) -> bool {
        self.tcpm_on.is_some()
    }

    pub fn supports_tcp(&self) -> bool {
        self.tcp_on.is_some()
    }

    pub fn supports_tilted_plane(&self) -> bool {
        self.tilt_on.is_some()
    }

    /// Whether the controller handles rotary motion itself in `mode`
    ///
    /// `None` never counts: rotary words are then plain positioning.
    pub fn supports_mode(&self, mode: FiveAxisMode) -> bool {
        match mode {
            FiveAxisMode::None => false,
            FiveAxisMode::Tcpm => self.supports_tcpm(),
            FiveAxisMode::Tcp => self.supports_tcp(),
            FiveAxisMode::ThreePlusTwo => self.supports_tilted_plane(),
        }
    }
}

const ISO_CYCLES: CycleCodes = CycleCodes {
    drill: "G81",
    dwell_drill: "G82",
    peck_drill: "G83",
    tap: "G84",
    ream: "G85",
    bore: "G86",
    dwell_bore: "G89",
};

pub static FANUC: DialectTable = DialectTable {
    name: "FANUC 0i/30i",
    program_open: &["%", "O{number} ({name})"],
    program_close: &["%"],
    comment_open: "(",
    comment_close: ")",
    block_terminator: "",
    safe_start: "G90 G17 G21 G40 G49 G80",
    work_offset: Some("{offset}"),
    rapid: "G00",
    feed: "G01",
    tool_change: "T{tool} M06",
    tool_length_comp: Some("G43 H{tool}"),
    spindle_cw: "S{rpm} M03",
    spindle_ccw: "S{rpm} M04",
    spindle_stop: "M05",
    coolant_flood: "M08",
    coolant_mist: "M07",
    coolant_through: None,
    coolant_off: "M09",
    dwell: "G04 P{dwell}",
    dwell_in_millis: true,
    tcpm_on: Some("G43.4 H{tool}"),
    tcpm_off: Some("G49"),
    tcp_on: Some("G43.5 H{tool}"),
    tcp_off: Some("G49"),
    tilt_on: Some("G68.2 X0 Y0 Z0 I{c} J{a} K0\nG53.1"),
    tilt_off: Some("G69"),
    cycles: ISO_CYCLES,
    cycle_return: "G99",
    cycle_define_only: "K0",
    cycle_cancel: "G80",
    program_end: "M30",
};

pub static HAAS: DialectTable = DialectTable {
    name: "HAAS NGC",
    program_open: &["%", "O{number} ({name})"],
    program_close: &["%"],
    comment_open: "(",
    comment_close: ")",
    block_terminator: "",
    safe_start: "G90 G17 G21 G40 G49 G80",
    work_offset: Some("{offset}"),
    rapid: "G00",
    feed: "G01",
    tool_change: "T{tool} M06",
    tool_length_comp: Some("G43 H{tool}"),
    spindle_cw: "S{rpm} M03",
    spindle_ccw: "S{rpm} M04",
    spindle_stop: "M05",
    coolant_flood: "M08",
    coolant_mist: "M07",
    coolant_through: Some("M88"),
    coolant_off: "M09",
    dwell: "G04 P{dwell}",
    dwell_in_millis: false,
    tcpm_on: Some("G234 H{tool}"),
    tcpm_off: Some("G49"),
    tcp_on: None,
    tcp_off: None,
    tilt_on: Some("G68.2 X0 Y0 Z0 I{c} J{a} K0\nG53.1"),
    tilt_off: Some("G69"),
    cycles: ISO_CYCLES,
    cycle_return: "G99",
    cycle_define_only: "L0",
    cycle_cancel: "G80",
    program_end: "M30",
};

pub static SIEMENS: DialectTable = DialectTable {
    name: "SIEMENS SINUMERIK 840D",
    program_open: &["%_N_{name}_MPF", ";$PATH=/_N_MPF_DIR"],
    program_close: &[],
    comment_open: "; ",
    comment_close: "",
    block_terminator: "",
    safe_start: "G90 G17 G71 G40",
    work_offset: Some("{offset}"),
    rapid: "G0",
    feed: "G1",
    tool_change: "T{tool} D1\nM6",
    tool_length_comp: None,
    spindle_cw: "S{rpm} M3",
    spindle_ccw: "S{rpm} M4",
    spindle_stop: "M5",
    coolant_flood: "M8",
    coolant_mist: "M7",
    coolant_through: None,
    coolant_off: "M9",
    dwell: "G4 F{dwell}",
    dwell_in_millis: false,
    tcpm_on: Some("TRAORI"),
    tcpm_off: Some("TRAFOOF"),
    tcp_on: Some("TRAORI"),
    tcp_off: Some("TRAFOOF"),
    tilt_on: Some("CYCLE800(1,\"\",0,57,0,0,0,{a},0,{c},0,0,0,-1,100,1)"),
    tilt_off: Some("CYCLE800()"),
    cycles: CycleCodes {
        drill: "CYCLE81",
        dwell_drill: "CYCLE82",
        peck_drill: "CYCLE83",
        tap: "CYCLE84",
        ream: "CYCLE85",
        bore: "CYCLE86",
        dwell_bore: "CYCLE89",
    },
    cycle_return: "",
    cycle_define_only: "MCALL",
    cycle_cancel: "MCALL",
    program_end: "M30",
};

pub static HEIDENHAIN: DialectTable = DialectTable {
    name: "HEIDENHAIN TNC ISO",
    program_open: &["%{name} G71 *"],
    program_close: &["N99999999 %{name} G71 *"],
    comment_open: "; ",
    comment_close: "",
    block_terminator: " *",
    safe_start: "G90 G17 G40",
    work_offset: None,
    rapid: "G00",
    feed: "G01",
    tool_change: "T{tool} G17 S{rpm}",
    tool_length_comp: None,
    spindle_cw: "M03",
    spindle_ccw: "M04",
    spindle_stop: "M05",
    coolant_flood: "M08",
    coolant_mist: "M07",
    coolant_through: None,
    coolant_off: "M09",
    dwell: "G04 F{dwell}",
    dwell_in_millis: false,
    tcpm_on: Some("M128"),
    tcpm_off: Some("M129"),
    tcp_on: Some("M128"),
    tcp_off: Some("M129"),
    tilt_on: Some("PLANE SPATIAL SPA{a} SPB0 SPC{c} TURN FMAX"),
    tilt_off: Some("PLANE RESET STAY"),
    cycles: CycleCodes {
        drill: "G200",
        dwell_drill: "G203",
        peck_drill: "G203",
        tap: "G207",
        ream: "G201",
        bore: "G202",
        dwell_bore: "G202",
    },
    cycle_return: "",
    cycle_define_only: "",
    cycle_cancel: "",
    program_end: "M30",
};

pub static MAZAK: DialectTable = DialectTable {
    name: "MAZAK EIA",
    program_open: &["%", "O{number} ({name})"],
    program_close: &["%"],
    comment_open: "(",
    comment_close: ")",
    block_terminator: "",
    safe_start: "G90 G17 G21 G40 G49 G80",
    work_offset: Some("{offset}"),
    rapid: "G00",
    feed: "G01",
    tool_change: "T{tool} M06",
    tool_length_comp: Some("G43 H{tool}"),
    spindle_cw: "S{rpm} M03",
    spindle_ccw: "S{rpm} M04",
    spindle_stop: "M05",
    coolant_flood: "M08",
    coolant_mist: "M07",
    coolant_through: None,
    coolant_off: "M09",
    dwell: "G04 P{dwell}",
    dwell_in_millis: true,
    tcpm_on: Some("G43.4 H{tool}"),
    tcpm_off: Some("G49"),
    tcp_on: Some("G43.5 H{tool}"),
    tcp_off: Some("G49"),
    tilt_on: Some("G68.2 X0 Y0 Z0 I{c} J{a} K0\nG53.1"),
    tilt_off: Some("G69"),
    cycles: ISO_CYCLES,
    cycle_return: "G99",
    cycle_define_only: "K0",
    cycle_cancel: "G80",
    program_end: "M30",
};

pub static OKUMA: DialectTable = DialectTable {
    name: "OKUMA OSP",
    program_open: &["%", "O{number} ({name})"],
    program_close: &["%"],
    comment_open: "(",
    comment_close: ")",
    block_terminator: "",
    safe_start: "G90 G17 G21 G40 G80",
    work_offset: Some("{offset}"),
    rapid: "G00",
    feed: "G01",
    tool_change: "T{tool} M06",
    tool_length_comp: Some("G56 H{tool}"),
    spindle_cw: "S{rpm} M03",
    spindle_ccw: "S{rpm} M04",
    spindle_stop: "M05",
    coolant_flood: "M08",
    coolant_mist: "M07",
    coolant_through: Some("M51"),
    coolant_off: "M09",
    dwell: "G04 F{dwell}",
    dwell_in_millis: false,
    tcpm_on: Some("G169"),
    tcpm_off: Some("G170"),
    tcp_on: None,
    tcp_off: None,
    tilt_on: None,
    tilt_off: None,
    cycles: ISO_CYCLES,
    cycle_return: "G99",
    cycle_define_only: "NCYL",
    cycle_cancel: "G80",
    program_end: "M30",
};
