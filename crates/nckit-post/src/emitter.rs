//! Streaming program emitter
//!
//! [`BlockStream`] walks the move list once and yields abstract blocks on
//! demand; [`LineStream`] renders them for one controller and applies line
//! numbers. Neither materializes the whole program. The only state carried
//! across moves is modal: current feed, the active canned cycle, and the
//! five-axis mode.

use crate::block::{Block, CycleKind, CycleSpec, Position, SpindleDirection};
use crate::config::{Coolant, FiveAxisMode, PostConfig, WorkOffset};
use crate::dialect::{ControllerDialect, DialectTable};
use crate::postprocessor::PostSummary;
use crate::render::{renderer_for, BlockRenderer, NumberFormat};
use nalgebra::{Point3, Rotation3, Vector3};
use nckit_core::{MotionPoint, MoveKind};
use std::collections::VecDeque;
use tracing::{debug, info, warn};

/// Clearance above the last cut when rapiding back into a pecked hole
const PECK_CLEARANCE_MM: f64 = 0.5;

/// Smallest explicit peck step; shorter pecks are raised to this
const MIN_PECK_MM: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Header,
    Body,
    Done,
}

/// How rotary coordinates reach the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RotaryHandling {
    /// A/C words on each move
    Words,
    /// Controller compensation switched on around the rotary section
    Controller(FiveAxisMode),
    /// One tilted work plane per orientation, linear words only
    TiltedPlane,
}

/// Lazily generated block sequence for one program
pub struct BlockStream<'a> {
    moves: &'a [MotionPoint],
    config: &'a PostConfig,
    table: &'static DialectTable,
    format: NumberFormat,
    rotary: RotaryHandling,
    /// First and last index of moves carrying rotary coordinates
    rotary_span: Option<(usize, usize)>,
    next_index: usize,
    phase: Phase,
    pending: VecDeque<Block>,
    modal_feed: Option<f64>,
    active_cycle: Option<CycleSpec>,
    compensation_active: bool,
    tilt: Option<(f64, f64)>,
    /// Last A and C words actually commanded, rounded
    commanded_rotary: (Option<f64>, Option<f64>),
    last_z: Option<f64>,
    cycles_used: Vec<String>,
    warnings: Vec<String>,
}

impl<'a> BlockStream<'a> {
    pub fn new(
        moves: &'a [MotionPoint],
        config: &'a PostConfig,
        table: &'static DialectTable,
    ) -> Self {
        let first = moves.iter().position(MotionPoint::has_rotary);
        let last = moves.iter().rposition(MotionPoint::has_rotary);

        let mut stream = Self {
            moves,
            config,
            table,
            format: NumberFormat::new(config.decimal_places),
            rotary: RotaryHandling::Words,
            rotary_span: first.zip(last),
            next_index: 0,
            phase: Phase::Header,
            pending: VecDeque::new(),
            modal_feed: None,
            active_cycle: None,
            compensation_active: false,
            tilt: None,
            commanded_rotary: (None, None),
            last_z: None,
            cycles_used: Vec::new(),
            warnings: Vec::new(),
        };
        stream.rotary = stream.select_rotary_handling();

        if moves.is_empty() {
            stream.push_warning(
                "Empty move list: program contains only header and footer".to_string(),
            );
        }
        if config.coolant == Coolant::ThroughSpindle
            && config.coolant_code.is_none()
            && table.coolant_through.is_none()
        {
            stream.push_warning(format!(
                "{} has no through-spindle coolant code; flood coolant used",
                table.name
            ));
        }
        if table.work_offset.is_none() && config.work_offset != WorkOffset::default() {
            stream.push_warning(format!(
                "{} takes its datum from the preset table; {} not emitted",
                table.name, config.work_offset
            ));
        }
        stream
    }

    fn select_rotary_handling(&mut self) -> RotaryHandling {
        let mode = self.config.five_axis_mode;
        if mode == FiveAxisMode::None {
            return RotaryHandling::Words;
        }
        if !self.table.supports_mode(mode) {
            self.push_warning(format!(
                "{} does not support {} mode; rotary moves emitted as plain A/C positioning",
                self.table.name, mode
            ));
            return RotaryHandling::Words;
        }
        match mode {
            FiveAxisMode::ThreePlusTwo => RotaryHandling::TiltedPlane,
            other => RotaryHandling::Controller(other),
        }
    }

    /// Non-fatal findings collected so far
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Distinct cycle codes emitted so far, in first-use order
    pub fn cycles_used(&self) -> &[String] {
        &self.cycles_used
    }

    fn push_warning(&mut self, message: String) {
        warn!(controller = self.table.name, "{}", message);
        self.warnings.push(message);
    }

    fn push(&mut self, block: Block) {
        if let Block::Rapid(to) | Block::Linear { to, .. } = &block {
            if let Some(a) = to.a {
                self.commanded_rotary.0 = Some(self.format.round(a));
            }
            if let Some(c) = to.c {
                self.commanded_rotary.1 = Some(self.format.round(c));
            }
        }
        self.pending.push_back(block);
    }

    fn push_header(&mut self) {
        let config = self.config;
        let name = config.program_identifier();
        let rpm = config.effective_rpm();

        self.push(Block::ProgramOpen {
            name: name.clone(),
            number: config.program_number,
        });
        self.push(Block::Comment(format!("{} {}", name, self.table.name)));
        if config.emit_safe_start {
            self.push(Block::SafeStart);
        }
        self.push(Block::WorkOffset(config.work_offset));
        self.push(Block::ToolChange {
            tool: config.tool_number,
            rpm,
        });
        if config.use_tool_length_comp {
            self.push(Block::ToolLengthComp {
                tool: config.tool_number,
            });
        }
        self.push(Block::SpindleOn {
            rpm,
            direction: SpindleDirection::Clockwise,
        });
        if config.coolant != Coolant::Off {
            self.push(Block::CoolantOn {
                coolant: config.coolant,
                code: config.coolant_code.clone(),
            });
        }
    }

    fn push_footer(&mut self) {
        let config = self.config;
        self.cancel_cycle();
        if self.tilt.take().is_some() {
            self.push(Block::TiltPlaneCancel);
        }
        if config.coolant != Coolant::Off {
            self.push(Block::CoolantOff);
        }
        self.push(Block::SpindleStop);
        self.push(Block::ProgramEnd {
            code: config.program_end.clone(),
        });
        self.push(Block::ProgramClose {
            name: config.program_identifier(),
            number: config.program_number,
        });
    }

    fn push_move(&mut self, index: usize, point: MotionPoint) {
        let hole = CycleKind::for_point(&point);
        let cycle = hole.filter(|_| self.config.use_canned_cycles);
        if cycle.is_none() {
            self.cancel_cycle();
        }
        self.enter_rotary(index, &point);
        let point = match self.tilt {
            Some(orientation) => into_plane_frame(&point, orientation),
            None => point,
        };

        match (point.kind, hole) {
            (MoveKind::Rapid, _) => {
                let to = self.target_position(&point, point.z);
                self.push(Block::Rapid(to));
                self.last_z = Some(point.z);
            }
            (_, Some(kind)) => {
                if cycle.is_some() {
                    self.push_cycle_hole(index, &point, kind);
                } else {
                    self.push_explicit_hole(index, &point, kind);
                }
            }
            // Feed, chamfer and thread-milling moves are plain contour moves
            (_, None) => {
                let feed = self.programmed_feed(index, &point);
                let to = self.target_position(&point, point.z);
                self.linear(to, feed);
                self.last_z = Some(point.z);
            }
        }

        self.leave_rotary(index);
    }

    fn enter_rotary(&mut self, index: usize, point: &MotionPoint) {
        match self.rotary {
            RotaryHandling::Words => {}
            RotaryHandling::Controller(mode) => {
                let starts_here = self.rotary_span.is_some_and(|(first, _)| first == index);
                if starts_here && !self.compensation_active {
                    self.cancel_cycle();
                    self.push(Block::TcpmOn {
                        mode,
                        tool: self.config.tool_number,
                    });
                    self.compensation_active = true;
                }
            }
            RotaryHandling::TiltedPlane => {
                if !point.has_rotary() {
                    return;
                }
                let (a, c) = point.rotary_or_zero();
                let orientation = (self.format.round(a), self.format.round(c));
                let level = orientation == (0.0, 0.0);
                if self.tilt == Some(orientation) || (self.tilt.is_none() && level) {
                    return;
                }
                self.cancel_cycle();
                if self.tilt.take().is_some() {
                    self.push(Block::TiltPlaneCancel);
                }
                if !level {
                    debug!(a = orientation.0, c = orientation.1, "Tilted work plane");
                    self.push(Block::TiltPlane {
                        a_deg: orientation.0,
                        c_deg: orientation.1,
                    });
                    self.tilt = Some(orientation);
                }
            }
        }
    }

    fn leave_rotary(&mut self, index: usize) {
        let RotaryHandling::Controller(mode) = self.rotary else {
            return;
        };
        let ends_here = self.rotary_span.is_some_and(|(_, last)| last == index);
        if ends_here && self.compensation_active {
            self.cancel_cycle();
            self.push(Block::TcpmOff { mode });
            self.compensation_active = false;
            // Turning TCPM off also drops the length offset on ISO controls
            if self.config.use_tool_length_comp {
                self.push(Block::ToolLengthComp {
                    tool: self.config.tool_number,
                });
            }
        }
    }

    /// Target position; rotary words are dropped under a tilted plane
    fn target_position(&self, point: &MotionPoint, z: f64) -> Position {
        let linear = Position::linear(point.x, point.y, z);
        match self.rotary {
            RotaryHandling::TiltedPlane => linear,
            _ => linear.with_rotary(point.a, point.c),
        }
    }

    fn linear(&mut self, to: Position, feed: Option<f64>) {
        let feed = match feed {
            Some(f) if self.modal_feed != Some(f) => {
                self.modal_feed = Some(f);
                Some(f)
            }
            _ => None,
        };
        self.push(Block::Linear { to, feed });
    }

    fn programmed_feed(&mut self, index: usize, point: &MotionPoint) -> Option<f64> {
        match point.feed_rate {
            Some(feed) if feed.is_finite() && feed > 0.0 => Some(self.config.effective_feed(feed)),
            _ => {
                self.push_warning(format!(
                    "Move {} ({}) has no positive feed rate; emitted without F",
                    index, point.kind
                ));
                None
            }
        }
    }

    /// Tap feed is pitch times spindle speed (rigid tapping); the feed
    /// override does not apply to it
    fn hole_feed(&mut self, index: usize, point: &MotionPoint, kind: CycleKind) -> Option<f64> {
        if kind != CycleKind::Tap {
            return self.programmed_feed(index, point);
        }
        match point.tap_pitch_mm {
            Some(pitch) if pitch.is_finite() && pitch > 0.0 => {
                Some(pitch * self.config.effective_rpm())
            }
            _ => {
                self.push_warning(format!(
                    "Tap move {} has no positive pitch; emitted without F",
                    index
                ));
                None
            }
        }
    }

    fn retract_plane(&mut self, index: usize, point: &MotionPoint) -> f64 {
        if let Some(retract) = point.retract_z {
            return retract;
        }
        let fallback = self.last_z.filter(|z| *z > point.z).unwrap_or(point.z);
        self.push_warning(format!(
            "Hole move {} has no retract plane; using Z{}",
            index,
            self.format.coord(fallback)
        ));
        fallback
    }

    fn cancel_cycle(&mut self) {
        if self.active_cycle.take().is_some() {
            self.push(Block::CycleCancel);
            self.modal_feed = None;
        }
    }

    fn record_cycle(&mut self, kind: CycleKind) {
        let code = self.table.cycles.code(kind);
        if !self.cycles_used.iter().any(|used| used == code) {
            debug!(code, "First use of canned cycle");
            self.cycles_used.push(code.to_string());
        }
    }

    /// Whether a hole's A/C differ from what the machine was last told
    fn needs_reorientation(&self, point: &MotionPoint) -> bool {
        if self.rotary == RotaryHandling::TiltedPlane {
            return false;
        }
        let (commanded_a, commanded_c) = self.commanded_rotary;
        let differs = |wanted: Option<f64>, commanded: Option<f64>| {
            wanted.is_some_and(|v| Some(self.format.round(v)) != commanded)
        };
        differs(point.a, commanded_a) || differs(point.c, commanded_c)
    }

    fn push_cycle_hole(&mut self, index: usize, point: &MotionPoint, kind: CycleKind) {
        let retract_z = self.retract_plane(index, point);
        // Cycle location lines carry X/Y only, so reorient before the cycle
        if self.needs_reorientation(point) {
            self.cancel_cycle();
            let above = self.target_position(point, retract_z);
            self.push(Block::Rapid(above));
        }
        let spec = CycleSpec {
            kind,
            bottom_z: point.z,
            retract_z,
            feed: self.hole_feed(index, point, kind),
            peck_mm: point.peck_depth_mm.filter(|p| *p > 0.0),
            dwell_s: point.dwell_s.filter(|d| *d > 0.0),
            pitch_mm: point.tap_pitch_mm,
            rpm: self.config.effective_rpm(),
        };

        if self.active_cycle != Some(spec) {
            self.cancel_cycle();
            self.record_cycle(kind);
            self.push(Block::CycleDefine(spec));
            self.active_cycle = Some(spec);
        }
        self.push(Block::CycleLocation {
            x: point.x,
            y: point.y,
        });
        self.last_z = Some(retract_z);
    }

    fn push_explicit_hole(&mut self, index: usize, point: &MotionPoint, kind: CycleKind) {
        let retract_z = self.retract_plane(index, point);
        let feed = self.hole_feed(index, point, kind);
        let bottom_z = point.z;
        let rpm = self.config.effective_rpm();

        let above = self.target_position(point, retract_z);
        let bottom = self.target_position(point, bottom_z);
        self.push(Block::Rapid(above));

        match kind {
            CycleKind::PeckDrill => {
                let mut peck = point
                    .peck_depth_mm
                    .filter(|p| *p > 0.0)
                    .unwrap_or(retract_z - bottom_z);
                if peck < MIN_PECK_MM {
                    self.push_warning(format!(
                        "Peck depth {} at move {} raised to {} mm",
                        self.format.coord(peck),
                        index,
                        self.format.coord(MIN_PECK_MM)
                    ));
                    peck = MIN_PECK_MM;
                }
                let mut current_z = retract_z;
                while current_z > bottom_z {
                    current_z -= peck;
                    if current_z < bottom_z {
                        current_z = bottom_z;
                    }
                    self.linear(self.target_position(point, current_z), feed);
                    self.push(Block::Rapid(above));
                    if current_z > bottom_z {
                        self.push(Block::Rapid(
                            self.target_position(point, current_z + PECK_CLEARANCE_MM),
                        ));
                    }
                }
            }
            CycleKind::Drill | CycleKind::DwellDrill => {
                self.linear(bottom, feed);
                if let Some(seconds) = point.dwell_s.filter(|_| kind.uses_dwell()) {
                    self.push(Block::Dwell { seconds });
                }
                self.push(Block::Rapid(above));
            }
            CycleKind::Ream => {
                self.linear(bottom, feed);
                self.linear(above, feed);
            }
            CycleKind::Bore => {
                self.linear(bottom, feed);
                self.push(Block::SpindleStop);
                self.push(Block::Rapid(above));
                self.push(Block::SpindleOn {
                    rpm,
                    direction: SpindleDirection::Clockwise,
                });
            }
            CycleKind::DwellBore => {
                self.linear(bottom, feed);
                if let Some(seconds) = point.dwell_s {
                    self.push(Block::Dwell { seconds });
                }
                self.linear(above, feed);
            }
            CycleKind::Tap => {
                self.linear(bottom, feed);
                self.push(Block::SpindleOn {
                    rpm,
                    direction: SpindleDirection::CounterClockwise,
                });
                self.linear(above, feed);
                self.push(Block::SpindleOn {
                    rpm,
                    direction: SpindleDirection::Clockwise,
                });
            }
        }
        self.last_z = Some(retract_z);
    }
}

/// Express a part-frame point in a tilted work plane
///
/// The plane is the part frame turned about X by A, then about Z by C,
/// the order the tilt templates state. Hole retract planes keep their
/// height above the bottom, measured along the tilted tool axis.
fn into_plane_frame(point: &MotionPoint, (a_deg, c_deg): (f64, f64)) -> MotionPoint {
    let plane = Rotation3::from_axis_angle(&Vector3::z_axis(), c_deg.to_radians())
        * Rotation3::from_axis_angle(&Vector3::x_axis(), a_deg.to_radians());
    let local = plane.inverse() * Point3::new(point.x, point.y, point.z);
    let mut moved = point.with_position(local.x, local.y, local.z);
    moved.retract_z = point.retract_z.map(|r| local.z + (r - point.z));
    moved
}

impl Iterator for BlockStream<'_> {
    type Item = Block;

    fn next(&mut self) -> Option<Block> {
        loop {
            if let Some(block) = self.pending.pop_front() {
                return Some(block);
            }
            match self.phase {
                Phase::Header => {
                    self.push_header();
                    self.phase = Phase::Body;
                }
                Phase::Body => {
                    let moves = self.moves;
                    match moves.get(self.next_index) {
                        Some(&point) => {
                            let index = self.next_index;
                            self.next_index += 1;
                            self.push_move(index, point);
                        }
                        None => {
                            self.push_footer();
                            self.phase = Phase::Done;
                        }
                    }
                }
                Phase::Done => return None,
            }
        }
    }
}

/// Rendered, numbered program lines
pub struct LineStream<'a> {
    blocks: BlockStream<'a>,
    dialect: ControllerDialect,
    renderer: &'static dyn BlockRenderer,
    format: NumberFormat,
    next_number: Option<u32>,
    increment: u32,
    pending: VecDeque<String>,
    line_count: usize,
}

impl<'a> LineStream<'a> {
    pub fn new(
        moves: &'a [MotionPoint],
        dialect: ControllerDialect,
        config: &'a PostConfig,
    ) -> Self {
        let renderer = renderer_for(dialect);
        Self {
            blocks: BlockStream::new(moves, config, renderer.table()),
            dialect,
            renderer,
            format: NumberFormat::new(config.decimal_places),
            next_number: config.line_numbers.then_some(config.line_number_start),
            increment: config.line_number_increment,
            pending: VecDeque::new(),
            line_count: 0,
        }
    }

    pub fn controller(&self) -> ControllerDialect {
        self.dialect
    }

    /// Lines yielded so far
    pub fn line_count(&self) -> usize {
        self.line_count
    }

    pub fn warnings(&self) -> &[String] {
        self.blocks.warnings()
    }

    pub fn canned_cycles_used(&self) -> &[String] {
        self.blocks.cycles_used()
    }

    /// Drain any remaining lines and return the run summary
    pub fn finish(mut self) -> PostSummary {
        for _ in self.by_ref() {}
        info!(
            controller = %self.dialect,
            lines = self.line_count,
            cycles = self.blocks.cycles_used.len(),
            warnings = self.blocks.warnings.len(),
            "Post-processing complete"
        );
        PostSummary {
            controller: self.dialect,
            line_count: self.line_count,
            canned_cycles_used: self.blocks.cycles_used,
            warnings: self.blocks.warnings,
        }
    }

    fn decorate(&mut self, text: String, is_comment: bool) -> String {
        let mut line = match self.next_number {
            Some(number) => {
                self.next_number = Some(number.saturating_add(self.increment));
                format!("N{} {}", number, text)
            }
            None => text,
        };
        if !is_comment {
            line.push_str(self.renderer.table().block_terminator);
        }
        line
    }
}

impl Iterator for LineStream<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            if let Some(line) = self.pending.pop_front() {
                self.line_count += 1;
                return Some(line);
            }
            let block = self.blocks.next()?;
            for text in self.renderer.render(&block, &self.format) {
                let line = if block.is_raw() {
                    text
                } else {
                    self.decorate(text, block.is_comment())
                };
                self.pending.push_back(line);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::FANUC;

    fn blocks(moves: &[MotionPoint], config: &PostConfig) -> Vec<Block> {
        BlockStream::new(moves, config, &FANUC).collect()
    }

    #[test]
    fn test_header_and_footer_framing() {
        let config = PostConfig::default();
        let out = blocks(&[], &config);
        assert!(matches!(out.first(), Some(Block::ProgramOpen { .. })));
        assert!(matches!(out.last(), Some(Block::ProgramClose { .. })));
        assert!(out.contains(&Block::SpindleStop));
        assert!(!out.contains(&Block::CoolantOff));
    }

    #[test]
    fn test_modal_feed_is_not_repeated() {
        let config = PostConfig::default();
        let moves = [
            MotionPoint::feed(0.0, 0.0, 0.0, 300.0),
            MotionPoint::feed(10.0, 0.0, 0.0, 300.0),
            MotionPoint::feed(10.0, 10.0, 0.0, 150.0),
        ];
        let feeds: Vec<Option<f64>> = blocks(&moves, &config)
            .into_iter()
            .filter_map(|b| match b {
                Block::Linear { feed, .. } => Some(feed),
                _ => None,
            })
            .collect();
        assert_eq!(feeds, vec![Some(300.0), None, Some(150.0)]);
    }

    #[test]
    fn test_explicit_peck_sequence() {
        let config = PostConfig {
            use_canned_cycles: false,
            ..Default::default()
        };
        let moves = [MotionPoint::drill(5.0, 5.0, -10.0, 2.0, 100.0).with_peck(5.0)];
        let plunges: Vec<f64> = blocks(&moves, &config)
            .into_iter()
            .filter_map(|b| match b {
                Block::Linear { to, .. } => Some(to.z),
                _ => None,
            })
            .collect();
        assert_eq!(plunges, vec![-3.0, -8.0, -10.0]);
    }

    #[test]
    fn test_tiny_explicit_peck_is_raised() {
        let config = PostConfig {
            use_canned_cycles: false,
            ..Default::default()
        };
        let moves = [MotionPoint::drill(5.0, 5.0, -10.0, 2.0, 100.0).with_peck(1e-5)];
        let mut stream = BlockStream::new(&moves, &config, &FANUC);
        let plunges: Vec<f64> = stream
            .by_ref()
            .filter_map(|b| match b {
                Block::Linear { to, .. } => Some(to.z),
                _ => None,
            })
            .collect();
        assert!((120..=121).contains(&plunges.len()));
        assert_eq!(plunges.last(), Some(&-10.0));
        assert_eq!(stream.warnings().len(), 1);
        assert!(stream.warnings()[0].contains("raised to 0.100 mm"));
    }

    #[test]
    fn test_explicit_tap_reverses_spindle() {
        let config = PostConfig {
            use_canned_cycles: false,
            spindle_rpm: 600.0,
            ..Default::default()
        };
        let moves = [MotionPoint::tap(0.0, 0.0, -12.0, 3.0, 1.5)];
        let out = blocks(&moves, &config);
        assert!(out.contains(&Block::SpindleOn {
            rpm: 600.0,
            direction: SpindleDirection::CounterClockwise,
        }));
        let tap_feed = out.iter().find_map(|b| match b {
            Block::Linear { feed: Some(f), .. } => Some(*f),
            _ => None,
        });
        assert_eq!(tap_feed, Some(900.0));
    }

    #[test]
    fn test_missing_retract_falls_back_with_warning() {
        let config = PostConfig::default();
        let mut hole = MotionPoint::drill(0.0, 0.0, -5.0, 2.0, 100.0);
        hole.retract_z = None;
        let moves = [MotionPoint::rapid(0.0, 0.0, 10.0), hole];
        let mut stream = BlockStream::new(&moves, &config, &FANUC);
        let out: Vec<Block> = stream.by_ref().collect();
        let spec = out.iter().find_map(|b| match b {
            Block::CycleDefine(spec) => Some(*spec),
            _ => None,
        });
        assert_eq!(spec.map(|s| s.retract_z), Some(10.0));
        assert_eq!(stream.warnings().len(), 1);
    }

    #[test]
    fn test_line_numbers_skip_framing() {
        let config = PostConfig {
            line_numbers: true,
            line_number_start: 100,
            line_number_increment: 5,
            ..Default::default()
        };
        let lines: Vec<String> = LineStream::new(&[], ControllerDialect::Fanuc, &config).collect();
        assert_eq!(lines[0], "%");
        assert!(lines[1].starts_with("O0001"));
        assert!(lines[2].starts_with("N100 ("));
        assert!(lines[3].starts_with("N105 G90"));
        assert_eq!(lines.last().map(String::as_str), Some("%"));
    }
}
