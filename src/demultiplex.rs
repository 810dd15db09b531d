//! Re-framing of a raw byte stream into transport stream packets, and dispatch of the packets
//! carrying PAT, PMT and EISS tables to the corresponding section decoders.
//!
//! The caller pushes arbitrarily sized chunks to [`TsParser::feed()`](struct.TsParser.html#method.feed)
//! and receives callbacks on a [`StreamTracker`](trait.StreamTracker.html) whenever a PID of
//! interest is first seen.

use crate::cursor::ByteCursor;
use crate::packet::{Packet, Pid};
use crate::psi::eiss::{self, EissTable};
use crate::psi::pat::ProgramAssociation;
use crate::psi::pmt::ProgramMap;
use crate::psi::SectionBuffer;
use fixedbitset::FixedBitSet;
use log::{debug, info, warn};

/// Receives notifications from a [`TsParser`](struct.TsParser.html).
pub trait StreamTracker {
    /// Called once for each PMT or elementary stream PID, the first time it is announced.
    fn stream_discovered(&mut self, pid: Pid);

    /// Called for every packet the parser frames, before its tables are processed.
    fn packet(&mut self, _pk: &Packet<'_>) {}
}

/// A `StreamTracker` which ignores all notifications.
#[derive(Default, Debug)]
pub struct NullStreamTracker;

impl StreamTracker for NullStreamTracker {
    fn stream_discovered(&mut self, _pid: Pid) {}
}

/// Settings for a [`TsParser`](struct.TsParser.html).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TsParserConfig {
    /// How many occurrences of each table type (PAT, PMT, EISS) are dumped at `info` level.
    pub table_dump_limit: usize,
}

impl Default for TsParserConfig {
    fn default() -> Self {
        TsParserConfig {
            table_dump_limit: 10,
        }
    }
}

/// Packet and continuity counts for one PID.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PidStats {
    pub packets: u64,
    /// Payload-carrying packets whose continuity_counter did not follow on from the previous
    /// one.  A repeated counter value (a permitted duplicate packet) is not counted.
    pub discontinuities: u64,
    last_cc: Option<u8>,
}

impl PidStats {
    fn update(&mut self, pk: &Packet<'_>) {
        self.packets += 1;
        if !pk.adaptation_control().has_payload() {
            return;
        }
        let cc = pk.continuity_counter();
        if let Some(last) = self.last_cc {
            if cc != last && cc != (last + 1) & 0x0f {
                self.discontinuities += 1;
            }
        }
        self.last_cc = Some(cc);
    }
}

/// Whole-stream counters.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParserStats {
    /// Complete packets handed on for processing.
    pub packets: u64,
    /// Packets abandoned because the byte after them was not a sync byte.
    pub dropped_packets: u64,
    /// Bytes discarded while looking for a sync byte.
    pub skipped_bytes: u64,
    /// Bytes read by packet processing; always `Packet::SIZE` per processed packet.
    pub bytes_consumed: u64,
    pub pat_sections: u64,
    pub pmt_sections: u64,
    pub eiss_sections: u64,
    /// Sections which failed to decode.
    pub table_errors: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableKind {
    Pat,
    Pmt,
    Eiss(usize),
}

impl TableKind {
    fn dump_slot(self) -> usize {
        match self {
            TableKind::Pat => 0,
            TableKind::Pmt => 1,
            TableKind::Eiss(_) => 2,
        }
    }
}

/// One reassembly buffer per table the parser follows.
#[derive(Default)]
struct Sections {
    pat: SectionBuffer,
    pmt: SectionBuffer,
    eiss: [SectionBuffer; 2],
}

impl Sections {
    fn get(&mut self, kind: TableKind) -> &mut SectionBuffer {
        match kind {
            TableKind::Pat => &mut self.pat,
            TableKind::Pmt => &mut self.pmt,
            TableKind::Eiss(i) => &mut self.eiss[i],
        }
    }

    fn reset(&mut self) {
        self.pat.reset();
        self.pmt.reset();
        for b in self.eiss.iter_mut() {
            b.reset();
        }
    }
}

/// What has been learned about the stream from its tables.
struct TableState {
    table_dump_limit: usize,
    dumped: [usize; 3],
    pmt_pid: Option<Pid>,
    eiss_pids: [Option<Pid>; 2],
    program_map: Option<ProgramMap>,
    eiss: Option<EissTable>,
    reported: FixedBitSet,
}

impl TableState {
    fn new(table_dump_limit: usize) -> TableState {
        TableState {
            table_dump_limit,
            dumped: [0; 3],
            pmt_pid: None,
            eiss_pids: [None, None],
            program_map: None,
            eiss: None,
            reported: FixedBitSet::with_capacity(Pid::PID_COUNT),
        }
    }

    fn kind_of(&self, pid: Pid) -> Option<TableKind> {
        if pid == Pid::PAT {
            Some(TableKind::Pat)
        } else if Some(pid) == self.pmt_pid {
            Some(TableKind::Pmt)
        } else if Some(pid) == self.eiss_pids[0] {
            Some(TableKind::Eiss(0))
        } else if Some(pid) == self.eiss_pids[1] {
            Some(TableKind::Eiss(1))
        } else {
            None
        }
    }

    /// Returns true if this occurrence of the table type should be dumped.
    fn should_dump(&mut self, kind: TableKind) -> bool {
        let slot = &mut self.dumped[kind.dump_slot()];
        if *slot < self.table_dump_limit {
            *slot += 1;
            true
        } else {
            false
        }
    }

    fn report<T: StreamTracker>(reported: &mut FixedBitSet, tracker: &mut T, pid: Pid) {
        if !reported.put(usize::from(pid)) {
            tracker.stream_discovered(pid);
        }
    }

    /// Handles one complete section.  Returns true if the PIDs carrying tables changed.
    fn section<T: StreamTracker>(
        &mut self,
        tracker: &mut T,
        stats: &mut ParserStats,
        kind: TableKind,
        section: &[u8],
    ) -> bool {
        match kind {
            TableKind::Pat => self.pat_section(tracker, stats, section),
            TableKind::Pmt => self.pmt_section(tracker, stats, section),
            TableKind::Eiss(i) => {
                self.eiss_section(stats, i, section);
                false
            }
        }
    }

    fn pat_section<T: StreamTracker>(
        &mut self,
        tracker: &mut T,
        stats: &mut ParserStats,
        section: &[u8],
    ) -> bool {
        let pat = match ProgramAssociation::parse(section) {
            Ok(pat) => pat,
            Err(e) => {
                warn!("PAT: {}", e);
                stats.table_errors += 1;
                return false;
            }
        };
        stats.pat_sections += 1;
        if self.should_dump(TableKind::Pat) {
            info!(
                "PAT: transport_stream_id={} version={} programs={} program_number={:?} pmt_pid={:?} network_pid={:?}",
                pat.header.id,
                pat.header.version,
                pat.program_count,
                pat.program_number,
                pat.pmt_pid,
                pat.network_pid
            );
        }
        match pat.pmt_pid {
            Some(pid) if self.pmt_pid != Some(pid) => {
                if let Some(old) = self.pmt_pid {
                    info!("PMT moved from {} to {}", old, pid);
                }
                self.pmt_pid = Some(pid);
                Self::report(&mut self.reported, tracker, pid);
                true
            }
            _ => false,
        }
    }

    fn pmt_section<T: StreamTracker>(
        &mut self,
        tracker: &mut T,
        stats: &mut ParserStats,
        section: &[u8],
    ) -> bool {
        let reported = &mut self.reported;
        let result = ProgramMap::parse_with(section, |s| {
            Self::report(&mut *reported, &mut *tracker, s.elementary_pid)
        });
        let pmt = match result {
            Ok(pmt) => pmt,
            Err(e) => {
                warn!("PMT: {}", e);
                stats.table_errors += 1;
                return false;
            }
        };
        stats.pmt_sections += 1;
        if self.should_dump(TableKind::Pmt) {
            info!(
                "PMT: program_number={} version={} pcr_pid={} descriptors={}/{} streams={}/{}",
                pmt.header.id,
                pmt.header.version,
                pmt.pcr_pid,
                pmt.descriptors.len(),
                pmt.descriptors.seen(),
                pmt.streams.len(),
                pmt.streams.seen()
            );
            for d in pmt.descriptors.iter() {
                info!("  program descriptor {:?}", d);
            }
            for s in pmt.streams.iter() {
                info!(
                    "  stream pid={} type={:?} es_info_length={} descriptor={:?}",
                    s.elementary_pid, s.stream_type, s.es_info_length, s.descriptor
                );
            }
        }
        let changed = pmt.eiss_pids != self.eiss_pids;
        if changed {
            info!("EISS PIDs {:?}", pmt.eiss_pids);
            self.eiss_pids = pmt.eiss_pids;
        }
        self.program_map = Some(pmt);
        changed
    }

    fn eiss_section(&mut self, stats: &mut ParserStats, index: usize, section: &[u8]) {
        let table_id = match section.first() {
            Some(&id) => id,
            None => return,
        };
        if !eiss::is_eiss_table_id(table_id) {
            debug!("skipping table_id {:#04x} on EISS PID", table_id);
            return;
        }
        match EissTable::parse(section) {
            Ok(table) => {
                stats.eiss_sections += 1;
                if self.should_dump(TableKind::Eiss(index)) {
                    info!("EISS {}: {:?}", index + 1, table);
                }
                self.eiss = Some(table);
            }
            Err(e) => {
                warn!("EISS {}: {}", index + 1, e);
                stats.table_errors += 1;
            }
        }
    }
}

/// Frames packets out of a byte stream and decodes the PAT, the PMT it points to, and any EISS
/// tables the PMT announces.
///
/// Only one program is followed.  If the PAT lists several, the last is used.
///
/// # Framing
///
/// A packet is accepted once its 188 bytes have been buffered *and* the byte which follows is
/// another sync byte.  A `0x47` byte part way through a packet is always taken as payload, so if
/// the parser locked on to a false sync byte the error only shows when the byte after the
/// 188th is not `0x47`; the buffered bytes are then dropped and the parser waits for the next
/// sync byte.  Because a packet waits for the next sync byte, call
/// [`flush()`](#method.flush) at the end of the stream.
pub struct TsParser {
    packet: [u8; Packet::SIZE],
    index: usize,
    sections: Sections,
    tables: TableState,
    pid_stats: Vec<PidStats>,
    stats: ParserStats,
}

impl Default for TsParser {
    fn default() -> Self {
        TsParser::with_config(TsParserConfig::default())
    }
}

impl TsParser {
    pub fn new() -> TsParser {
        Self::default()
    }

    pub fn with_config(config: TsParserConfig) -> TsParser {
        TsParser {
            packet: [0; Packet::SIZE],
            index: 0,
            sections: Sections::default(),
            tables: TableState::new(config.table_dump_limit),
            pid_stats: vec![PidStats::default(); Pid::PID_COUNT],
            stats: ParserStats::default(),
        }
    }

    /// Consumes the given chunk, which need not begin or end on a packet boundary.
    pub fn feed<T: StreamTracker>(&mut self, tracker: &mut T, chunk: &[u8]) {
        for &b in chunk {
            if self.index == 0 {
                if Packet::is_sync_byte(b) {
                    self.packet[0] = b;
                    self.index = 1;
                } else {
                    self.stats.skipped_bytes += 1;
                }
            } else if self.index == Packet::SIZE {
                if Packet::is_sync_byte(b) {
                    self.dispatch(tracker);
                    self.packet[0] = b;
                    self.index = 1;
                } else {
                    debug!(
                        "lost sync: byte {:#04x} follows packet for {:?}",
                        b,
                        Packet::new(&self.packet[..]).pid()
                    );
                    self.stats.dropped_packets += 1;
                    self.stats.skipped_bytes += 1;
                    self.index = 0;
                }
            } else {
                self.packet[self.index] = b;
                self.index += 1;
            }
        }
    }

    /// Processes a fully buffered packet which is still waiting for the following sync byte.
    /// Any partial packet is kept.
    pub fn flush<T: StreamTracker>(&mut self, tracker: &mut T) {
        if self.index == Packet::SIZE {
            self.dispatch(tracker);
            self.index = 0;
        }
    }

    /// Forgets everything learned so far, as at the start of a new stream.
    pub fn reset(&mut self) {
        self.index = 0;
        self.sections.reset();
        self.tables = TableState::new(self.tables.table_dump_limit);
        for s in self.pid_stats.iter_mut() {
            *s = PidStats::default();
        }
        self.stats = ParserStats::default();
    }

    /// The PMT PID announced by the most recent PAT.
    pub fn pmt_pid(&self) -> Option<Pid> {
        self.tables.pmt_pid
    }

    /// PIDs of the first two ETV signaling streams listed in the most recent PMT.
    pub fn eiss_pids(&self) -> [Option<Pid>; 2] {
        self.tables.eiss_pids
    }

    /// The most recently decoded PMT.
    pub fn program_map(&self) -> Option<&ProgramMap> {
        self.tables.program_map.as_ref()
    }

    /// The most recently decoded EISS table.
    pub fn eiss(&self) -> Option<&EissTable> {
        self.tables.eiss.as_ref()
    }

    pub fn pid_stats(&self, pid: Pid) -> &PidStats {
        &self.pid_stats[usize::from(pid)]
    }

    pub fn stats(&self) -> &ParserStats {
        &self.stats
    }

    /// Logs the counters gathered so far; intended for stream teardown.
    pub fn log_summary(&self) {
        info!(
            "{} packets, {} dropped, {} bytes skipped, {} PAT / {} PMT / {} EISS sections, {} table errors",
            self.stats.packets,
            self.stats.dropped_packets,
            self.stats.skipped_bytes,
            self.stats.pat_sections,
            self.stats.pmt_sections,
            self.stats.eiss_sections,
            self.stats.table_errors
        );
        for (pid, s) in self.pid_stats.iter().enumerate() {
            if s.packets > 0 {
                info!(
                    "  pid {:#06x}: {} packets, {} discontinuities",
                    pid, s.packets, s.discontinuities
                );
            }
        }
    }

    fn dispatch<T: StreamTracker>(&mut self, tracker: &mut T) {
        let buf = self.packet;
        let pk = Packet::new(&buf[..]);
        self.stats.packets += 1;
        self.pid_stats[usize::from(pk.pid())].update(&pk);
        tracker.packet(&pk);

        let mut r = ByteCursor::new(&buf[..]);
        r.skip(Packet::HEADER_SIZE);
        if let Some(kind) = self.tables.kind_of(pk.pid()) {
            if pk.transport_error_indicator() {
                debug!("{:?}: transport_error_indicator set, ignoring payload", pk.pid());
            } else if pk.adaptation_control().has_payload() {
                self.payload(tracker, kind, &pk, &mut r);
            }
        }
        let consumed = r.position() + r.skip_to_end();
        debug_assert_eq!(consumed, Packet::SIZE);
        self.stats.bytes_consumed += consumed as u64;
    }

    fn payload<T: StreamTracker>(
        &mut self,
        tracker: &mut T,
        kind: TableKind,
        pk: &Packet<'_>,
        r: &mut ByteCursor<'_>,
    ) {
        if pk.adaptation_control().has_adaptation_field() {
            let len = match r.read_u8() {
                Some(l) => usize::from(l),
                None => return,
            };
            if r.skip(len) < len {
                warn!(
                    "{:?}: adaptation_field_length {} overruns packet",
                    pk.pid(),
                    len
                );
                return;
            }
        }
        if pk.payload_unit_start_indicator() {
            let pointer = match r.read_u8() {
                Some(p) => usize::from(p),
                None => return,
            };
            let before = match r.read_slice(pointer) {
                Some(s) => s,
                None => {
                    warn!("{:?}: pointer_field {} overruns packet", pk.pid(), pointer);
                    self.sections.get(kind).reset();
                    return;
                }
            };
            // bytes ahead of the pointer finish the section begun in an earlier packet
            if !before.is_empty() && self.sections.get(kind).extend(before) {
                self.complete(tracker, kind);
            }
            if self.sections.get(kind).start(r.rest()) {
                self.complete(tracker, kind);
            }
        } else if self.sections.get(kind).extend(r.rest()) {
            self.complete(tracker, kind);
        }
    }

    fn complete<T: StreamTracker>(&mut self, tracker: &mut T, kind: TableKind) {
        let section = match kind {
            TableKind::Pat => self.sections.pat.section(),
            TableKind::Pmt => self.sections.pmt.section(),
            TableKind::Eiss(i) => self.sections.eiss[i].section(),
        };
        let changed = self
            .tables
            .section(tracker, &mut self.stats, kind, section);
        if changed {
            match kind {
                TableKind::Pat => self.sections.pmt.reset(),
                TableKind::Pmt => {
                    for b in self.sections.eiss.iter_mut() {
                        b.reset();
                    }
                }
                TableKind::Eiss(_) => (),
            }
        }
    }
}
