//! Memory-map parsing and dumping.
//!
//! Reads the process's own memory-map descriptor, filters readable regions,
//! and writes their raw bytes to an output sink. On Linux the descriptor is
//! `/proc/self/maps` and the image is `/proc/self/mem`; both sides are
//! generic so tests can drive the scan with a synthetic descriptor and an
//! in-memory image.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};

/// Upper bound on region start addresses (2^48 - 1). Anything above is
/// non-canonical or kernel-reserved and not worth touching.
pub const ADDR_CEILING: u64 = 0xFFFF_FFFF_FFFF;

/// One mapped address range of the process, as described by the map
/// descriptor. Ephemeral; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryRegion {
    pub start: u64,
    pub end: u64,
    /// First two permission characters, e.g. "rw" or "r-".
    pub perms: String,
}

impl MemoryRegion {
    /// Whether the read bit is set. Only "rw" and "r-" regions are dumped.
    pub fn is_readable(&self) -> bool {
        self.perms == "rw" || self.perms == "r-"
    }

    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Parse one descriptor line of the form
/// `start-end perms offset dev inode [path]` with hexadecimal addresses.
///
/// Returns `None` for lines that don't match; the scan skips those and
/// continues rather than aborting the whole dump.
pub fn parse_map_line(line: &str) -> Option<MemoryRegion> {
    let mut fields = line.split_whitespace();
    let range = fields.next()?;
    let perms = fields.next()?;

    let (start, end) = range.split_once('-')?;
    let start = u64::from_str_radix(start, 16).ok()?;
    let end = u64::from_str_radix(end, 16).ok()?;

    let perms = perms.as_bytes();
    if perms.len() < 2 {
        return None;
    }
    if !matches!(perms[0], b'r' | b'-') || !matches!(perms[1], b'w' | b'-') {
        return None;
    }

    Some(MemoryRegion {
        start,
        end,
        perms: String::from_utf8_lossy(&perms[..2]).into_owned(),
    })
}

/// Counters for one scan.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DumpStats {
    /// Regions whose bytes were written to the sink.
    pub dumped: usize,
    /// Regions passed over: unreadable, out of bounds, unparseable, or
    /// failing mid-read.
    pub skipped: usize,
}

/// Scan the descriptor and write every readable in-bounds region's bytes to
/// `out`, one header line per region followed by the raw bytes.
///
/// Per-region read failures (unmapped mid-read, `EIO`) are logged and the
/// scan continues with the next region. Only sink write failures are fatal.
pub fn dump_regions<M, S, W>(maps: M, mut mem: S, out: &mut W) -> io::Result<DumpStats>
where
    M: BufRead,
    S: Read + Seek,
    W: Write + ?Sized,
{
    let mut stats = DumpStats::default();

    for line in maps.lines() {
        let line = line?;
        let Some(region) = parse_map_line(&line) else {
            tracing::warn!(name: "memdump.line.unparseable", line = %line, "skipping descriptor line");
            stats.skipped += 1;
            continue;
        };

        if region.start > ADDR_CEILING {
            tracing::debug!(name: "memdump.region.out_of_bounds", start = region.start, "skipping region");
            stats.skipped += 1;
            continue;
        }

        if !region.is_readable() {
            tracing::debug!(name: "memdump.region.unreadable", perms = %region.perms, "skipping region");
            stats.skipped += 1;
            continue;
        }

        let mut buf = vec![0u8; region.len() as usize];
        let read = mem
            .seek(SeekFrom::Start(region.start))
            .and_then(|_| mem.read_exact(&mut buf));
        match read {
            Ok(()) => {
                writeln!(out, "{:x}-{:x} {}", region.start, region.end, region.perms)?;
                out.write_all(&buf)?;
                writeln!(out)?;
                stats.dumped += 1;
            }
            Err(err) => {
                tracing::warn!(
                    name: "memdump.region.unreadable_bytes",
                    start = region.start,
                    end = region.end,
                    error = %err,
                    "skipping region"
                );
                stats.skipped += 1;
            }
        }
    }

    writeln!(out, "END")?;
    out.flush()?;
    Ok(stats)
}

/// Dump the current process's own readable memory to `out`.
pub fn dump_self<W: Write + ?Sized>(out: &mut W) -> io::Result<DumpStats> {
    let pid = std::process::id();
    writeln!(out, "PID = {pid}")?;

    let maps = BufReader::new(File::open("/proc/self/maps")?);
    let mem = File::open("/proc/self/mem")?;
    dump_regions(maps, mem, out)
}
