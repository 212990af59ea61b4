//! Log backend that buffers formatted records in RAM.
//!
//! Clock bring-up runs before any serial port is usable, so records go to a
//! ring buffer and are drained to a writer once one exists. When the buffer
//! is full the oldest bytes are overwritten.

use core::cell::RefCell;
use core::fmt::Write as _;

use critical_section::Mutex;
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

/// Bytes of log text kept before the oldest are overwritten.
pub const LOG_CAPACITY: usize = 1024;
/// Longest single line, longer records are truncated.
pub const LINE_LEN: usize = 128;

type Line = heapless::String<LINE_LEN>;

// Buffer accessible from any context
static RING: Mutex<RefCell<Ring>> = Mutex::new(RefCell::new(Ring::new()));
static LOGGER: RingLogger = RingLogger;

/// Log text and the record counter, guarded by a critical section
struct Ring {
    buffer: circular_buffer::CircularBuffer<LOG_CAPACITY, u8>,
    seq: u32,
}

impl Ring {
    const fn new() -> Self {
        Ring {
            buffer: circular_buffer::CircularBuffer::new(),
            seq: 0,
        }
    }

    fn push_line(&mut self, line: &str) {
        for b in line.bytes() {
            self.buffer.push_back(b);
        }
        self.seq = self.seq.wrapping_add(1);
    }

    // Pop up to `chunk.len()` bytes
    fn pop_into(&mut self, chunk: &mut [u8]) -> usize {
        let mut n = 0;
        while n < chunk.len() {
            match self.buffer.pop_front() {
                Some(b) => {
                    chunk[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        n
    }
}

// Keeps what fits and leaves room for the newline
struct Truncating<'a>(&'a mut Line);

impl core::fmt::Write for Truncating<'_> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        for c in s.chars() {
            if self.0.len() + c.len_utf8() >= LINE_LEN {
                break;
            }
            let _ = self.0.push(c);
        }
        Ok(())
    }
}

/// Format one record as `[seq] LEVEL target:line message\n`.
///
/// A line that does not fit is cut short but always ends in a newline.
fn format_line(seq: u32, record: &Record) -> Line {
    let mut line = Line::new();
    let _ = write!(
        Truncating(&mut line),
        "[{seq:05}] {:<5} {}:{} {}",
        record.level(),
        record.target(),
        record.line().unwrap_or(0),
        record.args()
    );
    let _ = line.push('\n');
    line
}

/// The `log` backend writing into the RAM ring.
pub struct RingLogger;

impl Log for RingLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        log_into(&RING, record);
    }

    fn flush(&self) {}
}

fn log_into(ring: &Mutex<RefCell<Ring>>, record: &Record) {
    critical_section::with(|cs| {
        let mut ring = ring.borrow(cs).borrow_mut();
        let line = format_line(ring.seq, record);
        ring.push_line(&line);
    });
}

/// Install the ring logger and set the maximum level.
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER)?;
    log::set_max_level(level);
    Ok(())
}

/// Move all buffered log text to `out`, returning the number of bytes.
///
/// The critical section is held only while a chunk is copied out, never
/// while `out` is written.
pub fn drain<W: embedded_io::Write>(out: &mut W) -> Result<usize, W::Error> {
    drain_from(&RING, out)
}

fn drain_from<W: embedded_io::Write>(ring: &Mutex<RefCell<Ring>>, out: &mut W) -> Result<usize, W::Error> {
    let mut total = 0;
    loop {
        let mut chunk = [0u8; 32];
        let n = critical_section::with(|cs| ring.borrow(cs).borrow_mut().pop_into(&mut chunk));
        if n == 0 {
            return Ok(total);
        }
        out.write_all(&chunk[..n])?;
        total += n;
    }
}
