//! Host command line.
//!
//! Bytes from the host link are queued by the receive interrupt and split into lines by the main
//! loop. Commands match the whole line exactly.

use heapless::{Deque, Vec};

pub const BUFFER_SIZE: usize = 80;

pub type Line = Vec<u8, BUFFER_SIZE>;

/// Commands understood on the host link.
///
/// `ProfileGet`, `OvenCalibrate` and `ProfileCalibrate` are accepted and do nothing.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// `**BOOT`: hand over to the bootloader.
    Boot,
    /// `**OGET`: report the oven settings.
    OvenSettings,
    /// `**PGET=`
    ProfileGet,
    /// `**OCAL`
    OvenCalibrate,
    /// `**PCAL=`
    ProfileCalibrate,
}

impl Command {
    pub fn parse(line: &[u8]) -> Option<Self> {
        match line {
            b"**BOOT" => Some(Self::Boot),
            b"**OGET" => Some(Self::OvenSettings),
            b"**PGET=" => Some(Self::ProfileGet),
            b"**OCAL" => Some(Self::OvenCalibrate),
            b"**PCAL=" => Some(Self::ProfileCalibrate),
            _ => None,
        }
    }
}

/// Received bytes waiting to be split into lines.
pub struct LineBuffer {
    buffer: Deque<u8, BUFFER_SIZE>,
    /// Set after an overflow until the next newline, so the rest of that line is dropped too.
    discarding: bool,
}

impl LineBuffer {
    pub const fn new() -> Self {
        Self {
            buffer: Deque::new(),
            discarding: false,
        }
    }

    /// Queue one byte. Returns `false` if the byte overflowed the buffer and its line was dropped.
    pub fn push(&mut self, b: u8) -> bool {
        if self.discarding {
            if is_newline(b) {
                self.discarding = false;
            }
            return false;
        }

        if self.buffer.push_back(b).is_ok() {
            return true;
        }

        warn!("terminal: line too long, dropped");
        // Keep complete lines, drop the partial one
        while self.buffer.back().is_some_and(|b| !is_newline(*b)) {
            self.buffer.pop_back();
        }
        self.discarding = !is_newline(b);
        false
    }

    /// Pop the next complete, non-empty line without its terminator.
    pub fn next_line(&mut self) -> Option<Line> {
        loop {
            let idx = self.buffer.iter().position(|b| is_newline(*b))?;

            let mut line = Line::new();
            for _ in 0..idx {
                if let Some(b) = self.buffer.pop_front() {
                    // Cannot fail, the line is shorter than the buffer
                    let _ = line.push(b);
                }
            }
            // Terminator
            self.buffer.pop_front();

            if !line.is_empty() {
                return Some(line);
            }
        }
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
pub const fn is_newline(b: u8) -> bool {
    b == b'\n' || b == b'\r'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(buffer: &mut LineBuffer, bytes: &[u8]) {
        for b in bytes {
            buffer.push(*b);
        }
    }

    #[test]
    fn parses_exact_commands() {
        assert_eq!(Command::parse(b"**BOOT"), Some(Command::Boot));
        assert_eq!(Command::parse(b"**OGET"), Some(Command::OvenSettings));
        assert_eq!(Command::parse(b"**PGET="), Some(Command::ProfileGet));
        assert_eq!(Command::parse(b"**OCAL"), Some(Command::OvenCalibrate));
        assert_eq!(Command::parse(b"**PCAL="), Some(Command::ProfileCalibrate));

        assert_eq!(Command::parse(b"**boot"), None);
        assert_eq!(Command::parse(b"**OGET "), None);
        assert_eq!(Command::parse(b"**PGET=1"), None);
        assert_eq!(Command::parse(b""), None);
    }

    #[test]
    fn splits_lines() {
        let mut buffer = LineBuffer::new();
        feed(&mut buffer, b"**OGET\r\n**BO");
        assert_eq!(buffer.next_line().unwrap(), b"**OGET");
        assert_eq!(buffer.next_line(), None);

        feed(&mut buffer, b"OT\n");
        assert_eq!(buffer.next_line().unwrap(), b"**BOOT");
        assert_eq!(buffer.next_line(), None);
        assert!(buffer.buffer.is_empty());
    }

    #[test]
    fn skips_empty_lines() {
        let mut buffer = LineBuffer::new();
        feed(&mut buffer, b"\r\n\n\rabc\r");
        assert_eq!(buffer.next_line().unwrap(), b"abc");
        assert_eq!(buffer.next_line(), None);
    }

    #[test]
    fn overflow_drops_only_the_long_line() {
        let mut buffer = LineBuffer::new();
        feed(&mut buffer, b"**OGET\n");
        for _ in 0..2 * BUFFER_SIZE {
            buffer.push(b'x');
        }
        feed(&mut buffer, b"\n**BOOT\n");

        assert_eq!(buffer.next_line().unwrap(), b"**OGET");
        assert_eq!(buffer.next_line().unwrap(), b"**BOOT");
        assert_eq!(buffer.next_line(), None);
    }

    #[test]
    fn push_reports_overflow() {
        let mut buffer = LineBuffer::new();
        for _ in 0..BUFFER_SIZE {
            assert!(buffer.push(b'x'));
        }
        assert!(!buffer.push(b'x'));
        assert!(buffer.buffer.is_empty());
        assert!(!buffer.push(b'y'));
        assert!(!buffer.push(b'\n'));
        assert!(buffer.push(b'z'));
    }
}
