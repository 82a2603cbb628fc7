//! ardpicprog-dummy - Emulated ProgramPIC programmer for testing
//!
//! This crate provides a [`Transport`] that behaves like a programmer
//! running ProgramPIC 1.x firmware with a PIC in its socket, entirely in
//! memory. It's useful for testing and development without real hardware.

use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use ardpicprog_core::device::{
    KEY_CONFIG_RANGE, KEY_DATA_BITS, KEY_DATA_RANGE, KEY_DEVICE_ID, KEY_DEVICE_NAME,
    KEY_PROGRAM_BITS, KEY_PROGRAM_RANGE, KEY_RESERVED_RANGE,
};
use ardpicprog_core::AddressRange;
use ardpicprog_serial::{Result, Transport};

/// Words per READBIN packet sent by the emulator
const READ_PACKET_WORDS: usize = 32;

/// A device the emulated programmer knows about
#[derive(Debug, Clone)]
pub struct DummyDevice {
    /// Device name
    pub name: String,
    /// 4-digit device ID, `None` if the device cannot be identified
    pub id: Option<String>,
    /// Program memory
    pub program_range: AddressRange,
    /// Program word width
    pub program_bits: u32,
    /// Id words and fuses
    pub config_range: AddressRange,
    /// Data memory
    pub data_range: AddressRange,
    /// Data word width
    pub data_bits: u32,
    /// Calibration words
    pub reserved_range: AddressRange,
}

impl DummyDevice {
    /// PIC12F675: 1K program words, OSCCAL in the last word, 128 bytes EEPROM
    pub fn pic12f675() -> Self {
        Self {
            name: "pic12f675".into(),
            id: Some("0FC0".into()),
            program_range: AddressRange::with_end(0x0000, 0x03FF),
            program_bits: 14,
            config_range: AddressRange::with_end(0x2000, 0x2007),
            data_range: AddressRange::with_end(0x2100, 0x217F),
            data_bits: 8,
            reserved_range: AddressRange::with_end(0x03FF, 0x03FF),
        }
    }

    /// PIC16F628A: 2K program words, 128 bytes EEPROM, no calibration word
    pub fn pic16f628a() -> Self {
        Self {
            name: "pic16f628a".into(),
            id: Some("1060".into()),
            program_range: AddressRange::with_end(0x0000, 0x07FF),
            program_bits: 14,
            config_range: AddressRange::with_end(0x2000, 0x2007),
            data_range: AddressRange::with_end(0x2100, 0x217F),
            data_bits: 8,
            reserved_range: AddressRange::empty(0x0800),
        }
    }

    /// PIC16F84: no device ID, must be selected by name
    pub fn pic16f84() -> Self {
        Self {
            name: "pic16f84".into(),
            id: None,
            program_range: AddressRange::with_end(0x0000, 0x03FF),
            program_bits: 14,
            config_range: AddressRange::with_end(0x2000, 0x2007),
            data_range: AddressRange::with_end(0x2100, 0x213F),
            data_bits: 8,
            reserved_range: AddressRange::empty(0x0400),
        }
    }

    fn full_word(&self, addr: u32) -> u16 {
        let bits = if self.data_range.contains(addr) {
            self.data_bits
        } else {
            self.program_bits
        };
        ((1u32 << bits.min(16)) - 1) as u16
    }

    fn details(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("{}: {}\n", KEY_DEVICE_NAME, self.name));
        out.push_str(&format!(
            "{}: {}\n",
            KEY_DEVICE_ID,
            self.id.as_deref().unwrap_or("0000")
        ));
        let ranges = [
            (KEY_PROGRAM_RANGE, self.program_range),
            (KEY_CONFIG_RANGE, self.config_range),
            (KEY_DATA_RANGE, self.data_range),
            (KEY_RESERVED_RANGE, self.reserved_range),
        ];
        for (key, range) in ranges {
            if !range.is_empty() {
                out.push_str(&format!("{}: {}\n", key, range));
            }
        }
        out.push_str(&format!("{}: {}\n", KEY_PROGRAM_BITS, self.program_bits));
        out.push_str(&format!("{}: {}\n", KEY_DATA_BITS, self.data_bits));
        out
    }
}

/// Configuration for the emulated programmer
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Reply to `PROGRAM_PIC_VERSION`
    pub version: String,
    /// Number of version polls to ignore before answering
    pub silent_polls: usize,
    /// Devices the firmware supports
    pub catalog: Vec<DummyDevice>,
    /// Index into `catalog` of the device in the socket, `None` if empty
    pub socket: Option<usize>,
    /// `PENDING` lines sent before an erase completes
    pub erase_pending: usize,
    /// Initial contents of the calibration words
    pub calibration: u16,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            version: "ProgramPIC 1.0".into(),
            silent_polls: 0,
            catalog: vec![
                DummyDevice::pic12f675(),
                DummyDevice::pic16f628a(),
                DummyDevice::pic16f84(),
            ],
            socket: Some(0),
            erase_pending: 2,
            calibration: 0x3480,
        }
    }
}

enum Mode {
    Command,
    WriteBin { next: u32, force: bool },
}

/// Emulated programmer
///
/// Bytes written to it are parsed as commands; replies are queued and
/// handed out by [`Transport::read`]. Unset words read as erased.
pub struct DummyProgrammer {
    config: DummyConfig,
    selected: Option<usize>,
    memory: BTreeMap<u32, u16>,
    rx: Vec<u8>,
    tx: VecDeque<u8>,
    mode: Mode,
    commands: Vec<String>,
    timeout: Duration,
    open: bool,
    powered: bool,
}

impl DummyProgrammer {
    /// Create a new emulator with the given configuration
    pub fn new(config: DummyConfig) -> Self {
        let mut memory = BTreeMap::new();
        if let Some(device) = config.socket.and_then(|i| config.catalog.get(i)) {
            for addr in device.reserved_range.addresses() {
                memory.insert(addr, config.calibration);
            }
        }
        Self {
            config,
            selected: None,
            memory,
            rx: Vec::new(),
            tx: VecDeque::new(),
            mode: Mode::Command,
            commands: Vec::new(),
            timeout: Duration::ZERO,
            open: true,
            powered: false,
        }
    }

    /// Create an emulator with a PIC12F675 in the socket
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Word stored at `addr` on the socketed device
    pub fn word(&self, addr: u32) -> u16 {
        match self.memory.get(&addr) {
            Some(&w) => w,
            None => self.socket_device().map_or(0xFFFF, |d| d.full_word(addr)),
        }
    }

    /// Store a word directly, bypassing the protocol
    pub fn set_word(&mut self, addr: u32, word: u16) {
        self.memory.insert(addr, word);
    }

    /// Every command line received, in order
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    /// Current receive timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether the socket is powered
    pub fn is_powered(&self) -> bool {
        self.powered
    }

    fn socket_device(&self) -> Option<&DummyDevice> {
        self.config.socket.and_then(|i| self.config.catalog.get(i))
    }

    fn selected_device(&self) -> Option<&DummyDevice> {
        self.selected.and_then(|i| self.config.catalog.get(i))
    }

    fn reply(&mut self, text: &str) {
        self.tx.extend(text.as_bytes());
    }

    fn process(&mut self) {
        loop {
            match self.mode {
                Mode::Command => {
                    let Some(end) = self.rx.iter().position(|&b| b == b'\n') else {
                        return;
                    };
                    let line: Vec<u8> = self.rx.drain(..=end).collect();
                    let line = String::from_utf8_lossy(&line);
                    let line = line.trim_end_matches(['\n', '\r']).to_string();
                    self.handle_command(&line);
                }
                Mode::WriteBin { next, force } => {
                    let Some(&len) = self.rx.first() else {
                        return;
                    };
                    let len = len as usize;
                    if self.rx.len() < len + 1 {
                        return;
                    }
                    let packet: Vec<u8> = self.rx.drain(..=len).skip(1).collect();
                    if len == 0 {
                        log::trace!("dummy: WRITEBIN done");
                        self.mode = Mode::Command;
                    } else {
                        let words: Vec<u16> = packet
                            .chunks_exact(2)
                            .map(|p| u16::from_le_bytes([p[0], p[1]]))
                            .collect();
                        self.store(next, &words, force);
                        self.mode = Mode::WriteBin {
                            next: next + words.len() as u32,
                            force,
                        };
                    }
                    self.reply("OK\n");
                }
            }
        }
    }

    fn handle_command(&mut self, line: &str) {
        log::trace!("dummy: command '{}'", line);
        self.commands.push(line.to_string());

        let mut tokens = line.split_whitespace();
        let Some(cmd) = tokens.next() else {
            return;
        };
        let args: Vec<&str> = tokens.collect();

        match cmd {
            "PROGRAM_PIC_VERSION" => {
                if self.config.silent_polls > 0 {
                    self.config.silent_polls -= 1;
                } else {
                    let version = format!("{}\n", self.config.version);
                    self.reply(&version);
                }
            }
            "DEVICE" => self.cmd_device(),
            "DEVICES" => self.cmd_devices(),
            "SETDEVICE" => self.cmd_setdevice(&args),
            "READBIN" => self.cmd_readbin(&args),
            "WRITEBIN" => self.cmd_writebin(&args),
            "WRITE" => self.cmd_write(&args),
            "ERASE" => self.cmd_erase(&args),
            "PWROFF" => {
                self.powered = false;
                self.reply("OK\n");
            }
            _ => self.reply("ERROR\n"),
        }
    }

    fn cmd_device(&mut self) {
        let Some(index) = self.config.socket else {
            self.reply("ERROR\n");
            return;
        };
        self.powered = true;
        let Some(device) = self.config.catalog.get(index) else {
            self.reply("ERROR\n");
            return;
        };
        if device.id.is_some() {
            let details = device.details();
            self.selected = Some(index);
            self.reply("OK\n");
            self.reply(&details);
        } else {
            self.reply("OK\nDeviceID: 0000\n");
        }
        self.reply(".\n");
    }

    fn cmd_devices(&mut self) {
        let mut out = String::from("OK\n");
        for device in &self.config.catalog {
            out.push_str(&device.name);
            if device.id.is_some() {
                out.push('*');
            }
            out.push('\n');
        }
        out.push_str(".\n");
        self.reply(&out);
    }

    fn cmd_setdevice(&mut self, args: &[&str]) {
        let found = args.first().and_then(|name| {
            self.config
                .catalog
                .iter()
                .position(|d| d.name.eq_ignore_ascii_case(name))
        });
        match found {
            Some(index) => {
                self.selected = Some(index);
                let details = self.config.catalog[index].details();
                self.reply("OK\n");
                self.reply(&details);
                self.reply(".\n");
            }
            None => self.reply("ERROR\n"),
        }
    }

    fn cmd_readbin(&mut self, args: &[&str]) {
        let range = args
            .first()
            .and_then(|arg| arg.split_once('-'))
            .and_then(|(s, e)| {
                Some((
                    u32::from_str_radix(s, 16).ok()?,
                    u32::from_str_radix(e, 16).ok()?,
                ))
            });
        let (Some((start, end)), true) = (range, self.selected.is_some()) else {
            self.reply("ERROR\n");
            return;
        };

        self.reply("OK\n");
        let words: Vec<u16> = (start..=end).map(|addr| self.word(addr)).collect();
        for chunk in words.chunks(READ_PACKET_WORDS) {
            self.tx.push_back((chunk.len() * 2) as u8);
            for word in chunk {
                self.tx.extend(word.to_le_bytes());
            }
        }
        self.tx.push_back(0);
    }

    fn parse_write_args<'a>(args: &'a [&'a str]) -> Option<(bool, u32, &'a [&'a str])> {
        let (force, rest) = match args.first() {
            Some(&"FORCE") => (true, &args[1..]),
            _ => (false, args),
        };
        let (addr, rest) = rest.split_first()?;
        let addr = u32::from_str_radix(addr, 16).ok()?;
        Some((force, addr, rest))
    }

    fn cmd_writebin(&mut self, args: &[&str]) {
        match Self::parse_write_args(args) {
            Some((force, next, [])) if self.selected.is_some() => {
                self.mode = Mode::WriteBin { next, force };
                self.reply("OK\n");
            }
            _ => self.reply("ERROR\n"),
        }
    }

    fn cmd_write(&mut self, args: &[&str]) {
        let parsed = Self::parse_write_args(args).and_then(|(force, addr, rest)| {
            let words = rest
                .iter()
                .map(|w| u16::from_str_radix(w, 16).ok())
                .collect::<Option<Vec<u16>>>()?;
            Some((force, addr, words))
        });
        match parsed {
            Some((force, addr, words)) if self.selected.is_some() && !words.is_empty() => {
                self.store(addr, &words, force);
                self.reply("OK\n");
            }
            _ => self.reply("ERROR\n"),
        }
    }

    fn store(&mut self, start: u32, words: &[u16], force: bool) {
        let reserved = self
            .selected_device()
            .map_or(AddressRange::empty(0), |d| d.reserved_range);
        for (addr, &word) in (start..).zip(words) {
            if !force && reserved.contains(addr) {
                log::trace!("dummy: preserving calibration word at {:04X}", addr);
                continue;
            }
            self.memory.insert(addr, word);
        }
    }

    fn cmd_erase(&mut self, args: &[&str]) {
        let nopreserve = match args {
            [] => false,
            ["NOPRESERVE"] => true,
            _ => {
                self.reply("ERROR\n");
                return;
            }
        };
        if self.selected.is_none() {
            self.reply("ERROR\n");
            return;
        }
        let reserved = self
            .selected_device()
            .map_or(AddressRange::empty(0), |d| d.reserved_range);
        self.memory
            .retain(|&addr, _| !nopreserve && reserved.contains(addr));

        for _ in 0..self.config.erase_pending {
            self.reply("PENDING\n");
        }
        self.reply("OK\n");
    }
}

impl Transport for DummyProgrammer {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.rx.extend_from_slice(data);
        self.process();
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = buf.len().min(self.tx.len());
        for (slot, byte) in buf.iter_mut().zip(self.tx.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.timeout = timeout;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) -> Result<()> {
        self.open = false;
        Ok(())
    }
}
