//! picprog-mock - In-memory PIC18F-Q20 emulator for testing
//!
//! This crate provides a mock GPIO capability with an attached PIC18F-Q20
//! target. The target decodes the ICSP dialog edge by edge, mirroring the
//! device's programming state machine, and backs every region of the
//! address space with a 0xFF-filled buffer. It is useful for exercising
//! the engine and programmer without real hardware.
//!
//! Protocol violations (an invalid LVP key, an unknown opcode, an access
//! crossing a region boundary, an edge the current state cannot accept)
//! panic with a description: they indicate engine bugs, which is exactly
//! what a test wants to surface loudly.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

use picprog_core::error::{Error, Result};
use picprog_core::firmware::Firmware;
use picprog_core::gpio::{Gpio, Pin, PinMode};
use picprog_core::icsp::IcspPins;
use picprog_core::region::{Region, RegionMap, RegionName, PIC18FQ20};

/// The LVP entry key as a 32-bit word ("MCHP")
const LVP_KEY_WORD: u32 = 0x4D43_4850;

/// Per-region memory, erased state 0xFF
struct MemBuffer {
    buffers: Vec<(Region, Vec<u8>)>,
}

impl MemBuffer {
    fn new(map: &RegionMap) -> Self {
        Self {
            buffers: map
                .regions()
                .iter()
                .map(|r| (*r, vec![0xFF; r.size() as usize]))
                .collect(),
        }
    }

    fn slot(&self, addr: u32) -> (usize, usize) {
        for (idx, (region, _)) in self.buffers.iter().enumerate() {
            if region.contains(addr) {
                return (idx, (addr - region.start) as usize);
            }
        }
        panic!("address 0x{:06x} outside every region", addr);
    }

    fn get(&self, addr: u32) -> u8 {
        let (idx, off) = self.slot(addr);
        self.buffers[idx].1[off]
    }

    fn set(&mut self, addr: u32, value: u8) {
        let (idx, off) = self.slot(addr);
        self.buffers[idx].1[off] = value;
    }

    fn region(&self, name: RegionName) -> &[u8] {
        self.buffers
            .iter()
            .find(|(r, _)| r.name == name)
            .map(|(_, data)| data.as_slice())
            .unwrap_or_else(|| panic!("no region named {}", name))
    }

    fn fill_region(&mut self, name: RegionName, value: u8) {
        if let Some((_, data)) = self.buffers.iter_mut().find(|(r, _)| r.name == name) {
            data.fill(value);
        }
    }
}

/// MSB-first bit collector for key, command and payload reception
struct Shifter {
    data: u32,
    cnt: u32,
    need: u32,
}

impl Shifter {
    fn new(need: u32) -> Self {
        Self {
            data: 0,
            cnt: 0,
            need,
        }
    }

    /// Shift one bit in; returns the accumulated word once complete
    fn push(&mut self, bit: bool) -> Option<u32> {
        assert!(self.cnt < self.need, "extra data received");
        self.data = (self.data << 1) | bit as u32;
        self.cnt += 1;
        (self.cnt == self.need).then_some(self.data)
    }
}

/// Word access resolved at command time: address, geometry, increment
struct Access {
    addr: u32,
    word_size: u32,
    inc: bool,
}

/// Read transfer in flight: 24 cycles, data out on rising edges
struct ReadState {
    data: u32,
    word_bits: u32,
    word_size: u32,
    clk_cnt: u32,
    inc: bool,
}

/// The target's programming state machine
enum State {
    Idle,
    ProgEn,
    Mclr(Shifter),
    Programming,
    Command(Shifter),
    LoadPc(Shifter),
    Read(ReadState),
    Write(Shifter, Access),
    BulkErase(Shifter),
}

impl State {
    fn kind(&self) -> MockState {
        match self {
            State::Idle => MockState::Idle,
            State::ProgEn => MockState::ProgEn,
            State::Mclr(_) => MockState::Mclr,
            State::Programming => MockState::Programming,
            State::Command(_) => MockState::Command,
            State::LoadPc(_) => MockState::LoadPc,
            State::Read(_) => MockState::Read,
            State::Write(..) => MockState::Write,
            State::BulkErase(_) => MockState::BulkErase,
        }
    }
}

/// Observable machine state, for test assertions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockState {
    /// Out of programming mode
    Idle,
    /// PROG_EN asserted
    ProgEn,
    /// MCLR low, collecting the LVP key
    Mclr,
    /// In programming mode, between commands
    Programming,
    /// Collecting a command byte
    Command,
    /// Collecting a LOAD_PC payload
    LoadPc,
    /// Shifting out a read word
    Read,
    /// Collecting a write payload
    Write,
    /// Collecting a bulk erase payload
    BulkErase,
}

struct Target {
    pins: IcspPins,
    pin_modes: BTreeMap<Pin, PinMode>,
    pin_levels: BTreeMap<Pin, bool>,
    /// Level driven by the target while a read is in flight
    data_out: Option<bool>,
    memory: MemBuffer,
    pc: Option<u32>,
    state: State,
    interrupted: bool,
    elapsed: Duration,
}

impl Target {
    fn new(pins: IcspPins) -> Self {
        Self {
            pins,
            pin_modes: BTreeMap::new(),
            pin_levels: BTreeMap::new(),
            data_out: None,
            memory: MemBuffer::new(&PIC18FQ20),
            pc: None,
            state: State::Idle,
            interrupted: false,
            elapsed: Duration::ZERO,
        }
    }

    fn data_level(&self) -> bool {
        assert_eq!(
            self.pin_modes.get(&self.pins.data),
            Some(&PinMode::Output),
            "target latching the data line while the host is not driving it"
        );
        *self
            .pin_levels
            .get(&self.pins.data)
            .expect("data line level never driven")
    }

    fn pc_value(&self) -> u32 {
        self.pc.expect("PC used before LOAD_PC")
    }

    /// Region access at the current PC, validated against the region end
    fn resolve_access(&self, inc_request: bool) -> Access {
        let addr = self.pc_value();
        let region = PIC18FQ20
            .find_by_addr(addr)
            .unwrap_or_else(|_| panic!("PC 0x{:06x} outside every region", addr));
        if addr + region.word_size > region.end {
            panic!("accessing cross region data at 0x{:06x}", addr);
        }
        Access {
            addr,
            word_size: region.word_size,
            inc: inc_request && region.autoincrement_addr,
        }
    }

    fn clk_rising(&mut self) {
        if let State::Read(read) = &mut self.state {
            read.clk_cnt -= 1;
            let bit = if read.clk_cnt > read.word_bits {
                // leading padding
                false
            } else if read.clk_cnt > 0 {
                (read.data >> (read.clk_cnt - 1)) & 1 != 0
            } else {
                // stop bit
                false
            };
            self.data_out = Some(bit);
            return;
        }
        match &self.state {
            State::Programming => self.state = State::Command(Shifter::new(8)),
            // Receive states latch on the falling edge
            State::Mclr(_)
            | State::Command(_)
            | State::LoadPc(_)
            | State::Write(..)
            | State::BulkErase(_) => {}
            State::Idle | State::ProgEn => panic!("unexpected CLK edge outside programming mode"),
            State::Read(_) => unreachable!(),
        }
    }

    fn clk_falling(&mut self) {
        if let State::Read(read) = &self.state {
            if read.clk_cnt > 0 {
                return;
            }
            let step = read.inc.then_some(read.word_size);
            if let Some(word_size) = step {
                self.pc = Some(self.pc_value() + word_size);
            }
            self.data_out = None;
            self.state = State::Programming;
            return;
        }
        match &self.state {
            State::Mclr(_)
            | State::Command(_)
            | State::LoadPc(_)
            | State::Write(..)
            | State::BulkErase(_) => {
                let bit = self.data_level();
                self.latch_bit(bit);
            }
            State::Idle | State::ProgEn | State::Programming => {
                panic!("unexpected CLK edge in state {:?}", self.state.kind())
            }
            State::Read(_) => unreachable!(),
        }
    }

    /// Feed one received bit into the current shifter, dispatching the
    /// completed word
    fn latch_bit(&mut self, bit: bool) {
        let state = std::mem::replace(&mut self.state, State::Programming);
        self.state = match state {
            State::Mclr(mut shifter) => match shifter.push(bit) {
                Some(key) => {
                    assert_eq!(
                        key, LVP_KEY_WORD,
                        "invalid programming sequence 0x{:08x}",
                        key
                    );
                    State::Programming
                }
                None => State::Mclr(shifter),
            },
            State::Command(mut shifter) => match shifter.push(bit) {
                Some(cmd) => self.dispatch_command(cmd as u8),
                None => State::Command(shifter),
            },
            State::LoadPc(mut shifter) => match shifter.push(bit) {
                Some(payload) => {
                    self.pc = Some((payload >> 1) & 0x3F_FFFF);
                    State::Programming
                }
                None => State::LoadPc(shifter),
            },
            State::Write(mut shifter, access) => match shifter.push(bit) {
                Some(payload) => {
                    let word = payload >> 1;
                    self.memory.set(access.addr, word as u8);
                    if access.word_size == 2 {
                        self.memory.set(access.addr + 1, (word >> 8) as u8);
                    }
                    if access.inc {
                        self.pc = Some(access.addr + access.word_size);
                    }
                    State::Programming
                }
                None => State::Write(shifter, access),
            },
            State::BulkErase(mut shifter) => match shifter.push(bit) {
                Some(payload) => {
                    let bitmap = payload >> 1;
                    if bitmap & 0b0001 != 0 {
                        self.memory.fill_region(RegionName::EEPROM, 0xFF);
                    }
                    if bitmap & 0b0010 != 0 {
                        self.memory.fill_region(RegionName::PROGRAM, 0xFF);
                    }
                    if bitmap & 0b0100 != 0 {
                        self.memory.fill_region(RegionName::USER, 0xFF);
                    }
                    if bitmap & 0b1000 != 0 {
                        self.memory.fill_region(RegionName::CONFIG, 0xFF);
                    }
                    State::Programming
                }
                None => State::BulkErase(shifter),
            },
            other => other,
        };
    }

    fn dispatch_command(&mut self, cmd: u8) -> State {
        match cmd {
            0x80 => State::LoadPc(Shifter::new(24)),
            0xFC | 0xFE => {
                let access = self.resolve_access(cmd == 0xFE);
                let mut data = 0u32;
                for i in 0..access.word_size {
                    data |= (self.memory.get(access.addr + i) as u32) << (i * 8);
                }
                State::Read(ReadState {
                    data,
                    word_bits: access.word_size * 8,
                    word_size: access.word_size,
                    clk_cnt: 24,
                    inc: access.inc,
                })
            }
            0xC0 | 0xE0 => {
                let access = self.resolve_access(cmd == 0xE0);
                State::Write(Shifter::new(24), access)
            }
            0x18 => State::BulkErase(Shifter::new(24)),
            0xF8 => {
                let access = self.resolve_access(true);
                self.pc = Some(access.addr + access.word_size);
                State::Programming
            }
            other => panic!("unknown ICSP command 0x{:02x}", other),
        }
    }

    fn mclr_rising(&mut self) {
        match self.state {
            State::Programming | State::Mclr(_) => self.state = State::ProgEn,
            _ => panic!("unexpected MCLR edge in state {:?}", self.state.kind()),
        }
    }

    fn mclr_falling(&mut self) {
        match self.state {
            State::ProgEn => self.state = State::Mclr(Shifter::new(32)),
            // Boards without a PROG_EN line arm directly from idle
            State::Idle if self.pins.prog_en.is_none() => {
                self.state = State::Mclr(Shifter::new(32))
            }
            _ => panic!("unexpected MCLR edge in state {:?}", self.state.kind()),
        }
    }

    fn prog_en_rising(&mut self) {
        match self.state {
            State::Idle => self.state = State::ProgEn,
            _ => panic!("unexpected PROG_EN edge in state {:?}", self.state.kind()),
        }
    }

    fn prog_en_falling(&mut self) {
        match self.state {
            State::ProgEn => self.state = State::Idle,
            _ => panic!("unexpected PROG_EN edge in state {:?}", self.state.kind()),
        }
    }

    fn check_interrupted(&mut self) -> Result<()> {
        // One-shot: the observation clears the flag so the session's
        // exit sequence can still drive pins.
        if self.interrupted {
            self.interrupted = false;
            return Err(Error::Interrupted);
        }
        Ok(())
    }
}

/// Mock GPIO capability with an attached PIC18F-Q20 target
pub struct MockPic {
    shared: Rc<RefCell<Target>>,
}

impl MockPic {
    /// New target with all regions erased to 0xFF, listening on `pins`
    pub fn new(pins: IcspPins) -> Self {
        Self {
            shared: Rc::new(RefCell::new(Target::new(pins))),
        }
    }

    /// Inspection handle sharing this target's state
    pub fn handle(&self) -> MockHandle {
        MockHandle {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl Default for MockPic {
    fn default() -> Self {
        Self::new(IcspPins::default())
    }
}

impl Gpio for MockPic {
    fn set_mode(&mut self, pin: Pin, mode: PinMode, initial: Option<bool>) -> Result<()> {
        let mut t = self.shared.borrow_mut();
        t.check_interrupted()?;
        let previous = t.pin_modes.insert(pin, mode);
        if pin == t.pins.data && previous != Some(mode) {
            // Direction turnaround floats the line
            t.data_out = None;
            t.pin_levels.remove(&pin);
        }
        // Initial levels are applied silently: mode configuration does
        // not clock the target's state machine.
        match (mode, initial) {
            (PinMode::Output, Some(v)) => {
                t.pin_levels.insert(pin, v);
            }
            (PinMode::Input, _) => {
                t.pin_levels.remove(&pin);
            }
            _ => {}
        }
        Ok(())
    }

    fn write(&mut self, pin: Pin, value: bool) -> Result<()> {
        let mut t = self.shared.borrow_mut();
        t.check_interrupted()?;
        assert_eq!(
            t.pin_modes.get(&pin),
            Some(&PinMode::Output),
            "write to non-output pin {}",
            pin
        );
        let old = t.pin_levels.insert(pin, value);
        if old.is_none() || old == Some(value) {
            return Ok(());
        }
        if pin == t.pins.clk {
            if value {
                t.clk_rising();
            } else {
                t.clk_falling();
            }
        } else if pin == t.pins.mclr {
            if value {
                t.mclr_rising();
            } else {
                t.mclr_falling();
            }
        } else if Some(pin) == t.pins.prog_en {
            if value {
                t.prog_en_rising();
            } else {
                t.prog_en_falling();
            }
        }
        // The data line carries no edge semantics; its level is sampled
        // by the state machine on CLK edges.
        Ok(())
    }

    fn read(&mut self, pin: Pin) -> Result<bool> {
        let mut t = self.shared.borrow_mut();
        t.check_interrupted()?;
        assert_eq!(
            t.pin_modes.get(&pin),
            Some(&PinMode::Input),
            "read from non-input pin {}",
            pin
        );
        assert_eq!(pin, t.pins.data, "read from an output-only pin");
        Ok(t.data_out
            .expect("host sampled the data line while the target is not driving it"))
    }

    fn delay(&mut self, duration: Duration) {
        self.shared.borrow_mut().elapsed += duration;
    }
}

/// Cloneable inspection handle onto a [`MockPic`] target
#[derive(Clone)]
pub struct MockHandle {
    shared: Rc<RefCell<Target>>,
}

impl MockHandle {
    /// Read one byte of target memory
    pub fn mem(&self, addr: u32) -> u8 {
        self.shared.borrow().memory.get(addr)
    }

    /// Seed one byte of target memory
    pub fn set_mem(&self, addr: u32, value: u8) {
        self.shared.borrow_mut().memory.set(addr, value);
    }

    /// Copy of a region's full contents
    pub fn region(&self, name: RegionName) -> Vec<u8> {
        self.shared.borrow().memory.region(name).to_vec()
    }

    /// Load a firmware image straight into target memory
    pub fn load_firmware(&self, fw: &Firmware) {
        let mut t = self.shared.borrow_mut();
        for region in fw {
            for elem in &region.elems {
                for (offset, byte) in elem.data.iter().enumerate() {
                    t.memory.set(elem.base_addr + offset as u32, *byte);
                }
            }
        }
    }

    /// Current machine state
    pub fn state(&self) -> MockState {
        self.shared.borrow().state.kind()
    }

    /// Current target PC, if loaded
    pub fn pc(&self) -> Option<u32> {
        self.shared.borrow().pc
    }

    /// Level last driven on a pin, if any
    pub fn pin_level(&self, pin: Pin) -> Option<bool> {
        self.shared.borrow().pin_levels.get(&pin).copied()
    }

    /// Configured direction of a pin, if any
    pub fn pin_mode(&self, pin: Pin) -> Option<PinMode> {
        self.shared.borrow().pin_modes.get(&pin).copied()
    }

    /// Raise the asynchronous termination flag; the next capability call
    /// fails `Interrupted` and clears it
    pub fn raise_interrupt(&self) {
        self.shared.borrow_mut().interrupted = true;
    }

    /// Total time the host spent in delays
    pub fn elapsed(&self) -> Duration {
        self.shared.borrow().elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_starts_erased() {
        let mock = MockPic::default();
        let handle = mock.handle();
        assert_eq!(handle.mem(0x0000), 0xFF);
        assert_eq!(handle.mem(0x3F_FFFC), 0xFF);
        assert_eq!(handle.region(RegionName::EEPROM), vec![0xFF; 256]);
    }

    #[test]
    fn shifter_collects_msb_first() {
        let mut shifter = Shifter::new(8);
        let mut result = None;
        for bit in [true, false, true, false, false, true, false, true] {
            result = shifter.push(bit);
        }
        assert_eq!(result, Some(0xA5));
    }

    #[test]
    #[should_panic(expected = "extra data received")]
    fn shifter_rejects_extra_bits() {
        let mut shifter = Shifter::new(1);
        shifter.push(true);
        shifter.push(false);
    }

    #[test]
    #[should_panic(expected = "outside every region")]
    fn out_of_region_memory_access_panics() {
        let mock = MockPic::default();
        mock.handle().mem(0x01_0000);
    }

    #[test]
    fn interrupt_is_one_shot() {
        let mut mock = MockPic::default();
        let handle = mock.handle();
        mock.set_mode(5, PinMode::Output, Some(false)).unwrap();
        handle.raise_interrupt();
        assert_eq!(mock.write(5, true), Err(Error::Interrupted));
        // Flag cleared by the failed call; the next one goes through
        assert!(mock.write(5, true).is_ok());
    }
}
