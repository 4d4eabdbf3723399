//! Interrupt-driven slave command protocol.
//!
//! A remote master drives each cycle in three phases:
//!
//! 1. it raises the interrupt pin and clocks in an 8-byte [`Header`]; the
//!    controller interrupt fires once the header sits in the receive fifo and
//!    moves the slave from `Idle` to `Command`
//! 2. the next edge on the interrupt pin decodes the header, programs the
//!    controller (or the dma engine) for the payload and drops the ready line
//! 3. after the payload, one more edge verifies it, commits written data,
//!    hands the [`Command`] to the owner and raises the ready line again
//!
//! Malformed headers are dropped without a trace beyond a debug log; the
//! remote master is expected to retry once the ready line is high.

use heapless::spsc::Producer;
use rtic_core::Mutex;

use crate::config::SlaveConfig;
use crate::constants::{
  DMACR_RDMAE, DMACR_TDMAE, DMA_BLOCK_ALIGN_MASK, HEADER_LEN, IMR_RXFIM, SLAVE_CLOCK_THRESHOLD,
  SLAVE_DFS_OFFSET, SLAVE_DMARDLR, SLAVE_DMATDLR, SLAVE_OE_OFFSET, SLAVE_WORK_MODE_OFFSET,
};
use crate::error::ErrorCode;
use crate::hal::{
  Access, ClockControl, DriveMode, Dma, Edge, Gpio, InterruptController, Memory, Reg, Ssi,
};
use crate::spi_drv::command::{Command, Header, Opcode, Reject};
use crate::spi_drv::dma::{self, Direction};
use crate::spi_drv::frame::{self, FrameWidth};
use crate::spi_drv::handshake::ReadyLine;
use crate::spi_drv::{self as drv, SpiBus, TransferMode};

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Status {
  Idle,
  Command,
  Transfer,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Event {
  /// controller interrupt, the header threshold was reached
  SsiInterrupt,
  /// rising edge on the interrupt pin
  CsEdge,
}

#[derive(Debug, PartialEq, Clone, Copy)]
enum Action {
  Acknowledge,
  Rearm,
  DecodeCommand,
  CompleteTransfer,
}

impl Status {
  fn next(self, event: Event) -> (Status, Action) {
    match (self, event) {
      (Status::Idle, Event::SsiInterrupt) => (Status::Command, Action::Acknowledge),
      (s, Event::SsiInterrupt) => (s, Action::Acknowledge),
      (Status::Idle, Event::CsEdge) => (Status::Idle, Action::Rearm),
      (Status::Command, Event::CsEdge) => (Status::Command, Action::DecodeCommand),
      (Status::Transfer, Event::CsEdge) => (Status::Transfer, Action::CompleteTransfer),
    }
  }
}

/// Where finished commands go.
pub enum Completion<'a> {
  None,
  /// called from interrupt context, must return quickly
  Callback(fn(&Command)),
  /// single-slot mailbox drained by the owning thread; a descriptor is dropped
  /// if the previous one was not consumed yet
  Mailbox(Producer<'a, Command, 2>),
}

/// Handlers the platform calls for the two slave interrupt sources.
#[derive(Clone, Copy)]
pub struct Handlers {
  pub cs_edge: fn(),
  pub ssi: fn(),
}

pub struct Parts<R, G, D, M> {
  pub regs: R,
  pub gpio: G,
  pub dma: D,
  pub memory: M,
}

pub struct Slave<'a, R, G, D, M> {
  regs: R,
  gpio: G,
  dma: D,
  memory: M,
  config: SlaveConfig,
  ready: ReadyLine,
  buffer: &'a mut [u8],
  completion: Completion<'a>,
  status: Status,
  command: Option<Command>,
}

impl<'a, R, G, D, M> Slave<'a, R, G, D, M>
where
  R: Ssi,
  G: Gpio,
  D: Dma,
  M: Memory,
{
  /// `buffer` is the local configuration area the config commands address.
  pub fn new(
    config: SlaveConfig,
    parts: Parts<R, G, D, M>,
    buffer: &'a mut [u8],
    completion: Completion<'a>,
  ) -> Self {
    match config.data_bit_length {
      8 | 16 | 32 => (),
      bits => panic!("slave frames of {} bits unsupported", bits),
    }
    Slave {
      regs: parts.regs,
      gpio: parts.gpio,
      dma: parts.dma,
      memory: parts.memory,
      ready: ReadyLine::new(config.ready_pin),
      config,
      buffer,
      completion,
      status: Status::Idle,
      command: None,
    }
  }

  /// Bring up the controller, pins and interrupts and wait for the first
  /// command.
  pub fn configure<C, P>(&mut self, clock: &mut C, plic: &mut P, handlers: Handlers)
  where
    C: ClockControl,
    P: InterruptController,
  {
    self.status = Status::Idle;
    self.command = None;

    clock.reset(SpiBus::SpiSlave);
    clock.enable(SpiBus::SpiSlave);
    clock.set_divider_threshold(SpiBus::SpiSlave, SLAVE_CLOCK_THRESHOLD);

    let ctrlr0 = self.ctrlr0(false, self.dfs());
    self.regs.write(Reg::Ssienr, 0);
    self.regs.write(Reg::Ctrlr0, ctrlr0);
    self.regs.write(Reg::Dmatdlr, SLAVE_DMATDLR);
    self.regs.write(Reg::Dmardlr, SLAVE_DMARDLR);
    self.regs.write(Reg::Dmacr, 0);
    self.regs.write(Reg::Txftlr, 0);
    self.regs.write(Reg::Rxftlr, self.header_threshold());
    self.regs.write(Reg::Imr, IMR_RXFIM);
    self.regs.write(Reg::Ssienr, 1);

    self.ready.configure(&mut self.gpio);

    let pin = self.config.int_pin;
    self.gpio.set_drive_mode(pin, DriveMode::InputPullUp);
    self.gpio.set_edge_trigger(pin, Edge::Rising);
    self.gpio.register_edge_callback(pin, self.config.edge_priority, handlers.cs_edge);

    plic.set_priority(self.config.irq, self.config.irq_priority);
    plic.register(self.config.irq, handlers.ssi);
    plic.enable(self.config.irq);

    log::debug!(
      "spi slave up, {} bit frames, ready pin {}, int pin {}",
      self.config.data_bit_length,
      self.ready.pin(),
      pin
    );
  }

  pub fn status(&self) -> Status {
    self.status
  }

  /// command being transferred, if any
  pub fn command(&self) -> Option<&Command> {
    self.command.as_ref()
  }

  pub fn buffer(&self) -> &[u8] {
    self.buffer
  }

  pub fn set_completion(&mut self, completion: Completion<'a>) {
    self.completion = completion;
  }

  pub fn on_ssi_interrupt(&mut self) {
    self.handle(Event::SsiInterrupt);
  }

  pub fn on_cs_edge(&mut self) {
    self.handle(Event::CsEdge);
  }

  pub fn handle(&mut self, event: Event) {
    let action;
    (self.status, action) = self.status.next(event);

    match action {
      Action::Acknowledge => {
        self.regs.write(Reg::Imr, 0);
        // reading icr clears the interrupt
        self.regs.read(Reg::Icr);
      }
      Action::Rearm => self.idle_mode(),
      Action::DecodeCommand => self.command_mode(),
      Action::CompleteTransfer => self.transfer_mode(),
    }
  }

  fn dfs(&self) -> u32 {
    u32::from(self.config.data_bit_length) - 1
  }

  fn frame_width(&self) -> FrameWidth {
    FrameWidth::from_dfs(self.dfs())
  }

  /// receive threshold that fires once a whole header is in
  fn header_threshold(&self) -> u32 {
    HEADER_LEN as u32 / self.config.data_width() - 1
  }

  fn ctrlr0(&self, output_enabled: bool, dfs: u32) -> u32 {
    // slv_oe set means the slave output is disabled
    let oe: u32 = if output_enabled { 0 } else { 1 };
    let work_mode: u32 = 0;
    (work_mode << SLAVE_WORK_MODE_OFFSET) | (oe << SLAVE_OE_OFFSET) | (dfs << SLAVE_DFS_OFFSET)
  }

  fn idle_mode(&mut self) {
    self.status = Status::Idle;
    self.command = None;

    let ctrlr0 = self.ctrlr0(false, self.dfs());
    self.regs.write(Reg::Ssienr, 0);
    self.regs.write(Reg::Ctrlr0, ctrlr0);
    self.regs.write(Reg::Rxftlr, self.header_threshold());
    self.regs.write(Reg::Dmacr, 0);
    self.regs.write(Reg::Imr, IMR_RXFIM);
    self.regs.write(Reg::Ssienr, 1);

    self.ready.ready(&mut self.gpio);
  }

  fn command_mode(&mut self) {
    let width = self.frame_width();
    let mut raw = [0u8; HEADER_LEN];
    let regs = &mut self.regs;
    frame::fill_units(width, &mut raw, || regs.read(Reg::Dr));

    let decoded = Header::parse(&raw)
      .and_then(|header| header.command())
      .and_then(|command| self.check_range(&command).map(|_| command));

    match decoded {
      Ok(command) => self.begin_transfer(command),
      Err(reject) => {
        log::debug!("spi slave dropped header: {}", reject);
        self.idle_mode();
      }
    }
  }

  fn check_range(&self, command: &Command) -> Result<(), Reject> {
    let access = if command.opcode.is_write() {
      Access::Write
    } else {
      Access::Read
    };
    let allowed = match command.opcode {
      Opcode::WriteConfig | Opcode::ReadConfig => {
        u64::from(command.address) + u64::from(command.length) <= self.buffer.len() as u64
      }
      Opcode::WriteDataByte | Opcode::ReadDataByte => {
        self.memory.allows(command.address, command.length as usize, access)
      }
      Opcode::WriteDataBlock | Opcode::ReadDataBlock => self.memory.allows(
        command.address & DMA_BLOCK_ALIGN_MASK,
        command.length as usize * 4,
        access,
      ),
    };

    if allowed {
      Ok(())
    } else {
      Err(Reject::Address {
        address: command.address,
        length: command.length,
      })
    }
  }

  fn begin_transfer(&mut self, command: Command) {
    self.status = Status::Transfer;
    self.regs.write(Reg::Ssienr, 0);

    let width = self.frame_width();
    let address = command.address;
    let units = width.units(command.length as usize);

    match command.opcode {
      Opcode::WriteConfig | Opcode::WriteDataByte => {
        let ctrlr0 = self.ctrlr0(false, self.dfs());
        let threshold = (command.length / self.config.data_width()).saturating_sub(1);
        self.regs.write(Reg::Ctrlr0, ctrlr0);
        self.regs.write(Reg::Rxftlr, threshold);
        self.regs.write(Reg::Imr, 0);
        self.regs.write(Reg::Ssienr, 1);
      }
      Opcode::ReadConfig | Opcode::ReadDataByte => {
        self.start_transmit(self.ctrlr0(true, self.dfs()), 0);
        self.regs.write(Reg::Txftlr, 0);

        // preload so the data is ready when the master clocks it out
        if command.opcode == Opcode::ReadConfig {
          let start = address as usize;
          let data = &self.buffer[start..start + units * width.bytes()];
          let regs = &mut self.regs;
          frame::for_each_unit(width, data, |u| regs.write(Reg::Dr, u));
        } else {
          for i in 0..units {
            let value = self.memory.read_unit(address.wrapping_add((i * width.bytes()) as u32), width);
            self.regs.write(Reg::Dr, value);
          }
        }
      }
      Opcode::WriteDataBlock => {
        let ctrlr0 = self.ctrlr0(false, 32 - 1);
        self.regs.write(Reg::Ctrlr0, ctrlr0);
        self.regs.write(Reg::Dmacr, DMACR_RDMAE);
        self.regs.write(Reg::Imr, 0);
        self.regs.write(Reg::Ssienr, 1);
        self.arm_dma(Direction::FromFifo, &command);
      }
      Opcode::ReadDataBlock => {
        self.start_transmit(self.ctrlr0(true, 32 - 1), DMACR_TDMAE);
        self.arm_dma(Direction::ToFifo, &command);
      }
    }

    log::debug!(
      "spi slave {:?} at {:#010x}, {} bytes",
      command.opcode,
      command.address,
      command.length
    );
    self.command = Some(command);
    self.ready.busy(&mut self.gpio);
  }

  /// switch the controller to transmit-only and enable it
  fn start_transmit(&mut self, ctrlr0: u32, dmacr: u32) {
    self.regs.write(Reg::Ctrlr0, ctrlr0);
    drv::set_transfer_mode(&mut self.regs, SpiBus::SpiSlave, TransferMode::Transmit);
    if dmacr != 0 {
      self.regs.write(Reg::Dmacr, dmacr);
    }
    self.regs.write(Reg::Imr, 0);
    self.regs.write(Reg::Ssienr, 1);
  }

  fn arm_dma(&mut self, direction: Direction, command: &Command) {
    let transfer = dma::block(
      direction,
      self.regs.data_register_address(),
      command.address,
      command.length,
    );
    dma::arm(&mut self.dma, self.config.dma_channel, SpiBus::SpiSlave, direction, &transfer);
  }

  fn transfer_mode(&mut self) {
    let mut command = match self.command.take() {
      Some(command) => command,
      None => {
        self.idle_mode();
        return;
      }
    };

    let width = self.frame_width();
    let units = width.units(command.length as usize);

    command.error = match command.opcode {
      Opcode::WriteConfig | Opcode::WriteDataByte => {
        if (self.regs.read(Reg::Rxflr) as usize) < units {
          ErrorCode::RxShortfall
        } else {
          ErrorCode::None
        }
      }
      Opcode::ReadConfig | Opcode::ReadDataByte => {
        if self.regs.read(Reg::Txflr) != 0 {
          ErrorCode::TxNotDrained
        } else {
          ErrorCode::None
        }
      }
      Opcode::WriteDataBlock | Opcode::ReadDataBlock => {
        if dma::is_complete(&self.dma, self.config.dma_channel) {
          ErrorCode::None
        } else {
          ErrorCode::DmaIncomplete
        }
      }
    };

    if command.error.is_ok() {
      self.commit(&command, width, units);
    } else {
      log::warn!("spi slave {:?} incomplete: {}", command.opcode, command.error);
    }

    self.deliver(command);
    self.idle_mode();
  }

  /// move received units to their destination
  fn commit(&mut self, command: &Command, width: FrameWidth, units: usize) {
    let address = command.address;
    match command.opcode {
      Opcode::WriteConfig => {
        let start = address as usize;
        let dest = &mut self.buffer[start..start + units * width.bytes()];
        let regs = &mut self.regs;
        frame::fill_units(width, dest, || regs.read(Reg::Dr));
      }
      Opcode::WriteDataByte => {
        for i in 0..units {
          let value = self.regs.read(Reg::Dr);
          self.memory.write_unit(address.wrapping_add((i * width.bytes()) as u32), width, value);
        }
      }
      _ => (),
    }
  }

  fn deliver(&mut self, command: Command) {
    match &mut self.completion {
      Completion::None => (),
      Completion::Callback(callback) => callback(&command),
      Completion::Mailbox(producer) => {
        if producer.enqueue(command).is_err() {
          log::warn!("spi slave mailbox full, dropped {:?}", command.opcode);
        }
      }
    }
  }
}

/// Controller interrupt entry for a slave kept behind a resource lock.
pub fn slave_irq<'a, L, R, G, D, M>(mut slave: L)
where
  L: Mutex<T = Slave<'a, R, G, D, M>>,
  R: Ssi,
  G: Gpio,
  D: Dma,
  M: Memory,
{
  slave.lock(|slave| slave.on_ssi_interrupt());
}

/// Interrupt pin edge entry for a slave kept behind a resource lock.
pub fn slave_cs_irq<'a, L, R, G, D, M>(mut slave: L)
where
  L: Mutex<T = Slave<'a, R, G, D, M>>,
  R: Ssi,
  G: Gpio,
  D: Dma,
  M: Memory,
{
  slave.lock(|slave| slave.on_cs_edge());
}
