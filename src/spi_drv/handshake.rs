use crate::hal::{DriveMode, Gpio, Level};

/// Ready line towards the remote master. High means a new command may be
/// started, low means one is being processed.
#[derive(Debug, Clone, Copy)]
pub struct ReadyLine {
  pin: u8,
}

impl ReadyLine {
  pub fn new(pin: u8) -> Self {
    ReadyLine { pin }
  }

  pub fn pin(&self) -> u8 {
    self.pin
  }

  pub fn configure<G: Gpio>(&self, gpio: &mut G) {
    gpio.set_drive_mode(self.pin, DriveMode::Output);
    self.ready(gpio);
  }

  pub fn ready<G: Gpio>(&self, gpio: &mut G) {
    gpio.set_pin(self.pin, Level::High);
  }

  pub fn busy<G: Gpio>(&self, gpio: &mut G) {
    gpio.set_pin(self.pin, Level::Low);
  }
}
