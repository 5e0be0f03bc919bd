//! Shared Motor Control Slots
//!
//! Holds the operator's intent for each of the two motor channels: the
//! control mode and the signed power value. The command interpreter is the
//! only writer; the motor execution task and the status printout only read.
//!
//! Each channel's `(mode, power)` pair lives behind its own critical-section
//! mutex, so a reader always sees a pair that was written as a whole. The two
//! channels are independent: nothing orders a write to one channel against a
//! write to the other.
//!
//! # Access Pattern
//! ```rust,ignore
//! // interpreter task, once at startup
//! let writer = CONTROL.take_writer()?;
//! writer.set_power(MotorChannel::First, Power::try_from(42)?);
//!
//! // any other task
//! let control = CONTROL.get(MotorChannel::First);
//! ```

use core::cell::Cell;
use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;

use crate::system::error::ControlError;

/// Control slots for both channels, created at startup with every channel
/// in potentiometer mode at zero power
pub static CONTROL: ControlSlots = ControlSlots::new();

/// One of the two motor channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotorChannel {
    /// Channel selected with `a`
    First,
    /// Channel selected with `b`
    Second,
}

impl MotorChannel {
    /// Both channels in slot order
    pub const ALL: [MotorChannel; 2] = [MotorChannel::First, MotorChannel::Second];

    /// Slot index of this channel
    pub const fn index(self) -> usize {
        match self {
            MotorChannel::First => 0,
            MotorChannel::Second => 1,
        }
    }

    /// Letter the operator types to select this channel
    pub const fn letter(self) -> char {
        match self {
            MotorChannel::First => 'a',
            MotorChannel::Second => 'b',
        }
    }
}

impl fmt::Display for MotorChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotorChannel::First => f.write_str("First"),
            MotorChannel::Second => f.write_str("Second"),
        }
    }
}

/// How the motor execution task drives a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlMode {
    /// Power follows the channel's potentiometer
    #[default]
    Potentiometer,
    /// Power is the value stored in the slot
    UserSet,
    /// Motor is short-braked whatever the stored power
    Brake,
}

impl fmt::Display for ControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlMode::Potentiometer => f.write_str("potentiometer"),
            ControlMode::UserSet => f.write_str("user set"),
            ControlMode::Brake => f.write_str("brake"),
        }
    }
}

/// Signed motor power in [-127, 127]
///
/// The sign gives the direction of the commanded torque, the magnitude its
/// intensity. A `Power` outside the range cannot be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Power(i8);

impl Power {
    /// No torque
    pub const ZERO: Power = Power(0);
    /// Full reverse
    pub const MIN: Power = Power(-127);
    /// Full forward
    pub const MAX: Power = Power(127);

    /// Raw signed value
    pub const fn value(self) -> i8 {
        self.0
    }

    /// Adds `delta`, saturating at the range bounds
    pub fn nudged(self, delta: i32) -> Power {
        let value = (self.0 as i32 + delta).clamp(Self::MIN.0 as i32, Self::MAX.0 as i32);
        Power(value as i8)
    }

    /// Magnitude scaled to a 0..=100 percentage for the motor driver
    pub fn percent(self) -> u8 {
        let magnitude = self.0.unsigned_abs() as u16;
        ((magnitude * 100 + 63) / 127) as u8
    }

    /// Maps a potentiometer reading onto the power range
    ///
    /// `0` gives full reverse, `full_scale` full forward and the midpoint zero.
    /// Readings above `full_scale` saturate.
    pub fn from_adc(raw: u16, full_scale: u16) -> Power {
        if full_scale == 0 {
            return Power::ZERO;
        }
        let raw = raw.min(full_scale) as i32;
        let full_scale = full_scale as i32;
        let span = (Self::MAX.0 as i32) - (Self::MIN.0 as i32);
        let value = (raw * span + full_scale / 2) / full_scale + Self::MIN.0 as i32;
        Power(value as i8)
    }
}

impl TryFrom<i32> for Power {
    type Error = ControlError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        if (Self::MIN.0 as i32..=Self::MAX.0 as i32).contains(&value) {
            Ok(Power(value as i8))
        } else {
            Err(ControlError::PowerOutOfRange(value))
        }
    }
}

impl fmt::Display for Power {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One channel's mode and power, always read and written as a pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Control {
    /// Current control mode
    pub mode: ControlMode,
    /// Current stored power
    pub power: Power,
}

impl Control {
    /// Value every channel holds after a restart
    pub const DEFAULT: Control = Control {
        mode: ControlMode::Potentiometer,
        power: Power::ZERO,
    };
}

impl Default for Control {
    fn default() -> Self {
        Self::DEFAULT
    }
}

type Slot = Mutex<CriticalSectionRawMutex, Cell<Control>>;

/// Synchronized control storage for both channels
pub struct ControlSlots {
    slots: [Slot; 2],
    changed: Signal<CriticalSectionRawMutex, ()>,
    writer_taken: AtomicBool,
}

impl ControlSlots {
    /// Creates slots holding [`Control::DEFAULT`] for both channels
    pub const fn new() -> Self {
        Self {
            slots: [
                Mutex::new(Cell::new(Control::DEFAULT)),
                Mutex::new(Cell::new(Control::DEFAULT)),
            ],
            changed: Signal::new(),
            writer_taken: AtomicBool::new(false),
        }
    }

    /// Hands out the one and only writer
    ///
    /// Fails with [`ControlError::WriterTaken`] on every call after the first.
    pub fn take_writer(&self) -> Result<ControlWriter<'_>, ControlError> {
        if self.writer_taken.swap(true, Ordering::AcqRel) {
            warn!("control writer requested twice");
            return Err(ControlError::WriterTaken);
        }
        Ok(ControlWriter { slots: self })
    }

    /// Reads a channel's mode and power together
    pub fn get(&self, channel: MotorChannel) -> Control {
        self.slots[channel.index()].lock(|cell| cell.get())
    }

    /// Reads a channel's control mode
    pub fn get_mode(&self, channel: MotorChannel) -> ControlMode {
        self.get(channel).mode
    }

    /// Reads a channel's stored power
    pub fn get_power(&self, channel: MotorChannel) -> Power {
        self.get(channel).power
    }

    /// Waits until the writer changes any channel
    ///
    /// Changes made while nobody waits are remembered once, so a reader that
    /// re-reads both channels after waking never misses the latest values.
    pub async fn changed(&self) {
        self.changed.wait().await
    }

    fn update(&self, channel: MotorChannel, f: impl FnOnce(Control) -> Control) -> Control {
        let updated = self.slots[channel.index()].lock(|cell| {
            let updated = f(cell.get());
            cell.set(updated);
            updated
        });
        self.changed.signal(());
        updated
    }
}

impl Default for ControlSlots {
    fn default() -> Self {
        Self::new()
    }
}

/// Write access to the control slots, held by the command interpreter
pub struct ControlWriter<'a> {
    slots: &'a ControlSlots,
}

impl<'a> ControlWriter<'a> {
    /// Slots this writer mutates, for read access
    pub fn slots(&self) -> &'a ControlSlots {
        self.slots
    }

    /// Reads a channel's control mode
    pub fn get_mode(&self, channel: MotorChannel) -> ControlMode {
        self.slots.get_mode(channel)
    }

    /// Reads a channel's stored power
    pub fn get_power(&self, channel: MotorChannel) -> Power {
        self.slots.get_power(channel)
    }

    /// Replaces a channel's control mode, keeping its power
    pub fn set_mode(&self, channel: MotorChannel, mode: ControlMode) {
        debug!("channel {} mode -> {}", channel, mode);
        self.slots.update(channel, |control| Control { mode, ..control });
    }

    /// Replaces a channel's stored power, keeping its mode
    pub fn set_power(&self, channel: MotorChannel, power: Power) {
        debug!("channel {} power -> {}", channel, power);
        self.slots.update(channel, |control| Control { power, ..control });
    }

    /// Adds `delta` to a channel's stored power in one locked step,
    /// saturating at the range bounds, and returns the new value
    pub fn nudge_power(&self, channel: MotorChannel, delta: i32) -> Power {
        let updated = self.slots.update(channel, |control| Control {
            power: control.power.nudged(delta),
            ..control
        });
        debug!("channel {} power nudged -> {}", channel, updated.power);
        updated.power
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_start_in_potentiometer_mode_at_zero_power() {
        let slots = ControlSlots::new();
        for channel in MotorChannel::ALL {
            assert_eq!(slots.get_mode(channel), ControlMode::Potentiometer);
            assert_eq!(slots.get_power(channel), Power::ZERO);
        }
    }

    #[test]
    fn only_one_writer_is_handed_out() {
        let slots = ControlSlots::new();
        let writer = slots.take_writer();
        assert!(writer.is_ok());
        assert_eq!(slots.take_writer().err(), Some(ControlError::WriterTaken));
    }

    #[test]
    fn channels_are_written_independently() {
        let slots = ControlSlots::new();
        let writer = slots.take_writer().unwrap();

        writer.set_power(MotorChannel::Second, Power::try_from(-40).unwrap());
        writer.set_mode(MotorChannel::Second, ControlMode::Brake);

        assert_eq!(slots.get(MotorChannel::First), Control::DEFAULT);
        assert_eq!(
            slots.get(MotorChannel::Second),
            Control {
                mode: ControlMode::Brake,
                power: Power::try_from(-40).unwrap(),
            }
        );
    }

    #[test]
    fn setting_mode_keeps_power_and_vice_versa() {
        let slots = ControlSlots::new();
        let writer = slots.take_writer().unwrap();

        writer.set_power(MotorChannel::First, Power::try_from(12).unwrap());
        writer.set_mode(MotorChannel::First, ControlMode::UserSet);
        assert_eq!(writer.get_power(MotorChannel::First).value(), 12);

        writer.set_power(MotorChannel::First, Power::try_from(13).unwrap());
        assert_eq!(writer.get_mode(MotorChannel::First), ControlMode::UserSet);
    }

    #[test]
    fn power_accepts_only_the_signed_range() {
        assert_eq!(Power::try_from(127), Ok(Power::MAX));
        assert_eq!(Power::try_from(-127), Ok(Power::MIN));
        assert_eq!(Power::try_from(0), Ok(Power::ZERO));
        assert_eq!(
            Power::try_from(128),
            Err(ControlError::PowerOutOfRange(128))
        );
        assert_eq!(
            Power::try_from(-128),
            Err(ControlError::PowerOutOfRange(-128))
        );
    }

    #[test]
    fn nudge_saturates_at_bounds() {
        let slots = ControlSlots::new();
        let writer = slots.take_writer().unwrap();

        writer.set_power(MotorChannel::First, Power::MAX);
        assert_eq!(writer.nudge_power(MotorChannel::First, 1), Power::MAX);

        writer.set_power(MotorChannel::First, Power::MIN);
        assert_eq!(writer.nudge_power(MotorChannel::First, -1), Power::MIN);
        assert_eq!(writer.nudge_power(MotorChannel::First, 1).value(), -126);
    }

    #[test]
    fn percent_scales_magnitude() {
        assert_eq!(Power::ZERO.percent(), 0);
        assert_eq!(Power::MAX.percent(), 100);
        assert_eq!(Power::MIN.percent(), 100);
        assert_eq!(Power::try_from(1).unwrap().percent(), 1);
        assert_eq!(Power::try_from(-64).unwrap().percent(), 50);
    }

    #[test]
    fn adc_reading_maps_onto_power_range() {
        assert_eq!(Power::from_adc(0, 4095), Power::MIN);
        assert_eq!(Power::from_adc(4095, 4095), Power::MAX);
        assert_eq!(Power::from_adc(2048, 4095), Power::ZERO);
        assert_eq!(Power::from_adc(5000, 4095), Power::MAX);
        assert_eq!(Power::from_adc(100, 0), Power::ZERO);
    }

    #[test]
    fn readers_never_see_a_half_written_pair() {
        let slots = ControlSlots::new();
        let writer = slots.take_writer().unwrap();
        let braked = Control {
            mode: ControlMode::Brake,
            power: Power::MAX,
        };
        let user = Control {
            mode: ControlMode::UserSet,
            power: Power::MIN,
        };
        writer.set_mode(MotorChannel::First, braked.mode);
        writer.set_power(MotorChannel::First, braked.power);

        std::thread::scope(|s| {
            s.spawn(|| {
                for i in 0..10_000 {
                    let next = if i % 2 == 0 { user } else { braked };
                    writer.slots.update(MotorChannel::First, |_| next);
                }
            });
            s.spawn(|| {
                for _ in 0..10_000 {
                    let seen = slots.get(MotorChannel::First);
                    assert!(seen == braked || seen == user, "torn read: {:?}", seen);
                }
            });
        });
    }

    #[test]
    fn writes_raise_the_change_signal_once() {
        use embassy_futures::{block_on, poll_once};

        let slots = ControlSlots::new();
        let writer = slots.take_writer().unwrap();
        assert!(poll_once(slots.changed()).is_pending());

        // Two writes with nobody waiting collapse into one wakeup
        writer.set_power(MotorChannel::First, Power::try_from(30).unwrap());
        writer.nudge_power(MotorChannel::Second, -1);
        block_on(slots.changed());
        assert!(poll_once(slots.changed()).is_pending());
    }

    #[test]
    fn a_waiting_reader_wakes_on_a_write() {
        let slots = ControlSlots::new();
        let writer = slots.take_writer().unwrap();

        std::thread::scope(|s| {
            let reader = s.spawn(|| {
                embassy_futures::block_on(slots.changed());
                slots.get_mode(MotorChannel::Second)
            });
            std::thread::sleep(std::time::Duration::from_millis(20));
            writer.set_mode(MotorChannel::Second, ControlMode::Brake);
            assert_eq!(reader.join().unwrap(), ControlMode::Brake);
        });
    }
}
