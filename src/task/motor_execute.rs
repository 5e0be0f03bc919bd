//! Motor execution task
//!
//! Applies each channel's control mode to the TB6612FNG every 10 ms, or as
//! soon as the interpreter changes a control slot.
//!
//! # Modes
//! - Potentiometer: power follows the channel's pot, median filtered
//! - User set: power entered at the terminal
//! - Brake: both driver outputs shorted
//!
//! Positive power drives forward, negative backward, zero lets the motor coast.

use crate::task::resources::{Irqs, MotorDriverResources, PotentiometerResources};
use defmt::{info, warn};
use dual_motor_console::queue_print;
use dual_motor_console::system::config::{adc as pot, timing};
use dual_motor_console::system::control::{ControlMode, MotorChannel, Power, CONTROL};
use dual_motor_console::system::tasks::{self, NO_STATE};
use embassy_futures::select::select;
use embassy_rp::adc::{self as rp_adc, Adc, Channel};
use embassy_rp::gpio::{self, Pull};
use embassy_rp::pwm;
use embassy_time::{Duration, Timer};
use moving_median::MovingMedian;
use tb6612fng::{DriveCommand, Motor, Tb6612fng};

/// Maps a signed power level onto a driver command
fn drive_command(power: Power) -> DriveCommand {
    match power.value() {
        0 => DriveCommand::Stop,
        p if p > 0 => DriveCommand::Forward(power.percent()),
        _ => DriveCommand::Backward(power.percent()),
    }
}

#[embassy_executor::task]
pub async fn motor_execute(r: MotorDriverResources, pots: PotentiometerResources) {
    // 10kHz PWM, cheap DC motors run quieter at lower frequencies
    let desired_freq_hz = 10_000;
    let clock_freq_hz = embassy_rp::clocks::clk_sys_freq();

    // Smallest divider that keeps the period within 16 bits
    let divider = ((clock_freq_hz / desired_freq_hz) / 65535 + 1) as u8;
    let period = (clock_freq_hz / (desired_freq_hz * divider as u32)) as u16 - 1;

    let mut pwm_config = pwm::Config::default();
    pwm_config.divider = divider.into();
    pwm_config.top = period;

    let stby = gpio::Output::new(r.standby_pin, gpio::Level::Low);

    // motor A drives channel a
    let first_fwd = gpio::Output::new(r.first_forward_pin, gpio::Level::Low);
    let first_bckw = gpio::Output::new(r.first_backward_pin, gpio::Level::Low);
    let first_pwm = pwm::Pwm::new_output_a(r.first_slice, r.first_pwm_pin, pwm_config.clone());
    let first_motor = Motor::new(first_fwd, first_bckw, first_pwm).unwrap();

    // motor B drives channel b
    let second_fwd = gpio::Output::new(r.second_forward_pin, gpio::Level::Low);
    let second_bckw = gpio::Output::new(r.second_backward_pin, gpio::Level::Low);
    let second_pwm = pwm::Pwm::new_output_a(r.second_slice, r.second_pwm_pin, pwm_config);
    let second_motor = Motor::new(second_fwd, second_bckw, second_pwm).unwrap();

    let mut control = Tb6612fng::new(first_motor, second_motor, stby).unwrap();
    control.disable_standby().unwrap();

    let mut adc = Adc::new(pots.adc, Irqs, rp_adc::Config::default());
    let mut pot_inputs = [
        Channel::new_pin(pots.first_pin, Pull::None),
        Channel::new_pin(pots.second_pin, Pull::None),
    ];
    let mut filters = [
        MovingMedian::<f32, { pot::MEDIAN_WINDOW_SIZE }>::new(),
        MovingMedian::<f32, { pot::MEDIAN_WINDOW_SIZE }>::new(),
    ];
    let mut applied: [Option<ControlMode>; 2] = [None; 2];

    loop {
        for channel in MotorChannel::ALL {
            let i = channel.index();
            let slot = CONTROL.get(channel);

            let command = match slot.mode {
                ControlMode::Potentiometer => {
                    let Ok(raw) = adc.read(&mut pot_inputs[i]).await else {
                        // Motor keeps its last command until the next good sample
                        warn!("potentiometer {} read failed", channel.letter());
                        continue;
                    };
                    filters[i].add_value(f32::from(raw));
                    drive_command(Power::from_adc(filters[i].median() as u16, pot::MAX_VALUE))
                }
                ControlMode::UserSet => drive_command(slot.power),
                ControlMode::Brake => DriveCommand::Brake,
            };

            let motor = match channel {
                MotorChannel::First => &mut control.motor_a,
                MotorChannel::Second => &mut control.motor_b,
            };
            if motor.drive(command).is_err() {
                warn!("motor {} rejected drive command", channel.letter());
            }

            if applied[i] != Some(slot.mode) {
                info!("motor {} now in {} mode", channel.letter(), slot.mode);
                queue_print!("{} motor now in {} mode\r\n", channel, slot.mode);
                applied[i] = Some(slot.mode);
            }
        }
        tasks::MOTORS.record_run(NO_STATE);

        select(
            Timer::after(Duration::from_millis(timing::MOTOR_UPDATE_PERIOD_MS)),
            CONTROL.changed(),
        )
        .await;
    }
}
