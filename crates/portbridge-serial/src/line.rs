//! termios line configuration.

use std::io;
use std::os::fd::RawFd;

use portbridge_protocol::{DriverError, SerialOptions};

/// Bit rates with a B-constant equivalent. Anything else is refused.
static SPEED_MAP: &[(u32, libc::speed_t)] = &[
    (50, libc::B50),
    (75, libc::B75),
    (110, libc::B110),
    (134, libc::B134),
    (150, libc::B150),
    (200, libc::B200),
    (300, libc::B300),
    (600, libc::B600),
    (1200, libc::B1200),
    (1800, libc::B1800),
    (2400, libc::B2400),
    (4800, libc::B4800),
    (9600, libc::B9600),
    (19200, libc::B19200),
    (38400, libc::B38400),
    (57600, libc::B57600),
    (115200, libc::B115200),
    (230400, libc::B230400),
];

fn speed_for(bit_rate: u32) -> Result<libc::speed_t, DriverError> {
    SPEED_MAP
        .iter()
        .find(|(rate, _)| *rate == bit_rate)
        .map(|(_, speed)| *speed)
        .ok_or(DriverError::UnsupportedBitRate(bit_rate))
}

#[derive(Debug)]
struct LineSettings {
    speed: libc::speed_t,
    iflag_set: libc::tcflag_t,
    cflag_set: libc::tcflag_t,
}

/// Validate options and compute the flag bits to set. Kept separate from
/// the fd plumbing so validation is testable without a device.
fn settings_for(options: &SerialOptions) -> Result<LineSettings, DriverError> {
    let speed = speed_for(options.bit_rate)?;
    let mut iflag_set: libc::tcflag_t = 0;
    let mut cflag_set: libc::tcflag_t = 0;

    match options.cts_flow_control {
        0 => {}
        1 => iflag_set |= libc::IXON | libc::IXOFF,
        2 => cflag_set |= libc::CRTSCTS,
        value => {
            return Err(DriverError::InvalidOption {
                field: "ctsFlowControl",
                value: u32::from(value),
            })
        }
    }
    match options.parity_bit {
        0 => {}
        1 => cflag_set |= libc::PARENB | libc::PARODD,
        2 => cflag_set |= libc::PARENB,
        value => {
            return Err(DriverError::InvalidOption {
                field: "parityBit",
                value: u32::from(value),
            })
        }
    }
    match options.data_bits {
        5 => cflag_set |= libc::CS5,
        6 => cflag_set |= libc::CS6,
        7 => cflag_set |= libc::CS7,
        8 => cflag_set |= libc::CS8,
        value => {
            return Err(DriverError::InvalidOption {
                field: "dataBits",
                value: u32::from(value),
            })
        }
    }
    match options.stop_bits {
        0 => {}
        // 1.5 stop bits has no termios spelling; drive it as two.
        1 | 2 => cflag_set |= libc::CSTOPB,
        value => {
            return Err(DriverError::InvalidOption {
                field: "stopBits",
                value: u32::from(value),
            })
        }
    }
    Ok(LineSettings {
        speed,
        iflag_set,
        cflag_set,
    })
}

/// Apply `options` to an open descriptor: raw mode, parity-checked input,
/// flow control and speed per the options.
pub(crate) fn configure(fd: RawFd, path: &str, options: &SerialOptions) -> Result<(), DriverError> {
    let settings = settings_for(options)?;

    let mut tio = unsafe { std::mem::zeroed::<libc::termios>() };
    if unsafe { libc::tcgetattr(fd, &mut tio) } != 0 {
        return Err(DriverError::Configure {
            path: path.to_owned(),
            source: io::Error::last_os_error(),
        });
    }

    // Raw mode first; cfmakeraw forces CS8 and clears parity and XON, so
    // the requested settings must be layered on top of it, not under it.
    unsafe {
        libc::cfmakeraw(&mut tio);
    }
    tio.c_iflag |= libc::IGNBRK | libc::IGNPAR | libc::INPCK;
    tio.c_iflag &= !(libc::ISTRIP | libc::INLCR | libc::IGNCR | libc::IXON | libc::IXANY | libc::IXOFF);
    tio.c_cflag &= !(libc::CSIZE | libc::CSTOPB | libc::PARENB | libc::PARODD | libc::CRTSCTS);
    tio.c_cflag |= libc::CREAD;
    tio.c_iflag |= settings.iflag_set;
    tio.c_cflag |= settings.cflag_set;

    unsafe {
        libc::cfsetispeed(&mut tio, settings.speed);
        libc::cfsetospeed(&mut tio, settings.speed);
    }

    if unsafe { libc::tcsetattr(fd, libc::TCSAFLUSH, &tio) } != 0 {
        return Err(DriverError::Configure {
            path: path.to_owned(),
            source: io::Error::last_os_error(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_rates_map() {
        assert_eq!(speed_for(9600).unwrap(), libc::B9600);
        assert_eq!(speed_for(115200).unwrap(), libc::B115200);
        assert_eq!(speed_for(50).unwrap(), libc::B50);
        assert_eq!(speed_for(230400).unwrap(), libc::B230400);
    }

    #[test]
    fn nonstandard_rate_is_refused() {
        assert!(matches!(
            speed_for(9601),
            Err(DriverError::UnsupportedBitRate(9601))
        ));
        assert!(matches!(speed_for(0), Err(DriverError::UnsupportedBitRate(0))));
    }

    #[test]
    fn defaults_validate() {
        let settings = settings_for(&SerialOptions::default()).unwrap();
        assert_eq!(settings.speed, libc::B9600);
        // Default flow control is software XON/XOFF.
        assert_eq!(settings.iflag_set & (libc::IXON | libc::IXOFF), libc::IXON | libc::IXOFF);
        assert_eq!(settings.cflag_set & libc::CSIZE, libc::CS8);
    }

    #[test]
    fn data_bits_select_character_size() {
        for (bits, cs) in [(5u8, libc::CS5), (6, libc::CS6), (7, libc::CS7), (8, libc::CS8)] {
            let options = SerialOptions {
                data_bits: bits,
                ..SerialOptions::default()
            };
            assert_eq!(settings_for(&options).unwrap().cflag_set & libc::CSIZE, cs);
        }
    }

    #[test]
    fn out_of_range_fields_are_refused() {
        for (field, options) in [
            (
                "ctsFlowControl",
                SerialOptions {
                    cts_flow_control: 3,
                    ..SerialOptions::default()
                },
            ),
            (
                "parityBit",
                SerialOptions {
                    parity_bit: 5,
                    ..SerialOptions::default()
                },
            ),
            (
                "dataBits",
                SerialOptions {
                    data_bits: 9,
                    ..SerialOptions::default()
                },
            ),
            (
                "stopBits",
                SerialOptions {
                    stop_bits: 3,
                    ..SerialOptions::default()
                },
            ),
        ] {
            match settings_for(&options) {
                Err(DriverError::InvalidOption { field: got, .. }) => assert_eq!(got, field),
                other => panic!("expected InvalidOption for {field}, got {other:?}"),
            }
        }
    }

    #[test]
    fn stop_bits_one_and_a_half_drives_two() {
        let options = SerialOptions {
            stop_bits: 1,
            ..SerialOptions::default()
        };
        assert_ne!(settings_for(&options).unwrap().cflag_set & libc::CSTOPB, 0);
        let options = SerialOptions {
            stop_bits: 0,
            ..SerialOptions::default()
        };
        assert_eq!(settings_for(&options).unwrap().cflag_set & libc::CSTOPB, 0);
    }
}
