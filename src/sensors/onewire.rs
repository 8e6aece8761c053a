//! Bit-banged 1-Wire bus master.
//!
//! Drives a single open-drain GPIO with an external 4.7 kΩ pull-up.
//! "Driving low" pulls the line to ground; "releasing" lets the pull-up
//! take it high.  Standard-speed slot timings:
//!
//! | Slot     | Master low | Sample at | Slot total |
//! |----------|------------|-----------|------------|
//! | Reset    | 480 µs     | +70 µs    | 960 µs     |
//! | Write 1  | 6 µs       | —         | 70 µs      |
//! | Write 0  | 60 µs      | —         | 70 µs      |
//! | Read     | 6 µs       | +9 µs     | 70 µs      |
//!
//! Each slot runs inside a critical section: an interrupt landing in the
//! middle of a 6 µs pulse would turn a 1 into a 0.
//!
//! ROM search is not implemented; probes are addressed by configured ROM
//! codes (MATCH ROM) or, with a single device, by SKIP ROM.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::error::SensorError;

/// Byte-level bus operations used by the DS18B20 driver.
pub trait OneWireBus {
    /// Reset pulse.  `Err(NoPresence)` when no device answered.
    fn reset(&mut self) -> Result<(), SensorError>;

    fn write_byte(&mut self, byte: u8) -> Result<(), SensorError>;

    fn read_byte(&mut self) -> Result<u8, SensorError>;

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), SensorError> {
        for &b in bytes {
            self.write_byte(b)?;
        }
        Ok(())
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<(), SensorError> {
        for slot in buf.iter_mut() {
            *slot = self.read_byte()?;
        }
        Ok(())
    }
}

/// 1-Wire master over one open-drain pin.
pub struct OneWire<P, D> {
    pin: P,
    delay: D,
}

impl<P, D> OneWire<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    /// Take ownership of the pin and release the bus.
    pub fn new(mut pin: P, delay: D) -> Result<Self, SensorError> {
        pin.set_high().map_err(|_| SensorError::BusFault)?;
        Ok(Self { pin, delay })
    }

    fn release(&mut self) -> Result<(), SensorError> {
        self.pin.set_high().map_err(|_| SensorError::BusFault)
    }

    fn drive_low(&mut self) -> Result<(), SensorError> {
        self.pin.set_low().map_err(|_| SensorError::BusFault)
    }

    fn sample(&mut self) -> Result<bool, SensorError> {
        self.pin.is_high().map_err(|_| SensorError::BusFault)
    }

    fn write_bit(&mut self, bit: bool) -> Result<(), SensorError> {
        let (low_us, high_us) = if bit { (6, 64) } else { (60, 10) };
        critical_section::with(|_| {
            self.drive_low()?;
            self.delay.delay_us(low_us);
            self.release()?;
            self.delay.delay_us(high_us);
            Ok(())
        })
    }

    fn read_bit(&mut self) -> Result<bool, SensorError> {
        critical_section::with(|_| {
            self.drive_low()?;
            self.delay.delay_us(6);
            self.release()?;
            self.delay.delay_us(9);
            let bit = self.sample()?;
            self.delay.delay_us(55);
            Ok(bit)
        })
    }
}

impl<P, D> OneWireBus for OneWire<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    fn reset(&mut self) -> Result<(), SensorError> {
        // A bus held low by a short never gets the reset through.
        if !self.sample()? {
            return Err(SensorError::BusFault);
        }
        let present = critical_section::with(|_| {
            self.drive_low()?;
            self.delay.delay_us(480);
            self.release()?;
            self.delay.delay_us(70);
            let present = !self.sample()?;
            Ok::<bool, SensorError>(present)
        })?;
        self.delay.delay_us(410);
        if present {
            Ok(())
        } else {
            Err(SensorError::NoPresence)
        }
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), SensorError> {
        for i in 0..8 {
            self.write_bit(byte & (1 << i) != 0)?;
        }
        Ok(())
    }

    fn read_byte(&mut self) -> Result<u8, SensorError> {
        let mut byte = 0u8;
        for i in 0..8 {
            if self.read_bit()? {
                byte |= 1 << i;
            }
        }
        Ok(byte)
    }
}

/// Dallas/Maxim CRC-8 (polynomial x^8 + x^5 + x^4 + 1, LSB first).
/// Running it over data followed by its CRC yields zero.
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = 0u8;
    for &byte in data {
        let mut b = byte;
        for _ in 0..8 {
            let mix = (crc ^ b) & 0x01;
            crc >>= 1;
            if mix != 0 {
                crc ^= 0x8C;
            }
            b >>= 1;
        }
    }
    crc
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_hal::digital::ErrorType;

    /// A pin that records writes and returns scripted input levels.
    struct ScriptPin {
        writes: Vec<bool>,
        reads: Vec<bool>,
    }

    impl ErrorType for ScriptPin {
        type Error = Infallible;
    }

    impl OutputPin for ScriptPin {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.writes.push(false);
            Ok(())
        }
        fn set_high(&mut self) -> Result<(), Infallible> {
            self.writes.push(true);
            Ok(())
        }
    }

    impl InputPin for ScriptPin {
        fn is_high(&mut self) -> Result<bool, Infallible> {
            Ok(if self.reads.is_empty() { true } else { self.reads.remove(0) })
        }
        fn is_low(&mut self) -> Result<bool, Infallible> {
            self.is_high().map(|h| !h)
        }
    }

    struct NoDelay;

    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    fn bus(reads: Vec<bool>) -> OneWire<ScriptPin, NoDelay> {
        let pin = ScriptPin {
            writes: Vec::new(),
            reads,
        };
        OneWire::new(pin, NoDelay).unwrap()
    }

    #[test]
    fn crc8_matches_known_rom_code() {
        // Family 0x28 ROM code from a DS18B20 datasheet example.
        let rom = [0x28, 0xFF, 0x64, 0x1E, 0x0F, 0x00, 0x00];
        let crc = crc8(&rom);
        let mut full = rom.to_vec();
        full.push(crc);
        assert_eq!(crc8(&full), 0);
    }

    #[test]
    fn crc8_of_empty_is_zero() {
        assert_eq!(crc8(&[]), 0);
    }

    #[test]
    fn reset_detects_presence() {
        // idle high, then presence pulse (low) when sampled
        let mut b = bus(vec![true, false]);
        assert_eq!(b.reset(), Ok(()));
    }

    #[test]
    fn reset_without_presence_fails() {
        let mut b = bus(vec![true, true]);
        assert_eq!(b.reset(), Err(SensorError::NoPresence));
    }

    #[test]
    fn reset_with_shorted_bus_fails() {
        let mut b = bus(vec![false]);
        assert_eq!(b.reset(), Err(SensorError::BusFault));
    }

    #[test]
    fn read_byte_is_lsb_first() {
        // 0xA5 = 1010_0101 -> LSB first: 1,0,1,0,0,1,0,1
        let bits = vec![true, false, true, false, false, true, false, true];
        let mut b = bus(bits);
        assert_eq!(b.read_byte(), Ok(0xA5));
    }

    #[test]
    fn write_byte_emits_one_low_pulse_per_bit() {
        let mut b = bus(Vec::new());
        b.write_byte(0xCC).unwrap();
        // new() releases once, then low/high per bit
        assert_eq!(b.pin.writes.len(), 1 + 16);
        assert_eq!(b.pin.writes.iter().filter(|w| !**w).count(), 8);
    }
}
