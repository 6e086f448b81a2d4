use std::fmt;

const SOUND_SPEED_M_S: f64 = 343.0;
const SOUND_SPEED_CM_US: f64 = SOUND_SPEED_M_S * 100.0 / 1_000_000.0;

/// Distance to the object in front of the sensor, stored in centimeters
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Distance(f64);

impl Distance {
    /// Converts the width of the echo pulse into the distance to the object. The pulse covers
    /// the round trip, so the travelled distance is halved.
    ///
    /// # Arguments
    ///
    /// - `echo_us`: Microseconds between the rising and the falling edge of the echo
    ///
    /// # Returns
    ///
    /// The `Distance` to the object
    pub fn from_echo_us(echo_us: u32) -> Distance {
        Distance(echo_us as f64 * SOUND_SPEED_CM_US / 2.0)
    }

    pub fn from_cm(cm: f64) -> Distance {
        Distance(cm)
    }

    pub fn cm(&self) -> f64 {
        self.0
    }

    pub fn mm(&self) -> f64 {
        self.0 * 10.0
    }

    pub fn meters(&self) -> f64 {
        self.0 / 100.0
    }
}

/// Two decimals followed by the unit, as printed on every report line
impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} cm", self.0)
    }
}
