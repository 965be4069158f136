use std::fmt::{Display, Formatter};

use typed_builder::TypedBuilder;

use vsteer_core::bucket::TimeMS;

#[derive(Clone, Default, Copy, Debug, PartialEq)]
pub enum PowerState {
    #[default]
    Off,
    On,
    Done,
}

impl Display for PowerState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PowerState::On => write!(f, "On"),
            PowerState::Off => write!(f, "Off"),
            PowerState::Done => write!(f, "Done"),
        }
    }
}

/// The single activation window of an application: switched on at `on_at`, switched off
/// once the clock reaches `off_at`. A window is used once.
#[derive(Clone, Default, Copy, Debug, PartialEq, TypedBuilder)]
pub struct PowerManager {
    pub on_at: TimeMS,
    pub off_at: TimeMS,
    #[builder(default)]
    pub state: PowerState,
}

impl PowerManager {
    pub fn time_to_on(&self) -> TimeMS {
        self.on_at
    }

    pub fn has_next_time_to_on(&self) -> bool {
        self.state == PowerState::Off
    }

    pub fn is_on(&self) -> bool {
        self.state == PowerState::On
    }

    pub fn is_time_to_off(&self, now: TimeMS) -> bool {
        self.is_on() && now >= self.off_at
    }

    pub fn power_on(&mut self) {
        self.state = PowerState::On;
    }

    pub fn power_off(&mut self) {
        self.state = PowerState::Done;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_is_used_once() {
        let mut power = PowerManager::builder()
            .on_at(TimeMS::from(0))
            .off_at(TimeMS::from(55000))
            .build();
        assert!(power.has_next_time_to_on());
        power.power_on();
        assert!(!power.is_time_to_off(TimeMS::from(54999)));
        assert!(power.is_time_to_off(TimeMS::from(55000)));
        power.power_off();
        assert!(!power.has_next_time_to_on());
        assert!(!power.is_time_to_off(TimeMS::from(60000)));
    }
}
