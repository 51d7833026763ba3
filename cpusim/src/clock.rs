use crate::{InvariantError, Time};

/// Simulation time, owned by a single running simulation.
///
/// Time never decreases: it moves forward one unit at a time, by a whole quantum block, or
/// jumps straight to the next arrival when the CPU would otherwise sit idle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Clock {
    now: Time,
}

impl Clock {
    pub(crate) fn now(self) -> Time {
        self.now
    }

    pub(crate) fn advance(&mut self, units: Time) -> Result<(), InvariantError> {
        self.now = self
            .now
            .checked_add(units)
            .ok_or(InvariantError::ClockOverflow {
                now: self.now,
                units,
            })?;
        Ok(())
    }

    /// Moves to `target` and returns the elapsed gap.
    pub(crate) fn jump_to(&mut self, target: Time) -> Result<Time, InvariantError> {
        let gap = target
            .checked_sub(self.now)
            .ok_or(InvariantError::ClockRewind {
                now: self.now,
                target,
            })?;
        self.now = target;
        Ok(gap)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_advance_and_jump() {
        let mut clock = Clock::default();
        assert_eq!(clock.now(), 0);
        clock.advance(1).unwrap();
        clock.advance(2).unwrap();
        assert_eq!(clock.now(), 3);
        assert_eq!(clock.jump_to(7), Ok(4));
        assert_eq!(clock.jump_to(7), Ok(0));
        assert_eq!(
            clock.jump_to(5),
            Err(InvariantError::ClockRewind { now: 7, target: 5 })
        );
        assert_eq!(clock.now(), 7);
    }

    #[test]
    fn test_advance_overflow() {
        let mut clock = Clock::default();
        clock.jump_to(Time::MAX - 1).unwrap();
        assert_eq!(
            clock.advance(2),
            Err(InvariantError::ClockOverflow {
                now: Time::MAX - 1,
                units: 2
            })
        );
        assert_eq!(clock.now(), Time::MAX - 1);
        assert_eq!(clock.advance(1), Ok(()));
        assert_eq!(clock.now(), Time::MAX);
    }
}
