//! crates/timetable_core/src/position.rs
//!
//! Calendar-position value types: where in the timetable a slot falls,
//! independent of any real calendar arithmetic.

use std::fmt;

use chrono::{Month, Weekday};

/// The three independent ways a slot's day-position is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    Weekly,
    Monthly,
    Yearly,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Weekly => "weekly",
            Granularity::Monthly => "monthly",
            Granularity::Yearly => "yearly",
        }
    }

    /// Parses a granularity label, case-insensitively.
    pub fn parse(raw: &str) -> Result<Self, PositionError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "weekly" => Ok(Granularity::Weekly),
            "monthly" => Ok(Granularity::Monthly),
            "yearly" => Ok(Granularity::Yearly),
            _ => Err(PositionError::UnknownGranularity(raw.to_string())),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced while parsing positions and time slots.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PositionError {
    #[error("'{raw}' is not a valid {granularity} position")]
    InvalidPosition { granularity: Granularity, raw: String },
    #[error("'{0}' is not a recognized granularity")]
    UnknownGranularity(String),
    #[error("'{0}' is not an hour-aligned slot between 09:00 and 17:00")]
    InvalidTimeSlot(String),
}

/// A slot's day-position, tagged by granularity.
///
/// Positions of different granularities never compare equal, even when
/// the underlying values coincide: Monthly "1" is not Yearly "January".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Position {
    /// Day of the week ("Monday".."Sunday").
    Weekly(Weekday),
    /// Day of the month, 1 through 31. The upper bound is NOT checked
    /// against any real month length; day 31 is a legal label year-round.
    Monthly(u8),
    /// Month of the year ("January".."December").
    Yearly(Month),
}

impl Position {
    /// Parses the raw value a caller supplied for `granularity`.
    pub fn parse(granularity: Granularity, raw: &str) -> Result<Self, PositionError> {
        let invalid = || PositionError::InvalidPosition {
            granularity,
            raw: raw.to_string(),
        };
        match granularity {
            Granularity::Weekly => raw
                .trim()
                .parse::<Weekday>()
                .map(Position::Weekly)
                .map_err(|_| invalid()),
            Granularity::Monthly => {
                let day = raw.trim().parse::<u8>().map_err(|_| invalid())?;
                if (1..=31).contains(&day) {
                    Ok(Position::Monthly(day))
                } else {
                    Err(invalid())
                }
            }
            Granularity::Yearly => raw
                .trim()
                .parse::<Month>()
                .map(Position::Yearly)
                .map_err(|_| invalid()),
        }
    }

    pub fn granularity(&self) -> Granularity {
        match self {
            Position::Weekly(_) => Granularity::Weekly,
            Position::Monthly(_) => Granularity::Monthly,
            Position::Yearly(_) => Granularity::Yearly,
        }
    }

    /// Canonical label for storage and display; round-trips through
    /// `parse` with the matching granularity.
    pub fn label(&self) -> String {
        match self {
            Position::Weekly(day) => day.to_string(),
            Position::Monthly(day) => day.to_string(),
            Position::Yearly(month) => month.name().to_string(),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// One cell of the fixed hour-aligned time grid, 09:00 through 17:00.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimeSlot(u8);

impl TimeSlot {
    pub const FIRST_HOUR: u8 = 9;
    pub const LAST_HOUR: u8 = 17;

    pub fn from_hour(hour: u8) -> Result<Self, PositionError> {
        if (Self::FIRST_HOUR..=Self::LAST_HOUR).contains(&hour) {
            Ok(TimeSlot(hour))
        } else {
            Err(PositionError::InvalidTimeSlot(format!("{hour:02}:00")))
        }
    }

    /// Parses an "HH:00" label on the grid.
    pub fn parse(raw: &str) -> Result<Self, PositionError> {
        let invalid = || PositionError::InvalidTimeSlot(raw.to_string());
        let (hour, minute) = raw.trim().split_once(':').ok_or_else(invalid)?;
        if minute != "00" {
            return Err(invalid());
        }
        let hour = hour.parse::<u8>().map_err(|_| invalid())?;
        Self::from_hour(hour).map_err(|_| invalid())
    }

    pub fn hour(&self) -> u8 {
        self.0
    }

    /// The whole grid, in order.
    pub fn all() -> impl Iterator<Item = TimeSlot> {
        (Self::FIRST_HOUR..=Self::LAST_HOUR).map(TimeSlot)
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:00", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_weekday_names() {
        let pos = Position::parse(Granularity::Weekly, "Monday").unwrap();
        assert_eq!(pos, Position::Weekly(Weekday::Mon));
        // Abbreviations and case are tolerated.
        assert_eq!(Position::parse(Granularity::Weekly, "tue").unwrap(), Position::Weekly(Weekday::Tue));
        assert!(Position::parse(Granularity::Weekly, "Funday").is_err());
    }

    #[test]
    fn monthly_positions_allow_any_day_up_to_31() {
        assert_eq!(Position::parse(Granularity::Monthly, "1").unwrap(), Position::Monthly(1));
        // 31 is a legal label regardless of month length.
        assert_eq!(Position::parse(Granularity::Monthly, "31").unwrap(), Position::Monthly(31));
        assert!(Position::parse(Granularity::Monthly, "0").is_err());
        assert!(Position::parse(Granularity::Monthly, "32").is_err());
        assert!(Position::parse(Granularity::Monthly, "first").is_err());
    }

    #[test]
    fn parses_month_names() {
        assert_eq!(
            Position::parse(Granularity::Yearly, "January").unwrap(),
            Position::Yearly(Month::January)
        );
        assert!(Position::parse(Granularity::Yearly, "Smarch").is_err());
    }

    #[test]
    fn granularities_never_compare_equal() {
        let monthly = Position::parse(Granularity::Monthly, "1").unwrap();
        let yearly = Position::parse(Granularity::Yearly, "January").unwrap();
        assert_ne!(monthly, yearly);
    }

    #[test]
    fn labels_round_trip() {
        for (granularity, raw) in [
            (Granularity::Weekly, "Wednesday"),
            (Granularity::Monthly, "14"),
            (Granularity::Yearly, "September"),
        ] {
            let pos = Position::parse(granularity, raw).unwrap();
            assert_eq!(Position::parse(granularity, &pos.label()).unwrap(), pos);
        }
    }

    #[test]
    fn time_slots_are_hour_aligned_and_bounded() {
        assert_eq!(TimeSlot::parse("09:00").unwrap().hour(), 9);
        assert_eq!(TimeSlot::parse("17:00").unwrap().to_string(), "17:00");
        assert!(TimeSlot::parse("08:00").is_err());
        assert!(TimeSlot::parse("18:00").is_err());
        assert!(TimeSlot::parse("09:30").is_err());
        assert!(TimeSlot::parse("nine").is_err());
        assert_eq!(TimeSlot::all().count(), 9);
    }
}
