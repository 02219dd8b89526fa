//! Line commands accepted by the interactive session.
//!
//! Each command that changes the selection produces a new [`FilterState`]; the session then runs
//! a fresh pass with it.

use crate::exceptions::{DashboardError, DashboardResult};
use crate::filter_state::FilterState;
use chrono::NaiveDate;
use std::str::FromStr;

pub const HELP: &str = "\
Commands:
  hours <low> <high>        pickup hour range, 0-23 inclusive
  dates <start> <end>       pickup date range, YYYY-MM-DD inclusive
  payment <code>... | all   payment type codes to keep
  reset                     restore the default selection
  show                      print the current selection
  help                      print this message
  quit                      leave the session";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterCommand {
    Hours(u8, u8),
    Dates(NaiveDate, NaiveDate),
    Payment(Vec<i64>),
    AllPayments,
    Reset,
    Show,
    Help,
    Quit,
}

/// What the session does after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandEffect {
    /// Re-render with this selection.
    Rerun(FilterState),
    Show,
    Help,
    Quit,
}

fn invalid(message: impl Into<String>) -> DashboardError {
    DashboardError::InvalidParameter(message.into())
}

fn parse_hour(token: &str) -> DashboardResult<u8> {
    token
        .parse::<u8>()
        .map_err(|_| invalid(format!("'{}' is not an hour of day", token)))
}

/// Parses `YYYY-MM-DD`.
pub fn parse_date(token: &str) -> DashboardResult<NaiveDate> {
    NaiveDate::parse_from_str(token, "%Y-%m-%d")
        .map_err(|e| invalid(format!("'{}' is not a YYYY-MM-DD date: {}", token, e)))
}

fn expect_pair<'a>(name: &str, args: &[&'a str]) -> DashboardResult<(&'a str, &'a str)> {
    match args {
        [first, second] => Ok((*first, *second)),
        _ => Err(invalid(format!(
            "'{}' takes exactly two arguments, got {}",
            name,
            args.len()
        ))),
    }
}

impl FromStr for FilterCommand {
    type Err = DashboardError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut tokens = line.split_whitespace();
        let Some(name) = tokens.next() else {
            return Err(invalid("Empty command"));
        };
        let args: Vec<&str> = tokens.collect();
        let name = name.to_ascii_lowercase();
        match name.as_str() {
            "hours" => {
                let (low, high) = expect_pair(&name, &args)?;
                Ok(Self::Hours(parse_hour(low)?, parse_hour(high)?))
            }
            "dates" => {
                let (start, end) = expect_pair(&name, &args)?;
                Ok(Self::Dates(parse_date(start)?, parse_date(end)?))
            }
            "payment" => match args.as_slice() {
                [] => Err(invalid("'payment' needs at least one code or 'all'")),
                [all] if all.eq_ignore_ascii_case("all") => Ok(Self::AllPayments),
                codes => codes
                    .iter()
                    .map(|c| {
                        c.parse::<i64>()
                            .map_err(|_| invalid(format!("'{}' is not a payment type code", c)))
                    })
                    .collect::<DashboardResult<Vec<_>>>()
                    .map(Self::Payment),
            },
            "reset" => Ok(Self::Reset),
            "show" => Ok(Self::Show),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" | "q" => Ok(Self::Quit),
            other => Err(invalid(format!("Unknown command '{}'", other))),
        }
    }
}

impl FilterCommand {
    /// Applies the command to `current`. `defaults` backs `reset` and `payment all`.
    pub fn apply(
        self,
        current: &FilterState,
        defaults: &FilterState,
    ) -> DashboardResult<CommandEffect> {
        let state = match self {
            Self::Hours(low, high) => current.with_hours(low, high)?,
            Self::Dates(start, end) => current.with_dates(start, end)?,
            Self::Payment(codes) => current.with_payment_types(codes),
            Self::AllPayments => current.with_payment_types(defaults.payment_types.iter().copied()),
            Self::Reset => defaults.clone(),
            Self::Show => return Ok(CommandEffect::Show),
            Self::Help => return Ok(CommandEffect::Help),
            Self::Quit => return Ok(CommandEffect::Quit),
        };
        Ok(CommandEffect::Rerun(state))
    }
}
