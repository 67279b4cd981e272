//! GM command grammar.
//!
//! A command line is whitespace-tokenized into `[verb, target, ...args]`.
//! Parsing is strict: unknown verbs, a missing target, and non-numeric
//! amounts are rejected here, before any handler runs. Error messages are
//! short Italian strings meant for direct display in the GM console.

/// Who a command applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Every known player (the literal token `all`, case-insensitive).
    All,
    /// One player by exact name.
    Name(String),
}

impl Target {
    fn parse(token: &str) -> Self {
        if token.eq_ignore_ascii_case("all") {
            Target::All
        } else {
            Target::Name(token.to_string())
        }
    }
}

/// The closed verb table. Amounts are signed: the sign baked into each
/// verb's effect (`_dmg` subtracts, `_heal` adds) is applied by the
/// handler, and results are clamped to the gauge range there.
#[derive(Debug, Clone, PartialEq)]
pub enum GmCommand {
    /// `_dmg <amount>`: biofeedback -= amount.
    Damage(f64),
    /// `_heal <amount>`: biofeedback += amount.
    Heal(f64),
    /// `_f <amount>`: hunger += amount.
    Feed(f64),
    /// `_s <amount>`: thirst += amount.
    Drink(f64),
    /// `_so <amount>`: sleep += amount.
    Rest(f64),
    /// `_e <amount>`: energy += amount.
    Energy(f64),
    /// `_quickstrangle`: oxygen := 0.
    QuickStrangle,
    /// `_slowstrangle`: oxygen -= 50.
    SlowStrangle,
    /// `ill`: mark sick.
    Ill,
    /// `fix`: clear sick.
    Fix,
    /// `give <item> [amount]`: grant copies of a catalog item.
    Give { item: String, amount: u32 },
    /// `sack`: empty the inventory.
    Sack,
    /// `_newday`: daily decay for every player (target token ignored).
    NewDay,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    Empty,
    MissingTarget,
    UnknownVerb(String),
    MissingItem,
    MissingAmount,
    BadAmount(String),
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::Empty => write!(f, "comando vuoto"),
            CommandError::MissingTarget => write!(f, "manca il bersaglio"),
            CommandError::UnknownVerb(v) => write!(f, "comando sconosciuto: {v}"),
            CommandError::MissingItem => write!(f, "manca il nome dell'oggetto"),
            CommandError::MissingAmount => write!(f, "manca la quantità"),
            CommandError::BadAmount(s) => write!(f, "quantità non valida: {s}"),
        }
    }
}

impl std::error::Error for CommandError {}

fn parse_gauge_amount(tok: Option<&str>) -> Result<f64, CommandError> {
    let tok = tok.ok_or(CommandError::MissingAmount)?;
    tok.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| CommandError::BadAmount(tok.to_string()))
}

/// Parse one command line into `(verb, target)`.
///
/// The target token is positional and mandatory for every verb, `_newday`
/// included: `_newday` ignores its value but not its presence.
pub fn parse(line: &str) -> Result<(GmCommand, Target), CommandError> {
    let mut toks = line.split_whitespace();
    let verb = toks.next().ok_or(CommandError::Empty)?;
    let target = Target::parse(toks.next().ok_or(CommandError::MissingTarget)?);

    let cmd = match verb {
        "_dmg" => GmCommand::Damage(parse_gauge_amount(toks.next())?),
        "_heal" => GmCommand::Heal(parse_gauge_amount(toks.next())?),
        "_f" => GmCommand::Feed(parse_gauge_amount(toks.next())?),
        "_s" => GmCommand::Drink(parse_gauge_amount(toks.next())?),
        "_so" => GmCommand::Rest(parse_gauge_amount(toks.next())?),
        "_e" => GmCommand::Energy(parse_gauge_amount(toks.next())?),
        "_quickstrangle" => GmCommand::QuickStrangle,
        "_slowstrangle" => GmCommand::SlowStrangle,
        "ill" => GmCommand::Ill,
        "fix" => GmCommand::Fix,
        "give" => {
            let item = toks.next().ok_or(CommandError::MissingItem)?;
            let amount = match toks.next() {
                None => 1,
                Some(t) => t
                    .parse::<u32>()
                    .map_err(|_| CommandError::BadAmount(t.to_string()))?,
            };
            GmCommand::Give {
                item: item.to_string(),
                amount,
            }
        }
        "sack" => GmCommand::Sack,
        "_newday" => GmCommand::NewDay,
        other => return Err(CommandError::UnknownVerb(other.to_string())),
    };

    Ok((cmd, target))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_gauge_verbs_with_amounts() {
        assert_eq!(
            parse("_dmg bob 30"),
            Ok((GmCommand::Damage(30.0), Target::Name("bob".to_string())))
        );
        assert_eq!(
            parse("_heal ALL 5"),
            Ok((GmCommand::Heal(5.0), Target::All))
        );
        assert_eq!(
            parse("_f bob 12.5"),
            Ok((GmCommand::Feed(12.5), Target::Name("bob".to_string())))
        );
    }

    #[test]
    fn target_all_is_case_insensitive() {
        assert_eq!(parse("ill all"), Ok((GmCommand::Ill, Target::All)));
        assert_eq!(parse("ill All"), Ok((GmCommand::Ill, Target::All)));
        assert_eq!(
            parse("ill allan"),
            Ok((GmCommand::Ill, Target::Name("allan".to_string())))
        );
    }

    #[test]
    fn give_defaults_to_one_copy() {
        assert_eq!(
            parse("give bob Roccia"),
            Ok((
                GmCommand::Give {
                    item: "Roccia".to_string(),
                    amount: 1
                },
                Target::Name("bob".to_string())
            ))
        );
        assert_eq!(
            parse("give bob Roccia 3"),
            Ok((
                GmCommand::Give {
                    item: "Roccia".to_string(),
                    amount: 3
                },
                Target::Name("bob".to_string())
            ))
        );
    }

    #[test]
    fn rejects_malformed_input_before_dispatch() {
        assert_eq!(parse(""), Err(CommandError::Empty));
        assert_eq!(parse("   "), Err(CommandError::Empty));
        assert_eq!(parse("_dmg"), Err(CommandError::MissingTarget));
        assert_eq!(parse("_dmg bob"), Err(CommandError::MissingAmount));
        assert_eq!(parse("give bob"), Err(CommandError::MissingItem));
        assert_eq!(
            parse("_dmg bob tanto"),
            Err(CommandError::BadAmount("tanto".to_string()))
        );
        assert_eq!(
            parse("give bob Roccia molte"),
            Err(CommandError::BadAmount("molte".to_string()))
        );
        assert_eq!(
            parse("_teleport bob"),
            Err(CommandError::UnknownVerb("_teleport".to_string()))
        );
    }

    #[test]
    fn newday_still_requires_a_target_token() {
        assert_eq!(parse("_newday"), Err(CommandError::MissingTarget));
        assert_eq!(parse("_newday all"), Ok((GmCommand::NewDay, Target::All)));
        // The token is positional only; any value parses.
        assert_eq!(
            parse("_newday bob"),
            Ok((GmCommand::NewDay, Target::Name("bob".to_string())))
        );
    }
}
