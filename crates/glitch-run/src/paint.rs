use colored::{ColoredString, Colorize};
use glitch_core::Outcome;

/// `text` in the colour conventionally used for `outcome`. Honours
/// `NO_COLOR`, `CLICOLOR` and `--no-color`.
pub fn outcome(outcome: Outcome, text: &str) -> ColoredString {
    text.color(outcome.color_name())
}
